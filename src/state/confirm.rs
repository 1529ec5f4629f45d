//! Yes/no decision oracle consulted while enabling an option.

/// Caller-supplied yes/no decision.
///
/// Implementations block until a decision is available (typically a terminal
/// prompt) and must not have side effects beyond returning it. Any closure
/// `FnMut(&str, &str) -> bool` is an oracle.
#[cfg_attr(test, mockall::automock)]
pub trait Confirm {
    /// Ask the question `prompt` under the heading `title`; `true` means yes.
    fn confirm(&mut self, title: &str, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: FnMut(&str, &str) -> bool,
{
    fn confirm(&mut self, title: &str, prompt: &str) -> bool {
        self(title, prompt)
    }
}

/// Oracle that accepts every prompt (`--yes`).
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl Confirm for AcceptAll {
    fn confirm(&mut self, title: &str, prompt: &str) -> bool {
        tracing::debug!(title, prompt, "auto-accepted");
        true
    }
}
