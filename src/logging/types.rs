//! Core logging types: change entries, status, and the [`Log`] trait.

/// Per-option result for summary reporting.
#[derive(Debug, Clone)]
pub struct ChangeEntry {
    /// Option identifier.
    pub option: String,
    /// What happened to the option.
    pub status: ChangeStatus,
    /// Optional detail message (e.g., dependencies pulled in, error text).
    pub message: Option<String>,
}

/// Outcome of a single enable/disable request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeStatus {
    /// The option was switched on.
    Enabled,
    /// The option was switched off.
    Disabled,
    /// The option was already in the requested state.
    Unchanged,
    /// A confirmation prompt was declined.
    Rejected,
    /// The request could not be carried out.
    Failed,
}

/// Abstraction over logging backends.
///
/// Command code logs through this trait so that tests can observe recorded
/// changes without a real terminal.
pub trait Log {
    /// Log a stage header (major section).
    fn stage(&self, msg: &str);
    /// Log an informational message.
    fn info(&self, msg: &str);
    /// Log a debug message (may be suppressed on console).
    fn debug(&self, msg: &str);
    /// Log a warning message.
    fn warn(&self, msg: &str);
    /// Log an error message.
    fn error(&self, msg: &str);
    /// Log a dry-run action message.
    fn dry_run(&self, msg: &str);
    /// Record an option change for the summary.
    fn record_change(&self, option: &str, status: ChangeStatus, message: Option<&str>);
}
