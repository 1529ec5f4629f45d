//! Commands: enable and disable options, then rewrite the uEnv file.
use anyhow::{Result, bail};
use std::io::{BufRead, Write};
use std::path::Path;

use super::CommandSetup;
use crate::cli::{GlobalOpts, ToggleOpts};
use crate::error::ToggleError;
use crate::exec::{self, Executor};
use crate::logging::{ChangeStatus, Log, Logger};
use crate::registry::{Category, DeviceRevision};
use crate::state::{AcceptAll, Confirm, ConfigState, ToggleOutcome};
use crate::uenv::{UenvFile, join_tokens};

/// Requested end state for every listed option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Switch the options on.
    Enable,
    /// Switch the options off.
    Disable,
}

impl Action {
    const fn wants_enabled(self) -> bool {
        matches!(self, Self::Enable)
    }
}

/// Yes/no prompt on a line-oriented terminal.
///
/// Anything starting with `y` or `Y` is a yes; everything else, including
/// end of input, is a no.
#[derive(Debug)]
pub struct TerminalPrompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> TerminalPrompt<R, W> {
    /// Prompt on the given streams.
    pub const fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl TerminalPrompt<std::io::StdinLock<'static>, std::io::Stderr> {
    /// Prompt on stdin, writing questions to stderr.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(std::io::stdin().lock(), std::io::stderr())
    }
}

impl<R: BufRead, W: Write> Confirm for TerminalPrompt<R, W> {
    fn confirm(&mut self, title: &str, prompt: &str) -> bool {
        if writeln!(self.output, "\n[{title}]\n{prompt}")
            .and_then(|()| write!(self.output, "Proceed? [y/N] "))
            .and_then(|()| self.output.flush())
            .is_err()
        {
            return false;
        }
        let mut answer = String::new();
        match self.input.read_line(&mut answer) {
            Ok(0) | Err(_) => false,
            Ok(_) => answer.trim_start().starts_with(['y', 'Y']),
        }
    }
}

/// Run the enable or disable command.
///
/// # Errors
///
/// Returns an error if setup fails, an identifier is unknown, the file
/// cannot be written, the reboot fails, or any toggle failed.
pub fn run(
    global: &GlobalOpts,
    opts: &ToggleOpts,
    action: Action,
    log: &Logger,
    executor: &dyn Executor,
) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    let mut state = ConfigState::init(&setup.registry, &setup.file, setup.revision);

    let mut terminal;
    let mut accept_all = AcceptAll;
    let confirm: Option<&mut dyn Confirm> = if opts.no_input {
        None
    } else if opts.yes {
        Some(&mut accept_all)
    } else {
        terminal = TerminalPrompt::stdio();
        Some(&mut terminal)
    };

    log.stage(match action {
        Action::Enable => "Enabling options",
        Action::Disable => "Disabling options",
    });
    let changed = apply(&mut state, &opts.ids, action, setup.revision, confirm, log)?;

    if changed == 0 {
        log.info("nothing to change");
    } else {
        log.stage("Writing configuration");
        save(&setup.uenv_path, &setup.file, &state, global.dry_run, log)?;
    }

    log.print_summary();

    let failures = log.failure_count();
    if failures > 0 {
        bail!("{failures} option(s) could not be changed");
    }

    if opts.reboot && changed > 0 {
        if global.dry_run {
            log.dry_run("would reboot");
        } else {
            log.stage("Rebooting");
            exec::reboot(executor)?;
        }
    }
    Ok(())
}

/// Bring every option in `ids` to the state `action` asks for.
///
/// Identifiers are all resolved before anything changes. Options already in
/// the requested state are skipped. A failing toggle is logged and recorded,
/// and processing continues with the next identifier.
///
/// Returns the number of options whose state changed (dependencies and
/// disabled conflicts included).
///
/// # Errors
///
/// Returns an error if any identifier is not in the registry.
pub fn apply(
    state: &mut ConfigState<'_>,
    ids: &[String],
    action: Action,
    revision: DeviceRevision,
    mut confirm: Option<&mut dyn Confirm>,
    log: &dyn Log,
) -> Result<usize> {
    let registry = state.registry();
    let unknown: Vec<&str> = ids
        .iter()
        .filter(|id| registry.find(id).is_none())
        .map(String::as_str)
        .collect();
    if !unknown.is_empty() {
        bail!("unknown option(s): {}", unknown.join(", "));
    }

    let mut changed = 0;
    for id in ids {
        let Some(index) = registry.find(id) else {
            continue;
        };
        if state.is_enabled(index) == action.wants_enabled() {
            log.debug(&format!("{id}: already {}", past_tense(action)));
            log.record_change(id, ChangeStatus::Unchanged, None);
            continue;
        }

        match state.toggle(index, revision, confirm.as_deref_mut()) {
            Ok(ToggleOutcome::Disabled) => {
                changed += 1;
                log.info(&format!("disabled {id}"));
                log.record_change(id, ChangeStatus::Disabled, None);
            }
            Ok(ToggleOutcome::Enabled {
                dependencies,
                disabled_conflicts,
            }) => {
                changed += 1 + dependencies.len() + disabled_conflicts.len();
                let mut notes = Vec::new();
                if !dependencies.is_empty() {
                    notes.push(format!("also enabled {}", names(state, &dependencies)));
                }
                if !disabled_conflicts.is_empty() {
                    notes.push(format!("disabled {}", names(state, &disabled_conflicts)));
                }
                let note = notes.join("; ");
                log.info(&format!("enabled {id}"));
                log.record_change(
                    id,
                    ChangeStatus::Enabled,
                    (!note.is_empty()).then_some(note.as_str()),
                );
            }
            Err(err @ ToggleError::UserRejected { .. }) => {
                log.warn(&err.to_string());
                log.record_change(id, ChangeStatus::Rejected, None);
            }
            Err(err) => {
                log.error(&err.to_string());
                log.record_change(id, ChangeStatus::Failed, Some(&err.to_string()));
            }
        }
    }
    Ok(changed)
}

const fn past_tense(action: Action) -> &'static str {
    match action {
        Action::Enable => "enabled",
        Action::Disable => "disabled",
    }
}

fn names(state: &ConfigState<'_>, indices: &[usize]) -> String {
    indices
        .iter()
        .filter_map(|&i| state.registry().get(i).map(|it| it.id.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Serialize `state` into the two tracked lines and rewrite `path`.
///
/// In dry-run mode the new content is printed instead and nothing is
/// written. After a real write the file is reloaded to confirm that it
/// round-trips.
///
/// # Errors
///
/// Returns an error if the file cannot be written or reloaded.
pub fn save(
    path: &Path,
    file: &UenvFile,
    state: &ConfigState<'_>,
    dry_run: bool,
    log: &dyn Log,
) -> Result<()> {
    let interface = join_tokens(&state.build_tokens(Category::Interface));
    let ext = join_tokens(&state.build_tokens(Category::Extension));

    if dry_run {
        log.dry_run(&format!("would write {}", path.display()));
        let content = file.render(&interface, &ext);
        std::io::stdout().lock().write_all(&content)?;
        return Ok(());
    }

    file.write_preserve(path, &interface, &ext)?;
    let reloaded = UenvFile::load(path)?;
    log.info(&format!(
        "{}{}",
        Category::Interface.prefix(),
        String::from_utf8_lossy(&interface)
    ));
    log.info(&format!(
        "{}{}",
        Category::Extension.prefix(),
        String::from_utf8_lossy(&ext)
    ));
    log.debug(&format!(
        "reloaded {} ({} lines)",
        path.display(),
        reloaded.lines().len()
    ));
    Ok(())
}
