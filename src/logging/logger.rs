//! Structured logger with dry-run awareness and summary collection.
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Mutex;

use super::types::{ChangeEntry, ChangeStatus, Log};
use super::utils::log_file_path;
use super::{DRY_RUN_TARGET, STAGE_TARGET};

/// Implement the display methods of [`Log`] by delegating to inherent methods
/// of the same name on the implementing type.
///
/// The `record_change` method is **not** included because its signature
/// differs from the `fn(&self, &str)` pattern shared by the display methods.
macro_rules! forward_log_methods {
    ($($method:ident),+ $(,)?) => {
        $(
            fn $method(&self, msg: &str) {
                self.$method(msg);
            }
        )+
    };
}

/// Structured logger with dry-run awareness and summary collection.
///
/// All messages are always written to a persistent log file at
/// `$XDG_CACHE_HOME/epass-config/<command>.log` (default
/// `~/.cache/epass-config/<command>.log`) with timestamps and ANSI codes
/// stripped, regardless of the verbose flag.
#[derive(Debug)]
pub struct Logger {
    changes: Mutex<Vec<ChangeEntry>>,
    log_file: Option<PathBuf>,
}

impl Logger {
    /// Create a new logger.
    ///
    /// Stores the log file path for display in the run summary. The log file
    /// itself is created by [`init_subscriber`](super::subscriber::init_subscriber);
    /// this constructor does not write to the file.
    #[must_use]
    pub fn new(command: &str) -> Self {
        Self {
            changes: Mutex::new(Vec::new()),
            log_file: log_file_path(command),
        }
    }

    /// Return the log file path, if available.
    #[cfg(test)]
    pub const fn log_path(&self) -> Option<&PathBuf> {
        self.log_file.as_ref()
    }

    /// Return a clone of all recorded change entries.
    #[must_use]
    pub fn changes(&self) -> Vec<ChangeEntry> {
        self.changes.lock().map_or_else(|_| vec![], |g| g.clone())
    }

    /// Log an error message.
    pub fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    /// Log a warning message.
    pub fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    /// Log a stage header (major section).
    pub fn stage(&self, msg: &str) {
        tracing::info!(target: STAGE_TARGET, "{msg}");
    }

    /// Log an informational message.
    pub fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    /// Log a debug message (suppressed on console unless verbose; always
    /// written to the log file).
    pub fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    /// Log a dry-run action message.
    pub fn dry_run(&self, msg: &str) {
        tracing::info!(target: DRY_RUN_TARGET, "{msg}");
    }

    /// Record an option change for the summary.
    pub fn record_change(&self, option: &str, status: ChangeStatus, message: Option<&str>) {
        if let Ok(mut guard) = self.changes.lock() {
            guard.push(ChangeEntry {
                option: option.to_string(),
                status,
                message: message.map(String::from),
            });
        }
    }

    /// Return `true` if any recorded change was rejected or failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failure_count() > 0
    }

    /// Count the changes that were rejected or failed.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.changes.lock().map_or(0, |guard| {
            guard
                .iter()
                .filter(|c| matches!(c.status, ChangeStatus::Failed | ChangeStatus::Rejected))
                .count()
        })
    }

    /// Print the summary of all recorded changes.
    pub fn print_summary(&self) {
        let changes = match self.changes.lock() {
            Ok(guard) => guard.clone(),
            Err(_) => return,
        };
        if changes.is_empty() {
            return;
        }

        writeln!(std::io::stdout()).ok();
        self.stage("Summary");

        let mut enabled = 0u32;
        let mut disabled = 0u32;
        let mut unchanged = 0u32;
        let mut rejected = 0u32;
        let mut failed = 0u32;

        for change in &changes {
            let (icon, color) = match change.status {
                ChangeStatus::Enabled => {
                    enabled += 1;
                    ("+", "\x1b[32m")
                }
                ChangeStatus::Disabled => {
                    disabled += 1;
                    ("-", "\x1b[33m")
                }
                ChangeStatus::Unchanged => {
                    unchanged += 1;
                    ("·", "\x1b[2m")
                }
                ChangeStatus::Rejected => {
                    rejected += 1;
                    ("○", "\x1b[37m")
                }
                ChangeStatus::Failed => {
                    failed += 1;
                    ("✗", "\x1b[31m")
                }
            };

            let suffix = change
                .message
                .as_ref()
                .map_or_else(String::new, |msg| format!(" ({msg})"));

            self.info(&format!("{color}{icon} {}{suffix}\x1b[0m", change.option));
        }

        self.info(&format!(
            "\x1b[32m{enabled} enabled\x1b[0m, \x1b[33m{disabled} disabled\x1b[0m, \x1b[2m{unchanged} unchanged\x1b[0m, \x1b[37m{rejected} rejected\x1b[0m, \x1b[31m{failed} failed\x1b[0m"
        ));

        if let Some(path) = &self.log_file {
            self.info(&format!("\x1b[2mlog: {}\x1b[0m", path.display()));
        }
    }
}

impl Log for Logger {
    forward_log_methods!(stage, info, debug, warn, error, dry_run);

    fn record_change(&self, option: &str, status: ChangeStatus, message: Option<&str>) {
        self.record_change(option, status, message);
    }
}
