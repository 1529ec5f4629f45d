//! Tracing subscriber: console output, the per-command log file, and setup.
//!
//! Library modules log with structured fields (`path`, `revision`,
//! `option`, ...). Both outputs keep those fields: the console shows them
//! on debug lines, the file on every line.
use std::fmt::{self, Write as _};
use std::fs;
use std::io::Write as _;
use std::sync::Mutex;

use tracing::Level;
use tracing::field::{Field, Visit};

use super::utils::{HEADER_TIME, LINE_TIME, clean_for_file, log_file_path, utc_now};
use super::{DRY_RUN_TARGET, STAGE_TARGET};

/// Message and remaining fields of one event.
#[derive(Debug, Default)]
struct EventFields {
    message: String,
    fields: Vec<(&'static str, String)>,
}

impl EventFields {
    fn from_event(event: &tracing::Event<'_>) -> Self {
        let mut fields = Self::default();
        event.record(&mut fields);
        fields
    }

    /// `message key=value ...`
    fn render(&self) -> String {
        let mut out = self.message.clone();
        for (name, value) in &self.fields {
            if !out.is_empty() {
                out.push(' ');
            }
            let _ = write!(out, "{name}={value}");
        }
        out
    }
}

impl Visit for EventFields {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.fields.push((field.name(), format!("{value:?}")));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push((field.name(), value.to_string()));
        }
    }
}

/// Kind of line an event turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    Stage,
    DryRun,
    Error,
    Warn,
    Info,
    Debug,
}

impl LineKind {
    fn of(level: Level, target: &str) -> Self {
        match level {
            Level::ERROR => Self::Error,
            Level::WARN => Self::Warn,
            Level::INFO if target == STAGE_TARGET => Self::Stage,
            Level::INFO if target == DRY_RUN_TARGET => Self::DryRun,
            Level::INFO => Self::Info,
            _ => Self::Debug,
        }
    }
}

/// One line of the log file (without timestamp).
fn file_line(kind: LineKind, target: &str, event: &EventFields) -> String {
    let text = clean_for_file(&event.render());
    match kind {
        LineKind::Stage => format!("## {text}"),
        LineKind::DryRun => format!("dry-run {text}"),
        LineKind::Error => format!("ERROR {text}"),
        LineKind::Warn => format!("WARN  {text}"),
        LineKind::Info => format!("INFO  {text}"),
        LineKind::Debug => format!("DEBUG {target}: {text}"),
    }
}

/// One line of console output.
fn console_line(kind: LineKind, event: &EventFields) -> String {
    let msg = &event.message;
    match kind {
        LineKind::Stage => format!("\x1b[1;36m::\x1b[0m \x1b[1m{msg}\x1b[0m"),
        LineKind::DryRun => format!("  \x1b[35m(dry run)\x1b[0m {msg}"),
        LineKind::Error => format!("\x1b[1;31merror:\x1b[0m {msg}"),
        LineKind::Warn => format!("\x1b[1;33mwarning:\x1b[0m {msg}"),
        LineKind::Info => format!("  {msg}"),
        LineKind::Debug => format!("  \x1b[2m{}\x1b[0m", event.render()),
    }
}

/// Header written at the top of a fresh log file.
fn file_header(command: &str, version: &str, started: &str, context: &[(&str, String)]) -> String {
    let mut header = format!("# epass-config {version}: {command} at {started}\n");
    for (key, value) in context {
        let _ = writeln!(header, "# {key}: {}", clean_for_file(value));
    }
    header
}

/// A [`tracing_subscriber::Layer`] that appends every event to the command's
/// log file.
///
/// Always captures `DEBUG` and above, whatever the console verbosity.
#[derive(Debug)]
pub(super) struct FileLayer {
    file: Mutex<fs::File>,
}

impl FileLayer {
    /// Truncate the log file for `command`, write the run header with
    /// `context`, and keep the file open for appending.
    ///
    /// Returns `None` if the file cannot be created; logging then goes to
    /// the console only.
    pub(super) fn new(command: &str, context: &[(&str, String)]) -> Option<Self> {
        let path = log_file_path(command)?;
        let version = option_env!("EPASS_CONFIG_VERSION")
            .unwrap_or(concat!("dev-", env!("CARGO_PKG_VERSION")));
        let header = file_header(command, version, &utc_now(HEADER_TIME), context);
        fs::write(&path, header).ok()?;
        let file = fs::OpenOptions::new().append(true).open(&path).ok()?;
        Some(Self {
            file: Mutex::new(file),
        })
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for FileLayer {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let metadata = event.metadata();
        let kind = LineKind::of(*metadata.level(), metadata.target());
        let line = file_line(kind, metadata.target(), &EventFields::from_event(event));
        if let Ok(mut f) = self.file.lock() {
            writeln!(f, "[{}] {line}", utc_now(LINE_TIME)).ok();
        }
    }
}

/// Console [`FormatEvent`](tracing_subscriber::fmt::FormatEvent).
struct ConsoleFormatter;

impl<S, N> tracing_subscriber::fmt::FormatEvent<S, N> for ConsoleFormatter
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    N: for<'a> tracing_subscriber::fmt::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: tracing_subscriber::fmt::format::Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        let kind = LineKind::of(*metadata.level(), metadata.target());
        writeln!(writer, "{}", console_line(kind, &EventFields::from_event(event)))
    }
}

/// Initialise the global [`tracing`] subscriber.
///
/// Warnings and errors go to stderr, everything else to stdout. Every event
/// at `DEBUG` and above is also appended to
/// `$XDG_CACHE_HOME/epass-config/<command>.log`, whose header lists
/// `context` (uEnv path, revision source, ...). Call once at startup.
pub fn init_subscriber(verbose: bool, command: &str, context: &[(&str, String)]) {
    use tracing_subscriber::fmt::writer::MakeWriterExt as _;
    use tracing_subscriber::{
        Layer as _, filter::LevelFilter, fmt, layer::SubscriberExt as _,
        util::SubscriberInitExt as _,
    };

    let console_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    let make_writer = std::io::stderr
        .with_max_level(Level::WARN)
        .and(std::io::stdout.with_min_level(Level::INFO));

    let console_layer = fmt::layer()
        .event_format(ConsoleFormatter)
        .with_writer(make_writer)
        .with_filter(console_level);

    let file_layer = FileLayer::new(command, context).map(|l| l.with_filter(LevelFilter::DEBUG));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn event(message: &str, fields: &[(&'static str, &str)]) -> EventFields {
        EventFields {
            message: message.to_string(),
            fields: fields.iter().map(|&(k, v)| (k, v.to_string())).collect(),
        }
    }

    #[test]
    fn kinds_follow_level_and_target() {
        assert_eq!(LineKind::of(Level::INFO, STAGE_TARGET), LineKind::Stage);
        assert_eq!(LineKind::of(Level::INFO, DRY_RUN_TARGET), LineKind::DryRun);
        assert_eq!(LineKind::of(Level::INFO, "epass_config::uenv"), LineKind::Info);
        assert_eq!(LineKind::of(Level::WARN, STAGE_TARGET), LineKind::Warn);
        assert_eq!(LineKind::of(Level::TRACE, "x"), LineKind::Debug);
    }

    #[test]
    fn file_line_keeps_structured_fields() {
        let ev = event("uEnv written", &[("path", "/boot/uEnv.txt"), ("bytes", "64")]);
        assert_eq!(
            file_line(LineKind::Debug, "epass_config::uenv", &ev),
            "DEBUG epass_config::uenv: uEnv written path=/boot/uEnv.txt bytes=64"
        );
    }

    #[test]
    fn file_line_escapes_raw_token_bytes() {
        let ev = event("interface=i2c0 a\rb", &[]);
        assert_eq!(
            file_line(LineKind::Info, "epass_config", &ev),
            "INFO  interface=i2c0 a\\x0db"
        );
    }

    #[test]
    fn fields_only_event_renders_without_leading_space() {
        let ev = event("", &[("option", "cardkb")]);
        assert_eq!(ev.render(), "option=cardkb");
    }

    #[test]
    fn console_shows_fields_on_debug_only() {
        let ev = event("enabled", &[("option", "spi1")]);
        assert_eq!(console_line(LineKind::Info, &ev), "  enabled");
        assert_eq!(
            console_line(LineKind::Debug, &ev),
            "  \x1b[2menabled option=spi1\x1b[0m"
        );
        assert_eq!(
            console_line(LineKind::Warn, &event("no reboot", &[])),
            "\x1b[1;33mwarning:\x1b[0m no reboot"
        );
    }

    #[test]
    fn header_lists_session_context() {
        let context = [
            ("uenv", "/boot/uEnv.txt".to_string()),
            ("revision", "probe /dev/mtdblock0".to_string()),
        ];
        insta::assert_snapshot!(
            file_header("enable", "1.2.0", "2026-01-02T03:04:05Z", &context),
            @r"
        # epass-config 1.2.0: enable at 2026-01-02T03:04:05Z
        # uenv: /boot/uEnv.txt
        # revision: probe /dev/mtdblock0
        "
        );
    }
}
