//! Log file location, message cleaning and timestamps.
use std::ffi::OsString;
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

/// Timestamp format of the file header.
pub(super) const HEADER_TIME: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Timestamp format of each log line.
pub(super) const LINE_TIME: &str = "%H:%M:%S%.3f";

/// Make a message safe for the plain-text log file.
///
/// Colour sequences (`ESC [ ... m`) written by the summary are dropped.
/// Any other control character, including bytes that came from a uEnv
/// token, is written as `\xNN` so the file stays one event per line.
pub(super) fn clean_for_file(msg: &str) -> String {
    let mut out = String::with_capacity(msg.len());
    let mut chars = msg.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\x1b' && chars.peek() == Some(&'[') {
            let mut params = String::new();
            chars.next();
            while let Some(&p) = chars.peek() {
                if p.is_ascii_digit() || p == ';' {
                    params.push(p);
                    chars.next();
                } else {
                    break;
                }
            }
            if chars.peek() == Some(&'m') {
                chars.next();
                continue;
            }
            out.push_str("\\x1b[");
            out.push_str(&params);
        } else if c.is_control() && c != '\t' {
            let _ = write!(out, "\\x{:02x}", u32::from(c));
        } else {
            out.push(c);
        }
    }
    out
}

/// Root of the cache directory: `$XDG_CACHE_HOME` when it is an absolute
/// path, else `$HOME/.cache`, else the system temp directory.
pub(super) fn cache_root(xdg_cache_home: Option<OsString>, home: Option<OsString>) -> PathBuf {
    xdg_cache_home
        .map(PathBuf::from)
        .filter(|p| p.is_absolute())
        .or_else(|| {
            home.filter(|h| !h.is_empty())
                .map(|h| PathBuf::from(h).join(".cache"))
        })
        .unwrap_or_else(std::env::temp_dir)
}

/// Return the `epass-config` cache directory, creating it if needed.
pub(super) fn cache_dir() -> Option<PathBuf> {
    let dir = cache_root(
        std::env::var_os("XDG_CACHE_HOME"),
        std::env::var_os("HOME"),
    )
    .join("epass-config");
    fs::create_dir_all(&dir).ok()?;
    Some(dir)
}

/// Log file of one subcommand, e.g. `~/.cache/epass-config/enable.log`.
pub(super) fn log_file_path(command: &str) -> Option<PathBuf> {
    Some(cache_dir()?.join(format!("{command}.log")))
}

/// Current UTC time in `format`.
pub(super) fn utc_now(format: &str) -> String {
    chrono::Utc::now().format(format).to_string()
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn colours_are_dropped() {
        assert_eq!(
            clean_for_file("\x1b[32m+ cardkb (also enabled i2c0)\x1b[0m"),
            "+ cardkb (also enabled i2c0)"
        );
        assert_eq!(clean_for_file("\x1b[1;31merror:\x1b[0m x"), "error: x");
    }

    #[test]
    fn control_characters_are_escaped() {
        assert_eq!(clean_for_file("interface=a\rb"), "interface=a\\x0db");
        assert_eq!(clean_for_file("two\nlines"), "two\\x0alines");
        assert_eq!(clean_for_file("tab\tkept"), "tab\tkept");
    }

    #[test]
    fn non_colour_escape_is_made_visible() {
        assert_eq!(clean_for_file("\x1b[2Jboom"), "\\x1b[2Jboom");
        assert_eq!(clean_for_file("\x1bMx"), "\\x1bMx");
    }

    #[test]
    fn replacement_characters_pass_through() {
        assert_eq!(clean_for_file("caf\u{fffd}"), "caf\u{fffd}");
    }

    #[test]
    fn cache_root_prefers_absolute_xdg() {
        assert_eq!(
            cache_root(Some("/var/cache".into()), Some("/root".into())),
            PathBuf::from("/var/cache")
        );
    }

    #[test]
    fn cache_root_ignores_relative_xdg() {
        assert_eq!(
            cache_root(Some("cache".into()), Some("/home/pi".into())),
            PathBuf::from("/home/pi/.cache")
        );
    }

    #[test]
    fn cache_root_falls_back_to_temp_dir() {
        assert_eq!(cache_root(None, Some(OsString::new())), std::env::temp_dir());
        assert_eq!(cache_root(None, None), std::env::temp_dir());
    }

    #[test]
    fn timestamps_follow_formats() {
        let header = utc_now(HEADER_TIME);
        assert_eq!(header.len(), 20, "{header}");
        assert!(header.ends_with('Z'));
        let line = utc_now(LINE_TIME);
        assert_eq!(line.len(), 12, "{line}");
        assert_eq!(&line[8..9], ".");
    }
}
