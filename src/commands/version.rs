//! Command: print version information.
use anyhow::Result;
use std::io::Write as _;

/// Version string baked in at build time, or the crate version.
#[must_use]
pub fn version() -> &'static str {
    option_env!("EPASS_CONFIG_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
}

/// Print the version to stdout.
///
/// # Errors
///
/// Returns an error if stdout cannot be written.
pub fn run() -> Result<()> {
    writeln!(std::io::stdout().lock(), "epass-config {}", version())?;
    Ok(())
}
