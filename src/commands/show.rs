//! Command: print the boot configuration file byte for byte.
use anyhow::{Context as _, Result};
use std::io::Write as _;

use super::{UENV_PATH_ENV, resolve_uenv_path};
use crate::cli::GlobalOpts;
use crate::logging::Logger;

/// Run the show command.
///
/// # Errors
///
/// Returns an error if the file cannot be read or stdout cannot be written.
pub fn run(global: &GlobalOpts, log: &Logger) -> Result<()> {
    let path = resolve_uenv_path(global.uenv.as_deref(), std::env::var(UENV_PATH_ENV).ok());
    log.debug(&format!("showing {}", path.display()));
    let content =
        std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
    let mut out = std::io::stdout().lock();
    out.write_all(&content)?;
    out.flush()?;
    Ok(())
}
