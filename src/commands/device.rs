//! Command: print the detected device revision and screen.
use anyhow::{Context as _, Result};
use std::io::Write as _;

use crate::cli::GlobalOpts;
use crate::device::DeviceInfo;
use crate::logging::Logger;

/// Run the device command.
///
/// # Errors
///
/// Returns an error if the device-info block cannot be read or parsed.
pub fn run(global: &GlobalOpts, log: &Logger) -> Result<()> {
    let info = DeviceInfo::probe(&global.devcfg)
        .with_context(|| format!("probing {}", global.devcfg.display()))?;
    log.debug(&format!("probed {}", global.devcfg.display()));
    let mut out = std::io::stdout().lock();
    writeln!(out, "{}", describe(&info))?;
    if let Some(revision) = global.revision
        && revision != info.revision
    {
        log.warn(&format!("other commands use --revision ({revision}) instead of the probed value"));
    }
    Ok(())
}

/// Two-line description of a probed device.
#[must_use]
pub fn describe(info: &DeviceInfo) -> String {
    format!("Device: {}\nScreen: {}", info.revision, info.screen)
}
