//! Command-line interface definitions.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::device::DEFAULT_DEVCFG_PATH;
use crate::registry::{Category, DeviceRevision};

/// Top-level CLI entry point for the EPass boot configuration tool.
#[derive(Parser, Debug)]
#[command(
    name = "epass-config",
    about = "Enable or disable EPass hardware features in uEnv.txt",
    version
)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Options shared by every subcommand.
    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone)]
pub struct GlobalOpts {
    /// Boot configuration file (default: $EPASS_UENV_PATH or /boot/uEnv.txt)
    #[arg(long, global = true, value_name = "PATH")]
    pub uenv: Option<PathBuf>,

    /// Device revision (0.2, 0.3, 0.4, 0.5, 0.6); skips probing the device
    #[arg(long, global = true, value_name = "REV")]
    pub revision: Option<DeviceRevision>,

    /// Block device holding the device-info block
    #[arg(long, global = true, value_name = "PATH", default_value = DEFAULT_DEVCFG_PATH)]
    pub devcfg: PathBuf,

    /// TOML option catalog replacing the built-in one
    #[arg(long, global = true, value_name = "PATH")]
    pub catalog: Option<PathBuf>,

    /// Preview changes without writing the file
    #[arg(short = 'd', long, global = true)]
    pub dry_run: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List every option and whether it is enabled
    List(ListOpts),
    /// Enable options (dependencies are enabled too)
    Enable(ToggleOpts),
    /// Disable options
    Disable(ToggleOpts),
    /// Print the boot configuration file
    Show,
    /// Print the detected device revision and screen
    Device,
    /// Print version information
    Version,
}

impl Command {
    /// Short name used for the log file.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::List(_) => "list",
            Self::Enable(_) => "enable",
            Self::Disable(_) => "disable",
            Self::Show => "show",
            Self::Device => "device",
            Self::Version => "version",
        }
    }
}

/// Options for the `list` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct ListOpts {
    /// Only list one category (interface, ext)
    #[arg(long, short)]
    pub category: Option<Category>,

    /// Print machine-readable JSON
    #[arg(long)]
    pub json: bool,
}

/// Options for the `enable` and `disable` subcommands.
#[derive(Parser, Debug, Clone)]
pub struct ToggleOpts {
    /// Option identifiers
    #[arg(required = true, value_name = "ID")]
    pub ids: Vec<String>,

    /// Answer yes to every prompt
    #[arg(short, long, conflicts_with = "no_input")]
    pub yes: bool,

    /// Never prompt; enabling over a conflict then fails
    #[arg(long)]
    pub no_input: bool,

    /// Reboot after the file has been written
    #[arg(long)]
    pub reboot: bool,
}
