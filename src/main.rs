//! Command-line entry point for epass-config.

use anyhow::Result;
use clap::Parser;

use epass_config::cli::{Cli, Command};
use epass_config::commands::{self, toggle::Action};
use epass_config::exec::SystemExecutor;
use epass_config::logging::{Logger, init_subscriber};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = Cli::parse();
    init_subscriber(
        args.verbose,
        args.command.name(),
        &commands::session_context(&args.global),
    );
    let log = Logger::new(args.command.name());

    match args.command {
        Command::List(opts) => commands::list::run(&args.global, &opts, &log),
        Command::Enable(opts) => {
            commands::toggle::run(&args.global, &opts, Action::Enable, &log, &SystemExecutor)
        }
        Command::Disable(opts) => {
            commands::toggle::run(&args.global, &opts, Action::Disable, &log, &SystemExecutor)
        }
        Command::Show => commands::show::run(&args.global, &log),
        Command::Device => commands::device::run(&args.global, &log),
        Command::Version => commands::version::run(),
    }
}
