//! hostadm - host-local administration
//!
//! Entry point for the hostadm command-line interface.

mod cli;
mod commands;
mod output;

use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Commands};
use commands::CommandStatus;

fn main() -> ExitCode {
    // Usage errors exit with status 2 from inside clap
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.quiet);

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Backup(args) => commands::backup::run(args, config),
        Commands::User(cmd) => commands::user::run(cmd, config),
        Commands::Group(cmd) => commands::group::run(cmd, config),
    };

    match result {
        Ok(status) => status.exit_code(),
        Err(e) => {
            output::error(&format!("{:#}", e));
            CommandStatus::Failed.exit_code()
        }
    }
}

/// Initialize tracing with appropriate verbosity
fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
