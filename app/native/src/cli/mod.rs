//! CLI module for wallspace.
//!
//! This module provides the command-line interface over the public
//! operations in [`crate::service`].

mod commands;
mod output;

use clap::Parser;
pub use commands::Cli;
use tracing_subscriber::EnvFilter;

use crate::error::WallspaceError;

/// Filter used when neither `RUST_LOG` nor `--trace` is given.
const DEFAULT_LOG_FILTER: &str = "warn";

/// Runs the CLI.
///
/// Parses command-line arguments and executes the appropriate command.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn run() -> Result<(), WallspaceError> {
    let cli = Cli::parse();
    init_tracing(cli.trace);
    cli.execute()
}

/// Installs the stderr subscriber.
///
/// `--trace` forces the `trace` level. Otherwise `RUST_LOG` is honoured and
/// the default is `warn`.
fn init_tracing(trace: bool) {
    let filter = if trace {
        EnvFilter::new("trace")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
