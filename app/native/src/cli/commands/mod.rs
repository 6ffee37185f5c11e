//! CLI command definitions using Clap.
//!
//! This module defines all CLI commands and their arguments, organized into
//! domain-specific submodules:
//!
//! - `backup` - Store backup commands
//! - `screensaver` - Screen saver commands
//! - `topology` - Display and desktop listing
//! - `types` - Shared argument groups
//! - `wallpaper` - Wallpaper commands

use std::io;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Generator, Shell, generate};
use colored::Colorize;

use crate::cli::output;
use crate::config;
use crate::error::WallspaceError;

pub mod backup;
pub mod screensaver;
pub mod topology;
pub mod types;
pub mod wallpaper;

pub use backup::BackupCommands;
pub use screensaver::ScreensaverCommands;
use types::Context;
pub use wallpaper::WallpaperCommands;

/// Application version from Cargo.toml.
const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Wallspace CLI - per-display, per-desktop wallpaper and screen saver control.
#[derive(Parser, Debug)]
#[command(name = "wallspace")]
#[command(author, version = APP_VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to a custom configuration file.
    ///
    /// Overrides the default configuration file search paths.
    /// Supports JSONC format (JSON with comments).
    #[arg(long, short, global = true, value_name = "PATH")]
    pub config: Option<String>,

    /// Path to the wallpaper store, overriding the configured location.
    #[arg(long, global = true, value_name = "PATH", env = "WALLSPACE_STORE")]
    pub store: Option<String>,

    /// Print machine-readable JSON.
    #[arg(long, global = true)]
    pub json: bool,

    /// Log every step at trace level to stderr.
    #[arg(long, global = true)]
    pub trace: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
#[command(next_display_order = None)]
pub enum Commands {
    /// Screen saver commands.
    #[command(subcommand)]
    Screensaver(ScreensaverCommands),

    /// Wallpaper commands.
    #[command(subcommand)]
    Wallpaper(WallpaperCommands),

    /// List displays and desktops.
    ///
    /// Shows the display and desktop numbers accepted by `--display` and
    /// `--desktop`, along with their UUIDs.
    Topology,

    /// Store backup commands.
    ///
    /// A backup of the store is taken before every change.
    #[command(subcommand)]
    Backup(BackupCommands),

    /// Restart the wallpaper shell so it reloads the store.
    Restart,

    /// Output wallspace configuration JSON Schema.
    ///
    /// Outputs a JSON Schema to stdout that describes the structure of the
    /// configuration file. Can be redirected to a file for use with editors
    /// that support JSON Schema validation.
    Schema,

    /// Generate shell completions.
    ///
    /// Outputs shell completion script to stdout for the specified shell.
    ///
    /// Usage:
    ///   eval "$(wallspace completions --shell zsh)"
    ///   wallspace completions --shell fish > ~/.config/fish/completions/wallspace.fish
    Completions {
        /// The shell to generate completions for.
        #[arg(long, short, value_enum)]
        shell: Shell,
    },
}

impl Cli {
    /// Returns the custom config path if specified via --config flag.
    #[must_use]
    pub fn config_path(&self) -> Option<std::path::PathBuf> {
        self.config.as_ref().map(std::path::PathBuf::from)
    }

    fn context(&self) -> Context {
        Context { store: self.store.clone(), json: self.json, trace: self.trace }
    }

    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command execution fails.
    pub fn execute(&self) -> Result<(), WallspaceError> {
        if let Some(path_buf) = self.config_path() {
            if !path_buf.exists() {
                return Err(WallspaceError::ConfigError(format!(
                    "Configuration file not found: {}",
                    path_buf.display()
                )));
            }
            config::set_custom_config_path(path_buf);
        }

        let ctx = self.context();
        match &self.command {
            Commands::Screensaver(cmd) => screensaver::execute(cmd, &ctx),
            Commands::Wallpaper(cmd) => wallpaper::execute(cmd, &ctx),
            Commands::Topology => topology::execute(&ctx),
            Commands::Backup(cmd) => backup::execute(cmd, &ctx),

            Commands::Restart => {
                let count = ctx.open()?.restart_shell()?;
                if ctx.json {
                    return output::print_json(&serde_json::json!({ "restarted": count }));
                }
                println!("{} {count} shell process(es)", "Restarted:".green().bold());
                Ok(())
            }

            Commands::Schema => {
                println!("{}", config::schema::generate_schema_json());
                Ok(())
            }

            Commands::Completions { shell } => {
                Self::print_completions(*shell);
                Ok(())
            }
        }
    }

    /// Print shell completions to stdout.
    fn print_completions<G: Generator>(generator: G) {
        let mut cmd = Self::command();
        generate(generator, &mut cmd, "wallspace", &mut io::stdout());
    }
}
