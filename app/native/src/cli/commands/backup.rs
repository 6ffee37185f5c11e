//! Backup CLI commands.

use clap::Subcommand;
use colored::Colorize;

use super::types::Context;
use crate::cli::output;
use crate::error::WallspaceError;

/// Backup subcommands.
#[derive(Subcommand, Debug)]
#[command(next_display_order = None)]
pub enum BackupCommands {
    /// Show where the backup lives and when it was taken.
    Info,

    /// Restore the backup over the store.
    ///
    /// The shell is restarted afterwards so the restored document is loaded.
    Restore {
        /// Restore only; do not restart the shell.
        #[arg(long)]
        skip_restart: bool,
    },
}

/// Execute backup subcommands.
pub fn execute(cmd: &BackupCommands, ctx: &Context) -> Result<(), WallspaceError> {
    let wallspace = ctx.open()?;

    match cmd {
        BackupCommands::Info => {
            let info = wallspace.get_backup_info();
            if ctx.json {
                let mut value = serde_json::to_value(&info)?;
                value["timestamp"] = info.timestamp().map_or(serde_json::Value::Null, serde_json::Value::String);
                output::print_highlighted_json(&value);
                return Ok(());
            }

            println!("{} {}", "Backup:".bold(), info.path.display());
            println!("  {} {}", "Exists:".dimmed(), output::format_bool(info.exists));
            if info.exists {
                println!("  {} {}", "Modified:".dimmed(), output::format_optional(info.timestamp().as_deref()));
                if let Some(size) = info.size_bytes {
                    println!("  {} {size} bytes", "Size:".dimmed());
                }
            }
            Ok(())
        }
        BackupCommands::Restore { skip_restart } => {
            wallspace.restore_from_backup()?;
            println!("{} {}", "Restored:".green().bold(), wallspace.store().path().display());

            if !skip_restart {
                let count = wallspace.restart_shell()?;
                println!("{} {count} shell process(es)", "Restarted:".green().bold());
            }
            Ok(())
        }
    }
}
