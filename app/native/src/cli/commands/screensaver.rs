//! Screen saver CLI commands.
//!
//! This module contains the screensaver subcommands for inspecting and
//! changing the screen saver of a display or desktop.

use clap::Subcommand;
use colored::Colorize;
use tabled::settings::object::Columns;
use tabled::settings::{Alignment, Modify, Style};
use tabled::{Table, Tabled};

use super::types::{CommitArgs, Context, TargetArgs};
use crate::cli::output;
use crate::error::WallspaceError;

/// Screen saver subcommands.
#[derive(Subcommand, Debug)]
#[command(next_display_order = None)]
pub enum ScreensaverCommands {
    /// Show the screen saver in effect.
    ///
    /// Without target flags this reports the current desktop of the first
    /// connected display.
    Get {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Set the screen saver.
    ///
    /// Accepts an installed module name, a built-in name or a bundle path.
    #[command(
        verbatim_doc_comment,
        after_long_help = r#"Examples:
  wallspace screensaver set Drift                                # All displays and desktops
  wallspace screensaver set Drift --display 2                    # Every desktop of display 2
  wallspace screensaver set Drift --desktop 3                    # Desktop 3 only
  wallspace screensaver set Drift --display 1 --desktop 2        # Desktop 2, on display 1
  wallspace screensaver set ~/Library/Screen\ Savers/Foo.saver   # A bundle by path
  wallspace screensaver set Flurry --skip-restart                # Write only, no verification"#
    )]
    Set {
        /// Module name or bundle path.
        #[arg(value_name = "NAME")]
        name: String,

        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        commit: CommitArgs,
    },

    /// List installed screen savers.
    List,
}

/// Execute screensaver subcommands.
pub fn execute(cmd: &ScreensaverCommands, ctx: &Context) -> Result<(), WallspaceError> {
    match cmd {
        ScreensaverCommands::Get { target } => execute_get(target, ctx),
        ScreensaverCommands::Set { name, target, commit } => execute_set(name, target, commit, ctx),
        ScreensaverCommands::List => execute_list(ctx),
    }
}

fn execute_get(target: &TargetArgs, ctx: &Context) -> Result<(), WallspaceError> {
    let wallspace = ctx.open()?;
    let effective = wallspace.get_effective_screensaver(&target.to_target()?)?;

    if ctx.json {
        return output::print_json(&effective);
    }

    match effective {
        Some(screensaver) => {
            println!("{}", screensaver.name.bold());
            if let Some(path) = &screensaver.path {
                println!("  {} {}", "Path:".dimmed(), path.display());
            }
            println!("  {} {}", "Provider:".dimmed(), screensaver.provider);
            println!("  {} {}", "Source:".dimmed(), screensaver.layer);
        }
        None => println!("{}", "No screen saver configured.".dimmed()),
    }
    Ok(())
}

fn execute_set(
    name: &str,
    target: &TargetArgs,
    commit: &CommitArgs,
    ctx: &Context,
) -> Result<(), WallspaceError> {
    let target = target.to_target()?;
    let wallspace = ctx.open()?;
    let module = wallspace.resolve_module(name)?;
    let report = wallspace.set_screensaver(&module, &target, &commit.options(ctx.trace))?;
    output::print_report(&report, ctx.json)
}

fn execute_list(ctx: &Context) -> Result<(), WallspaceError> {
    #[derive(Tabled)]
    struct ModuleRow {
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Kind")]
        kind: String,
        #[tabled(rename = "System")]
        system: String,
        #[tabled(rename = "Path")]
        path: String,
    }

    let modules = ctx.open()?.list_screensavers();

    if ctx.json {
        return output::print_json(&modules);
    }

    let rows: Vec<ModuleRow> = modules
        .iter()
        .map(|module| ModuleRow {
            name: module.name.clone(),
            kind: module.kind.label().to_string(),
            system: output::format_bool(module.system),
            path: output::format_optional(
                module.path.as_ref().map(|path| output::truncate(&path.display().to_string(), 60)).as_deref(),
            ),
        })
        .collect();

    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..3)).with(Alignment::center()))
        .to_string();

    println!("{}", format!("Screen savers ({})", modules.len()).bold());
    println!("{table}");
    Ok(())
}
