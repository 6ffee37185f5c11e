//! Wallpaper CLI commands.
//!
//! This module contains the wallpaper subcommands for inspecting and changing
//! the desktop picture of a display or desktop.

use clap::Subcommand;
use colored::Colorize;

use super::types::{CommitArgs, Context, TargetArgs};
use crate::cli::output;
use crate::error::WallspaceError;
use crate::service::ImageDescriptor;

/// Wallpaper subcommands.
#[derive(Subcommand, Debug)]
#[command(next_display_order = None)]
pub enum WallpaperCommands {
    /// Show the wallpaper in effect.
    Get {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Set the desktop wallpaper.
    #[command(
        verbatim_doc_comment,
        after_long_help = r#"Examples:
  wallspace wallpaper set ~/Pictures/dune.jpg                      # All displays and desktops
  wallspace wallpaper set ~/Pictures/dune.jpg --display 2          # Every desktop of display 2
  wallspace wallpaper set ~/Pictures/dune.jpg --desktop 4          # Desktop 4 only
  wallspace wallpaper set ~/Pictures/dune.jpg --style fit          # Fit to screen"#
    )]
    Set {
        /// The path to the image to use as wallpaper.
        #[arg(value_name = "PATH")]
        path: String,

        /// How the image is scaled: fill, fit, stretch, center or tile.
        #[arg(long, value_name = "STYLE")]
        style: Option<String>,

        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        commit: CommitArgs,
    },
}

/// Execute wallpaper subcommands.
pub fn execute(cmd: &WallpaperCommands, ctx: &Context) -> Result<(), WallspaceError> {
    match cmd {
        WallpaperCommands::Get { target } => execute_get(target, ctx),
        WallpaperCommands::Set { path, style, target, commit } => {
            execute_set(path, style.clone(), target, commit, ctx)
        }
    }
}

fn execute_get(target: &TargetArgs, ctx: &Context) -> Result<(), WallspaceError> {
    let wallspace = ctx.open()?;
    let effective = wallspace.get_effective_wallpaper(&target.to_target()?)?;

    if ctx.json {
        return output::print_json(&effective);
    }

    match effective {
        Some(wallpaper) => {
            println!("{}", wallpaper.name.bold());
            println!("  {} {}", "Provider:".dimmed(), wallpaper.provider);
            println!("  {} {}", "Style:".dimmed(), output::format_optional(wallpaper.style.as_deref()));
            println!("  {} {}", "Source:".dimmed(), wallpaper.layer);
        }
        None => println!("{}", "No wallpaper configured.".dimmed()),
    }
    Ok(())
}

fn execute_set(
    path: &str,
    style: Option<String>,
    target: &TargetArgs,
    commit: &CommitArgs,
    ctx: &Context,
) -> Result<(), WallspaceError> {
    let target = target.to_target()?;
    let image = ImageDescriptor::from_path(path, style)?;
    let report = ctx.open()?.set_wallpaper(&image, &target, &commit.options(ctx.trace))?;
    output::print_report(&report, ctx.json)
}
