//! Shared types for CLI commands.
//!
//! This module contains argument groups that are used across multiple CLI
//! command modules.

use std::time::Duration;

use clap::Args;

use crate::config;
use crate::error::WallspaceError;
use crate::service::{SystemWallspace, Target};
use crate::transaction::TransactionOptions;

/// Global flags every command needs to build its context.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Store path override from `--store`.
    pub store: Option<String>,
    /// Print JSON instead of tables.
    pub json: bool,
    /// Forced diagnostic tracing from `--trace`.
    pub trace: bool,
}

impl Context {
    /// Opens the wallpaper store for the current user.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the store location cannot be determined.
    pub fn open(&self) -> Result<SystemWallspace, WallspaceError> {
        SystemWallspace::from_config(config::get_config(), self.store.as_deref())
    }
}

/// Selects the display and desktop an operation applies to.
///
/// With no flags the operation applies everywhere.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetArgs {
    /// Display arrangement number (1-based).
    #[arg(long, value_name = "N")]
    pub display: Option<i32>,

    /// Global desktop number (1-based), counted across all displays.
    #[arg(long, value_name = "N")]
    pub desktop: Option<u32>,

    /// Desktop UUID. An empty value selects the default desktop.
    #[arg(long, value_name = "UUID", conflicts_with_all = ["display", "desktop"])]
    pub desktop_uuid: Option<String>,
}

impl TargetArgs {
    /// Converts the flags into a service target.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTarget` for non-positive numbers.
    pub fn to_target(&self) -> Result<Target, WallspaceError> {
        Target::from_selectors(self.display, self.desktop, self.desktop_uuid.clone())
    }
}

/// Flags controlling how a change is committed.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitArgs {
    /// Write the store without restarting the shell or verifying the change.
    #[arg(long)]
    pub skip_restart: bool,

    /// Milliseconds to wait after the restart before verifying.
    ///
    /// Overrides `settleDelayMs` from the configuration file.
    #[arg(long, value_name = "MS")]
    pub settle_ms: Option<u64>,
}

impl CommitArgs {
    /// Builds transaction options from these flags and the configuration.
    #[must_use]
    pub fn options(&self, trace: bool) -> TransactionOptions {
        let settle = self.settle_ms.map_or_else(|| config::get_config().settle_delay(), Duration::from_millis);
        TransactionOptions { skip_restart: self.skip_restart, trace, settle }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_args_default_is_everywhere() {
        assert_eq!(TargetArgs::default().to_target().unwrap(), Target::Everywhere);
    }

    #[test]
    fn test_target_args_display_and_desktop() {
        let args = TargetArgs { display: Some(2), desktop: Some(5), desktop_uuid: None };
        assert_eq!(args.to_target().unwrap(), Target::DisplayDesktop { display: 2, desktop: 5 });
    }

    #[test]
    fn test_target_args_rejects_zero_display() {
        let args = TargetArgs { display: Some(0), ..TargetArgs::default() };
        assert!(matches!(args.to_target(), Err(WallspaceError::InvalidTarget(_))));
    }

    #[test]
    fn test_target_args_empty_uuid_is_default_desktop() {
        let args = TargetArgs { desktop_uuid: Some(String::new()), ..TargetArgs::default() };
        assert_eq!(args.to_target().unwrap(), Target::DesktopUuid { uuid: String::new() });
    }

    #[test]
    fn test_commit_args_settle_override() {
        let args = CommitArgs { skip_restart: true, settle_ms: Some(250) };
        let options = args.options(true);
        assert!(options.skip_restart);
        assert!(options.trace);
        assert_eq!(options.settle, Duration::from_millis(250));
    }
}
