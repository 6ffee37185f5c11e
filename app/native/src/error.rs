//! Error types for Wallspace.
//!
//! This module provides the unified error type used throughout the crate.
//! Read-side resolution failures are absorbed layer by layer and never reach
//! this type; everything on the mutation and transaction path propagates it.

use serde::Serialize;
use thiserror::Error;

/// Result type alias for Wallspace operations.
pub type Result<T> = std::result::Result<T, WallspaceError>;

/// Errors that can occur while reading, mutating or committing the wallpaper store.
///
/// Implements `Serialize` so the CLI can report failures as structured JSON.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "kind", content = "message")]
pub enum WallspaceError {
    /// The store document is missing or could not be decoded.
    #[error("Read error: {0}")]
    ReadError(String),
    /// Serialization or filesystem failure while writing the store.
    #[error("Write error: {0}")]
    WriteError(String),
    /// The named screen saver has no resolvable path.
    #[error("Screen saver module not found: {0}")]
    ModuleNotFound(String),
    /// No connected display carries the requested arrangement number.
    #[error("Display {0} not found")]
    DisplayNotFound(i32),
    /// No desktop carries the requested global desktop number.
    #[error("Desktop {0} not found")]
    DesktopNotFound(u32),
    /// The desktop number does not exist on the requested display.
    #[error("Desktop {desktop} not found on display {display}")]
    DesktopNotFoundOnDisplay {
        /// The 1-based display arrangement number.
        display: i32,
        /// The global desktop number.
        desktop: u32,
    },
    /// The target is malformed or not usable for this operation.
    #[error("Invalid target: {0}")]
    InvalidTarget(String),
    /// A restore was requested but no backup exists.
    #[error("No backup found at {0}")]
    BackupNotFound(String),
    /// The live space/display enumeration failed.
    #[error("Topology error: {0}")]
    TopologyError(String),
    /// Restarting the shell process failed.
    #[error("Shell error: {0}")]
    ShellError(String),
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
    /// A change was written but did not take effect and the backup was restored.
    #[error("Change rolled back: {0}")]
    RolledBack(String),
    /// Invalid command arguments.
    #[error("{0}")]
    InvalidArguments(String),
    /// IO error.
    #[error("IO error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for WallspaceError {
    fn from(err: std::io::Error) -> Self { Self::IoError(err.to_string()) }
}

impl From<serde_json::Error> for WallspaceError {
    fn from(err: serde_json::Error) -> Self { Self::WriteError(err.to_string()) }
}
