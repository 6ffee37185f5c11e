//! Wallspace - per-display, per-desktop wallpaper and screen saver control for macOS.
//!
//! This library reads and edits the wallpaper store, the property list the
//! system wallpaper shell loads its configuration from. Reads resolve the
//! value in effect for a display or desktop through the store's layered
//! defaults. Writes go through a transaction that backs up the store,
//! restarts the shell and verifies the change, restoring the backup if the
//! change did not take effect.
//!
//! The CLI in [`cli`] is a thin layer over [`service::Wallspace`].

pub mod catalog;
pub mod cli;
pub mod codec;
pub mod config;
pub mod error;
pub mod mutator;
pub mod platform;
pub mod resolver;
pub mod service;
pub mod shell;
pub mod store;
pub mod topology;
pub mod transaction;

pub use error::{Result, WallspaceError};
pub use service::{ImageDescriptor, SystemWallspace, Target, Wallspace};
pub use transaction::{TransactionOptions, TransactionReport, TransactionStatus};
