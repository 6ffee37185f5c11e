//! Configuration store: loading and saving the wallpaper store document.
//!
//! The store is pure I/O. Every save over an existing document first copies
//! it to a sibling `.backup` file (one backup is kept; a new backup replaces
//! the old one). Backup failures are logged and ignored by [`Store::save`];
//! the transaction path uses [`Store::backup`] directly and treats them as
//! fatal.

pub mod location;
pub mod tree;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::Serialize;
use tempfile::NamedTempFile;
pub use tree::{
    Choice, ConfigurationTree, Content, DEFAULT_SPACE_KEY, DisplayConfig, Slot, SpaceConfig,
    is_valid_uuid,
};

use crate::error::{Result, WallspaceError};
use crate::platform::path::with_suffix;

/// Suffix of the backup file written next to the store.
pub const BACKUP_SUFFIX: &str = ".backup";

/// Metadata about the current backup file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupInfo {
    pub path: PathBuf,
    pub exists: bool,
    #[serde(skip)]
    pub modified: Option<SystemTime>,
    pub size_bytes: Option<u64>,
}

impl BackupInfo {
    /// Modification time of the backup as an ISO 8601 string.
    #[must_use]
    pub fn timestamp(&self) -> Option<String> {
        self.modified.map(|time| plist::Date::from(time).to_xml_format())
    }
}

/// Handle to the store document at a fixed path.
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
}

impl Store {
    /// Creates a store handle for `path`. Nothing is read until [`Store::load`].
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }

    /// Path of the live document.
    #[must_use]
    pub fn path(&self) -> &Path { &self.path }

    /// Path of the backup document.
    #[must_use]
    pub fn backup_path(&self) -> PathBuf { with_suffix(&self.path, BACKUP_SUFFIX) }

    /// Reads and decodes the live document.
    ///
    /// # Errors
    ///
    /// Returns `ReadError` if the document is missing or corrupt.
    pub fn load(&self) -> Result<ConfigurationTree> {
        if !self.path.exists() {
            return Err(WallspaceError::ReadError(format!(
                "store not found at {}",
                self.path.display()
            )));
        }

        plist::from_file(&self.path).map_err(|err| {
            WallspaceError::ReadError(format!("failed to decode {}: {err}", self.path.display()))
        })
    }

    /// Backs up the current document (best effort) and writes `tree`.
    ///
    /// # Errors
    ///
    /// Returns `WriteError` if serialization or the write fails.
    pub fn save(&self, tree: &ConfigurationTree) -> Result<()> {
        if self.path.exists()
            && let Err(err) = self.backup()
        {
            tracing::warn!(error = %err, "store: backup failed, writing anyway");
        }

        self.write(tree)
    }

    /// Copies the live document over the backup file.
    ///
    /// # Errors
    ///
    /// Returns `WriteError` if the copy fails.
    pub fn backup(&self) -> Result<u64> {
        let backup = self.backup_path();
        let bytes = fs::copy(&self.path, &backup).map_err(|err| {
            WallspaceError::WriteError(format!("failed to back up to {}: {err}", backup.display()))
        })?;
        tracing::debug!(path = %backup.display(), bytes, "store: backup written");
        Ok(bytes)
    }

    /// Writes `tree` as a binary property list without taking a backup.
    ///
    /// Parent directories are created when missing. The document is written to
    /// a temporary file in the same directory and renamed over the live path.
    ///
    /// # Errors
    ///
    /// Returns `WriteError` if serialization or any filesystem step fails.
    pub fn write(&self, tree: &ConfigurationTree) -> Result<()> {
        let parent = self
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent).map_err(|err| write_error(parent, &err))?;

        let mut file = NamedTempFile::new_in(parent).map_err(|err| write_error(parent, &err))?;
        plist::to_writer_binary(&mut file, tree)
            .map_err(|err| WallspaceError::WriteError(format!("failed to encode store: {err}")))?;
        file.persist(&self.path).map_err(|err| write_error(&self.path, &err.error))?;

        tracing::debug!(path = %self.path.display(), "store: document written");
        Ok(())
    }

    /// Restores the backup over the live document.
    ///
    /// # Errors
    ///
    /// Returns `BackupNotFound` if there is no backup, `WriteError` if the copy fails.
    pub fn restore(&self) -> Result<()> {
        let backup = self.backup_path();
        if !backup.exists() {
            return Err(WallspaceError::BackupNotFound(backup.display().to_string()));
        }

        fs::copy(&backup, &self.path).map_err(|err| write_error(&self.path, &err))?;
        tracing::info!(path = %self.path.display(), "store: restored from backup");
        Ok(())
    }

    /// Describes the current backup file.
    #[must_use]
    pub fn backup_info(&self) -> BackupInfo {
        let path = self.backup_path();
        match fs::metadata(&path) {
            Ok(metadata) => BackupInfo {
                path,
                exists: true,
                modified: metadata.modified().ok(),
                size_bytes: Some(metadata.len()),
            },
            Err(_) => BackupInfo { path, exists: false, modified: None, size_bytes: None },
        }
    }
}

fn write_error(path: &Path, err: &std::io::Error) -> WallspaceError {
    WallspaceError::WriteError(format!("{}: {err}", path.display()))
}
