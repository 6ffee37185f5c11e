//! Configuration types for wallspace.
//!
//! The configuration file is optional. Every field has a default, so an
//! empty object (or no file at all) yields a working setup.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::platform::path::expand;
use crate::shell::DEFAULT_SHELL_PROCESS;

/// Default wait after restarting the shell, in milliseconds.
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 3000;

/// Configuration file names, in order of preference.
const CONFIG_FILE_NAMES: &[&str] = &["config.jsonc", "config.json"];

/// Legacy dotfile names in the home directory.
const LEGACY_CONFIG_FILE_NAMES: &[&str] = &[".wallspace.jsonc", ".wallspace.json"];

const APP_DIR: &str = "wallspace";

fn default_settle_delay_ms() -> u64 { DEFAULT_SETTLE_DELAY_MS }

fn default_shell_processes() -> Vec<String> { vec![DEFAULT_SHELL_PROCESS.to_string()] }

/// Root configuration structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct WallspaceConfig {
    /// Path of the wallpaper store document.
    ///
    /// Defaults to the store location of the running macOS release. Supports `~`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_path: Option<String>,

    /// Milliseconds to wait after restarting the wallpaper shell before
    /// verifying a change.
    ///
    /// Default: 3000
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Names of the processes to terminate when the shell must reload the store.
    ///
    /// Default: `["WallpaperAgent"]`
    #[serde(default = "default_shell_processes")]
    pub shell_processes: Vec<String>,

    /// Additional directories searched for screen saver modules. Supports `~`.
    ///
    /// Example:
    /// ```json
    /// {
    ///   "screenSaverDirectories": ["~/Downloads/Savers"]
    /// }
    /// ```
    pub screen_saver_directories: Vec<String>,
}

impl Default for WallspaceConfig {
    fn default() -> Self {
        Self {
            store_path: None,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            shell_processes: default_shell_processes(),
            screen_saver_directories: Vec::new(),
        }
    }
}

impl WallspaceConfig {
    /// Settle delay as a duration.
    #[must_use]
    pub const fn settle_delay(&self) -> Duration { Duration::from_millis(self.settle_delay_ms) }

    /// Extra screen saver directories with `~` expanded; blank entries are dropped.
    #[must_use]
    pub fn screen_saver_directories(&self) -> Vec<PathBuf> {
        self.screen_saver_directories
            .iter()
            .map(|dir| expand(dir))
            .filter(|dir| !dir.as_os_str().is_empty())
            .collect()
    }
}

/// Errors that can occur when loading the configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// No configuration file was found in any of the expected locations.
    NotFound,
    /// The configuration file exists but could not be read.
    IoError(std::io::Error),
    /// The configuration file contains invalid JSON.
    ParseError(serde_json::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(
                f,
                "No configuration file found. Expected at ~/.config/wallspace/config.jsonc, \
                ~/Library/Application Support/wallspace/config.jsonc, or ~/.wallspace.jsonc"
            ),
            Self::IoError(err) => write!(f, "Failed to read configuration file: {err}"),
            Self::ParseError(err) => write!(f, "Failed to parse configuration file: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::NotFound => None,
            Self::IoError(err) => Some(err),
            Self::ParseError(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self { Self::IoError(err) }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self { Self::ParseError(err) }
}

/// Returns the candidate configuration file paths, in search order.
///
/// 1. `$XDG_CONFIG_HOME/wallspace/`
/// 2. `~/.config/wallspace/`
/// 3. `~/Library/Application Support/wallspace/`
/// 4. `~/.wallspace.jsonc` / `~/.wallspace.json`
#[must_use]
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let app_dir = PathBuf::from(xdg_config).join(APP_DIR);
        for filename in CONFIG_FILE_NAMES {
            paths.push(app_dir.join(filename));
        }
    }

    if let Some(home) = dirs::home_dir() {
        let app_dir = home.join(".config").join(APP_DIR);
        for filename in CONFIG_FILE_NAMES {
            let path = app_dir.join(filename);
            // XDG_CONFIG_HOME may already be ~/.config.
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let app_dir = config_dir.join(APP_DIR);
        for filename in CONFIG_FILE_NAMES {
            let path = app_dir.join(filename);
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
    }

    if let Some(home) = dirs::home_dir() {
        for filename in LEGACY_CONFIG_FILE_NAMES {
            paths.push(home.join(filename));
        }
    }

    paths
}

/// Loads the configuration from the first available config file.
///
/// # Errors
///
/// Returns `ConfigError::NotFound` if no configuration file exists,
/// `ConfigError::IoError` if one exists but cannot be read, and
/// `ConfigError::ParseError` if it is not valid JSONC.
pub fn load_config() -> Result<(WallspaceConfig, PathBuf), ConfigError> {
    config_paths()
        .into_iter()
        .find(|path| path.exists())
        .map_or(Err(ConfigError::NotFound), |path| load_config_from_path(&path))
}

/// Loads the configuration from a specific file.
///
/// # Errors
///
/// Returns `ConfigError::NotFound` if the file does not exist, otherwise the
/// same errors as [`load_config`].
pub fn load_config_from_path(path: &Path) -> Result<(WallspaceConfig, PathBuf), ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound);
    }

    let file = fs::File::open(path)?;
    // Strip comments from JSONC before parsing
    let reader = json_comments::StripComments::new(file);
    let config: WallspaceConfig = serde_json::from_reader(reader)?;
    Ok((config, path.to_path_buf()))
}
