//! Location of the wallpaper store on disk.
//!
//! macOS 14 and later keep the document in a structured store under
//! Application Support; older releases use a single preferences file.

use std::path::PathBuf;

use crate::error::{Result, WallspaceError};
use crate::platform::{self, path::expand};

/// Store path relative to the home directory on macOS 14+.
pub const STORE_RELATIVE_PATH: &str =
    "Library/Application Support/com.apple.wallpaper/Store/Index.plist";

/// Store path relative to the home directory on older releases.
pub const LEGACY_RELATIVE_PATH: &str = "Library/Preferences/com.apple.wallpaper.plist";

/// First major OS version that uses the structured store.
pub const STRUCTURED_STORE_MIN_MAJOR: u32 = 14;

/// Returns the store path relative to the home directory for an OS major version.
///
/// An unknown version is assumed to be recent.
#[must_use]
pub fn relative_store_path(os_major: Option<u32>) -> &'static str {
    match os_major {
        Some(major) if major < STRUCTURED_STORE_MIN_MAJOR => LEGACY_RELATIVE_PATH,
        _ => STORE_RELATIVE_PATH,
    }
}

/// Resolves the store path, honouring an explicit override.
///
/// # Errors
///
/// Returns `ConfigError` if no override is given and the home directory is unknown.
pub fn resolve_store_path(override_path: Option<&str>) -> Result<PathBuf> {
    if let Some(path) = override_path.map(expand).filter(|path| !path.as_os_str().is_empty()) {
        return Ok(path);
    }

    let home = dirs::home_dir().ok_or_else(|| {
        WallspaceError::ConfigError("cannot determine the home directory".to_string())
    })?;

    let major = platform::os_major_version();
    let path = home.join(relative_store_path(major));
    tracing::debug!(os_major = ?major, path = %path.display(), "store: resolved store location");
    Ok(path)
}
