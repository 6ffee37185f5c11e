//! Installed screen saver modules.
//!
//! Modules are found in three places, searched in this order:
//!
//! - built-in screen savers that have no bundle on disk
//! - bundles in the screen saver folders (`.saver`, `.qtz`, `.appex`)
//! - app extensions registered with `pluginkit`

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Serialize;

use crate::codec::{self, BUILT_IN_SCREEN_SAVERS, SCREEN_SAVER_PROVIDER};
use crate::error::{Result, WallspaceError};
use crate::store::Choice;

/// Extension point that screen saver app extensions register under.
pub const SCREEN_SAVER_EXTENSION_POINT: &str = "com.apple.screensaver";

const SYSTEM_SCREEN_SAVERS_DIR: &str = "/System/Library/Screen Savers";
const LOCAL_SCREEN_SAVERS_DIR: &str = "/Library/Screen Savers";
const USER_SCREEN_SAVERS_DIR: &str = "Library/Screen Savers";

/// Bundle format of a screen saver module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ModuleKind {
    /// Legacy `.saver` bundle.
    Saver,
    /// Quartz Composer composition.
    Quartz,
    /// App extension.
    Extension,
    /// Shipped with the system, no bundle.
    BuiltIn,
}

impl ModuleKind {
    fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "saver" => Some(Self::Saver),
            "qtz" => Some(Self::Quartz),
            "appex" => Some(Self::Extension),
            _ => None,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Saver => "saver",
            Self::Quartz => "quartz",
            Self::Extension => "extension",
            Self::BuiltIn => "built-in",
        }
    }
}

/// An installed screen saver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleDescriptor {
    pub name: String,
    pub kind: ModuleKind,
    /// Bundle path; `None` for built-ins.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Installed with the operating system rather than by a user.
    pub system: bool,
}

impl ModuleDescriptor {
    /// Describes a bundle on disk, or `None` if the path is not a module bundle.
    #[must_use]
    pub fn from_path(path: &Path, system: bool) -> Option<Self> {
        let kind = path.extension().and_then(|ext| ext.to_str()).and_then(ModuleKind::from_extension)?;
        let name = codec::module_name(path)?;
        Some(Self { name, kind, path: Some(path.to_path_buf()), system })
    }

    /// Built-in screen savers.
    #[must_use]
    pub fn built_ins() -> Vec<Self> {
        BUILT_IN_SCREEN_SAVERS
            .iter()
            .map(|(name, _)| Self { name: (*name).to_string(), kind: ModuleKind::BuiltIn, path: None, system: true })
            .collect()
    }

    /// Builds the store choice that selects this module.
    ///
    /// # Errors
    ///
    /// Returns `WriteError` if the bundle path cannot be encoded and
    /// `ModuleNotFound` for a built-in name without a provider.
    pub fn to_choice(&self) -> Result<Choice> {
        match (&self.path, self.kind) {
            (_, ModuleKind::BuiltIn) => codec::built_in_provider(&self.name)
                .map(|provider| Choice::new(provider, Vec::new()))
                .ok_or_else(|| WallspaceError::ModuleNotFound(self.name.clone())),
            (Some(path), _) => Ok(Choice::new(SCREEN_SAVER_PROVIDER, codec::encode_module(path)?)),
            (None, _) => Err(WallspaceError::ModuleNotFound(self.name.clone())),
        }
    }
}

/// A source of installed screen saver modules.
pub trait ModuleCatalog {
    /// Lists the modules this source knows about.
    fn modules(&self) -> Vec<ModuleDescriptor>;
}

/// Screen savers found by scanning folders.
#[derive(Debug, Clone)]
pub struct DirectoryCatalog {
    directories: Vec<(PathBuf, bool)>,
}

impl DirectoryCatalog {
    /// Scans `extra` first, then the user, local and system folders.
    #[must_use]
    pub fn new(extra: Vec<PathBuf>) -> Self {
        let mut directories: Vec<(PathBuf, bool)> = extra.into_iter().map(|dir| (dir, false)).collect();
        if let Some(home) = dirs::home_dir() {
            directories.push((home.join(USER_SCREEN_SAVERS_DIR), false));
        }
        directories.push((PathBuf::from(LOCAL_SCREEN_SAVERS_DIR), false));
        directories.push((PathBuf::from(SYSTEM_SCREEN_SAVERS_DIR), true));
        Self { directories }
    }

    /// Scans only the given folders.
    #[must_use]
    pub fn with_directories(directories: Vec<(PathBuf, bool)>) -> Self { Self { directories } }
}

impl ModuleCatalog for DirectoryCatalog {
    fn modules(&self) -> Vec<ModuleDescriptor> {
        let mut modules: Vec<ModuleDescriptor> = Vec::new();

        for (dir, system) in &self.directories {
            let Ok(entries) = fs::read_dir(dir) else {
                continue;
            };

            let mut found: Vec<ModuleDescriptor> = entries
                .filter_map(std::result::Result::ok)
                .filter_map(|entry| ModuleDescriptor::from_path(&entry.path(), *system))
                .collect();
            found.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));

            for module in found {
                // Earlier folders shadow later ones.
                if !modules.iter().any(|m| m.name.eq_ignore_ascii_case(&module.name)) {
                    modules.push(module);
                }
            }
        }

        tracing::debug!(count = modules.len(), "catalog: scanned screen saver folders");
        modules
    }
}

/// App-extension screen savers registered with `pluginkit`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PluginRegistry;

impl ModuleCatalog for PluginRegistry {
    fn modules(&self) -> Vec<ModuleDescriptor> {
        let output = match Command::new("pluginkit").args(["-m", "-v", "-p", SCREEN_SAVER_EXTENSION_POINT]).output() {
            Ok(output) if output.status.success() => output,
            Ok(output) => {
                tracing::debug!(status = %output.status, "catalog: pluginkit query failed");
                return Vec::new();
            }
            Err(err) => {
                tracing::debug!(error = %err, "catalog: pluginkit unavailable");
                return Vec::new();
            }
        };

        parse_pluginkit(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parses `pluginkit -m -v` output.
///
/// Each line ends with tab-separated fields, the last of which is the
/// extension's bundle path.
fn parse_pluginkit(output: &str) -> Vec<ModuleDescriptor> {
    let mut modules: Vec<ModuleDescriptor> = output
        .lines()
        .filter_map(|line| line.split('\t').map(str::trim).find(|field| field.ends_with(".appex")))
        .filter_map(|path| {
            let path = Path::new(path);
            ModuleDescriptor::from_path(path, path.starts_with("/System"))
        })
        .collect();
    modules.dedup_by(|a, b| a.name == b.name);
    modules
}

/// Finds a module by name (case-insensitive) or by bundle path.
///
/// Built-ins are checked first, then each catalog in order.
///
/// # Errors
///
/// Returns `ModuleNotFound` if nothing matches.
pub fn resolve_module(name: &str, catalogs: &[&dyn ModuleCatalog]) -> Result<ModuleDescriptor> {
    let name = name.trim();

    let as_path = Path::new(name);
    if as_path.is_absolute()
        && as_path.exists()
        && let Some(module) = ModuleDescriptor::from_path(as_path, as_path.starts_with("/System"))
    {
        return Ok(module);
    }

    let found = ModuleDescriptor::built_ins()
        .into_iter()
        .find(|m| m.name.eq_ignore_ascii_case(name))
        .or_else(|| {
            catalogs
                .iter()
                .find_map(|catalog| catalog.modules().into_iter().find(|m| m.name.eq_ignore_ascii_case(name)))
        });

    match found {
        Some(module) => {
            tracing::debug!(name = %module.name, kind = module.kind.label(), "catalog: module resolved");
            Ok(module)
        }
        None => Err(WallspaceError::ModuleNotFound(name.to_string())),
    }
}

/// Lists every known module: built-ins, then each catalog, without duplicates.
#[must_use]
pub fn list_modules(catalogs: &[&dyn ModuleCatalog]) -> Vec<ModuleDescriptor> {
    let mut modules = ModuleDescriptor::built_ins();
    for catalog in catalogs {
        for module in catalog.modules() {
            if !modules.iter().any(|m| m.name.eq_ignore_ascii_case(&module.name)) {
                modules.push(module);
            }
        }
    }
    modules
}
