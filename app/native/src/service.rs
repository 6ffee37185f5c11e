//! Public operations on the wallpaper store.
//!
//! [`Wallspace`] ties the store, live topology, shell restarter and settle
//! wait together. Reads resolve against a fresh store read; writes go
//! through a [`Transaction`].

use std::fs;
use std::path::PathBuf;
use std::time::SystemTime;

use serde::Serialize;

use crate::catalog::{self, DirectoryCatalog, ModuleCatalog, ModuleDescriptor, PluginRegistry};
use crate::codec::{self, IMAGE_PROVIDER};
use crate::config::WallspaceConfig;
use crate::error::{Result, WallspaceError};
use crate::mutator::{self, Family, Payload};
use crate::platform::path::expand;
use crate::resolver::{self, EffectiveScreensaver, EffectiveWallpaper, ResolvedTarget};
use crate::shell::{ShellProcess, WallpaperAgent};
use crate::store::location::resolve_store_path;
use crate::store::{BackupInfo, Choice, ConfigurationTree, Slot, Store, is_valid_uuid};
use crate::topology::{Desktop, DisplayTopology, Monitor, SystemTopology, TopologyProvider};
use crate::transaction::{LiveResolver, Settle, SleepSettle, Transaction, TransactionOptions, TransactionReport};

/// What an operation applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Target {
    /// All displays and all desktops.
    Everywhere,
    /// Every desktop of a display, by arrangement number.
    Display { display: i32 },
    /// A desktop by global desktop number.
    Desktop { desktop: u32 },
    /// A desktop by UUID; the empty UUID is the default desktop.
    DesktopUuid { uuid: String },
    /// A desktop by number, scoped to a display.
    DisplayDesktop { display: i32, desktop: u32 },
}

impl Target {
    /// Builds a target from optional command-line selectors.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTarget` for non-positive numbers or when a UUID is
    /// combined with numeric selectors.
    pub fn from_selectors(display: Option<i32>, desktop: Option<u32>, desktop_uuid: Option<String>) -> Result<Self> {
        if display.is_some_and(|d| d < 1) {
            return Err(WallspaceError::InvalidTarget("display numbers start at 1".to_string()));
        }
        if desktop == Some(0) {
            return Err(WallspaceError::InvalidTarget("desktop numbers start at 1".to_string()));
        }

        match (display, desktop, desktop_uuid) {
            (None, None, None) => Ok(Self::Everywhere),
            (Some(display), None, None) => Ok(Self::Display { display }),
            (None, Some(desktop), None) => Ok(Self::Desktop { desktop }),
            (Some(display), Some(desktop), None) => Ok(Self::DisplayDesktop { display, desktop }),
            (None, None, Some(uuid)) => Ok(Self::DesktopUuid { uuid }),
            (_, _, Some(_)) => Err(WallspaceError::InvalidTarget(
                "a desktop UUID cannot be combined with display or desktop numbers".to_string(),
            )),
        }
    }
}

/// A wallpaper image to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDescriptor {
    pub path: PathBuf,
    /// Display style (`fill`, `fit`, `stretch`, `center`, `tile`).
    pub style: Option<String>,
}

impl ImageDescriptor {
    /// Validates an image path (with `~` expansion) and makes it absolute.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArguments` if the path does not name a file.
    pub fn from_path(path: &str, style: Option<String>) -> Result<Self> {
        let expanded = expand(path);
        if !expanded.is_file() {
            return Err(WallspaceError::InvalidArguments(format!(
                "image not found: {}",
                expanded.display()
            )));
        }
        let path = fs::canonicalize(&expanded)?;
        Ok(Self { path, style: style.map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty()) })
    }

    /// Name the resolver reports for this image.
    #[must_use]
    pub fn expected_name(&self) -> String { self.path.display().to_string() }

    fn to_slot(&self, now: SystemTime) -> Result<Slot> {
        let mut slot = Slot::new(Choice::new(IMAGE_PROVIDER, codec::encode_image(&self.path)?), now);
        if let Some(style) = &self.style {
            slot.content.encoded_option_values = Some(codec::encode_style(style)?.into());
        }
        Ok(slot)
    }
}

/// Reduces a target to store keys using a topology snapshot.
///
/// Display targets resolve to the display's current desktop. Everywhere
/// resolves to the current desktop of the first connected display.
///
/// # Errors
///
/// Returns `DisplayNotFound` or `DesktopNotFound(OnDisplay)` for numbers the
/// topology does not know.
pub fn resolve_target(topology: &DisplayTopology, target: &Target) -> Result<ResolvedTarget> {
    let display_key = |monitor: &Monitor| is_valid_uuid(&monitor.uuid).then(|| monitor.uuid.clone());
    let current = |monitor: &Monitor| monitor.current_desktop().map(|d| d.uuid.clone()).unwrap_or_default();

    let resolved = match target {
        Target::Everywhere => topology
            .first_connected()
            .map(|monitor| ResolvedTarget::new(current(monitor), display_key(monitor)))
            .unwrap_or_default(),
        Target::Display { display } => {
            let monitor = topology.require_monitor(*display)?;
            ResolvedTarget::new(current(monitor), display_key(monitor))
        }
        Target::Desktop { desktop } => {
            let (monitor, found) = find_desktop(topology, None, *desktop)
                .ok_or(WallspaceError::DesktopNotFound(*desktop))?;
            ResolvedTarget::new(found.uuid.clone(), display_key(monitor))
        }
        Target::DesktopUuid { uuid } => {
            ResolvedTarget::new(uuid.clone(), topology.monitor_for_desktop(uuid).and_then(display_key))
        }
        Target::DisplayDesktop { display, desktop } => {
            topology.require_monitor(*display)?;
            let (monitor, found) = find_desktop(topology, Some(*display), *desktop).ok_or(
                WallspaceError::DesktopNotFoundOnDisplay { display: *display, desktop: *desktop },
            )?;
            ResolvedTarget::new(found.uuid.clone(), display_key(monitor))
        }
    };
    Ok(resolved)
}

/// Desktop lookup for reads, where the default desktop (empty UUID) is fine.
fn find_desktop(topology: &DisplayTopology, display: Option<i32>, number: u32) -> Option<(&Monitor, &Desktop)> {
    topology
        .monitors
        .iter()
        .filter(|m| display.is_none_or(|d| m.connected && m.human_display_number == d))
        .find_map(|m| m.spaces.iter().find(|d| d.global_desktop_number == number).map(|d| (m, d)))
}

/// Applies a payload to the tree according to the target.
///
/// # Errors
///
/// Returns the mutator's target errors.
pub fn mutate_for_target(
    tree: &ConfigurationTree,
    topology: &DisplayTopology,
    target: &Target,
    payload: &Payload,
) -> Result<ConfigurationTree> {
    match target {
        Target::Everywhere => Ok(mutator::for_everywhere(tree, topology, payload)),
        Target::Display { display } => mutator::for_display(tree, topology, *display, payload),
        Target::Desktop { desktop } => {
            let (_, found) = topology.desktop_by_number(*desktop)?;
            mutator::for_desktop(tree, topology, &found.uuid, None, payload)
        }
        Target::DesktopUuid { uuid } => mutator::for_desktop(tree, topology, uuid, None, payload),
        Target::DisplayDesktop { display, desktop } => {
            mutator::for_display_desktop(tree, topology, *display, *desktop, payload)
        }
    }
}

/// Resolves a target against the store and topology as they are now.
struct StoreResolver<'a, T> {
    store: &'a Store,
    topology: &'a T,
    target: &'a Target,
    family: Family,
}

impl<T: TopologyProvider> LiveResolver for StoreResolver<'_, T> {
    fn resolve(&self) -> Result<Option<String>> {
        let tree = self.store.load()?;
        let topology = self.topology.topology()?;
        let target = resolve_target(&topology, self.target)?;

        Ok(match self.family {
            Family::Screensaver => {
                resolver::resolve_screensaver(&tree, &target, &topology.connected_display_uuids()).map(|r| r.name)
            }
            Family::Wallpaper => resolver::resolve_wallpaper(&tree, &target).map(|r| r.name),
        })
    }
}

/// Wallspace on the running system.
pub type SystemWallspace = Wallspace<SystemTopology, WallpaperAgent, SleepSettle>;

/// Facade over the store and its collaborators.
pub struct Wallspace<T, S, W> {
    store: Store,
    topology: T,
    shell: S,
    settle: W,
    catalogs: Vec<Box<dyn ModuleCatalog>>,
}

impl SystemWallspace {
    /// Builds a facade for the current user from configuration.
    ///
    /// `store_override` takes precedence over the configured store path.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the store location cannot be determined.
    pub fn from_config(config: &WallspaceConfig, store_override: Option<&str>) -> Result<Self> {
        let path = resolve_store_path(store_override.or(config.store_path.as_deref()))?;
        let catalogs: Vec<Box<dyn ModuleCatalog>> = vec![
            Box::new(DirectoryCatalog::new(config.screen_saver_directories())),
            Box::new(PluginRegistry),
        ];

        Ok(Self::new(
            Store::new(path),
            SystemTopology,
            WallpaperAgent::new(config.shell_processes.clone()),
            SleepSettle,
        )
        .with_catalogs(catalogs))
    }
}

impl<T, S, W> Wallspace<T, S, W>
where
    T: TopologyProvider,
    S: ShellProcess,
    W: Settle,
{
    #[must_use]
    pub fn new(store: Store, topology: T, shell: S, settle: W) -> Self {
        Self { store, topology, shell, settle, catalogs: Vec::new() }
    }

    /// Replaces the module catalogs used to look up screen savers.
    #[must_use]
    pub fn with_catalogs(mut self, catalogs: Vec<Box<dyn ModuleCatalog>>) -> Self {
        self.catalogs = catalogs;
        self
    }

    #[must_use]
    pub const fn store(&self) -> &Store { &self.store }

    fn catalog_refs(&self) -> Vec<&dyn ModuleCatalog> { self.catalogs.iter().map(Box::as_ref).collect() }

    /// Screen saver in effect for a target.
    ///
    /// # Errors
    ///
    /// Returns `ReadError` if the store cannot be read and target errors for
    /// numbers the topology does not know.
    pub fn get_effective_screensaver(&self, target: &Target) -> Result<Option<EffectiveScreensaver>> {
        let tree = self.store.load()?;
        let topology = self.topology.topology()?;
        let resolved = resolve_target(&topology, target)?;
        Ok(resolver::resolve_screensaver(&tree, &resolved, &topology.connected_display_uuids()))
    }

    /// Wallpaper in effect for a target.
    ///
    /// # Errors
    ///
    /// Same as [`Self::get_effective_screensaver`].
    pub fn get_effective_wallpaper(&self, target: &Target) -> Result<Option<EffectiveWallpaper>> {
        let tree = self.store.load()?;
        let topology = self.topology.topology()?;
        let resolved = resolve_target(&topology, target)?;
        Ok(resolver::resolve_wallpaper(&tree, &resolved))
    }

    /// Sets the screen saver for a target.
    ///
    /// # Errors
    ///
    /// Returns an error if anything fails before the document is written.
    pub fn set_screensaver(
        &self,
        module: &ModuleDescriptor,
        target: &Target,
        options: &TransactionOptions,
    ) -> Result<TransactionReport> {
        let slot = Slot::new(module.to_choice()?, SystemTime::now());
        tracing::info!(module = %module.name, target = ?target, "service: setting screensaver");
        self.commit(Payload::screensaver(slot), &module.name, target, options)
    }

    /// Sets the wallpaper for a target.
    ///
    /// # Errors
    ///
    /// Returns an error if anything fails before the document is written.
    pub fn set_wallpaper(
        &self,
        image: &ImageDescriptor,
        target: &Target,
        options: &TransactionOptions,
    ) -> Result<TransactionReport> {
        let slot = image.to_slot(SystemTime::now())?;
        tracing::info!(image = %image.path.display(), target = ?target, "service: setting wallpaper");
        self.commit(Payload::wallpaper(slot), &image.expected_name(), target, options)
    }

    fn commit(
        &self,
        payload: Payload,
        expected: &str,
        target: &Target,
        options: &TransactionOptions,
    ) -> Result<TransactionReport> {
        let topology = self.topology.topology()?;
        let live = StoreResolver { store: &self.store, topology: &self.topology, target, family: payload.family };

        Transaction::new(&self.store, &self.shell, &self.settle).run(
            |tree| mutate_for_target(tree, &topology, target, &payload),
            expected,
            &live,
            options,
        )
    }

    /// Current display and desktop topology.
    ///
    /// # Errors
    ///
    /// Returns `TopologyError` if the live services cannot be queried.
    pub fn get_topology(&self) -> Result<DisplayTopology> { self.topology.topology() }

    /// Restores the backup over the live document.
    ///
    /// # Errors
    ///
    /// Returns `BackupNotFound` if there is no backup.
    pub fn restore_from_backup(&self) -> Result<()> { self.store.restore() }

    #[must_use]
    pub fn get_backup_info(&self) -> BackupInfo { self.store.backup_info() }

    /// Restarts the shell so it reloads the document.
    ///
    /// # Errors
    ///
    /// Returns `ShellError` if a running shell process could not be terminated.
    pub fn restart_shell(&self) -> Result<usize> { self.shell.restart() }

    /// Looks up an installed screen saver by name or bundle path.
    ///
    /// # Errors
    ///
    /// Returns `ModuleNotFound` if nothing matches.
    pub fn resolve_module(&self, name: &str) -> Result<ModuleDescriptor> {
        catalog::resolve_module(name, &self.catalog_refs())
    }

    /// Installed screen savers, built-ins first.
    #[must_use]
    pub fn list_screensavers(&self) -> Vec<ModuleDescriptor> { catalog::list_modules(&self.catalog_refs()) }
}
