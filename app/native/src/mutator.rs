//! Pure transformations of the configuration tree.
//!
//! Every function takes the current tree by reference and returns a new one.
//! Nothing here touches the filesystem; topology is passed in.
//!
//! A screen saver write sets `Idle` and removes `Linked`, which takes the
//! layer out of Automatic mode. A wallpaper write sets `Desktop` and keeps an
//! existing `Linked` slot in step with the new wallpaper.

use std::collections::BTreeMap;

use crate::error::{Result, WallspaceError};
use crate::store::{ConfigurationTree, DEFAULT_SPACE_KEY, DisplayConfig, Slot, SpaceConfig, is_valid_uuid};
use crate::topology::DisplayTopology;

/// Which slot a payload is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Screensaver,
    Wallpaper,
}

/// A slot to write and the family it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct Payload {
    pub family: Family,
    pub slot: Slot,
}

impl Payload {
    #[must_use]
    pub const fn screensaver(slot: Slot) -> Self { Self { family: Family::Screensaver, slot } }

    #[must_use]
    pub const fn wallpaper(slot: Slot) -> Self { Self { family: Family::Wallpaper, slot } }
}

/// Writes the payload into one display config.
fn apply(existing: Option<&DisplayConfig>, payload: &Payload) -> DisplayConfig {
    let mut config = existing.cloned().unwrap_or_default();
    match payload.family {
        Family::Screensaver => {
            config.idle = Some(payload.slot.clone());
            config.linked = None;
        }
        Family::Wallpaper => {
            config.desktop = Some(payload.slot.clone());
            if config.linked.is_some() {
                config.linked = Some(payload.slot.clone());
            }
        }
    }
    config
}

/// Builds a fresh `AllSpacesAndDisplays` entry.
///
/// Only the slot of the other family survives, so a previous `Linked` slot
/// never outlives a screen saver write.
fn fresh(existing: Option<&DisplayConfig>, payload: &Payload) -> DisplayConfig {
    let mut config = DisplayConfig { kind: existing.and_then(|c| c.kind.clone()), ..DisplayConfig::default() };
    match payload.family {
        Family::Screensaver => {
            config.idle = Some(payload.slot.clone());
            config.desktop = existing.and_then(|c| c.desktop.clone());
        }
        Family::Wallpaper => {
            config.desktop = Some(payload.slot.clone());
            config.idle = existing.and_then(|c| c.idle.clone());
            config.linked = existing.and_then(|c| c.linked.as_ref()).map(|_| payload.slot.clone());
        }
    }
    config
}

/// Writes a desktop's `Default` entry and the given display entries in one step.
///
/// Older readers of the format look at `Default`, newer ones at `Displays`,
/// so both are always written from the same payload. Keys that are not
/// canonical display UUIDs are left untouched.
fn dual_write(space: Option<&SpaceConfig>, display_keys: &[String], payload: &Payload) -> SpaceConfig {
    let default = apply(space.and_then(|s| s.default.as_ref()), payload);
    let mut displays = space.and_then(|s| s.displays.clone()).unwrap_or_default();

    for key in display_keys.iter().filter(|key| is_valid_uuid(key)) {
        let updated = apply(displays.get(key), payload);
        displays.insert(key.clone(), updated);
    }

    SpaceConfig { default: Some(default), displays: (!displays.is_empty()).then_some(displays) }
}

/// Removes the payload's family from `AllSpacesAndDisplays`.
///
/// That layer outranks every desktop entry, so a narrower write only takes
/// effect once it no longer carries a value of the same family. The removed
/// slot moves down to `SystemDefault` when that layer has none of its own, so
/// desktops without an entry keep resolving to it. Only a screen saver write
/// clears `Linked`; a wallpaper write leaves Automatic mode in place. The
/// entry is dropped when nothing is left in it.
fn retire_everywhere(tree: &mut ConfigurationTree, family: Family) {
    let Some(all) = tree.all_spaces_and_displays.as_mut() else {
        return;
    };
    let retired = match family {
        Family::Screensaver => {
            all.linked = None;
            all.idle.take()
        }
        Family::Wallpaper => all.desktop.take(),
    };

    if all.idle.is_none() && all.desktop.is_none() && all.linked.is_none() {
        tree.all_spaces_and_displays = None;
    }

    if let Some(slot) = retired {
        let fallback = tree.system_default.get_or_insert_with(DisplayConfig::default);
        let held = match family {
            Family::Screensaver => &mut fallback.idle,
            Family::Wallpaper => &mut fallback.desktop,
        };
        held.get_or_insert(slot);
    }
}

fn spaces_mut(tree: &mut ConfigurationTree) -> &mut BTreeMap<String, SpaceConfig> {
    tree.spaces.get_or_insert_with(BTreeMap::new)
}

fn write_space(tree: &mut ConfigurationTree, uuid: &str, display_keys: &[String], payload: &Payload) {
    let updated = dual_write(tree.space(uuid), display_keys, payload);
    spaces_mut(tree).insert(uuid.to_string(), updated);
}

/// Applies the payload everywhere.
///
/// Replaces `AllSpacesAndDisplays`, refreshes `SystemDefault` and, when the
/// document has per-desktop entries, updates every existing desktop and every
/// desktop of every known display.
#[must_use]
pub fn for_everywhere(tree: &ConfigurationTree, topology: &DisplayTopology, payload: &Payload) -> ConfigurationTree {
    let mut next = tree.clone();
    next.all_spaces_and_displays = Some(fresh(tree.all_spaces_and_displays.as_ref(), payload));
    next.system_default = Some(apply(tree.system_default.as_ref(), payload));

    if tree.has_spaces() {
        let existing: Vec<(String, Vec<String>)> = tree
            .spaces
            .iter()
            .flatten()
            .map(|(uuid, space)| (uuid.clone(), space.valid_display_keys()))
            .collect();
        for (uuid, keys) in existing {
            write_space(&mut next, &uuid, &keys, payload);
        }

        for monitor in &topology.monitors {
            next = write_monitor(next, &monitor.uuid, monitor.spaces.iter().map(|d| d.uuid.as_str()), payload);
        }
    }

    tracing::debug!(family = ?payload.family, "mutator: applied everywhere");
    next
}

fn write_monitor<'a>(
    mut tree: ConfigurationTree,
    display_uuid: &str,
    desktops: impl Iterator<Item = &'a str>,
    payload: &Payload,
) -> ConfigurationTree {
    let keys = [display_uuid.to_string()];
    for desktop in desktops {
        write_space(&mut tree, desktop, &keys, payload);
    }
    tree
}

/// Applies the payload to every desktop of one display.
///
/// # Errors
///
/// Returns `DisplayNotFound` if no connected display has that number.
pub fn for_display(
    tree: &ConfigurationTree,
    topology: &DisplayTopology,
    number: i32,
    payload: &Payload,
) -> Result<ConfigurationTree> {
    let monitor = topology.require_monitor(number)?;
    let mut next = write_monitor(tree.clone(), &monitor.uuid, monitor.spaces.iter().map(|d| d.uuid.as_str()), payload);
    retire_everywhere(&mut next, payload.family);

    tracing::debug!(
        display = number,
        uuid = %monitor.uuid,
        desktops = monitor.spaces.len(),
        "mutator: applied to display"
    );
    Ok(next)
}

/// Applies the payload to one desktop.
///
/// The empty UUID names the default desktop: `AllSpacesAndDisplays`, the `""`
/// desktop entry and `SystemDefault` are updated together. For a concrete
/// desktop, `display` limits the write to one display entry; without it,
/// every existing UUID entry is refreshed, or the connected displays are
/// seeded when the desktop has none.
///
/// # Errors
///
/// Returns `InvalidTarget` if `display` is not a canonical UUID.
pub fn for_desktop(
    tree: &ConfigurationTree,
    topology: &DisplayTopology,
    uuid: &str,
    display: Option<&str>,
    payload: &Payload,
) -> Result<ConfigurationTree> {
    if let Some(display) = display.filter(|d| !is_valid_uuid(d)) {
        return Err(WallspaceError::InvalidTarget(format!("'{display}' is not a display UUID")));
    }

    let mut next = tree.clone();

    if uuid == DEFAULT_SPACE_KEY {
        next.all_spaces_and_displays = Some(fresh(tree.all_spaces_and_displays.as_ref(), payload));
        next.system_default = Some(apply(tree.system_default.as_ref(), payload));
        if tree.has_spaces() {
            let keys = desktop_display_keys(tree.space(DEFAULT_SPACE_KEY), display, topology);
            write_space(&mut next, DEFAULT_SPACE_KEY, &keys, payload);
        }
        tracing::debug!(family = ?payload.family, "mutator: applied to default desktop");
        return Ok(next);
    }

    let keys = desktop_display_keys(tree.space(uuid), display, topology);
    write_space(&mut next, uuid, &keys, payload);
    retire_everywhere(&mut next, payload.family);

    tracing::debug!(desktop = %uuid, displays = keys.len(), "mutator: applied to desktop");
    Ok(next)
}

fn desktop_display_keys(space: Option<&SpaceConfig>, display: Option<&str>, topology: &DisplayTopology) -> Vec<String> {
    if let Some(display) = display {
        return vec![display.to_string()];
    }

    let existing = space.map(SpaceConfig::valid_display_keys).unwrap_or_default();
    if existing.is_empty() { topology.connected_display_uuids() } else { existing }
}

/// Applies the payload to a desktop addressed by number on a display.
///
/// # Errors
///
/// Returns `DisplayNotFound` or `DesktopNotFoundOnDisplay` if the pair does
/// not resolve to a concrete desktop UUID.
pub fn for_display_desktop(
    tree: &ConfigurationTree,
    topology: &DisplayTopology,
    display: i32,
    desktop: u32,
    payload: &Payload,
) -> Result<ConfigurationTree> {
    let (_, resolved) = topology.desktop_on_display(display, desktop)?;
    for_desktop(tree, topology, &resolved.uuid, None, payload)
}
