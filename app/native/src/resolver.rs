//! Precedence resolution of the effective screen saver and wallpaper.
//!
//! The store holds the same slot at several layers. Resolution walks them
//! from the most general to the most specific fallback:
//!
//! 1. `AllSpacesAndDisplays`
//! 2. `Spaces[desktop]`, falling back to the default desktop entry `""`
//! 3. `SystemDefault`
//!
//! Each layer lookup is a small function returning `Option`, and the layers
//! are chained with `or_else`. A slot that fails to decode yields nothing at
//! its layer and resolution moves on; decoding never aborts a read.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::codec::{self, Decoded, Provider};
use crate::store::{ConfigurationTree, DEFAULT_SPACE_KEY, DisplayConfig, Slot, SpaceConfig};

/// A target reduced to store keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedTarget {
    /// Desktop UUID; empty for the default desktop.
    pub desktop: String,
    /// Display UUID, when the target names a display.
    pub display: Option<String>,
}

impl ResolvedTarget {
    #[must_use]
    pub fn new(desktop: impl Into<String>, display: Option<String>) -> Self {
        Self { desktop: desktop.into(), display }
    }
}

/// Where in the store a result was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Layer {
    AllSpacesAndDisplays,
    SpaceDefault,
    SpaceDisplay(String),
    SystemDefault,
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllSpacesAndDisplays => write!(f, "all spaces and displays"),
            Self::SpaceDefault => write!(f, "desktop default"),
            Self::SpaceDisplay(uuid) => write!(f, "desktop display {uuid}"),
            Self::SystemDefault => write!(f, "system default"),
        }
    }
}

/// The screen saver in effect for a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveScreensaver {
    /// Module name, built-in name, or `Automatic`.
    pub name: String,
    pub provider: String,
    /// Bundle path for module-backed screen savers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// The screen saver follows the wallpaper.
    pub automatic: bool,
    pub layer: Layer,
}

/// The wallpaper in effect for a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveWallpaper {
    /// Image path for static images, a descriptive label otherwise.
    pub name: String,
    pub provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Display style (`fill`, `fit`, ...), when one is recorded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    pub layer: Layer,
}

/// Name reported for Automatic mode.
pub const AUTOMATIC: &str = "Automatic";

/// Decodes the first choice of a slot if it is usable.
///
/// An empty configuration blob is rejected only for providers whose blob
/// holds the module or image path.
fn usable(slot: &Slot) -> Option<(&str, Decoded)> {
    let choice = slot.first_choice()?;
    let provider = Provider::from_id(&choice.provider);
    if choice.configuration_bytes().is_empty() && provider.carries_payload() {
        return None;
    }

    let decoded = codec::decode(&choice.provider, choice.configuration_bytes());
    if decoded.is_unparseable() {
        tracing::debug!(provider = %choice.provider, "resolver: skipping undecodable choice");
        return None;
    }
    Some((choice.provider.as_str(), decoded))
}

// Screen saver

/// Resolves the effective screen saver.
///
/// `connected` lists the UUIDs of currently connected displays; their
/// per-display entries are consulted before any others.
#[must_use]
pub fn resolve_screensaver(
    tree: &ConfigurationTree,
    target: &ResolvedTarget,
    connected: &[String],
) -> Option<EffectiveScreensaver> {
    let resolved = all_spaces_screensaver(tree)
        .or_else(|| space_screensaver(tree, target, connected))
        .or_else(|| system_default_screensaver(tree));

    tracing::debug!(
        desktop = %target.desktop,
        display = ?target.display,
        found = ?resolved.as_ref().map(|r| r.name.as_str()),
        "resolver: screensaver resolved"
    );
    resolved
}

/// `idle` only counts here when its first choice has a non-empty blob.
fn all_spaces_screensaver(tree: &ConfigurationTree) -> Option<EffectiveScreensaver> {
    let config = tree.all_spaces_and_displays.as_ref()?;
    let layer = Layer::AllSpacesAndDisplays;

    config
        .idle
        .as_ref()
        .filter(|slot| slot.first_choice().is_some_and(|choice| !choice.configuration_bytes().is_empty()))
        .and_then(|slot| idle_screensaver(slot, &layer))
        .or_else(|| config.linked.as_ref().and_then(|slot| linked_screensaver(slot, &layer)))
}

fn space_screensaver(
    tree: &ConfigurationTree,
    target: &ResolvedTarget,
    connected: &[String],
) -> Option<EffectiveScreensaver> {
    let space = space_for(tree, &target.desktop)?;

    space
        .default
        .as_ref()
        .and_then(|config| screensaver_in(config, &Layer::SpaceDefault))
        .or_else(|| {
            display_order(space, target.display.as_deref(), connected).into_iter().find_map(|key| {
                let config = space.displays.as_ref()?.get(&key)?;
                screensaver_in(config, &Layer::SpaceDisplay(key))
            })
        })
}

fn system_default_screensaver(tree: &ConfigurationTree) -> Option<EffectiveScreensaver> {
    let config = tree.system_default.as_ref()?;
    screensaver_in(config, &Layer::SystemDefault)
}

/// `idle` first, then `linked`.
fn screensaver_in(config: &DisplayConfig, layer: &Layer) -> Option<EffectiveScreensaver> {
    config
        .idle
        .as_ref()
        .and_then(|slot| idle_screensaver(slot, layer))
        .or_else(|| config.linked.as_ref().and_then(|slot| linked_screensaver(slot, layer)))
}

fn idle_screensaver(slot: &Slot, layer: &Layer) -> Option<EffectiveScreensaver> {
    let (provider, decoded) = usable(slot)?;
    let path = match &decoded {
        Decoded::Module { path, .. } => Some(path.clone()),
        _ => None,
    };
    Some(EffectiveScreensaver {
        name: decoded.display_name(),
        provider: provider.to_string(),
        path,
        automatic: false,
        layer: layer.clone(),
    })
}

/// A linked slot only resolves when it points at a wallpaper provider.
fn linked_screensaver(slot: &Slot, layer: &Layer) -> Option<EffectiveScreensaver> {
    let choice = slot.first_choice()?;
    if !Provider::from_id(&choice.provider).is_wallpaper_family() {
        return None;
    }
    Some(EffectiveScreensaver {
        name: AUTOMATIC.to_string(),
        provider: choice.provider.clone(),
        path: None,
        automatic: true,
        layer: layer.clone(),
    })
}

/// Finds the desktop's entry, falling back to the default desktop.
fn space_for<'a>(tree: &'a ConfigurationTree, desktop: &str) -> Option<&'a SpaceConfig> {
    if !tree.has_spaces() {
        return None;
    }
    tree.space(desktop)
        .or_else(|| (!desktop.is_empty()).then(|| tree.space(DEFAULT_SPACE_KEY)).flatten())
}

/// Orders a desktop's display keys for lookup.
///
/// The targeted display comes first, then other connected displays, then the
/// remaining keys in lexicographic order. Non-UUID keys are never returned.
fn display_order(space: &SpaceConfig, preferred: Option<&str>, connected: &[String]) -> Vec<String> {
    let keys = space.valid_display_keys();
    let mut ordered: Vec<String> = Vec::with_capacity(keys.len());

    for candidate in preferred.into_iter().chain(connected.iter().map(String::as_str)) {
        if keys.iter().any(|key| key == candidate) && !ordered.iter().any(|key| key == candidate) {
            ordered.push(candidate.to_string());
        }
    }
    for key in keys {
        if !ordered.contains(&key) {
            ordered.push(key);
        }
    }
    ordered
}

// Wallpaper

/// Resolves the effective wallpaper.
#[must_use]
pub fn resolve_wallpaper(tree: &ConfigurationTree, target: &ResolvedTarget) -> Option<EffectiveWallpaper> {
    let resolved = all_spaces_wallpaper(tree)
        .or_else(|| space_wallpaper(tree, target))
        .or_else(|| system_default_wallpaper(tree));

    tracing::debug!(
        desktop = %target.desktop,
        display = ?target.display,
        found = ?resolved.as_ref().map(|r| r.name.as_str()),
        "resolver: wallpaper resolved"
    );
    resolved
}

/// Only `desktop` is read here. A `Linked` slot left at this layer keeps the
/// screen saver in Automatic mode and must not shadow narrower wallpapers.
fn all_spaces_wallpaper(tree: &ConfigurationTree) -> Option<EffectiveWallpaper> {
    let config = tree.all_spaces_and_displays.as_ref()?;
    config.desktop.as_ref().and_then(|slot| desktop_wallpaper(slot, &Layer::AllSpacesAndDisplays))
}

/// Direct display entry, then the desktop default, for `desktop` and then `linked`.
fn space_wallpaper(tree: &ConfigurationTree, target: &ResolvedTarget) -> Option<EffectiveWallpaper> {
    let space = space_for(tree, &target.desktop)?;
    let direct = target.display.as_deref().and_then(|display| {
        let config = space.displays.as_ref()?.get(display)?;
        Some((config, Layer::SpaceDisplay(display.to_string())))
    });
    let default = space.default.as_ref().map(|config| (config, Layer::SpaceDefault));

    let desktop_of = |entry: &Option<(&DisplayConfig, Layer)>| {
        entry.as_ref().and_then(|(config, layer)| {
            config.desktop.as_ref().and_then(|slot| desktop_wallpaper(slot, layer))
        })
    };
    let linked_of = |entry: &Option<(&DisplayConfig, Layer)>| {
        entry.as_ref().and_then(|(config, layer)| {
            config.linked.as_ref().and_then(|slot| linked_wallpaper(slot, layer))
        })
    };

    desktop_of(&direct)
        .or_else(|| desktop_of(&default))
        .or_else(|| linked_of(&direct))
        .or_else(|| linked_of(&default))
}

fn system_default_wallpaper(tree: &ConfigurationTree) -> Option<EffectiveWallpaper> {
    let config = tree.system_default.as_ref()?;
    wallpaper_in(config, &Layer::SystemDefault)
}

fn wallpaper_in(config: &DisplayConfig, layer: &Layer) -> Option<EffectiveWallpaper> {
    config
        .desktop
        .as_ref()
        .and_then(|slot| desktop_wallpaper(slot, layer))
        .or_else(|| config.linked.as_ref().and_then(|slot| linked_wallpaper(slot, layer)))
}

fn desktop_wallpaper(slot: &Slot, layer: &Layer) -> Option<EffectiveWallpaper> {
    let (provider, decoded) = usable(slot)?;
    let path = match &decoded {
        Decoded::ImageFile { path } => Some(path.clone()),
        _ => None,
    };
    let style = slot.content.encoded_option_values.as_ref().and_then(|data| codec::decode_style(data.as_ref()));

    Some(EffectiveWallpaper {
        name: decoded.display_name(),
        provider: provider.to_string(),
        path,
        style,
        layer: layer.clone(),
    })
}

fn linked_wallpaper(slot: &Slot, layer: &Layer) -> Option<EffectiveWallpaper> {
    let choice = slot.first_choice()?;
    if !Provider::from_id(&choice.provider).is_wallpaper_family() {
        return None;
    }
    desktop_wallpaper(slot, layer)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::BTreeMap;
    use std::path::Path;
    use std::time::SystemTime;

    use super::*;
    use crate::codec::{DYNAMIC_PROVIDER, IMAGE_PROVIDER, SCREEN_SAVER_PROVIDER};
    use crate::store::Choice;

    pub const DISPLAY_A: &str = "37D8832A-2D66-02CA-B9F7-8F30A301B230";
    pub const DISPLAY_B: &str = "9C1B5E7F-0A3D-4C2B-8E6F-1D2C3B4A5F60";

    pub fn module_slot(name: &str) -> Slot {
        let path = format!("/Library/Screen Savers/{name}.saver");
        let blob = codec::encode_module(Path::new(&path)).unwrap();
        Slot::new(Choice::new(SCREEN_SAVER_PROVIDER, blob), SystemTime::UNIX_EPOCH)
    }

    pub fn image_slot(path: &str) -> Slot {
        let blob = codec::encode_image(Path::new(path)).unwrap();
        Slot::new(Choice::new(IMAGE_PROVIDER, blob), SystemTime::UNIX_EPOCH)
    }

    pub fn linked_slot() -> Slot {
        let blob = codec::encode_style("fill").unwrap();
        Slot::new(Choice::new(DYNAMIC_PROVIDER, blob), SystemTime::UNIX_EPOCH)
    }

    pub fn idle(slot: Slot) -> DisplayConfig { DisplayConfig { idle: Some(slot), ..DisplayConfig::default() } }

    pub fn wallpaper(slot: Slot) -> DisplayConfig {
        DisplayConfig { desktop: Some(slot), ..DisplayConfig::default() }
    }

    pub fn space_with_default(config: DisplayConfig) -> SpaceConfig {
        SpaceConfig { default: Some(config), displays: None }
    }

    pub fn tree_with_spaces(spaces: Vec<(&str, SpaceConfig)>) -> ConfigurationTree {
        ConfigurationTree {
            spaces: Some(spaces.into_iter().map(|(k, v)| (k.to_string(), v)).collect()),
            ..ConfigurationTree::default()
        }
    }

    fn target(desktop: &str) -> ResolvedTarget { ResolvedTarget::new(desktop, None) }

    fn name(resolved: Option<EffectiveScreensaver>) -> Option<String> { resolved.map(|r| r.name) }

    #[test]
    fn test_all_spaces_wins_over_space_specific() {
        let mut tree = tree_with_spaces(vec![("D1", space_with_default(idle(module_slot("Flurry"))))]);
        tree.all_spaces_and_displays = Some(idle(module_slot("Aerial")));

        let resolved = resolve_screensaver(&tree, &target("D1"), &[]).unwrap();
        assert_eq!(resolved.name, "Aerial");
        assert_eq!(resolved.layer, Layer::AllSpacesAndDisplays);
    }

    #[test]
    fn test_empty_all_spaces_idle_does_not_count() {
        let mut tree = tree_with_spaces(vec![("D1", space_with_default(idle(module_slot("Flurry"))))]);
        tree.all_spaces_and_displays = Some(idle(Slot::new(
            Choice::new(SCREEN_SAVER_PROVIDER, Vec::new()),
            SystemTime::UNIX_EPOCH,
        )));

        assert_eq!(name(resolve_screensaver(&tree, &target("D1"), &[])).as_deref(), Some("Flurry"));
    }

    #[test]
    fn test_empty_built_in_at_all_spaces_does_not_count() {
        let provider = codec::built_in_provider("Hello").unwrap();
        let mut tree = tree_with_spaces(vec![("D1", space_with_default(idle(module_slot("Flurry"))))]);
        tree.all_spaces_and_displays =
            Some(idle(Slot::new(Choice::new(provider, Vec::new()), SystemTime::UNIX_EPOCH)));

        let resolved = resolve_screensaver(&tree, &target("D1"), &[]).unwrap();
        assert_eq!(resolved.name, "Flurry");
        assert_eq!(resolved.layer, Layer::SpaceDefault);
    }

    #[test]
    fn test_empty_all_spaces_idle_still_allows_linked() {
        let empty = Slot::new(Choice::new(SCREEN_SAVER_PROVIDER, Vec::new()), SystemTime::UNIX_EPOCH);
        let mut tree = tree_with_spaces(vec![("D1", space_with_default(idle(module_slot("Flurry"))))]);
        tree.all_spaces_and_displays =
            Some(DisplayConfig { idle: Some(empty), linked: Some(linked_slot()), ..DisplayConfig::default() });

        let resolved = resolve_screensaver(&tree, &target("D1"), &[]).unwrap();
        assert!(resolved.automatic);
        assert_eq!(resolved.layer, Layer::AllSpacesAndDisplays);
    }

    #[test]
    fn test_default_desktop_fallback() {
        let tree = tree_with_spaces(vec![("", space_with_default(idle(module_slot("Flurry"))))]);
        let resolved = resolve_screensaver(&tree, &target("X"), &[]).unwrap();
        assert_eq!(resolved.name, "Flurry");
        assert_eq!(resolved.layer, Layer::SpaceDefault);
    }

    #[test]
    fn test_exact_desktop_preferred_over_default_entry() {
        let tree = tree_with_spaces(vec![
            ("", space_with_default(idle(module_slot("Flurry")))),
            ("D1", space_with_default(idle(module_slot("Drift")))),
        ]);
        assert_eq!(name(resolve_screensaver(&tree, &target("D1"), &[])).as_deref(), Some("Drift"));
    }

    #[test]
    fn test_linked_wallpaper_provider_is_automatic() {
        let tree = ConfigurationTree {
            all_spaces_and_displays: Some(DisplayConfig { linked: Some(linked_slot()), ..DisplayConfig::default() }),
            system_default: Some(idle(module_slot("Flurry"))),
            ..ConfigurationTree::default()
        };

        let resolved = resolve_screensaver(&tree, &target(""), &[]).unwrap();
        assert!(resolved.automatic);
        assert_eq!(resolved.name, AUTOMATIC);
    }

    #[test]
    fn test_linked_non_wallpaper_provider_continues() {
        let tree = ConfigurationTree {
            all_spaces_and_displays: Some(DisplayConfig {
                linked: Some(module_slot("Aerial")),
                ..DisplayConfig::default()
            }),
            system_default: Some(idle(module_slot("Flurry"))),
            ..ConfigurationTree::default()
        };

        let resolved = resolve_screensaver(&tree, &target(""), &[]).unwrap();
        assert_eq!(resolved.name, "Flurry");
        assert_eq!(resolved.layer, Layer::SystemDefault);
    }

    #[test]
    fn test_idle_preferred_over_linked_in_default() {
        let config = DisplayConfig {
            idle: Some(module_slot("Drift")),
            linked: Some(linked_slot()),
            ..DisplayConfig::default()
        };
        let tree = tree_with_spaces(vec![("D1", space_with_default(config))]);
        assert_eq!(name(resolve_screensaver(&tree, &target("D1"), &[])).as_deref(), Some("Drift"));
    }

    #[test]
    fn test_display_entries_connected_first_and_main_skipped() {
        let displays = BTreeMap::from([
            ("Main".to_string(), idle(module_slot("Shell"))),
            (DISPLAY_A.to_string(), idle(module_slot("Arabesque"))),
            (DISPLAY_B.to_string(), idle(module_slot("Drift"))),
        ]);
        let tree = tree_with_spaces(vec![("D1", SpaceConfig { default: None, displays: Some(displays) })]);

        // Lexicographic order when nothing is connected.
        let resolved = resolve_screensaver(&tree, &target("D1"), &[]).unwrap();
        assert_eq!(resolved.name, "Arabesque");

        // Connected displays first.
        let resolved = resolve_screensaver(&tree, &target("D1"), &[DISPLAY_B.to_string()]).unwrap();
        assert_eq!(resolved.name, "Drift");
        assert_eq!(resolved.layer, Layer::SpaceDisplay(DISPLAY_B.to_string()));
    }

    #[test]
    fn test_only_main_key_resolves_nothing_at_space_layer() {
        let displays = BTreeMap::from([("Main".to_string(), idle(module_slot("Shell")))]);
        let tree = ConfigurationTree {
            system_default: Some(idle(module_slot("Flurry"))),
            ..tree_with_spaces(vec![("D1", SpaceConfig { default: None, displays: Some(displays) })])
        };
        assert_eq!(name(resolve_screensaver(&tree, &target("D1"), &[])).as_deref(), Some("Flurry"));
    }

    #[test]
    fn test_targeted_display_checked_first() {
        let displays = BTreeMap::from([
            (DISPLAY_A.to_string(), idle(module_slot("Arabesque"))),
            (DISPLAY_B.to_string(), idle(module_slot("Drift"))),
        ]);
        let tree = tree_with_spaces(vec![("D1", SpaceConfig { default: None, displays: Some(displays) })]);
        let target = ResolvedTarget::new("D1", Some(DISPLAY_B.to_string()));

        let connected = vec![DISPLAY_A.to_string(), DISPLAY_B.to_string()];
        assert_eq!(name(resolve_screensaver(&tree, &target, &connected)).as_deref(), Some("Drift"));
    }

    #[test]
    fn test_undecodable_slot_falls_through() {
        let garbage = Slot::new(Choice::new(SCREEN_SAVER_PROVIDER, vec![0xde, 0xad]), SystemTime::UNIX_EPOCH);
        let tree = ConfigurationTree {
            system_default: Some(idle(module_slot("Flurry"))),
            ..tree_with_spaces(vec![("D1", space_with_default(idle(garbage)))])
        };
        assert_eq!(name(resolve_screensaver(&tree, &target("D1"), &[])).as_deref(), Some("Flurry"));
    }

    #[test]
    fn test_built_in_with_empty_blob_is_usable() {
        let provider = codec::built_in_provider("hello").unwrap();
        let tree = ConfigurationTree {
            system_default: Some(idle(Slot::new(Choice::new(provider, Vec::new()), SystemTime::UNIX_EPOCH))),
            ..ConfigurationTree::default()
        };
        let resolved = resolve_screensaver(&tree, &target(""), &[]).unwrap();
        assert_eq!(resolved.name, "Hello");
        assert!(resolved.path.is_none());
    }

    #[test]
    fn test_module_path_is_reported() {
        let tree = ConfigurationTree { system_default: Some(idle(module_slot("Flurry"))), ..ConfigurationTree::default() };
        let resolved = resolve_screensaver(&tree, &target(""), &[]).unwrap();
        assert_eq!(resolved.path, Some(PathBuf::from("/Library/Screen Savers/Flurry.saver")));
    }

    #[test]
    fn test_nothing_configured() {
        assert!(resolve_screensaver(&ConfigurationTree::default(), &target("D1"), &[]).is_none());
        assert!(resolve_wallpaper(&ConfigurationTree::default(), &target("D1")).is_none());
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let mut tree = tree_with_spaces(vec![("", space_with_default(idle(module_slot("Flurry"))))]);
        tree.system_default = Some(idle(module_slot("Drift")));
        let first = resolve_screensaver(&tree, &target("D9"), &[]);
        let second = resolve_screensaver(&tree, &target("D9"), &[]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_wallpaper_direct_display_before_default() {
        let displays = BTreeMap::from([(DISPLAY_A.to_string(), wallpaper(image_slot("/tmp/a.png")))]);
        let space = SpaceConfig { default: Some(wallpaper(image_slot("/tmp/default.png"))), displays: Some(displays) };
        let tree = tree_with_spaces(vec![("D1", space)]);

        let with_display = resolve_wallpaper(&tree, &ResolvedTarget::new("D1", Some(DISPLAY_A.to_string()))).unwrap();
        assert_eq!(with_display.path, Some(PathBuf::from("/tmp/a.png")));

        let without = resolve_wallpaper(&tree, &target("D1")).unwrap();
        assert_eq!(without.path, Some(PathBuf::from("/tmp/default.png")));
        assert_eq!(without.layer, Layer::SpaceDefault);
    }

    #[test]
    fn test_dynamic_wallpaper_with_empty_configuration() {
        let dynamic = Slot::new(Choice::new(DYNAMIC_PROVIDER, Vec::new()), SystemTime::UNIX_EPOCH);
        let tree = ConfigurationTree {
            system_default: Some(wallpaper(image_slot("/tmp/stale.png"))),
            ..tree_with_spaces(vec![("", space_with_default(wallpaper(dynamic)))])
        };

        let resolved = resolve_wallpaper(&tree, &target("")).unwrap();
        assert_eq!(resolved.name, "Dynamic Wallpaper");
        assert_eq!(resolved.provider, DYNAMIC_PROVIDER);
        assert!(resolved.path.is_none());
        assert_eq!(resolved.layer, Layer::SpaceDefault);
    }

    #[test]
    fn test_empty_image_configuration_falls_through() {
        let empty = Slot::new(Choice::new(IMAGE_PROVIDER, Vec::new()), SystemTime::UNIX_EPOCH);
        let tree = ConfigurationTree {
            system_default: Some(wallpaper(image_slot("/tmp/a.png"))),
            ..tree_with_spaces(vec![("", space_with_default(wallpaper(empty)))])
        };

        let resolved = resolve_wallpaper(&tree, &target("")).unwrap();
        assert_eq!(resolved.path, Some(PathBuf::from("/tmp/a.png")));
        assert_eq!(resolved.layer, Layer::SystemDefault);
    }

    #[test]
    fn test_wallpaper_desktop_before_linked() {
        let displays = BTreeMap::from([(
            DISPLAY_A.to_string(),
            DisplayConfig { linked: Some(linked_slot()), ..DisplayConfig::default() },
        )]);
        let space = SpaceConfig { default: Some(wallpaper(image_slot("/tmp/default.png"))), displays: Some(displays) };
        let tree = tree_with_spaces(vec![("D1", space)]);

        let resolved = resolve_wallpaper(&tree, &ResolvedTarget::new("D1", Some(DISPLAY_A.to_string()))).unwrap();
        assert_eq!(resolved.path, Some(PathBuf::from("/tmp/default.png")));
    }

    #[test]
    fn test_wallpaper_linked_dynamic_is_labelled() {
        let tree = ConfigurationTree {
            system_default: Some(DisplayConfig { linked: Some(linked_slot()), ..DisplayConfig::default() }),
            ..ConfigurationTree::default()
        };
        let resolved = resolve_wallpaper(&tree, &target("")).unwrap();
        assert_eq!(resolved.name, "Dynamic Wallpaper");
        assert!(resolved.path.is_none());
    }

    #[test]
    fn test_wallpaper_style_is_decoded() {
        let mut slot = image_slot("/tmp/a.png");
        slot.content.encoded_option_values = Some(codec::encode_style("fit").unwrap().into());
        let tree = ConfigurationTree { system_default: Some(wallpaper(slot)), ..ConfigurationTree::default() };

        let resolved = resolve_wallpaper(&tree, &target("")).unwrap();
        assert_eq!(resolved.style.as_deref(), Some("fit"));
    }

    #[test]
    fn test_wallpaper_ignores_linked_at_all_spaces() {
        let mut tree = tree_with_spaces(vec![("D1", space_with_default(wallpaper(image_slot("/tmp/d1.png"))))]);
        tree.all_spaces_and_displays = Some(DisplayConfig { linked: Some(linked_slot()), ..DisplayConfig::default() });

        let resolved = resolve_wallpaper(&tree, &target("D1")).unwrap();
        assert_eq!(resolved.path, Some(PathBuf::from("/tmp/d1.png")));
        assert_eq!(resolved.layer, Layer::SpaceDefault);
    }

    #[test]
    fn test_wallpaper_all_spaces_wins() {
        let mut tree = tree_with_spaces(vec![("D1", space_with_default(wallpaper(image_slot("/tmp/d1.png"))))]);
        tree.all_spaces_and_displays = Some(wallpaper(image_slot("/tmp/all.png")));
        let resolved = resolve_wallpaper(&tree, &target("D1")).unwrap();
        assert_eq!(resolved.path, Some(PathBuf::from("/tmp/all.png")));
    }
}
