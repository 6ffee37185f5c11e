//! Data model of the wallpaper store document.
//!
//! The document is a binary property list with three parallel layers:
//!
//! - `AllSpacesAndDisplays` - a single configuration used in "everywhere" mode
//! - `Spaces` - per-desktop configuration, keyed by desktop UUID (`""` is the
//!   default desktop)
//! - `SystemDefault` - single-desktop fallback
//!
//! A top-level `Displays` map is kept only for older readers of the format.

use std::collections::BTreeMap;
use std::sync::LazyLock;
use std::time::SystemTime;

use plist::{Data, Date, Value};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Key of the default desktop inside the `Spaces` map.
pub const DEFAULT_SPACE_KEY: &str = "";

static UUID_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^[0-9A-Fa-f]{8}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{12}$").ok()
});

/// Returns `true` if `key` is a canonical 8-4-4-4-12 UUID string.
///
/// Display maps occasionally carry keys such as `"Main"` or bare numbers;
/// those are treated as corrupt and never used as targets.
#[must_use]
pub fn is_valid_uuid(key: &str) -> bool { UUID_RE.as_ref().is_some_and(|re| re.is_match(key)) }

/// Root document of the wallpaper store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConfigurationTree {
    /// Configuration applied when "everywhere" mode is active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_spaces_and_displays: Option<DisplayConfig>,

    /// Per-desktop configuration keyed by desktop UUID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spaces: Option<BTreeMap<String, SpaceConfig>>,

    /// Fallback used on systems without a multi-desktop structure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_default: Option<DisplayConfig>,

    /// Legacy per-display configuration keyed by display UUID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub displays: Option<BTreeMap<String, DisplayConfig>>,
}

impl ConfigurationTree {
    /// Returns `true` if the document has a non-empty `Spaces` map.
    #[must_use]
    pub fn has_spaces(&self) -> bool { self.spaces.as_ref().is_some_and(|spaces| !spaces.is_empty()) }

    /// Looks up a desktop's configuration by UUID.
    #[must_use]
    pub fn space(&self, uuid: &str) -> Option<&SpaceConfig> {
        self.spaces.as_ref().and_then(|spaces| spaces.get(uuid))
    }
}

/// Configuration of a single desktop.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SpaceConfig {
    /// Applied to every display of this desktop unless overridden.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<DisplayConfig>,

    /// Per-display overrides keyed by display UUID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub displays: Option<BTreeMap<String, DisplayConfig>>,
}

impl SpaceConfig {
    /// Returns the display keys of this desktop that are canonical UUIDs.
    #[must_use]
    pub fn valid_display_keys(&self) -> Vec<String> {
        self.displays
            .as_ref()
            .map(|displays| displays.keys().filter(|key| is_valid_uuid(key)).cloned().collect())
            .unwrap_or_default()
    }
}

/// Up to three independent slots for one display (or for all of them).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DisplayConfig {
    /// Screen saver slot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle: Option<Slot>,

    /// Wallpaper slot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desktop: Option<Slot>,

    /// Automatic mode: the screen saver follows the active wallpaper provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked: Option<Slot>,

    /// Layout kind written by the shell (usually `individual`).
    #[serde(rename = "Type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// A timestamped content slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Slot {
    #[serde(default)]
    pub content: Content,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_set: Option<Date>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_use: Option<Date>,
}

impl Slot {
    /// Creates a slot holding a single choice, stamped with `now`.
    #[must_use]
    pub fn new(choice: Choice, now: SystemTime) -> Self {
        let stamp = Date::from(now);
        Self {
            content: Content { choices: vec![choice], ..Content::default() },
            last_set: Some(stamp),
            last_use: Some(stamp),
        }
    }

    /// Only the first choice is ever consulted by the shell.
    #[must_use]
    pub fn first_choice(&self) -> Option<&Choice> { self.content.choices.first() }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Content {
    #[serde(default)]
    pub choices: Vec<Choice>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shuffle: Option<Value>,

    /// Encoded display options (wallpaper style picker).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoded_option_values: Option<Data>,
}

/// A content source and its provider-specific configuration blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Choice {
    pub provider: String,

    #[serde(default = "empty_data")]
    pub configuration: Data,

    #[serde(default)]
    pub files: Vec<Value>,
}

impl Choice {
    /// Creates a choice with no auxiliary files.
    #[must_use]
    pub fn new(provider: impl Into<String>, configuration: Vec<u8>) -> Self {
        Self {
            provider: provider.into(),
            configuration: Data::new(configuration),
            files: Vec::new(),
        }
    }

    /// Returns the raw configuration bytes.
    #[must_use]
    pub fn configuration_bytes(&self) -> &[u8] { self.configuration.as_ref() }
}

fn empty_data() -> Data { Data::new(Vec::new()) }

#[cfg(test)]
mod tests {
    use super::*;

    const DISPLAY_UUID: &str = "37D8832A-2D66-02CA-B9F7-8F30A301B230";

    #[test]
    fn test_is_valid_uuid_accepts_canonical() {
        assert!(is_valid_uuid(DISPLAY_UUID));
        assert!(is_valid_uuid("37d8832a-2d66-02ca-b9f7-8f30a301b230"));
    }

    #[test]
    fn test_is_valid_uuid_rejects_corrupt_keys() {
        assert!(!is_valid_uuid("Main"));
        assert!(!is_valid_uuid("1"));
        assert!(!is_valid_uuid(""));
        assert!(!is_valid_uuid("37D8832A2D6602CAB9F78F30A301B230"));
        assert!(!is_valid_uuid(" 37D8832A-2D66-02CA-B9F7-8F30A301B230"));
    }

    #[test]
    fn test_valid_display_keys_filters_non_uuid() {
        let mut displays = BTreeMap::new();
        displays.insert("Main".to_string(), DisplayConfig::default());
        displays.insert(DISPLAY_UUID.to_string(), DisplayConfig::default());
        let space = SpaceConfig { default: None, displays: Some(displays) };

        assert_eq!(space.valid_display_keys(), vec![DISPLAY_UUID.to_string()]);
    }

    #[test]
    fn test_has_spaces() {
        let mut tree = ConfigurationTree::default();
        assert!(!tree.has_spaces());

        tree.spaces = Some(BTreeMap::new());
        assert!(!tree.has_spaces());

        tree.spaces.get_or_insert_default().insert(String::new(), SpaceConfig::default());
        assert!(tree.has_spaces());
    }

    #[test]
    fn test_slot_new_stamps_both_dates() {
        let slot = Slot::new(Choice::new("com.apple.wallpaper.choice.screen-saver", vec![1]), SystemTime::now());
        assert!(slot.last_set.is_some());
        assert_eq!(slot.last_set, slot.last_use);
        assert_eq!(slot.first_choice().map(|c| c.provider.as_str()), Some("com.apple.wallpaper.choice.screen-saver"));
    }

    #[test]
    fn test_tree_serializes_pascal_case_keys() {
        let tree = ConfigurationTree {
            system_default: Some(DisplayConfig {
                idle: Some(Slot::new(Choice::new("p", Vec::new()), SystemTime::UNIX_EPOCH)),
                ..DisplayConfig::default()
            }),
            ..ConfigurationTree::default()
        };

        let mut buf = Vec::new();
        plist::to_writer_xml(&mut buf, &tree).unwrap();
        let xml = String::from_utf8(buf).unwrap();

        assert!(xml.contains("<key>SystemDefault</key>"));
        assert!(xml.contains("<key>Idle</key>"));
        assert!(xml.contains("<key>Provider</key>"));
        assert!(!xml.contains("AllSpacesAndDisplays"));
    }

    #[test]
    fn test_tree_reads_document_written_by_shell() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>Spaces</key>
    <dict>
        <key></key>
        <dict>
            <key>Default</key>
            <dict>
                <key>Desktop</key>
                <dict>
                    <key>Content</key>
                    <dict>
                        <key>Choices</key>
                        <array>
                            <dict>
                                <key>Provider</key>
                                <string>com.apple.wallpaper.choice.dynamic</string>
                                <key>Files</key>
                                <array/>
                            </dict>
                        </array>
                        <key>Shuffle</key>
                        <string>$null</string>
                    </dict>
                </dict>
                <key>Type</key>
                <string>individual</string>
            </dict>
        </dict>
    </dict>
</dict>
</plist>"#;

        let tree: ConfigurationTree = plist::from_bytes(xml.as_bytes()).unwrap();
        let default = tree.space(DEFAULT_SPACE_KEY).and_then(|s| s.default.as_ref()).unwrap();
        let choice = default.desktop.as_ref().and_then(Slot::first_choice).unwrap();

        assert_eq!(choice.provider, "com.apple.wallpaper.choice.dynamic");
        assert!(choice.configuration_bytes().is_empty());
        assert_eq!(default.kind.as_deref(), Some("individual"));
    }
}
