//! Encoding and decoding of provider configuration blobs.
//!
//! Every `Choice` in the wallpaper store carries an opaque `Configuration`
//! blob whose layout depends on its provider. The layouts handled here are
//! small binary property lists:
//!
//! - screen saver module: `{module: {relative: <file URL>}}`
//! - static image: `{type: "imageFile", url: {relative: <file URL>}}`
//! - display style option: `{values: {style: {picker: {_0: {id: <style>}}}}}`
//!
//! Built-in providers use a zero-length blob. Decoding never fails: anything
//! that does not match its provider's layout comes back as
//! [`Decoded::Unparseable`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::error::WallspaceError;

/// Provider of traditional `.saver` / `.appex` screen saver modules.
pub const SCREEN_SAVER_PROVIDER: &str = "com.apple.wallpaper.choice.screen-saver";
/// Provider of plain image wallpapers.
pub const IMAGE_PROVIDER: &str = "com.apple.wallpaper.choice.image";
/// Provider of time-of-day (HEIC) wallpapers.
pub const DYNAMIC_PROVIDER: &str = "com.apple.wallpaper.choice.dynamic";
/// Provider of aerial video wallpapers.
pub const AERIALS_PROVIDER: &str = "com.apple.wallpaper.choice.aerials";

const APPLE_CHOICE_PREFIX: &str = "com.apple.wallpaper.choice.";

/// Built-in screen savers: display name and provider identifier.
pub const BUILT_IN_SCREEN_SAVERS: &[(&str, &str)] = &[
    ("Macintosh", "com.apple.wallpaper.choice.macintosh"),
    ("Hello", "com.apple.wallpaper.choice.hello"),
];

/// Errors that can occur while encoding a configuration blob.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The path cannot be expressed as a file URL.
    #[error("path is not absolute: {0}")]
    RelativePath(String),
    /// Property list serialization failed.
    #[error("failed to encode configuration: {0}")]
    Encode(#[from] plist::Error),
}

impl From<CodecError> for WallspaceError {
    fn from(err: CodecError) -> Self { Self::WriteError(err.to_string()) }
}

/// Kind of content behind a provider identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provider {
    /// Traditional screen saver bundle referenced by path.
    ScreenSaverModule,
    /// Static image file.
    StaticImage,
    /// Dynamic (time-based) image.
    DynamicImage,
    /// Aerial video wallpaper.
    Video,
    /// Classic built-in screen saver with an empty configuration blob.
    BuiltIn(&'static str),
    /// OS-branded wallpaper (Sonoma, Ventura, ...).
    NamedWallpaper(String),
    /// App-extension based screen saver.
    Extension(String),
    /// Anything else.
    Unknown(String),
}

impl Provider {
    /// Classifies a provider identifier.
    #[must_use]
    pub fn from_id(id: &str) -> Self {
        if let Some(&(name, _)) = BUILT_IN_SCREEN_SAVERS.iter().find(|(_, provider)| *provider == id) {
            return Self::BuiltIn(name);
        }

        match id {
            SCREEN_SAVER_PROVIDER => Self::ScreenSaverModule,
            IMAGE_PROVIDER => Self::StaticImage,
            DYNAMIC_PROVIDER => Self::DynamicImage,
            AERIALS_PROVIDER => Self::Video,
            _ => {
                if id.to_ascii_lowercase().contains("extension") {
                    Self::Extension(id.to_string())
                } else if let Some(name) = id.strip_prefix(APPLE_CHOICE_PREFIX) {
                    Self::NamedWallpaper(name.to_string())
                } else {
                    Self::Unknown(id.to_string())
                }
            }
        }
    }

    /// Returns `true` for providers that render a wallpaper.
    ///
    /// A `Linked` slot whose provider is in this family means the screen
    /// saver is derived from the wallpaper (Automatic mode).
    #[must_use]
    pub const fn is_wallpaper_family(&self) -> bool {
        matches!(
            self,
            Self::StaticImage | Self::DynamicImage | Self::Video | Self::NamedWallpaper(_)
        )
    }

    /// Returns `true` for providers whose configuration blob carries the
    /// module or image path. Other providers decode to a label and may store
    /// an empty blob.
    #[must_use]
    pub const fn carries_payload(&self) -> bool { matches!(self, Self::ScreenSaverModule | Self::StaticImage) }
}

/// Returns the provider identifier of a built-in screen saver, matched case-insensitively.
#[must_use]
pub fn built_in_provider(name: &str) -> Option<&'static str> {
    BUILT_IN_SCREEN_SAVERS
        .iter()
        .find(|(builtin, _)| builtin.eq_ignore_ascii_case(name))
        .map(|(_, provider)| *provider)
}

/// Result of decoding a configuration blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// A screen saver bundle.
    Module { name: String, path: PathBuf },
    /// A static image file.
    ImageFile { path: PathBuf },
    /// Content that has no path, described by a label.
    Labelled(String),
    /// The blob did not match its provider's layout.
    Unparseable { provider: String },
}

impl Decoded {
    /// Short human-readable name of the decoded content.
    #[must_use]
    pub fn display_name(&self) -> String {
        match self {
            Self::Module { name, .. } => name.clone(),
            Self::ImageFile { path } => path.display().to_string(),
            Self::Labelled(label) => label.clone(),
            Self::Unparseable { provider } => format!("Unknown ({provider})"),
        }
    }

    /// Returns `true` if decoding failed.
    #[must_use]
    pub const fn is_unparseable(&self) -> bool { matches!(self, Self::Unparseable { .. }) }
}

#[derive(Debug, Serialize, Deserialize)]
struct RelativeUrl {
    relative: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ModuleConfiguration {
    module: RelativeUrl,
}

#[derive(Debug, Serialize, Deserialize)]
struct ImageConfiguration {
    #[serde(rename = "type")]
    kind: String,
    url: RelativeUrl,
}

#[derive(Debug, Serialize, Deserialize)]
struct StyleOptions {
    values: StyleValues,
}

#[derive(Debug, Serialize, Deserialize)]
struct StyleValues {
    style: StylePicker,
}

#[derive(Debug, Serialize, Deserialize)]
struct StylePicker {
    picker: PickerSelection,
}

#[derive(Debug, Serialize, Deserialize)]
struct PickerSelection {
    #[serde(rename = "_0")]
    first: StyleId,
}

#[derive(Debug, Serialize, Deserialize)]
struct StyleId {
    id: String,
}

fn to_binary<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    let mut buf = Vec::new();
    plist::to_writer_binary(&mut buf, value)?;
    Ok(buf)
}

/// Encodes a screen saver bundle path.
///
/// # Errors
///
/// Returns an error if the path is relative or serialization fails.
pub fn encode_module(path: &Path) -> Result<Vec<u8>, CodecError> {
    let url = Url::from_directory_path(path)
        .map_err(|()| CodecError::RelativePath(path.display().to_string()))?;
    to_binary(&ModuleConfiguration { module: RelativeUrl { relative: url.into() } })
}

/// Encodes a static image path.
///
/// # Errors
///
/// Returns an error if the path is relative or serialization fails.
pub fn encode_image(path: &Path) -> Result<Vec<u8>, CodecError> {
    let url = Url::from_file_path(path)
        .map_err(|()| CodecError::RelativePath(path.display().to_string()))?;
    to_binary(&ImageConfiguration {
        kind: "imageFile".to_string(),
        url: RelativeUrl { relative: url.into() },
    })
}

/// Encodes a wallpaper display style (`fill`, `fit`, `stretch`, `center`, ...).
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode_style(id: &str) -> Result<Vec<u8>, CodecError> {
    to_binary(&StyleOptions {
        values: StyleValues {
            style: StylePicker {
                picker: PickerSelection { first: StyleId { id: id.to_string() } },
            },
        },
    })
}

/// Decodes a display style option blob.
#[must_use]
pub fn decode_style(bytes: &[u8]) -> Option<String> {
    plist::from_bytes::<StyleOptions>(bytes).ok().map(|options| options.values.style.picker.first.id)
}

/// Decodes a configuration blob according to its provider.
#[must_use]
pub fn decode(provider_id: &str, bytes: &[u8]) -> Decoded {
    let unparseable = || Decoded::Unparseable { provider: provider_id.to_string() };

    match Provider::from_id(provider_id) {
        Provider::ScreenSaverModule => decode_module(bytes).unwrap_or_else(unparseable),
        Provider::Extension(id) => {
            decode_module(bytes).unwrap_or_else(|| Decoded::Labelled(extension_label(&id)))
        }
        Provider::StaticImage => plist::from_bytes::<ImageConfiguration>(bytes)
            .ok()
            .and_then(|config| url_to_path(&config.url.relative))
            .map_or_else(unparseable, |path| Decoded::ImageFile { path }),
        Provider::DynamicImage => Decoded::Labelled("Dynamic Wallpaper".to_string()),
        Provider::Video => Decoded::Labelled("Video Wallpaper".to_string()),
        Provider::BuiltIn(name) => Decoded::Labelled(name.to_string()),
        Provider::NamedWallpaper(name) => Decoded::Labelled(format!("{} Wallpaper", capitalize(&name))),
        Provider::Unknown(_) => unparseable(),
    }
}

fn decode_module(bytes: &[u8]) -> Option<Decoded> {
    let config = plist::from_bytes::<ModuleConfiguration>(bytes).ok()?;
    let path = url_to_path(&config.module.relative)?;
    let name = module_name(&path)?;
    Some(Decoded::Module { name, path })
}

/// Derives a screen saver's name from its bundle path.
///
/// `/Library/Screen Savers/Aerial.saver/` becomes `Aerial`.
#[must_use]
pub fn module_name(path: &Path) -> Option<String> {
    let raw = path.to_string_lossy();
    let trimmed = raw.trim_end_matches('/');
    Path::new(trimmed).file_stem().map(|stem| stem.to_string_lossy().into_owned())
}

fn url_to_path(relative: &str) -> Option<PathBuf> {
    match Url::parse(relative) {
        Ok(url) if url.scheme() == "file" => url.to_file_path().ok(),
        Ok(_) => None,
        // Some older documents store a bare absolute path.
        Err(_) => relative.starts_with('/').then(|| PathBuf::from(relative)),
    }
}

fn extension_label(id: &str) -> String {
    let name = id.rsplit('.').next().unwrap_or(id);
    format!("Extension ({name})")
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    chars.next().map_or_else(String::new, |first| first.to_uppercase().chain(chars).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_round_trip_returns_name() {
        let blob = encode_module(Path::new("/Library/Screen Savers/Aerial.saver")).unwrap();
        let decoded = decode(SCREEN_SAVER_PROVIDER, &blob);

        match decoded {
            Decoded::Module { name, path } => {
                assert_eq!(name, "Aerial");
                assert!(path.to_string_lossy().starts_with("/Library/Screen Savers/Aerial.saver"));
            }
            other => panic!("Expected module, got {other:?}"),
        }
    }

    #[test]
    fn test_module_url_has_trailing_slash_and_escapes_spaces() {
        let blob = encode_module(Path::new("/Library/Screen Savers/Flurry.saver")).unwrap();
        let config: ModuleConfiguration = plist::from_bytes(&blob).unwrap();
        assert_eq!(config.module.relative, "file:///Library/Screen%20Savers/Flurry.saver/");
    }

    #[test]
    fn test_encode_module_rejects_relative_path() {
        let result = encode_module(Path::new("Screen Savers/Flurry.saver"));
        assert!(matches!(result, Err(CodecError::RelativePath(_))));
    }

    #[test]
    fn test_image_round_trip() {
        let blob = encode_image(Path::new("/Users/me/Pictures/beach.jpg")).unwrap();
        assert_eq!(
            decode(IMAGE_PROVIDER, &blob),
            Decoded::ImageFile { path: PathBuf::from("/Users/me/Pictures/beach.jpg") }
        );
    }

    #[test]
    fn test_style_round_trip() {
        let blob = encode_style("fill").unwrap();
        assert_eq!(decode_style(&blob).as_deref(), Some("fill"));
        assert_eq!(decode_style(b"garbage"), None);
    }

    #[test]
    fn test_decode_is_provider_aware() {
        // A module blob under the image provider must not be read as a module.
        let blob = encode_module(Path::new("/Library/Screen Savers/Flurry.saver")).unwrap();
        assert!(decode(IMAGE_PROVIDER, &blob).is_unparseable());
    }

    #[test]
    fn test_decode_garbage_is_unparseable() {
        let decoded = decode(SCREEN_SAVER_PROVIDER, b"not a plist");
        assert_eq!(
            decoded,
            Decoded::Unparseable { provider: SCREEN_SAVER_PROVIDER.to_string() }
        );
    }

    #[test]
    fn test_decode_labels_non_path_providers() {
        assert_eq!(decode(DYNAMIC_PROVIDER, &[]), Decoded::Labelled("Dynamic Wallpaper".to_string()));
        assert_eq!(decode(AERIALS_PROVIDER, &[]), Decoded::Labelled("Video Wallpaper".to_string()));
        assert_eq!(
            decode("com.apple.wallpaper.choice.sonoma", &[]),
            Decoded::Labelled("Sonoma Wallpaper".to_string())
        );
        assert_eq!(
            decode("com.apple.wallpaper.choice.macintosh", &[]),
            Decoded::Labelled("Macintosh".to_string())
        );
    }

    #[test]
    fn test_unknown_provider_is_unparseable() {
        assert!(decode("org.example.mystery", &[1, 2, 3]).is_unparseable());
    }

    #[test]
    fn test_provider_classification() {
        assert_eq!(Provider::from_id(SCREEN_SAVER_PROVIDER), Provider::ScreenSaverModule);
        assert_eq!(Provider::from_id(IMAGE_PROVIDER), Provider::StaticImage);
        assert_eq!(
            Provider::from_id("com.apple.wallpaper.choice.macintosh"),
            Provider::BuiltIn("Macintosh")
        );
        assert_eq!(
            Provider::from_id("com.example.ScreenSaverExtension"),
            Provider::Extension("com.example.ScreenSaverExtension".to_string())
        );
        assert_eq!(Provider::from_id("other"), Provider::Unknown("other".to_string()));
    }

    #[test]
    fn test_wallpaper_family() {
        assert!(Provider::from_id(AERIALS_PROVIDER).is_wallpaper_family());
        assert!(Provider::from_id(DYNAMIC_PROVIDER).is_wallpaper_family());
        assert!(Provider::from_id("com.apple.wallpaper.choice.sequoia").is_wallpaper_family());
        assert!(!Provider::from_id(SCREEN_SAVER_PROVIDER).is_wallpaper_family());
        assert!(!Provider::from_id("com.apple.wallpaper.choice.hello").is_wallpaper_family());
    }

    #[test]
    fn test_only_path_providers_carry_payload() {
        assert!(Provider::from_id(SCREEN_SAVER_PROVIDER).carries_payload());
        assert!(Provider::from_id(IMAGE_PROVIDER).carries_payload());
        assert!(!Provider::from_id(DYNAMIC_PROVIDER).carries_payload());
        assert!(!Provider::from_id(AERIALS_PROVIDER).carries_payload());
        assert!(!Provider::from_id("com.apple.wallpaper.choice.hello").carries_payload());
    }

    #[test]
    fn test_label_providers_decode_empty_blob() {
        assert_eq!(decode(DYNAMIC_PROVIDER, &[]), Decoded::Labelled("Dynamic Wallpaper".to_string()));
        assert!(decode(IMAGE_PROVIDER, &[]).is_unparseable());
    }

    #[test]
    fn test_module_name_strips_extension_and_slash() {
        assert_eq!(module_name(Path::new("/Library/Screen Savers/Drift.saver/")).as_deref(), Some("Drift"));
        assert_eq!(module_name(Path::new("/x/Word of the Day.qtz")).as_deref(), Some("Word of the Day"));
    }

    #[test]
    fn test_built_in_provider_lookup_is_case_insensitive() {
        assert_eq!(built_in_provider("macintosh"), Some("com.apple.wallpaper.choice.macintosh"));
        assert_eq!(built_in_provider("Flurry"), None);
    }

    #[test]
    fn test_bare_path_in_relative_field() {
        let blob = to_binary(&ModuleConfiguration {
            module: RelativeUrl { relative: "/Users/me/Library/Screen Savers/Brooklyn.saver".to_string() },
        })
        .unwrap();
        assert_eq!(decode(SCREEN_SAVER_PROVIDER, &blob).display_name(), "Brooklyn");
    }
}
