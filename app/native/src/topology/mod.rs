//! Display and desktop topology discovery.
//!
//! Correlates the session-scoped view of the window server (numeric display
//! arrangement, numeric desktop index) with the stable identifiers used by
//! the wallpaper store (display UUID, desktop UUID).
//!
//! # Ordering
//!
//! Displays are ordered by the numeric id of their first desktop, which
//! matches the order shown in Mission Control. A single running counter then
//! assigns `global_desktop_number` across all displays, so desktop numbers are
//! not per display.
//!
//! # Error policy
//!
//! Malformed display or desktop records are skipped.

#[cfg(target_os = "macos")]
mod ffi;

use plist::Value;
use serde::{Deserialize, Serialize};

use crate::error::{Result, WallspaceError};
use crate::store::is_valid_uuid;

/// Identifier reported for the only display when displays share spaces.
pub const MAIN_DISPLAY_IDENTIFIER: &str = "Main";

/// Space type of a regular user desktop (fullscreen apps use other types).
const USER_SPACE_TYPE: i64 = 0;

/// Session-scoped map of displays to their desktops.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayTopology {
    pub monitors: Vec<Monitor>,
}

/// A physical display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Monitor {
    /// Stable display UUID (or `Main` when displays share spaces).
    pub uuid: String,
    /// Live CoreGraphics display id; `0` when disconnected.
    pub live_id: u32,
    /// 1-based arrangement number, `-1` when disconnected.
    pub human_display_number: i32,
    pub connected: bool,
    pub spaces: Vec<Desktop>,
}

/// A virtual desktop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Desktop {
    /// Stable desktop UUID; empty for the default desktop.
    pub uuid: String,
    /// 64-bit session identifier.
    pub id: u64,
    /// 1-based number from a single counter across all displays.
    pub global_desktop_number: u32,
    pub is_current: bool,
}

impl Monitor {
    /// Returns the desktop currently shown on this display.
    #[must_use]
    pub fn current_desktop(&self) -> Option<&Desktop> { self.spaces.iter().find(|d| d.is_current) }
}

impl DisplayTopology {
    /// Finds a connected display by its 1-based arrangement number.
    #[must_use]
    pub fn monitor_by_number(&self, number: i32) -> Option<&Monitor> {
        if number < 1 {
            return None;
        }
        self.monitors.iter().find(|m| m.connected && m.human_display_number == number)
    }

    /// Resolves a display number to its monitor.
    ///
    /// # Errors
    ///
    /// Returns `DisplayNotFound` if no connected display has that number.
    pub fn require_monitor(&self, number: i32) -> Result<&Monitor> {
        self.monitor_by_number(number).ok_or(WallspaceError::DisplayNotFound(number))
    }

    /// Resolves `(display number, global desktop number)` to a desktop.
    ///
    /// # Errors
    ///
    /// Returns `DisplayNotFound` for an unknown display and
    /// `DesktopNotFoundOnDisplay` if the desktop is not on that display or
    /// has no concrete UUID.
    pub fn desktop_on_display(&self, display: i32, desktop: u32) -> Result<(&Monitor, &Desktop)> {
        let monitor = self.require_monitor(display)?;
        monitor
            .spaces
            .iter()
            .find(|d| d.global_desktop_number == desktop && !d.uuid.is_empty())
            .map(|d| (monitor, d))
            .ok_or(WallspaceError::DesktopNotFoundOnDisplay { display, desktop })
    }

    /// Resolves a global desktop number across all displays.
    ///
    /// # Errors
    ///
    /// Returns `DesktopNotFound` if no desktop has that number or its UUID is empty.
    pub fn desktop_by_number(&self, desktop: u32) -> Result<(&Monitor, &Desktop)> {
        self.monitors
            .iter()
            .find_map(|m| {
                m.spaces.iter().find(|d| d.global_desktop_number == desktop).map(|d| (m, d))
            })
            .filter(|(_, d)| !d.uuid.is_empty())
            .ok_or(WallspaceError::DesktopNotFound(desktop))
    }

    /// Returns the display that owns a desktop UUID.
    #[must_use]
    pub fn monitor_for_desktop(&self, uuid: &str) -> Option<&Monitor> {
        self.monitors.iter().find(|m| m.spaces.iter().any(|d| d.uuid == uuid))
    }

    /// UUIDs of connected displays, skipping non-UUID identifiers.
    #[must_use]
    pub fn connected_display_uuids(&self) -> Vec<String> {
        self.monitors
            .iter()
            .filter(|m| m.connected && is_valid_uuid(&m.uuid))
            .map(|m| m.uuid.clone())
            .collect()
    }

    /// The first connected display in arrangement order.
    #[must_use]
    pub fn first_connected(&self) -> Option<&Monitor> {
        self.monitors
            .iter()
            .filter(|m| m.connected && m.human_display_number > 0)
            .min_by_key(|m| m.human_display_number)
    }
}

/// Source of the window server's per-display space records.
pub trait SpaceEnumerator {
    /// Returns one property-list record per display.
    ///
    /// # Errors
    ///
    /// Returns `TopologyError` if the enumeration itself fails.
    fn managed_display_spaces(&self) -> Result<Vec<Value>>;
}

/// Correlates display UUIDs with live display ids.
pub trait DisplayIdentity {
    /// Live display id for a UUID; `0` when the display is disconnected.
    fn live_id(&self, uuid: &str) -> u32;

    /// Live id of the main display.
    fn main_display(&self) -> u32;

    /// Active display ids in system arrangement order.
    fn active_displays(&self) -> Vec<u32>;
}

/// Anything that can produce a current topology snapshot.
pub trait TopologyProvider {
    /// Queries the current topology.
    ///
    /// # Errors
    ///
    /// Returns `TopologyError` if the live services cannot be queried.
    fn topology(&self) -> Result<DisplayTopology>;
}

impl TopologyProvider for DisplayTopology {
    fn topology(&self) -> Result<DisplayTopology> { Ok(self.clone()) }
}

/// Topology read from the running window server.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTopology;

impl TopologyProvider for SystemTopology {
    #[cfg(target_os = "macos")]
    fn topology(&self) -> Result<DisplayTopology> {
        discover(&ffi::SkyLightSpaces, &ffi::CoreGraphicsIdentity)
    }

    #[cfg(not(target_os = "macos"))]
    fn topology(&self) -> Result<DisplayTopology> {
        tracing::debug!("topology: no window server on this platform, using empty topology");
        Ok(DisplayTopology::default())
    }
}

/// Queries both services and builds the topology.
///
/// # Errors
///
/// Returns `TopologyError` if the space enumeration fails as a whole.
pub fn discover(
    enumerator: &dyn SpaceEnumerator,
    identity: &dyn DisplayIdentity,
) -> Result<DisplayTopology> {
    let records = enumerator.managed_display_spaces()?;
    Ok(build_topology(&records, identity))
}

#[derive(Debug, Deserialize)]
struct DisplayRecord {
    #[serde(rename = "Display Identifier")]
    identifier: String,
    #[serde(rename = "Current Space", default)]
    current_space: Option<Value>,
    #[serde(rename = "Spaces", default)]
    spaces: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct SpaceRecord {
    #[serde(rename = "ManagedSpaceID", default)]
    managed_space_id: Option<u64>,
    #[serde(default)]
    id64: Option<u64>,
    uuid: String,
    #[serde(rename = "type", default)]
    kind: i64,
}

impl SpaceRecord {
    fn id(&self) -> Option<u64> { self.id64.or(self.managed_space_id) }
}

struct ParsedDisplay {
    identifier: String,
    current: Option<u64>,
    spaces: Vec<(String, u64)>,
}

impl ParsedDisplay {
    fn sort_key(&self) -> u64 { self.spaces.first().map_or(u64::MAX, |(_, id)| *id) }
}

fn parse_display(record: &Value) -> Option<ParsedDisplay> {
    let parsed: DisplayRecord = plist::from_value(record)
        .inspect_err(|err| tracing::debug!(error = %err, "topology: skipping malformed display record"))
        .ok()?;
    let identifier = parsed.identifier.as_str();

    let current = parsed
        .current_space
        .as_ref()
        .and_then(|value| plist::from_value::<SpaceRecord>(value).ok())
        .and_then(|space| space.id());

    let spaces = parsed
        .spaces
        .iter()
        .filter_map(|value| match plist::from_value::<SpaceRecord>(value) {
            Ok(space) => Some(space),
            Err(err) => {
                tracing::debug!(
                    display = %identifier,
                    error = %err,
                    "topology: skipping malformed desktop record"
                );
                None
            }
        })
        .filter(|space| space.kind == USER_SPACE_TYPE)
        .filter_map(|space| space.id().map(|id| (space.uuid, id)))
        .collect();

    Some(ParsedDisplay { identifier: parsed.identifier, current, spaces })
}

/// Builds the topology from raw enumeration records.
#[must_use]
pub fn build_topology(records: &[Value], identity: &dyn DisplayIdentity) -> DisplayTopology {
    let mut displays: Vec<ParsedDisplay> = records.iter().filter_map(parse_display).collect();
    displays.sort_by_key(ParsedDisplay::sort_key);

    let active = identity.active_displays();
    let mut counter = 0u32;

    let monitors = displays
        .into_iter()
        .map(|display| {
            let live_id = if display.identifier == MAIN_DISPLAY_IDENTIFIER {
                identity.main_display()
            } else {
                identity.live_id(&display.identifier)
            };
            let connected = live_id != 0;
            let human_display_number = active
                .iter()
                .position(|id| connected && *id == live_id)
                .and_then(|idx| i32::try_from(idx + 1).ok())
                .unwrap_or(-1);

            let spaces = display
                .spaces
                .into_iter()
                .map(|(uuid, id)| {
                    counter += 1;
                    Desktop {
                        uuid,
                        id,
                        global_desktop_number: counter,
                        is_current: display.current == Some(id),
                    }
                })
                .collect();

            Monitor { uuid: display.identifier, live_id, human_display_number, connected, spaces }
        })
        .collect();

    DisplayTopology { monitors }
}
