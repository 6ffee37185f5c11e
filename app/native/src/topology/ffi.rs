//! Window server and CoreGraphics bindings used for topology discovery.
//!
//! The space list comes from the private `SkyLight` framework as a
//! `CFArray` of dictionaries. It is serialized to a binary property list
//! in-process and decoded with `plist`, so the rest of the crate never sees
//! CoreFoundation types.

#![allow(clippy::doc_markdown)]

use std::ffi::c_void;

use core_foundation::base::{CFType, TCFType};
use core_foundation::data::CFData;
use core_foundation::string::CFString;
use core_foundation_sys::base::{CFRelease, CFTypeRef, kCFAllocatorDefault};
use core_foundation_sys::error::CFErrorRef;
use core_foundation_sys::propertylist::{CFPropertyListCreateData, kCFPropertyListBinaryFormat_v1_0};
use core_foundation_sys::string::CFStringRef;
use core_foundation_sys::uuid::CFUUIDCreateFromString;
use core_graphics::display::CGDisplay;
use plist::Value;

use super::{DisplayIdentity, SpaceEnumerator};
use crate::error::{Result, WallspaceError};

#[link(name = "SkyLight", kind = "framework")]
unsafe extern "C" {
    /// Returns the main connection ID to the window server.
    fn SLSMainConnectionID() -> u32;

    /// Returns a retained array with one dictionary per display.
    fn SLSCopyManagedDisplaySpaces(cid: u32) -> *const c_void;
}

#[link(name = "ApplicationServices", kind = "framework")]
unsafe extern "C" {
    /// Maps a display UUID to a live display id (0 if not attached).
    fn CGDisplayGetDisplayIDFromUUID(uuid: *const c_void) -> u32;
}

/// Enumerates spaces through the window server connection.
pub struct SkyLightSpaces;

impl SpaceEnumerator for SkyLightSpaces {
    fn managed_display_spaces(&self) -> Result<Vec<Value>> {
        let cid = unsafe { SLSMainConnectionID() };
        if cid == 0 {
            return Err(WallspaceError::TopologyError(
                "failed to connect to the window server".to_string(),
            ));
        }

        let raw = unsafe { SLSCopyManagedDisplaySpaces(cid) };
        if raw.is_null() {
            return Err(WallspaceError::TopologyError(
                "window server returned no display spaces".to_string(),
            ));
        }
        let spaces = unsafe { CFType::wrap_under_create_rule(raw as CFTypeRef) };

        let mut error: CFErrorRef = std::ptr::null_mut();
        let data_ref = unsafe {
            CFPropertyListCreateData(
                kCFAllocatorDefault,
                spaces.as_CFTypeRef(),
                kCFPropertyListBinaryFormat_v1_0,
                0,
                &raw mut error,
            )
        };
        if data_ref.is_null() {
            if !error.is_null() {
                unsafe { CFRelease(error as CFTypeRef) };
            }
            return Err(WallspaceError::TopologyError(
                "failed to serialize display spaces".to_string(),
            ));
        }
        let data = unsafe { CFData::wrap_under_create_rule(data_ref) };

        plist::from_bytes::<Vec<Value>>(data.bytes()).map_err(|err| {
            WallspaceError::TopologyError(format!("failed to decode display spaces: {err}"))
        })
    }
}

/// Resolves display identity through CoreGraphics.
pub struct CoreGraphicsIdentity;

impl DisplayIdentity for CoreGraphicsIdentity {
    fn live_id(&self, uuid: &str) -> u32 {
        let string = CFString::new(uuid);
        let cf_uuid = unsafe {
            CFUUIDCreateFromString(kCFAllocatorDefault, string.as_concrete_TypeRef() as CFStringRef)
        };
        if cf_uuid.is_null() {
            return 0;
        }

        let id = unsafe { CGDisplayGetDisplayIDFromUUID(cf_uuid.cast()) };
        unsafe { CFRelease(cf_uuid.cast()) };
        id
    }

    fn main_display(&self) -> u32 { CGDisplay::main().id }

    fn active_displays(&self) -> Vec<u32> {
        CGDisplay::active_displays().unwrap_or_else(|err| {
            tracing::warn!(error = err, "topology: active display list unavailable, using main display");
            vec![CGDisplay::main().id]
        })
    }
}
