//! Platform queries used to locate the wallpaper store.

pub mod path;

/// Returns the major version of the running OS (`14` for macOS 14.2.1).
#[must_use]
pub fn os_major_version() -> Option<u32> {
    sysinfo::System::os_version().as_deref().and_then(parse_major_version)
}

fn parse_major_version(version: &str) -> Option<u32> {
    version.trim().split('.').next().and_then(|major| major.parse().ok())
}
