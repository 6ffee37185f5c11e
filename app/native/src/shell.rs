//! Restarting the desktop shell process that owns the wallpaper store.
//!
//! The shell reads the store only at startup, so a written document takes
//! effect once the process is terminated and launchd respawns it.

use std::ffi::OsStr;

use sysinfo::{ProcessesToUpdate, System};

use crate::error::{Result, WallspaceError};

/// Process name of the wallpaper shell.
pub const DEFAULT_SHELL_PROCESS: &str = "WallpaperAgent";

/// Forces the shell to reload the store.
pub trait ShellProcess {
    /// Terminates the shell processes and returns how many were signalled.
    ///
    /// # Errors
    ///
    /// Returns `ShellError` if a running process could not be signalled.
    fn restart(&self) -> Result<usize>;
}

/// Terminates processes by exact name and relies on launchd to respawn them.
#[derive(Debug, Clone)]
pub struct WallpaperAgent {
    names: Vec<String>,
}

impl Default for WallpaperAgent {
    fn default() -> Self { Self::new(vec![DEFAULT_SHELL_PROCESS.to_string()]) }
}

impl WallpaperAgent {
    #[must_use]
    pub fn new(names: Vec<String>) -> Self { Self { names } }
}

impl ShellProcess for WallpaperAgent {
    fn restart(&self) -> Result<usize> {
        let mut system = System::new();
        system.refresh_processes(ProcessesToUpdate::All, true);

        let mut signalled = 0;
        let mut failed = Vec::new();

        for name in &self.names {
            for process in system.processes_by_exact_name(OsStr::new(name)) {
                if process.kill() {
                    tracing::debug!(name = %name, pid = %process.pid(), "shell: process terminated");
                    signalled += 1;
                } else {
                    failed.push(format!("{name} ({})", process.pid()));
                }
            }
        }

        if !failed.is_empty() {
            return Err(WallspaceError::ShellError(format!(
                "failed to terminate {}",
                failed.join(", ")
            )));
        }

        if signalled == 0 {
            tracing::warn!(names = ?self.names, "shell: no running process found to restart");
        }
        Ok(signalled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_targets_wallpaper_agent() {
        assert_eq!(WallpaperAgent::default().names, [DEFAULT_SHELL_PROCESS.to_string()]);
    }

    #[test]
    fn test_restart_without_matching_process() {
        let agent = WallpaperAgent::new(vec!["wallspace-test-no-such-process".to_string()]);
        assert_eq!(agent.restart().unwrap(), 0);
    }
}
