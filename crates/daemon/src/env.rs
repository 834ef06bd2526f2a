// SPDX-License-Identifier: MIT

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;

use crate::lifecycle::LifecycleError;

/// Resolve the state directory: `TALOND_STATE_DIR` > `XDG_STATE_HOME/talond` >
/// `~/.local/state/talond`. Holds the lock file, PID file, and Unix socket.
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("TALOND_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("talond"));
    }
    let home = std::env::var("HOME").map_err(|_| LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/talond"))
}

/// Path to the daemon's TOML configuration file, overridable for tests and
/// for sites that keep configuration outside the state directory.
pub fn config_path() -> Result<PathBuf, LifecycleError> {
    if let Ok(path) = std::env::var("TALOND_CONFIG") {
        return Ok(PathBuf::from(path));
    }
    Ok(state_dir()?.join("talond.toml"))
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
