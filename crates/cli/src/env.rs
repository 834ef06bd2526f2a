// SPDX-License-Identifier: MIT

//! Daemon discovery: where the control socket lives (mirrors
//! `talond_daemon::env::state_dir`, duplicated here rather than shared
//! since the CLI crate deliberately doesn't depend on the daemon's
//! internal modules — only its protocol).

use std::path::PathBuf;

pub fn socket_path() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("TALOND_STATE_DIR") {
        return Some(PathBuf::from(dir).join("talond.sock"));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Some(PathBuf::from(xdg).join("talond").join("talond.sock"));
    }
    let home = std::env::var("HOME").ok()?;
    Some(PathBuf::from(home).join(".local/state/talond/talond.sock"))
}

/// Identity this CLI invocation presents to the daemon's access control
/// (§4.5). Real deployments configure control_clients by hostname or a
/// shared token; this reads `TALON_CALLER`, falling back to the local
/// username.
pub fn caller_identity() -> talond_core::ClientIdentity {
    let id = std::env::var("TALON_CALLER")
        .ok()
        .or_else(|| std::env::var("USER").ok())
        .unwrap_or_else(|| "unknown".to_string());
    talond_core::ClientIdentity::new(id)
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
