// SPDX-License-Identifier: MIT

//! Initialization / Recovery, spawn half (§4.7). The death-cleanup half
//! (killall, comm-dir sweep, snapshot reset) lives in [`crate::poller`],
//! which is the one place that actually observes the alive→dead edge.

use std::process::Child;

use talond_adapters::{capture_profile_env, spawn_controller};
use talond_core::{CommandError, Config};
use tracing::info;

/// Capture the profile-sourced environment and spawn the controller binary
/// under it. Fire-and-forget: the caller (dispatcher's `initialize`) waits
/// on the pointing condition afterward rather than on this `Child`.
pub fn spawn_controller_process(config: &Config) -> Result<Child, CommandError> {
    let env_vars = capture_profile_env(&config.env_profile_path);
    info!(
        vars = env_vars.len(),
        profile = %config.env_profile_path.display(),
        "captured controller environment"
    );
    spawn_controller(&config.controller_binary, &env_vars)
        .map_err(|e| CommandError::failed(format!("failed to spawn controller: {e}")))
}

#[cfg(test)]
#[path = "recovery_tests.rs"]
mod tests;
