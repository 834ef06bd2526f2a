// SPDX-License-Identifier: MIT

//! Centralized environment variable access for the adapters crate.

use std::time::Duration;

fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Timeout for the `sh -c 'source FILE && env'` subshell used to capture the
/// controller's environment (default: 5000ms).
pub fn profile_capture_ms() -> Duration {
    parse_duration_ms("TALOND_PROFILE_CAPTURE_MS").unwrap_or(Duration::from_secs(5))
}

/// Poll interval while waiting for the profile-capture subshell to exit
/// (default: 20ms).
pub fn profile_capture_poll_ms() -> Duration {
    parse_duration_ms("TALOND_PROFILE_POLL_MS").unwrap_or(Duration::from_millis(20))
}
