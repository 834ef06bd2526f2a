// SPDX-License-Identifier: MIT

//! Daemon configuration (§3). Immutable once loaded: the dispatcher,
//! poller, and status reporter all read it through a shared `Arc` and
//! never mutate it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::identity::ClientIdentity;
use crate::park::ParkPosition;

/// Hardware capability flavor (§3).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case", tag = "flavor")]
pub enum Flavor {
    /// Focus axis and external security interlock present.
    Full {
        interlock_handle: String,
        interlock_key: String,
    },
    /// No focus axis, no interlock.
    Lite,
}

impl Flavor {
    pub fn is_full(&self) -> bool {
        matches!(self, Flavor::Full { .. })
    }
}

/// Per-operation timeout budget (§3, §4.4). Every blocking wait in the
/// dispatcher and poller is bounded by one of these.
#[derive(Debug, Clone, Deserialize)]
pub struct Timeouts {
    #[serde(with = "humantime_serde")]
    pub initialization: Duration,
    #[serde(with = "humantime_serde")]
    pub slew: Duration,
    #[serde(with = "humantime_serde")]
    pub focus: Duration,
    #[serde(with = "humantime_serde")]
    pub homing: Duration,
    #[serde(with = "humantime_serde")]
    pub limit: Duration,
    #[serde(with = "humantime_serde")]
    pub cover: Duration,
    #[serde(with = "humantime_serde")]
    pub ping: Duration,
}

/// A signed, ordered (low, high) degree range. `low` must be negative or
/// zero and `high` must be positive or zero, matching the "negative then
/// positive" convention the spec calls out for soft limits.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SoftLimits {
    pub low_deg: f64,
    pub high_deg: f64,
}

impl SoftLimits {
    pub fn contains(self, value_deg: f64) -> bool {
        value_deg >= self.low_deg && value_deg <= self.high_deg
    }
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    control_clients: Vec<String>,
    daemon_name: String,
    log_channel: String,
    #[serde(flatten)]
    flavor: Flavor,
    #[serde(default)]
    r#virtual: bool,
    #[serde(with = "humantime_serde")]
    query_delay: Duration,
    query_timeout_iterations: usize,
    timeouts: Timeouts,
    focus_tolerance_um: f64,
    ha_soft_limits: SoftLimits,
    dec_soft_limits: SoftLimits,
    park_positions: HashMap<String, ParkPosition>,
    shm_key: i32,
    #[serde(default = "default_comm_dir")]
    comm_dir: PathBuf,
    #[serde(default = "default_env_profile")]
    env_profile_path: PathBuf,
    controller_binary: PathBuf,
}

fn default_comm_dir() -> PathBuf {
    PathBuf::from("/usr/local/telescope/comm")
}

fn default_env_profile() -> PathBuf {
    PathBuf::from("/etc/profile.d/talon.sh")
}

/// Fully validated, immutable daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub control_clients: Vec<ClientIdentity>,
    pub daemon_name: String,
    pub log_channel: String,
    pub flavor: Flavor,
    pub r#virtual: bool,
    pub query_delay: Duration,
    pub query_timeout_iterations: usize,
    pub timeouts: Timeouts,
    pub focus_tolerance_um: f64,
    pub ha_soft_limits: SoftLimits,
    pub dec_soft_limits: SoftLimits,
    pub park_positions: HashMap<String, ParkPosition>,
    pub shm_key: i32,
    pub comm_dir: PathBuf,
    pub env_profile_path: PathBuf,
    pub controller_binary: PathBuf,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    Read(PathBuf, std::io::Error),
    #[error("failed to parse config file {0}: {1}")]
    Parse(PathBuf, toml::de::Error),
    #[error("ha_soft_limits must have low <= 0 <= high, got [{0}, {1}]")]
    InvalidHaLimits(f64, f64),
    #[error("dec_soft_limits must have low <= 0 <= high, got [{0}, {1}]")]
    InvalidDecLimits(f64, f64),
    #[error("control_clients must not be empty")]
    NoControlClients,
}

impl Config {
    /// Parse and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        Self::parse(&text, path)
    }

    fn parse(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let raw: RawConfig =
            toml::from_str(text).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;

        if raw.ha_soft_limits.low_deg > 0.0 || raw.ha_soft_limits.high_deg < 0.0 {
            return Err(ConfigError::InvalidHaLimits(
                raw.ha_soft_limits.low_deg,
                raw.ha_soft_limits.high_deg,
            ));
        }
        if raw.dec_soft_limits.low_deg > 0.0 || raw.dec_soft_limits.high_deg < 0.0 {
            return Err(ConfigError::InvalidDecLimits(
                raw.dec_soft_limits.low_deg,
                raw.dec_soft_limits.high_deg,
            ));
        }
        if raw.control_clients.is_empty() {
            return Err(ConfigError::NoControlClients);
        }

        Ok(Config {
            control_clients: raw
                .control_clients
                .into_iter()
                .map(ClientIdentity::new)
                .collect(),
            daemon_name: raw.daemon_name,
            log_channel: raw.log_channel,
            flavor: raw.flavor,
            r#virtual: raw.r#virtual,
            query_delay: raw.query_delay,
            query_timeout_iterations: raw.query_timeout_iterations,
            timeouts: raw.timeouts,
            focus_tolerance_um: raw.focus_tolerance_um,
            ha_soft_limits: raw.ha_soft_limits,
            dec_soft_limits: raw.dec_soft_limits,
            park_positions: raw.park_positions,
            shm_key: raw.shm_key,
            comm_dir: raw.comm_dir,
            env_profile_path: raw.env_profile_path,
            controller_binary: raw.controller_binary,
        })
    }

    pub fn is_control_client(&self, who: &ClientIdentity) -> bool {
        self.control_clients.contains(who)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
