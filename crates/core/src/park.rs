// SPDX-License-Identifier: MIT

//! Named park positions (§3). A park position is either expressed in
//! (alt,az) degrees or directly in controller-native encoder units.

use serde::{Deserialize, Serialize};

/// The target of a park command, in whichever frame the configuration
/// author chose for that named pose.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParkTarget {
    /// Altitude/azimuth in degrees.
    AltAz { alt_deg: f64, az_deg: f64 },
    /// Controller-native hour-angle/declination encoder units.
    Encoder { ha_enc: i64, dec_enc: i64 },
}

/// A named, safe mechanical pose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParkPosition {
    pub description: String,
    pub target: ParkTarget,
}
