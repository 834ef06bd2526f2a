// SPDX-License-Identifier: MIT

//! The telemetry snapshot (§3) and the differential pointing offset.
//!
//! `Snapshot` is mutated only by the Telemetry Poller, and only while it
//! holds both condition-variable mutexes (§5). Everywhere else it is read
//! through a shared, cloned value.

use serde::{Deserialize, Serialize};

use crate::focus::FocusState;
use crate::pointing::PointingState;

/// Site location, captured once when the controller first comes alive
/// (§4.3 step 9) and held until the controller dies.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Site {
    pub lat_rad: f64,
    pub lon_rad: f64,
    pub elevation_m: f64,
}

/// Angles reported by the controller, all in radians.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Angles {
    pub ra_j2000: f64,
    pub dec_j2000: f64,
    pub ha_apparent: f64,
    pub dec_apparent: f64,
    pub alt: f64,
    pub az: f64,
    pub lst: f64,
}

/// The latest view of controller state, plus the previous tick's copy of
/// the fields the poller needs for edge detection.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub pointing_state: PointingState,
    pub pointing_index: i32,
    pub focus_state: FocusState,
    pub telescope_focus_um: f64,
    pub angles: Angles,
    pub axes_homed: bool,
    pub controller_pid: i32,
    pub controller_tod_mjd: f64,
    pub site: Site,

    pub last_pointing_index: i32,
    pub last_telescope_focus_um: f64,
    pub last_focus_state: FocusState,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            pointing_state: PointingState::Absent,
            pointing_index: 0,
            focus_state: FocusState::Absent,
            telescope_focus_um: 0.0,
            angles: Angles::default(),
            axes_homed: false,
            controller_pid: 0,
            controller_tod_mjd: 0.0,
            site: Site::default(),
            last_pointing_index: 0,
            last_telescope_focus_um: 0.0,
            last_focus_state: FocusState::Absent,
        }
    }
}

impl Snapshot {
    /// Reset to the empty, controller-absent state (§4.7, on observed death).
    pub fn reset_absent(&mut self) {
        self.pointing_state = PointingState::Absent;
        self.pointing_index = 0;
        self.focus_state = FocusState::Absent;
        self.telescope_focus_um = 0.0;
        self.axes_homed = false;
        self.controller_pid = 0;
        self.controller_tod_mjd = 0.0;
        // `angles` and `site` are left as last observed; clients reading a
        // dead-controller snapshot should rely on `pointing_state` alone.
    }

    pub fn pointing_index_changed(&self) -> bool {
        self.pointing_index != self.last_pointing_index
    }

    pub fn focus_changed(&self) -> bool {
        self.telescope_focus_um != self.last_telescope_focus_um
            || self.focus_state != self.last_focus_state
    }
}

/// Differential pointing correction (§3), mutated only under the command
/// mutex.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Offset {
    pub ra_deg: f64,
    pub dec_deg: f64,
}

impl Offset {
    pub fn reset(&mut self) {
        self.ra_deg = 0.0;
        self.dec_deg = 0.0;
    }

    pub fn accumulate(&mut self, d_ra_deg: f64, d_dec_deg: f64) {
        self.ra_deg += d_ra_deg;
        self.dec_deg += d_dec_deg;
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
