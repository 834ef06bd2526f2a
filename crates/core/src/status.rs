// SPDX-License-Identifier: MIT

//! The status record the reporter projects from a [`crate::Snapshot`]
//! (§4.6). Fields are grouped into optional sub-records so the
//! field-presence contract of the source system ("a property is included
//! only when it is meaningful") survives the move to a typed language,
//! per the design note on dynamic status dictionaries.

use serde::{Deserialize, Serialize};

use crate::focus::FocusState;
use crate::pointing::PointingState;
use crate::snapshot::Site;

/// Present whenever `axes_homed` is true (§4.6).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointingDetail {
    pub ra_deg: f64,
    pub dec_deg: f64,
    pub offset_ra_deg: f64,
    pub offset_dec_deg: f64,
    pub ha_deg: f64,
    pub alt_deg: f64,
    pub az_deg: f64,
    pub sun_separation_deg: f64,
    pub moon_separation_deg: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub pointing_state: PointingState,
    pub pointing_state_label: String,

    /// Present iff the controller is alive.
    pub site: Option<Site>,
    /// Present iff `pointing_state != Absent`.
    pub axes_homed: Option<bool>,
    /// Present iff `pointing_state != Absent`.
    pub lst_rad: Option<f64>,
    /// Present iff the flavor is `full`.
    pub telescope_focus_state: Option<FocusState>,
    /// Present iff `axes_homed`.
    pub pointing: Option<PointingDetail>,
    /// Present iff the focus axis is not `Absent`.
    pub telescope_focus_um: Option<f64>,
}

impl StatusReport {
    /// The minimal report: just the pointing state, always present (§4.6).
    pub fn absent(state: PointingState) -> Self {
        Self {
            pointing_state: state,
            pointing_state_label: state.label().to_string(),
            site: None,
            axes_homed: None,
            lst_rad: None,
            telescope_focus_state: None,
            pointing: None,
            telescope_focus_um: None,
        }
    }
}
