// SPDX-License-Identifier: MIT

//! The Status Reporter (§4.6): projects a [`Snapshot`] into a
//! [`StatusReport`], following the field-presence contract exactly.
//!
//! Never fails (§7: "status queries never fail") — it reports whatever
//! fields are currently valid, falling back to the minimal record when the
//! controller is absent.

use std::sync::Arc;

use talond_core::{Config, FocusState, Offset, PointingState, Snapshot, StatusReport};
use talond_core::status::PointingDetail;

use crate::astro::AstroRoutines;

pub fn build_status_report(
    snap: &Snapshot,
    offset: Offset,
    config: &Config,
    astro: &Arc<dyn AstroRoutines>,
) -> StatusReport {
    let mut report = StatusReport::absent(snap.pointing_state);

    let alive = snap.pointing_state != PointingState::Absent || snap.controller_pid != 0;
    if alive {
        report.site = Some(snap.site);
    }

    if snap.pointing_state == PointingState::Absent {
        return report;
    }

    report.axes_homed = Some(snap.axes_homed);
    report.lst_rad = Some(snap.angles.lst);

    if config.flavor.is_full() {
        report.telescope_focus_state = Some(snap.focus_state);
    }

    if snap.focus_state != FocusState::Absent {
        report.telescope_focus_um = Some(snap.telescope_focus_um);
    }

    if snap.axes_homed {
        let (sun_separation_deg, moon_separation_deg) =
            astro.sun_moon_separation_deg(snap.angles.ra_j2000, snap.angles.dec_j2000, snap.controller_tod_mjd);

        report.pointing = Some(PointingDetail {
            ra_deg: snap.angles.ra_j2000.to_degrees(),
            dec_deg: snap.angles.dec_j2000.to_degrees(),
            offset_ra_deg: offset.ra_deg,
            offset_dec_deg: offset.dec_deg,
            ha_deg: snap.angles.ha_apparent.to_degrees(),
            alt_deg: snap.angles.alt.to_degrees(),
            az_deg: snap.angles.az.to_degrees(),
            sun_separation_deg,
            moon_separation_deg,
        });
    }

    report
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
