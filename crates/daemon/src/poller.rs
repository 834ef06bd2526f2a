// SPDX-License-Identifier: MIT

//! The Telemetry Poller (§4.3): the daemon's sole writer of [`Snapshot`].
//!
//! Runs on a dedicated thread at `query_delay` cadence. Each tick reads the
//! shared-memory segment through a [`TelemetrySource`], decodes derived
//! state, and commits it via [`Gates::mutate_snapshot`], which handles the
//! pointing/focus condvar broadcast itself. The read happens before any
//! `Gates` lock is taken — `shm_access` guards reconnection, not the commit.

use std::f64::consts::PI;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use talond_adapters::{is_process_alive, kill_process_tree, LivenessRing, TelemetrySource};
use talond_core::{FocusState, PointingState};
use tracing::{info, warn};

use crate::gates::Gates;

/// Name of the auxiliary controller process tree, passed to `killall` on an
/// observed controller death (§4.7).
const AUX_PROCESS_NAME: &str = "rund";

pub struct TelemetryPoller {
    gates: Arc<Gates>,
    source: Arc<dyn TelemetrySource>,
    comm_dir: std::path::PathBuf,
    query_delay: Duration,
    ring: Mutex<LivenessRing>,
    last_alive: AtomicBool,
    shm_access: Arc<parking_lot::Mutex<()>>,
}

impl TelemetryPoller {
    pub fn new(
        gates: Arc<Gates>,
        source: Arc<dyn TelemetrySource>,
        comm_dir: std::path::PathBuf,
        query_delay: Duration,
        query_timeout_iterations: usize,
    ) -> Self {
        Self {
            gates,
            source,
            comm_dir,
            query_delay,
            ring: Mutex::new(LivenessRing::new(query_timeout_iterations)),
            last_alive: AtomicBool::new(false),
            shm_access: Arc::new(parking_lot::Mutex::new(())),
        }
    }

    /// Run forever at `query_delay` cadence until `stop_flag` is set.
    pub fn run(&self, stop_flag: &AtomicBool) {
        while !stop_flag.load(Ordering::Relaxed) {
            self.tick();
            std::thread::sleep(self.query_delay);
        }
    }

    /// One poll cycle. Public for tests, which drive it directly instead of
    /// spawning a thread.
    pub fn tick(&self) {
        let was_alive = self.last_alive.load(Ordering::Acquire);

        let read = {
            let _shm_guard = self.shm_access.lock();
            self.source.read()
        };

        let (alive, decoded) = match read {
            Ok(raw) => {
                let mut ring = self.ring.lock();
                ring.push(raw.tod_mjd);
                let advancing = raw.tod_mjd > 0.0 && ring.has_advanced();
                let process_alive = is_process_alive(raw.pid);
                if advancing && process_alive {
                    (true, Some(raw))
                } else {
                    (false, None)
                }
            }
            Err(_) => (false, None),
        };

        self.gates.mutate_snapshot(|snap| {
            snap.last_pointing_index = snap.pointing_index;
            snap.last_telescope_focus_um = snap.telescope_focus_um;
            snap.last_focus_state = snap.focus_state;

            match decoded {
                Some(raw) => {
                    let focus_state = FocusState::decode(raw.focus_flags);
                    let ra_homed = raw.ra_flags & 0x200 != 0;
                    let dec_homed = raw.dec_flags & 0x200 != 0;
                    let focus_homed = focus_state == FocusState::Absent || raw.focus_flags & 0x200 != 0;

                    snap.pointing_state = PointingState::from_raw(raw.pointing_state);
                    snap.pointing_index = raw.pointing_index;
                    snap.focus_state = focus_state;
                    snap.telescope_focus_um = focus_microns(raw.focus_step, raw.focus_pos, raw.focus_df);
                    snap.angles.ra_j2000 = raw.ra_j2000;
                    snap.angles.dec_j2000 = raw.dec_j2000;
                    snap.angles.ha_apparent = raw.ha_apparent;
                    snap.angles.dec_apparent = raw.dec_apparent;
                    snap.angles.lst = raw.lst;
                    snap.angles.alt = raw.alt;
                    snap.angles.az = raw.az;
                    snap.axes_homed = ra_homed && dec_homed && focus_homed;
                    snap.controller_pid = raw.pid;
                    snap.controller_tod_mjd = raw.tod_mjd;

                    if !was_alive {
                        snap.site.lat_rad = raw.site_lat_rad;
                        snap.site.lon_rad = raw.site_lon_rad;
                        snap.site.elevation_m = raw.site_elevation_m;
                    }
                }
                None => snap.reset_absent(),
            }
        });

        if was_alive && !alive {
            info!("controller transitioned alive -> dead; running recovery cleanup");
            self.ring.lock().clear();
            kill_process_tree(AUX_PROCESS_NAME);
            cleanup_comm_dir(&self.comm_dir);
            self.gates.notify_pointing();
        } else if !was_alive && alive {
            info!("controller transitioned dead -> alive");
        }

        self.last_alive.store(alive, Ordering::Release);
    }
}

/// `telescope_focus_um = focus_step * focus_pos / (2*pi * focus_df)` (§4.1).
fn focus_microns(focus_step: i32, focus_pos: f64, focus_df: f64) -> f64 {
    if focus_df == 0.0 {
        return 0.0;
    }
    f64::from(focus_step) * focus_pos / (2.0 * PI * focus_df)
}

/// Best-effort removal of every file directly under `comm_dir` (§4.3 step 8,
/// §4.7). Missing files and a missing directory are not errors — cleanup is
/// idempotent (§8 invariant 6).
fn cleanup_comm_dir(comm_dir: &std::path::Path) {
    let entries = match std::fs::read_dir(comm_dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("could not read comm dir {}: {}", comm_dir.display(), e);
            return;
        }
    };
    for entry in entries.flatten() {
        if let Err(e) = std::fs::remove_file(entry.path()) {
            warn!("failed to remove {}: {}", entry.path().display(), e);
        }
    }
}

#[cfg(test)]
#[path = "poller_tests.rs"]
mod tests;
