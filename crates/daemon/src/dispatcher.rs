// SPDX-License-Identifier: MIT

//! The Command Dispatcher (§4.5): the public operation surface. Enforces
//! access control, command-exclusion via the non-blocking command mutex,
//! pre-flight soft-limit checks, and the FIFO-write-then-wait pattern
//! common to every motion command.

use std::sync::Arc;

use talond_adapters::{FifoWriter, FOCUS_FIFO, TEL_FIFO};
use talond_core::{ClientIdentity, CommandError, Config, FocusState, PointingState};
use tracing::{info, warn};

use crate::astro::AstroRoutines;
use crate::gates::Gates;
use crate::recovery::spawn_controller_process;

type CmdResult = Result<(), CommandError>;

/// External security-interlock peer (full flavor only, §4.5 `initialize`).
/// A pluggable boundary for the same reason [`AstroRoutines`] is: the real
/// interlock is an RPC call to hardware this crate does not own.
pub trait InterlockClient: Send + Sync {
    /// `Ok(true)` iff the named interlock reports safe-to-initialize.
    fn is_safe(&self, handle: &str, key: &str) -> Result<bool, InterlockError>;
}

#[derive(Debug, thiserror::Error)]
#[error("interlock communication failure: {0}")]
pub struct InterlockError(pub String);

/// Controller-native encoder counts per radian of hour angle/declination.
/// The wire contract (§6) does not state this scale factor; this value is
/// a placeholder consistent with the controller's other fixed-point fields
/// and is only exercised by `park` positions expressed in (alt,az) (see
/// DESIGN.md).
const ENCODER_COUNTS_PER_RADIAN: f64 = 1_000_000.0;

pub struct Dispatcher {
    config: Arc<Config>,
    gates: Arc<Gates>,
    fifo: Arc<dyn FifoWriter>,
    astro: Arc<dyn AstroRoutines>,
    interlock: Arc<dyn InterlockClient>,
}

impl Dispatcher {
    pub fn new(
        config: Arc<Config>,
        gates: Arc<Gates>,
        fifo: Arc<dyn FifoWriter>,
        astro: Arc<dyn AstroRoutines>,
        interlock: Arc<dyn InterlockClient>,
    ) -> Self {
        Self {
            config,
            gates,
            fifo,
            astro,
            interlock,
        }
    }

    fn require_control_client(&self, caller: &ClientIdentity) -> CmdResult {
        if self.config.is_control_client(caller) {
            Ok(())
        } else {
            Err(CommandError::InvalidControlIp)
        }
    }

    fn require_present(&self) -> Result<talond_core::Snapshot, CommandError> {
        let snap = self.gates.snapshot();
        if snap.pointing_state == PointingState::Absent {
            Err(CommandError::NotInitialized)
        } else {
            Ok(snap)
        }
    }

    fn require_homed(&self) -> Result<talond_core::Snapshot, CommandError> {
        let snap = self.require_present()?;
        if snap.axes_homed {
            Ok(snap)
        } else {
            Err(CommandError::NotHomed)
        }
    }

    fn write_tel(&self, command: impl AsRef<str>) -> CmdResult {
        self.fifo
            .write_command(TEL_FIFO, command.as_ref())
            .map_err(|e| CommandError::failed(format!("Tel.in write failed: {e}")))
    }

    fn write_focus(&self, command: impl AsRef<str>) -> CmdResult {
        self.fifo
            .write_command(FOCUS_FIFO, command.as_ref())
            .map_err(|e| CommandError::failed(format!("Focus.in write failed: {e}")))
    }

    /// Check a computed hour-angle/declination pair against the configured
    /// soft limits (§4.5, §8 invariant 5).
    fn check_soft_limits(&self, ha_rad: f64, dec_rad: f64) -> CmdResult {
        if !self.config.ha_soft_limits.contains(ha_rad.to_degrees()) {
            return Err(CommandError::OutsideHaLimits);
        }
        if !self.config.dec_soft_limits.contains(dec_rad.to_degrees()) {
            return Err(CommandError::OutsideDecLimits);
        }
        Ok(())
    }

    /// Write an absolute-move command, wait for `Stopped`, then reset the
    /// offset accumulator (§4.5, §8 invariant 3).
    fn slew_and_reset_offset(&self, command: String) -> CmdResult {
        self.write_tel(command)?;
        let reached = self.gates.wait_for_pointing(
            Some(PointingState::Slewing),
            PointingState::Stopped,
            self.config.timeouts.slew,
        );
        if !reached {
            return Err(CommandError::failed("timed out or stopped waiting for slew to complete"));
        }
        self.reset_offset()
    }

    fn reset_offset(&self) -> CmdResult {
        *self.gates.offset.lock() = talond_core::Offset::default();
        self.write_tel("xdelta(0,0)")
    }

    // -- initialize --------------------------------------------------

    pub fn initialize(&self, caller: &ClientIdentity) -> CmdResult {
        self.require_control_client(caller)?;
        let _guard = self.gates.try_command().ok_or(CommandError::Blocked)?;

        if self.gates.snapshot().pointing_state != PointingState::Absent {
            return Err(CommandError::AlreadyInitialized);
        }

        if let talond_core::Flavor::Full {
            interlock_handle,
            interlock_key,
        } = &self.config.flavor
        {
            match self.interlock.is_safe(interlock_handle, interlock_key) {
                Ok(true) => {}
                Ok(false) => return Err(CommandError::SecuritySystemTripped),
                Err(_) => return Err(CommandError::CannotCommunicateWithSecuritySystem),
            }
        }

        let child = spawn_controller_process(&self.config)?;
        info!(pid = child.id(), "spawned controller process");
        drop(child);

        if self.gates.wait_until_pointing_present(self.config.timeouts.initialization) {
            Ok(())
        } else {
            Err(CommandError::failed("controller did not become present within the initialization timeout"))
        }
    }

    // -- shutdown ------------------------------------------------------

    pub fn shutdown(&self, caller: &ClientIdentity) -> CmdResult {
        self.require_control_client(caller)?;
        let _guard = self.gates.try_command().ok_or(CommandError::Blocked)?;
        let snap = self.require_present()?;

        talond_adapters::send_sigint(snap.controller_pid)
            .map_err(|e| CommandError::failed(format!("failed to signal controller: {e}")))?;
        Ok(())
    }

    // -- home ------------------------------------------------------------

    pub fn home(&self, caller: &ClientIdentity) -> CmdResult {
        self.require_control_client(caller)?;
        let _guard = self.gates.try_command().ok_or(CommandError::Blocked)?;
        let snap = self.require_present()?;

        self.write_tel("homeH")?;
        if !self.gates.wait_for_pointing(Some(PointingState::Homing), PointingState::Stopped, self.config.timeouts.homing) {
            return Err(CommandError::failed("timed out homing HA axis"));
        }

        self.write_tel("homeD")?;
        if !self.gates.wait_for_pointing(Some(PointingState::Homing), PointingState::Stopped, self.config.timeouts.homing) {
            return Err(CommandError::failed("timed out homing Dec axis"));
        }

        if snap.focus_state != FocusState::Absent {
            self.write_focus("home")?;
            if !self.gates.wait_for_focus_state(Some(FocusState::Homing), FocusState::Ready, self.config.timeouts.homing) {
                return Err(CommandError::failed("timed out homing focus axis"));
            }
        }

        Ok(())
    }

    // -- limits ------------------------------------------------------------

    pub fn limits(&self, caller: &ClientIdentity) -> CmdResult {
        self.require_control_client(caller)?;
        let _guard = self.gates.try_command().ok_or(CommandError::Blocked)?;
        let snap = self.require_homed()?;

        self.slew_to_zenith()?;

        self.write_tel("limitsH")?;
        if !self.gates.wait_for_pointing(Some(PointingState::Limiting), PointingState::Stopped, self.config.timeouts.limit) {
            return Err(CommandError::failed("timed out finding HA limits"));
        }

        self.slew_to_zenith()?;

        self.write_tel("limitsD")?;
        if !self.gates.wait_for_pointing(Some(PointingState::Limiting), PointingState::Stopped, self.config.timeouts.limit) {
            return Err(CommandError::failed("timed out finding Dec limits"));
        }

        self.slew_to_zenith()?;

        if snap.focus_state != FocusState::Absent {
            self.write_focus("limits")?;
            if !self.gates.wait_for_focus_state(Some(FocusState::Limiting), FocusState::Ready, self.config.timeouts.limit) {
                return Err(CommandError::failed("timed out finding focus limits"));
            }
        }

        Ok(())
    }

    fn slew_to_zenith(&self) -> CmdResult {
        self.slew_and_reset_offset(format!("Alt: {} Az: {}", std::f64::consts::FRAC_PI_2, 0.0))
    }

    // -- slew --------------------------------------------------------------

    pub fn slew_altaz(&self, caller: &ClientIdentity, alt_deg: f64, az_deg: f64) -> CmdResult {
        self.require_control_client(caller)?;
        let snap = self.require_homed()?;

        let alt_rad = alt_deg.to_radians();
        let az_rad = az_deg.to_radians();
        let (ha_rad, dec_rad) = self.astro.altaz_to_hadec(alt_rad, az_rad, snap.site.lat_rad);
        self.check_soft_limits(ha_rad, dec_rad)?;

        let _guard = self.gates.try_command().ok_or(CommandError::Blocked)?;
        self.slew_and_reset_offset(format!("Alt: {alt_rad} Az: {az_rad}"))
    }

    pub fn slew_hadec(&self, caller: &ClientIdentity, ha_deg: f64, dec_deg: f64) -> CmdResult {
        self.require_control_client(caller)?;
        self.require_homed()?;

        let ha_rad = ha_deg.to_radians();
        let dec_rad = dec_deg.to_radians();
        self.check_soft_limits(ha_rad, dec_rad)?;

        let _guard = self.gates.try_command().ok_or(CommandError::Blocked)?;
        self.slew_and_reset_offset(format!("HA: {ha_rad} Dec: {dec_rad}"))
    }

    pub fn slew_radec(&self, caller: &ClientIdentity, ra_deg: f64, dec_deg: f64) -> CmdResult {
        self.require_control_client(caller)?;
        let snap = self.require_homed()?;

        let (ha_rad, dec_rad) = self.radec_to_hadec(ra_deg, dec_deg, &snap);
        self.check_soft_limits(ha_rad, dec_rad)?;

        let _guard = self.gates.try_command().ok_or(CommandError::Blocked)?;
        self.slew_and_reset_offset(self.radec_command(ra_deg, dec_deg))
    }

    /// Hour angle is `LST - RA`; the controller's own last-reported LST is
    /// used rather than an independently computed sidereal time (§9: the
    /// controller already observes this).
    fn radec_to_hadec(&self, ra_deg: f64, dec_deg: f64, snap: &talond_core::Snapshot) -> (f64, f64) {
        let ra_rad = ra_deg.to_radians();
        let dec_rad = dec_deg.to_radians();
        let ha_rad = wrap_signed_pi(snap.angles.lst - ra_rad);
        (ha_rad, dec_rad)
    }

    fn radec_command(&self, ra_deg: f64, dec_deg: f64) -> String {
        format!("RA: {} Dec: {} Epoch: 2000", ra_deg.to_radians(), dec_deg.to_radians())
    }

    // -- track ---------------------------------------------------------

    pub fn track_radec(&self, caller: &ClientIdentity, ra_deg: f64, dec_deg: f64) -> CmdResult {
        self.require_control_client(caller)?;
        let snap = self.require_homed()?;

        let (ha_rad, dec_rad) = self.radec_to_hadec(ra_deg, dec_deg, &snap);
        self.check_soft_limits(ha_rad, dec_rad)?;

        let _guard = self.gates.try_command().ok_or(CommandError::Blocked)?;
        let command = self.radec_command(ra_deg, dec_deg);

        self.slew_and_reset_offset(command.clone())?;

        self.write_tel(command)?;
        if self.gates.wait_for_pointing(Some(PointingState::Hunting), PointingState::Tracking, self.config.timeouts.slew) {
            Ok(())
        } else {
            Err(CommandError::failed("timed out acquiring tracking lock"))
        }
    }

    // -- offset --------------------------------------------------------

    pub fn offset_radec(&self, caller: &ClientIdentity, d_ra_deg: f64, d_dec_deg: f64) -> CmdResult {
        self.require_control_client(caller)?;
        let snap = self.require_homed()?;
        let _guard = self.gates.try_command().ok_or(CommandError::Blocked)?;

        match snap.pointing_state {
            PointingState::Tracking | PointingState::Hunting => {
                let mut offset = self.gates.offset.lock();
                offset.accumulate(d_ra_deg, d_dec_deg);
                let (ra, dec) = (offset.ra_deg, offset.dec_deg);
                drop(offset);
                self.write_tel(format!("xdelta({ra},{dec})"))
            }
            PointingState::Stopped => {
                let target_ha = snap.angles.ha_apparent + d_ra_deg.to_radians();
                let target_dec = snap.angles.dec_apparent + d_dec_deg.to_radians();
                self.check_soft_limits(target_ha, target_dec)?;
                self.write_tel(format!("HA: {target_ha} Dec: {target_dec}"))?;
                if !self.gates.wait_for_pointing(Some(PointingState::Slewing), PointingState::Stopped, self.config.timeouts.slew) {
                    return Err(CommandError::failed("timed out slewing to offset target"));
                }
                self.gates.offset.lock().accumulate(d_ra_deg, d_dec_deg);
                Ok(())
            }
            other => Err(CommandError::failed(format!("offset_radec requires Tracking, Hunting, or Stopped, got {other}"))),
        }
    }

    // -- park ------------------------------------------------------------

    pub fn park(&self, caller: &ClientIdentity, name: &str) -> CmdResult {
        self.require_control_client(caller)?;
        let snap = self.require_homed()?;
        let _guard = self.gates.try_command().ok_or(CommandError::Blocked)?;

        let position = self
            .config
            .park_positions
            .get(name)
            .ok_or_else(|| CommandError::failed(format!("unknown park position {name}")))?;

        let (ha_enc, dec_enc) = match position.target {
            talond_core::ParkTarget::Encoder { ha_enc, dec_enc } => (ha_enc, dec_enc),
            talond_core::ParkTarget::AltAz { alt_deg, az_deg } => {
                let (ha_rad, dec_rad) =
                    self.astro.altaz_to_hadec(alt_deg.to_radians(), az_deg.to_radians(), snap.site.lat_rad);
                (
                    (ha_rad * ENCODER_COUNTS_PER_RADIAN) as i64,
                    (dec_rad * ENCODER_COUNTS_PER_RADIAN) as i64,
                )
            }
        };

        *self.gates.offset.lock() = talond_core::Offset::default();
        self.write_tel(format!("park {ha_enc} {dec_enc}"))?;

        if self.gates.wait_for_pointing(Some(PointingState::Slewing), PointingState::Stopped, self.config.timeouts.slew) {
            Ok(())
        } else {
            Err(CommandError::failed("timed out parking"))
        }
    }

    // -- focus -----------------------------------------------------------

    pub fn telescope_focus(&self, caller: &ClientIdentity, target_um: f64) -> CmdResult {
        self.require_control_client(caller)?;
        if !self.config.flavor.is_full() {
            return Err(CommandError::failed("focus operations require the full hardware flavor"));
        }
        let snap = self.require_homed()?;
        if snap.focus_state == FocusState::Absent {
            return Err(CommandError::failed("focus axis is not present"));
        }
        let _guard = self.gates.try_command().ok_or(CommandError::Blocked)?;

        if (snap.telescope_focus_um - target_um).abs() < self.config.focus_tolerance_um {
            return Ok(());
        }

        let delta_um = target_um - snap.telescope_focus_um;
        self.write_focus(format!("{delta_um}"))?;

        loop {
            let outcome = self.gates.wait_for_focus_tick(self.config.timeouts.focus);
            if outcome.force_stopped {
                return Err(CommandError::failed("focus move was stopped"));
            }
            if outcome.timed_out || !outcome.changed {
                return Err(CommandError::failed("focus stalled before reaching target"));
            }
            if (outcome.focus_um - target_um).abs() < self.config.focus_tolerance_um {
                return Ok(());
            }
        }
    }

    // -- stop / ping / status --------------------------------------------

    pub fn stop(&self, caller: &ClientIdentity) -> CmdResult {
        self.require_control_client(caller)?;
        if self.gates.snapshot().pointing_state == PointingState::Absent {
            return Err(CommandError::NotInitialized);
        }

        self.gates.stop_signal(|| -> CmdResult {
            self.write_tel("Stop")?;
            self.write_focus("Stop")?;
            Ok(())
        })
    }

    pub fn ping(&self, caller: &ClientIdentity) -> CmdResult {
        self.require_control_client(caller)?;
        Ok(())
    }

    pub fn status(&self) -> talond_core::StatusReport {
        let snap = self.gates.snapshot();
        let offset = *self.gates.offset.lock();
        crate::status::build_status_report(&snap, offset, &self.config, &self.astro)
    }
}

fn wrap_signed_pi(mut angle: f64) -> f64 {
    let two_pi = 2.0 * std::f64::consts::PI;
    angle %= two_pi;
    if angle > std::f64::consts::PI {
        angle -= two_pi;
    } else if angle < -std::f64::consts::PI {
        angle += two_pi;
    }
    angle
}

/// Always reports safe; used by tests and by the `lite` flavor path where no
/// interlock is configured.
#[cfg(any(test, feature = "test-support"))]
pub struct FakeInterlockClient {
    pub safe: bool,
    pub fail: bool,
}

#[cfg(any(test, feature = "test-support"))]
impl InterlockClient for FakeInterlockClient {
    fn is_safe(&self, _handle: &str, _key: &str) -> Result<bool, InterlockError> {
        if self.fail {
            Err(InterlockError("simulated comm failure".into()))
        } else {
            Ok(self.safe)
        }
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
