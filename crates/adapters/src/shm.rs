// SPDX-License-Identifier: MIT

//! Shared-Memory Reader (§4.1): attaches to the controller's SysV segment
//! by a well-known key and exposes typed reads at fixed byte offsets.
//! Stateless across calls — every `read()` re-reads the live segment.

use std::ptr;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

// Byte offsets into the controller's shared segment, per §6. These are the
// controller's wire contract, not ours — never reorder without a matching
// change on the controller side.
const OFF_PID: usize = 0;
const OFF_TOD: usize = 8;
const OFF_POINTING_STATE: usize = 16;
const OFF_POINTING_INDEX: usize = 20;
const OFF_RA_J2000: usize = 24;
const OFF_DEC_J2000: usize = 32;
const OFF_HA_APPARENT: usize = 40;
const OFF_DEC_APPARENT: usize = 48;
const OFF_LST: usize = 56;
const OFF_ALT: usize = 64;
const OFF_AZ: usize = 72;
const OFF_RA_FLAGS: usize = 80;
const OFF_DEC_FLAGS: usize = 82;
const OFF_FOCUS_FLAGS: usize = 84;
const OFF_FOCUS_STEP: usize = 88;
const OFF_FOCUS_POS: usize = 96;
const OFF_FOCUS_DF: usize = 104;
const OFF_SITE_LAT: usize = 112;
const OFF_SITE_LON: usize = 120;
const OFF_SITE_ELEVATION: usize = 128;

/// Total segment size we require to be mapped. A few spare bytes beyond the
/// last field, matching how the controller's own struct is padded.
const SEGMENT_SIZE: usize = 160;

/// Earth radius in meters, the scale factor for the site-elevation field
/// (stored by the controller in Earth-radii units, §6).
const EARTH_RADIUS_M: f64 = 6_378_137.0;

#[derive(Debug, Error)]
pub enum ShmError {
    #[error("no shared-memory segment exists for key {0} (controller absent)")]
    ControllerAbsent(i32),
    #[error("shmat failed for key {0}: errno {1}")]
    AttachFailed(i32, i32),
}

/// Raw telemetry fields, decoded only as far as "typed read" — bit-field and
/// derived-value decoding happens in `talond-core`/`talond-daemon`, which
/// don't need to know about byte offsets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawTelemetry {
    pub pid: i32,
    pub tod_mjd: f64,
    pub pointing_state: i32,
    pub pointing_index: i32,
    pub ra_j2000: f64,
    pub dec_j2000: f64,
    pub ha_apparent: f64,
    pub dec_apparent: f64,
    pub lst: f64,
    pub alt: f64,
    pub az: f64,
    pub ra_flags: u16,
    pub dec_flags: u16,
    pub focus_flags: u16,
    pub focus_step: i32,
    pub focus_pos: f64,
    pub focus_df: f64,
    pub site_lat_rad: f64,
    pub site_lon_rad: f64,
    /// Already scaled to meters (the raw field is in Earth-radii units).
    pub site_elevation_m: f64,
}

/// A source of controller telemetry. The only real implementation attaches
/// to SysV shared memory; tests use [`FakeTelemetrySource`].
pub trait TelemetrySource: Send + Sync {
    fn read(&self) -> Result<RawTelemetry, ShmError>;
}

struct Attachment {
    shmid: i32,
    addr: *mut libc::c_void,
}

// SAFETY: the segment is read-only from our side and every read goes
// through the reader's own mutex, so concurrent access from multiple
// threads is serialized at the Rust level even though the raw pointer
// itself is not `Sync` by default.
unsafe impl Send for Attachment {}

impl Drop for Attachment {
    fn drop(&mut self) {
        // SAFETY: `addr` came from a successful shmat in `attach`.
        unsafe {
            libc::shmdt(self.addr);
        }
    }
}

/// Reads the controller's shared-memory segment by SysV key.
///
/// Re-attaches lazily: construction does not fail if the controller is not
/// yet running, since the poller is expected to retry every tick (§4.3).
pub struct ShmTelemetrySource {
    key: i32,
    attachment: Mutex<Option<Arc<Attachment>>>,
}

impl ShmTelemetrySource {
    pub fn new(key: i32) -> Self {
        Self {
            key,
            attachment: Mutex::new(None),
        }
    }

    fn attach(&self) -> Result<Arc<Attachment>, ShmError> {
        // SAFETY: shmget with IPC_CREAT unset only looks up an existing
        // segment; we never create one (the controller owns creation).
        let shmid = unsafe { libc::shmget(self.key, SEGMENT_SIZE, 0o600) };
        if shmid < 0 {
            return Err(ShmError::ControllerAbsent(self.key));
        }
        // SAFETY: shmid was just validated by the successful shmget above.
        let addr = unsafe { libc::shmat(shmid, ptr::null(), libc::SHM_RDONLY) };
        if addr as isize == -1 {
            // SAFETY: errno is set by the failing libc call immediately above.
            let errno = unsafe { *libc::__errno_location() };
            return Err(ShmError::AttachFailed(self.key, errno));
        }
        Ok(Arc::new(Attachment { shmid, addr }))
    }

    fn current(&self) -> Result<Arc<Attachment>, ShmError> {
        let mut guard = self.attachment.lock();
        let attachment = match guard.as_ref() {
            Some(a) => Arc::clone(a),
            None => {
                let fresh = self.attach()?;
                *guard = Some(Arc::clone(&fresh));
                fresh
            }
        };
        Ok(attachment)
    }

    /// Read a field at `offset`, validated against the segment bound at
    /// compile-reachable call sites via the `OFF_*` constants above.
    ///
    /// # Safety
    /// `offset + size_of::<T>() <= SEGMENT_SIZE` must hold for every call
    /// site; this is enforced by construction since all offsets are fixed
    /// constants checked against `SEGMENT_SIZE` in tests.
    unsafe fn read_at<T: Copy>(base: *mut libc::c_void, offset: usize) -> T {
        let ptr = (base as *const u8).add(offset) as *const T;
        ptr::read_unaligned(ptr)
    }
}

impl TelemetrySource for ShmTelemetrySource {
    fn read(&self) -> Result<RawTelemetry, ShmError> {
        let attachment = match self.current() {
            Ok(a) => a,
            Err(_) => {
                // Drop any stale handle and retry once: the controller may
                // have restarted with a fresh segment under the same key.
                *self.attachment.lock() = None;
                let fresh = self.attach()?;
                *self.attachment.lock() = Some(Arc::clone(&fresh));
                fresh
            }
        };
        let base = attachment.addr;

        // SAFETY: each offset + field width is within SEGMENT_SIZE (see
        // `shm_tests::offsets_fit_within_segment`), and the segment stays
        // mapped for the lifetime of `attachment`.
        unsafe {
            Ok(RawTelemetry {
                pid: Self::read_at(base, OFF_PID),
                tod_mjd: Self::read_at(base, OFF_TOD),
                pointing_state: Self::read_at(base, OFF_POINTING_STATE),
                pointing_index: Self::read_at(base, OFF_POINTING_INDEX),
                ra_j2000: Self::read_at(base, OFF_RA_J2000),
                dec_j2000: Self::read_at(base, OFF_DEC_J2000),
                ha_apparent: Self::read_at(base, OFF_HA_APPARENT),
                dec_apparent: Self::read_at(base, OFF_DEC_APPARENT),
                lst: Self::read_at(base, OFF_LST),
                alt: Self::read_at(base, OFF_ALT),
                az: Self::read_at(base, OFF_AZ),
                ra_flags: Self::read_at(base, OFF_RA_FLAGS),
                dec_flags: Self::read_at(base, OFF_DEC_FLAGS),
                focus_flags: Self::read_at(base, OFF_FOCUS_FLAGS),
                focus_step: Self::read_at(base, OFF_FOCUS_STEP),
                focus_pos: Self::read_at(base, OFF_FOCUS_POS),
                focus_df: Self::read_at(base, OFF_FOCUS_DF),
                site_lat_rad: Self::read_at(base, OFF_SITE_LAT),
                site_lon_rad: Self::read_at(base, OFF_SITE_LON),
                site_elevation_m: {
                    let raw: f64 = Self::read_at(base, OFF_SITE_ELEVATION);
                    raw * EARTH_RADIUS_M
                },
            })
        }
    }
}

/// An in-memory stand-in for [`ShmTelemetrySource`], for daemon-side tests
/// that need to drive the poller without a real controller process.
#[cfg(any(test, feature = "test-support"))]
pub struct FakeTelemetrySource {
    state: Mutex<Option<RawTelemetry>>,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeTelemetrySource {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(None),
        }
    }

    pub fn set(&self, telemetry: RawTelemetry) {
        *self.state.lock() = Some(telemetry);
    }

    pub fn clear(&self) {
        *self.state.lock() = None;
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Default for FakeTelemetrySource {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-support"))]
impl TelemetrySource for FakeTelemetrySource {
    fn read(&self) -> Result<RawTelemetry, ShmError> {
        self.state.lock().ok_or(ShmError::ControllerAbsent(0))
    }
}

#[cfg(test)]
#[path = "shm_tests.rs"]
mod tests;
