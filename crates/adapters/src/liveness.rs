// SPDX-License-Identifier: MIT

//! Liveness Monitor (§4.3): a bounded ring of the controller's recently
//! observed time-of-day field, plus an OS-level process-alive probe.

use std::collections::VecDeque;

/// Bounded ring buffer of the controller's `time-of-day` field. The
/// controller is considered alive only if this ring holds at least two
/// distinct values — a single repeated value means the controller has
/// stopped advancing its own clock, even if the process is still running.
pub struct LivenessRing {
    capacity: usize,
    values: VecDeque<f64>,
}

impl LivenessRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            values: VecDeque::with_capacity(capacity.max(1)),
        }
    }

    /// Push the latest observed time-of-day value, evicting the oldest if
    /// the ring is full.
    pub fn push(&mut self, tod: f64) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(tod);
    }

    /// True iff the ring contains at least two distinct values.
    ///
    /// `f64` has no `Eq`/`Hash`, so distinctness is checked via the bit
    /// pattern — fine here since these are verbatim values pulled from
    /// shared memory, never the result of arithmetic that could produce
    /// distinct-but-equal bit patterns we'd want to collapse.
    pub fn has_advanced(&self) -> bool {
        self.values
            .iter()
            .map(|v| v.to_bits())
            .collect::<std::collections::HashSet<_>>()
            .len()
            >= 2
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

/// Probe whether `pid` names a live process, via `kill(pid, 0)` (§4.3).
///
/// `EPERM` still means the process exists (it's just owned by someone
/// else), so only `ESRCH` counts as dead.
pub fn is_process_alive(pid: i32) -> bool {
    if pid <= 0 {
        return false;
    }
    // SAFETY: signal 0 sends no signal; this is the documented way to probe
    // existence without side effects.
    let rc = unsafe { libc::kill(pid, 0) };
    if rc == 0 {
        return true;
    }
    // SAFETY: errno is set by the failing libc call immediately above.
    let errno = unsafe { *libc::__errno_location() };
    errno == libc::EPERM
}

#[cfg(test)]
#[path = "liveness_tests.rs"]
mod tests;
