// SPDX-License-Identifier: MIT

//! The daemon's process-wide synchronization primitives (§3 "Control
//! Gates", §5 concurrency model).
//!
//! Lock order, always: `command` → `pointing` → `focus` → `shm_access`.
//! `stop` is the one operation allowed to skip straight to the front
//! without the command mutex — see [`Gates::stop_signal`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};

use talond_core::{FocusState, Offset, PointingState, Snapshot};

/// A mutex/condvar pair guarding nothing by itself — the condition it
/// signals is "the snapshot changed in a way this waiter cares about".
/// Readers that only need a point-in-time view take [`Gates::snapshot`]
/// directly instead.
struct ConditionGate {
    mutex: Mutex<()>,
    condvar: Condvar,
}

impl ConditionGate {
    fn new() -> Self {
        Self {
            mutex: Mutex::new(()),
            condvar: Condvar::new(),
        }
    }
}

pub struct Gates {
    /// Non-reentrant, tried-never-waited-on command mutex (§4.5). `stop`
    /// is the sole exception: it blocks on this one to let an in-flight
    /// command observe the stop before the next command is admitted (§5).
    command: Mutex<()>,
    pointing: ConditionGate,
    focus: ConditionGate,
    /// Serializes shared-memory reconnection (§3); the adapter also
    /// self-synchronizes, this is the daemon-level lock named in the data
    /// model.
    pub shm_access: Mutex<()>,
    pub snapshot: Mutex<Snapshot>,
    /// Mutated only under the command mutex (§3), so every `CommandGuard`
    /// holder may read/write it without further synchronization.
    pub offset: Mutex<Offset>,
    force_stopped: AtomicBool,
}

/// RAII guard returned by [`Gates::try_command`]. Dropping it releases the
/// command mutex.
pub struct CommandGuard<'a>(#[allow(dead_code)] MutexGuard<'a, ()>);

impl Default for Gates {
    fn default() -> Self {
        Self::new()
    }
}

impl Gates {
    pub fn new() -> Self {
        Self {
            command: Mutex::new(()),
            pointing: ConditionGate::new(),
            focus: ConditionGate::new(),
            shm_access: Mutex::new(()),
            snapshot: Mutex::new(Snapshot::default()),
            offset: Mutex::new(Offset::default()),
            force_stopped: AtomicBool::new(false),
        }
    }

    /// Attempt to admit a command. Non-blocking: returns `None` if another
    /// command already holds the mutex (§4.5 `Blocked`).
    pub fn try_command(&self) -> Option<CommandGuard<'_>> {
        self.command.try_lock().map(CommandGuard)
    }

    pub fn force_stopped(&self) -> bool {
        self.force_stopped.load(Ordering::SeqCst)
    }

    /// `stop` bypasses `try_command`: it sets `force_stopped`, runs
    /// `fifo_writes` (the caller's `Stop` write to both FIFOs) without
    /// waiting for the command mutex, then blocks on the command mutex to
    /// let any in-flight command notice and return, then clears the flag
    /// (§4.5, §5). Writing before the mutex matters — the in-flight command
    /// may be holding it for the whole duration of a long blocking wait, and
    /// the stop write must not queue up behind that.
    pub fn stop_signal<R>(&self, fifo_writes: impl FnOnce() -> R) -> R {
        self.force_stopped.store(true, Ordering::SeqCst);
        let result = fifo_writes();
        let _guard = self.command.lock();
        self.force_stopped.store(false, Ordering::SeqCst);
        result
    }

    /// Mutate the snapshot under both condition locks (pointing then
    /// focus), per the poller's required lock order (§4.3 step 1). Returns
    /// whether the pointing index changed and whether focus changed, so
    /// the caller knows which condvar(s) to broadcast.
    pub fn mutate_snapshot(&self, f: impl FnOnce(&mut Snapshot)) -> (bool, bool) {
        let pointing_guard = self.pointing.mutex.lock();
        let focus_guard = self.focus.mutex.lock();
        let (pointing_changed, focus_changed) = {
            let mut snap = self.snapshot.lock();
            f(&mut snap);
            (snap.pointing_index_changed(), snap.focus_changed())
        };
        if pointing_changed {
            self.pointing.condvar.notify_all();
        }
        if focus_changed {
            self.focus.condvar.notify_all();
        }
        drop(focus_guard);
        drop(pointing_guard);
        (pointing_changed, focus_changed)
    }

    pub fn snapshot(&self) -> Snapshot {
        self.snapshot.lock().clone()
    }

    /// Force a pointing-condition broadcast regardless of edge detection.
    /// Used by the poller on an alive→dead transition (§4.3 step 8), where
    /// `pointing_index` may already be zero and so wouldn't otherwise be
    /// seen as "changed".
    pub fn notify_pointing(&self) {
        let _guard = self.pointing.mutex.lock();
        self.pointing.condvar.notify_all();
    }

    /// Block until `terminal` is observed on the pointing state, `timeout`
    /// elapses, or the snapshot goes `Absent` (controller died). Re-arms on
    /// `intermediate` (spurious early wake, per §4.4's wait table).
    ///
    /// Success requires the terminal state was actually reached, the
    /// controller hasn't gone `Absent`, and no force-stop intervened.
    pub fn wait_for_pointing(
        &self,
        intermediate: Option<PointingState>,
        terminal: PointingState,
        timeout: Duration,
    ) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = self.pointing.mutex.lock();
        loop {
            let state = self.snapshot.lock().pointing_state;
            if state == terminal {
                return !self.force_stopped() && state != PointingState::Absent;
            }
            if state == PointingState::Absent {
                return false;
            }
            if let Some(intermediate) = intermediate {
                if state != intermediate && state != PointingState::Stopped {
                    // Observed neither the declared intermediate nor the
                    // terminal: something else happened, stop waiting.
                    return false;
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let remaining = deadline - now;
            let timed_out = self.pointing.condvar.wait_for(&mut guard, remaining).timed_out();
            if timed_out {
                return false;
            }
        }
    }

    /// Block until the pointing state is anything but `Absent`, or
    /// `timeout` elapses (§4.5 `initialize`).
    pub fn wait_until_pointing_present(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = self.pointing.mutex.lock();
        loop {
            if self.snapshot.lock().pointing_state != PointingState::Absent {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            if self.pointing.condvar.wait_for(&mut guard, deadline - now).timed_out() {
                return false;
            }
        }
    }

    /// Same shape as [`Gates::wait_for_pointing`], but for the focus state
    /// machine (§4.4 `focus home`/`focus limits` rows).
    pub fn wait_for_focus_state(
        &self,
        intermediate: Option<FocusState>,
        terminal: FocusState,
        timeout: Duration,
    ) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = self.focus.mutex.lock();
        loop {
            let state = self.snapshot.lock().focus_state;
            if state == terminal {
                return !self.force_stopped() && state != FocusState::Absent;
            }
            if state == FocusState::Absent {
                return false;
            }
            if let Some(intermediate) = intermediate {
                if state != intermediate {
                    return false;
                }
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            if self.focus.condvar.wait_for(&mut guard, deadline - now).timed_out() {
                return false;
            }
        }
    }

    /// Block until focus telemetry changes (one poller tick), `timeout`
    /// elapses, or force-stop is observed. Returns the (possibly
    /// unchanged) current focus microns and state to the caller, which
    /// decides success/timeout/failure per §4.5's `telescope_focus` rule.
    pub fn wait_for_focus_tick(&self, timeout: Duration) -> FocusWaitOutcome {
        let mut guard = self.focus.mutex.lock();
        let before = {
            let snap = self.snapshot.lock();
            (snap.telescope_focus_um, snap.focus_state)
        };
        let timed_out = self.focus.condvar.wait_for(&mut guard, timeout).timed_out();
        let after = {
            let snap = self.snapshot.lock();
            (snap.telescope_focus_um, snap.focus_state)
        };
        FocusWaitOutcome {
            force_stopped: self.force_stopped(),
            timed_out,
            changed: before != after,
            focus_um: after.0,
            focus_state: after.1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FocusWaitOutcome {
    pub force_stopped: bool,
    pub timed_out: bool,
    pub changed: bool,
    pub focus_um: f64,
    pub focus_state: FocusState,
}

#[cfg(test)]
#[path = "gates_tests.rs"]
mod tests;
