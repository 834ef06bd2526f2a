// SPDX-License-Identifier: MIT

//! The pointing state machine, as reported by the controller in shared
//! memory. The daemon never drives this machine directly — it issues FIFO
//! commands and waits for the controller to move it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Controller-reported motion state.
///
/// The wire value (as decoded from the shared-memory `pointing state`
/// field) must stay stable, so the discriminants below are explicit rather
/// than left to declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum PointingState {
    Absent = 0,
    Stopped = 1,
    Slewing = 2,
    Hunting = 3,
    Tracking = 4,
    Homing = 5,
    Limiting = 6,
}

impl PointingState {
    /// Decode the raw integer field. Unknown values decode to `Absent`
    /// rather than panicking — the segment is untrusted input.
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            1 => Self::Stopped,
            2 => Self::Slewing,
            3 => Self::Hunting,
            4 => Self::Tracking,
            5 => Self::Homing,
            6 => Self::Limiting,
            _ => Self::Absent,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Absent => "Absent",
            Self::Stopped => "Stopped",
            Self::Slewing => "Slewing",
            Self::Hunting => "Hunting",
            Self::Tracking => "Tracking",
            Self::Homing => "Homing",
            Self::Limiting => "Limiting",
        }
    }
}

impl fmt::Display for PointingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
#[path = "pointing_tests.rs"]
mod tests;
