// SPDX-License-Identifier: MIT

//! The focus state machine. Mirrors [`crate::pointing::PointingState`] in
//! spirit but has its own, smaller set of states and its own flag bits.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum FocusState {
    Absent = 0,
    NotHomed = 1,
    Homing = 2,
    Limiting = 3,
    Ready = 4,
}

impl FocusState {
    /// Decode the `focus_flags` bitfield read from shared memory.
    ///
    /// Priority, per §4.1: not present (`0x01` unset) beats everything;
    /// otherwise homing (`0x80`) beats limiting (`0x100`) beats ready
    /// (`0x200`); none of those set means not yet homed.
    pub fn decode(focus_flags: u16) -> Self {
        if focus_flags & 0x01 == 0 {
            return Self::Absent;
        }
        if focus_flags & 0x80 != 0 {
            Self::Homing
        } else if focus_flags & 0x100 != 0 {
            Self::Limiting
        } else if focus_flags & 0x200 != 0 {
            Self::Ready
        } else {
            Self::NotHomed
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Absent => "Absent",
            Self::NotHomed => "NotHomed",
            Self::Homing => "Homing",
            Self::Limiting => "Limiting",
            Self::Ready => "Ready",
        }
    }
}

impl fmt::Display for FocusState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
#[path = "focus_tests.rs"]
mod tests;
