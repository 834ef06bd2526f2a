// SPDX-License-Identifier: MIT

//! Command result codes and the error type the dispatcher returns.
//!
//! §7 groups these into admission, precondition, interlock, and runtime
//! failure. The grouping is preserved here as doc comments rather than as
//! a type hierarchy, since the wire format is a flat integer per §6.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Wire-level result code. Stable integer values — clients match on these,
/// not on the error text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum ResultCode {
    Succeeded = 0,
    Failed = 1,
    Blocked = 2,
    InvalidControlIp = 3,
    TelescopeNotInitialized = 4,
    TelescopeNotUninitialized = 5,
    TelescopeNotHomed = 6,
    OutsideHaLimits = 7,
    OutsideDecLimits = 8,
    SecuritySystemTripped = 9,
    CannotCommunicateWithSecuritySystem = 10,
}

/// Everything a command can fail with. `Display` text is for logs; clients
/// should switch on [`CommandError::code`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Admission: caller identity not in the control list.
    #[error("caller is not an authorized control client")]
    InvalidControlIp,

    /// Admission: the command mutex is already held by another command.
    #[error("another command is in progress")]
    Blocked,

    /// Precondition: pointing is Absent where a live controller is required.
    #[error("telescope has not been initialized")]
    NotInitialized,

    /// Precondition: pointing is not Absent where `initialize` requires it.
    #[error("telescope is already initialized")]
    AlreadyInitialized,

    /// Precondition: `axes_homed` is false.
    #[error("telescope has not completed homing")]
    NotHomed,

    /// Precondition: computed hour angle is outside the configured soft limits.
    #[error("requested position is outside the hour-angle soft limits")]
    OutsideHaLimits,

    /// Precondition: computed declination is outside the configured soft limits.
    #[error("requested position is outside the declination soft limits")]
    OutsideDecLimits,

    /// Interlock: the external security system reports unsafe, or is absent.
    #[error("security interlock is tripped")]
    SecuritySystemTripped,

    /// Interlock: the external security system could not be reached.
    #[error("cannot communicate with security system")]
    CannotCommunicateWithSecuritySystem,

    /// Runtime failure: catch-all for timeout, pipe-write error, controller
    /// death mid-command, a force-stop, an unknown park name, or a terminal
    /// state mismatch. The source text distinguishes these for logs.
    #[error("{0}")]
    Failed(String),
}

impl CommandError {
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }

    pub fn code(&self) -> ResultCode {
        match self {
            Self::InvalidControlIp => ResultCode::InvalidControlIp,
            Self::Blocked => ResultCode::Blocked,
            Self::NotInitialized => ResultCode::TelescopeNotInitialized,
            Self::AlreadyInitialized => ResultCode::TelescopeNotUninitialized,
            Self::NotHomed => ResultCode::TelescopeNotHomed,
            Self::OutsideHaLimits => ResultCode::OutsideHaLimits,
            Self::OutsideDecLimits => ResultCode::OutsideDecLimits,
            Self::SecuritySystemTripped => ResultCode::SecuritySystemTripped,
            Self::CannotCommunicateWithSecuritySystem => {
                ResultCode::CannotCommunicateWithSecuritySystem
            }
            Self::Failed(_) => ResultCode::Failed,
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
