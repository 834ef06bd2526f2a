// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! talond-core: shared data model for the talon telescope control daemon.
//!
//! This crate is free of I/O. It describes the entities the daemon reasons
//! about — configuration, the telemetry snapshot, the pointing and focus
//! state machines, command results — so that the daemon and adapter crates
//! (and their tests) can share one vocabulary.

pub mod clock;
pub mod config;
pub mod error;
pub mod focus;
pub mod identity;
pub mod park;
pub mod pointing;
pub mod snapshot;
pub mod status;

pub use clock::{Clock, SystemClock};
pub use config::{Config, ConfigError, Flavor};
pub use error::{CommandError, ResultCode};
pub use focus::FocusState;
pub use identity::ClientIdentity;
pub use park::{ParkPosition, ParkTarget};
pub use pointing::PointingState;
pub use snapshot::{Offset, Snapshot};
pub use status::StatusReport;

#[cfg(any(test, feature = "test-support"))]
pub use clock::FakeClock;
