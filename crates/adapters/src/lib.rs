// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Adapters for the external I/O the daemon depends on: the controller's
//! shared-memory telemetry segment, its command FIFOs, and the controller
//! process itself.
//!
//! This crate is the one place in the workspace that reaches for raw
//! syscalls (`shmget`/`shmat`, `kill(pid, 0)`, non-creating FIFO opens);
//! everything above it talks to traits.

pub mod env;
mod fifo;
mod liveness;
mod process;
mod shm;

pub use fifo::{FifoError, FifoWriter, RealFifoWriter, FOCUS_FIFO, TEL_FIFO};
pub use liveness::{is_process_alive, LivenessRing};
pub use process::{capture_profile_env, kill_process_tree, send_sigint, spawn_controller, ProcessError};
pub use shm::{RawTelemetry, ShmError, ShmTelemetrySource, TelemetrySource};

#[cfg(any(test, feature = "test-support"))]
pub use fifo::FakeFifoWriter;
#[cfg(any(test, feature = "test-support"))]
pub use shm::FakeTelemetrySource;
