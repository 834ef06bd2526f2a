// SPDX-License-Identifier: MIT

//! talond daemon library surface.
//!
//! This crate target exposes only the IPC protocol types, for the `talon`
//! CLI to depend on without pulling in the daemon's internal gates,
//! dispatcher, and poller machinery — those live in the `talond` binary
//! target (`src/main.rs`).

pub mod protocol;

pub use protocol::{ProtocolError, Request, Response, DEFAULT_TIMEOUT, MAX_MESSAGE_SIZE};
