// SPDX-License-Identifier: MIT

//! FIFO Writer (§4.2): opens one of the controller's command pipes in
//! non-creating write mode and appends a single newline-terminated string.
//! Never blocks indefinitely — opening with `O_NONBLOCK` fails immediately
//! (`ENXIO`) if the controller isn't reading.

use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use thiserror::Error;

/// Motion command pipe, relative to the configured comm directory (§6).
pub const TEL_FIFO: &str = "Tel.in";
/// Focus command pipe, relative to the configured comm directory (§6).
pub const FOCUS_FIFO: &str = "Focus.in";

#[derive(Debug, Error)]
pub enum FifoError {
    #[error("failed to open {0}: {1}")]
    Open(String, std::io::Error),
    #[error("failed to write to {0}: {1}")]
    Write(String, std::io::Error),
}

/// Writes a single command string to a named pipe.
pub trait FifoWriter: Send + Sync {
    fn write_command(&self, name: &str, command: &str) -> Result<(), FifoError>;
}

/// Writes through to a real FIFO under `comm_dir`.
pub struct RealFifoWriter {
    comm_dir: std::path::PathBuf,
}

impl RealFifoWriter {
    pub fn new(comm_dir: impl Into<std::path::PathBuf>) -> Self {
        Self {
            comm_dir: comm_dir.into(),
        }
    }
}

impl FifoWriter for RealFifoWriter {
    fn write_command(&self, name: &str, command: &str) -> Result<(), FifoError> {
        let path: &Path = &self.comm_dir.join(name);
        let display = path.display().to_string();

        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(path)
            .map_err(|e| FifoError::Open(display.clone(), e))?;

        writeln!(file, "{command}").map_err(|e| FifoError::Write(display, e))
    }
}

/// Records every write for assertion in dispatcher tests, instead of
/// touching the filesystem.
#[cfg(any(test, feature = "test-support"))]
#[derive(Default)]
pub struct FakeFifoWriter {
    pub writes: parking_lot::Mutex<Vec<(String, String)>>,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeFifoWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.writes.lock().clone()
    }
}

#[cfg(any(test, feature = "test-support"))]
impl FifoWriter for FakeFifoWriter {
    fn write_command(&self, name: &str, command: &str) -> Result<(), FifoError> {
        self.writes
            .lock()
            .push((name.to_string(), command.to_string()));
        Ok(())
    }
}

#[cfg(test)]
#[path = "fifo_tests.rs"]
mod tests;
