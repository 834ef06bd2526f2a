// SPDX-License-Identifier: MIT

//! Daemon client: connects to the control socket and exchanges a single
//! request/response pair per invocation.

use std::path::PathBuf;

use talond_daemon::protocol::{self, ProtocolError};
use talond_daemon::{Request, Response};
use thiserror::Error;
use tokio::net::UnixStream;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("talond is not running (no socket at {0})")]
    DaemonNotRunning(PathBuf),
    #[error("could not determine the daemon's state directory")]
    NoStateDir,
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub struct DaemonClient {
    socket_path: PathBuf,
}

impl DaemonClient {
    pub fn connect_config() -> Result<Self, ClientError> {
        let socket_path = crate::env::socket_path().ok_or(ClientError::NoStateDir)?;
        if !socket_path.exists() {
            return Err(ClientError::DaemonNotRunning(socket_path));
        }
        Ok(Self { socket_path })
    }

    pub async fn send(&self, request: Request) -> Result<Response, ClientError> {
        let mut stream = UnixStream::connect(&self.socket_path).await?;
        let bytes = serde_json::to_vec(&request).map_err(|e| ClientError::Protocol(ProtocolError::Json(e)))?;
        protocol::write_message(&mut stream, &bytes).await?;

        let response_bytes = protocol::read_message(&mut stream).await?;
        let response: Response =
            serde_json::from_slice(&response_bytes).map_err(|e| ClientError::Protocol(ProtocolError::Json(e)))?;
        Ok(response)
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
