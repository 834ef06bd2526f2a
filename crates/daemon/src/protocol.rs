// SPDX-License-Identifier: MIT

//! IPC protocol between the CLI and the daemon (§6 treats the RPC
//! transport itself as an external collaborator — this module only fixes
//! the shape and wire format the collaborator is expected to use).
//!
//! Wire format: 4-byte big-endian length prefix, then a JSON payload.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use talond_core::{ClientIdentity, ResultCode, StatusReport};
use thiserror::Error;

/// One request per dispatcher operation (§4.5).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op")]
pub enum Request {
    Initialize { caller: ClientIdentity },
    Shutdown { caller: ClientIdentity },
    Home { caller: ClientIdentity },
    Limits { caller: ClientIdentity },
    SlewAltAz { caller: ClientIdentity, alt_deg: f64, az_deg: f64 },
    SlewHaDec { caller: ClientIdentity, ha_deg: f64, dec_deg: f64 },
    SlewRaDec { caller: ClientIdentity, ra_deg: f64, dec_deg: f64 },
    TrackRaDec { caller: ClientIdentity, ra_deg: f64, dec_deg: f64 },
    OffsetRaDec { caller: ClientIdentity, d_ra_deg: f64, d_dec_deg: f64 },
    Park { caller: ClientIdentity, name: String },
    Focus { caller: ClientIdentity, target_um: f64 },
    Stop { caller: ClientIdentity },
    Ping { caller: ClientIdentity },
    Status,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "result")]
pub enum Response {
    Ack,
    Status(Box<StatusReport>),
    Error { code: ResultCode, message: String },
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },
    #[error("connection closed")]
    ConnectionClosed,
    #[error("timeout waiting for message")]
    Timeout,
}

pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;
pub const DEFAULT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

fn encode<T: Serialize>(msg: &T) -> Result<Vec<u8>, ProtocolError> {
    let json = serde_json::to_vec(msg)?;
    if json.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge { size: json.len(), max: MAX_MESSAGE_SIZE });
    }
    Ok(json)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ProtocolError> {
    Ok(serde_json::from_slice(bytes)?)
}

pub async fn read_message<R: tokio::io::AsyncReadExt + Unpin>(reader: &mut R) -> Result<Vec<u8>, ProtocolError> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Err(ProtocolError::ConnectionClosed),
        Err(e) => return Err(ProtocolError::Io(e)),
    }
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge { size: len, max: MAX_MESSAGE_SIZE });
    }
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    Ok(buf)
}

pub async fn write_message<W: tokio::io::AsyncWriteExt + Unpin>(writer: &mut W, data: &[u8]) -> Result<(), ProtocolError> {
    writer.write_all(&(data.len() as u32).to_be_bytes()).await?;
    writer.write_all(data).await?;
    writer.flush().await?;
    Ok(())
}

pub async fn read_request<R: tokio::io::AsyncReadExt + Unpin>(
    reader: &mut R,
    timeout: std::time::Duration,
) -> Result<Request, ProtocolError> {
    let bytes = tokio::time::timeout(timeout, read_message(reader)).await.map_err(|_| ProtocolError::Timeout)??;
    decode(&bytes)
}

pub async fn write_response<W: tokio::io::AsyncWriteExt + Unpin>(
    writer: &mut W,
    response: &Response,
    timeout: std::time::Duration,
) -> Result<(), ProtocolError> {
    let data = encode(response)?;
    tokio::time::timeout(timeout, write_message(writer, &data)).await.map_err(|_| ProtocolError::Timeout)?
}

impl From<talond_core::CommandError> for Response {
    fn from(err: talond_core::CommandError) -> Self {
        Response::Error { code: err.code(), message: err.to_string() }
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
