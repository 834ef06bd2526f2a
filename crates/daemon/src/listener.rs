// SPDX-License-Identifier: MIT

//! Unix-socket listener: accepts one task per connection, decodes a
//! [`Request`], dispatches it against the shared [`Dispatcher`], and writes
//! back a [`Response`]. Deliberately thin — the RPC transport itself is an
//! external collaborator (§6); this is just enough plumbing to drive the
//! dispatcher from the CLI crate.

use std::sync::Arc;

use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, error, info, warn};

use crate::dispatcher::Dispatcher;
use crate::protocol::{self, Request, Response, DEFAULT_TIMEOUT};

pub struct Listener {
    socket: UnixListener,
    dispatcher: Arc<Dispatcher>,
}

impl Listener {
    pub fn new(socket: UnixListener, dispatcher: Arc<Dispatcher>) -> Self {
        Self { socket, dispatcher }
    }

    /// Accept connections until the process is torn down. Each connection
    /// is handled on its own task so a slow or hung client can't block
    /// others.
    pub async fn run(self) {
        loop {
            match self.socket.accept().await {
                Ok((stream, _addr)) => {
                    let dispatcher = Arc::clone(&self.dispatcher);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, &dispatcher).await {
                            match e {
                                protocol::ProtocolError::ConnectionClosed => debug!("client disconnected"),
                                protocol::ProtocolError::Timeout => warn!("connection timed out"),
                                other => error!("connection error: {}", other),
                            }
                        }
                    });
                }
                Err(e) => error!("accept error: {}", e),
            }
        }
    }
}

async fn handle_connection(
    mut stream: UnixStream,
    dispatcher: &Arc<Dispatcher>,
) -> Result<(), protocol::ProtocolError> {
    let (mut reader, mut writer) = stream.split();
    let request = protocol::read_request(&mut reader, DEFAULT_TIMEOUT).await?;
    info!(request = ?request, "received request");

    // Dispatcher operations block on real condvar waits (homing/slew/focus
    // timeouts can run tens of seconds) — keep them off the async runtime's
    // worker threads so a concurrent `status`/`ping` stays responsive (§1,
    // §5), the same reason `poller.rs` runs its own loop on a dedicated
    // `std::thread` rather than as a tokio task.
    let dispatcher = Arc::clone(dispatcher);
    let response = tokio::task::spawn_blocking(move || handle_request(request, &dispatcher))
        .await
        .unwrap_or_else(|e| Response::Error {
            code: talond_core::ResultCode::Failed,
            message: format!("dispatcher task panicked: {e}"),
        });

    protocol::write_response(&mut writer, &response, DEFAULT_TIMEOUT).await
}

fn handle_request(request: Request, dispatcher: &Arc<Dispatcher>) -> Response {
    let result = match request {
        Request::Initialize { caller } => dispatcher.initialize(&caller),
        Request::Shutdown { caller } => dispatcher.shutdown(&caller),
        Request::Home { caller } => dispatcher.home(&caller),
        Request::Limits { caller } => dispatcher.limits(&caller),
        Request::SlewAltAz { caller, alt_deg, az_deg } => dispatcher.slew_altaz(&caller, alt_deg, az_deg),
        Request::SlewHaDec { caller, ha_deg, dec_deg } => dispatcher.slew_hadec(&caller, ha_deg, dec_deg),
        Request::SlewRaDec { caller, ra_deg, dec_deg } => dispatcher.slew_radec(&caller, ra_deg, dec_deg),
        Request::TrackRaDec { caller, ra_deg, dec_deg } => dispatcher.track_radec(&caller, ra_deg, dec_deg),
        Request::OffsetRaDec { caller, d_ra_deg, d_dec_deg } => dispatcher.offset_radec(&caller, d_ra_deg, d_dec_deg),
        Request::Park { caller, name } => dispatcher.park(&caller, &name),
        Request::Focus { caller, target_um } => dispatcher.telescope_focus(&caller, target_um),
        Request::Stop { caller } => dispatcher.stop(&caller),
        Request::Ping { caller } => dispatcher.ping(&caller),
        Request::Status => return Response::Status(Box::new(dispatcher.status())),
    };

    match result {
        Ok(()) => Response::Ack,
        Err(e) => Response::from(e),
    }
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
