// SPDX-License-Identifier: MIT

//! talond: the telescope control daemon.
//!
//! Standalone process; clients talk to it over a Unix socket (via the
//! `talon` CLI). Owns the telemetry poller thread and the control gates
//! for the lifetime of the process; a `SIGINT`/`SIGTERM` triggers a clean
//! shutdown of the poller and socket before exit.

mod astro;
mod dispatcher;
mod env;
mod gates;
mod lifecycle;
mod listener;
mod poller;
mod protocol;
mod recovery;
mod status;

use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

use crate::lifecycle::{DaemonHandle, LifecycleError};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _log_guard = setup_logging();

    let mut handle = match DaemonHandle::startup() {
        Ok(h) => h,
        Err(LifecycleError::LockFailed(_)) => {
            eprintln!("talond is already running");
            std::process::exit(1);
        }
        Err(e) => {
            error!("failed to start daemon: {}", e);
            return Err(e.into());
        }
    };

    info!("talond ready");

    let listener = handle.take_listener();
    let listener_task = tokio::spawn(listener.run());

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM"),
        _ = sigint.recv() => info!("received SIGINT"),
    }

    listener_task.abort();
    handle.shutdown();
    Ok(())
}

fn setup_logging() -> tracing_appender::non_blocking::WorkerGuard {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stderr());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    guard
}
