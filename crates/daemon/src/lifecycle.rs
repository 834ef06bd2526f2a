// SPDX-License-Identifier: MIT

//! Daemon lifecycle: acquiring the instance lock, loading configuration,
//! standing up the [`Gates`]/[`TelemetryPoller`]/[`Dispatcher`] trio, and
//! binding the Unix socket. Modeled on the teacher's lock-file-then-bind
//! startup sequence, adapted to own a poller thread instead of an async
//! event loop.

use std::fs::File;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use fs2::FileExt;
use talond_adapters::{RealFifoWriter, ShmTelemetrySource};
use talond_core::{Config, ConfigError};
use thiserror::Error;
use tokio::net::UnixListener;
use tracing::{info, warn};

use crate::astro::LowPrecisionAstro;
use crate::dispatcher::{Dispatcher, InterlockClient, InterlockError};
use crate::env;
use crate::gates::Gates;
use crate::listener::Listener;
use crate::poller::TelemetryPoller;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("could not determine state directory")]
    NoStateDir,
    #[error("failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),
    #[error("failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A daemon with no external security interlock configured always refuses
/// full-flavor `initialize`, rather than silently treating "absent" as
/// "safe".
struct NoInterlockConfigured;

impl InterlockClient for NoInterlockConfigured {
    fn is_safe(&self, _handle: &str, _key: &str) -> Result<bool, InterlockError> {
        Err(InterlockError("no interlock client configured for this build".into()))
    }
}

/// Everything the running daemon owns: the poller thread, the gates it
/// mutates, the dispatcher built on top of them, and the socket listener.
pub struct DaemonHandle {
    pub config: Arc<Config>,
    pub gates: Arc<Gates>,
    pub dispatcher: Arc<Dispatcher>,
    pub socket_path: PathBuf,
    listener_socket: Option<UnixListener>,
    poller_stop: Arc<AtomicBool>,
    poller_thread: Option<std::thread::JoinHandle<()>>,
    #[allow(dead_code)]
    lock_file: File,
}

impl DaemonHandle {
    /// Acquire the instance lock, load configuration, attach shared memory,
    /// spawn the poller thread, and bind the control socket. Socket binding
    /// happens last so a startup failure never leaves a stale socket for a
    /// client to connect to.
    pub fn startup() -> Result<Self, LifecycleError> {
        match Self::startup_inner() {
            Ok(handle) => Ok(handle),
            Err(e) => {
                if !matches!(e, LifecycleError::LockFailed(_)) {
                    cleanup_on_failure();
                }
                Err(e)
            }
        }
    }

    fn startup_inner() -> Result<Self, LifecycleError> {
        let state_dir = env::state_dir().map_err(|_| LifecycleError::NoStateDir)?;
        std::fs::create_dir_all(&state_dir)?;

        let lock_path = state_dir.join("talond.pid");
        let socket_path = state_dir.join("talond.sock");

        let lock_file = std::fs::OpenOptions::new().write(true).create(true).truncate(false).open(&lock_path)?;
        lock_file.try_lock_exclusive().map_err(LifecycleError::LockFailed)?;
        use std::io::Write;
        let mut lock_file = lock_file;
        lock_file.set_len(0)?;
        writeln!(lock_file, "{}", std::process::id())?;
        let lock_file = lock_file;

        let config_path = env::config_path().map_err(|_| LifecycleError::NoStateDir)?;
        let config = Arc::new(Config::load(&config_path)?);
        std::fs::create_dir_all(&config.comm_dir)?;

        let gates = Arc::new(Gates::new());
        let shm_source: Arc<dyn talond_adapters::TelemetrySource> = Arc::new(ShmTelemetrySource::new(config.shm_key));
        let poller = Arc::new(TelemetryPoller::new(
            Arc::clone(&gates),
            shm_source,
            config.comm_dir.clone(),
            config.query_delay,
            config.query_timeout_iterations,
        ));

        let poller_stop = Arc::new(AtomicBool::new(false));
        let poller_thread = {
            let poller = Arc::clone(&poller);
            let stop_flag = Arc::clone(&poller_stop);
            std::thread::Builder::new()
                .name("talond-poller".into())
                .spawn(move || poller.run(&stop_flag))?
        };

        let fifo = Arc::new(RealFifoWriter::new(config.comm_dir.clone()));
        let astro = Arc::new(LowPrecisionAstro);
        let interlock: Arc<dyn InterlockClient> = Arc::new(NoInterlockConfigured);
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&config),
            Arc::clone(&gates),
            fifo,
            astro,
            interlock,
        ));

        if socket_path.exists() {
            std::fs::remove_file(&socket_path)?;
        }
        let listener_socket =
            UnixListener::bind(&socket_path).map_err(|e| LifecycleError::BindFailed(socket_path.clone(), e))?;

        info!(socket = %socket_path.display(), "daemon started");

        Ok(Self {
            config,
            gates,
            dispatcher,
            socket_path,
            listener_socket: Some(listener_socket),
            poller_stop,
            poller_thread: Some(poller_thread),
            lock_file,
        })
    }

    /// Take the bound socket so it can be handed to a spawned [`Listener`]
    /// task. Panics if called twice — there is only ever one accept loop.
    pub fn take_listener(&mut self) -> Listener {
        let socket = self.listener_socket.take().expect("listener socket already taken");
        Listener::new(socket, Arc::clone(&self.dispatcher))
    }

    /// Stop the poller thread and remove the socket/lock files. Idempotent.
    pub fn shutdown(&mut self) {
        info!("shutting down daemon");
        self.poller_stop.store(true, std::sync::atomic::Ordering::SeqCst);
        if let Some(handle) = self.poller_thread.take() {
            if handle.join().is_err() {
                warn!("poller thread panicked during shutdown");
            }
        }
        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!("failed to remove socket file: {}", e);
            }
        }
    }
}

impl Drop for DaemonHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn cleanup_on_failure() {
    if let Ok(state_dir) = env::state_dir() {
        let socket_path = state_dir.join("talond.sock");
        if socket_path.exists() {
            let _ = std::fs::remove_file(&socket_path);
        }
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
