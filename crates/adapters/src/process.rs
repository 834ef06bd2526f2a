// SPDX-License-Identifier: MIT

//! Controller process management (§4.7): capturing a profile-sourced
//! environment, spawning the controller under it, and the best-effort
//! cleanup that follows an observed controller death.

use std::collections::HashMap;
use std::io::Read;
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::time::Instant;

use thiserror::Error;
use tracing::warn;

use crate::env;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to spawn controller binary {0}: {1}")]
    Spawn(std::path::PathBuf, std::io::Error),
    #[error("failed to signal pid {0}: {1}")]
    Signal(i32, std::io::Error),
}

/// Capture the environment a `sh -c 'source FILE && env'` subshell would
/// see, bounded by `TALOND_PROFILE_CAPTURE_MS` (default 5s). On any
/// failure — spawn error, non-zero exit, parse failure, or timeout — this
/// returns an empty map rather than erroring, per the design note: the
/// controller still gets spawned, just with a minimal environment.
pub fn capture_profile_env(profile_path: &Path) -> HashMap<String, String> {
    let script = format!("source {} && env", shell_quote(profile_path));
    let mut child = match Command::new("sh")
        .arg("-c")
        .arg(&script)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
    {
        Ok(c) => c,
        Err(e) => {
            warn!("failed to spawn profile-capture subshell: {}", e);
            return HashMap::new();
        }
    };

    if !wait_with_timeout(&mut child, env::profile_capture_ms(), env::profile_capture_poll_ms()) {
        warn!("profile-capture subshell timed out; killing it and using an empty environment");
        let _ = child.kill();
        let _ = child.wait();
        return HashMap::new();
    }

    let mut stdout = String::new();
    if let Some(mut out) = child.stdout.take() {
        if out.read_to_string(&mut stdout).is_err() {
            return HashMap::new();
        }
    }

    match child.wait() {
        Ok(status) if status.success() => parse_env_output(&stdout),
        _ => HashMap::new(),
    }
}

/// Poll `child` until it exits or `timeout` elapses. Returns `true` if the
/// child exited within the budget.
fn wait_with_timeout(child: &mut Child, timeout: std::time::Duration, poll: std::time::Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(_)) => return true,
            Ok(None) => {
                if Instant::now() >= deadline {
                    return false;
                }
                std::thread::sleep(poll);
            }
            Err(_) => return false,
        }
    }
}

fn parse_env_output(stdout: &str) -> HashMap<String, String> {
    stdout
        .lines()
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn shell_quote(path: &Path) -> String {
    format!("'{}'", path.display().to_string().replace('\'', "'\\''"))
}

/// Spawn the controller binary under the given environment, in its own
/// session so a later `killall` of auxiliary processes doesn't also take
/// out the daemon (§4.7). Fire-and-forget: the caller does not wait for
/// the controller to finish starting up here — that's the poller's job.
pub fn spawn_controller(binary: &Path, env_vars: &HashMap<String, String>) -> Result<Child, ProcessError> {
    let mut cmd = Command::new(binary);
    cmd.env_clear().envs(env_vars);
    cmd.stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null());
    // SAFETY: setsid() is async-signal-safe and is the only thing this
    // pre_exec hook does; it runs after fork and before exec in the child.
    unsafe {
        cmd.pre_exec(|| {
            if libc::setsid() == -1 {
                return Err(std::io::Error::last_os_error());
            }
            Ok(())
        });
    }
    cmd.spawn().map_err(|e| ProcessError::Spawn(binary.to_path_buf(), e))
}

/// Send `SIGINT` to the controller process (§4.5 `shutdown`). The poller,
/// not this call, is what confirms the controller actually exits.
pub fn send_sigint(pid: i32) -> Result<(), ProcessError> {
    // SAFETY: SIGINT is a standard, non-destructive termination request;
    // `pid` is a plain integer, no pointer involved.
    let rc = unsafe { libc::kill(pid, libc::SIGINT) };
    if rc == 0 {
        Ok(())
    } else {
        Err(ProcessError::Signal(pid, std::io::Error::last_os_error()))
    }
}

/// Best-effort `killall` of the auxiliary controller process tree (§4.7).
/// Failures (binary missing, no matching process) are logged, not
/// propagated — recovery must proceed regardless.
pub fn kill_process_tree(name: &str) {
    match Command::new("killall").arg(name).status() {
        Ok(status) if !status.success() => {
            warn!("killall {} exited with {}", name, status);
        }
        Err(e) => warn!("failed to run killall {}: {}", name, e),
        Ok(_) => {}
    }
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
