//! Test helpers for black-box talonctl/talond specifications.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output};
use std::time::{Duration, Instant};

fn binary_path(name: &str) -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    let standard = manifest_dir.join("target/debug").join(name);
    if standard.exists() {
        return standard;
    }
    if let Ok(exe) = std::env::current_exe() {
        if let Some(debug_dir) = exe.parent().and_then(|d| d.parent()) {
            let fallback = debug_dir.join(name);
            if fallback.exists() {
                return fallback;
            }
        }
    }
    standard
}

fn talonctl_binary() -> PathBuf {
    binary_path("talonctl")
}

pub fn talond_binary() -> PathBuf {
    binary_path("talond")
}

pub fn cli() -> CliBuilder {
    CliBuilder::new()
}

pub struct CliBuilder {
    args: Vec<String>,
    envs: Vec<(String, String)>,
}

impl CliBuilder {
    fn new() -> Self {
        Self { args: Vec::new(), envs: Vec::new() }
    }

    pub fn args(mut self, args: &[&str]) -> Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    pub fn env(mut self, key: &str, value: impl AsRef<Path>) -> Self {
        self.envs.push((key.to_string(), value.as_ref().to_string_lossy().to_string()));
        self
    }

    fn command(self) -> Command {
        let mut cmd = Command::new(talonctl_binary());
        cmd.args(&self.args);
        for (key, value) in self.envs {
            cmd.env(key, value);
        }
        cmd
    }

    pub fn passes(self) -> RunAssert {
        let output = self.command().output().expect("talonctl should run");
        assert!(
            output.status.success(),
            "expected talonctl to pass, got exit code {:?}\nstdout: {}\nstderr: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }

    pub fn fails(self) -> RunAssert {
        let output = self.command().output().expect("talonctl should run");
        assert!(
            !output.status.success(),
            "expected talonctl to fail, but it passed\nstdout: {}\nstderr: {}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }
}

pub struct RunAssert {
    output: Output,
}

impl RunAssert {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    pub fn stdout_has(self, expected: &str) -> Self {
        let stdout = self.stdout();
        assert!(stdout.contains(expected), "stdout does not contain '{expected}'\nstdout: {stdout}");
        self
    }

    pub fn stderr_has(self, expected: &str) -> Self {
        let stderr = self.stderr();
        assert!(stderr.contains(expected), "stderr does not contain '{expected}'\nstderr: {stderr}");
        self
    }
}

/// Minimal `lite`-flavor configuration pointing the controller spawn at
/// `/bin/true` (it exits immediately without ever populating shared
/// memory, so the daemon stays at `pointing = Absent` forever — exactly
/// what the `ping`/`status` black-box checks need, without a real talon
/// binary or shared-memory segment).
pub const MINIMAL_CONFIG: &str = r#"
control_clients = ["test-operator"]
daemon_name = "talond-test"
log_channel = "talon.test"
flavor = "lite"
query_delay = "20ms"
query_timeout_iterations = 8
focus_tolerance_um = 5.0
shm_key = 4242424
controller_binary = "/bin/true"
park_positions = {}

[timeouts]
initialization = "300ms"
slew = "1s"
focus = "1s"
homing = "1s"
limit = "1s"
cover = "1s"
ping = "200ms"

[ha_soft_limits]
low_deg = -90.0
high_deg = 90.0

[dec_soft_limits]
low_deg = -30.0
high_deg = 85.0
"#;

/// An isolated talond instance for one test: its own state dir, config
/// file, and comm directory. Dropped at the end of the test, which kills
/// the daemon process.
pub struct Daemon {
    state_dir: tempfile::TempDir,
    comm_dir: tempfile::TempDir,
    child: Option<Child>,
}

impl Daemon {
    /// Write the minimal config and spawn `talond` against it, waiting for
    /// the control socket to appear (or panicking after a short timeout).
    pub fn start() -> Self {
        let state_dir = tempfile::tempdir().expect("tempdir");
        let comm_dir = tempfile::tempdir().expect("tempdir");
        let config_path = state_dir.path().join("talond.toml");
        // `comm_dir` must land before any `[table]` header or TOML parses
        // it as a key on that table instead of a top-level key.
        let config = format!("comm_dir = {:?}\n{MINIMAL_CONFIG}", comm_dir.path().to_string_lossy());
        std::fs::write(&config_path, config).expect("write config");

        let child = Command::new(talond_binary())
            .env("TALOND_STATE_DIR", state_dir.path())
            .env("TALOND_CONFIG", &config_path)
            .env("RUST_LOG", "error")
            .spawn()
            .expect("talond should spawn");

        let socket_path = state_dir.path().join("talond.sock");
        let deadline = Instant::now() + Duration::from_secs(5);
        while !socket_path.exists() {
            assert!(Instant::now() < deadline, "talond never bound its control socket");
            std::thread::sleep(Duration::from_millis(20));
        }

        Self { state_dir, comm_dir, child: Some(child) }
    }

    pub fn cli(&self) -> CliBuilder {
        cli().env("TALOND_STATE_DIR", self.state_dir.path()).env("TALON_CALLER", PathBuf::from("test-operator"))
    }

    pub fn comm_dir(&self) -> &Path {
        self.comm_dir.path()
    }
}

impl Drop for Daemon {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}
