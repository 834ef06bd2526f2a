//! End-to-end daemon lifecycle specs: spawn a real `talond` against a
//! `lite`-flavor config whose controller binary is `/bin/true` (exits
//! without ever publishing shared memory), and drive it with `talonctl`.
//!
//! This never reaches `axes_homed`, so it can't exercise the full motion
//! state machine — that's covered by the unit/property tests in
//! `crates/daemon/src`. What it does cover is the parts that only exist
//! once the socket, poller thread, and CLI are wired together: access
//! control (S2), precondition errors, and status's "never fails" contract.

use crate::prelude::*;

#[test]
fn ping_succeeds_for_a_control_client() {
    let daemon = Daemon::start();
    daemon.cli().args(&["ping"]).passes();
}

#[test]
fn ping_rejects_an_unlisted_caller() {
    let daemon = Daemon::start();
    daemon
        .cli()
        .env("TALON_CALLER", "some-other-host")
        .args(&["ping"])
        .fails()
        .stderr_has("not an authorized control client");
}

#[test]
fn status_before_initialize_reports_absent_with_no_site() {
    let daemon = Daemon::start();
    let out = daemon.cli().args(&["status"]).passes();
    let report: serde_json::Value = serde_json::from_str(&out.stdout()).expect("status should be valid JSON");
    assert_eq!(report["pointing_state"], "Absent");
    assert!(report["site"].is_null(), "site should be absent before any controller contact: {report}");
    assert!(report["axes_homed"].is_null());
}

#[test]
fn commands_before_initialize_report_not_initialized() {
    let daemon = Daemon::start();
    daemon.cli().args(&["home"]).fails().stderr_has("has not been initialized");
    daemon.cli().args(&["stop"]).fails().stderr_has("has not been initialized");
}

#[test]
fn slew_before_homing_is_rejected_regardless_of_limits() {
    let daemon = Daemon::start();
    // axes_homed is false the whole test (no real controller), so every
    // motion command must fail on the homing precondition before it ever
    // reaches the soft-limit check or writes a FIFO command.
    daemon
        .cli()
        .args(&["slew-hadec", "0.0", "0.0"])
        .fails()
        .stderr_has("has not been initialized");
}

#[test]
fn initialize_times_out_when_the_controller_never_comes_up() {
    let daemon = Daemon::start();
    // /bin/true exits immediately and never populates shared memory, so
    // pointing_state never leaves Absent; initialize must time out rather
    // than hang or falsely report success (§4.5 initialize, §4.7).
    daemon.cli().args(&["initialize"]).fails().stderr_has("error");
}

#[test]
fn park_before_initialize_never_touches_the_comm_dir() {
    let daemon = Daemon::start();
    // The `require_homed` precondition is checked before the park name is
    // even looked up, so this never gets far enough to write `park <ha>
    // <dec>` to Tel.in (§4.5 `park`, §8 invariant 1).
    daemon.cli().args(&["park", "no-such-pose"]).fails().stderr_has("has not been initialized");
    let entries: Vec<_> = std::fs::read_dir(daemon.comm_dir()).expect("comm dir should exist").collect();
    assert!(entries.is_empty(), "comm dir should stay empty when no command ever got past admission");
}
