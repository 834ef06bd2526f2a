//! talonctl argument and connectivity error handling.

use crate::prelude::*;

#[test]
fn slew_altaz_missing_args_shows_usage_error() {
    cli().args(&["slew-altaz", "10.0"]).fails().stderr_has("Usage:");
}

#[test]
fn slew_altaz_non_numeric_arg_shows_error() {
    cli().args(&["slew-altaz", "not-a-number", "0.0"]).fails().stderr_has("error");
}

#[test]
fn unknown_subcommand_shows_error() {
    cli().args(&["levitate"]).fails().stderr_has("error");
}

#[test]
fn talking_to_a_dead_daemon_reports_not_running() {
    let empty_state = tempfile::tempdir().expect("tempdir");
    cli()
        .env("TALOND_STATE_DIR", empty_state.path())
        .args(&["ping"])
        .fails()
        .stderr_has("not running");
}
