//! talonctl help output.

use crate::prelude::*;

#[test]
fn no_args_shows_usage_and_exits_nonzero() {
    cli().fails().stderr_has("Usage:");
}

#[test]
fn help_lists_every_dispatcher_operation() {
    cli()
        .args(&["--help"])
        .passes()
        .stdout_has("initialize")
        .stdout_has("shutdown")
        .stdout_has("home")
        .stdout_has("limits")
        .stdout_has("slew-altaz")
        .stdout_has("slew-hadec")
        .stdout_has("slew-radec")
        .stdout_has("track-radec")
        .stdout_has("offset")
        .stdout_has("park")
        .stdout_has("focus")
        .stdout_has("stop")
        .stdout_has("ping")
        .stdout_has("status");
}

#[test]
fn version_shows_version() {
    cli().args(&["--version"]).passes().stdout_has("0.1");
}

#[test]
fn slew_altaz_help_names_its_arguments() {
    cli().args(&["slew-altaz", "--help"]).passes().stdout_has("ALT_DEG").stdout_has("AZ_DEG");
}
