use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use talond_adapters::FakeFifoWriter;
use talond_core::config::{Flavor, SoftLimits, Timeouts};
use talond_core::park::{ParkPosition, ParkTarget};

use super::*;
use crate::astro::FakeAstroRoutines;

fn lite_config() -> Config {
    Config {
        control_clients: vec![ClientIdentity::new("obs")],
        daemon_name: "talond".into(),
        log_channel: "talon".into(),
        flavor: Flavor::Lite,
        r#virtual: false,
        query_delay: Duration::from_millis(10),
        query_timeout_iterations: 4,
        timeouts: Timeouts {
            initialization: Duration::from_millis(200),
            slew: Duration::from_millis(200),
            focus: Duration::from_millis(200),
            homing: Duration::from_millis(200),
            limit: Duration::from_millis(200),
            cover: Duration::from_millis(200),
            ping: Duration::from_millis(200),
        },
        focus_tolerance_um: 5.0,
        ha_soft_limits: SoftLimits { low_deg: -72.0, high_deg: 90.0 },
        dec_soft_limits: SoftLimits { low_deg: -30.0, high_deg: 85.0 },
        park_positions: HashMap::from([(
            "stow".to_string(),
            ParkPosition {
                description: "stow position".into(),
                target: ParkTarget::Encoder { ha_enc: 0, dec_enc: 0 },
            },
        )]),
        shm_key: 42,
        comm_dir: PathBuf::from("/tmp/comm"),
        env_profile_path: PathBuf::from("/tmp/talon.sh"),
        controller_binary: PathBuf::from("/nonexistent/talon-controller"),
    }
}

fn caller() -> ClientIdentity {
    ClientIdentity::new("obs")
}

fn dispatcher_with(config: Config) -> (Dispatcher, Arc<Gates>, Arc<FakeFifoWriter>) {
    let config = Arc::new(config);
    let gates = Arc::new(Gates::new());
    let fifo = Arc::new(FakeFifoWriter::new());
    let astro: Arc<dyn AstroRoutines> = Arc::new(FakeAstroRoutines {
        hadec: (0.0, 0.3),
        separations_deg: (90.0, 45.0),
    });
    let interlock: Arc<dyn InterlockClient> = Arc::new(FakeInterlockClient { safe: true, fail: false });
    let dispatcher = Dispatcher::new(
        Arc::clone(&config),
        Arc::clone(&gates),
        fifo.clone() as Arc<dyn FifoWriter>,
        astro,
        interlock,
    );
    (dispatcher, gates, fifo)
}

#[test]
fn unauthorized_caller_is_rejected() {
    let (dispatcher, _gates, _fifo) = dispatcher_with(lite_config());
    let err = dispatcher.ping(&ClientIdentity::new("stranger")).unwrap_err();
    assert_eq!(err, CommandError::InvalidControlIp);
}

#[test]
fn ping_succeeds_for_control_client() {
    let (dispatcher, _gates, _fifo) = dispatcher_with(lite_config());
    assert!(dispatcher.ping(&caller()).is_ok());
}

#[test]
fn slew_altaz_requires_homed_axes() {
    let (dispatcher, _gates, _fifo) = dispatcher_with(lite_config());
    let err = dispatcher.slew_altaz(&caller(), 45.0, 90.0).unwrap_err();
    assert_eq!(err, CommandError::NotInitialized);
}

#[test]
fn slew_altaz_rejects_positions_outside_soft_limits() {
    // The fake astro routine always reports ha=0 rad, dec=0.3 rad (~17 deg);
    // use a config whose dec limits exclude that.
    let mut config = lite_config();
    config.dec_soft_limits = SoftLimits { low_deg: -5.0, high_deg: 5.0 };
    let (dispatcher, gates, _fifo) = dispatcher_with(config);
    gates.mutate_snapshot(|snap| {
        snap.pointing_state = PointingState::Stopped;
        snap.axes_homed = true;
        snap.focus_state = FocusState::Absent;
    });
    let err = dispatcher.slew_altaz(&caller(), 45.0, 90.0).unwrap_err();
    assert_eq!(err, CommandError::OutsideDecLimits);
}

#[test]
fn slew_hadec_writes_command_and_waits_for_stopped() {
    let (dispatcher, gates, fifo) = dispatcher_with(lite_config());
    gates.mutate_snapshot(|snap| {
        snap.pointing_state = PointingState::Stopped;
        snap.axes_homed = true;
        snap.focus_state = FocusState::Absent;
    });

    let writer = Arc::clone(&gates);
    let handle = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(20));
        writer.mutate_snapshot(|snap| {
            snap.pointing_state = PointingState::Slewing;
            snap.pointing_index += 1;
        });
        std::thread::sleep(Duration::from_millis(20));
        writer.mutate_snapshot(|snap| {
            snap.pointing_state = PointingState::Stopped;
            snap.pointing_index += 1;
        });
    });

    assert!(dispatcher.slew_hadec(&caller(), 10.0, 20.0).is_ok());
    handle.join().unwrap();

    let calls = fifo.calls();
    assert!(calls.iter().any(|(fifo_name, cmd)| fifo_name == TEL_FIFO && cmd.starts_with("HA:")));
    assert!(calls.iter().any(|(fifo_name, cmd)| fifo_name == TEL_FIFO && cmd == "xdelta(0,0)"));
}

#[test]
fn offset_radec_accumulates_while_tracking() {
    let (dispatcher, gates, fifo) = dispatcher_with(lite_config());
    gates.mutate_snapshot(|snap| {
        snap.pointing_state = PointingState::Tracking;
        snap.axes_homed = true;
        snap.focus_state = FocusState::Absent;
    });

    assert!(dispatcher.offset_radec(&caller(), 0.01, 0.02).is_ok());
    assert!(dispatcher.offset_radec(&caller(), 0.01, 0.02).is_ok());

    let offset = *gates.offset.lock();
    assert!((offset.ra_deg - 0.02).abs() < 1e-9);
    assert!((offset.dec_deg - 0.04).abs() < 1e-9);

    let calls = fifo.calls();
    let last_xdelta = calls.iter().rev().find(|(fifo_name, _)| fifo_name == TEL_FIFO).unwrap();
    assert_eq!(last_xdelta.1, "xdelta(0.02,0.04)");
}

#[test]
fn offset_radec_rejects_when_slewing() {
    let (dispatcher, gates, _fifo) = dispatcher_with(lite_config());
    gates.mutate_snapshot(|snap| {
        snap.pointing_state = PointingState::Slewing;
        snap.axes_homed = true;
        snap.focus_state = FocusState::Absent;
    });
    let err = dispatcher.offset_radec(&caller(), 0.01, 0.02).unwrap_err();
    assert!(matches!(err, CommandError::Failed(_)));
}

#[test]
fn offset_radec_rejects_out_of_range_delta_when_stopped() {
    let (dispatcher, gates, fifo) = dispatcher_with(lite_config());
    gates.mutate_snapshot(|snap| {
        snap.pointing_state = PointingState::Stopped;
        snap.axes_homed = true;
        snap.focus_state = FocusState::Absent;
        snap.angles.ha_apparent = 0.0;
        snap.angles.dec_apparent = 0.0;
    });

    // ha_soft_limits is [-72, 90] deg; a 200 deg delta from ha_apparent=0
    // lands well outside that range.
    let err = dispatcher.offset_radec(&caller(), 200.0, 0.0).unwrap_err();
    assert_eq!(err, CommandError::OutsideHaLimits);
    assert!(fifo.calls().iter().all(|(fifo_name, cmd)| !(fifo_name == TEL_FIFO && cmd.starts_with("HA:"))));
}

#[test]
fn park_to_unknown_position_fails() {
    let (dispatcher, gates, _fifo) = dispatcher_with(lite_config());
    gates.mutate_snapshot(|snap| {
        snap.pointing_state = PointingState::Stopped;
        snap.axes_homed = true;
        snap.focus_state = FocusState::Absent;
    });
    let err = dispatcher.park(&caller(), "no-such-position").unwrap_err();
    assert!(matches!(err, CommandError::Failed(_)));
}

#[test]
fn park_to_known_position_writes_encoder_command() {
    let (dispatcher, gates, fifo) = dispatcher_with(lite_config());
    gates.mutate_snapshot(|snap| {
        snap.pointing_state = PointingState::Stopped;
        snap.axes_homed = true;
        snap.focus_state = FocusState::Absent;
    });

    let writer = Arc::clone(&gates);
    let handle = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(20));
        writer.mutate_snapshot(|snap| {
            snap.pointing_state = PointingState::Slewing;
            snap.pointing_index += 1;
        });
        std::thread::sleep(Duration::from_millis(20));
        writer.mutate_snapshot(|snap| {
            snap.pointing_state = PointingState::Stopped;
            snap.pointing_index += 1;
        });
    });

    assert!(dispatcher.park(&caller(), "stow").is_ok());
    handle.join().unwrap();

    let calls = fifo.calls();
    assert!(calls.iter().any(|(fifo_name, cmd)| fifo_name == TEL_FIFO && cmd == "park 0 0"));
}

#[test]
fn stop_fails_when_not_initialized() {
    let (dispatcher, _gates, _fifo) = dispatcher_with(lite_config());
    let err = dispatcher.stop(&caller()).unwrap_err();
    assert_eq!(err, CommandError::NotInitialized);
}

#[test]
fn stop_writes_to_both_fifos_and_clears_force_stopped() {
    let (dispatcher, gates, fifo) = dispatcher_with(lite_config());
    gates.mutate_snapshot(|snap| snap.pointing_state = PointingState::Slewing);

    assert!(dispatcher.stop(&caller()).is_ok());
    assert!(!gates.force_stopped());

    let calls = fifo.calls();
    assert!(calls.iter().any(|(fifo_name, cmd)| fifo_name == TEL_FIFO && cmd == "Stop"));
    assert!(calls.iter().any(|(fifo_name, cmd)| fifo_name == FOCUS_FIFO && cmd == "Stop"));
}

#[test]
fn telescope_focus_rejected_for_lite_flavor() {
    let (dispatcher, gates, _fifo) = dispatcher_with(lite_config());
    gates.mutate_snapshot(|snap| {
        snap.pointing_state = PointingState::Stopped;
        snap.axes_homed = true;
    });
    let err = dispatcher.telescope_focus(&caller(), 100.0).unwrap_err();
    assert!(matches!(err, CommandError::Failed(_)));
}

#[test]
fn telescope_focus_no_op_within_tolerance() {
    let mut config = lite_config();
    config.flavor = Flavor::Full {
        interlock_handle: "security".into(),
        interlock_key: "key".into(),
    };
    let (dispatcher, gates, fifo) = dispatcher_with(config);
    gates.mutate_snapshot(|snap| {
        snap.pointing_state = PointingState::Stopped;
        snap.axes_homed = true;
        snap.focus_state = FocusState::Ready;
        snap.telescope_focus_um = 100.0;
    });

    assert!(dispatcher.telescope_focus(&caller(), 101.0).is_ok());
    assert!(fifo.calls().is_empty());
}

#[test]
fn initialize_rejects_when_already_present() {
    let (dispatcher, gates, _fifo) = dispatcher_with(lite_config());
    gates.mutate_snapshot(|snap| snap.pointing_state = PointingState::Stopped);
    let err = dispatcher.initialize(&caller()).unwrap_err();
    assert_eq!(err, CommandError::AlreadyInitialized);
}

#[test]
fn initialize_surfaces_interlock_failure_for_full_flavor() {
    let mut config = lite_config();
    config.flavor = Flavor::Full {
        interlock_handle: "security".into(),
        interlock_key: "key".into(),
    };
    let config = Arc::new(config);
    let gates = Arc::new(Gates::new());
    let fifo: Arc<dyn FifoWriter> = Arc::new(FakeFifoWriter::new());
    let astro: Arc<dyn AstroRoutines> = Arc::new(FakeAstroRoutines {
        hadec: (0.0, 0.0),
        separations_deg: (0.0, 0.0),
    });
    let interlock: Arc<dyn InterlockClient> = Arc::new(FakeInterlockClient { safe: false, fail: false });
    let dispatcher = Dispatcher::new(config, gates, fifo, astro, interlock);

    let err = dispatcher.initialize(&caller()).unwrap_err();
    assert_eq!(err, CommandError::SecuritySystemTripped);
}

#[test]
fn status_reflects_current_snapshot() {
    let (dispatcher, gates, _fifo) = dispatcher_with(lite_config());
    gates.mutate_snapshot(|snap| snap.pointing_state = PointingState::Stopped);
    let report = dispatcher.status();
    assert_eq!(report.pointing_state, PointingState::Stopped);
}
