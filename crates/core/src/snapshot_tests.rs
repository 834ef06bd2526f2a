use super::*;

#[test]
fn reset_absent_zeroes_controller_derived_fields() {
    let mut snap = Snapshot {
        pointing_state: PointingState::Tracking,
        pointing_index: 7,
        focus_state: FocusState::Ready,
        telescope_focus_um: 120.0,
        axes_homed: true,
        controller_pid: 4242,
        controller_tod_mjd: 60000.5,
        ..Snapshot::default()
    };
    snap.reset_absent();
    assert_eq!(snap.pointing_state, PointingState::Absent);
    assert_eq!(snap.pointing_index, 0);
    assert_eq!(snap.focus_state, FocusState::Absent);
    assert_eq!(snap.telescope_focus_um, 0.0);
    assert!(!snap.axes_homed);
    assert_eq!(snap.controller_pid, 0);
}

#[test]
fn offset_accumulates_and_resets() {
    let mut offset = Offset::default();
    offset.accumulate(0.001, -0.002);
    offset.accumulate(0.001, -0.002);
    assert!((offset.ra_deg - 0.002).abs() < 1e-12);
    assert!((offset.dec_deg - (-0.004)).abs() < 1e-12);
    offset.reset();
    assert_eq!(offset, Offset::default());
}

#[test]
fn edge_detection_flags_index_and_focus_changes() {
    let mut snap = Snapshot::default();
    snap.last_pointing_index = snap.pointing_index;
    snap.last_telescope_focus_um = snap.telescope_focus_um;
    snap.last_focus_state = snap.focus_state;
    assert!(!snap.pointing_index_changed());
    assert!(!snap.focus_changed());

    snap.pointing_index += 1;
    assert!(snap.pointing_index_changed());

    snap.focus_state = FocusState::Homing;
    assert!(snap.focus_changed());
}
