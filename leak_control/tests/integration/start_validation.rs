//! Start requests rejected before any hardware command.

use leak_common::params::ParameterError;
use leak_common::safety::{SafetyState, WarningReason};
use leak_control::StartError;
use std::time::Duration;

use super::support::*;

#[test]
fn out_of_range_position_rejected_before_hardware() {
    let rig = rig();
    rig.controls.clear_commands();

    let err = rig.station.start_with(300.0, 2.5, 1.0).unwrap_err();
    assert_eq!(
        err,
        StartError::InvalidParameters(ParameterError::OutOfRange {
            field: "target_position_mm",
            value: 300.0,
            min: 65.0,
            max: 200.0,
        })
    );
    assert!(rig.controls.commands().is_empty());

    let status = rig.station.status();
    assert!(!status.run_active);
    assert_eq!(status.run_id, None);
}

#[test]
fn non_finite_input_rejected() {
    let rig = rig();
    assert!(matches!(
        rig.station.start_with(150.0, f64::NAN, 1.0),
        Err(StartError::InvalidParameters(ParameterError::NotFinite { .. }))
    ));
}

#[test]
fn open_door_blocks_start() {
    let rig = rig();
    rig.controls.open_door();
    assert!(wait_for(Duration::from_secs(1), || !rig
        .station
        .safety_state()
        .is_normal()));

    rig.controls.clear_commands();
    assert_eq!(
        rig.station.start_with(150.0, 2.5, 0.1),
        Err(StartError::SafetyNotNormal(SafetyState::Warning {
            reason: WarningReason::DoorOpen
        }))
    );
    assert!(rig.controls.commands().is_empty());
}

#[test]
fn second_start_while_active_is_rejected() {
    let rig = rig();
    rig.station.start_with(150.0, 2.5, 1.0).unwrap();
    assert_eq!(
        rig.station.start_with(100.0, 1.0, 0.0),
        Err(StartError::RunActive)
    );

    assert!(rig.station.request_abort());
    finish(&rig.station);
}

#[test]
fn emergency_blocks_start() {
    let rig = rig();
    rig.controls.press_emergency_button();
    assert!(wait_for(Duration::from_secs(1), || rig
        .station
        .safety_state()
        .is_emergency()));

    assert!(matches!(
        rig.station.start_with(150.0, 2.5, 0.1),
        Err(StartError::SafetyNotNormal(SafetyState::Emergency { .. }))
    ));
}
