//! Emergency reset rules.

use leak_common::run::{AbortReason, Outcome, Phase};
use leak_common::safety::EmergencyReason;
use leak_control::ResetError;
use std::thread;
use std::time::Duration;

use super::support::*;

#[test]
fn reset_requires_cooldown_and_cleared_condition() {
    let mut config = fast_config();
    config.safety.cooldown_s = 1.0;
    let rig = rig_with(config);

    rig.station.start_with(150.0, 2.5, 1.0).unwrap();
    wait_for_phase(&rig.station, Phase::Dwelling);
    rig.controls.press_emergency_button();
    let aborted = finish(&rig.station);
    assert!(matches!(aborted.outcome, Outcome::Aborted(_)));

    assert!(matches!(
        rig.station.reset_emergency(),
        Err(ResetError::CooldownPending { .. })
    ));

    thread::sleep(Duration::from_millis(1100));
    assert_eq!(
        rig.station.reset_emergency(),
        Err(ResetError::ConditionActive(EmergencyReason::EmergencyButton))
    );

    rig.controls.release_emergency_button();
    thread::sleep(Duration::from_millis(150));
    assert_eq!(rig.station.reset_emergency(), Ok(()));
    assert!(rig.station.safety_state().is_normal());

    // the aborted run is not resumed
    let status = rig.station.status();
    assert_eq!(status.phase, Phase::Aborted);
    assert!(!status.run_active);
    assert_eq!(
        rig.station
            .wait_for_completion(Duration::from_millis(10))
            .map(|r| r.outcome),
        Some(Outcome::Aborted(AbortReason::Emergency(
            EmergencyReason::EmergencyButton
        )))
    );

    let next = rig.station.start_with(150.0, 2.5, 0.0).unwrap();
    assert!(next > aborted.id);
    let run = finish(&rig.station);
    assert_eq!(run.id, next);
    assert_eq!(run.outcome, Outcome::Passed);
}

#[test]
fn reset_without_emergency_is_rejected() {
    let rig = rig();
    assert_eq!(
        rig.station.reset_emergency(),
        Err(ResetError::NotInEmergency)
    );
}

#[test]
fn door_opened_during_run_needs_closing_before_reset() {
    let rig = rig();
    rig.station.start_with(150.0, 2.5, 1.0).unwrap();
    wait_for_phase(&rig.station, Phase::Dwelling);
    rig.controls.open_door();

    let run = finish(&rig.station);
    assert_eq!(
        run.outcome,
        Outcome::Aborted(AbortReason::Emergency(EmergencyReason::DoorOpenDuringRun))
    );

    thread::sleep(Duration::from_millis(400));
    assert!(!rig.station.status().run_active);
    assert_eq!(
        rig.station.reset_emergency(),
        Err(ResetError::ConditionActive(EmergencyReason::DoorOpenDuringRun))
    );
    assert!(rig.station.safety_state().is_emergency());

    rig.controls.close_door();
    thread::sleep(Duration::from_millis(150));
    assert_eq!(rig.station.reset_emergency(), Ok(()));
    assert!(rig.station.safety_state().is_normal());
}
