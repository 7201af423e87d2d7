//! Hardware watchdog and communication faults.

use leak_common::io::role::InputRole;
use leak_common::run::{AbortReason, FailReason, Outcome, Phase, RunFaults};
use leak_common::safety::EmergencyReason;
use leak_control::ResetError;
use std::thread;
use std::time::Duration;

use super::support::*;

#[test]
fn silent_bus_forces_emergency() {
    let mut config = fast_config();
    config.safety.watchdog_timeout_s = 0.3;
    let rig = rig_with(config);

    rig.controls.set_read_failure(true);
    assert!(wait_for(Duration::from_secs(2), || rig
        .station
        .safety_state()
        .is_emergency()));
    assert_eq!(
        rig.station.safety_state().emergency_reason(),
        Some(EmergencyReason::HardwareUnresponsive)
    );
    assert!(rig.station.monitor_stats().read_failures > 0);

    thread::sleep(Duration::from_millis(400));
    assert_eq!(
        rig.station.reset_emergency(),
        Err(ResetError::ConditionActive(
            EmergencyReason::HardwareUnresponsive
        ))
    );

    rig.controls.set_read_failure(false);
    thread::sleep(Duration::from_millis(150));
    assert_eq!(rig.station.reset_emergency(), Ok(()));
    thread::sleep(Duration::from_millis(100));
    assert!(rig.station.safety_state().is_normal());
}

#[test]
fn read_failure_during_dwell_fails_run_without_retry() {
    let rig = rig();
    rig.station.start_with(150.0, 2.5, 1.0).unwrap();
    wait_for_phase(&rig.station, Phase::Dwelling);
    rig.controls.set_read_failure(true);

    let run = finish(&rig.station);
    assert!(matches!(
        run.outcome,
        Outcome::Failed(FailReason::HardwareFault(_))
    ));
    let seen = phases(&run);
    assert_eq!(
        &seen[seen.len() - 3..],
        [Phase::Venting, Phase::Returning, Phase::Failed]
    );
    assert!(run.faults.contains(RunFaults::RETURN_FAILED));
    assert_eq!(rig.controls.drive(), Some((false, 0.0)));

    rig.controls.set_read_failure(false);
}

#[test]
fn dead_emergency_button_aborts_run() {
    let mut config = fast_config();
    config.safety.watchdog_timeout_s = 0.3;
    let rig = rig_with(config);

    rig.station.start_with(150.0, 2.5, 1.0).unwrap();
    wait_for_phase(&rig.station, Phase::Dwelling);
    rig.controls.fail_input(InputRole::EmergencyButton, true);

    let dead = EmergencyReason::InputUnreadable {
        role: InputRole::EmergencyButton,
    };
    let run = finish(&rig.station);
    assert_eq!(run.outcome, Outcome::Aborted(AbortReason::Emergency(dead)));
    assert_eq!(rig.station.safety_state().emergency_reason(), Some(dead));
    assert_eq!(rig.controls.drive(), Some((false, 0.0)));

    thread::sleep(Duration::from_millis(400));
    assert_eq!(
        rig.station.reset_emergency(),
        Err(ResetError::ConditionActive(dead))
    );

    rig.controls.fail_input(InputRole::EmergencyButton, false);
    thread::sleep(Duration::from_millis(150));
    assert_eq!(rig.station.reset_emergency(), Ok(()));
}

#[test]
fn dead_door_switch_latches_emergency_while_idle() {
    let mut config = fast_config();
    config.safety.watchdog_timeout_s = 0.2;
    let rig = rig_with(config);

    rig.controls.fail_input(InputRole::DoorClosed, true);
    assert!(wait_for(Duration::from_secs(2), || rig
        .station
        .safety_state()
        .is_emergency()));
    assert_eq!(
        rig.station.safety_state().emergency_reason(),
        Some(EmergencyReason::InputUnreadable {
            role: InputRole::DoorClosed
        })
    );
    rig.controls.fail_input(InputRole::DoorClosed, false);
}
