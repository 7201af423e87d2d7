//! Faults and emergencies in the homing, pressurizing and venting phases.

use leak_common::run::{AbortReason, FailReason, Outcome, Phase, RunFaults};
use leak_common::safety::EmergencyReason;
use leak_hal::drivers::simulation::SimCommand;
use std::time::Duration;

use super::support::*;

#[test]
fn home_timeout_ends_run_without_venting() {
    let mut config = fast_config();
    config.simulation.start_position_mm = 120.0;
    config.timeouts.home_s = 0.2;
    let rig = rig_with(config);
    rig.controls.jam_actuator(true);

    rig.station.start_with(150.0, 2.5, 0.1).unwrap();
    let run = finish(&rig.station);

    assert_eq!(run.outcome, Outcome::Failed(FailReason::HomeTimeout));
    assert_eq!(phases(&run), [Phase::Homing, Phase::Failed]);
    assert!(
        !rig.controls
            .commands()
            .iter()
            .any(|c| matches!(c, SimCommand::DriveRunning(true)))
    );
    assert!((rig.controls.position_mm().unwrap() - 120.0).abs() < 0.01);
    assert!(!rig.station.status().run_active);
}

#[test]
fn emergency_during_homing_aborts_in_place() {
    let mut config = fast_config();
    config.simulation.start_position_mm = 120.0;
    config.motion.homing_speed_mm_s = 20.0;
    let rig = rig_with(config);

    rig.station.start_with(150.0, 2.5, 0.1).unwrap();
    wait_for_phase(&rig.station, Phase::Homing);
    std::thread::sleep(Duration::from_millis(100));
    rig.controls.press_emergency_button();

    let run = finish(&rig.station);
    assert_eq!(
        run.outcome,
        Outcome::Aborted(AbortReason::Emergency(EmergencyReason::EmergencyButton))
    );
    assert_eq!(phases(&run), [Phase::Homing, Phase::Aborted]);

    let parked = rig.controls.position_mm().unwrap();
    assert!(parked > 40.0 && parked < 120.0, "parked at {parked}");
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(rig.controls.position_mm(), Some(parked));
}

#[test]
fn emergency_during_pressurizing_vents_before_ending() {
    let mut config = fast_config();
    config.simulation.pressure_time_constant_s = 3.0;
    config.timeouts.pressure_ramp_s = 10.0;
    let rig = rig_with(config);

    rig.station.start_with(150.0, 2.5, 0.1).unwrap();
    wait_for_phase(&rig.station, Phase::Pressurizing);
    std::thread::sleep(Duration::from_millis(200));
    rig.controls.press_emergency_button();

    let run = finish(&rig.station);
    assert_eq!(
        run.outcome,
        Outcome::Aborted(AbortReason::Emergency(EmergencyReason::EmergencyButton))
    );
    assert_eq!(
        phases(&run),
        [
            Phase::Homing,
            Phase::Positioning,
            Phase::Pressurizing,
            Phase::Venting,
            Phase::Returning,
            Phase::Aborted,
        ]
    );
    assert!(run.dwell_stats.is_none());
    assert!(rig.controls.pressure().unwrap() < 0.3);
    assert_eq!(rig.controls.drive(), Some((false, 0.0)));
}

#[test]
fn vent_timeout_is_recorded_and_run_returns_home() {
    let mut config = fast_config();
    config.simulation.vent_time_constant_s = 5.0;
    config.timeouts.vent_s = 0.1;
    let rig = rig_with(config);

    rig.station.start_with(150.0, 2.5, 0.02).unwrap();
    let run = finish(&rig.station);

    assert!(run.faults.contains(RunFaults::VENT_TIMEOUT));
    assert!(
        run.events
            .iter()
            .any(|e| e.phase == Phase::Venting && e.reason == "vent_timeout")
    );
    let seen = phases(&run);
    assert_eq!(
        &seen[seen.len() - 3..],
        [Phase::Venting, Phase::Returning, Phase::Passed]
    );
    assert!((rig.controls.position_mm().unwrap() - 40.0).abs() < 0.01);
}
