//! Emergency and operator aborts during a run.

use leak_common::run::{AbortReason, Outcome, Phase, RunFaults};
use leak_common::safety::{EmergencyReason, WarningReason};
use leak_control::StartError;
use leak_hal::drivers::simulation::SimCommand;
use std::time::{Duration, Instant};

use super::support::*;

#[test]
fn emergency_during_positioning_stops_motion_first() {
    let mut config = fast_config();
    config.motion.speed_mm_s = 20.0;
    let rig = rig_with(config);

    rig.station.start_with(200.0, 2.0, 0.0).unwrap();
    wait_for_phase(&rig.station, Phase::Positioning);
    std::thread::sleep(Duration::from_millis(100));

    rig.controls.clear_commands();
    let pressed_at = Instant::now();
    rig.controls.press_emergency_button();
    let run = finish(&rig.station);
    assert!(
        pressed_at.elapsed() < Duration::from_millis(500),
        "abort took {:?}",
        pressed_at.elapsed()
    );

    assert_eq!(
        run.outcome,
        Outcome::Aborted(AbortReason::Emergency(EmergencyReason::EmergencyButton))
    );
    assert_eq!(
        phases(&run),
        [Phase::Homing, Phase::Positioning, Phase::Aborted]
    );

    let commands = rig.controls.commands();
    let stop = commands
        .iter()
        .position(|c| *c == SimCommand::StopActuator)
        .expect("no actuator stop issued");
    assert!(
        !commands[stop..]
            .iter()
            .any(|c| matches!(c, SimCommand::StepBurst { .. })),
        "motion after stop: {:?}",
        &commands[stop..]
    );

    let parked = rig.controls.position_mm().unwrap();
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(rig.controls.position_mm(), Some(parked));
    assert!(parked < 200.0);
}

#[test]
fn emergency_during_dwell_vents_and_keeps_abort_cause() {
    let rig = rig();
    rig.station.start_with(150.0, 2.5, 1.0).unwrap();
    wait_for_phase(&rig.station, Phase::Dwelling);

    rig.controls.clear_commands();
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
            Phase::Dwelling,
            Phase::Venting,
            Phase::Returning,
            Phase::Aborted,
        ]
    );
    // the return home is cut short by the latched emergency
    assert!(run.faults.contains(RunFaults::RETURN_FAILED));
    assert!(
        !rig.controls
            .commands()
            .iter()
            .any(|c| matches!(c, SimCommand::StepBurst { .. }))
    );
    assert!(rig.controls.pressure().unwrap() < 0.3);
    assert_eq!(rig.controls.drive(), Some((false, 0.0)));
    assert!(rig.station.safety_state().is_emergency());
}

#[test]
fn operator_abort_still_vents_and_returns_home() {
    let rig = rig();
    rig.station.start_with(150.0, 2.5, 1.0).unwrap();
    wait_for_phase(&rig.station, Phase::Dwelling);

    assert!(rig.station.request_abort());
    let run = finish(&rig.station);

    assert_eq!(run.outcome, Outcome::Aborted(AbortReason::OperatorAbort));
    let seen = phases(&run);
    assert_eq!(
        &seen[seen.len() - 3..],
        [Phase::Venting, Phase::Returning, Phase::Aborted]
    );
    assert!(!run.faults.contains(RunFaults::RETURN_FAILED));
    assert!((rig.controls.position_mm().unwrap() - 40.0).abs() < 0.01);

    assert!(!rig.station.request_abort());
    assert!(rig.station.safety_state().is_normal());
}

#[test]
fn overpressure_latches_emergency() {
    let rig = rig();
    rig.controls.set_pressure(4.9);
    assert!(wait_for(Duration::from_secs(1), || rig
        .station
        .safety_state()
        .is_emergency()));
    assert!(matches!(
        rig.station.safety_state().emergency_reason(),
        Some(EmergencyReason::Overpressure { .. })
    ));

    rig.controls.set_pressure(0.0);
    std::thread::sleep(Duration::from_millis(100));
    assert!(rig.station.safety_state().is_emergency());
}

#[test]
fn high_pressure_is_a_warning_that_blocks_start() {
    let rig = rig();
    rig.controls.set_pressure(4.7);
    assert!(wait_for(Duration::from_secs(1), || rig
        .station
        .safety_state()
        .warning_reason()
        .is_some()));
    assert!(matches!(
        rig.station.safety_state().warning_reason(),
        Some(WarningReason::PressureHigh { .. })
    ));
    assert!(matches!(
        rig.station.start_with(150.0, 2.5, 0.1),
        Err(StartError::SafetyNotNormal(_))
    ));
}
