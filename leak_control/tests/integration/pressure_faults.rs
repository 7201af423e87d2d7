//! Pressure and motion faults: every path after Pressurizing vents and
//! returns home before the run ends.

use leak_common::run::{FailReason, Outcome, Phase};
use std::time::Duration;

use super::support::*;

#[test]
fn pressure_not_reached_vents_then_returns() {
    let rig = rig();
    rig.controls.set_pressure_ceiling(Some(1.0));
    rig.station.start_with(150.0, 2.5, 0.1).unwrap();
    let run = finish(&rig.station);

    assert_eq!(run.outcome, Outcome::Failed(FailReason::PressureNotReached));
    assert_eq!(
        phases(&run),
        [
            Phase::Homing,
            Phase::Positioning,
            Phase::Pressurizing,
            Phase::Venting,
            Phase::Returning,
            Phase::Failed,
        ]
    );
    assert!(run.dwell_stats.is_none());
    assert_eq!(rig.controls.drive(), Some((false, 0.0)));
    assert!((rig.controls.position_mm().unwrap() - 40.0).abs() < 0.01);
}

#[test]
fn leak_during_dwell_is_detected() {
    let rig = rig();
    rig.station.start_with(150.0, 2.5, 1.0).unwrap();
    wait_for_phase(&rig.station, Phase::Dwelling);
    rig.controls.set_leak_rate(10.0);

    let run = finish(&rig.station);
    assert_eq!(run.outcome, Outcome::Failed(FailReason::LeakDetected));
    let seen = phases(&run);
    assert_eq!(
        &seen[3..],
        [Phase::Dwelling, Phase::Venting, Phase::Returning, Phase::Failed]
    );
    assert!(run.duration_s < 30.0);
    assert!(run.events.iter().any(|e| e.reason == "leak_detected"));
    assert!(run.dwell_stats.is_some());
}

#[test]
fn move_timeout_skips_venting() {
    let mut config = fast_config();
    // the full stroke needs about 0.22 s at 500 mm/s
    config.timeouts.move_s = 0.1;
    let rig = rig_with(config);
    rig.controls.jam_actuator(true);

    rig.station.start_with(150.0, 2.5, 0.1).unwrap();
    let run = finish(&rig.station);

    assert_eq!(run.outcome, Outcome::Failed(FailReason::MoveTimeout));
    assert_eq!(
        phases(&run),
        [
            Phase::Homing,
            Phase::Positioning,
            Phase::Returning,
            Phase::Failed,
        ]
    );
    assert!(run.duration_s >= Duration::from_millis(100).as_secs_f64());
}
