//! Operator pause and resume, and the station's run statistics.

use leak_common::run::{FailReason, Outcome, Phase, RunStatistics};
use std::thread;
use std::time::Duration;

use super::support::*;

#[test]
fn pause_holds_dwell_timer_until_resume() {
    let mut config = fast_config();
    config.timeouts.max_pause_s = 2.0;
    let rig = rig_with(config);

    rig.station.start_with(150.0, 2.5, 0.02).unwrap();
    wait_for_phase(&rig.station, Phase::Dwelling);
    assert!(rig.station.pause());
    assert!(!rig.station.pause());
    assert!(rig.station.status().paused);

    thread::sleep(Duration::from_millis(400));
    assert_eq!(rig.station.status().phase, Phase::Dwelling);
    assert!(rig.station.resume());
    assert!(!rig.station.resume());

    let run = finish(&rig.station);
    assert_eq!(run.outcome, Outcome::Passed);
    let reasons: Vec<&str> = run.events.iter().map(|e| e.reason.as_str()).collect();
    let paused = reasons.iter().position(|r| *r == "paused by operator");
    let resumed = reasons.iter().position(|r| *r == "resumed by operator");
    assert!(paused.is_some() && resumed > paused, "events: {reasons:?}");

    let entered = |phase| {
        run.events
            .iter()
            .find(|e| e.phase == phase)
            .map(|e| e.t_s)
            .unwrap()
    };
    let dwell = entered(Phase::Venting) - entered(Phase::Dwelling);
    assert!(dwell >= 1.2 + 0.25, "dwell lasted {dwell:.2}s");
}

#[test]
fn pause_longer_than_max_pause_fails_run() {
    let rig = rig();
    rig.station.start_with(150.0, 2.5, 1.0).unwrap();
    wait_for_phase(&rig.station, Phase::Dwelling);
    assert!(rig.station.pause());

    let run = finish(&rig.station);
    assert_eq!(run.outcome, Outcome::Failed(FailReason::PauseTimeout));
    let seen = phases(&run);
    assert_eq!(
        &seen[seen.len() - 3..],
        [Phase::Venting, Phase::Returning, Phase::Failed]
    );
    assert!((rig.controls.position_mm().unwrap() - 40.0).abs() < 0.01);
    assert!(!rig.station.status().paused);
}

#[test]
fn pause_before_positioning_keeps_actuator_home() {
    let mut config = fast_config();
    config.simulation.start_position_mm = 120.0;
    config.motion.homing_speed_mm_s = 100.0;
    config.timeouts.max_pause_s = 3.0;
    let rig = rig_with(config);

    rig.station.start_with(150.0, 2.5, 0.0).unwrap();
    wait_for_phase(&rig.station, Phase::Homing);
    // homing from 120 mm takes about 0.8 s; the move is already under way
    thread::sleep(Duration::from_millis(100));
    assert!(rig.station.pause());

    wait_for_phase(&rig.station, Phase::Positioning);
    thread::sleep(Duration::from_millis(300));
    assert!(rig.controls.position_mm().unwrap() < 41.0);

    assert!(rig.station.resume());
    let run = finish(&rig.station);
    assert_eq!(run.outcome, Outcome::Passed);
}

#[test]
fn pause_and_resume_need_an_active_run() {
    let rig = rig();
    assert!(!rig.station.pause());
    assert!(!rig.station.resume());
    assert!(!rig.station.status().paused);
}

#[test]
fn statistics_count_finished_runs() {
    let rig = rig();
    assert_eq!(rig.station.statistics(), RunStatistics::default());

    rig.station.start_with(150.0, 2.5, 0.0).unwrap();
    assert_eq!(finish(&rig.station).outcome, Outcome::Passed);

    rig.station.start_with(150.0, 2.5, 1.0).unwrap();
    wait_for_phase(&rig.station, Phase::Dwelling);
    assert!(rig.station.request_abort());
    assert!(matches!(finish(&rig.station).outcome, Outcome::Aborted(_)));

    rig.controls.set_pressure_ceiling(Some(1.0));
    rig.station.start_with(150.0, 2.5, 0.1).unwrap();
    assert!(matches!(finish(&rig.station).outcome, Outcome::Failed(_)));

    assert_eq!(
        rig.station.statistics(),
        RunStatistics {
            total: 3,
            passed: 1,
            failed: 1,
            aborted: 1,
        }
    );
}
