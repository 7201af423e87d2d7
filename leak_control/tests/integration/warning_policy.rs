//! Warning handling during a run under both policies.

use leak_common::run::{FailReason, Outcome, Phase, RunFaults};
use leak_common::station::WarningPolicy;
use std::thread;
use std::time::Duration;

use super::support::*;

#[test]
fn continue_policy_logs_warning_and_passes() {
    let rig = rig();
    rig.station.start_with(150.0, 2.5, 0.02).unwrap();
    wait_for_phase(&rig.station, Phase::Dwelling);
    rig.controls.set_tank_low(true);

    let run = finish(&rig.station);
    assert_eq!(run.outcome, Outcome::Passed);
    assert!(run.faults.contains(RunFaults::WARNING_DURING_RUN));
    assert!(
        run.events
            .iter()
            .any(|e| e.reason == "warning: tank level low")
    );
}

#[test]
fn pause_policy_fails_when_warning_outlasts_max_pause() {
    let mut config = fast_config();
    config.sequencer.warning_policy = WarningPolicy::Pause;
    let rig = rig_with(config);

    rig.station.start_with(150.0, 2.5, 1.0).unwrap();
    wait_for_phase(&rig.station, Phase::Dwelling);
    rig.controls.set_tank_low(true);

    let run = finish(&rig.station);
    assert_eq!(run.outcome, Outcome::Failed(FailReason::WarningPauseTimeout));
    let seen = phases(&run);
    assert_eq!(
        &seen[seen.len() - 3..],
        [Phase::Venting, Phase::Returning, Phase::Failed]
    );
    assert!((rig.controls.position_mm().unwrap() - 40.0).abs() < 0.01);
}

#[test]
fn pause_policy_holds_dwell_timer() {
    let mut config = fast_config();
    config.sequencer.warning_policy = WarningPolicy::Pause;
    config.timeouts.max_pause_s = 2.0;
    let rig = rig_with(config);

    rig.station.start_with(150.0, 2.5, 0.02).unwrap();
    wait_for_phase(&rig.station, Phase::Dwelling);
    rig.controls.set_tank_low(true);
    thread::sleep(Duration::from_millis(400));
    rig.controls.set_tank_low(false);

    let run = finish(&rig.station);
    assert_eq!(run.outcome, Outcome::Passed);
    assert!(run.events.iter().any(|e| e.reason == "warning cleared"));

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
