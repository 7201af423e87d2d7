//! Complete runs on a healthy simulated station.

use leak_common::run::{Outcome, Phase, RunFaults};
use leak_common::station::load_station_config;
use leak_hal::drivers::simulation::SimCommand;
use std::io::Write;
use std::time::Duration;

use super::support::*;

#[test]
fn full_run_passes_with_dwell_inside_tolerance() {
    let rig = rig();
    let id = rig.station.start_with(150.0, 2.5, 0.1).unwrap();
    let run = finish(&rig.station);

    assert_eq!(run.id, id);
    assert_eq!(run.outcome, Outcome::Passed);
    assert_eq!(
        phases(&run),
        [
            Phase::Homing,
            Phase::Positioning,
            Phase::Pressurizing,
            Phase::Dwelling,
            Phase::Venting,
            Phase::Returning,
            Phase::Passed,
        ]
    );
    assert!(run.faults.is_empty(), "faults: {:?}", run.faults);

    let dwell: Vec<_> = run
        .samples
        .iter()
        .filter(|s| s.phase == Phase::Dwelling)
        .collect();
    assert!(dwell.len() >= 50, "only {} dwell samples", dwell.len());
    for s in &dwell {
        assert!(
            (s.pressure_bar - 2.5).abs() <= 0.2,
            "dwell sample {:.3} bar at t={:.2}s",
            s.pressure_bar,
            s.t_s
        );
        let position = s.position_mm.unwrap();
        assert!((position - 150.0).abs() <= 0.1);
    }
    let stats = run.dwell_stats.unwrap();
    assert_eq!(stats.count, dwell.len());
    assert!((stats.mean_bar - 2.5).abs() < 0.05);
    assert!(run.duration_s >= 6.0);

    assert_eq!(rig.controls.drive(), Some((false, 0.0)));
    assert!((rig.controls.position_mm().unwrap() - 40.0).abs() < 0.01);

    let recorded = rig.recorded.recv_timeout(Duration::from_secs(1)).unwrap();
    assert_eq!(recorded, run);
}

#[test]
fn events_are_time_ordered() {
    let rig = rig();
    rig.station.start_with(120.0, 2.0, 0.0).unwrap();
    let run = finish(&rig.station);

    assert_eq!(run.outcome, Outcome::Passed);
    assert!(run.events.windows(2).all(|w| w[0].t_s <= w[1].t_s));
    assert_eq!(run.events[0].reason, "run started");
    assert!(
        run.events
            .iter()
            .any(|e| e.reason == "pressurizing complete")
    );
}

#[test]
fn new_run_after_completion_gets_new_id() {
    let rig = rig();
    let first = rig.station.start_with(100.0, 1.5, 0.0).unwrap();
    assert_eq!(finish(&rig.station).outcome, Outcome::Passed);

    let second = rig.station.start_with(180.0, 3.0, 0.0).unwrap();
    assert!(second > first);
    let run = finish(&rig.station);
    assert_eq!(run.id, second);
    assert_eq!(run.outcome, Outcome::Passed);

    let status = rig.station.status();
    assert!(!status.run_active);
    assert_eq!(status.phase, Phase::Passed);
    assert_eq!(status.run_id, Some(second));
}

#[test]
fn ambient_target_does_not_start_the_drive() {
    let rig = rig();
    rig.controls.clear_commands();
    rig.station.start_with(100.0, 0.0, 0.0).unwrap();
    let run = finish(&rig.station);

    assert_eq!(run.outcome, Outcome::Passed);
    assert!(!rig.controls.commands().contains(&SimCommand::DriveRunning(true)));
    assert!(!run.faults.contains(RunFaults::VENT_TIMEOUT));
}

#[test]
fn station_runs_from_a_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[shared]
log_level = "debug"
service_name = "bench-rig"

[motion]
speed_mm_s = 500.0
homing_speed_mm_s = 500.0
max_pulse_hz = 400000.0
poll_interval_ms = 10

[timeouts]
pressure_ramp_s = 1.0

[safety]
cadence_ms = 20

[sequencer]
poll_interval_ms = 10

[simulation]
noise_bar = 0.01
pressure_time_constant_s = 0.05
vent_time_constant_s = 0.05
"#
    )
    .unwrap();

    let config = load_station_config(file.path()).unwrap();
    assert_eq!(config.shared.service_name, "bench-rig");
    let rig = rig_with(config);
    rig.station.start_with(120.0, 2.0, 0.0).unwrap();
    assert_eq!(finish(&rig.station).outcome, Outcome::Passed);
}
