//! Shared rig for the station integration tests.

use leak_common::run::{Phase, TestRun};
use leak_common::station::StationConfig;
use leak_control::{ChannelRecorder, Station};
use leak_hal::drivers::simulation::{SimControls, SimulationDriver};
use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::thread;
use std::time::{Duration, Instant};

pub const RUN_TIMEOUT: Duration = Duration::from_secs(20);

pub struct Rig {
    pub station: Station,
    pub controls: SimControls,
    pub recorded: Receiver<TestRun>,
}

/// Reference station with a fast plant, short timeouts and a 20 ms
/// monitor cadence.
pub fn fast_config() -> StationConfig {
    let mut config = StationConfig::default();
    config.motion.speed_mm_s = 500.0;
    config.motion.homing_speed_mm_s = 500.0;
    config.motion.max_pulse_hz = 400_000.0;
    config.motion.poll_interval_ms = 10;
    config.simulation.noise_bar = 0.01;
    config.simulation.pressure_time_constant_s = 0.05;
    config.simulation.vent_time_constant_s = 0.05;
    config.timeouts.home_s = 5.0;
    config.timeouts.move_s = 5.0;
    config.timeouts.pressure_ramp_s = 1.0;
    config.timeouts.vent_s = 2.0;
    config.timeouts.max_pause_s = 0.5;
    config.safety.cadence_ms = 20;
    config.safety.cooldown_s = 0.3;
    config.sequencer.poll_interval_ms = 10;
    config
}

pub fn rig_with(config: StationConfig) -> Rig {
    let driver = SimulationDriver::new();
    let controls = driver.controls();
    let (recorder, recorded) = ChannelRecorder::new();
    let station = Station::new(config, Box::new(driver), Arc::new(recorder)).unwrap();
    Rig {
        station,
        controls,
        recorded,
    }
}

pub fn rig() -> Rig {
    rig_with(fast_config())
}

/// Poll `condition` every 5 ms until it holds or `timeout` passes.
pub fn wait_for(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

pub fn wait_for_phase(station: &Station, phase: Phase) {
    assert!(
        wait_for(Duration::from_secs(10), || station.status().phase == phase),
        "station never reached {phase}, status: {:?}",
        station.status()
    );
}

pub fn finish(station: &Station) -> TestRun {
    station
        .wait_for_completion(RUN_TIMEOUT)
        .expect("run did not finish")
}

/// Phases entered by a run, in order, one entry per transition.
pub fn phases(run: &TestRun) -> Vec<Phase> {
    let mut seen: Vec<Phase> = run.events.iter().map(|e| e.phase).collect();
    seen.dedup();
    seen
}
