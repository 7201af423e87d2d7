//! Safety monitor thread.
//!
//! Samples every safety input and the pressure once per cadence, applies
//! the hardware watchdog, classifies and publishes into the [`SafetyCell`].
//!
//! Two watchdogs run on the same timeout: one for the whole bus, one per
//! critical input. A dead emergency-button line is an emergency even while
//! every other read succeeds.
//!
//! On a transition into Emergency it commands `Hal::emergency_stop()`
//! itself, so motion stops even while the sequencer is inside a blocking
//! call.

use leak_common::hal::driver::HalError;
use leak_common::io::role::InputRole;
use leak_common::safety::{EmergencyReason, SafetyConfig, SafetyState};
use leak_hal::Hal;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{debug, error, info, trace, warn};

use super::cell::SafetyCell;
use super::classify::{Assessment, SafetySnapshot, classify};
use crate::error::StationError;

/// Signals read per tick: five inputs and the pressure.
const SIGNALS_PER_TICK: usize = 6;

/// Inputs whose loss alone stops the station.
const CRITICAL_INPUTS: [InputRole; 4] = [
    InputRole::EmergencyButton,
    InputRole::DoorClosed,
    InputRole::ActuatorMin,
    InputRole::ActuatorMax,
];

/// Monitor counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MonitorStats {
    pub ticks: u64,
    /// Individual input or ADC reads that failed.
    pub read_failures: u64,
    pub emergencies: u64,
    /// Ticks that took longer than the cadence.
    pub overruns: u64,
}

pub struct SafetyMonitor {
    hal: Arc<Hal>,
    cell: Arc<SafetyCell>,
    config: SafetyConfig,
    stats: Arc<Mutex<MonitorStats>>,
    /// Last successful read per critical input.
    last_good: Mutex<HashMap<InputRole, Instant>>,
}

impl SafetyMonitor {
    pub fn new(hal: Arc<Hal>, cell: Arc<SafetyCell>) -> Self {
        let config = cell.config().clone();
        let now = Instant::now();
        Self {
            hal,
            cell,
            config,
            stats: Arc::new(Mutex::new(MonitorStats::default())),
            last_good: Mutex::new(CRITICAL_INPUTS.into_iter().map(|r| (r, now)).collect()),
        }
    }

    pub fn stats(&self) -> MonitorStats {
        *self.stats.lock()
    }

    /// Sample, classify and publish once. Returns the published state.
    pub fn tick(&self) -> SafetyState {
        let mut failures: Vec<HalError> = Vec::new();
        let snapshot = SafetySnapshot {
            taken_at: Instant::now(),
            emergency_button: sample(self.hal.read_digital(InputRole::EmergencyButton), &mut failures),
            door_closed: sample(self.hal.read_digital(InputRole::DoorClosed), &mut failures),
            tank_low: sample(self.hal.read_digital(InputRole::TankLow), &mut failures),
            actuator_min: sample(self.hal.read_digital(InputRole::ActuatorMin), &mut failures),
            actuator_max: sample(self.hal.read_digital(InputRole::ActuatorMax), &mut failures),
            pressure_bar: sample(self.hal.read_pressure(), &mut failures),
        };

        if let Some(first) = failures.first() {
            warn!(
                "Safety monitor: {} of {} reads failed this tick ({})",
                failures.len(),
                SIGNALS_PER_TICK,
                first
            );
        }

        let silent_for = self.hal.since_last_read();
        let assessment = if silent_for >= self.config.watchdog_timeout() {
            debug!("Watchdog expired: no successful read for {:?}", silent_for);
            Assessment::Emergency(EmergencyReason::HardwareUnresponsive)
        } else if let Some(role) = self.unreadable_input(&snapshot, failures.len()) {
            debug!("Watchdog expired for input {}", role);
            Assessment::Emergency(EmergencyReason::InputUnreadable { role })
        } else {
            classify(&snapshot, &self.config, self.cell.run_active())
        };
        trace!("Safety tick: {:?} -> {:?}", snapshot, assessment);

        let changed = self.cell.publish(snapshot, assessment);
        {
            let mut stats = self.stats.lock();
            stats.ticks += 1;
            stats.read_failures += failures.len() as u64;
            if changed.is_some_and(|s| s.is_emergency()) {
                stats.emergencies += 1;
            }
        }

        match changed {
            Some(state @ SafetyState::Emergency { .. }) => {
                error!("Safety: {}", state);
                if let Err(e) = self.hal.emergency_stop() {
                    error!("Emergency stop command failed: {}", e);
                }
            }
            Some(state @ SafetyState::Warning { .. }) => warn!("Safety: {}", state),
            Some(SafetyState::Normal) => info!("Safety: back to normal"),
            None => {}
        }
        self.cell.state()
    }

    /// Record successful critical reads and return the first critical
    /// input that has been unreadable for the watchdog timeout. A tick in
    /// which nothing answered is left to the bus watchdog.
    fn unreadable_input(&self, snapshot: &SafetySnapshot, failed: usize) -> Option<InputRole> {
        let mut last_good = self.last_good.lock();
        for role in CRITICAL_INPUTS {
            if snapshot.input(role).is_some() {
                last_good.insert(role, snapshot.taken_at);
            }
        }
        if failed >= SIGNALS_PER_TICK {
            return None;
        }
        let timeout = self.config.watchdog_timeout();
        CRITICAL_INPUTS.into_iter().find(|role| {
            last_good
                .get(role)
                .is_some_and(|t| snapshot.taken_at.saturating_duration_since(*t) >= timeout)
        })
    }

    /// Move the monitor onto its own thread.
    pub fn spawn(self) -> Result<MonitorHandle, StationError> {
        let running = Arc::new(AtomicBool::new(true));
        let stats = Arc::clone(&self.stats);
        let flag = Arc::clone(&running);
        let thread = thread::Builder::new()
            .name("safety-monitor".to_string())
            .spawn(move || self.run(&flag))
            .map_err(|e| StationError::Spawn(e.to_string()))?;

        Ok(MonitorHandle {
            running,
            stats,
            thread: Some(thread),
        })
    }

    fn run(&self, running: &AtomicBool) {
        let cadence = self.config.cadence();
        info!("Safety monitor started (cadence={}ms)", cadence.as_millis());

        while running.load(Ordering::SeqCst) {
            let tick_start = Instant::now();
            self.tick();

            let elapsed = tick_start.elapsed();
            if elapsed < cadence {
                thread::sleep(cadence - elapsed);
            } else {
                let overruns = {
                    let mut stats = self.stats.lock();
                    stats.overruns += 1;
                    stats.overruns
                };
                if overruns <= 10 || overruns % 100 == 0 {
                    warn!(
                        "Safety tick overrun #{}: {:?} (cadence {:?})",
                        overruns, elapsed, cadence
                    );
                }
            }
        }

        let stats = self.stats();
        info!(
            "Safety monitor stopped after {} ticks ({} emergencies, {} failed reads)",
            stats.ticks, stats.emergencies, stats.read_failures
        );
    }
}

fn sample<T>(result: Result<T, HalError>, failures: &mut Vec<HalError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            failures.push(e);
            None
        }
    }
}

/// Owner of the running monitor thread. Dropping it stops the thread.
pub struct MonitorHandle {
    running: Arc<AtomicBool>,
    stats: Arc<Mutex<MonitorStats>>,
    thread: Option<JoinHandle<()>>,
}

impl MonitorHandle {
    pub fn stats(&self) -> MonitorStats {
        *self.stats.lock()
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop the loop and join the thread.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Safety monitor thread panicked");
            }
        }
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
