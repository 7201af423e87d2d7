//! Station facade.
//!
//! Owns the HAL, the safety monitor thread and at most one sequencer worker.
//! Presentation collaborators talk only to [`Station`]: start a run, pause,
//! resume or abort it, reset an emergency, poll status and statistics.

use leak_common::calibration::FrequencyMap;
use leak_common::hal::driver::HalDriver;
use leak_common::params::TestParameters;
use leak_common::run::{Phase, RunEvent, RunStatistics, Sample, TestRun};
use leak_common::safety::SafetyState;
use leak_common::station::StationConfig;
use leak_hal::{CancelToken, DriverRegistry, Hal};
use parking_lot::{Condvar, Mutex, RwLock};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use crate::error::{ResetError, StartError, StationError};
use crate::recorder::RunRecorder;
use crate::safety::{MonitorHandle, MonitorStats, SafetyCell, SafetyMonitor};
use crate::sequencer::{LiveStatus, TestSequencer};

/// Point-in-time view for presentation collaborators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationStatus {
    pub run_id: Option<u64>,
    pub phase: Phase,
    pub safety: SafetyState,
    pub run_active: bool,
    /// Operator pause requested for the active run.
    pub paused: bool,
    pub last_sample: Option<Sample>,
    pub last_event: Option<RunEvent>,
    /// Latest pressure seen by the safety monitor.
    pub pressure_bar: Option<f64>,
    pub position_mm: Option<f64>,
}

type Finished = Arc<(Mutex<Option<TestRun>>, Condvar)>;

pub struct Station {
    config: Arc<StationConfig>,
    map: FrequencyMap,
    hal: Arc<Hal>,
    safety: Arc<SafetyCell>,
    abort: CancelToken,
    pause: CancelToken,
    live: Arc<RwLock<LiveStatus>>,
    statistics: Arc<Mutex<RunStatistics>>,
    recorder: Arc<dyn RunRecorder>,
    monitor: Mutex<Option<MonitorHandle>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    finished: Finished,
    next_id: AtomicU64,
    shut_down: AtomicBool,
}

impl Station {
    /// Validate `config`, bring up the HAL on `driver`, take one safety
    /// sample and start the monitor thread.
    pub fn new(
        config: StationConfig,
        driver: Box<dyn HalDriver>,
        recorder: Arc<dyn RunRecorder>,
    ) -> Result<Self, StationError> {
        config.validate()?;
        let map = config.frequency_map()?;
        let hal = Arc::new(Hal::new(driver, &config)?);
        let safety = Arc::new(SafetyCell::new(config.safety.clone()));

        let monitor = SafetyMonitor::new(Arc::clone(&hal), Arc::clone(&safety));
        let initial = monitor.tick();
        let handle = monitor.spawn()?;
        info!(
            "Station '{}' ready on driver '{}', safety {}",
            config.shared.service_name,
            hal.driver_name(),
            initial
        );

        Ok(Self {
            config: Arc::new(config),
            map,
            hal,
            safety,
            abort: CancelToken::new(),
            pause: CancelToken::new(),
            live: Arc::new(RwLock::new(LiveStatus::default())),
            statistics: Arc::new(Mutex::new(RunStatistics::default())),
            recorder,
            monitor: Mutex::new(Some(handle)),
            worker: Mutex::new(None),
            finished: Arc::new((Mutex::new(None), Condvar::new())),
            next_id: AtomicU64::new(1),
            shut_down: AtomicBool::new(false),
        })
    }

    /// Same as [`new`](Self::new) with the driver looked up by name.
    pub fn with_registry(
        config: StationConfig,
        registry: &DriverRegistry,
        driver: &str,
        recorder: Arc<dyn RunRecorder>,
    ) -> Result<Self, StationError> {
        let driver = registry.create_driver(driver)?;
        Self::new(config, driver, recorder)
    }

    pub fn config(&self) -> &StationConfig {
        &self.config
    }

    /// Start a run on a worker thread and return its id.
    ///
    /// # Errors
    /// `SafetyNotNormal` unless the safety state is Normal, `RunActive`
    /// while another run is in progress. No hardware command is issued on
    /// rejection.
    pub fn start(&self, parameters: TestParameters) -> Result<u64, StartError> {
        let state = self.safety.state();
        if !state.is_normal() {
            return Err(StartError::SafetyNotNormal(state));
        }
        if !self.safety.try_begin_run() {
            return Err(StartError::RunActive);
        }

        if let Some(previous) = self.worker.lock().take() {
            if previous.join().is_err() {
                error!("Previous sequencer worker panicked");
            }
        }
        self.abort.reset();
        self.pause.reset();
        *self.finished.0.lock() = None;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        *self.live.write() = LiveStatus {
            run_id: Some(id),
            ..LiveStatus::default()
        };

        let sequencer = TestSequencer::new(
            Arc::clone(&self.hal),
            Arc::clone(&self.safety),
            Arc::clone(&self.config),
            self.map.clone(),
            self.abort.clone(),
            self.pause.clone(),
            Arc::clone(&self.live),
        );
        let safety = Arc::clone(&self.safety);
        let statistics = Arc::clone(&self.statistics);
        let recorder = Arc::clone(&self.recorder);
        let finished = Arc::clone(&self.finished);

        let spawned = thread::Builder::new()
            .name(format!("sequencer-{id}"))
            .spawn(move || {
                let run = sequencer.execute(id, parameters);
                statistics.lock().record(&run.outcome);
                safety.end_run();
                {
                    let (slot, done) = &*finished;
                    *slot.lock() = Some(run.clone());
                    done.notify_all();
                }
                recorder.record(run);
            });

        match spawned {
            Ok(handle) => {
                *self.worker.lock() = Some(handle);
                Ok(id)
            }
            Err(e) => {
                self.safety.end_run();
                Err(StartError::Spawn(e.to_string()))
            }
        }
    }

    /// Validate raw operator input against the configured limits, then
    /// [`start`](Self::start).
    pub fn start_with(
        &self,
        position_mm: f64,
        pressure_bar: f64,
        inspection_min: f64,
    ) -> Result<u64, StartError> {
        let parameters =
            TestParameters::new(position_mm, pressure_bar, inspection_min, &self.config.limits)?;
        self.start(parameters)
    }

    /// Ask the active run to abort. `false` when no run is active.
    pub fn request_abort(&self) -> bool {
        if !self.safety.run_active() {
            return false;
        }
        info!("Operator abort requested");
        self.abort.cancel();
        true
    }

    /// Hold the active run. Pressure phases stop their timers, motion phases
    /// wait before the next move. A pause longer than `max_pause` fails the
    /// run. `false` when no run is active or it is already paused.
    pub fn pause(&self) -> bool {
        if !self.safety.run_active() || self.pause.is_cancelled() {
            return false;
        }
        info!("Operator pause requested");
        self.pause.cancel();
        true
    }

    /// Release an operator pause. `false` when nothing was paused.
    pub fn resume(&self) -> bool {
        if !self.pause.is_cancelled() {
            return false;
        }
        info!("Operator resume requested");
        self.pause.reset();
        true
    }

    /// Clear a latched emergency. An aborted run stays aborted.
    pub fn reset_emergency(&self) -> Result<(), ResetError> {
        self.safety.reset_emergency()?;
        self.abort.reset();
        info!("Emergency reset accepted");
        Ok(())
    }

    pub fn safety_state(&self) -> SafetyState {
        self.safety.state()
    }

    pub fn status(&self) -> StationStatus {
        let live = self.live.read().clone();
        StationStatus {
            run_id: live.run_id,
            phase: live.phase,
            safety: self.safety.state(),
            run_active: self.safety.run_active(),
            paused: self.safety.run_active() && self.pause.is_cancelled(),
            last_sample: live.last_sample,
            last_event: live.last_event,
            pressure_bar: self.safety.snapshot().and_then(|s| s.pressure_bar),
            position_mm: self.hal.position_mm(),
        }
    }

    /// Block until the current (or last) run has finished, at most
    /// `timeout`. Returns a copy of the finished record.
    pub fn wait_for_completion(&self, timeout: Duration) -> Option<TestRun> {
        let deadline = Instant::now() + timeout;
        let (slot, done) = &*self.finished;
        let mut finished = slot.lock();
        while finished.is_none() {
            if done.wait_until(&mut finished, deadline).timed_out() {
                break;
            }
        }
        finished.clone()
    }

    /// Outcome counts of every run finished since construction.
    pub fn statistics(&self) -> RunStatistics {
        *self.statistics.lock()
    }

    pub fn monitor_stats(&self) -> MonitorStats {
        self.monitor
            .lock()
            .as_ref()
            .map(MonitorHandle::stats)
            .unwrap_or_default()
    }

    /// Abort any run, wait for its safe exit, stop the monitor and put the
    /// hardware in a safe state. Idempotent.
    pub fn shutdown(&self) -> Result<(), StationError> {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        if self.request_abort() {
            info!("Waiting for the active run to finish");
        }
        if let Some(worker) = self.worker.lock().take() {
            if worker.join().is_err() {
                error!("Sequencer worker panicked");
            }
        }
        if let Some(mut monitor) = self.monitor.lock().take() {
            monitor.stop();
        }
        self.hal.shutdown()?;
        info!("Station '{}' shut down", self.config.shared.service_name);
        Ok(())
    }
}

impl Drop for Station {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!("Station shutdown incomplete: {}", e);
        }
    }
}
