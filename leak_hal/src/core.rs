//! HAL core: the single access path to station hardware.
//!
//! `Hal` wraps one driver behind a mutex that is held per driver call, never
//! across a whole move, so the safety monitor can sample inputs between step
//! bursts. All methods take `&self`; share it with `Arc<Hal>`.

use leak_common::hal::config::{AdcConfig, DriveConfig, MotionConfig};
use leak_common::hal::driver::{HalDriver, HalError};
use leak_common::hal::types::{Direction, MoveOutcome, MoveTarget};
use leak_common::io::registry::IoRegistry;
use leak_common::io::role::{InputRole, OutputRole};
use leak_common::station::StationConfig;
use parking_lot::Mutex;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::debounce::{Debouncer, Observation};
use crate::driver_registry::DriverRegistry;

/// Step-count position tracking. `None` until the home switch has been seen.
#[derive(Debug, Default)]
struct ActuatorState {
    steps_from_home: Option<i64>,
}

/// Hardware access layer.
pub struct Hal {
    driver: Mutex<Box<dyn HalDriver>>,
    driver_name: &'static str,
    io: IoRegistry,
    adc: AdcConfig,
    drive: DriveConfig,
    motion: MotionConfig,
    debouncer: Mutex<Debouncer>,
    actuator: Mutex<ActuatorState>,
    last_read: Mutex<Instant>,
}

impl Hal {
    /// Initialize `driver` and wrap it.
    ///
    /// # Errors
    /// `HalError::ConfigError` for an invalid pin map, or whatever the
    /// driver's `init()` reports.
    pub fn new(mut driver: Box<dyn HalDriver>, config: &StationConfig) -> Result<Self, HalError> {
        let io = config
            .io_registry()
            .map_err(|e| HalError::ConfigError(e.to_string()))?;
        driver.init(config)?;

        let driver_name = driver.name();
        info!(
            "HAL initialized with driver '{}' v{}",
            driver_name,
            driver.version()
        );

        Ok(Self {
            driver: Mutex::new(driver),
            driver_name,
            io,
            adc: config.adc.clone(),
            drive: config.drive.clone(),
            motion: config.motion.clone(),
            debouncer: Mutex::new(Debouncer::new()),
            actuator: Mutex::new(ActuatorState::default()),
            last_read: Mutex::new(Instant::now()),
        })
    }

    /// Create the driver named `name` from `registry` and initialize it.
    pub fn from_registry(
        registry: &DriverRegistry,
        name: &str,
        config: &StationConfig,
    ) -> Result<Self, HalError> {
        Self::new(registry.create_driver(name)?, config)
    }

    pub fn driver_name(&self) -> &'static str {
        self.driver_name
    }

    pub fn motion(&self) -> &MotionConfig {
        &self.motion
    }

    fn with_driver<T>(
        &self,
        f: impl FnOnce(&mut dyn HalDriver) -> Result<T, HalError>,
    ) -> Result<T, HalError> {
        let mut driver = self.driver.lock();
        f(driver.as_mut())
    }

    fn mark_read(&self) {
        *self.last_read.lock() = Instant::now();
    }

    /// Time since the last successful hardware read by any caller.
    pub fn since_last_read(&self) -> Duration {
        self.last_read.lock().elapsed()
    }

    // ─── Digital I/O ────────────────────────────────────────────────

    fn read_raw(&self, pin: u8) -> Result<bool, HalError> {
        let raw = self.with_driver(|d| d.read_input(pin))?;
        self.mark_read();
        Ok(raw)
    }

    /// Debounced logical level of an input (`true` = condition asserted).
    ///
    /// A level change costs one extra read after the pin's debounce window.
    pub fn read_digital(&self, role: InputRole) -> Result<bool, HalError> {
        let input = *self
            .io
            .input(role)
            .ok_or_else(|| HalError::ConfigError(format!("input {role} is not configured")))?;

        let level = input.logical(self.read_raw(input.pin)?);
        let observation = self.debouncer.lock().observe(role, level, input.debounce);
        match observation {
            Observation::Settled(level) => Ok(level),
            Observation::NeedsConfirm { stable, candidate } => {
                thread::sleep(input.debounce);
                let confirmed = input.logical(self.read_raw(input.pin)?);
                let accepted = self.debouncer.lock().confirm(role, candidate, confirmed);
                if accepted == stable {
                    debug!("{} glitch rejected", role);
                } else {
                    debug!("{} -> {}", role, accepted);
                }
                Ok(accepted)
            }
        }
    }

    /// Drive an output to a logical level.
    pub fn write_digital(&self, role: OutputRole, level: bool) -> Result<(), HalError> {
        let output = *self
            .io
            .output(role)
            .ok_or_else(|| HalError::ConfigError(format!("output {role} is not configured")))?;
        self.with_driver(|d| d.write_output(output.pin, output.physical(level)))
    }

    // ─── Pressure ───────────────────────────────────────────────────

    /// Current pressure in bar.
    ///
    /// # Errors
    /// `HalError::CommunicationError` when the read fails or the counts are
    /// outside the converter range.
    pub fn read_pressure(&self) -> Result<f64, HalError> {
        let counts = self.with_driver(|d| d.read_adc())?;
        if !self.adc.in_range(counts) {
            return Err(HalError::CommunicationError(format!(
                "ADC returned {counts} counts, outside converter range"
            )));
        }
        self.mark_read();
        Ok(self.adc.pressure(counts))
    }

    // ─── Drive ──────────────────────────────────────────────────────

    /// Set the compressor drive frequency. 0 Hz stops the drive.
    pub fn set_drive_frequency(&self, hz: f64) -> Result<(), HalError> {
        if !hz.is_finite() || !self.drive.accepts(hz) {
            return Err(HalError::InvalidCommand(format!(
                "drive frequency {hz} Hz outside 0 or {}..{} Hz",
                self.drive.min_hz, self.drive.max_hz
            )));
        }
        self.with_driver(|d| d.set_drive_frequency(hz))
    }

    /// Power the drive relay and start the drive.
    pub fn start_drive(&self) -> Result<(), HalError> {
        self.write_digital(OutputRole::DriveRelay, true)?;
        self.with_driver(|d| d.set_drive_running(true))
    }

    /// Stop the drive, zero its frequency and drop the relay. Every step is
    /// attempted; the first error is returned.
    pub fn stop_drive(&self) -> Result<(), HalError> {
        first_error([
            self.with_driver(|d| d.set_drive_running(false)),
            self.with_driver(|d| d.set_drive_frequency(0.0)),
            self.write_digital(OutputRole::DriveRelay, false),
        ])
    }

    /// Open or close the vent valve. No-op when no valve is configured.
    pub fn vent(&self, open: bool) -> Result<(), HalError> {
        if self.io.output(OutputRole::VentValve).is_none() {
            return Ok(());
        }
        self.write_digital(OutputRole::VentValve, open)
    }

    // ─── Actuator ───────────────────────────────────────────────────

    /// Tracked actuator position, `None` before the first homing.
    pub fn position_mm(&self) -> Option<f64> {
        self.actuator
            .lock()
            .steps_from_home
            .map(|s| self.motion.position_mm(s))
    }

    /// Stop pulse output and disable the stepper driver.
    pub fn stop_actuator(&self) -> Result<(), HalError> {
        first_error([
            self.with_driver(|d| d.stop_actuator()),
            self.write_digital(OutputRole::StepEnable, false),
        ])
    }

    /// Stop everything that moves or pressurizes. Every step is attempted
    /// even if an earlier one fails.
    pub fn emergency_stop(&self) -> Result<(), HalError> {
        let result = first_error([self.stop_actuator(), self.stop_drive()]);
        if let Err(ref e) = result {
            warn!("Emergency stop incomplete: {}", e);
        }
        result
    }

    /// Move the actuator and block until the move ends.
    ///
    /// Step bursts are issued once per `motion.poll_interval_ms`, so a
    /// cancel token is observed within one interval. On cancel, timeout or
    /// a limit switch the actuator is stopped before returning. A failed
    /// move is never retried here.
    ///
    /// # Errors
    /// `HalError::InvalidCommand` for a non-positive speed, a target outside
    /// the travel or a position move before homing. Driver errors are
    /// returned after a best-effort stop.
    pub fn move_actuator(
        &self,
        target: MoveTarget,
        speed_mm_s: f64,
        timeout: Duration,
        cancel: &[&CancelToken],
    ) -> Result<MoveOutcome, HalError> {
        if !speed_mm_s.is_finite() || speed_mm_s <= 0.0 {
            return Err(HalError::InvalidCommand(format!(
                "actuator speed {speed_mm_s} mm/s must be positive"
            )));
        }

        let target_steps = match target {
            MoveTarget::Home => None,
            MoveTarget::Position(mm) => {
                if !mm.is_finite()
                    || mm < self.motion.home_position_mm
                    || mm > self.motion.max_travel_mm
                {
                    return Err(HalError::InvalidCommand(format!(
                        "target {mm} mm outside travel {}..{} mm",
                        self.motion.home_position_mm, self.motion.max_travel_mm
                    )));
                }
                if self.actuator.lock().steps_from_home.is_none() {
                    return Err(HalError::InvalidCommand(
                        "actuator position unknown, home first".to_string(),
                    ));
                }
                Some(self.motion.steps_from_home(mm))
            }
        };

        debug!("Actuator move to {:?} at {} mm/s", target, speed_mm_s);
        let result = self.run_move(target_steps, speed_mm_s, timeout, cancel);
        if let Err(ref e) = result {
            warn!("Actuator move failed: {}", e);
            if let Err(stop) = self.stop_actuator() {
                warn!("Actuator stop after failed move incomplete: {}", stop);
            }
        }
        result
    }

    fn run_move(
        &self,
        target_steps: Option<i64>,
        speed_mm_s: f64,
        timeout: Duration,
        cancel: &[&CancelToken],
    ) -> Result<MoveOutcome, HalError> {
        let interval = self.motion.poll_interval();
        let rate_hz = (speed_mm_s * self.motion.steps_per_mm).min(self.motion.max_pulse_hz);
        let per_burst = ((rate_hz * interval.as_secs_f64()).floor() as i64).max(1);
        let tolerance = (self.motion.position_tolerance_mm * self.motion.steps_per_mm).floor() as i64;

        let started = Instant::now();
        let mut direction_set: Option<Direction> = None;
        self.write_digital(OutputRole::StepEnable, true)?;

        loop {
            let tick = Instant::now();

            if CancelToken::any(cancel) {
                self.stop_actuator()?;
                return Ok(MoveOutcome::Cancelled);
            }
            if started.elapsed() >= timeout {
                warn!("Actuator move timed out after {:?}", timeout);
                self.stop_actuator()?;
                return Ok(MoveOutcome::TimedOut);
            }

            let (direction, remaining) = match target_steps {
                None => {
                    if self.read_digital(InputRole::ActuatorMin)? {
                        self.actuator.lock().steps_from_home = Some(0);
                        return Ok(MoveOutcome::Reached);
                    }
                    (Direction::Retract, per_burst)
                }
                Some(target) => {
                    let current = self.actuator.lock().steps_from_home.unwrap_or(0);
                    let diff = target - current;
                    if diff.abs() <= tolerance {
                        return Ok(MoveOutcome::Reached);
                    }
                    let direction = if diff > 0 {
                        Direction::Extend
                    } else {
                        Direction::Retract
                    };
                    (direction, diff.abs())
                }
            };

            let limit = match direction {
                Direction::Extend => InputRole::ActuatorMax,
                Direction::Retract => InputRole::ActuatorMin,
            };
            if self.read_digital(limit)? {
                if direction == Direction::Retract {
                    self.actuator.lock().steps_from_home = Some(0);
                }
                warn!("Actuator stopped at {} limit switch", limit);
                self.stop_actuator()?;
                return Ok(MoveOutcome::LimitReached);
            }

            if direction_set != Some(direction) {
                self.write_digital(OutputRole::StepDirection, direction.level())?;
                direction_set = Some(direction);
            }

            let pulses = remaining.min(per_burst);
            // pulses <= per_burst, which is derived from a bounded rate
            let burst = u32::try_from(pulses).unwrap_or(u32::MAX);
            // re-checked under the driver lock: a stop issued after a cancel
            // is never followed by another burst
            let issued = self.with_driver(|d| {
                if CancelToken::any(cancel) {
                    return Ok(false);
                }
                d.step_burst(burst, rate_hz).map(|()| true)
            })?;
            if !issued {
                self.stop_actuator()?;
                return Ok(MoveOutcome::Cancelled);
            }
            if let Some(steps) = self.actuator.lock().steps_from_home.as_mut() {
                *steps += direction.sign() * pulses;
            }

            let elapsed = tick.elapsed();
            if elapsed < interval {
                thread::sleep(interval - elapsed);
            }
        }
    }

    /// Bring outputs to safe levels and shut the driver down.
    pub fn shutdown(&self) -> Result<(), HalError> {
        let stopped = self.emergency_stop();
        let vented = self.vent(false);
        let closed = self.with_driver(|d| d.shutdown());
        info!("HAL driver '{}' shut down", self.driver_name);
        first_error([stopped, vented, closed])
    }
}

fn first_error<const N: usize>(results: [Result<(), HalError>; N]) -> Result<(), HalError> {
    results.into_iter().find(|r| r.is_err()).unwrap_or(Ok(()))
}
