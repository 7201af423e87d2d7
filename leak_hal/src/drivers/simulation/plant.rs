//! Simulated station plant.

use leak_common::calibration::FrequencyMap;
use leak_common::hal::config::{AdcConfig, MotionConfig, SimulationConfig};
use leak_common::hal::driver::HalError;
use leak_common::io::registry::IoRegistry;
use leak_common::io::role::{InputRole, OutputRole};
use leak_common::station::StationConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, HashSet};
use std::time::Instant;

/// Switch hysteresis around the travel ends.
const LIMIT_EPSILON_MM: f64 = 1e-3;

/// Command issued to the simulated hardware, in issue order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimCommand {
    Output { pin: u8, level: bool },
    DriveFrequency(f64),
    DriveRunning(bool),
    StepBurst { pulses: u32, extend: bool },
    StopActuator,
}

/// Plant state that exists only after `init()`.
struct Model {
    io: IoRegistry,
    motion: MotionConfig,
    adc: AdcConfig,
    map: FrequencyMap,
    sim: SimulationConfig,
    rng: StdRng,
    pins: HashMap<u8, bool>,
    position_mm: f64,
    drive_hz: f64,
    drive_running: bool,
    pressure_bar: f64,
    updated: Instant,
}

impl Model {
    fn output(&self, role: OutputRole) -> Option<bool> {
        let out = self.io.output(role)?;
        let level = self.pins.get(&out.pin).copied().unwrap_or(false);
        Some(out.logical(level))
    }

    fn compressing(&self) -> bool {
        self.drive_running
            && self.drive_hz > 0.0
            && self.output(OutputRole::DriveRelay).unwrap_or(false)
    }

    /// Integrate pressure up to `now`.
    fn advance(&mut self, now: Instant, ceiling: Option<f64>, leak_rate: f64) {
        let dt = now.saturating_duration_since(self.updated).as_secs_f64();
        self.updated = now;
        if dt <= 0.0 {
            return;
        }

        let vent = self.output(OutputRole::VentValve);
        if self.compressing() && vent != Some(true) {
            let mut target = self.map.pressure_for(self.drive_hz);
            if let Some(limit) = ceiling {
                target = target.min(limit);
            }
            let k = 1.0 - (-dt / self.sim.pressure_time_constant_s).exp();
            self.pressure_bar += (target - self.pressure_bar) * k;
        } else if vent != Some(false) {
            // valve open, or no valve: the volume bleeds through the compressor
            let k = 1.0 - (-dt / self.sim.vent_time_constant_s).exp();
            self.pressure_bar -= self.pressure_bar * k;
        }

        self.pressure_bar = (self.pressure_bar - leak_rate * dt).max(0.0);
    }

    fn logical_input(&self, role: InputRole, overrides: &HashMap<InputRole, bool>) -> bool {
        if let Some(&level) = overrides.get(&role) {
            return level;
        }
        match role {
            InputRole::DoorClosed => true,
            InputRole::EmergencyButton | InputRole::TankLow => false,
            InputRole::ActuatorMin => {
                self.position_mm <= self.motion.home_position_mm + LIMIT_EPSILON_MM
            }
            InputRole::ActuatorMax => {
                self.position_mm >= self.motion.max_travel_mm - LIMIT_EPSILON_MM
            }
        }
    }
}

/// Shared plant: model plus fault-injection state that survives `init()`.
#[derive(Default)]
pub(super) struct SimPlant {
    model: Option<Model>,
    pub(super) overrides: HashMap<InputRole, bool>,
    pub(super) glitches: HashMap<InputRole, u32>,
    pub(super) fail_reads: bool,
    pub(super) failing_inputs: HashSet<InputRole>,
    pub(super) jammed: bool,
    pub(super) ceiling: Option<f64>,
    pub(super) leak_rate: f64,
    pub(super) log: Vec<SimCommand>,
}

impl SimPlant {
    pub(super) fn init(&mut self, config: &StationConfig) -> Result<(), HalError> {
        let io = config
            .io_registry()
            .map_err(|e| HalError::InitFailed(e.to_string()))?;
        let map = config
            .frequency_map()
            .map_err(|e| HalError::InitFailed(e.to_string()))?;
        let sim = config.simulation.clone();
        let position_mm = sim
            .start_position_mm
            .clamp(config.motion.home_position_mm, config.motion.max_travel_mm);

        self.model = Some(Model {
            io,
            motion: config.motion.clone(),
            adc: config.adc.clone(),
            map,
            rng: StdRng::seed_from_u64(sim.seed),
            sim,
            pins: HashMap::new(),
            position_mm,
            drive_hz: 0.0,
            drive_running: false,
            pressure_bar: 0.0,
            updated: Instant::now(),
        });
        Ok(())
    }

    pub(super) fn shutdown(&mut self) {
        self.model = None;
    }

    fn model(&mut self) -> Result<&mut Model, HalError> {
        self.model.as_mut().ok_or(HalError::NotInitialized)
    }

    fn check_link(&self) -> Result<(), HalError> {
        if self.fail_reads {
            return Err(HalError::CommunicationError(
                "simulated bus timeout".to_string(),
            ));
        }
        Ok(())
    }

    pub(super) fn read_input(&mut self, pin: u8) -> Result<bool, HalError> {
        self.check_link()?;
        let overrides = std::mem::take(&mut self.overrides);
        let result = self.model().and_then(|m| {
            let input = *m
                .io
                .input_by_pin(pin)
                .ok_or_else(|| HalError::InvalidCommand(format!("pin {pin} is not an input")))?;
            let logical = m.logical_input(input.role, &overrides);
            Ok((input.role, input.raw_for(logical)))
        });
        self.overrides = overrides;

        let (role, raw) = result?;
        if self.failing_inputs.contains(&role) {
            return Err(HalError::CommunicationError(format!(
                "simulated open circuit on {role}"
            )));
        }
        match self.glitches.get_mut(&role) {
            Some(n) if *n > 0 => {
                *n -= 1;
                Ok(!raw)
            }
            _ => Ok(raw),
        }
    }

    pub(super) fn write_output(&mut self, pin: u8, level: bool) -> Result<(), HalError> {
        let now = Instant::now();
        let (ceiling, leak) = (self.ceiling, self.leak_rate);
        let m = self.model()?;
        if m.io.output_by_pin(pin).is_none() {
            return Err(HalError::InvalidCommand(format!(
                "pin {pin} is not an output"
            )));
        }
        m.advance(now, ceiling, leak);
        m.pins.insert(pin, level);
        self.log.push(SimCommand::Output { pin, level });
        Ok(())
    }

    pub(super) fn read_adc(&mut self) -> Result<i32, HalError> {
        self.check_link()?;
        let now = Instant::now();
        let (ceiling, leak) = (self.ceiling, self.leak_rate);
        let m = self.model()?;
        m.advance(now, ceiling, leak);

        let noise = if m.sim.noise_bar > 0.0 {
            let n = m.sim.noise_bar;
            m.rng.gen_range(-n..=n)
        } else {
            0.0
        };
        Ok(m.adc.counts_for(m.pressure_bar + noise))
    }

    pub(super) fn set_drive_frequency(&mut self, hz: f64) -> Result<(), HalError> {
        let now = Instant::now();
        let (ceiling, leak) = (self.ceiling, self.leak_rate);
        let m = self.model()?;
        m.advance(now, ceiling, leak);
        m.drive_hz = hz;
        self.log.push(SimCommand::DriveFrequency(hz));
        Ok(())
    }

    pub(super) fn set_drive_running(&mut self, running: bool) -> Result<(), HalError> {
        let now = Instant::now();
        let (ceiling, leak) = (self.ceiling, self.leak_rate);
        let m = self.model()?;
        m.advance(now, ceiling, leak);
        m.drive_running = running;
        self.log.push(SimCommand::DriveRunning(running));
        Ok(())
    }

    pub(super) fn step_burst(&mut self, pulses: u32) -> Result<(), HalError> {
        let jammed = self.jammed;
        let m = self.model()?;
        let extend = m.output(OutputRole::StepDirection).unwrap_or(false);
        let enabled = m.output(OutputRole::StepEnable).unwrap_or(false);

        if enabled && !jammed {
            let delta = f64::from(pulses) / m.motion.steps_per_mm;
            let moved = if extend {
                m.position_mm + delta
            } else {
                m.position_mm - delta
            };
            m.position_mm = moved.clamp(m.motion.home_position_mm, m.motion.max_travel_mm);
        }
        self.log.push(SimCommand::StepBurst { pulses, extend });
        Ok(())
    }

    pub(super) fn stop_actuator(&mut self) -> Result<(), HalError> {
        self.model()?;
        self.log.push(SimCommand::StopActuator);
        Ok(())
    }

    pub(super) fn set_pressure(&mut self, bar: f64) {
        if let Some(m) = self.model.as_mut() {
            m.updated = Instant::now();
            m.pressure_bar = bar.max(0.0);
        }
    }

    pub(super) fn pressure(&mut self) -> Option<f64> {
        let now = Instant::now();
        let (ceiling, leak) = (self.ceiling, self.leak_rate);
        let m = self.model.as_mut()?;
        m.advance(now, ceiling, leak);
        Some(m.pressure_bar)
    }

    pub(super) fn position_mm(&self) -> Option<f64> {
        self.model.as_ref().map(|m| m.position_mm)
    }

    pub(super) fn drive(&self) -> Option<(bool, f64)> {
        self.model.as_ref().map(|m| (m.compressing(), m.drive_hz))
    }
}
