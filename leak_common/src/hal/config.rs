//! Hardware parameters: pressure ADC, drive, actuator motion, simulation.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::{ConfigError, require_finite, require_positive};
use crate::consts::*;

// ─── ADC ────────────────────────────────────────────────────────────

/// Pressure channel conversion: counts → volts → bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdcConfig {
    pub full_scale_counts: f64,
    pub full_scale_volts: f64,
    /// Sensor slope, bar per volt.
    pub multiplier: f64,
    /// Sensor offset in bar, including installation adjustment.
    pub offset_bar: f64,
}

impl Default for AdcConfig {
    fn default() -> Self {
        Self {
            full_scale_counts: ADC_FULL_SCALE_COUNTS,
            full_scale_volts: ADC_FULL_SCALE_VOLTS,
            multiplier: PRESSURE_MULTIPLIER,
            offset_bar: PRESSURE_OFFSET_BAR,
        }
    }
}

impl AdcConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("adc.full_scale_counts", self.full_scale_counts)?;
        require_positive("adc.full_scale_volts", self.full_scale_volts)?;
        require_positive("adc.multiplier", self.multiplier)?;
        require_finite("adc.offset_bar", self.offset_bar)
    }

    /// Input voltage for raw counts.
    pub fn volts(&self, counts: i32) -> f64 {
        f64::from(counts) / self.full_scale_counts * self.full_scale_volts
    }

    /// Whether raw counts lie inside the converter range. Anything else
    /// indicates a broken read, not a pressure.
    pub fn in_range(&self, counts: i32) -> bool {
        let c = f64::from(counts);
        c >= -(self.full_scale_counts + 1.0) && c <= self.full_scale_counts
    }

    /// Pressure in bar for raw counts, floored at zero.
    pub fn pressure(&self, counts: i32) -> f64 {
        (self.volts(counts) * self.multiplier + self.offset_bar).max(0.0)
    }

    /// Raw counts a sensor produces at `pressure_bar` (saturating).
    pub fn counts_for(&self, pressure_bar: f64) -> i32 {
        let volts = (pressure_bar - self.offset_bar) / self.multiplier;
        let counts = (volts / self.full_scale_volts * self.full_scale_counts).round();
        counts.clamp(0.0, self.full_scale_counts) as i32
    }
}

// ─── Drive ──────────────────────────────────────────────────────────

/// Frequency range of the compressor drive. 0 Hz always means stop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DriveConfig {
    pub min_hz: f64,
    pub max_hz: f64,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            min_hz: DRIVE_MIN_HZ,
            max_hz: DRIVE_MAX_HZ,
        }
    }
}

impl DriveConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("drive.min_hz", self.min_hz)?;
        require_positive("drive.max_hz", self.max_hz)?;
        if self.max_hz <= self.min_hz {
            return Err(ConfigError::ValidationError(
                "drive.max_hz must exceed drive.min_hz".to_string(),
            ));
        }
        Ok(())
    }

    pub fn accepts(&self, hz: f64) -> bool {
        hz == 0.0 || (hz >= self.min_hz && hz <= self.max_hz)
    }
}

// ─── Motion ─────────────────────────────────────────────────────────

/// Stepper actuator geometry and motion limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MotionConfig {
    pub steps_per_mm: f64,
    /// Position at the home switch.
    pub home_position_mm: f64,
    /// Position of the far limit switch.
    pub max_travel_mm: f64,
    /// Positioning speed.
    pub speed_mm_s: f64,
    /// Homing and return speed.
    pub homing_speed_mm_s: f64,
    pub max_pulse_hz: f64,
    /// Interval between step bursts, also the cancellation latency bound.
    pub poll_interval_ms: u64,
    pub position_tolerance_mm: f64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            steps_per_mm: STEPS_PER_MM,
            home_position_mm: HOME_POSITION_MM,
            max_travel_mm: MAX_TRAVEL_MM,
            speed_mm_s: 10.0,
            homing_speed_mm_s: 10.0,
            max_pulse_hz: MAX_PULSE_HZ,
            poll_interval_ms: 20,
            position_tolerance_mm: 0.1,
        }
    }
}

impl MotionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("motion.steps_per_mm", self.steps_per_mm)?;
        require_finite("motion.home_position_mm", self.home_position_mm)?;
        require_positive("motion.speed_mm_s", self.speed_mm_s)?;
        require_positive("motion.homing_speed_mm_s", self.homing_speed_mm_s)?;
        require_positive("motion.max_pulse_hz", self.max_pulse_hz)?;
        require_positive("motion.position_tolerance_mm", self.position_tolerance_mm)?;
        if !self.max_travel_mm.is_finite() || self.max_travel_mm <= self.home_position_mm {
            return Err(ConfigError::ValidationError(
                "motion.max_travel_mm must lie beyond motion.home_position_mm".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "motion.poll_interval_ms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Step count from home for an absolute position.
    pub fn steps_from_home(&self, position_mm: f64) -> i64 {
        ((position_mm - self.home_position_mm) * self.steps_per_mm).round() as i64
    }

    /// Absolute position for a step count from home.
    pub fn position_mm(&self, steps_from_home: i64) -> f64 {
        self.home_position_mm + steps_from_home as f64 / self.steps_per_mm
    }
}

// ─── Simulation ─────────────────────────────────────────────────────

/// Plant model for the simulation driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// First-order lag of the pressure response to the drive.
    pub pressure_time_constant_s: f64,
    /// Lag of the pressure decay with the drive stopped.
    pub vent_time_constant_s: f64,
    /// Peak amplitude of uniform pressure noise.
    pub noise_bar: f64,
    /// Seed for the noise generator.
    pub seed: u64,
    /// Actuator position at startup.
    pub start_position_mm: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            pressure_time_constant_s: 1.0,
            vent_time_constant_s: 0.5,
            noise_bar: 0.05,
            seed: 7,
            start_position_mm: HOME_POSITION_MM,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive(
            "simulation.pressure_time_constant_s",
            self.pressure_time_constant_s,
        )?;
        require_positive("simulation.vent_time_constant_s", self.vent_time_constant_s)?;
        require_finite("simulation.start_position_mm", self.start_position_mm)?;
        if !self.noise_bar.is_finite() || self.noise_bar < 0.0 {
            return Err(ConfigError::ValidationError(
                "simulation.noise_bar must be >= 0".to_string(),
            ));
        }
        Ok(())
    }
}
