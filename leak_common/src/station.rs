//! Station configuration.
//!
//! One TOML file describes the whole station. Every section has defaults
//! matching the reference machine, so only deviations need to be written.
//!
//! # TOML Example
//!
//! ```toml
//! [shared]
//! service_name = "leak-station-01"
//!
//! [timeouts]
//! home_s = 90.0
//!
//! [sequencer]
//! warning_policy = "pause"
//!
//! [[calibration]]
//! pressure = 1.0
//! frequency = 25.0
//!
//! [[calibration]]
//! pressure = 4.5
//! frequency = 50.0
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::calibration::{CalibrationPoint, FrequencyMap, default_table};
use crate::config::{ConfigError, ConfigLoader, SharedConfig, require_positive, secs};
use crate::consts::*;
use crate::hal::config::{AdcConfig, DriveConfig, MotionConfig, SimulationConfig};
use crate::io::config::IoConfig;
use crate::io::registry::IoRegistry;
use crate::params::ParameterLimits;
use crate::safety::SafetyConfig;

// ─── Timeouts ───────────────────────────────────────────────────────

/// Phase timeouts in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimeoutConfig {
    pub home_s: f64,
    pub move_s: f64,
    pub pressure_ramp_s: f64,
    pub vent_s: f64,
    /// Longest continuous pause under `WarningPolicy::Pause`.
    pub max_pause_s: f64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            home_s: HOME_TIMEOUT_S,
            move_s: MOVE_TIMEOUT_S,
            pressure_ramp_s: PRESSURE_RAMP_TIMEOUT_S,
            vent_s: VENT_TIMEOUT_S,
            max_pause_s: 60.0,
        }
    }
}

impl TimeoutConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("timeouts.home_s", self.home_s)?;
        require_positive("timeouts.move_s", self.move_s)?;
        require_positive("timeouts.pressure_ramp_s", self.pressure_ramp_s)?;
        require_positive("timeouts.vent_s", self.vent_s)?;
        require_positive("timeouts.max_pause_s", self.max_pause_s)
    }

    pub fn home(&self) -> Duration {
        secs(self.home_s)
    }

    pub fn movement(&self) -> Duration {
        secs(self.move_s)
    }

    pub fn pressure_ramp(&self) -> Duration {
        secs(self.pressure_ramp_s)
    }

    pub fn vent(&self) -> Duration {
        secs(self.vent_s)
    }

    pub fn max_pause(&self) -> Duration {
        secs(self.max_pause_s)
    }
}

// ─── Sequencer ──────────────────────────────────────────────────────

/// What the sequencer does while the safety state is `Warning`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningPolicy {
    /// Log the warning and keep running.
    #[default]
    Continue,
    /// Hold phase timers (and defer motion) until the warning clears,
    /// bounded by `timeouts.max_pause_s`.
    Pause,
}

/// Sequencer tolerances and pacing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SequencerConfig {
    /// Pressurizing completes once |p - target| is within this band.
    pub pressure_tolerance_bar: f64,
    /// Dwelling fails with `leak_detected` outside this band.
    pub dwell_tolerance_bar: f64,
    pub sample_rate_hz: f64,
    /// Venting completes at or below this pressure.
    pub vent_threshold_bar: f64,
    /// Poll period of pressure phases.
    pub poll_interval_ms: u64,
    pub warning_policy: WarningPolicy,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            pressure_tolerance_bar: 0.1,
            dwell_tolerance_bar: 0.2,
            sample_rate_hz: 10.0,
            vent_threshold_bar: 0.2,
            poll_interval_ms: 50,
            warning_policy: WarningPolicy::Continue,
        }
    }
}

impl SequencerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive(
            "sequencer.pressure_tolerance_bar",
            self.pressure_tolerance_bar,
        )?;
        require_positive("sequencer.dwell_tolerance_bar", self.dwell_tolerance_bar)?;
        require_positive("sequencer.sample_rate_hz", self.sample_rate_hz)?;
        require_positive("sequencer.vent_threshold_bar", self.vent_threshold_bar)?;
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "sequencer.poll_interval_ms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn sample_period(&self) -> Duration {
        secs(1.0 / self.sample_rate_hz)
    }
}

// ─── StationConfig ──────────────────────────────────────────────────

/// Complete station configuration.
///
/// Treated as an immutable snapshot: a run uses the configuration it was
/// started with; changes apply to the next start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StationConfig {
    pub shared: SharedConfig,
    pub limits: ParameterLimits,
    pub adc: AdcConfig,
    pub drive: DriveConfig,
    pub calibration: Vec<CalibrationPoint>,
    pub io: IoConfig,
    pub motion: MotionConfig,
    pub timeouts: TimeoutConfig,
    pub safety: SafetyConfig,
    pub sequencer: SequencerConfig,
    pub simulation: SimulationConfig,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            shared: SharedConfig::default(),
            limits: ParameterLimits::default(),
            adc: AdcConfig::default(),
            drive: DriveConfig::default(),
            calibration: default_table(),
            io: IoConfig::default(),
            motion: MotionConfig::default(),
            timeouts: TimeoutConfig::default(),
            safety: SafetyConfig::default(),
            sequencer: SequencerConfig::default(),
            simulation: SimulationConfig::default(),
        }
    }
}

impl StationConfig {
    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.limits.validate()?;
        self.adc.validate()?;
        self.drive.validate()?;
        let map = self.frequency_map()?;
        self.io_registry()?;
        self.motion.validate()?;
        self.timeouts.validate()?;
        self.safety.validate()?;
        self.sequencer.validate()?;
        self.simulation.validate()?;

        let top = map.points()[map.points().len() - 1].frequency;
        if !self.drive.accepts(top) || !self.drive.accepts(map.points()[0].frequency) {
            return Err(ConfigError::ValidationError(format!(
                "calibration frequencies must lie within drive range {}..{} Hz",
                self.drive.min_hz, self.drive.max_hz
            )));
        }
        if self.limits.max_pressure_bar >= self.safety.emergency_pressure_bar {
            return Err(ConfigError::ValidationError(
                "limits.max_pressure_bar must be below safety.emergency_pressure_bar".to_string(),
            ));
        }
        if self.limits.min_position_mm < self.motion.home_position_mm
            || self.limits.max_position_mm > self.motion.max_travel_mm
        {
            return Err(ConfigError::ValidationError(
                "position limits must lie within the actuator travel".to_string(),
            ));
        }
        Ok(())
    }

    /// Validated calibration table.
    pub fn frequency_map(&self) -> Result<FrequencyMap, ConfigError> {
        FrequencyMap::new(self.calibration.clone())
    }

    /// Validated I/O registry.
    pub fn io_registry(&self) -> Result<IoRegistry, ConfigError> {
        IoRegistry::from_config(&self.io)
    }
}

/// Load and validate a station configuration file.
pub fn load_station_config(path: &Path) -> Result<StationConfig, ConfigError> {
    let config = StationConfig::load(path)?;
    config.validate()?;
    info!(
        "Loaded station config '{}' from {:?} ({} calibration points)",
        config.shared.service_name,
        path,
        config.calibration.len()
    );
    Ok(config)
}
