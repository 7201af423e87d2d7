//! Station safety state and thresholds.
//!
//! ```text
//! Normal ⇄ Warning(reason)
//!    │          │
//!    └────┬─────┘
//!         ▼
//!   Emergency{reason, triggered_at}  ── reset (cooldown, condition clear) ──▶ Normal
//! ```
//!
//! Warnings are re-evaluated on every monitor tick. Emergency is latched.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::config::{ConfigError, require_positive, secs};
use crate::consts::*;
use crate::io::role::InputRole;

/// Cause of an emergency stop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EmergencyReason {
    EmergencyButton,
    DoorOpenDuringRun,
    Overpressure { bar: f64 },
    /// Both actuator limit switches asserted at once.
    LimitSwitchFault,
    /// No successful hardware read within the watchdog timeout.
    HardwareUnresponsive,
    /// A safety input failed every read for the watchdog timeout while the
    /// rest of the bus answered.
    InputUnreadable { role: InputRole },
}

impl fmt::Display for EmergencyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmergencyButton => f.write_str("emergency button pressed"),
            Self::DoorOpenDuringRun => f.write_str("door opened during run"),
            Self::Overpressure { bar } => write!(f, "overpressure {bar:.2} bar"),
            Self::LimitSwitchFault => f.write_str("both actuator limit switches active"),
            Self::HardwareUnresponsive => f.write_str("hardware unresponsive"),
            Self::InputUnreadable { role } => write!(f, "{role} unreadable"),
        }
    }
}

/// Cause of a warning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WarningReason {
    TankLow,
    PressureHigh { bar: f64 },
    /// Door open with no run active. Blocks start.
    DoorOpen,
}

impl fmt::Display for WarningReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TankLow => f.write_str("tank level low"),
            Self::PressureHigh { bar } => write!(f, "pressure high {bar:.2} bar"),
            Self::DoorOpen => f.write_str("door open"),
        }
    }
}

/// Published safety state. Exactly one value is active at any instant.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SafetyState {
    #[default]
    Normal,
    Warning { reason: WarningReason },
    Emergency {
        reason: EmergencyReason,
        /// Wall clock, microseconds since the Unix epoch.
        triggered_at_us: u64,
    },
}

impl SafetyState {
    pub fn is_normal(&self) -> bool {
        matches!(self, Self::Normal)
    }

    pub fn is_emergency(&self) -> bool {
        matches!(self, Self::Emergency { .. })
    }

    pub fn emergency_reason(&self) -> Option<EmergencyReason> {
        match self {
            Self::Emergency { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    pub fn warning_reason(&self) -> Option<WarningReason> {
        match self {
            Self::Warning { reason } => Some(*reason),
            _ => None,
        }
    }
}

impl fmt::Display for SafetyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => f.write_str("normal"),
            Self::Warning { reason } => write!(f, "warning: {reason}"),
            Self::Emergency { reason, .. } => write!(f, "EMERGENCY: {reason}"),
        }
    }
}

/// Safety monitor parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SafetyConfig {
    /// Monitor tick period.
    pub cadence_ms: u64,
    pub emergency_pressure_bar: f64,
    pub warning_pressure_bar: f64,
    /// Minimum time between an emergency and an accepted reset.
    pub cooldown_s: f64,
    /// Maximum age of the last successful hardware read.
    pub watchdog_timeout_s: f64,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            cadence_ms: MONITOR_CADENCE_MS,
            emergency_pressure_bar: EMERGENCY_PRESSURE_BAR,
            warning_pressure_bar: WARNING_PRESSURE_BAR,
            cooldown_s: EMERGENCY_COOLDOWN_S,
            watchdog_timeout_s: WATCHDOG_TIMEOUT_S,
        }
    }
}

impl SafetyConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cadence_ms == 0 {
            return Err(ConfigError::ValidationError(
                "safety.cadence_ms must be at least 1".to_string(),
            ));
        }
        require_positive("safety.emergency_pressure_bar", self.emergency_pressure_bar)?;
        require_positive("safety.warning_pressure_bar", self.warning_pressure_bar)?;
        if self.warning_pressure_bar >= self.emergency_pressure_bar {
            return Err(ConfigError::ValidationError(
                "safety.warning_pressure_bar must be below safety.emergency_pressure_bar"
                    .to_string(),
            ));
        }
        if !self.cooldown_s.is_finite() || self.cooldown_s < 0.0 {
            return Err(ConfigError::ValidationError(
                "safety.cooldown_s must be >= 0".to_string(),
            ));
        }
        require_positive("safety.watchdog_timeout_s", self.watchdog_timeout_s)
    }

    pub fn cadence(&self) -> Duration {
        Duration::from_millis(self.cadence_ms)
    }

    pub fn cooldown(&self) -> Duration {
        secs(self.cooldown_s)
    }

    pub fn watchdog_timeout(&self) -> Duration {
        secs(self.watchdog_timeout_s)
    }
}
