//! Prelude module for common re-exports.
//!
//! ```rust
//! use leak_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, SharedConfig};
pub use crate::station::{
    SequencerConfig, StationConfig, TimeoutConfig, WarningPolicy, load_station_config,
};

// ─── Calibration ────────────────────────────────────────────────────
pub use crate::calibration::{CalibrationPoint, FrequencyMap};

// ─── Hardware ───────────────────────────────────────────────────────
pub use crate::hal::driver::{DriverFactory, HalDriver, HalError};
pub use crate::hal::types::{Direction, MoveOutcome, MoveTarget};

// ─── I/O ────────────────────────────────────────────────────────────
pub use crate::io::registry::{DigitalInput, DigitalOutput, IoRegistry};
pub use crate::io::role::{DiLogic, InputRole, OutputRole};

// ─── Test runs ──────────────────────────────────────────────────────
pub use crate::params::{ParameterError, ParameterLimits, TestParameters};
pub use crate::run::{
    AbortReason, FailReason, Outcome, Phase, PressureStats, RunEvent, RunFaults, RunStatistics,
    Sample, TestRun,
};

// ─── Safety ─────────────────────────────────────────────────────────
pub use crate::safety::{EmergencyReason, SafetyConfig, SafetyState, WarningReason};
