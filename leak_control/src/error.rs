//! Control-level error types.

use leak_common::config::ConfigError;
use leak_common::hal::driver::HalError;
use leak_common::params::ParameterError;
use leak_common::safety::{EmergencyReason, SafetyState};
use std::time::Duration;
use thiserror::Error;

/// Start request rejected. No hardware command has been issued.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StartError {
    #[error("a test run is already active")]
    RunActive,

    #[error("safety state is not normal ({0})")]
    SafetyNotNormal(SafetyState),

    #[error("invalid test parameters: {0}")]
    InvalidParameters(#[from] ParameterError),

    #[error("failed to spawn sequencer thread: {0}")]
    Spawn(String),
}

/// Emergency reset rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResetError {
    #[error("safety state is not emergency")]
    NotInEmergency,

    #[error("cooldown pending, {remaining:?} left")]
    CooldownPending { remaining: Duration },

    #[error("emergency condition still active: {0}")]
    ConditionActive(EmergencyReason),
}

/// Station construction or shutdown failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StationError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Hal(#[from] HalError),

    #[error("failed to spawn safety monitor: {0}")]
    Spawn(String),
}
