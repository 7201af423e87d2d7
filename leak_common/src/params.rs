//! Validated test parameters.
//!
//! [`TestParameters`] can only be built through [`TestParameters::new`],
//! so every value that reaches the sequencer has passed range checks.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::config::{ConfigError, require_finite, secs};

/// Rejected test parameter.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParameterError {
    #[error("{field} = {value} is outside [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("{field} is not a finite number")]
    NotFinite { field: &'static str },
}

/// Closed ranges accepted for operator input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParameterLimits {
    pub min_position_mm: f64,
    pub max_position_mm: f64,
    pub min_pressure_bar: f64,
    pub max_pressure_bar: f64,
    pub min_inspection_min: f64,
    pub max_inspection_min: f64,
}

impl Default for ParameterLimits {
    fn default() -> Self {
        Self {
            min_position_mm: 65.0,
            max_position_mm: 200.0,
            min_pressure_bar: 0.0,
            max_pressure_bar: 4.5,
            min_inspection_min: 0.0,
            max_inspection_min: 120.0,
        }
    }
}

impl ParameterLimits {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ranges = [
            ("limits.position", self.min_position_mm, self.max_position_mm),
            ("limits.pressure", self.min_pressure_bar, self.max_pressure_bar),
            (
                "limits.inspection",
                self.min_inspection_min,
                self.max_inspection_min,
            ),
        ];
        for (name, min, max) in ranges {
            require_finite(name, min)?;
            require_finite(name, max)?;
            if min > max {
                return Err(ConfigError::ValidationError(format!(
                    "{name}: minimum {min} exceeds maximum {max}"
                )));
            }
        }
        if self.min_inspection_min < 0.0 {
            return Err(ConfigError::ValidationError(
                "limits.inspection cannot be negative".to_string(),
            ));
        }
        Ok(())
    }
}

fn check(field: &'static str, value: f64, min: f64, max: f64) -> Result<f64, ParameterError> {
    if !value.is_finite() {
        return Err(ParameterError::NotFinite { field });
    }
    if value < min || value > max {
        return Err(ParameterError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(value)
}

/// Operator request for one test run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestParameters {
    target_position_mm: f64,
    target_pressure_bar: f64,
    inspection_time_min: f64,
}

impl TestParameters {
    /// Validate operator input against `limits`.
    pub fn new(
        target_position_mm: f64,
        target_pressure_bar: f64,
        inspection_time_min: f64,
        limits: &ParameterLimits,
    ) -> Result<Self, ParameterError> {
        Ok(Self {
            target_position_mm: check(
                "target_position_mm",
                target_position_mm,
                limits.min_position_mm,
                limits.max_position_mm,
            )?,
            target_pressure_bar: check(
                "target_pressure_bar",
                target_pressure_bar,
                limits.min_pressure_bar,
                limits.max_pressure_bar,
            )?,
            inspection_time_min: check(
                "inspection_time_min",
                inspection_time_min,
                limits.min_inspection_min,
                limits.max_inspection_min,
            )?,
        })
    }

    pub fn target_position_mm(&self) -> f64 {
        self.target_position_mm
    }

    pub fn target_pressure_bar(&self) -> f64 {
        self.target_pressure_bar
    }

    pub fn inspection_time_min(&self) -> f64 {
        self.inspection_time_min
    }

    pub fn inspection_time(&self) -> Duration {
        secs(self.inspection_time_min * 60.0)
    }
}
