//! TOML configuration for the station.
//!
//! Every section is a serde struct with defaults, so an empty file yields
//! the reference machine. Any `DeserializeOwned` type can be read with
//! [`ConfigLoader`]; semantic checks live in each section's `validate()`.
//!
//! ```rust,no_run
//! use leak_common::config::{ConfigError, ConfigLoader};
//! use leak_common::station::StationConfig;
//! use std::path::Path;
//!
//! fn read(path: &Path) -> Result<StationConfig, ConfigError> {
//!     let config = StationConfig::load(path)?;
//!     config.validate()?;
//!     Ok(config)
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::consts::DEFAULT_SERVICE_NAME;

/// Why a configuration could not be used.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Values parsed but are out of range or inconsistent.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Default verbosity; `RUST_LOG` overrides it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub fn as_directive(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// `[shared]` section.
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "leak-station-01"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SharedConfig {
    #[serde(default)]
    pub log_level: LogLevel,

    /// Station instance identifier.
    pub service_name: String,
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            service_name: DEFAULT_SERVICE_NAME.to_string(),
        }
    }
}

impl SharedConfig {
    /// `service_name` must not be blank.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "shared.service_name is blank".to_string(),
            ));
        }
        Ok(())
    }
}

/// TOML reader, implemented for every `DeserializeOwned` type.
///
/// A missing file is `FileNotFound`; unreadable files, bad syntax and wrong
/// types are all `ParseError`. No validation happens here (see
/// [`crate::station::load_station_config`]).
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ConfigError::FileNotFound),
            Err(e) => Err(ConfigError::ParseError(e.to_string())),
        }
    }

    /// Parse configuration from an in-memory TOML document.
    fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

// ─── Validation helpers ─────────────────────────────────────────────

/// Reject non-finite or non-positive values.
pub(crate) fn require_positive(name: &str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ConfigError::ValidationError(format!(
            "{name} must be a positive number, got {value}"
        )));
    }
    Ok(())
}

/// Reject non-finite values.
pub(crate) fn require_finite(name: &str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::ValidationError(format!(
            "{name} must be finite, got {value}"
        )));
    }
    Ok(())
}

/// Convert a validated seconds value to a `Duration`.
///
/// Invalid input maps to zero; configuration validation rejects such values
/// before they reach this point.
pub(crate) fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}
