//! The seam between the HAL core and a hardware backend.

use thiserror::Error;

use crate::station::StationConfig;

/// Failure of a hardware operation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HalError {
    /// Driver initialization failed
    #[error("Initialization failed: {0}")]
    InitFailed(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Hardware communication error. Never replaced by a default value.
    #[error("Hardware communication error: {0}")]
    CommunicationError(String),

    /// Command outside the hardware's accepted range
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    /// Driver not found
    #[error("Driver not found: {0}")]
    DriverNotFound(String),

    /// Driver used before `init()`
    #[error("Driver not initialized")]
    NotInitialized,
}

/// Builds an uninitialized driver; stored in the HAL's driver registry.
pub type DriverFactory = fn() -> Box<dyn HalDriver>;

/// Interface of a hardware backend.
///
/// Drivers speak in pins, raw ADC counts and step pulses. Role mapping,
/// inversion, debounce, unit conversion and motion control live in the HAL
/// core, so a physical backend and the simulation are interchangeable.
///
/// # Lifecycle
///
/// 1. `init()` - Called once with the station configuration
/// 2. I/O calls - Any number, serialized by the HAL core
/// 3. `shutdown()` - Called when the HAL core stops
///
/// Every I/O call is bounded in time. A failed transaction returns
/// `HalError::CommunicationError`; the caller decides what to do with it.
pub trait HalDriver: Send + Sync {
    /// Returns the driver's unique identifier (e.g. "simulation").
    fn name(&self) -> &'static str;

    fn version(&self) -> &'static str;

    /// Initialize the driver with the station configuration.
    ///
    /// # Errors
    /// Return `HalError::InitFailed` if initialization cannot complete.
    fn init(&mut self, config: &StationConfig) -> Result<(), HalError>;

    /// Graceful shutdown: outputs to safe levels, release resources.
    fn shutdown(&mut self) -> Result<(), HalError>;

    /// Raw level of a digital input pin.
    fn read_input(&mut self, pin: u8) -> Result<bool, HalError>;

    /// Drive a digital output pin to a raw level.
    fn write_output(&mut self, pin: u8, level: bool) -> Result<(), HalError>;

    /// Raw counts of the pressure ADC channel.
    fn read_adc(&mut self) -> Result<i32, HalError>;

    /// Set the compressor drive frequency in Hz (0 = stop).
    fn set_drive_frequency(&mut self, hz: f64) -> Result<(), HalError>;

    /// Start or stop the compressor drive.
    fn set_drive_running(&mut self, running: bool) -> Result<(), HalError>;

    /// Emit `pulses` step pulses at `rate_hz` on the step line. Direction
    /// and enable lines are set by the caller beforehand.
    fn step_burst(&mut self, pulses: u32, rate_hz: f64) -> Result<(), HalError>;

    /// Abort any pulse output in progress.
    fn stop_actuator(&mut self) -> Result<(), HalError>;
}
