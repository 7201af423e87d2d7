//! Hardware access: driver trait, errors and hardware configuration.
//!
//! - [`driver`] - `HalDriver` trait, `HalError`, `DriverFactory`
//! - [`config`] - ADC, drive, motion and simulation parameters
//! - [`types`] - Motion commands and results

pub mod config;
pub mod driver;
pub mod types;
