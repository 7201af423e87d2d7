//! Leak Station Common Library
//!
//! Shared types, constants and configuration loading for the leak test
//! station workspace crates.
//!
//! # Module Structure
//!
//! - [`config`] - Configuration loading traits and types
//! - [`station`] - Top-level station configuration (`StationConfig`)
//! - [`calibration`] - Pressure → drive frequency calibration table
//! - [`hal`] - Hardware access driver trait, errors and hardware config
//! - [`io`] - I/O roles, pin configuration and registry
//! - [`params`] - Validated test parameters
//! - [`run`] - Test run record: phases, outcomes, samples, events
//! - [`safety`] - Safety state and thresholds
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use leak_common::prelude::*;
//!
//! let config = StationConfig::default();
//! assert!(config.validate().is_ok());
//! ```

pub mod calibration;
pub mod config;
pub mod consts;
pub mod hal;
pub mod io;
pub mod params;
pub mod prelude;
pub mod run;
pub mod safety;
pub mod station;
