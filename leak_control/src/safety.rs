//! Safety monitoring.
//!
//! - [`classify`] - Pure snapshot → assessment rules
//! - [`cell`] - Shared, atomically published safety state
//! - [`monitor`] - Fixed-cadence monitor thread with hardware watchdog

pub mod cell;
pub mod classify;
pub mod monitor;

pub use cell::SafetyCell;
pub use classify::{Assessment, SafetySnapshot, classify};
pub use monitor::{MonitorHandle, MonitorStats, SafetyMonitor};
