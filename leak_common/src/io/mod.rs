//! Station I/O: functional roles, pin configuration and the registry that
//! turns configuration into per-pin value types.
//!
//! Callers outside the HAL never see physical pins or raw levels; they ask
//! for a role and get the logical level (`true` = condition asserted).

pub mod config;
pub mod registry;
pub mod role;
