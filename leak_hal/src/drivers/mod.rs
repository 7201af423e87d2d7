//! HAL driver implementations.
//!
//! - [`simulation`] - Software model of the station for development and testing
//!
//! # Adding New Drivers
//!
//! 1. Create a new submodule under `drivers/`
//! 2. Implement the `HalDriver` trait from `leak_common::hal::driver`
//! 3. Register the driver in [`register_all_drivers`]

pub mod simulation;

use crate::driver_registry::DriverRegistry;
use tracing::error;

/// Register every built-in driver.
pub fn register_all_drivers(registry: &mut DriverRegistry) {
    if let Err(e) = registry.register(simulation::DRIVER_NAME, simulation::create_driver) {
        error!("Failed to register simulation driver: {}", e);
    }
}
