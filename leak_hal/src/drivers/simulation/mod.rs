//! Simulation driver.
//!
//! Models the station plant in software: stepper actuator with both limit
//! switches, first-order pressure response to the drive frequency, vent
//! valve and operator inputs. [`SimControls`] injects faults and exposes a
//! log of every command the HAL issued.

mod driver;
mod plant;

pub use driver::{DRIVER_NAME, SimControls, SimulationDriver, create_driver};
pub use plant::SimCommand;
