//! Leak Station Hardware Access Layer
//!
//! The [`Hal`] owns the active [`HalDriver`](leak_common::hal::driver::HalDriver)
//! and is the only path to hardware. It maps roles to pins, applies NC
//! inversion and debounce, converts ADC counts to bar, validates drive
//! commands and runs blocking, cancellable actuator moves.
//!
//! Drivers are created through a [`DriverRegistry`]; the built-in
//! `simulation` driver models the station for development and tests.

pub mod cancel;
pub mod core;
pub mod debounce;
pub mod driver_registry;
pub mod drivers;

pub use crate::cancel::CancelToken;
pub use crate::core::Hal;
pub use crate::driver_registry::DriverRegistry;
