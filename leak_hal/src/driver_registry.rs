//! Name → factory lookup for station drivers.
//!
//! Filled once at startup and handed to
//! [`Hal::from_registry`](crate::Hal::from_registry) or the station
//! constructor. The CLI selects a driver by its registered name.

use leak_common::hal::driver::{DriverFactory, HalDriver, HalError};
use std::collections::BTreeMap;

#[derive(Default)]
pub struct DriverRegistry {
    factories: BTreeMap<&'static str, DriverFactory>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every driver compiled into this crate.
    pub fn with_builtin_drivers() -> Self {
        let mut registry = Self::new();
        crate::drivers::register_all_drivers(&mut registry);
        registry
    }

    /// Add `factory` under `name`.
    ///
    /// # Errors
    /// `HalError::ConfigError` when `name` is taken.
    pub fn register(&mut self, name: &'static str, factory: DriverFactory) -> Result<(), HalError> {
        if self.contains(name) {
            return Err(HalError::ConfigError(format!(
                "driver '{name}' is already registered"
            )));
        }
        self.factories.insert(name, factory);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Build a fresh, uninitialized driver.
    ///
    /// # Errors
    /// `HalError::DriverNotFound` for an unknown name.
    pub fn create_driver(&self, name: &str) -> Result<Box<dyn HalDriver>, HalError> {
        match self.factories.get(name) {
            Some(factory) => Ok(factory()),
            None => Err(HalError::DriverNotFound(name.to_string())),
        }
    }

    /// Registered names in lexical order.
    pub fn list_drivers(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }
}
