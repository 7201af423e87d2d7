//! `HalDriver` implementation over the simulated plant.

use leak_common::hal::driver::{HalDriver, HalError};
use leak_common::io::role::InputRole;
use leak_common::station::StationConfig;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

use super::plant::{SimCommand, SimPlant};

/// Registry name of the simulation driver.
pub const DRIVER_NAME: &str = "simulation";

/// Simulation driver.
pub struct SimulationDriver {
    plant: Arc<Mutex<SimPlant>>,
}

impl SimulationDriver {
    pub fn new() -> Self {
        Self {
            plant: Arc::new(Mutex::new(SimPlant::default())),
        }
    }

    /// Handle for fault injection and inspection. Stays valid after the
    /// driver has been boxed and handed to the HAL.
    pub fn controls(&self) -> SimControls {
        SimControls {
            plant: Arc::clone(&self.plant),
        }
    }
}

impl Default for SimulationDriver {
    fn default() -> Self {
        Self::new()
    }
}

/// Factory for the driver registry.
pub fn create_driver() -> Box<dyn HalDriver> {
    Box::new(SimulationDriver::new())
}

impl HalDriver for SimulationDriver {
    fn name(&self) -> &'static str {
        DRIVER_NAME
    }

    fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    fn init(&mut self, config: &StationConfig) -> Result<(), HalError> {
        self.plant.lock().init(config)?;
        info!(
            "Simulation plant ready: actuator at {} mm, tau={}s, noise=±{} bar",
            config.simulation.start_position_mm,
            config.simulation.pressure_time_constant_s,
            config.simulation.noise_bar
        );
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), HalError> {
        self.plant.lock().shutdown();
        debug!("Simulation plant shut down");
        Ok(())
    }

    fn read_input(&mut self, pin: u8) -> Result<bool, HalError> {
        self.plant.lock().read_input(pin)
    }

    fn write_output(&mut self, pin: u8, level: bool) -> Result<(), HalError> {
        self.plant.lock().write_output(pin, level)
    }

    fn read_adc(&mut self) -> Result<i32, HalError> {
        self.plant.lock().read_adc()
    }

    fn set_drive_frequency(&mut self, hz: f64) -> Result<(), HalError> {
        self.plant.lock().set_drive_frequency(hz)
    }

    fn set_drive_running(&mut self, running: bool) -> Result<(), HalError> {
        self.plant.lock().set_drive_running(running)
    }

    fn step_burst(&mut self, pulses: u32, _rate_hz: f64) -> Result<(), HalError> {
        self.plant.lock().step_burst(pulses)
    }

    fn stop_actuator(&mut self) -> Result<(), HalError> {
        self.plant.lock().stop_actuator()
    }
}

/// Test and operator-console handle to the simulated plant.
#[derive(Clone)]
pub struct SimControls {
    plant: Arc<Mutex<SimPlant>>,
}

impl SimControls {
    /// Force the logical level of an input.
    pub fn set_input(&self, role: InputRole, level: bool) {
        self.plant.lock().overrides.insert(role, level);
    }

    /// Return an input to its modelled level.
    pub fn clear_input(&self, role: InputRole) {
        self.plant.lock().overrides.remove(&role);
    }

    pub fn press_emergency_button(&self) {
        self.set_input(InputRole::EmergencyButton, true);
    }

    pub fn release_emergency_button(&self) {
        self.clear_input(InputRole::EmergencyButton);
    }

    pub fn open_door(&self) {
        self.set_input(InputRole::DoorClosed, false);
    }

    pub fn close_door(&self) {
        self.clear_input(InputRole::DoorClosed);
    }

    pub fn set_tank_low(&self, low: bool) {
        self.set_input(InputRole::TankLow, low);
    }

    /// Invert the raw level of the next `reads` reads of an input.
    pub fn glitch_input(&self, role: InputRole, reads: u32) {
        self.plant.lock().glitches.insert(role, reads);
    }

    /// Make every input and ADC read fail.
    pub fn set_read_failure(&self, failing: bool) {
        self.plant.lock().fail_reads = failing;
    }

    /// Make reads of a single input fail while the rest of the bus works.
    pub fn fail_input(&self, role: InputRole, failing: bool) {
        let mut plant = self.plant.lock();
        if failing {
            plant.failing_inputs.insert(role);
        } else {
            plant.failing_inputs.remove(&role);
        }
    }

    /// Stop step pulses from moving the actuator.
    pub fn jam_actuator(&self, jammed: bool) {
        self.plant.lock().jammed = jammed;
    }

    /// Cap the pressure the compressor can build.
    pub fn set_pressure_ceiling(&self, bar: Option<f64>) {
        self.plant.lock().ceiling = bar;
    }

    /// Constant pressure loss in bar/s.
    pub fn set_leak_rate(&self, bar_per_s: f64) {
        self.plant.lock().leak_rate = bar_per_s.max(0.0);
    }

    /// Overwrite the plant pressure.
    pub fn set_pressure(&self, bar: f64) {
        self.plant.lock().set_pressure(bar);
    }

    /// True plant pressure, without measurement noise.
    pub fn pressure(&self) -> Option<f64> {
        self.plant.lock().pressure()
    }

    /// True actuator position.
    pub fn position_mm(&self) -> Option<f64> {
        self.plant.lock().position_mm()
    }

    /// Whether the compressor is running, and its frequency.
    pub fn drive(&self) -> Option<(bool, f64)> {
        self.plant.lock().drive()
    }

    /// Every command issued so far.
    pub fn commands(&self) -> Vec<SimCommand> {
        self.plant.lock().log.clone()
    }

    pub fn clear_commands(&self) {
        self.plant.lock().log.clear();
    }
}
