//! I/O registry: resolves roles to immutable pin value types.
//!
//! Built once from [`IoConfig`] at startup. Duplicate roles, duplicate pins
//! and missing required roles are configuration errors.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use crate::config::ConfigError;
use crate::io::config::IoConfig;
use crate::io::role::{InputRole, OutputRole};

/// A configured digital input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigitalInput {
    pub role: InputRole,
    pub pin: u8,
    pub invert: bool,
    pub debounce: Duration,
}

impl DigitalInput {
    /// Logical level for a raw pin level.
    #[inline]
    pub const fn logical(&self, raw: bool) -> bool {
        raw ^ self.invert
    }

    /// Raw pin level that produces a logical level.
    #[inline]
    pub const fn raw_for(&self, logical: bool) -> bool {
        logical ^ self.invert
    }
}

/// A configured digital output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigitalOutput {
    pub role: OutputRole,
    pub pin: u8,
    pub invert: bool,
}

impl DigitalOutput {
    /// Pin level driving a logical level.
    #[inline]
    pub const fn physical(&self, logical: bool) -> bool {
        logical ^ self.invert
    }

    /// Logical level for a pin level.
    #[inline]
    pub const fn logical(&self, physical: bool) -> bool {
        physical ^ self.invert
    }
}

/// Role → pin lookup for the whole station.
#[derive(Debug, Clone)]
pub struct IoRegistry {
    inputs: HashMap<InputRole, DigitalInput>,
    outputs: HashMap<OutputRole, DigitalOutput>,
}

impl IoRegistry {
    /// Build the registry from configuration.
    pub fn from_config(config: &IoConfig) -> Result<Self, ConfigError> {
        let mut pins = HashSet::new();
        let mut inputs = HashMap::new();
        let mut outputs = HashMap::new();

        for di in &config.inputs {
            if !pins.insert(di.pin) {
                return Err(ConfigError::ValidationError(format!(
                    "pin {} assigned twice (input {})",
                    di.pin, di.role
                )));
            }
            let input = DigitalInput {
                role: di.role,
                pin: di.pin,
                invert: di.logic.inverts(),
                debounce: Duration::from_millis(u64::from(di.debounce_ms)),
            };
            if inputs.insert(di.role, input).is_some() {
                return Err(ConfigError::ValidationError(format!(
                    "input role {} configured twice",
                    di.role
                )));
            }
        }

        for dout in &config.outputs {
            if !pins.insert(dout.pin) {
                return Err(ConfigError::ValidationError(format!(
                    "pin {} assigned twice (output {})",
                    dout.pin, dout.role
                )));
            }
            let output = DigitalOutput {
                role: dout.role,
                pin: dout.pin,
                invert: dout.inverted,
            };
            if outputs.insert(dout.role, output).is_some() {
                return Err(ConfigError::ValidationError(format!(
                    "output role {} configured twice",
                    dout.role
                )));
            }
        }

        if let Some(role) = InputRole::ALL
            .into_iter()
            .find(|r| !inputs.contains_key(r))
        {
            return Err(ConfigError::ValidationError(format!(
                "required input {role} is not configured"
            )));
        }
        if let Some(role) = OutputRole::ALL
            .into_iter()
            .find(|r| r.is_required() && !outputs.contains_key(r))
        {
            return Err(ConfigError::ValidationError(format!(
                "required output {role} is not configured"
            )));
        }

        Ok(Self { inputs, outputs })
    }

    pub fn input(&self, role: InputRole) -> Option<&DigitalInput> {
        self.inputs.get(&role)
    }

    pub fn output(&self, role: OutputRole) -> Option<&DigitalOutput> {
        self.outputs.get(&role)
    }

    /// Input bound to a physical pin.
    pub fn input_by_pin(&self, pin: u8) -> Option<&DigitalInput> {
        self.inputs.values().find(|i| i.pin == pin)
    }

    /// Output bound to a physical pin.
    pub fn output_by_pin(&self, pin: u8) -> Option<&DigitalOutput> {
        self.outputs.values().find(|o| o.pin == pin)
    }

    pub fn inputs(&self) -> impl Iterator<Item = &DigitalInput> {
        self.inputs.values()
    }

    pub fn outputs(&self) -> impl Iterator<Item = &DigitalOutput> {
        self.outputs.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::config::{DiConfig, DoConfig};
    use crate::io::role::DiLogic;

    #[test]
    fn default_map_resolves_every_role() {
        let reg = IoRegistry::from_config(&IoConfig::default()).unwrap();
        for role in InputRole::ALL {
            assert!(reg.input(role).is_some(), "{role}");
        }
        for role in OutputRole::ALL {
            assert!(reg.output(role).is_some(), "{role}");
        }
        assert_eq!(reg.input(InputRole::EmergencyButton).unwrap().pin, 17);
    }

    #[test]
    fn nc_input_inverts_raw_level() {
        let reg = IoRegistry::from_config(&IoConfig::default()).unwrap();
        let estop = reg.input(InputRole::EmergencyButton).unwrap();
        assert!(estop.invert);
        assert!(estop.logical(false));
        assert!(!estop.logical(true));
        assert!(!estop.raw_for(true));

        let door = reg.input(InputRole::DoorClosed).unwrap();
        assert!(door.logical(true));
        assert_eq!(door.debounce, Duration::from_millis(15));
    }

    #[test]
    fn inverted_output_drives_active_low() {
        let reg = IoRegistry::from_config(&IoConfig::default()).unwrap();
        let enable = reg.output(OutputRole::StepEnable).unwrap();
        assert!(!enable.physical(true));
        assert_eq!(reg.output_by_pin(20).unwrap().role, OutputRole::StepEnable);
    }

    #[test]
    fn duplicate_pin_rejected() {
        let mut config = IoConfig::default();
        config.outputs.push(DoConfig {
            role: OutputRole::VentValve,
            pin: 17,
            inverted: false,
        });
        let err = IoRegistry::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("pin 17"));
    }

    #[test]
    fn duplicate_role_rejected() {
        let mut config = IoConfig::default();
        config.inputs.push(DiConfig {
            role: InputRole::DoorClosed,
            pin: 40,
            logic: DiLogic::NO,
            debounce_ms: 0,
        });
        let err = IoRegistry::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("door_closed"));
    }

    #[test]
    fn missing_required_input_rejected() {
        let mut config = IoConfig::default();
        config.inputs.retain(|i| i.role != InputRole::ActuatorMax);
        let err = IoRegistry::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("actuator_max"));
    }

    #[test]
    fn optional_roles_may_be_absent() {
        let mut config = IoConfig::default();
        config.outputs.retain(|o| o.role != OutputRole::VentValve);
        let reg = IoRegistry::from_config(&config).unwrap();
        assert!(reg.output(OutputRole::VentValve).is_none());
    }
}
