//! I/O role types.
//!
//! A role names what a pin means to the machine ("door closed",
//! "vent valve"), independent of where it is wired.

use core::fmt;
use serde::{Deserialize, Serialize};

// ─── DiLogic ────────────────────────────────────────────────────────

/// Digital input contact logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DiLogic {
    /// Normally Open: asserted when signal present.
    #[serde(rename = "NO")]
    #[default]
    NO,
    /// Normally Closed: inverted, a wire break reads as asserted.
    #[serde(rename = "NC")]
    NC,
}

impl DiLogic {
    /// Whether the raw level must be inverted to get the logical level.
    pub const fn inverts(self) -> bool {
        matches!(self, Self::NC)
    }
}

// ─── InputRole ──────────────────────────────────────────────────────

/// Functional role of a digital input. Logical `true` means the named
/// condition holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputRole {
    /// Emergency stop button pressed.
    EmergencyButton,
    /// Test chamber door closed.
    DoorClosed,
    /// Supply tank below minimum level.
    TankLow,
    /// Actuator at the home (minimum) limit switch.
    ActuatorMin,
    /// Actuator at the far (maximum) limit switch.
    ActuatorMax,
}

impl InputRole {
    /// Every input is required; the station has no optional sensors.
    pub const ALL: [InputRole; 5] = [
        Self::EmergencyButton,
        Self::DoorClosed,
        Self::TankLow,
        Self::ActuatorMin,
        Self::ActuatorMax,
    ];
}

impl fmt::Display for InputRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::EmergencyButton => "emergency_button",
            Self::DoorClosed => "door_closed",
            Self::TankLow => "tank_low",
            Self::ActuatorMin => "actuator_min",
            Self::ActuatorMax => "actuator_max",
        };
        f.write_str(name)
    }
}

// ─── OutputRole ─────────────────────────────────────────────────────

/// Functional role of a digital output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputRole {
    /// Stepper direction, `true` = extend (away from home).
    StepDirection,
    /// Stepper driver enable.
    StepEnable,
    /// Drive power relay.
    DriveRelay,
    /// Vent valve, `true` = open.
    VentValve,
}

impl OutputRole {
    pub const ALL: [OutputRole; 4] = [
        Self::StepDirection,
        Self::StepEnable,
        Self::DriveRelay,
        Self::VentValve,
    ];

    /// Outputs the station cannot run without. Without a vent valve the
    /// test volume vents through the stopped compressor.
    pub const fn is_required(self) -> bool {
        !matches!(self, Self::VentValve)
    }
}

impl fmt::Display for OutputRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::StepDirection => "step_direction",
            Self::StepEnable => "step_enable",
            Self::DriveRelay => "drive_relay",
            Self::VentValve => "vent_valve",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Wrapper {
        role: InputRole,
        logic: DiLogic,
    }

    #[test]
    fn roles_deserialize_snake_case() {
        let w: Wrapper = toml::from_str("role = \"emergency_button\"\nlogic = \"NC\"").unwrap();
        assert_eq!(w.role, InputRole::EmergencyButton);
        assert_eq!(w.logic, DiLogic::NC);
        assert!(w.logic.inverts());
    }

    #[test]
    fn display_matches_serde_names() {
        for role in InputRole::ALL {
            let text = format!("role = \"{role}\"\nlogic = \"NO\"");
            let w: Wrapper = toml::from_str(&text).unwrap();
            assert_eq!(w.role, role);
        }
    }

    #[test]
    fn only_the_vent_valve_is_optional() {
        let optional: Vec<_> = OutputRole::ALL
            .into_iter()
            .filter(|r| !r.is_required())
            .collect();
        assert_eq!(optional, vec![OutputRole::VentValve]);
    }
}
