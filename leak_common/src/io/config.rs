//! I/O pin configuration.
//!
//! # TOML Example
//!
//! ```toml
//! [[io.inputs]]
//! role = "emergency_button"
//! pin = 17
//! logic = "NC"
//!
//! [[io.outputs]]
//! role = "step_enable"
//! pin = 20
//! inverted = true
//! ```

use serde::{Deserialize, Serialize};

use crate::consts::DEFAULT_DEBOUNCE_MS;
use crate::io::role::{DiLogic, InputRole, OutputRole};

fn default_debounce_ms() -> u16 {
    DEFAULT_DEBOUNCE_MS
}

/// Digital input pin definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiConfig {
    pub role: InputRole,
    /// GPIO line number.
    pub pin: u8,
    #[serde(default)]
    pub logic: DiLogic,
    /// Debounce window in milliseconds. 0 disables debouncing.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u16,
}

/// Digital output pin definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DoConfig {
    pub role: OutputRole,
    pub pin: u8,
    /// Active-low output.
    #[serde(default)]
    pub inverted: bool,
}

/// Pin map of the station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IoConfig {
    #[serde(default)]
    pub inputs: Vec<DiConfig>,
    #[serde(default)]
    pub outputs: Vec<DoConfig>,
}

impl Default for IoConfig {
    /// Wiring of the reference station.
    fn default() -> Self {
        let di = |role, pin, logic| DiConfig {
            role,
            pin,
            logic,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        };
        let dout = |role, pin, inverted| DoConfig {
            role,
            pin,
            inverted,
        };

        Self {
            inputs: vec![
                di(InputRole::EmergencyButton, 17, DiLogic::NC),
                di(InputRole::DoorClosed, 4, DiLogic::NO),
                di(InputRole::TankLow, 23, DiLogic::NO),
                di(InputRole::ActuatorMin, 27, DiLogic::NO),
                di(InputRole::ActuatorMax, 22, DiLogic::NO),
            ],
            outputs: vec![
                dout(OutputRole::StepDirection, 21, false),
                dout(OutputRole::StepEnable, 20, true),
                dout(OutputRole::DriveRelay, 24, false),
                dout(OutputRole::VentValve, 25, false),
            ],
        }
    }
}
