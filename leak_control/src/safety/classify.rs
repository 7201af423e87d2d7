//! Safety classification rules.
//!
//! | Condition                               | Result                       |
//! |-----------------------------------------|------------------------------|
//! | emergency button asserted               | Emergency                    |
//! | both actuator limit switches asserted   | Emergency (sensor fault)     |
//! | pressure > emergency threshold          | Emergency                    |
//! | door open, run active                   | Emergency                    |
//! | pressure > warning threshold            | Warning                      |
//! | door open, idle                         | Warning                      |
//! | tank level low                          | Warning                      |
//!
//! Signals that could not be read are `None` and never trigger anything
//! here; the monitor's watchdogs cover a silent bus and dead critical inputs.

use leak_common::io::role::InputRole;
use leak_common::safety::{EmergencyReason, SafetyConfig, WarningReason};
use serde::Serialize;
use std::time::Instant;

/// One monitor sample of every safety-relevant signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SafetySnapshot {
    #[serde(skip)]
    pub taken_at: Instant,
    pub emergency_button: Option<bool>,
    pub door_closed: Option<bool>,
    pub tank_low: Option<bool>,
    pub actuator_min: Option<bool>,
    pub actuator_max: Option<bool>,
    pub pressure_bar: Option<f64>,
}

impl SafetySnapshot {
    /// A snapshot with every signal in its healthy state.
    pub fn healthy(taken_at: Instant) -> Self {
        Self {
            taken_at,
            emergency_button: Some(false),
            door_closed: Some(true),
            tank_low: Some(false),
            actuator_min: Some(true),
            actuator_max: Some(false),
            pressure_bar: Some(0.0),
        }
    }

    /// Reading of one input role, `None` when it failed.
    pub fn input(&self, role: InputRole) -> Option<bool> {
        match role {
            InputRole::EmergencyButton => self.emergency_button,
            InputRole::DoorClosed => self.door_closed,
            InputRole::TankLow => self.tank_low,
            InputRole::ActuatorMin => self.actuator_min,
            InputRole::ActuatorMax => self.actuator_max,
        }
    }

    /// Every signal was read successfully.
    pub fn is_complete(&self) -> bool {
        self.emergency_button.is_some()
            && self.door_closed.is_some()
            && self.tank_low.is_some()
            && self.actuator_min.is_some()
            && self.actuator_max.is_some()
            && self.pressure_bar.is_some()
    }
}

/// Classification of one snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Assessment {
    Normal,
    Warning(WarningReason),
    Emergency(EmergencyReason),
}

/// Classify a snapshot. Pure; emergencies take precedence over warnings.
pub fn classify(snapshot: &SafetySnapshot, config: &SafetyConfig, run_active: bool) -> Assessment {
    if snapshot.emergency_button == Some(true) {
        return Assessment::Emergency(EmergencyReason::EmergencyButton);
    }
    if snapshot.actuator_min == Some(true) && snapshot.actuator_max == Some(true) {
        return Assessment::Emergency(EmergencyReason::LimitSwitchFault);
    }
    if let Some(bar) = snapshot
        .pressure_bar
        .filter(|bar| *bar > config.emergency_pressure_bar)
    {
        return Assessment::Emergency(EmergencyReason::Overpressure { bar });
    }
    let door_open = snapshot.door_closed == Some(false);
    if door_open && run_active {
        return Assessment::Emergency(EmergencyReason::DoorOpenDuringRun);
    }

    if let Some(bar) = snapshot
        .pressure_bar
        .filter(|bar| *bar > config.warning_pressure_bar)
    {
        return Assessment::Warning(WarningReason::PressureHigh { bar });
    }
    if door_open {
        return Assessment::Warning(WarningReason::DoorOpen);
    }
    if snapshot.tank_low == Some(true) {
        return Assessment::Warning(WarningReason::TankLow);
    }
    Assessment::Normal
}
