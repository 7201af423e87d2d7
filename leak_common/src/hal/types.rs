//! Motion command and result types.

use serde::{Deserialize, Serialize};

/// Stepper travel direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Away from the home switch.
    Extend,
    /// Toward the home switch.
    Retract,
}

impl Direction {
    /// Level of the direction output for this travel.
    pub const fn level(self) -> bool {
        matches!(self, Self::Extend)
    }

    pub const fn sign(self) -> i64 {
        match self {
            Self::Extend => 1,
            Self::Retract => -1,
        }
    }
}

/// Where an actuator move should end.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MoveTarget {
    /// Travel toward the home switch until it asserts.
    Home,
    /// Absolute position in mm.
    Position(f64),
}

/// How a blocking move ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveOutcome {
    /// Target reached within tolerance.
    Reached,
    /// A limit switch in the travel direction asserted before the target.
    LimitReached,
    /// The move did not finish in time. The actuator was stopped.
    TimedOut,
    /// A cancel token fired. The actuator was stopped.
    Cancelled,
}
