//! Digital input debounce.
//!
//! A change of logical level is accepted only when a confirming read one
//! debounce window later shows the same level. The first observation of an
//! input is accepted as-is.

use leak_common::io::role::InputRole;
use std::collections::HashMap;
use std::time::Duration;

/// Result of observing a fresh logical level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// Level accepted.
    Settled(bool),
    /// Level differs from the accepted one; read again after the window.
    NeedsConfirm { stable: bool, candidate: bool },
}

/// Accepted levels per input role.
#[derive(Debug, Default)]
pub struct Debouncer {
    levels: HashMap<InputRole, bool>,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, role: InputRole, level: bool, window: Duration) -> Observation {
        match self.levels.get(&role) {
            Some(&stable) if stable != level && !window.is_zero() => Observation::NeedsConfirm {
                stable,
                candidate: level,
            },
            _ => {
                self.levels.insert(role, level);
                Observation::Settled(level)
            }
        }
    }

    /// Resolve a pending change with the confirming read. Returns the level
    /// now accepted.
    pub fn confirm(&mut self, role: InputRole, candidate: bool, confirmed: bool) -> bool {
        if confirmed == candidate {
            self.levels.insert(role, candidate);
            candidate
        } else {
            *self.levels.entry(role).or_insert(confirmed)
        }
    }
}
