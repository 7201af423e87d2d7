//! Shared safety state.
//!
//! The monitor publishes, the sequencer and the station read. State,
//! trigger time and latest snapshot live behind one lock so readers never
//! see them out of step. The emergency token is cancelled inside the same
//! write section that publishes `Emergency`.

use leak_common::safety::{EmergencyReason, SafetyConfig, SafetyState};
use leak_hal::CancelToken;
use parking_lot::RwLock;
use std::mem::discriminant;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use super::classify::{Assessment, SafetySnapshot, classify};
use crate::error::ResetError;

/// Wall clock in microseconds since the Unix epoch.
pub(crate) fn unix_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_micros()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

#[derive(Debug, Default)]
struct Published {
    state: SafetyState,
    triggered: Option<Instant>,
    snapshot: Option<SafetySnapshot>,
}

/// Atomically published safety state plus the run-active flag the
/// classifier depends on.
pub struct SafetyCell {
    inner: RwLock<Published>,
    emergency: CancelToken,
    run_active: AtomicBool,
    config: SafetyConfig,
}

impl SafetyCell {
    pub fn new(config: SafetyConfig) -> Self {
        Self {
            inner: RwLock::new(Published::default()),
            emergency: CancelToken::new(),
            run_active: AtomicBool::new(false),
            config,
        }
    }

    pub fn config(&self) -> &SafetyConfig {
        &self.config
    }

    pub fn state(&self) -> SafetyState {
        self.inner.read().state
    }

    /// Latest monitor snapshot.
    pub fn snapshot(&self) -> Option<SafetySnapshot> {
        self.inner.read().snapshot
    }

    /// Token cancelled on every transition into Emergency.
    pub fn emergency_token(&self) -> CancelToken {
        self.emergency.clone()
    }

    pub fn run_active(&self) -> bool {
        self.run_active.load(Ordering::SeqCst)
    }

    /// Claim the single run slot. `false` if a run is already active.
    pub fn try_begin_run(&self) -> bool {
        self.run_active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn end_run(&self) {
        self.run_active.store(false, Ordering::SeqCst);
    }

    /// Store `snapshot` and apply `assessment`.
    ///
    /// Returns the new state when its kind changed. An active Emergency is
    /// never replaced here; only [`reset_emergency`](Self::reset_emergency)
    /// leaves it.
    pub fn publish(
        &self,
        snapshot: SafetySnapshot,
        assessment: Assessment,
    ) -> Option<SafetyState> {
        let mut inner = self.inner.write();
        inner.snapshot = Some(snapshot);
        if inner.state.is_emergency() {
            return None;
        }

        let next = match assessment {
            Assessment::Normal => SafetyState::Normal,
            Assessment::Warning(reason) => SafetyState::Warning { reason },
            Assessment::Emergency(reason) => {
                inner.triggered = Some(Instant::now());
                self.emergency.cancel();
                SafetyState::Emergency {
                    reason,
                    triggered_at_us: unix_micros(),
                }
            }
        };

        let changed = !same_kind(&inner.state, &next);
        inner.state = next;
        changed.then_some(next)
    }

    /// Latch Emergency outside the monitor tick. `false` if already latched.
    pub fn trigger_emergency(&self, reason: EmergencyReason) -> bool {
        let mut inner = self.inner.write();
        if inner.state.is_emergency() {
            return false;
        }
        inner.triggered = Some(Instant::now());
        self.emergency.cancel();
        inner.state = SafetyState::Emergency {
            reason,
            triggered_at_us: unix_micros(),
        };
        true
    }

    /// Return from Emergency to Normal.
    ///
    /// # Errors
    /// - `NotInEmergency` when nothing is latched.
    /// - `CooldownPending` before the cooldown has elapsed.
    /// - `ConditionActive` while the monitor has not yet seen the station
    ///   clear of every emergency condition since the trigger. A door opened
    ///   during a run must be closed again, and a dead input must answer.
    pub fn reset_emergency(&self) -> Result<(), ResetError> {
        let mut inner = self.inner.write();
        let reason = inner
            .state
            .emergency_reason()
            .ok_or(ResetError::NotInEmergency)?;
        let triggered = inner.triggered.unwrap_or_else(Instant::now);

        let elapsed = triggered.elapsed();
        let cooldown = self.config.cooldown();
        if elapsed < cooldown {
            return Err(ResetError::CooldownPending {
                remaining: cooldown - elapsed,
            });
        }

        let snapshot = inner
            .snapshot
            .filter(|s| s.taken_at > triggered)
            .ok_or(ResetError::ConditionActive(reason))?;
        let needs_complete = matches!(
            reason,
            EmergencyReason::HardwareUnresponsive | EmergencyReason::InputUnreadable { .. }
        );
        if needs_complete && !snapshot.is_complete() {
            return Err(ResetError::ConditionActive(reason));
        }
        // idle classification only warns about an open door
        if reason == EmergencyReason::DoorOpenDuringRun && snapshot.door_closed != Some(true) {
            return Err(ResetError::ConditionActive(reason));
        }
        if let Assessment::Emergency(active) = classify(&snapshot, &self.config, false) {
            return Err(ResetError::ConditionActive(active));
        }

        inner.state = SafetyState::Normal;
        inner.triggered = None;
        self.emergency.reset();
        Ok(())
    }
}

fn same_kind(a: &SafetyState, b: &SafetyState) -> bool {
    match (a, b) {
        (SafetyState::Warning { reason: x }, SafetyState::Warning { reason: y }) => {
            discriminant(x) == discriminant(y)
        }
        _ => discriminant(a) == discriminant(b),
    }
}
