//! Test run record.
//!
//! A [`TestRun`] is created when the sequencer accepts a start, mutated only
//! by the sequencer while the run is active, and handed to the recorder by
//! value once it reaches a terminal outcome. The event log is append-only.

use bitflags::bitflags;
use serde::Serialize;
use std::fmt;

use crate::params::TestParameters;
use crate::safety::EmergencyReason;

// ─── Phase ──────────────────────────────────────────────────────────

/// Sequencer phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Homing,
    Positioning,
    Pressurizing,
    Dwelling,
    Venting,
    Returning,
    Passed,
    Failed,
    Aborted,
}

impl Phase {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Passed | Self::Failed | Self::Aborted)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Homing => "homing",
            Self::Positioning => "positioning",
            Self::Pressurizing => "pressurizing",
            Self::Dwelling => "dwelling",
            Self::Venting => "venting",
            Self::Returning => "returning",
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

// ─── Outcome ────────────────────────────────────────────────────────

/// Why a run failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailReason {
    HomeTimeout,
    MoveTimeout,
    PositionNotReached,
    PressureNotReached,
    LeakDetected,
    WarningPauseTimeout,
    /// Operator pause held longer than `max_pause`.
    PauseTimeout,
    HardwareFault(String),
}

impl fmt::Display for FailReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HomeTimeout => f.write_str("home_timeout"),
            Self::MoveTimeout => f.write_str("move_timeout"),
            Self::PositionNotReached => f.write_str("position_not_reached"),
            Self::PressureNotReached => f.write_str("pressure_not_reached"),
            Self::LeakDetected => f.write_str("leak_detected"),
            Self::WarningPauseTimeout => f.write_str("warning_pause_timeout"),
            Self::PauseTimeout => f.write_str("pause_timeout"),
            Self::HardwareFault(detail) => write!(f, "hardware_fault: {detail}"),
        }
    }
}

/// Why a run was aborted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum AbortReason {
    Emergency(EmergencyReason),
    OperatorAbort,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Emergency(reason) => write!(f, "emergency: {reason}"),
            Self::OperatorAbort => f.write_str("operator_abort"),
        }
    }
}

/// Result of a run.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "result", content = "cause", rename_all = "snake_case")]
pub enum Outcome {
    #[default]
    Pending,
    Passed,
    Failed(FailReason),
    Aborted(AbortReason),
}

impl Outcome {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Terminal phase this outcome leads to; `Passed` while still pending.
    pub fn terminal_phase(&self) -> Phase {
        match self {
            Self::Pending | Self::Passed => Phase::Passed,
            Self::Failed(_) => Phase::Failed,
            Self::Aborted(_) => Phase::Aborted,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("pending"),
            Self::Passed => f.write_str("passed"),
            Self::Failed(reason) => write!(f, "failed ({reason})"),
            Self::Aborted(reason) => write!(f, "aborted ({reason})"),
        }
    }
}

/// Outcome counts over the station's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RunStatistics {
    pub total: u64,
    pub passed: u64,
    pub failed: u64,
    pub aborted: u64,
}

impl RunStatistics {
    /// Count one finished run. Pending outcomes are ignored.
    pub fn record(&mut self, outcome: &Outcome) {
        let counter = match outcome {
            Outcome::Pending => return,
            Outcome::Passed => &mut self.passed,
            Outcome::Failed(_) => &mut self.failed,
            Outcome::Aborted(_) => &mut self.aborted,
        };
        *counter += 1;
        self.total += 1;
    }
}

bitflags! {
    /// Secondary faults recorded during a run. They never replace the
    /// primary outcome.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
    pub struct RunFaults: u8 {
        const VENT_TIMEOUT = 1 << 0;
        const RETURN_FAILED = 1 << 1;
        const HARDWARE_FAULT = 1 << 2;
        const WARNING_DURING_RUN = 1 << 3;
        const STOP_FAILED = 1 << 4;
    }
}

// ─── Logs ───────────────────────────────────────────────────────────

/// One pressure/position sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    /// Seconds since run start.
    pub t_s: f64,
    pub phase: Phase,
    pub position_mm: Option<f64>,
    pub pressure_bar: f64,
}

/// One event log entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunEvent {
    /// Seconds since run start.
    pub t_s: f64,
    pub phase: Phase,
    pub reason: String,
}

/// Pressure statistics over the dwell samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PressureStats {
    pub min_bar: f64,
    pub max_bar: f64,
    pub mean_bar: f64,
    pub final_bar: f64,
    pub range_bar: f64,
    pub count: usize,
}

impl PressureStats {
    /// Statistics over the samples taken in `phase`, `None` if there are none.
    pub fn from_samples(samples: &[Sample], phase: Phase) -> Option<Self> {
        let mut iter = samples.iter().filter(|s| s.phase == phase);
        let first = iter.next()?;

        let mut stats = Self {
            min_bar: first.pressure_bar,
            max_bar: first.pressure_bar,
            mean_bar: 0.0,
            final_bar: first.pressure_bar,
            range_bar: 0.0,
            count: 1,
        };
        let mut sum = first.pressure_bar;
        for s in iter {
            stats.min_bar = stats.min_bar.min(s.pressure_bar);
            stats.max_bar = stats.max_bar.max(s.pressure_bar);
            stats.final_bar = s.pressure_bar;
            stats.count += 1;
            sum += s.pressure_bar;
        }
        stats.mean_bar = sum / stats.count as f64;
        stats.range_bar = stats.max_bar - stats.min_bar;
        Some(stats)
    }
}

// ─── TestRun ────────────────────────────────────────────────────────

/// Record of one test run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestRun {
    pub id: u64,
    pub parameters: TestParameters,
    pub phase: Phase,
    /// Wall clock at start, microseconds since the Unix epoch.
    pub started_at_us: u64,
    /// Seconds from start to terminal phase.
    pub duration_s: f64,
    pub samples: Vec<Sample>,
    pub events: Vec<RunEvent>,
    pub faults: RunFaults,
    pub outcome: Outcome,
    pub dwell_stats: Option<PressureStats>,
}

impl TestRun {
    pub fn new(id: u64, parameters: TestParameters, started_at_us: u64) -> Self {
        Self {
            id,
            parameters,
            phase: Phase::Idle,
            started_at_us,
            duration_s: 0.0,
            samples: Vec::new(),
            events: Vec::new(),
            faults: RunFaults::empty(),
            outcome: Outcome::Pending,
            dwell_stats: None,
        }
    }

    /// Append an event and move to `phase`.
    pub fn enter(&mut self, t_s: f64, phase: Phase, reason: impl Into<String>) {
        self.phase = phase;
        self.log(t_s, reason);
    }

    /// Append an event for the current phase.
    pub fn log(&mut self, t_s: f64, reason: impl Into<String>) {
        self.events.push(RunEvent {
            t_s,
            phase: self.phase,
            reason: reason.into(),
        });
    }

    pub fn push_sample(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    /// Record a failure. The first failure or abort is the outcome; later
    /// ones only add `fault`.
    pub fn fail(&mut self, reason: FailReason, fault: RunFaults) {
        if self.outcome.is_pending() {
            self.outcome = Outcome::Failed(reason);
        } else {
            self.faults |= fault;
        }
    }

    /// Record an abort. Same precedence rule as [`fail`](Self::fail).
    pub fn abort(&mut self, reason: AbortReason) {
        if self.outcome.is_pending() {
            self.outcome = Outcome::Aborted(reason);
        }
    }

    /// Close the run at a terminal phase and compute dwell statistics.
    pub fn finish(&mut self, t_s: f64) {
        if self.outcome.is_pending() {
            self.outcome = Outcome::Passed;
        }
        self.duration_s = t_s;
        self.dwell_stats = PressureStats::from_samples(&self.samples, Phase::Dwelling);
    }
}
