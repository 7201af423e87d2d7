//! Blocking execution of one test run.
//!
//! [`TestSequencer::execute`] walks the transition table until a terminal
//! phase. Every wait is bounded by a configured timeout, and safety is
//! polled at least once per `min(poll interval, monitor cadence)`. Motion
//! waits are cut short through cancel tokens: the emergency token for all
//! moves, the operator abort token for every move except the return home.
//! An operator pause holds the run the same way a warning does under
//! [`WarningPolicy::Pause`]; moves already under way finish first.

use leak_common::calibration::FrequencyMap;
use leak_common::hal::types::{MoveOutcome, MoveTarget};
use leak_common::params::TestParameters;
use leak_common::run::{AbortReason, FailReason, Phase, RunEvent, RunFaults, Sample, TestRun};
use leak_common::safety::WarningReason;
use leak_common::station::{StationConfig, WarningPolicy};
use leak_hal::{CancelToken, Hal};
use parking_lot::RwLock;
use serde::Serialize;
use std::mem::discriminant;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::machine::{PhaseResult, next_phase};
use crate::safety::SafetyCell;
use crate::safety::cell::unix_micros;

/// Live view of the active (or last) run for presentation collaborators.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LiveStatus {
    pub run_id: Option<u64>,
    pub phase: Phase,
    pub last_sample: Option<Sample>,
    pub last_event: Option<RunEvent>,
}

/// Safety verdict for the next step of a phase.
enum Gate {
    Clear,
    /// Held; the reason is the failure once `max_pause` runs out.
    Paused(FailReason),
    Stop(AbortReason),
}

/// How a polled phase ended.
enum Poll {
    Decided(PhaseResult),
    Elapsed,
}

/// Per-run bookkeeping.
struct Active {
    run: TestRun,
    started: Instant,
    warning: Option<WarningReason>,
    held: bool,
}

impl Active {
    fn t(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }
}

pub struct TestSequencer {
    hal: Arc<Hal>,
    safety: Arc<SafetyCell>,
    config: Arc<StationConfig>,
    map: FrequencyMap,
    abort: CancelToken,
    pause: CancelToken,
    live: Arc<RwLock<LiveStatus>>,
}

impl TestSequencer {
    /// `abort` and `pause` are operator tokens; a cancelled `pause` means
    /// "hold".
    pub fn new(
        hal: Arc<Hal>,
        safety: Arc<SafetyCell>,
        config: Arc<StationConfig>,
        map: FrequencyMap,
        abort: CancelToken,
        pause: CancelToken,
        live: Arc<RwLock<LiveStatus>>,
    ) -> Self {
        Self {
            hal,
            safety,
            config,
            map,
            abort,
            pause,
            live,
        }
    }

    /// Run one test to a terminal phase and return the finished record.
    ///
    /// The caller owns the run slot in the [`SafetyCell`] for the whole
    /// call.
    pub fn execute(&self, id: u64, parameters: TestParameters) -> TestRun {
        let mut active = Active {
            run: TestRun::new(id, parameters, unix_micros()),
            started: Instant::now(),
            warning: None,
            held: false,
        };
        {
            let mut live = self.live.write();
            *live = LiveStatus {
                run_id: Some(id),
                ..LiveStatus::default()
            };
        }

        let p = &active.run.parameters;
        info!(
            "Run {} started: position={} mm, pressure={} bar, inspection={} min",
            id,
            p.target_position_mm(),
            p.target_pressure_bar(),
            p.inspection_time_min()
        );
        self.enter(&mut active, Phase::Homing, "run started".to_string());

        let mut phase = Phase::Homing;
        while !phase.is_terminal() {
            let result = match phase {
                Phase::Homing => self.homing(&mut active),
                Phase::Positioning => self.positioning(&mut active),
                Phase::Pressurizing => self.pressurizing(&mut active),
                Phase::Dwelling => self.dwelling(&mut active),
                Phase::Venting => self.venting(&mut active),
                Phase::Returning => self.returning(&mut active),
                _ => PhaseResult::Completed,
            };

            let reason = match &result {
                PhaseResult::Completed => format!("{phase} complete"),
                PhaseResult::Failed(reason) => {
                    warn!("Run {}: {} failed: {}", id, phase, reason);
                    let fault = if phase == Phase::Returning {
                        active.run.faults |= RunFaults::RETURN_FAILED;
                        RunFaults::RETURN_FAILED
                    } else {
                        RunFaults::HARDWARE_FAULT
                    };
                    active.run.fail(reason.clone(), fault);
                    reason.to_string()
                }
                PhaseResult::Aborted(reason) => {
                    warn!("Run {}: {} aborted: {}", id, phase, reason);
                    if phase == Phase::Returning {
                        active.run.faults |= RunFaults::RETURN_FAILED;
                    }
                    active.run.abort(*reason);
                    reason.to_string()
                }
            };

            phase = next_phase(phase, &result, &active.run.outcome);
            self.enter(&mut active, phase, reason);
        }

        let t = active.t();
        active.run.finish(t);
        info!(
            "Run {} finished: {} in {:.1}s ({} samples, faults {:?})",
            id,
            active.run.outcome,
            t,
            active.run.samples.len(),
            active.run.faults
        );
        active.run
    }

    // ─── Bookkeeping ────────────────────────────────────────────────

    fn enter(&self, active: &mut Active, phase: Phase, reason: String) {
        let t = active.t();
        info!("Run {}: -> {} ({})", active.run.id, phase, reason);
        active.run.enter(t, phase, reason);
        let mut live = self.live.write();
        live.phase = phase;
        live.last_event = active.run.events.last().cloned();
    }

    fn note(&self, active: &mut Active, reason: String) {
        let t = active.t();
        debug!("Run {}: {}", active.run.id, reason);
        active.run.log(t, reason);
        self.live.write().last_event = active.run.events.last().cloned();
    }

    fn sample(&self, active: &mut Active, phase: Phase, pressure_bar: f64) {
        let sample = Sample {
            t_s: active.t(),
            phase,
            position_mm: self.hal.position_mm(),
            pressure_bar,
        };
        active.run.push_sample(sample);
        self.live.write().last_sample = Some(sample);
    }

    // ─── Safety ─────────────────────────────────────────────────────

    /// Check the published safety state and, if `operator`, the abort and
    /// pause flags. New warnings and pause changes are written to the event
    /// log once per episode.
    fn gate(&self, active: &mut Active, operator: bool) -> Gate {
        let state = self.safety.state();
        if let Some(reason) = state.emergency_reason() {
            return Gate::Stop(AbortReason::Emergency(reason));
        }
        if operator && self.abort.is_cancelled() {
            return Gate::Stop(AbortReason::OperatorAbort);
        }

        let held = operator && self.pause.is_cancelled();
        if held != active.held {
            active.held = held;
            let change = if held { "paused by operator" } else { "resumed by operator" };
            info!("Run {}: {}", active.run.id, change);
            self.note(active, change.to_string());
        }

        let gate = match state.warning_reason() {
            Some(reason) => {
                let known = active.warning.map(|w| discriminant(&w));
                if known != Some(discriminant(&reason)) {
                    active.run.faults |= RunFaults::WARNING_DURING_RUN;
                    warn!("Run {}: warning: {}", active.run.id, reason);
                    self.note(active, format!("warning: {reason}"));
                }
                active.warning = Some(reason);
                match self.config.sequencer.warning_policy {
                    WarningPolicy::Continue => Gate::Clear,
                    WarningPolicy::Pause => Gate::Paused(FailReason::WarningPauseTimeout),
                }
            }
            None => {
                if active.warning.take().is_some() {
                    self.note(active, "warning cleared".to_string());
                }
                Gate::Clear
            }
        };
        if held {
            Gate::Paused(FailReason::PauseTimeout)
        } else {
            gate
        }
    }

    /// Why a cancelled move stopped.
    fn cancel_reason(&self) -> AbortReason {
        match self.safety.state().emergency_reason() {
            Some(reason) => AbortReason::Emergency(reason),
            None => AbortReason::OperatorAbort,
        }
    }

    fn poll_period(&self) -> Duration {
        self.config
            .sequencer
            .poll_interval()
            .min(self.config.safety.cadence())
    }

    /// Wait while paused by a warning or the operator, bounded by
    /// `max_pause`.
    fn wait_until_clear(&self, active: &mut Active) -> Option<PhaseResult> {
        let mut paused_since: Option<Instant> = None;
        loop {
            match self.gate(active, true) {
                Gate::Clear => return None,
                Gate::Stop(reason) => return Some(PhaseResult::Aborted(reason)),
                Gate::Paused(timeout) => {
                    let since = *paused_since.get_or_insert_with(Instant::now);
                    if since.elapsed() >= self.config.timeouts.max_pause() {
                        return Some(PhaseResult::Failed(timeout));
                    }
                    thread::sleep(self.poll_period());
                }
            }
        }
    }

    // ─── Motion phases ──────────────────────────────────────────────

    fn move_to(
        &self,
        target: MoveTarget,
        speed_mm_s: f64,
        timeout: Duration,
        operator: bool,
        on_timeout: FailReason,
    ) -> PhaseResult {
        let emergency = self.safety.emergency_token();
        let abort = self.abort.clone();
        let both: [&CancelToken; 2] = [&emergency, &abort];
        let tokens = if operator { &both[..] } else { &both[..1] };

        match self.hal.move_actuator(target, speed_mm_s, timeout, tokens) {
            Ok(MoveOutcome::Reached) => PhaseResult::Completed,
            Ok(MoveOutcome::TimedOut) => PhaseResult::Failed(on_timeout),
            Ok(MoveOutcome::LimitReached) => match target {
                MoveTarget::Home => PhaseResult::Failed(FailReason::HardwareFault(
                    "home switch not seen".to_string(),
                )),
                MoveTarget::Position(_) => PhaseResult::Failed(FailReason::PositionNotReached),
            },
            Ok(MoveOutcome::Cancelled) => PhaseResult::Aborted(self.cancel_reason()),
            Err(e) => PhaseResult::Failed(FailReason::HardwareFault(e.to_string())),
        }
    }

    fn homing(&self, active: &mut Active) -> PhaseResult {
        if let Some(result) = self.wait_until_clear(active) {
            return result;
        }
        self.move_to(
            MoveTarget::Home,
            self.hal.motion().homing_speed_mm_s,
            self.config.timeouts.home(),
            true,
            FailReason::HomeTimeout,
        )
    }

    fn positioning(&self, active: &mut Active) -> PhaseResult {
        if let Some(result) = self.wait_until_clear(active) {
            return result;
        }
        let target = active.run.parameters.target_position_mm();
        self.move_to(
            MoveTarget::Position(target),
            self.hal.motion().speed_mm_s,
            self.config.timeouts.movement(),
            true,
            FailReason::MoveTimeout,
        )
    }

    /// Home again. Only an emergency cuts this short.
    fn returning(&self, active: &mut Active) -> PhaseResult {
        if let Err(e) = self.hal.stop_drive() {
            self.note(active, format!("drive stop before return failed: {e}"));
        }
        self.move_to(
            MoveTarget::Home,
            self.hal.motion().homing_speed_mm_s,
            self.config.timeouts.home(),
            false,
            FailReason::HomeTimeout,
        )
    }

    // ─── Pressure phases ────────────────────────────────────────────

    /// Poll pressure until `check` decides, `limit` of unpaused time has
    /// passed, or safety intervenes. Samples are logged at the configured
    /// rate. With `guarded == false` the safety state is ignored.
    fn poll_pressure(
        &self,
        active: &mut Active,
        phase: Phase,
        limit: Duration,
        guarded: bool,
        mut check: impl FnMut(f64) -> Option<PhaseResult>,
    ) -> Poll {
        let period = self.poll_period();
        let sample_period = self.config.sequencer.sample_period();
        let max_pause = self.config.timeouts.max_pause();

        let mut running_for = Duration::ZERO;
        let mut paused_since: Option<Instant> = None;
        let mut last = Instant::now();
        let mut next_sample = last;

        loop {
            let tick = Instant::now();
            let dt = tick.saturating_duration_since(last);
            last = tick;

            let gate = if guarded {
                self.gate(active, true)
            } else {
                Gate::Clear
            };
            match gate {
                Gate::Stop(reason) => return Poll::Decided(PhaseResult::Aborted(reason)),
                Gate::Paused(timeout) => {
                    let since = *paused_since.get_or_insert(tick);
                    if tick.saturating_duration_since(since) >= max_pause {
                        return Poll::Decided(PhaseResult::Failed(timeout));
                    }
                }
                Gate::Clear => {
                    paused_since = None;
                    running_for += dt;
                }
            }

            let pressure = match self.hal.read_pressure() {
                Ok(bar) => bar,
                Err(e) => {
                    return Poll::Decided(PhaseResult::Failed(FailReason::HardwareFault(
                        e.to_string(),
                    )));
                }
            };
            if tick >= next_sample {
                self.sample(active, phase, pressure);
                next_sample += sample_period;
                if next_sample < tick {
                    next_sample = tick + sample_period;
                }
            }

            if paused_since.is_none() {
                if let Some(result) = check(pressure) {
                    return Poll::Decided(result);
                }
                if running_for >= limit {
                    return Poll::Elapsed;
                }
            }

            let elapsed = tick.elapsed();
            if elapsed < period {
                thread::sleep(period - elapsed);
            }
        }
    }

    fn pressurizing(&self, active: &mut Active) -> PhaseResult {
        let target = active.run.parameters.target_pressure_bar();
        let tolerance = self.config.sequencer.pressure_tolerance_bar;

        if target > tolerance {
            let hz = self.map.frequency_for(target);
            self.note(active, format!("drive {hz:.2} Hz for {target:.2} bar"));
            let started = self
                .hal
                .vent(false)
                .and_then(|()| self.hal.set_drive_frequency(hz))
                .and_then(|()| self.hal.start_drive());
            if let Err(e) = started {
                return PhaseResult::Failed(FailReason::HardwareFault(e.to_string()));
            }
        } else {
            self.note(active, "target at ambient, drive not started".to_string());
        }

        let limit = self.config.timeouts.pressure_ramp();
        match self.poll_pressure(active, Phase::Pressurizing, limit, true, |bar| {
            ((bar - target).abs() <= tolerance).then_some(PhaseResult::Completed)
        }) {
            Poll::Decided(result) => result,
            Poll::Elapsed => PhaseResult::Failed(FailReason::PressureNotReached),
        }
    }

    fn dwelling(&self, active: &mut Active) -> PhaseResult {
        let target = active.run.parameters.target_pressure_bar();
        let band = self.config.sequencer.dwell_tolerance_bar;
        let hold = active.run.parameters.inspection_time();

        match self.poll_pressure(active, Phase::Dwelling, hold, true, |bar| {
            ((bar - target).abs() > band).then_some(PhaseResult::Failed(FailReason::LeakDetected))
        }) {
            Poll::Decided(result) => result,
            Poll::Elapsed => PhaseResult::Completed,
        }
    }

    /// Release pressure. Never cancelled; a timeout is recorded as a fault
    /// and the run continues home.
    fn venting(&self, active: &mut Active) -> PhaseResult {
        let stopped = self.hal.stop_drive();
        let opened = self.hal.vent(true);
        if let Some(e) = stopped.err().or(opened.err()) {
            active.run.faults |= RunFaults::STOP_FAILED;
            self.note(active, format!("vent command failed: {e}"));
        }

        let threshold = self.config.sequencer.vent_threshold_bar;
        let limit = self.config.timeouts.vent();
        match self.poll_pressure(active, Phase::Venting, limit, false, |bar| {
            (bar <= threshold).then_some(PhaseResult::Completed)
        }) {
            Poll::Decided(result) => result,
            Poll::Elapsed => {
                warn!("Run {}: vent timeout after {:?}", active.run.id, limit);
                active.run.faults |= RunFaults::VENT_TIMEOUT;
                self.note(active, "vent_timeout".to_string());
                PhaseResult::Completed
            }
        }
    }
}
