//! Phase transition table.
//!
//! | Phase        | Completed    | Failed      | Aborted     |
//! |--------------|--------------|-------------|-------------|
//! | Homing       | Positioning  | Failed      | Aborted     |
//! | Positioning  | Pressurizing | Returning   | Aborted     |
//! | Pressurizing | Dwelling     | Venting     | Venting     |
//! | Dwelling     | Venting      | Venting     | Venting     |
//! | Venting      | Returning    | Returning   | Returning   |
//! | Returning    | outcome      | outcome     | outcome     |
//!
//! Once Pressurizing has begun every path runs through Venting and then
//! Returning. "outcome" is the terminal phase of the first recorded
//! failure or abort, `Passed` when there is none.

use leak_common::run::{AbortReason, FailReason, Outcome, Phase};

/// How a phase ended.
#[derive(Debug, Clone, PartialEq)]
pub enum PhaseResult {
    Completed,
    Failed(FailReason),
    Aborted(AbortReason),
}

/// Next phase after `phase` ended with `result`. `outcome` is the run
/// outcome after `result` has been recorded.
pub fn next_phase(phase: Phase, result: &PhaseResult, outcome: &Outcome) -> Phase {
    use PhaseResult::*;

    match (phase, result) {
        (Phase::Idle, Completed) => Phase::Homing,
        (Phase::Homing, Completed) => Phase::Positioning,
        (Phase::Positioning, Completed) => Phase::Pressurizing,
        (Phase::Positioning, Failed(_)) => Phase::Returning,
        (Phase::Pressurizing, Completed) => Phase::Dwelling,
        (Phase::Pressurizing | Phase::Dwelling, _) => Phase::Venting,
        (Phase::Venting, _) => Phase::Returning,
        (Phase::Returning, _) => outcome.terminal_phase(),
        (Phase::Idle | Phase::Homing | Phase::Positioning, _) => outcome.terminal_phase(),
        (terminal, _) => terminal,
    }
}
