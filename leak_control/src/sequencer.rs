//! Test sequencer.
//!
//! - [`machine`] - Phase results and the pure transition table
//! - [`runner`] - Blocking execution of one run against the HAL

pub mod machine;
pub mod runner;

pub use machine::{PhaseResult, next_phase};
pub use runner::{LiveStatus, TestSequencer};
