//! Leak Station Control
//!
//! - [`safety`] - Safety monitor thread, classification, shared safety cell
//! - [`sequencer`] - Test phase graph and the blocking phase runner
//! - [`station`] - Facade used by presentation collaborators
//! - [`recorder`] - Hand-off of finished runs
//! - [`error`] - Start/reset/station errors

pub mod error;
pub mod recorder;
pub mod safety;
pub mod sequencer;
pub mod station;

pub use crate::error::{ResetError, StartError, StationError};
pub use crate::recorder::{ChannelRecorder, LogRecorder, RunRecorder};
pub use crate::station::{Station, StationStatus};
