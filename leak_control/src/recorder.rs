//! Hand-off of finished runs to the data-recording side.

use leak_common::run::{Outcome, TestRun};
use parking_lot::Mutex;
use std::sync::mpsc::{self, Receiver, Sender};
use tracing::{info, warn};

/// Receives every finished run by value, on the sequencer worker thread.
pub trait RunRecorder: Send + Sync {
    fn record(&self, run: TestRun);
}

/// Writes a one-line summary per run to the log.
#[derive(Debug, Default)]
pub struct LogRecorder;

impl RunRecorder for LogRecorder {
    fn record(&self, run: TestRun) {
        let dwell = run
            .dwell_stats
            .map(|s| {
                format!(
                    "dwell mean={:.3} range={:.3} bar over {} samples",
                    s.mean_bar, s.range_bar, s.count
                )
            })
            .unwrap_or_else(|| "no dwell".to_string());
        match run.outcome {
            Outcome::Passed => info!(
                "Run {} passed in {:.1}s, {}",
                run.id, run.duration_s, dwell
            ),
            ref outcome => warn!(
                "Run {} {} after {:.1}s, {}, faults {:?}",
                run.id, outcome, run.duration_s, dwell, run.faults
            ),
        }
    }
}

/// Forwards runs over an mpsc channel.
pub struct ChannelRecorder {
    tx: Mutex<Sender<TestRun>>,
}

impl ChannelRecorder {
    pub fn new() -> (Self, Receiver<TestRun>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx: Mutex::new(tx) }, rx)
    }
}

impl RunRecorder for ChannelRecorder {
    fn record(&self, run: TestRun) {
        let id = run.id;
        if self.tx.lock().send(run).is_err() {
            warn!("Run {} dropped: recorder channel closed", id);
        }
    }
}
