use std::sync::mpsc::Receiver;

use log::{debug, trace, warn};

use crate::engine::ArchiveEvent;
use crate::error::{EngineCondition, PipelineError};

/// Folds the events of one archive job into a single outcome.
///
/// The outcome is decided exactly once: successfully after both
/// `Completed` and `SinkClosed` were seen, in either order, or with a
/// failure on the first error or non-benign warning.
#[derive(Debug, Default)]
pub struct Completion {
    total_bytes: Option<u64>,
    sink_closed: bool,
    outcome: Option<Result<u64, EngineCondition>>,
}

impl Completion {
    pub fn new() -> Completion {
        Completion::default()
    }

    pub fn is_resolved(&self) -> bool {
        self.outcome.is_some()
    }

    /// Feeds one event, returns whether the job is resolved.
    pub fn observe(&mut self, event: ArchiveEvent) -> bool {
        if self.is_resolved() {
            debug!("ignoring {:?} after the job was resolved", event);
            return true;
        }

        match event {
            ArchiveEvent::Warning(condition) if condition.is_benign() => {
                warn!("{}", condition);
            }
            ArchiveEvent::Warning(condition) | ArchiveEvent::Error(condition) => {
                debug!("job failed: {}", condition);
                self.outcome = Some(Err(condition));
            }
            ArchiveEvent::Progress(streamed) => {
                trace!("{} bytes streamed", streamed);
            }
            ArchiveEvent::Completed(total) => {
                debug!("archive engine completed ({} bytes)", total);
                self.total_bytes = Some(total);
            }
            ArchiveEvent::SinkClosed => {
                debug!("output sink closed");
                self.sink_closed = true;
            }
        }

        if self.outcome.is_none() && self.sink_closed {
            if let Some(total) = self.total_bytes {
                self.outcome = Some(Ok(total));
            }
        }
        self.is_resolved()
    }

    /// Blocks on `events` until resolved or every sender is gone.
    pub fn wait(mut self, events: &Receiver<ArchiveEvent>) -> Result<u64, PipelineError> {
        while !self.is_resolved() {
            match events.recv() {
                Ok(event) => {
                    self.observe(event);
                }
                Err(_) => break,
            }
        }
        self.into_outcome()
    }

    pub fn into_outcome(self) -> Result<u64, PipelineError> {
        match self.outcome {
            Some(Ok(total)) => Ok(total),
            Some(Err(condition)) => Err(PipelineError::Engine(condition)),
            None => Err(PipelineError::Incomplete),
        }
    }
}
