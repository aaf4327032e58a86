use crate::{export::state::ExportState, foundation::error::CountframeError};

/// Receiver of export progress and failure notifications.
///
/// All methods default to doing nothing.
pub trait ProgressSink: Send + Sync {
    /// The export moved to `state`.
    fn state_changed(&self, _state: ExportState) {}
    /// `done` of `total` frames are rendered.
    fn frame_rendered(&self, _done: u64, _total: u64) {}
    /// The export failed with `err`; the error is also returned to the caller.
    fn failed(&self, _err: &CountframeError) {}
}

/// Discards every notification.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {}

/// Reports progress through `tracing`.
#[derive(Clone, Copy, Debug)]
pub struct TracingProgress {
    every: u64,
}

impl TracingProgress {
    /// Log frame progress every `every` frames (at least 1).
    pub fn new(every: u64) -> Self {
        Self {
            every: every.max(1),
        }
    }
}

impl Default for TracingProgress {
    fn default() -> Self {
        Self::new(30)
    }
}

impl ProgressSink for TracingProgress {
    fn state_changed(&self, state: ExportState) {
        tracing::info!(?state, "export state changed");
    }

    fn frame_rendered(&self, done: u64, total: u64) {
        if done.is_multiple_of(self.every) || done == total {
            tracing::info!(done, total, "frames rendered");
        }
    }

    fn failed(&self, err: &CountframeError) {
        tracing::error!(error = %err, "export failed");
    }
}
