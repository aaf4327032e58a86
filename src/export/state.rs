use crate::foundation::error::{CountframeError, CountframeResult};

/// Lifecycle of an export job.
///
/// `Idle → GeneratingFrames → {Optimizing | Encoding | Both} → Packaged` on success. Any
/// non-terminal state may move to `Failed` or `Cancelled`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportState {
    /// Not started.
    #[default]
    Idle,
    /// Rendering frames.
    GeneratingFrames,
    /// Building the PNG sequence.
    Optimizing,
    /// Encoding the video.
    Encoding,
    /// Building the PNG sequence and encoding the video concurrently.
    Both,
    /// Artifacts are ready.
    Packaged,
    /// Stopped by an error.
    Failed,
    /// Stopped on request.
    Cancelled,
}

impl ExportState {
    /// Whether no further transition is possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Packaged | Self::Failed | Self::Cancelled)
    }

    /// Whether `self → next` is a legal transition.
    pub fn can_transition_to(self, next: Self) -> bool {
        use ExportState::*;
        match (self, next) {
            (from, Failed | Cancelled) => !from.is_terminal(),
            (Idle, GeneratingFrames) => true,
            (GeneratingFrames, Optimizing | Encoding | Both) => true,
            (Optimizing | Encoding | Both, Packaged) => true,
            _ => false,
        }
    }

    /// Move to `next`, rejecting illegal transitions.
    pub fn advance(&mut self, next: Self) -> CountframeResult<()> {
        if !self.can_transition_to(next) {
            return Err(CountframeError::Other(anyhow::anyhow!(
                "illegal export state transition {self:?} -> {next:?}"
            )));
        }
        tracing::debug!(from = ?*self, to = ?next, "export state");
        *self = next;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/export/state.rs"]
mod tests;
