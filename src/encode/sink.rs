use crate::{
    foundation::{
        core::{Canvas, Fps, FrameIndex},
        error::{CountframeError, CountframeResult},
    },
    render::frame::Frame,
};

/// Configuration provided to a [`FrameSink`] before the first frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SinkConfig {
    /// Width of every frame in pixels.
    pub width: u32,
    /// Height of every frame in pixels.
    pub height: u32,
    /// Export frame rate.
    pub fps: Fps,
    /// Number of frames the producer will push.
    pub frame_count: u64,
}

impl SinkConfig {
    /// Frame dimensions as a [`Canvas`].
    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.width,
            height: self.height,
        }
    }

    /// Playback length of `frame_count` frames in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.fps.frames_to_secs(self.frame_count)
    }

    /// Reject empty dimensions and empty exports.
    pub fn validate(&self) -> CountframeResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(CountframeError::configuration(
                "sink width/height must be non-zero",
            ));
        }
        if self.frame_count == 0 {
            return Err(CountframeError::configuration(
                "sink frame_count must be non-zero",
            ));
        }
        Ok(())
    }
}

/// Sink contract for consuming rendered frames in timeline order.
///
/// Ordering contract: `push_frame` is called in strictly increasing [`FrameIndex`] order, between
/// one `begin` and one `end`. After a failure or cancellation the producer calls `abort` instead
/// of `end`.
pub trait FrameSink: Send {
    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: SinkConfig) -> CountframeResult<()>;
    /// Push one frame.
    fn push_frame(&mut self, frame: &Frame) -> CountframeResult<()>;
    /// Called once after the last frame is pushed.
    fn end(&mut self) -> CountframeResult<()>;
    /// Release everything acquired since `begin` without producing output.
    fn abort(&mut self) {}
}

/// Tracks the ordering contract shared by all sinks.
#[derive(Debug, Default)]
pub(crate) struct OrderGuard {
    last: Option<FrameIndex>,
}

impl OrderGuard {
    pub(crate) fn reset(&mut self) {
        self.last = None;
    }

    pub(crate) fn accept(&mut self, idx: FrameIndex) -> CountframeResult<()> {
        if let Some(last) = self.last
            && idx <= last
        {
            return Err(CountframeError::encoding(format!(
                "out-of-order frame index {} after {}",
                idx.0, last.0
            )));
        }
        self.last = Some(idx);
        Ok(())
    }
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    order: OrderGuard,
    frames: Vec<Frame>,
}

impl InMemorySink {
    /// Create a new in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg
    }

    /// Captured frames in timeline order.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Take ownership of the captured frames.
    pub fn into_frames(self) -> Vec<Frame> {
        self.frames
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> CountframeResult<()> {
        cfg.validate()?;
        self.cfg = Some(cfg);
        self.order.reset();
        self.frames.clear();
        Ok(())
    }

    fn push_frame(&mut self, frame: &Frame) -> CountframeResult<()> {
        if self.cfg.is_none() {
            return Err(CountframeError::encoding("in-memory sink not started"));
        }
        self.order.accept(frame.index())?;
        self.frames.push(frame.clone());
        Ok(())
    }

    fn end(&mut self) -> CountframeResult<()> {
        Ok(())
    }

    fn abort(&mut self) {
        self.frames.clear();
        self.cfg = None;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/sink.rs"]
mod tests;
