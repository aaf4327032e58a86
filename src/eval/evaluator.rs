use crate::{
    animation::{
        counter::{CounterSample, CounterTimeline},
        digits::{BlockTrack, DigitColumn, DigitTrack, SlotLayer},
    },
    foundation::{
        core::{Fps, FrameIndex},
        error::{CountframeError, CountframeResult},
    },
    scene::model::{CounterConfig, DigitLayout, NumberFormat},
};

/// Evaluated, backend-agnostic state of one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameState {
    /// Timing and counter value.
    pub sample: CounterSample,
    /// Formatted counter text.
    pub text: String,
    /// Glyph layers to draw.
    pub glyphs: GlyphLayers,
}

impl FrameState {
    /// Frame index.
    pub fn index(&self) -> FrameIndex {
        self.sample.index
    }
}

/// Drawable glyph layers, shaped by the digit layout mode.
#[derive(Clone, Debug, PartialEq)]
pub enum GlyphLayers {
    /// One column per character position, left to right.
    PerDigit(Vec<DigitColumn>),
    /// Whole-string layers, exiting first.
    Block(Vec<SlotLayer<String>>),
}

#[derive(Clone, Debug)]
enum Track {
    PerDigit(DigitTrack),
    Block(BlockTrack),
}

impl Track {
    fn new(counter: &CounterConfig) -> Self {
        match counter.layout {
            DigitLayout::PerDigit => Self::PerDigit(DigitTrack::new(counter.transition)),
            DigitLayout::SingleBlock => Self::Block(BlockTrack::new(counter.transition)),
        }
    }

    fn update(&mut self, text: &str, now_ms: f64) {
        match self {
            Self::PerDigit(t) => t.update(text, now_ms),
            Self::Block(t) => t.update(text, now_ms),
        }
    }

    fn sample(&self, now_ms: f64) -> GlyphLayers {
        match self {
            Self::PerDigit(t) => GlyphLayers::PerDigit(t.sample(now_ms)),
            Self::Block(t) => GlyphLayers::Block(t.sample(now_ms)),
        }
    }
}

/// Frame-indexed evaluator.
///
/// Digit transitions depend on every earlier value change, so the track is stepped through
/// frames in order. Requesting a frame before the last evaluated one resets and replays from
/// frame 0; the result for frame `i` only depends on `i` and the configuration.
#[derive(Clone, Debug)]
pub struct Evaluator {
    timeline: CounterTimeline,
    format: NumberFormat,
    initial: Track,
    track: Track,
    next: u64,
}

impl Evaluator {
    /// Build an evaluator for `counter` exported at `fps` for `export_duration` seconds.
    pub fn new(counter: &CounterConfig, fps: Fps, export_duration: f64) -> CountframeResult<Self> {
        let timeline = CounterTimeline::new(counter, fps, export_duration)?;
        let track = Track::new(counter);
        Ok(Self {
            timeline,
            format: counter.format.clone(),
            initial: track.clone(),
            track,
            next: 0,
        })
    }

    /// Timing of the export.
    pub fn timeline(&self) -> &CounterTimeline {
        &self.timeline
    }

    /// Total number of frames.
    pub fn frame_count(&self) -> u64 {
        self.timeline.frame_count()
    }

    /// Evaluate frame `idx`.
    #[tracing::instrument(level = "trace", skip(self))]
    pub fn eval_frame(&mut self, idx: FrameIndex) -> CountframeResult<FrameState> {
        if idx.0 >= self.timeline.frame_count() {
            return Err(CountframeError::configuration(format!(
                "frame {} is out of bounds (frame count {})",
                idx.0,
                self.timeline.frame_count()
            )));
        }
        if idx.0 < self.next {
            self.track = self.initial.clone();
            self.next = 0;
        }
        while self.next <= idx.0 {
            let s = self.timeline.sample(FrameIndex(self.next));
            let text = self.format.format(s.value);
            self.track.update(&text, s.timestamp_ms);
            self.next += 1;
        }

        let sample = self.timeline.sample(idx);
        Ok(FrameState {
            text: self.format.format(sample.value),
            glyphs: self.track.sample(sample.timestamp_ms),
            sample,
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/eval/evaluator.rs"]
mod tests;
