use crate::{
    animation::ease::Ease,
    foundation::{
        core::{Fps, FrameIndex, frame_count, progress_at, timestamp_ms},
        error::{CountframeError, CountframeResult},
    },
    scene::model::CounterConfig,
};

/// Frame-indexed timing of one counter export.
///
/// Export progress `p = i / (frame_count - 1)` is mapped onto counter time via
/// `clamp(p * export_duration * speed / counter_duration, 0, 1)`, so a counter shorter than the
/// export holds its end value for the remaining frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CounterTimeline {
    fps: Fps,
    frame_count: u64,
    export_duration: f64,
    counter_duration: f64,
    speed: f64,
    start: f64,
    end: f64,
    ease: Ease,
}

/// Timing values for one frame.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct CounterSample {
    /// Frame index.
    pub index: FrameIndex,
    /// Milliseconds from export start.
    pub timestamp_ms: f64,
    /// Export progress in `[0, 1]`.
    pub progress: f64,
    /// Counter progress in `[0, 1]` (after speed and duration mapping).
    pub counter_progress: f64,
    /// Eased counter progress (may leave `[0, 1]` for elastic/back).
    pub eased: f64,
    /// Interpolated counter value.
    pub value: f64,
}

impl CounterTimeline {
    /// Build the timeline of `counter` exported at `fps` for `export_duration` seconds.
    pub fn new(counter: &CounterConfig, fps: Fps, export_duration: f64) -> CountframeResult<Self> {
        if !export_duration.is_finite() || export_duration <= 0.0 {
            return Err(CountframeError::configuration(
                "export duration must be finite and > 0",
            ));
        }
        counter.validate()?;
        Ok(Self {
            fps,
            frame_count: frame_count(fps, export_duration),
            export_duration,
            counter_duration: counter.duration,
            speed: counter.speed,
            start: counter.start,
            end: counter.end,
            ease: counter.ease,
        })
    }

    /// Total frames: `ceil(fps * export_duration)`.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Export frame rate.
    pub fn fps(&self) -> Fps {
        self.fps
    }

    /// Export duration in seconds.
    pub fn export_duration(&self) -> f64 {
        self.export_duration
    }

    /// Map export progress onto counter progress.
    pub fn counter_progress(&self, progress: f64) -> f64 {
        (progress * self.export_duration * self.speed / self.counter_duration).clamp(0.0, 1.0)
    }

    /// Timing values of frame `idx`.
    pub fn sample(&self, idx: FrameIndex) -> CounterSample {
        let progress = progress_at(idx, self.frame_count);
        let counter_progress = self.counter_progress(progress);
        let eased = self.ease.apply(counter_progress);
        CounterSample {
            index: idx,
            timestamp_ms: timestamp_ms(idx, self.fps),
            progress,
            counter_progress,
            eased,
            value: self.start + (self.end - self.start) * eased,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/counter.rs"]
mod tests;
