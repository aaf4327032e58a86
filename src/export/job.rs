use std::{fs::File, io::BufReader, path::Path};

use anyhow::Context as _;

use crate::{
    encode::{
        png_seq::PngOptions,
        sink::SinkConfig,
        video::{Container, VideoOptions},
    },
    foundation::{
        core::{Canvas, Fps, frame_count},
        error::{CountframeError, CountframeResult},
    },
    quality::estimate::{EstimateOptions, TargetFormat},
    render::backend::RenderSettings,
    scene::model::{Background, CounterConfig, TextOverlayConfig},
};

/// Which artifacts an export produces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// Zipped PNG image sequence.
    #[default]
    PngSequence,
    /// Single video file with an alpha channel.
    AlphaVideo,
    /// Both of the above from the same frames.
    Both,
}

impl OutputFormat {
    /// Whether a PNG sequence is produced.
    pub fn wants_png(self) -> bool {
        matches!(self, Self::PngSequence | Self::Both)
    }

    /// Whether a video is produced.
    pub fn wants_video(self) -> bool {
        matches!(self, Self::AlphaVideo | Self::Both)
    }
}

/// One export request. Created once and run to completion, failure or cancellation.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ExportJob {
    /// Artifacts to produce.
    pub format: OutputFormat,
    /// Base width in pixels.
    pub width: u32,
    /// Base height in pixels.
    pub height: u32,
    /// Multiplier applied to width, height, font sizes and offsets.
    pub scale: f64,
    /// Frames per second, one of [`crate::SUPPORTED_FRAME_RATES`].
    pub frame_rate: u32,
    /// Export length in seconds.
    pub duration: f64,
    /// Frame background.
    pub background: Background,
    /// Counter settings.
    pub counter: CounterConfig,
    /// Optional overlay text.
    pub overlay: Option<TextOverlayConfig>,
    /// PNG sequence options.
    pub png: PngOptions,
    /// Video options.
    pub video: VideoOptions,
}

impl Default for ExportJob {
    fn default() -> Self {
        Self {
            format: OutputFormat::PngSequence,
            width: 1920,
            height: 1080,
            scale: 1.0,
            frame_rate: 30,
            duration: 5.0,
            background: Background::Transparent,
            counter: CounterConfig::default(),
            overlay: None,
            png: PngOptions::default(),
            video: VideoOptions::default(),
        }
    }
}

impl ExportJob {
    /// Parse a job from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> CountframeResult<Self> {
        serde_json::from_reader(r)
            .map_err(|e| CountframeError::serde(format!("parse export job JSON: {e}")))
    }

    /// Parse a job from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> CountframeResult<Self> {
        let path = path.as_ref();
        let f = File::open(path)
            .with_context(|| format!("open export job JSON '{}'", path.display()))?;
        Self::from_reader(BufReader::new(f))
    }

    /// Serialize as pretty JSON.
    pub fn to_json(&self) -> CountframeResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| CountframeError::serde(format!("serialize export job: {e}")))
    }

    /// Check everything that can be checked before rendering.
    pub fn validate(&self) -> CountframeResult<()> {
        self.fps()?;
        if !self.duration.is_finite() || self.duration <= 0.0 {
            return Err(CountframeError::configuration(
                "duration must be finite and > 0",
            ));
        }
        self.render_settings()?.validate()?;
        self.counter.validate()?;
        if let Some(overlay) = &self.overlay {
            overlay.validate()?;
        }
        if self.format.wants_png() {
            self.png.validate()?;
        }
        if self.format.wants_video() {
            self.video.validate()?;
        }
        Ok(())
    }

    /// Export frame rate.
    pub fn fps(&self) -> CountframeResult<Fps> {
        Fps::export(self.frame_rate)
    }

    /// Output dimensions: `width × scale` by `height × scale`, rounded.
    pub fn effective_canvas(&self) -> CountframeResult<Canvas> {
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(CountframeError::configuration(
                "scale must be finite and > 0",
            ));
        }
        let dim = |base: u32| -> CountframeResult<u32> {
            let scaled = (f64::from(base) * self.scale).round();
            if scaled < 1.0 || scaled > f64::from(u16::MAX) {
                return Err(CountframeError::configuration(format!(
                    "scaled dimension {scaled} must be within 1..={}",
                    u16::MAX
                )));
            }
            Ok(scaled as u32)
        };
        Ok(Canvas {
            width: dim(self.width)?,
            height: dim(self.height)?,
        })
    }

    /// `ceil(frame_rate × duration)`.
    pub fn frame_count(&self) -> CountframeResult<u64> {
        Ok(frame_count(self.fps()?, self.duration))
    }

    /// Backend settings for this job.
    pub fn render_settings(&self) -> CountframeResult<RenderSettings> {
        Ok(RenderSettings {
            canvas: self.effective_canvas()?,
            scale: self.scale,
            background: self.background,
            font: self.counter.font.clone(),
            effect: self.counter.effect.clone(),
            overlay: self.overlay.clone(),
        })
    }

    /// Configuration handed to frame sinks.
    pub fn sink_config(&self) -> CountframeResult<SinkConfig> {
        let canvas = self.effective_canvas()?;
        Ok(SinkConfig {
            width: canvas.width,
            height: canvas.height,
            fps: self.fps()?,
            frame_count: self.frame_count()?,
        })
    }

    /// Estimation inputs matching this job.
    ///
    /// For [`OutputFormat::Both`] the video target is used since it dominates size and time.
    pub fn estimate_options(&self) -> EstimateOptions {
        let target = if self.format.wants_video() {
            match self.video.resolved_container() {
                Container::Webm => TargetFormat::Webm,
                Container::Mov => TargetFormat::Mov,
            }
        } else {
            TargetFormat::PngSequence
        };
        EstimateOptions {
            duration_secs: self.duration,
            transparency: self.background.is_transparent(),
            complex_effects: self.counter.effect.is_complex(),
            target,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/export/job.rs"]
mod tests;
