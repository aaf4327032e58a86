use std::str::FromStr;

use crate::{
    encode::video::{VideoCodec, VideoOptions},
    foundation::{
        core::{Canvas, Fps},
        error::{CountframeError, CountframeResult},
    },
};

/// Preset identifiers, ordered from lowest to highest quality.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum PresetId {
    /// Fast previews.
    Draft,
    /// Everyday full-HD exports.
    Standard,
    /// High frame rate with an intra-frame codec.
    High,
    /// 4K mastering.
    Ultra,
}

impl PresetId {
    /// All identifiers, lowest quality first.
    pub const ALL: [PresetId; 4] = [Self::Draft, Self::Standard, Self::High, Self::Ultra];

    /// Lowercase identifier.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Standard => "standard",
            Self::High => "high",
            Self::Ultra => "ultra",
        }
    }

    /// Catalog entry for this identifier.
    pub fn preset(self) -> &'static QualityPreset {
        &PRESETS[self as usize]
    }
}

impl std::fmt::Display for PresetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PresetId {
    type Err = CountframeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|id| id.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                CountframeError::configuration(format!(
                    "unknown preset \"{s}\" (expected draft, standard, high or ultra)"
                ))
            })
    }
}

/// One catalog entry with its empirical estimation constants.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct QualityPreset {
    /// Identifier.
    pub id: PresetId,
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Frame rate.
    pub frame_rate: u32,
    /// Video bitrate in megabits per second.
    pub bitrate_mbps: f64,
    /// Video codec.
    pub codec: VideoCodec,
    /// Megabytes of output per second of animation.
    pub size_mb_per_sec: f64,
    /// Export seconds per second of animation.
    pub time_multiplier: f64,
    /// When to pick this preset.
    pub notes: &'static str,
}

impl QualityPreset {
    /// Output dimensions.
    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.width,
            height: self.height,
        }
    }

    /// Frame rate as [`Fps`].
    pub fn fps(&self) -> CountframeResult<Fps> {
        Fps::export(self.frame_rate)
    }

    /// Video options matching this preset; other options keep their defaults.
    pub fn video_options(&self) -> VideoOptions {
        VideoOptions {
            codec: self.codec,
            bitrate_mbps: self.bitrate_mbps,
            ..VideoOptions::default()
        }
    }
}

static PRESETS: [QualityPreset; 4] = [
    QualityPreset {
        id: PresetId::Draft,
        width: 1280,
        height: 720,
        frame_rate: 24,
        bitrate_mbps: 2.0,
        codec: VideoCodec::Vp9,
        size_mb_per_sec: 0.25,
        time_multiplier: 0.5,
        notes: "Quick previews and drafts; small files, fast to render.",
    },
    QualityPreset {
        id: PresetId::Standard,
        width: 1920,
        height: 1080,
        frame_rate: 30,
        bitrate_mbps: 8.0,
        codec: VideoCodec::Vp9,
        size_mb_per_sec: 1.0,
        time_multiplier: 1.0,
        notes: "Web and social video overlays.",
    },
    QualityPreset {
        id: PresetId::High,
        width: 1920,
        height: 1080,
        frame_rate: 60,
        bitrate_mbps: 16.0,
        codec: VideoCodec::Prores,
        size_mb_per_sec: 2.5,
        time_multiplier: 2.0,
        notes: "Smooth motion for editing timelines; ProRes 4444 keeps alpha lossless-ish.",
    },
    QualityPreset {
        id: PresetId::Ultra,
        width: 3840,
        height: 2160,
        frame_rate: 60,
        bitrate_mbps: 50.0,
        codec: VideoCodec::Prores,
        size_mb_per_sec: 8.0,
        time_multiplier: 4.0,
        notes: "4K broadcast and mastering; large files and long exports.",
    },
];

/// The immutable preset catalog, lowest quality first.
pub fn presets() -> &'static [QualityPreset] {
    &PRESETS
}

#[cfg(test)]
#[path = "../../tests/unit/quality/presets.rs"]
mod tests;
