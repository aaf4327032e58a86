use crate::{
    encode::video::VideoCodec,
    quality::presets::{PresetId, QualityPreset, presets},
};

/// File size above which an estimate carries a warning, in megabytes.
pub const LARGE_FILE_MB: f64 = 100.0;
/// Animation length above which an estimate carries a warning, in seconds.
pub const LONG_EXPORT_SECS: f64 = 60.0;
/// Animation length above which validation recommends splitting the export, in seconds.
pub const VERY_LONG_EXPORT_SECS: f64 = 300.0;

const TRANSPARENCY_SIZE: f64 = 1.3;
const TRANSPARENCY_TIME: f64 = 1.2;
const COMPLEX_SIZE: f64 = 1.4;
const COMPLEX_TIME: f64 = 1.5;
const GIF_SIZE: f64 = 2.5;
const GIF_TIME: f64 = 0.8;
const MP4_SIZE: f64 = 0.8;

/// Delivery format an estimate is made for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetFormat {
    /// WebM video.
    #[default]
    Webm,
    /// QuickTime video.
    Mov,
    /// MP4 video (no alpha).
    Mp4,
    /// Animated GIF (1-bit alpha).
    Gif,
    /// PNG image sequence.
    PngSequence,
}

impl TargetFormat {
    fn accepts_codec(self, codec: VideoCodec) -> bool {
        match self {
            Self::Webm | Self::Mp4 => codec == VideoCodec::Vp9,
            Self::Mov => codec == VideoCodec::Prores,
            Self::Gif | Self::PngSequence => true,
        }
    }
}

/// Inputs of an estimate besides the preset.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EstimateOptions {
    /// Animation length in seconds.
    pub duration_secs: f64,
    /// Whether the output keeps an alpha channel.
    pub transparency: bool,
    /// Whether a blur-based design effect is used.
    pub complex_effects: bool,
    /// Delivery format.
    pub target: TargetFormat,
}

impl Default for EstimateOptions {
    fn default() -> Self {
        Self {
            duration_secs: 5.0,
            transparency: false,
            complex_effects: false,
            target: TargetFormat::Webm,
        }
    }
}

/// Advisory findings attached to an estimate.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum EstimateWarning {
    /// Transparency requested for a format without alpha.
    NoAlphaSupport {
        /// Offending format.
        target: TargetFormat,
    },
    /// Transparency requested for a format with on/off alpha only.
    OneBitAlpha,
    /// The preset's codec cannot be stored in the target format.
    CodecUnavailable {
        /// Preset codec.
        codec: VideoCodec,
        /// Requested format.
        target: TargetFormat,
    },
    /// Estimated output exceeds [`LARGE_FILE_MB`].
    LargeFile {
        /// Estimated size in megabytes.
        size_mb: f64,
    },
    /// Animation is longer than [`LONG_EXPORT_SECS`].
    LongExport {
        /// Animation length in seconds.
        duration_secs: f64,
    },
}

impl std::fmt::Display for EstimateWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoAlphaSupport { target } => {
                write!(f, "{target:?} does not support transparency; alpha will be lost")
            }
            Self::OneBitAlpha => {
                f.write_str("GIF only supports 1-bit transparency; edges will alias")
            }
            Self::CodecUnavailable { codec, target } => {
                write!(f, "codec {codec:?} is not available in {target:?}")
            }
            Self::LargeFile { size_mb } => {
                write!(f, "estimated file size {size_mb:.1} MB exceeds {LARGE_FILE_MB} MB")
            }
            Self::LongExport { duration_secs } => write!(
                f,
                "{duration_secs:.1}s animation exceeds {LONG_EXPORT_SECS}s; export will take a while"
            ),
        }
    }
}

/// Size and time estimate for one preset.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Estimate {
    /// Preset the estimate is for.
    pub preset: PresetId,
    /// Estimated output size in megabytes.
    pub file_size_mb: f64,
    /// Estimated export time in seconds.
    pub export_time_secs: f64,
    /// Advisory findings.
    pub warnings: Vec<EstimateWarning>,
}

/// Estimate output size and export time of `preset` under `opts`.
///
/// Never fails; unusable inputs estimate to zero and are reported by [`validate`].
pub fn estimate(preset: &QualityPreset, opts: &EstimateOptions) -> Estimate {
    let duration = if opts.duration_secs.is_finite() {
        opts.duration_secs.max(0.0)
    } else {
        0.0
    };

    let mut size = preset.size_mb_per_sec * duration;
    let mut time = duration * preset.time_multiplier;
    if opts.transparency {
        size *= TRANSPARENCY_SIZE;
        time *= TRANSPARENCY_TIME;
    }
    if opts.complex_effects {
        size *= COMPLEX_SIZE;
        time *= COMPLEX_TIME;
    }
    match opts.target {
        TargetFormat::Gif => {
            size *= GIF_SIZE;
            time *= GIF_TIME;
        }
        TargetFormat::Mp4 => size *= MP4_SIZE,
        TargetFormat::Webm | TargetFormat::Mov | TargetFormat::PngSequence => {}
    }

    let mut warnings = Vec::new();
    if opts.transparency {
        match opts.target {
            TargetFormat::Mp4 => warnings.push(EstimateWarning::NoAlphaSupport {
                target: opts.target,
            }),
            TargetFormat::Gif => warnings.push(EstimateWarning::OneBitAlpha),
            _ => {}
        }
    }
    if !opts.target.accepts_codec(preset.codec) {
        warnings.push(EstimateWarning::CodecUnavailable {
            codec: preset.codec,
            target: opts.target,
        });
    }
    if size > LARGE_FILE_MB {
        warnings.push(EstimateWarning::LargeFile { size_mb: size });
    }
    if duration > LONG_EXPORT_SECS {
        warnings.push(EstimateWarning::LongExport {
            duration_secs: duration,
        });
    }

    tracing::debug!(preset = %preset.id, size_mb = size, time_secs = time, "estimate");
    Estimate {
        preset: preset.id,
        file_size_mb: size,
        export_time_secs: time,
        warnings,
    }
}

/// Blocking issues and advice for running `preset` under `opts`.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct ValidationReport {
    /// Problems that prevent the export.
    pub issues: Vec<String>,
    /// Non-blocking advice.
    pub recommendations: Vec<String>,
}

impl ValidationReport {
    /// `true` when there are no blocking issues.
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Check `opts` against `preset`.
pub fn validate(preset: &QualityPreset, opts: &EstimateOptions) -> ValidationReport {
    let mut report = ValidationReport::default();

    if !opts.duration_secs.is_finite() || opts.duration_secs <= 0.0 {
        report.issues.push(format!(
            "duration must be a positive number of seconds, got {}",
            opts.duration_secs
        ));
    }
    if opts.transparency && opts.target == TargetFormat::Mp4 {
        report
            .issues
            .push("MP4 cannot carry transparency; choose WebM, MOV or a PNG sequence".to_owned());
    }

    let est = estimate(preset, opts);
    report
        .recommendations
        .extend(est.warnings.iter().map(ToString::to_string));
    if opts.duration_secs > VERY_LONG_EXPORT_SECS {
        report.recommendations.push(format!(
            "animations over {VERY_LONG_EXPORT_SECS}s are better split into several exports"
        ));
    }
    if opts.complex_effects && preset.id >= PresetId::High {
        report.recommendations.push(format!(
            "complex effects on the {} preset are slow; preview with draft or standard first",
            preset.id
        ));
    }
    report
}

/// Limits for [`select_optimal`]. Absent limits are not checked.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SelectionConstraints {
    /// Largest acceptable output in megabytes.
    pub max_file_size_mb: Option<f64>,
    /// Longest acceptable export in seconds.
    pub max_export_time_secs: Option<f64>,
    /// Lowest acceptable preset.
    pub min_quality: Option<PresetId>,
}

/// Highest-quality preset whose estimate satisfies `constraints`.
///
/// Falls back to the lowest-quality preset when none qualifies.
pub fn select_optimal(
    constraints: &SelectionConstraints,
    opts: &EstimateOptions,
) -> &'static QualityPreset {
    let catalog = presets();
    catalog
        .iter()
        .rev()
        .filter(|p| constraints.min_quality.is_none_or(|floor| p.id >= floor))
        .find(|p| {
            let est = estimate(p, opts);
            constraints
                .max_file_size_mb
                .is_none_or(|max| est.file_size_mb <= max)
                && constraints
                    .max_export_time_secs
                    .is_none_or(|max| est.export_time_secs <= max)
        })
        .unwrap_or(&catalog[0])
}

#[cfg(test)]
#[path = "../../tests/unit/quality/estimate.rs"]
mod tests;
