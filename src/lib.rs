//! countframe renders animated number counters and exports them as PNG sequences and alpha
//! videos.
//!
//! The pipeline is deterministic: an [`ExportJob`] fixes the counter, its easing and digit
//! transitions, the design effect and the output format. An [`ExportSession`] then
//!
//! - evaluates each frame ([`Evaluator`]) and renders it on the CPU ([`CpuBackend`]),
//! - packs the frames into a [`PngSequence`] and/or streams them through `ffmpeg` into an
//!   [`EncodedVideo`],
//! - reports progress through a [`ProgressSink`] and stops cooperatively on a [`CancelToken`].
//!
//! [`estimate`], [`validate`] and [`select_optimal`] advise on [`QualityPreset`]s before an
//! export starts.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

pub(crate) mod animation;
pub(crate) mod effects;
pub(crate) mod encode;
pub(crate) mod eval;
pub(crate) mod export;
pub(crate) mod quality;
pub(crate) mod render;
pub(crate) mod scene;

pub use crate::foundation::core::{
    Affine, CancelToken, Canvas, Fps, FrameIndex, Point, Rect, Rgba8, Rgba8Premul,
    SUPPORTED_FRAME_RATES, Vec2, frame_count, progress_at, timestamp_ms,
};
pub use crate::foundation::error::{CountframeError, CountframeResult};

pub use crate::animation::counter::{CounterSample, CounterTimeline};
pub use crate::animation::digits::{
    BlockTrack, DigitColumn, DigitTrack, DigitTransform, DigitTransitionConfig,
    DigitTransitionKind, LayerRole, SlotLayer, TransformOrigin, TransitionSlot,
};
pub use crate::animation::ease::Ease;
pub use crate::encode::ffmpeg::{
    FFMPEG_ENV, FfmpegAlphaEncoder, available_encoders, ffmpeg_binary, is_ffmpeg_on_path,
};
pub use crate::encode::png_seq::{
    ColorFormat, ColorSpace, NamingConvention, PngCompression, PngFile, PngOptions, PngSequence,
    PngSequenceMetadata, PngSequenceOptimizer, PngSequenceSink,
};
pub use crate::encode::sink::{FrameSink, InMemorySink, SinkConfig};
pub use crate::encode::video::{
    Container, EncodedVideo, PixelFormat, VideoCodec, VideoEncoder, VideoMetadata, VideoOptions,
    encode_alpha_video, encode_blocking,
};
pub use crate::eval::evaluator::{Evaluator, FrameState, GlyphLayers};
pub use crate::export::archive::{
    METADATA_FILE, WrittenArtifacts, ensure_parent_dir, png_archive_bytes, write_artifacts,
};
pub use crate::export::job::{ExportJob, OutputFormat};
pub use crate::export::progress::{NullProgress, ProgressSink, TracingProgress};
pub use crate::export::session::{ExportArtifacts, ExportOutcome, ExportSession};
pub use crate::export::state::ExportState;
pub use crate::quality::estimate::{
    Estimate, EstimateOptions, EstimateWarning, LARGE_FILE_MB, LONG_EXPORT_SECS,
    SelectionConstraints, TargetFormat, VERY_LONG_EXPORT_SECS, ValidationReport, estimate,
    select_optimal, validate,
};
pub use crate::quality::presets::{PresetId, QualityPreset, presets};
pub use crate::render::backend::{BackendKind, RenderBackend, RenderSettings, create_backend};
pub use crate::render::cpu::CpuBackend;
pub use crate::render::frame::Frame;
pub use crate::scene::format::format_number;
pub use crate::scene::model::{
    Background, CounterConfig, DesignEffect, DigitLayout, FontSpec, GradientStop, MAX_DECIMALS,
    NumberFormat, Separator, TextOverlayConfig,
};
