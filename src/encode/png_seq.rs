use std::io::Cursor;

use image::{
    ExtendedColorType, ImageEncoder as _, RgbaImage,
    codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder},
    imageops::{self, FilterType},
};
use rayon::prelude::*;

use crate::{
    encode::sink::{FrameSink, OrderGuard, SinkConfig},
    foundation::{
        core::{CancelToken, Canvas},
        error::{CountframeError, CountframeResult},
        math::{srgb_to_linear_u8, unpremul_rgba8},
    },
    render::frame::Frame,
};

/// Output color depth.
///
/// Serialized as the bit count: `8`, `24` or `32`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ColorFormat {
    /// RGB quantized to 3-3-2 levels; alpha kept at full precision.
    Rgb332,
    /// 24-bit RGB; alpha is dropped.
    Rgb24,
    /// 32-bit RGBA.
    #[default]
    Rgba32,
}

impl ColorFormat {
    /// Nominal bits per pixel.
    pub fn bits(self) -> u8 {
        match self {
            Self::Rgb332 => 8,
            Self::Rgb24 => 24,
            Self::Rgba32 => 32,
        }
    }

    /// Whether encoded files carry an alpha channel.
    pub fn has_alpha(self) -> bool {
        !matches!(self, Self::Rgb24)
    }
}

impl TryFrom<u8> for ColorFormat {
    type Error = CountframeError;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        match bits {
            8 => Ok(Self::Rgb332),
            24 => Ok(Self::Rgb24),
            32 => Ok(Self::Rgba32),
            other => Err(CountframeError::configuration(format!(
                "unsupported png color format {other} (expected 8, 24 or 32)"
            ))),
        }
    }
}

impl From<ColorFormat> for u8 {
    fn from(value: ColorFormat) -> Self {
        value.bits()
    }
}

/// Lossless PNG compression effort.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PngCompression {
    /// Stored deflate blocks.
    None,
    /// Fast deflate.
    #[default]
    Fast,
    /// Smallest output.
    Best,
}

impl PngCompression {
    fn encoder_params(self) -> (CompressionType, PngFilter) {
        match self {
            Self::None => (CompressionType::Uncompressed, PngFilter::NoFilter),
            Self::Fast => (CompressionType::Fast, PngFilter::Adaptive),
            Self::Best => (CompressionType::Best, PngFilter::Adaptive),
        }
    }
}

/// Transfer function applied to color channels before encoding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColorSpace {
    /// Keep sRGB-encoded values.
    #[default]
    Srgb,
    /// Decode to linear light.
    Linear,
}

/// File naming for sequence entries: `{prefix}{number:0pad}.png`.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct NamingConvention {
    /// Leading part of every file name.
    pub prefix: String,
    /// Minimum digit count of the zero-padded number.
    pub pad: usize,
    /// Number given to the first frame.
    pub start: u64,
}

impl Default for NamingConvention {
    fn default() -> Self {
        Self {
            prefix: "sequence_".to_owned(),
            pad: 4,
            start: 1,
        }
    }
}

impl NamingConvention {
    /// File name of the entry at `position` in the sequence.
    pub fn file_name(&self, position: usize) -> String {
        let n = self.start + position as u64;
        format!("{}{n:0pad$}.png", self.prefix, pad = self.pad)
    }

    fn validate(&self) -> CountframeResult<()> {
        if self.prefix.contains(['/', '\\']) {
            return Err(CountframeError::configuration(
                "png naming prefix must not contain path separators",
            ));
        }
        if self.pad > 12 {
            return Err(CountframeError::configuration("png naming pad must be <= 12"));
        }
        Ok(())
    }
}

/// PNG sequence options.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PngOptions {
    /// Output color depth.
    pub color_format: ColorFormat,
    /// Compression effort.
    pub compression: PngCompression,
    /// Channel transfer function.
    pub color_space: ColorSpace,
    /// File naming.
    pub naming: NamingConvention,
}

impl PngOptions {
    /// Validate naming rules.
    pub fn validate(&self) -> CountframeResult<()> {
        self.naming.validate()
    }
}

/// One encoded sequence entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PngFile {
    /// File name inside the archive.
    pub name: String,
    /// PNG bytes.
    pub bytes: Vec<u8>,
}

/// Summary of an optimized sequence, written next to the files as `metadata.json`.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PngSequenceMetadata {
    /// Number of files.
    pub frame_count: usize,
    /// Canonical width of every file.
    pub width: u32,
    /// Canonical height of every file.
    pub height: u32,
    /// Always `"png"`.
    pub format: String,
    /// Sum of all file sizes in bytes.
    pub total_bytes: u64,
    /// Frames whose dimensions differed from the first frame and were resized.
    pub resized_frames: usize,
    /// Options the files were encoded with.
    pub options: PngOptions,
}

/// Optimized PNG sequence: one file per input frame, in input order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PngSequence {
    /// Encoded files.
    pub files: Vec<PngFile>,
    /// Sequence summary.
    pub metadata: PngSequenceMetadata,
}

/// Normalizes, color-reduces and encodes frames into a PNG sequence.
#[derive(Clone, Debug, Default)]
pub struct PngSequenceOptimizer {
    opts: PngOptions,
    cancel: Vec<CancelToken>,
}

impl PngSequenceOptimizer {
    /// Create an optimizer, validating `opts`.
    pub fn new(opts: PngOptions) -> CountframeResult<Self> {
        opts.validate()?;
        Ok(Self {
            opts,
            cancel: Vec::new(),
        })
    }

    /// Stop encoding once `token` is raised. May be called more than once.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel.push(token);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.iter().any(CancelToken::is_cancelled)
    }

    /// Options in effect.
    pub fn options(&self) -> &PngOptions {
        &self.opts
    }

    /// Encode `frames` in parallel.
    ///
    /// The first frame fixes the canonical dimensions; frames of any other size are resized to
    /// them, never dropped. A raised cancel token is checked before each frame and turns the
    /// result into an [`CountframeError::Encoding`].
    #[tracing::instrument(level = "debug", skip_all, fields(frames = frames.len()))]
    pub fn optimize(&self, frames: &[Frame]) -> CountframeResult<PngSequence> {
        let Some(first) = frames.first() else {
            return Err(CountframeError::configuration(
                "png sequence needs at least one frame",
            ));
        };
        let canvas = first.canvas();

        let resized_frames = frames.iter().filter(|f| f.canvas() != canvas).count();

        let files = frames
            .par_iter()
            .enumerate()
            .map(|(position, frame)| {
                if self.is_cancelled() {
                    return Err(CountframeError::encoding("png sequence encoding cancelled"));
                }
                let bytes = self.encode_frame(frame, canvas)?;
                Ok(PngFile {
                    name: self.opts.naming.file_name(position),
                    bytes,
                })
            })
            .collect::<CountframeResult<Vec<_>>>()?;

        let total_bytes = files.iter().map(|f| f.bytes.len() as u64).sum();
        tracing::debug!(total_bytes, resized_frames, "png sequence encoded");

        Ok(PngSequence {
            metadata: PngSequenceMetadata {
                frame_count: files.len(),
                width: canvas.width,
                height: canvas.height,
                format: "png".to_owned(),
                total_bytes,
                resized_frames,
                options: self.opts.clone(),
            },
            files,
        })
    }

    /// Encode one frame at `canvas` dimensions.
    pub fn encode_frame(&self, frame: &Frame, canvas: Canvas) -> CountframeResult<Vec<u8>> {
        let premul = if frame.canvas() == canvas {
            std::borrow::Cow::Borrowed(frame.data())
        } else {
            tracing::warn!(
                frame = frame.index().0,
                got_w = frame.width(),
                got_h = frame.height(),
                want_w = canvas.width,
                want_h = canvas.height,
                "frame size differs from sequence; resizing"
            );
            std::borrow::Cow::Owned(resize_rgba8(frame, canvas)?)
        };

        let mut rgba = unpremul_rgba8(&premul);
        if self.opts.color_space == ColorSpace::Linear {
            apply_linear_transfer(&mut rgba);
        }

        let (pixels, color) = match self.opts.color_format {
            ColorFormat::Rgba32 => (rgba, ExtendedColorType::Rgba8),
            ColorFormat::Rgb332 => {
                quantize_rgb332(&mut rgba);
                (rgba, ExtendedColorType::Rgba8)
            }
            ColorFormat::Rgb24 => (drop_alpha(&rgba), ExtendedColorType::Rgb8),
        };

        let (compression, filter) = self.opts.compression.encoder_params();
        let mut out = Cursor::new(Vec::new());
        PngEncoder::new_with_quality(&mut out, compression, filter)
            .write_image(&pixels, canvas.width, canvas.height, color)
            .map_err(|e| {
                CountframeError::encoding(format!(
                    "png encode of frame {} failed: {e}",
                    frame.index().0
                ))
            })?;
        Ok(out.into_inner())
    }
}

/// Bilinear resize of a frame's premultiplied pixels.
fn resize_rgba8(frame: &Frame, canvas: Canvas) -> CountframeResult<Vec<u8>> {
    let img = RgbaImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
        .ok_or_else(|| CountframeError::render("frame buffer does not match its dimensions"))?;
    Ok(imageops::resize(&img, canvas.width, canvas.height, FilterType::Triangle).into_raw())
}

fn apply_linear_transfer(rgba: &mut [u8]) {
    let lut: [u8; 256] = std::array::from_fn(|i| srgb_to_linear_u8(i as u8));
    for px in rgba.chunks_exact_mut(4) {
        px[0] = lut[px[0] as usize];
        px[1] = lut[px[1] as usize];
        px[2] = lut[px[2] as usize];
    }
}

/// Snap a channel to one of `levels` evenly spaced values.
fn quantize_channel(c: u8, levels: u16) -> u8 {
    let steps = levels - 1;
    let q = (u16::from(c) * steps + 127) / 255;
    ((q * 255 + steps / 2) / steps) as u8
}

fn quantize_rgb332(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        px[0] = quantize_channel(px[0], 8);
        px[1] = quantize_channel(px[1], 8);
        px[2] = quantize_channel(px[2], 4);
    }
}

fn drop_alpha(rgba: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(rgba.len() / 4 * 3);
    for px in rgba.chunks_exact(4) {
        out.extend_from_slice(&px[..3]);
    }
    out
}

/// Buffers pushed frames and optimizes them into a [`PngSequence`] on `end`.
#[derive(Debug)]
pub struct PngSequenceSink {
    optimizer: PngSequenceOptimizer,
    order: OrderGuard,
    frames: Vec<Frame>,
    started: bool,
    output: Option<PngSequence>,
}

impl PngSequenceSink {
    /// Create a sink that encodes with `opts`.
    pub fn new(opts: PngOptions) -> CountframeResult<Self> {
        Ok(Self {
            optimizer: PngSequenceOptimizer::new(opts)?,
            order: OrderGuard::default(),
            frames: Vec::new(),
            started: false,
            output: None,
        })
    }

    /// Take the sequence produced by `end`.
    pub fn take_sequence(&mut self) -> Option<PngSequence> {
        self.output.take()
    }
}

impl FrameSink for PngSequenceSink {
    fn begin(&mut self, cfg: SinkConfig) -> CountframeResult<()> {
        cfg.validate()?;
        self.order.reset();
        self.frames.clear();
        self.frames.reserve(usize::try_from(cfg.frame_count).unwrap_or(0));
        self.output = None;
        self.started = true;
        Ok(())
    }

    fn push_frame(&mut self, frame: &Frame) -> CountframeResult<()> {
        if !self.started {
            return Err(CountframeError::encoding("png sink not started"));
        }
        self.order.accept(frame.index())?;
        self.frames.push(frame.clone());
        Ok(())
    }

    fn end(&mut self) -> CountframeResult<()> {
        if !self.started {
            return Err(CountframeError::encoding("png sink not started"));
        }
        let frames = std::mem::take(&mut self.frames);
        self.started = false;
        self.output = Some(self.optimizer.optimize(&frames)?);
        Ok(())
    }

    fn abort(&mut self) {
        self.frames.clear();
        self.started = false;
        self.output = None;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/png_seq.rs"]
mod tests;
