use std::{sync::Arc, time::Duration};

use crate::{
    encode::sink::{FrameSink, SinkConfig},
    foundation::{
        core::{CancelOnDrop, CancelToken},
        error::{CountframeError, CountframeResult},
    },
    render::frame::Frame,
};

/// Alpha-capable video codecs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VideoCodec {
    /// VP9 with alpha, normally in WebM.
    #[default]
    Vp9,
    /// ProRes 4444, normally in QuickTime.
    Prores,
}

impl VideoCodec {
    /// Name of the ffmpeg encoder implementing this codec.
    pub fn ffmpeg_encoder(self) -> &'static str {
        match self {
            Self::Vp9 => "libvpx-vp9",
            Self::Prores => "prores_ks",
        }
    }

    /// Container used when none is requested.
    pub fn default_container(self) -> Container {
        match self {
            Self::Vp9 => Container::Webm,
            Self::Prores => Container::Mov,
        }
    }

    /// Alpha pixel format used when none is requested.
    pub fn default_pixel_format(self) -> PixelFormat {
        match self {
            Self::Vp9 => PixelFormat::Yuva420p,
            Self::Prores => PixelFormat::Yuva444p10le,
        }
    }
}

/// Output container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Container {
    /// WebM (Matroska subset).
    Webm,
    /// QuickTime.
    Mov,
}

impl Container {
    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Webm => "webm",
            Self::Mov => "mov",
        }
    }

    /// Whether this container can carry `codec` with its alpha plane.
    pub fn accepts(self, codec: VideoCodec) -> bool {
        matches!(
            (self, codec),
            (Self::Webm, VideoCodec::Vp9) | (Self::Mov, VideoCodec::Prores)
        )
    }
}

/// Pixel formats with an alpha plane.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    /// 8-bit 4:2:0 with alpha.
    Yuva420p,
    /// 10-bit 4:4:4 with alpha.
    Yuva444p10le,
}

impl PixelFormat {
    /// ffmpeg `-pix_fmt` value.
    pub fn ffmpeg_name(self) -> &'static str {
        match self {
            Self::Yuva420p => "yuva420p",
            Self::Yuva444p10le => "yuva444p10le",
        }
    }

    /// Whether `codec` can encode this pixel format.
    pub fn supported_by(self, codec: VideoCodec) -> bool {
        codec.default_pixel_format() == self
    }
}

/// Alpha-video encoding options.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct VideoOptions {
    /// Codec.
    pub codec: VideoCodec,
    /// Container; derived from the codec when absent.
    pub container: Option<Container>,
    /// Target bitrate in megabits per second.
    pub bitrate_mbps: f64,
    /// Run a first analysis pass before encoding.
    pub two_pass: bool,
    /// Pixel format; derived from the codec when absent.
    pub pixel_format: Option<PixelFormat>,
    /// Frames between keyframes (`-g`).
    pub keyframe_interval: Option<u32>,
    /// Seconds allowed on top of the video duration before encoding times out.
    pub timeout_margin_secs: u64,
}

impl Default for VideoOptions {
    fn default() -> Self {
        Self {
            codec: VideoCodec::Vp9,
            container: None,
            bitrate_mbps: 8.0,
            two_pass: false,
            pixel_format: None,
            keyframe_interval: None,
            timeout_margin_secs: 120,
        }
    }
}

impl VideoOptions {
    /// Container in effect.
    pub fn resolved_container(&self) -> Container {
        self.container.unwrap_or_else(|| self.codec.default_container())
    }

    /// Pixel format in effect.
    pub fn resolved_pixel_format(&self) -> PixelFormat {
        self.pixel_format.unwrap_or_else(|| self.codec.default_pixel_format())
    }

    /// Bitrate in bits per second.
    pub fn bitrate_bps(&self) -> u64 {
        (self.bitrate_mbps * 1_000_000.0).round() as u64
    }

    /// Options of the fallback attempt: default codec and container, everything else kept.
    pub fn fallback(&self) -> Self {
        Self {
            codec: VideoCodec::default(),
            container: None,
            pixel_format: None,
            ..self.clone()
        }
    }

    /// Whether these options already describe the fallback codec and container.
    pub fn is_fallback(&self) -> bool {
        self.codec == VideoCodec::default()
            && self.resolved_container() == VideoCodec::default().default_container()
    }

    /// Reject bad bitrates and pixel formats the codec cannot produce.
    ///
    /// Codec/container mismatches are not rejected here; they trigger the encoder fallback.
    pub fn validate(&self) -> CountframeResult<()> {
        if !self.bitrate_mbps.is_finite() || self.bitrate_mbps <= 0.0 {
            return Err(CountframeError::configuration(
                "video bitrate_mbps must be finite and > 0",
            ));
        }
        if let Some(pix) = self.pixel_format
            && !pix.supported_by(self.codec)
        {
            return Err(CountframeError::configuration(format!(
                "pixel format {} is not supported by codec {:?}",
                pix.ffmpeg_name(),
                self.codec
            )));
        }
        if self.keyframe_interval == Some(0) {
            return Err(CountframeError::configuration(
                "video keyframe_interval must be > 0",
            ));
        }
        Ok(())
    }
}

/// Summary of an encoded video.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VideoMetadata {
    /// Codec used.
    pub codec: VideoCodec,
    /// Container used.
    pub container: Container,
    /// Target bitrate in bits per second.
    pub bitrate_bps: u64,
    /// Pixel format used.
    pub pixel_format: PixelFormat,
    /// Playback length in seconds.
    pub duration_secs: f64,
    /// Encoded size in bytes.
    pub byte_size: u64,
    /// Number of encoded frames.
    pub frame_count: u64,
    /// Whether the requested codec was replaced by the fallback.
    pub fallback_used: bool,
}

/// Encoded video blob.
#[derive(Clone, Debug, PartialEq)]
pub struct EncodedVideo {
    /// Container bytes.
    pub bytes: Vec<u8>,
    /// Encoding summary.
    pub metadata: VideoMetadata,
}

impl EncodedVideo {
    /// Download name, `counter-{YYYYMMDD-HHMMSS}.{ext}`.
    pub fn file_name<Tz>(&self, at: &chrono::DateTime<Tz>) -> String
    where
        Tz: chrono::TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        format!(
            "counter-{}.{}",
            at.format("%Y%m%d-%H%M%S"),
            self.metadata.container.extension()
        )
    }
}

/// Recording facility that turns a frame stream into an alpha video.
pub trait VideoEncoder: FrameSink {
    /// Whether this encoder can produce `codec` inside `container`.
    fn supports(&self, codec: VideoCodec, container: Container) -> bool;

    /// Take the video produced by a successful `end`.
    fn take_output(&mut self) -> CountframeResult<EncodedVideo>;

    /// Token that, once raised, makes blocking calls give up and release the encoder's resources.
    fn set_interrupt(&mut self, _token: CancelToken) {}
}

/// Stream `frames` through an encoder built by `make`, falling back once to VP9/WebM.
///
/// Blocking. Stops at the first frame boundary after `cancel` or `stop` is raised, aborting the
/// encoder.
pub fn encode_blocking<E, F>(
    make: &F,
    frames: &[Frame],
    cfg: SinkConfig,
    opts: &VideoOptions,
    cancel: &CancelToken,
    stop: &CancelToken,
) -> CountframeResult<EncodedVideo>
where
    E: VideoEncoder,
    F: Fn(&VideoOptions) -> CountframeResult<E>,
{
    opts.validate()?;
    cfg.validate()?;
    if frames.len() as u64 != cfg.frame_count {
        return Err(CountframeError::encoding(format!(
            "encoder expects {} frames, got {}",
            cfg.frame_count,
            frames.len()
        )));
    }

    match encode_attempt(make, frames, cfg, opts, cancel, stop) {
        Err(CountframeError::Encoding(reason))
            if !opts.is_fallback() && !cancel.is_cancelled() && !stop.is_cancelled() =>
        {
            let fallback = opts.fallback();
            tracing::warn!(
                requested = ?opts.codec,
                container = ?opts.resolved_container(),
                %reason,
                "video encoding failed; retrying with vp9/webm"
            );
            let mut video = encode_attempt(make, frames, cfg, &fallback, cancel, stop)?;
            video.metadata.fallback_used = true;
            Ok(video)
        }
        other => other,
    }
}

fn encode_attempt<E, F>(
    make: &F,
    frames: &[Frame],
    cfg: SinkConfig,
    opts: &VideoOptions,
    cancel: &CancelToken,
    stop: &CancelToken,
) -> CountframeResult<EncodedVideo>
where
    E: VideoEncoder,
    F: Fn(&VideoOptions) -> CountframeResult<E>,
{
    let mut encoder = make(opts)?;
    encoder.set_interrupt(stop.clone());
    let container = opts.resolved_container();
    if !encoder.supports(opts.codec, container) {
        return Err(CountframeError::encoding(format!(
            "codec {:?} in {:?} is not available",
            opts.codec, container
        )));
    }

    encoder.begin(cfg)?;
    for frame in frames {
        if cancel.is_cancelled() || stop.is_cancelled() {
            encoder.abort();
            return Err(CountframeError::encoding("video encoding cancelled"));
        }
        if let Err(err) = encoder.push_frame(frame) {
            encoder.abort();
            return Err(err);
        }
    }
    encoder.end()?;
    encoder.take_output()
}

/// How long a timed-out encoder gets to release its process and files after being interrupted.
const RELEASE_GRACE: Duration = Duration::from_secs(5);

/// Wall-clock budget of an encode: video duration plus the configured margin, saturating.
fn encode_time_limit(cfg: &SinkConfig, opts: &VideoOptions) -> Duration {
    Duration::try_from_secs_f64(cfg.duration_secs().max(0.0))
        .unwrap_or(Duration::MAX)
        .saturating_add(Duration::from_secs(opts.timeout_margin_secs))
}

/// Encode `frames` on a blocking task, bounded by `duration + timeout_margin_secs`.
///
/// On timeout the encoder is interrupted and given [`RELEASE_GRACE`] to release its resources
/// before an [`CountframeError::Encoding`] is returned. Dropping the future interrupts it too.
#[tracing::instrument(level = "info", skip_all, fields(frames = frames.len(), codec = ?opts.codec))]
pub async fn encode_alpha_video<E, F>(
    make: F,
    frames: Arc<[Frame]>,
    cfg: SinkConfig,
    opts: VideoOptions,
    cancel: CancelToken,
) -> CountframeResult<EncodedVideo>
where
    E: VideoEncoder + 'static,
    F: Fn(&VideoOptions) -> CountframeResult<E> + Send + 'static,
{
    let limit = encode_time_limit(&cfg, &opts);
    let stop = CancelToken::new();
    let worker_stop = stop.clone();
    let _interrupt_on_drop = CancelOnDrop(stop.clone());

    let mut task = tokio::task::spawn_blocking(move || {
        encode_blocking(&make, &frames, cfg, &opts, &cancel, &worker_stop)
    });

    match tokio::time::timeout(limit, &mut task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join)) => Err(CountframeError::encoding(format!("encoder task failed: {join}"))),
        Err(_) => {
            stop.cancel();
            if tokio::time::timeout(RELEASE_GRACE, task).await.is_err() {
                tracing::warn!(
                    grace_secs = RELEASE_GRACE.as_secs_f64(),
                    "encoder did not release after interrupt"
                );
            }
            tracing::error!(limit_secs = limit.as_secs_f64(), "video encoding timed out");
            Err(CountframeError::encoding(format!(
                "video encoding timed out after {:.1}s",
                limit.as_secs_f64()
            )))
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/video.rs"]
mod tests;
