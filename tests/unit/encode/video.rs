use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use super::*;
use crate::foundation::core::{Fps, FrameIndex};

#[derive(Default)]
struct Log {
    built: Vec<VideoCodec>,
    pushed: AtomicUsize,
    aborted: AtomicUsize,
}

struct FakeEncoder {
    opts: VideoOptions,
    available: Vec<VideoCodec>,
    log: Arc<Mutex<Log>>,
    interrupt: Option<CancelToken>,
    stall_on_end: bool,
    count: u64,
    cfg: Option<SinkConfig>,
}

impl FrameSink for FakeEncoder {
    fn begin(&mut self, cfg: SinkConfig) -> CountframeResult<()> {
        self.cfg = Some(cfg);
        Ok(())
    }

    fn push_frame(&mut self, _frame: &Frame) -> CountframeResult<()> {
        self.count += 1;
        self.log.lock().unwrap().pushed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn end(&mut self) -> CountframeResult<()> {
        if self.stall_on_end {
            let token = self.interrupt.clone().unwrap();
            while !token.is_cancelled() {
                std::thread::sleep(Duration::from_millis(5));
            }
            return Err(CountframeError::encoding("interrupted"));
        }
        Ok(())
    }

    fn abort(&mut self) {
        self.log.lock().unwrap().aborted.fetch_add(1, Ordering::SeqCst);
    }
}

impl VideoEncoder for FakeEncoder {
    fn supports(&self, codec: VideoCodec, container: Container) -> bool {
        self.available.contains(&codec) && container.accepts(codec)
    }

    fn take_output(&mut self) -> CountframeResult<EncodedVideo> {
        let cfg = self.cfg.unwrap();
        Ok(EncodedVideo {
            bytes: vec![1, 2, 3],
            metadata: VideoMetadata {
                codec: self.opts.codec,
                container: self.opts.resolved_container(),
                bitrate_bps: self.opts.bitrate_bps(),
                pixel_format: self.opts.resolved_pixel_format(),
                duration_secs: cfg.duration_secs(),
                byte_size: 3,
                frame_count: self.count,
                fallback_used: false,
            },
        })
    }

    fn set_interrupt(&mut self, token: CancelToken) {
        self.interrupt = Some(token);
    }
}

fn maker(
    available: Vec<VideoCodec>,
    stall_on_end: bool,
    log: Arc<Mutex<Log>>,
) -> impl Fn(&VideoOptions) -> CountframeResult<FakeEncoder> + Send + 'static {
    move |opts| {
        log.lock().unwrap().built.push(opts.codec);
        Ok(FakeEncoder {
            opts: opts.clone(),
            available: available.clone(),
            log: log.clone(),
            interrupt: None,
            stall_on_end,
            count: 0,
            cfg: None,
        })
    }
}

fn frames(n: u64) -> Vec<Frame> {
    (0..n)
        .map(|i| Frame::from_premul_rgba8(FrameIndex(i), 0.0, 2, 2, vec![0; 16]).unwrap())
        .collect()
}

fn cfg(frame_count: u64) -> SinkConfig {
    SinkConfig {
        width: 2,
        height: 2,
        fps: Fps::new(30, 1).unwrap(),
        frame_count,
    }
}

#[test]
fn options_resolve_codec_defaults() {
    let opts = VideoOptions::default();
    assert_eq!(opts.resolved_container(), Container::Webm);
    assert_eq!(opts.resolved_pixel_format(), PixelFormat::Yuva420p);
    assert_eq!(opts.bitrate_bps(), 8_000_000);
    assert_eq!(opts.timeout_margin_secs, 120);
    assert!(opts.is_fallback());

    let prores = VideoOptions {
        codec: VideoCodec::Prores,
        bitrate_mbps: 2.5,
        ..VideoOptions::default()
    };
    assert_eq!(prores.resolved_container(), Container::Mov);
    assert_eq!(prores.resolved_pixel_format().ffmpeg_name(), "yuva444p10le");
    assert_eq!(prores.bitrate_bps(), 2_500_000);
    assert!(!prores.is_fallback());
    assert_eq!(prores.fallback().codec, VideoCodec::Vp9);
    assert_eq!(prores.fallback().bitrate_mbps, 2.5);
}

#[test]
fn validation_rejects_mismatched_pixel_format_and_bad_bitrate() {
    let bad_pix = VideoOptions {
        pixel_format: Some(PixelFormat::Yuva444p10le),
        ..VideoOptions::default()
    };
    assert!(matches!(
        bad_pix.validate(),
        Err(CountframeError::Configuration(_))
    ));
    let bad_rate = VideoOptions {
        bitrate_mbps: f64::NAN,
        ..VideoOptions::default()
    };
    assert!(bad_rate.validate().is_err());
    let bad_gop = VideoOptions {
        keyframe_interval: Some(0),
        ..VideoOptions::default()
    };
    assert!(bad_gop.validate().is_err());
}

#[test]
fn options_parse_from_json() {
    let opts: VideoOptions =
        serde_json::from_str(r#"{"codec":"prores","pixel_format":"yuva444p10le","two_pass":true}"#)
            .unwrap();
    assert_eq!(opts.codec, VideoCodec::Prores);
    assert!(opts.two_pass);
    assert_eq!(opts.bitrate_mbps, 8.0);
}

#[test]
fn encodes_every_frame_with_requested_codec() {
    let log = Arc::new(Mutex::new(Log::default()));
    let make = maker(vec![VideoCodec::Vp9], false, log.clone());
    let video = encode_blocking(
        &make,
        &frames(3),
        cfg(3),
        &VideoOptions::default(),
        &CancelToken::new(),
        &CancelToken::new(),
    )
    .unwrap();
    assert_eq!(video.metadata.frame_count, 3);
    assert!(!video.metadata.fallback_used);
    assert!((video.metadata.duration_secs - 0.1).abs() < 1e-9);
    assert_eq!(log.lock().unwrap().built, vec![VideoCodec::Vp9]);
}

#[test]
fn unsupported_codec_falls_back_once() {
    let log = Arc::new(Mutex::new(Log::default()));
    let make = maker(vec![VideoCodec::Vp9], false, log.clone());
    let opts = VideoOptions {
        codec: VideoCodec::Prores,
        ..VideoOptions::default()
    };
    let video = encode_blocking(
        &make,
        &frames(2),
        cfg(2),
        &opts,
        &CancelToken::new(),
        &CancelToken::new(),
    )
    .unwrap();
    assert!(video.metadata.fallback_used);
    assert_eq!(video.metadata.codec, VideoCodec::Vp9);
    assert_eq!(video.metadata.container, Container::Webm);
    assert_eq!(
        log.lock().unwrap().built,
        vec![VideoCodec::Prores, VideoCodec::Vp9]
    );
}

#[test]
fn failing_fallback_is_an_encoding_error() {
    let log = Arc::new(Mutex::new(Log::default()));
    let make = maker(vec![], false, log.clone());
    let opts = VideoOptions {
        codec: VideoCodec::Prores,
        ..VideoOptions::default()
    };
    let err = encode_blocking(
        &make,
        &frames(1),
        cfg(1),
        &opts,
        &CancelToken::new(),
        &CancelToken::new(),
    )
    .unwrap_err();
    assert!(matches!(err, CountframeError::Encoding(_)));
    assert_eq!(log.lock().unwrap().built.len(), 2);
}

#[test]
fn frame_count_must_match() {
    let log = Arc::new(Mutex::new(Log::default()));
    let make = maker(vec![VideoCodec::Vp9], false, log.clone());
    let err = encode_blocking(
        &make,
        &frames(2),
        cfg(3),
        &VideoOptions::default(),
        &CancelToken::new(),
        &CancelToken::new(),
    )
    .unwrap_err();
    assert!(matches!(err, CountframeError::Encoding(_)));
    assert!(log.lock().unwrap().built.is_empty());
}

#[test]
fn cancelled_encode_aborts_without_fallback() {
    let log = Arc::new(Mutex::new(Log::default()));
    let make = maker(vec![VideoCodec::Vp9, VideoCodec::Prores], false, log.clone());
    let cancel = CancelToken::new();
    cancel.cancel();
    let opts = VideoOptions {
        codec: VideoCodec::Prores,
        ..VideoOptions::default()
    };
    let err = encode_blocking(&make, &frames(4), cfg(4), &opts, &cancel, &CancelToken::new())
        .unwrap_err();
    assert!(matches!(err, CountframeError::Encoding(_)));
    let log = log.lock().unwrap();
    assert_eq!(log.built.len(), 1);
    assert_eq!(log.pushed.load(Ordering::SeqCst), 0);
    assert_eq!(log.aborted.load(Ordering::SeqCst), 1);
}

#[test]
fn file_name_uses_timestamp_and_container() {
    use chrono::TimeZone as _;
    let at = chrono::Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
    let video = EncodedVideo {
        bytes: Vec::new(),
        metadata: VideoMetadata {
            codec: VideoCodec::Prores,
            container: Container::Mov,
            bitrate_bps: 1,
            pixel_format: PixelFormat::Yuva444p10le,
            duration_secs: 1.0,
            byte_size: 0,
            frame_count: 1,
            fallback_used: false,
        },
    };
    assert_eq!(video.file_name(&at), "counter-20240309-070501.mov");
}

#[tokio::test]
async fn async_encode_resolves_with_output() {
    let log = Arc::new(Mutex::new(Log::default()));
    let make = maker(vec![VideoCodec::Vp9], false, log);
    let frames: Arc<[Frame]> = frames(5).into();
    let video = encode_alpha_video(
        make,
        frames,
        cfg(5),
        VideoOptions::default(),
        CancelToken::new(),
    )
    .await
    .unwrap();
    assert_eq!(video.metadata.frame_count, 5);
}

#[tokio::test]
async fn async_encode_times_out_and_interrupts_encoder() {
    let log = Arc::new(Mutex::new(Log::default()));
    let make = maker(vec![VideoCodec::Vp9], true, log);
    let frames: Arc<[Frame]> = frames(1).into();
    let opts = VideoOptions {
        timeout_margin_secs: 0,
        ..VideoOptions::default()
    };
    let err = encode_alpha_video(make, frames, cfg(1), opts, CancelToken::new())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("timed out"), "{err}");
}

/// Encoder whose frame write blocks until it is interrupted, like a pipe nobody reads.
struct StalledEncoder {
    interrupt: CancelToken,
    released: Arc<std::sync::atomic::AtomicBool>,
}

impl FrameSink for StalledEncoder {
    fn begin(&mut self, _cfg: SinkConfig) -> CountframeResult<()> {
        Ok(())
    }

    fn push_frame(&mut self, _frame: &Frame) -> CountframeResult<()> {
        while !self.interrupt.is_cancelled() {
            std::thread::sleep(Duration::from_millis(5));
        }
        Err(CountframeError::encoding("broken pipe"))
    }

    fn end(&mut self) -> CountframeResult<()> {
        Ok(())
    }
}

impl VideoEncoder for StalledEncoder {
    fn supports(&self, codec: VideoCodec, container: Container) -> bool {
        container.accepts(codec)
    }

    fn take_output(&mut self) -> CountframeResult<EncodedVideo> {
        Err(CountframeError::encoding("no output"))
    }

    fn set_interrupt(&mut self, token: CancelToken) {
        self.interrupt = token;
    }
}

impl Drop for StalledEncoder {
    fn drop(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn timeout_releases_an_encoder_stalled_mid_write() {
    let released = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let flag = Arc::clone(&released);
    let make = move |_: &VideoOptions| -> CountframeResult<StalledEncoder> {
        Ok(StalledEncoder {
            interrupt: CancelToken::new(),
            released: Arc::clone(&flag),
        })
    };
    let opts = VideoOptions {
        timeout_margin_secs: 0,
        ..VideoOptions::default()
    };

    let err = encode_alpha_video(make, frames(3).into(), cfg(3), opts, CancelToken::new())
        .await
        .unwrap_err();

    assert!(err.to_string().contains("timed out"), "{err}");
    assert!(released.load(Ordering::SeqCst));
}

#[tokio::test]
async fn huge_timeout_margin_does_not_overflow() {
    let log = Arc::new(Mutex::new(Log::default()));
    let make = maker(vec![VideoCodec::Vp9], false, log);
    let opts = VideoOptions {
        timeout_margin_secs: u64::MAX,
        ..VideoOptions::default()
    };
    assert_eq!(encode_time_limit(&cfg(60), &opts), Duration::MAX);

    let video = encode_alpha_video(make, frames(60).into(), cfg(60), opts, CancelToken::new())
        .await
        .unwrap();
    assert_eq!(video.metadata.frame_count, 60);
}

#[tokio::test]
async fn dropping_the_encode_future_interrupts_the_encoder() {
    let released = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let flag = Arc::clone(&released);
    let make = move |_: &VideoOptions| -> CountframeResult<StalledEncoder> {
        Ok(StalledEncoder {
            interrupt: CancelToken::new(),
            released: Arc::clone(&flag),
        })
    };

    let encode = encode_alpha_video(
        make,
        frames(3).into(),
        cfg(3),
        VideoOptions::default(),
        CancelToken::new(),
    );
    assert!(
        tokio::time::timeout(Duration::from_millis(50), encode)
            .await
            .is_err()
    );

    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while !released.load(Ordering::SeqCst) && std::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(released.load(Ordering::SeqCst));
}
