use std::{
    fs::File,
    io::{BufWriter, Read as _, Write as _},
    path::{Path, PathBuf},
    process::{Child, ChildStdin, Command, ExitStatus, Stdio},
    sync::{Arc, Mutex, PoisonError},
    thread::JoinHandle,
    time::Duration,
};

use crate::{
    encode::{
        sink::{FrameSink, OrderGuard, SinkConfig},
        video::{Container, EncodedVideo, VideoCodec, VideoEncoder, VideoMetadata, VideoOptions},
    },
    foundation::{
        core::{CancelToken, Fps},
        error::{CountframeError, CountframeResult},
        math::unpremul_px,
    },
    render::frame::Frame,
};

/// Environment variable overriding the `ffmpeg` executable.
pub const FFMPEG_ENV: &str = "COUNTFRAME_FFMPEG";

const WAIT_POLL: Duration = Duration::from_millis(10);

/// The `ffmpeg` executable to run: `$COUNTFRAME_FFMPEG`, else `ffmpeg` from `PATH`.
pub fn ffmpeg_binary() -> PathBuf {
    std::env::var_os(FFMPEG_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("ffmpeg"))
}

/// Return `true` when the configured `ffmpeg` can be invoked.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new(ffmpeg_binary())
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Names of the video encoders compiled into the configured `ffmpeg`.
pub fn available_encoders() -> CountframeResult<Vec<String>> {
    let out = Command::new(ffmpeg_binary())
        .args(["-hide_banner", "-encoders"])
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .map_err(|e| CountframeError::encoding(format!("failed to run ffmpeg -encoders: {e}")))?;
    if !out.status.success() {
        return Err(CountframeError::encoding(format!(
            "ffmpeg -encoders exited with status {}",
            out.status
        )));
    }
    Ok(parse_encoder_list(&String::from_utf8_lossy(&out.stdout)))
}

/// Parse `ffmpeg -encoders` output, keeping video encoders only.
fn parse_encoder_list(text: &str) -> Vec<String> {
    text.lines()
        .skip_while(|l| !l.trim_start().starts_with("---"))
        .skip(1)
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let flags = parts.next()?;
            let name = parts.next()?;
            flags.starts_with('V').then(|| name.to_owned())
        })
        .collect()
}

/// A running `ffmpeg` process.
///
/// A watchdog thread kills the process as soon as the interrupt token is raised, which also
/// unblocks a pending stdin write. Dropping it kills the process if it has not exited yet.
struct FfmpegProcess {
    child: Arc<Mutex<Child>>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
    exited: CancelToken,
    watchdog: Option<JoinHandle<()>>,
}

fn kill_child(child: &Mutex<Child>) {
    let mut child = child.lock().unwrap_or_else(PoisonError::into_inner);
    if let Ok(None) = child.try_wait() {
        let _ = child.kill();
        let _ = child.wait();
    }
}

impl FfmpegProcess {
    fn spawn(
        mut cmd: Command,
        with_stdin: bool,
        interrupt: &CancelToken,
    ) -> CountframeResult<Self> {
        cmd.stdin(if with_stdin {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::null())
        .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| {
            CountframeError::encoding(format!(
                "failed to spawn ffmpeg (set {FFMPEG_ENV} or install it on PATH): {e}"
            ))
        })?;

        let stdin = if with_stdin {
            Some(child.stdin.take().ok_or_else(|| {
                CountframeError::encoding("failed to open ffmpeg stdin (unexpected)")
            })?)
        } else {
            None
        };
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| CountframeError::encoding("failed to open ffmpeg stderr (unexpected)"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut bytes = Vec::new();
            stderr.read_to_end(&mut bytes)?;
            Ok(bytes)
        });

        let child = Arc::new(Mutex::new(child));
        let exited = CancelToken::new();
        let watchdog = {
            let child = Arc::clone(&child);
            let exited = exited.clone();
            let interrupt = interrupt.clone();
            std::thread::spawn(move || {
                while !exited.is_cancelled() {
                    if interrupt.is_cancelled() {
                        tracing::debug!("interrupt raised; killing ffmpeg");
                        kill_child(&child);
                        return;
                    }
                    std::thread::sleep(WAIT_POLL);
                }
            })
        };

        Ok(Self {
            child,
            stdin,
            stderr_drain: Some(stderr_drain),
            exited,
            watchdog: Some(watchdog),
        })
    }

    fn write(&mut self, bytes: &[u8]) -> CountframeResult<()> {
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(CountframeError::encoding("ffmpeg stdin is already closed"));
        };
        stdin.write_all(bytes).map_err(|e| {
            CountframeError::encoding(format!("failed to write frame to ffmpeg stdin: {e}"))
        })
    }

    /// Close stdin and wait for exit, killing the process if `interrupt` is raised first.
    fn finish(mut self, interrupt: &CancelToken) -> CountframeResult<()> {
        drop(self.stdin.take());
        let status = self.wait(interrupt)?;
        let stderr_bytes = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| CountframeError::encoding("ffmpeg stderr drain thread panicked"))?
                .map_err(|e| CountframeError::encoding(format!("ffmpeg stderr read failed: {e}")))?,
            None => Vec::new(),
        };

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(CountframeError::encoding(format!(
                "ffmpeg exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }
        Ok(())
    }

    fn wait(&mut self, interrupt: &CancelToken) -> CountframeResult<ExitStatus> {
        loop {
            let polled = self
                .child
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .try_wait()
                .map_err(|e| CountframeError::encoding(format!("failed to poll ffmpeg: {e}")))?;
            if let Some(status) = polled {
                if interrupt.is_cancelled() {
                    return Err(CountframeError::encoding("ffmpeg was interrupted"));
                }
                return Ok(status);
            }
            if interrupt.is_cancelled() {
                kill_child(&self.child);
                return Err(CountframeError::encoding("ffmpeg was interrupted"));
            }
            std::thread::sleep(WAIT_POLL);
        }
    }
}

impl Drop for FfmpegProcess {
    fn drop(&mut self) {
        drop(self.stdin.take());
        kill_child(&self.child);
        self.exited.cancel();
        if let Some(watchdog) = self.watchdog.take() {
            let _ = watchdog.join();
        }
    }
}

enum Destination {
    Pipe(FfmpegProcess),
    Spool(BufWriter<File>),
}

/// Alpha-video encoder streaming straight-alpha RGBA8 frames into the system `ffmpeg`.
///
/// Output is written into a private temporary directory that is removed when the encoder is
/// dropped or aborted.
pub struct FfmpegAlphaEncoder {
    opts: VideoOptions,
    encoders: Vec<String>,
    interrupt: CancelToken,

    workdir: Option<tempfile::TempDir>,
    dest: Option<Destination>,
    scratch: Vec<u8>,
    cfg: Option<SinkConfig>,
    order: OrderGuard,
    pushed: u64,
    output: Option<EncodedVideo>,
}

impl FfmpegAlphaEncoder {
    /// Probe `ffmpeg` and create an encoder for `opts`.
    pub fn new(opts: &VideoOptions) -> CountframeResult<Self> {
        opts.validate()?;
        if !is_ffmpeg_on_path() {
            return Err(CountframeError::encoding(format!(
                "ffmpeg is required for video export, but '{}' could not be run",
                ffmpeg_binary().display()
            )));
        }
        let encoders = available_encoders()?;
        tracing::debug!(count = encoders.len(), "probed ffmpeg encoders");
        Ok(Self {
            opts: opts.clone(),
            encoders,
            interrupt: CancelToken::new(),
            workdir: None,
            dest: None,
            scratch: Vec::new(),
            cfg: None,
            order: OrderGuard::default(),
            pushed: 0,
            output: None,
        })
    }

    fn two_pass(&self) -> bool {
        if self.opts.two_pass && self.opts.codec != VideoCodec::Vp9 {
            tracing::debug!(codec = ?self.opts.codec, "two-pass ignored for intra-only codec");
        }
        self.opts.two_pass && self.opts.codec == VideoCodec::Vp9
    }

    fn workdir(&self) -> CountframeResult<&Path> {
        self.workdir
            .as_ref()
            .map(|d| d.path())
            .ok_or_else(|| CountframeError::encoding("ffmpeg encoder not started"))
    }

    fn output_path(&self) -> CountframeResult<PathBuf> {
        let ext = self.opts.resolved_container().extension();
        Ok(self.workdir()?.join(format!("out.{ext}")))
    }

    fn command(
        &self,
        cfg: &SinkConfig,
        input: &str,
        pass: Option<u8>,
    ) -> CountframeResult<Command> {
        let mut cmd = Command::new(ffmpeg_binary());
        cmd.args(["-y", "-loglevel", "error"]);
        cmd.args(input_args(cfg, input));
        cmd.args(codec_args(&self.opts));
        if let Some(n) = pass {
            let log = self.workdir()?.join("pass");
            cmd.args(["-pass", &n.to_string(), "-passlogfile"]).arg(log);
            if n == 1 {
                cmd.args(["-f", "null", "-"]);
                return Ok(cmd);
            }
        }
        cmd.arg(self.output_path()?);
        Ok(cmd)
    }

    fn release(&mut self) {
        self.dest = None;
        self.workdir = None;
        self.cfg = None;
    }

    fn finish_spool(&self, spool: BufWriter<File>, cfg: &SinkConfig) -> CountframeResult<()> {
        let file = spool.into_inner().map_err(|e| {
            CountframeError::encoding(format!("failed to flush spooled frames: {}", e.error()))
        })?;
        drop(file);
        let raw = self.workdir()?.join("frames.rgba");
        let raw = raw.to_string_lossy();
        for pass in [1u8, 2] {
            tracing::debug!(pass, "running ffmpeg pass");
            let cmd = self.command(cfg, &raw, Some(pass))?;
            FfmpegProcess::spawn(cmd, false, &self.interrupt)?.finish(&self.interrupt)?;
        }
        Ok(())
    }
}

impl FrameSink for FfmpegAlphaEncoder {
    fn begin(&mut self, cfg: SinkConfig) -> CountframeResult<()> {
        cfg.validate()?;
        if cfg.fps.num == 0 || cfg.fps.den == 0 {
            return Err(CountframeError::configuration("fps must be non-zero"));
        }
        self.release();
        self.output = None;
        self.workdir = Some(
            tempfile::Builder::new()
                .prefix("countframe-")
                .tempdir()
                .map_err(|e| {
                    CountframeError::encoding(format!("failed to create temp directory: {e}"))
                })?,
        );

        let dest = if self.two_pass() {
            let raw = self.workdir()?.join("frames.rgba");
            let file = File::create(&raw).map_err(|e| {
                CountframeError::encoding(format!("failed to create '{}': {e}", raw.display()))
            })?;
            Destination::Spool(BufWriter::new(file))
        } else {
            let cmd = self.command(&cfg, "pipe:0", None)?;
            Destination::Pipe(FfmpegProcess::spawn(cmd, true, &self.interrupt)?)
        };

        tracing::debug!(
            width = cfg.width,
            height = cfg.height,
            frames = cfg.frame_count,
            codec = self.opts.codec.ffmpeg_encoder(),
            "ffmpeg encoder started"
        );
        self.scratch = vec![0u8; cfg.canvas().rgba_len()];
        self.dest = Some(dest);
        self.cfg = Some(cfg);
        self.order.reset();
        self.pushed = 0;
        Ok(())
    }

    fn push_frame(&mut self, frame: &Frame) -> CountframeResult<()> {
        let cfg = self
            .cfg
            .ok_or_else(|| CountframeError::encoding("ffmpeg encoder not started"))?;
        if frame.canvas() != cfg.canvas() {
            return Err(CountframeError::encoding(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width(),
                frame.height(),
                cfg.width,
                cfg.height
            )));
        }
        if self.pushed >= cfg.frame_count {
            return Err(CountframeError::encoding(format!(
                "encoder accepts exactly {} frames",
                cfg.frame_count
            )));
        }

        self.order.accept(frame.index())?;

        straight_rgba8_into(&mut self.scratch, frame.data())?;
        match self.dest.as_mut() {
            Some(Destination::Pipe(proc)) => proc.write(&self.scratch)?,
            Some(Destination::Spool(w)) => w.write_all(&self.scratch).map_err(|e| {
                CountframeError::encoding(format!("failed to spool frame: {e}"))
            })?,
            None => return Err(CountframeError::encoding("ffmpeg encoder is already finalized")),
        }
        self.pushed += 1;
        Ok(())
    }

    fn end(&mut self) -> CountframeResult<()> {
        let cfg = self
            .cfg
            .ok_or_else(|| CountframeError::encoding("ffmpeg encoder not started"))?;
        if self.pushed != cfg.frame_count {
            self.abort();
            return Err(CountframeError::encoding(format!(
                "encoder received {} of {} frames",
                self.pushed, cfg.frame_count
            )));
        }

        let result = match self.dest.take() {
            Some(Destination::Pipe(proc)) => proc.finish(&self.interrupt),
            Some(Destination::Spool(w)) => self.finish_spool(w, &cfg),
            None => Err(CountframeError::encoding("ffmpeg encoder is already finalized")),
        };
        if let Err(err) = result {
            self.release();
            return Err(err);
        }

        let path = self.output_path()?;
        let bytes = std::fs::read(&path).map_err(|e| {
            CountframeError::encoding(format!("failed to read '{}': {e}", path.display()))
        });
        self.release();
        let bytes = bytes?;

        tracing::info!(bytes = bytes.len(), frames = cfg.frame_count, "video encoded");
        self.output = Some(EncodedVideo {
            metadata: VideoMetadata {
                codec: self.opts.codec,
                container: self.opts.resolved_container(),
                bitrate_bps: self.opts.bitrate_bps(),
                pixel_format: self.opts.resolved_pixel_format(),
                duration_secs: cfg.duration_secs(),
                byte_size: bytes.len() as u64,
                frame_count: cfg.frame_count,
                fallback_used: false,
            },
            bytes,
        });
        Ok(())
    }

    fn abort(&mut self) {
        if self.cfg.is_some() {
            tracing::debug!(pushed = self.pushed, "ffmpeg encoder aborted");
        }
        self.release();
        self.output = None;
    }
}

impl VideoEncoder for FfmpegAlphaEncoder {
    fn supports(&self, codec: VideoCodec, container: Container) -> bool {
        container.accepts(codec) && self.encoders.iter().any(|e| e == codec.ffmpeg_encoder())
    }

    fn take_output(&mut self) -> CountframeResult<EncodedVideo> {
        self.output
            .take()
            .ok_or_else(|| CountframeError::encoding("no encoded video available"))
    }

    fn set_interrupt(&mut self, token: CancelToken) {
        self.interrupt = token;
    }
}

fn input_args(cfg: &SinkConfig, input: &str) -> Vec<String> {
    let mut args: Vec<String> = ["-f", "rawvideo", "-pix_fmt", "rgba", "-s"]
        .into_iter()
        .map(str::to_owned)
        .collect();
    args.push(format!("{}x{}", cfg.width, cfg.height));
    args.extend(input_fps_args(cfg.fps));
    args.extend(["-i".to_owned(), input.to_owned(), "-an".to_owned()]);
    args
}

fn input_fps_args(fps: Fps) -> [String; 2] {
    // For rawvideo input, `-r` before `-i` sets the input frame rate.
    ["-r".to_owned(), format!("{}/{}", fps.num, fps.den)]
}

fn codec_args(opts: &VideoOptions) -> Vec<String> {
    let mut args = vec![
        "-c:v".to_owned(),
        opts.codec.ffmpeg_encoder().to_owned(),
        "-pix_fmt".to_owned(),
        opts.resolved_pixel_format().ffmpeg_name().to_owned(),
        "-b:v".to_owned(),
        opts.bitrate_bps().to_string(),
    ];
    if let Some(g) = opts.keyframe_interval {
        args.extend(["-g".to_owned(), g.to_string()]);
    }
    match opts.codec {
        // libvpx drops the alpha plane when alt-ref frames are enabled.
        VideoCodec::Vp9 => args.extend(["-auto-alt-ref".to_owned(), "0".to_owned()]),
        VideoCodec::Prores => args.extend(["-profile:v".to_owned(), "4".to_owned()]),
    }
    args
}

/// Convert premultiplied RGBA8 into straight RGBA8 for `-pix_fmt rgba` input.
fn straight_rgba8_into(dst: &mut [u8], src_premul: &[u8]) -> CountframeResult<()> {
    if dst.len() != src_premul.len() || !dst.len().is_multiple_of(4) {
        return Err(CountframeError::encoding(
            "straight_rgba8_into expects equal-length rgba8 buffers",
        ));
    }
    for (d, s) in dst.chunks_exact_mut(4).zip(src_premul.chunks_exact(4)) {
        d.copy_from_slice(&unpremul_px([s[0], s[1], s[2], s[3]]));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
