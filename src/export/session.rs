use std::sync::Arc;

use crate::{
    encode::{
        ffmpeg::FfmpegAlphaEncoder,
        png_seq::{PngSequence, PngSequenceOptimizer},
        sink::{FrameSink, SinkConfig},
        video::{EncodedVideo, VideoEncoder, VideoOptions, encode_alpha_video},
    },
    eval::evaluator::Evaluator,
    export::{
        job::{ExportJob, OutputFormat},
        progress::{NullProgress, ProgressSink},
        state::ExportState,
    },
    foundation::{
        core::{CancelOnDrop, CancelToken, FrameIndex},
        error::{CountframeError, CountframeResult},
    },
    render::{
        backend::{BackendKind, RenderBackend, create_backend},
        frame::Frame,
    },
};

/// Artifacts of a successful export.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportArtifacts {
    /// PNG sequence, when requested.
    pub png: Option<PngSequence>,
    /// Encoded video, when requested.
    pub video: Option<EncodedVideo>,
    /// Number of rendered frames.
    pub frame_count: u64,
}

/// How an export ended when it did not fail.
#[derive(Clone, Debug, PartialEq)]
pub enum ExportOutcome {
    /// Every requested artifact was produced.
    Packaged(ExportArtifacts),
    /// The cancel token was raised; nothing was produced.
    Cancelled,
}

/// Runs one [`ExportJob`] from frame generation to packaged artifacts.
///
/// A session owns its render backend exclusively and runs at most once.
pub struct ExportSession {
    job: ExportJob,
    sink_cfg: SinkConfig,
    evaluator: Evaluator,
    backend: Box<dyn RenderBackend>,
    state: ExportState,
    progress: Box<dyn ProgressSink>,
    cancel: CancelToken,
}

impl ExportSession {
    /// Validate `job` and create a session with the CPU backend.
    pub fn new(job: ExportJob) -> CountframeResult<Self> {
        job.validate()?;
        let backend = create_backend(BackendKind::Cpu, &job.render_settings()?)?;
        Self::with_backend(job, backend)
    }

    /// Validate `job` and create a session rendering through `backend`.
    pub fn with_backend(job: ExportJob, backend: Box<dyn RenderBackend>) -> CountframeResult<Self> {
        job.validate()?;
        let sink_cfg = job.sink_config()?;
        if backend.canvas() != sink_cfg.canvas() {
            return Err(CountframeError::configuration(format!(
                "backend renders {}x{}, job expects {}x{}",
                backend.canvas().width,
                backend.canvas().height,
                sink_cfg.width,
                sink_cfg.height
            )));
        }
        let evaluator = Evaluator::new(&job.counter, sink_cfg.fps, job.duration)?;
        Ok(Self {
            job,
            sink_cfg,
            evaluator,
            backend,
            state: ExportState::Idle,
            progress: Box::new(NullProgress),
            cancel: CancelToken::new(),
        })
    }

    /// Report progress to `progress`.
    pub fn with_progress(mut self, progress: impl ProgressSink + 'static) -> Self {
        self.progress = Box::new(progress);
        self
    }

    /// Observe `cancel` instead of the session's own token.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that cancels this export when raised.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ExportState {
        self.state
    }

    /// The job being exported.
    pub fn job(&self) -> &ExportJob {
        &self.job
    }

    /// Number of frames the export renders.
    pub fn frame_count(&self) -> u64 {
        self.sink_cfg.frame_count
    }

    /// Render a single frame without affecting the export state.
    pub fn render_frame(&mut self, idx: FrameIndex) -> CountframeResult<Frame> {
        let state = self.evaluator.eval_frame(idx)?;
        self.backend.render(&state)
    }

    fn enter(&mut self, next: ExportState) -> CountframeResult<()> {
        self.state.advance(next)?;
        self.progress.state_changed(next);
        Ok(())
    }

    fn fail(&mut self, err: CountframeError) -> CountframeError {
        if self.state.advance(ExportState::Failed).is_ok() {
            self.progress.state_changed(ExportState::Failed);
        }
        self.progress.failed(&err);
        err
    }

    fn cancelled(&mut self) -> CountframeResult<ExportOutcome> {
        self.enter(ExportState::Cancelled)?;
        Ok(ExportOutcome::Cancelled)
    }

    /// Render every frame in order, checking the cancel token before each one.
    ///
    /// Returns `None` when cancelled; frames rendered so far are dropped.
    #[tracing::instrument(level = "info", skip(self), fields(frames = self.frame_count()))]
    pub fn generate_frames(&mut self) -> CountframeResult<Option<Vec<Frame>>> {
        let total = self.frame_count();
        let mut frames = Vec::with_capacity(usize::try_from(total).unwrap_or(0));
        for i in 0..total {
            if self.cancel.is_cancelled() {
                tracing::info!(at = i, "frame generation cancelled");
                return Ok(None);
            }
            frames.push(self.render_frame(FrameIndex(i))?);
            self.progress.frame_rendered(i + 1, total);
        }
        Ok(Some(frames))
    }

    /// Render every frame straight into `sink`, in order.
    ///
    /// Returns `false` when cancelled, after calling [`FrameSink::abort`].
    pub fn stream_to(&mut self, sink: &mut dyn FrameSink) -> CountframeResult<bool> {
        let total = self.frame_count();
        sink.begin(self.sink_cfg)?;
        for i in 0..total {
            if self.cancel.is_cancelled() {
                sink.abort();
                return Ok(false);
            }
            let pushed = self
                .render_frame(FrameIndex(i))
                .and_then(|frame| sink.push_frame(&frame));
            if let Err(err) = pushed {
                sink.abort();
                return Err(err);
            }
            self.progress.frame_rendered(i + 1, total);
        }
        sink.end()?;
        Ok(true)
    }

    /// Run the export with the `ffmpeg` video encoder.
    pub async fn run(&mut self) -> CountframeResult<ExportOutcome> {
        self.run_with(FfmpegAlphaEncoder::new).await
    }

    /// Run the export, building video encoders with `make`.
    pub async fn run_with<E, F>(&mut self, make: F) -> CountframeResult<ExportOutcome>
    where
        E: VideoEncoder + 'static,
        F: Fn(&VideoOptions) -> CountframeResult<E> + Send + 'static,
    {
        self.enter(ExportState::GeneratingFrames)?;
        let frames = match self.generate_frames() {
            Ok(Some(frames)) => frames,
            Ok(None) => return self.cancelled(),
            Err(err) => return Err(self.fail(err)),
        };
        let frames: Arc<[Frame]> = frames.into();

        let format = self.job.format;
        self.enter(match format {
            OutputFormat::PngSequence => ExportState::Optimizing,
            OutputFormat::AlphaVideo => ExportState::Encoding,
            OutputFormat::Both => ExportState::Both,
        })?;

        let png = async {
            if !format.wants_png() {
                return Ok(None);
            }
            let png_stop = CancelToken::new();
            let _stop_on_drop = CancelOnDrop(png_stop.clone());
            let optimizer = PngSequenceOptimizer::new(self.job.png.clone())?
                .with_cancel(self.cancel.clone())
                .with_cancel(png_stop);
            let frames = Arc::clone(&frames);
            let seq = tokio::task::spawn_blocking(move || optimizer.optimize(&frames))
                .await
                .map_err(|e| CountframeError::encoding(format!("png task failed: {e}")))??;
            CountframeResult::Ok(Some(seq))
        };
        let video = async {
            if !format.wants_video() {
                return Ok(None);
            }
            encode_alpha_video(
                make,
                Arc::clone(&frames),
                self.sink_cfg,
                self.job.video.clone(),
                self.cancel.clone(),
            )
            .await
            .map(Some)
        };
        // The first failure drops the other branch, which interrupts its worker.
        let joined = tokio::try_join!(png, video);

        if self.cancel.is_cancelled() {
            return self.cancelled();
        }
        let (png, video) = match joined {
            Ok(outputs) => outputs,
            Err(err) => return Err(self.fail(err)),
        };

        self.enter(ExportState::Packaged)?;
        Ok(ExportOutcome::Packaged(ExportArtifacts {
            png,
            video,
            frame_count: frames.len() as u64,
        }))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/export/session.rs"]
mod tests;
