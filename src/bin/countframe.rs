use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use countframe::{
    EstimateOptions, ExportJob, ExportOutcome, ExportSession, FrameIndex, PresetId,
    SelectionConstraints, TargetFormat, TracingProgress,
};

#[derive(Parser, Debug)]
#[command(name = "countframe", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a single frame of a job as a PNG.
    Frame(FrameArgs),
    /// Run an export job and write its artifacts (video output requires `ffmpeg`).
    Export(ExportArgs),
    /// Estimate file size and export time for a preset.
    Estimate(EstimateArgs),
    /// Validate a job file and check it against a preset.
    Validate(ValidateArgs),
    /// Pick the highest-quality preset within limits.
    Select(SelectArgs),
    /// List the quality presets.
    Presets,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Input job JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Frame index (0-based).
    #[arg(long)]
    frame: u64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct ExportArgs {
    /// Input job JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Directory receiving the archive and/or video.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Log progress every N frames.
    #[arg(long, default_value_t = 30)]
    progress_every: u64,
}

#[derive(Parser, Debug)]
struct ScenarioArgs {
    /// Read duration, transparency, effect and target from a job file.
    #[arg(long = "in")]
    in_path: Option<PathBuf>,

    /// Animation length in seconds.
    #[arg(long, default_value_t = 5.0)]
    duration: f64,

    /// Output keeps an alpha channel.
    #[arg(long)]
    transparent: bool,

    /// A blur-based design effect is used.
    #[arg(long)]
    complex: bool,

    /// Delivery format.
    #[arg(long, value_enum, default_value_t = TargetArg::Webm)]
    target: TargetArg,
}

#[derive(Parser, Debug)]
struct EstimateArgs {
    /// Preset to estimate (draft, standard, high, ultra).
    #[arg(long, default_value = "standard")]
    preset: PresetId,

    #[command(flatten)]
    scenario: ScenarioArgs,
}

#[derive(Parser, Debug)]
struct ValidateArgs {
    /// Input job JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Preset to check the job against.
    #[arg(long, default_value = "standard")]
    preset: PresetId,
}

#[derive(Parser, Debug)]
struct SelectArgs {
    /// Largest acceptable output in megabytes.
    #[arg(long)]
    max_size_mb: Option<f64>,

    /// Longest acceptable export in seconds.
    #[arg(long)]
    max_time_secs: Option<f64>,

    /// Lowest acceptable preset.
    #[arg(long)]
    min_quality: Option<PresetId>,

    #[command(flatten)]
    scenario: ScenarioArgs,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TargetArg {
    Webm,
    Mov,
    Mp4,
    Gif,
    PngSequence,
}

impl From<TargetArg> for TargetFormat {
    fn from(value: TargetArg) -> Self {
        match value {
            TargetArg::Webm => Self::Webm,
            TargetArg::Mov => Self::Mov,
            TargetArg::Mp4 => Self::Mp4,
            TargetArg::Gif => Self::Gif,
            TargetArg::PngSequence => Self::PngSequence,
        }
    }
}

impl ScenarioArgs {
    fn options(&self) -> anyhow::Result<EstimateOptions> {
        match &self.in_path {
            Some(path) => Ok(ExportJob::from_path(path)?.estimate_options()),
            None => Ok(EstimateOptions {
                duration_secs: self.duration,
                transparency: self.transparent,
                complex_effects: self.complex,
                target: self.target.into(),
            }),
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("countframe=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Frame(args) => cmd_frame(args),
        Command::Export(args) => cmd_export(args),
        Command::Estimate(args) => cmd_estimate(args),
        Command::Validate(args) => cmd_validate(args),
        Command::Select(args) => cmd_select(args),
        Command::Presets => print_json(&countframe::presets()),
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let job = ExportJob::from_path(&args.in_path)?;
    let mut session = ExportSession::new(job)?;
    let frame = session.render_frame(FrameIndex(args.frame))?;

    countframe::ensure_parent_dir(&args.out)?;
    image::save_buffer_with_format(
        &args.out,
        &frame.to_straight_rgba8(),
        frame.width(),
        frame.height(),
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_export(args: ExportArgs) -> anyhow::Result<()> {
    let job = ExportJob::from_path(&args.in_path)?;
    let mut session =
        ExportSession::new(job)?.with_progress(TracingProgress::new(args.progress_every));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("start async runtime")?;
    let outcome = runtime.block_on(session.run())?;

    match outcome {
        ExportOutcome::Packaged(artifacts) => {
            let written =
                countframe::write_artifacts(&artifacts, &args.out_dir, &chrono::Local::now())?;
            for path in written.png_archive.iter().chain(written.video.iter()) {
                eprintln!("wrote {}", path.display());
            }
        }
        ExportOutcome::Cancelled => eprintln!("export cancelled"),
    }
    Ok(())
}

fn cmd_estimate(args: EstimateArgs) -> anyhow::Result<()> {
    let opts = args.scenario.options()?;
    print_json(&countframe::estimate(args.preset.preset(), &opts))
}

fn cmd_validate(args: ValidateArgs) -> anyhow::Result<()> {
    let job = ExportJob::from_path(&args.in_path)?;
    job.validate()?;
    let report = countframe::validate(args.preset.preset(), &job.estimate_options());
    print_json(&report)?;
    if !report.is_valid() {
        anyhow::bail!("job has {} blocking issue(s)", report.issues.len());
    }
    Ok(())
}

fn cmd_select(args: SelectArgs) -> anyhow::Result<()> {
    let constraints = SelectionConstraints {
        max_file_size_mb: args.max_size_mb,
        max_export_time_secs: args.max_time_secs,
        min_quality: args.min_quality,
    };
    let opts = args.scenario.options()?;
    let preset = countframe::select_optimal(&constraints, &opts);
    print_json(preset)
}
