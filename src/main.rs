use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use subforge::config::{Config, DisplayMode, QualityProfile, ResolutionMode, SubtitleFormat};
use subforge::engine::{check_ffmpeg, new_cancel_flag, CancelFlag, FfmpegEngine, JobOutcome};
use subforge::render::{ErasureRegion, ErasureSettings};
use subforge::subtitle::{read_subtitle_file, FormatOptions};
use subforge::{export_subtitles, export_video, preview_frames, print_summary, ExportRequest, Session};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "subforge")]
#[command(version, about = "Subtitle conversion, burn-in, soft-embed and region erasure")]
#[command(long_about = "Convert subtitle files, align a secondary track, and export videos with \
burned-in or embedded subtitles, an erased screen region and optional scaling via FFmpeg.")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Convert a subtitle file to another format
    Convert {
        /// Input subtitle file (srt, vtt, ass, json)
        input: PathBuf,

        /// Output subtitle file
        #[arg(short, long)]
        output: PathBuf,

        /// Output format: srt, vtt, ass, json (defaults to the output extension)
        #[arg(short, long)]
        format: Option<String>,

        /// Secondary track aligned into each cue's second line
        #[arg(long)]
        secondary: Option<PathBuf>,

        /// Lines to write: main, secondary, dual
        #[arg(short, long)]
        mode: Option<String>,
    },

    /// Re-encode a video with subtitles, erasure and scaling
    Export {
        /// Input video
        video: PathBuf,

        /// Output video
        #[arg(short, long)]
        output: PathBuf,

        /// Embed subtitles as a selectable track instead of burning them
        #[arg(long)]
        soft: bool,

        #[command(flatten)]
        render: RenderArgs,
    },

    /// Render still frames with the export filters applied
    Preview {
        /// Input video
        video: PathBuf,

        /// Timestamps in seconds
        #[arg(long = "at", required = true, num_args = 1..)]
        times: Vec<f64>,

        /// Output directory for JPEG frames
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        render: RenderArgs,
    },

    /// Extract embedded text subtitle streams as SRT
    Extract {
        /// Input video
        video: PathBuf,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Args)]
struct RenderArgs {
    /// Subtitle file to render
    #[arg(long)]
    subs: Option<PathBuf>,

    /// Secondary track aligned into each cue's second line
    #[arg(long)]
    secondary: Option<PathBuf>,

    /// Lines to render: main, secondary, dual
    #[arg(short, long)]
    mode: Option<String>,

    /// Region to erase as x,y,w,h in source pixels
    #[arg(long)]
    erase: Option<String>,

    /// Erasure strength 0-100 (above 90 removes instead of blurring)
    #[arg(long, default_value = "50")]
    strength: f64,

    /// Only erase while a subtitle is on screen
    #[arg(long)]
    smart: bool,

    /// Output resolution: original, 1080p, 720p, 480p
    #[arg(short, long)]
    resolution: Option<String>,

    /// Quality profile: high, medium, low, custom
    #[arg(short, long)]
    quality: Option<String>,

    /// Video bitrate in kbit/s for the custom profile
    #[arg(long)]
    bitrate: Option<u32>,
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

fn install_cancel_handler() -> Result<CancelFlag> {
    let cancel = new_cancel_flag();
    let flag = cancel.clone();
    ctrlc::set_handler(move || {
        warn!("Interrupt received, stopping after the current step...");
        flag.store(true, Ordering::Relaxed);
    })
    .context("Failed to install Ctrl+C handler")?;
    Ok(cancel)
}

fn parse_mode(mode: Option<&str>, config: &Config) -> Result<DisplayMode> {
    match mode {
        Some(m) => m.parse().map_err(|e: String| anyhow::anyhow!(e)),
        None => Ok(config.display_mode),
    }
}

/// Read the primary list and align an optional secondary track into it.
fn load_cues(input: &Path, secondary: Option<&Path>, config: &Config) -> Result<Session> {
    let cues = read_subtitle_file(input)
        .with_context(|| format!("Failed to read subtitles from {}", input.display()))?;
    let mut session = Session::with_history_capacity(config.history_capacity).with_cues(cues);

    if let Some(path) = secondary {
        let track = read_subtitle_file(path)
            .with_context(|| format!("Failed to read secondary track {}", path.display()))?;
        session.import_secondary(track);
        info!("Aligned secondary track from {}", path.display());
    }

    Ok(session)
}

fn build_request(
    video: PathBuf,
    output: PathBuf,
    soft: bool,
    args: &RenderArgs,
    config: &Config,
) -> Result<ExportRequest> {
    let mut request = ExportRequest::new(video, output, config);
    request.mode = parse_mode(args.mode.as_deref(), config)?;
    request.soft_embed = soft;
    request.smart_erasure = args.smart;

    if let Some(subs) = &args.subs {
        let session = load_cues(subs, args.secondary.as_deref(), config)?;
        request.cues = Some(session.cues().to_vec());
    } else if args.secondary.is_some() {
        anyhow::bail!("--secondary requires --subs");
    }

    if let Some(region) = &args.erase {
        let region: ErasureRegion = region.parse().map_err(|e: String| anyhow::anyhow!(e))?;
        request.erasure = Some(ErasureSettings::new(region, args.strength));
    }

    if let Some(resolution) = &args.resolution {
        request.resolution = resolution
            .parse::<ResolutionMode>()
            .map_err(|e: String| anyhow::anyhow!(e))?;
    }

    request.quality = match (&args.quality, args.bitrate) {
        (Some(name), bitrate) => QualityProfile::parse(name, bitrate)?,
        (None, Some(bitrate)) => QualityProfile::parse("custom", Some(bitrate))?,
        (None, None) => config.default_quality,
    };

    Ok(request)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    // Load and validate configuration
    let config = Config::load().context("Failed to load configuration")?;
    config
        .validate()
        .context("Configuration validation failed")?;

    match cli.command {
        Command::Convert {
            input,
            output,
            format,
            secondary,
            mode,
        } => {
            let format: SubtitleFormat = match format {
                Some(f) => f.parse().map_err(|e: String| anyhow::anyhow!(e))?,
                None => SubtitleFormat::from_path(&output).unwrap_or(config.default_format),
            };
            let session = load_cues(&input, secondary.as_deref(), &config)?;
            let options = FormatOptions {
                mode: parse_mode(mode.as_deref(), &config)?,
                style: config.style.clone(),
                ..Default::default()
            };

            info!("Input:  {}", input.display());
            info!("Output: {}", output.display());
            info!("Format: {}", format);

            export_subtitles(session.cues(), format, &options, &output)
                .context("Failed to write subtitles")?;
        }

        Command::Export {
            video,
            output,
            soft,
            render,
        } => {
            check_ffmpeg(&config.ffmpeg_path)?;
            let request = build_request(video, output, soft, &render, &config)?;
            let engine = FfmpegEngine::from_config(&config);
            let cancel = install_cancel_handler()?;

            match export_video(&engine, &config, &request, &cancel).await? {
                JobOutcome::Completed(result) => print_summary(&result),
                JobOutcome::Cancelled(result) => warn!(
                    "Export cancelled; {} bytes written to {}",
                    result.stats.output_bytes,
                    result.output_path.display()
                ),
            }
        }

        Command::Preview {
            video,
            times,
            output,
            render,
        } => {
            check_ffmpeg(&config.ffmpeg_path)?;
            let mut request = build_request(video, PathBuf::new(), false, &render, &config)?;
            request.show_progress = false;
            let engine = FfmpegEngine::from_config(&config);
            let cancel = install_cancel_handler()?;

            let outcome = preview_frames(&engine, &config, &request, &times, &output, &cancel).await?;
            if outcome.is_cancelled() {
                warn!("Preview cancelled");
            }
            for path in outcome.into_inner() {
                println!("{}", path.display());
            }
        }

        Command::Extract { video, output } => {
            check_ffmpeg(&config.ffmpeg_path)?;
            let engine = FfmpegEngine::from_config(&config);
            let cancel = install_cancel_handler()?;
            std::fs::create_dir_all(&output)?;

            let outcome = engine.extract_subtitles(&video, &cancel).await?;
            if outcome.is_cancelled() {
                warn!("Extraction cancelled");
            }
            let tracks = outcome.into_inner();
            if tracks.is_empty() {
                info!("No text subtitle streams found in {}", video.display());
            }
            for track in tracks {
                let path = output.join(track.stream.file_name());
                std::fs::write(&path, &track.content)?;
                println!("{} ({} cues)", path.display(), track.cues.len());
            }
        }
    }

    Ok(())
}
