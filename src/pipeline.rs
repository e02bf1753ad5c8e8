use crate::config::{Config, DisplayMode, QualityProfile, ResolutionMode, SubtitleFormat};
use crate::engine::{
    probe_dimensions, probe_duration, required_families, resolve_font, CancelFlag, EncodeJob,
    FontAsset, JobOutcome, PreviewJob, ProgressFn, SubtitleAsset, TranscodeEngine,
    FONTS_DIR_NAME,
};
use crate::error::{Result, SubforgeError};
use crate::render::{
    compile_filter_graph, cue_ranges, ErasureSettings, ExportPlan, FilterGraphRequest,
    SubtitleInput,
};
use crate::subtitle::{
    ass, create_formatter, srt::SrtFormatter, validate_cues, Cue, FormatOptions, StyleConfig,
    SubtitleFormatter,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const BURN_SUBTITLE_NAME: &str = "subtitle.ass";
const SOFT_SUBTITLE_NAME: &str = "subtitle.srt";

/// Everything needed to export one video.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub video: PathBuf,
    pub output: PathBuf,
    /// Cues to burn or embed. `None` exports video only.
    pub cues: Option<Vec<Cue>>,
    pub mode: DisplayMode,
    pub style: StyleConfig,
    pub erasure: Option<ErasureSettings>,
    /// Gate erasure to the time spans covered by `cues`.
    pub smart_erasure: bool,
    pub resolution: ResolutionMode,
    pub quality: QualityProfile,
    /// Embed the cues as a selectable track instead of burning them in.
    pub soft_embed: bool,
    pub show_progress: bool,
}

impl ExportRequest {
    /// A request using the configured defaults.
    pub fn new(video: impl Into<PathBuf>, output: impl Into<PathBuf>, config: &Config) -> Self {
        Self {
            video: video.into(),
            output: output.into(),
            cues: None,
            mode: config.display_mode,
            style: config.style.clone(),
            erasure: None,
            smart_erasure: false,
            resolution: config.default_resolution,
            quality: config.default_quality,
            soft_embed: false,
            show_progress: true,
        }
    }
}

/// Statistics from one export.
#[derive(Debug, Clone)]
pub struct ExportStats {
    pub total_time: Duration,
    pub encode_time: Duration,
    pub source_dimensions: (u32, u32),
    pub cue_count: usize,
    pub output_bytes: usize,
    pub engine: String,
    pub description: String,
}

#[derive(Debug)]
pub struct ExportResult {
    pub output_path: PathBuf,
    pub plan: ExportPlan,
    pub stats: ExportStats,
}

/// Write `cues` to `output` in `format`.
pub fn export_subtitles(
    cues: &[Cue],
    format: SubtitleFormat,
    options: &FormatOptions,
    output: &Path,
) -> Result<()> {
    validate_cues(cues)?;
    let formatter = create_formatter(format, options);
    fs::write(output, formatter.format(cues))?;
    info!("Wrote {} cues to {:?}", cues.len(), output);
    Ok(())
}

/// Subtitle document, fonts and plan for one request.
struct PreparedExport {
    subtitle: Option<SubtitleAsset>,
    fonts: Vec<FontAsset>,
    plan: ExportPlan,
    dimensions: (u32, u32),
}

async fn prepare_export(
    config: &Config,
    request: &ExportRequest,
    soft_embed: bool,
) -> Result<PreparedExport> {
    if !request.video.is_file() {
        return Err(SubforgeError::MissingResource(
            request.video.display().to_string(),
        ));
    }

    let cues = request.cues.as_deref();
    if let Some(cues) = cues {
        validate_cues(cues)?;
    }

    let dimensions = probe_dimensions(
        &config.ffprobe_path,
        &request.video,
        Duration::from_secs(config.probe_timeout_secs),
    )
    .await;
    debug!("Source dimensions: {}x{}", dimensions.0, dimensions.1);

    let options = FormatOptions {
        mode: request.mode,
        style: request.style.clone(),
        width: dimensions.0,
        height: dimensions.1,
    };

    // Soft tracks are stored as mov_text, which only carries plain text.
    let subtitle = cues.map(|cues| {
        if soft_embed {
            SubtitleAsset {
                file_name: SOFT_SUBTITLE_NAME.to_string(),
                contents: SrtFormatter { mode: request.mode }.format(cues),
            }
        } else {
            SubtitleAsset {
                file_name: BURN_SUBTITLE_NAME.to_string(),
                contents: ass::compile_markup(cues, &options),
            }
        }
    });

    let fonts = match cues {
        Some(cues) if !soft_embed => {
            let fonts_dir = config.resolved_fonts_dir();
            required_families(&request.style.font_family, cues)
                .into_iter()
                .map(|family| resolve_font(fonts_dir.as_deref(), family))
                .collect::<Result<Vec<_>>>()?
        }
        _ => Vec::new(),
    };

    let smart_ranges = match (request.smart_erasure, cues) {
        (true, Some(cues)) => Some(cue_ranges(cues)),
        _ => None,
    };

    let plan = compile_filter_graph(&FilterGraphRequest {
        erasure: request.erasure,
        smart_ranges,
        subtitles: subtitle
            .as_ref()
            .map(|s| SubtitleInput::new(s.file_name.clone(), FONTS_DIR_NAME)),
        resolution: request.resolution,
        quality: request.quality,
        soft_embed,
        subtitle_language: config.subtitle_language.clone(),
    })?;

    Ok(PreparedExport {
        subtitle,
        fonts,
        plan,
        dimensions,
    })
}

fn describe(request: &ExportRequest) -> String {
    let mut parts = Vec::new();
    if request.erasure.is_some() {
        parts.push(if request.smart_erasure {
            "smart erase"
        } else {
            "erase"
        });
    }
    if request.cues.is_some() {
        parts.push(if request.soft_embed {
            "soft subtitles"
        } else {
            "burned subtitles"
        });
    }
    if request.resolution != ResolutionMode::Original {
        parts.push("scale");
    }
    if parts.is_empty() {
        "re-encode".to_string()
    } else {
        parts.join(" + ")
    }
}

fn progress_bar(show: bool, message: &str) -> Option<ProgressBar> {
    if !show {
        return None;
    }
    let pb = ProgressBar::new(1000);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}

/// Export a video with burned or embedded subtitles, an erased region and
/// optional scaling.
///
/// On cancellation the partial output produced so far is still written.
pub async fn export_video(
    engine: &dyn TranscodeEngine,
    config: &Config,
    request: &ExportRequest,
    cancel: &CancelFlag,
) -> Result<JobOutcome<ExportResult>> {
    let start_time = Instant::now();
    let description = describe(request);
    info!("Exporting {:?} ({})", request.video, description);

    let prepared = prepare_export(config, request, request.soft_embed).await?;
    let duration = probe_duration(&config.ffprobe_path, &request.video)
        .await
        .map_err(|e| debug!("Duration unavailable, progress disabled: {e}"))
        .ok();

    let pb = progress_bar(request.show_progress, "Encoding...");
    let progress: Option<ProgressFn> = pb.clone().map(|pb| {
        Arc::new(move |ratio: f64| pb.set_position((ratio * 1000.0) as u64)) as ProgressFn
    });

    let job = EncodeJob {
        source: request.video.clone(),
        subtitle: prepared.subtitle,
        fonts: prepared.fonts,
        plan: prepared.plan,
        duration,
    };

    let encode_start = Instant::now();
    let outcome = engine.encode(&job, cancel, progress).await;
    let encode_time = encode_start.elapsed();

    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(e) => {
            if let Some(pb) = &pb {
                pb.abandon_with_message("✗ Encoding failed");
            }
            return Err(e);
        }
    };

    let cancelled = outcome.is_cancelled();
    let bytes = outcome.into_inner();
    if cancelled {
        warn!("Export cancelled; {} bytes of partial output kept", bytes.len());
    }
    if !bytes.is_empty() || !cancelled {
        fs::write(&request.output, &bytes)?;
    }

    if let Some(pb) = pb {
        if cancelled {
            pb.abandon_with_message("Cancelled");
        } else {
            pb.finish_with_message(format!("✓ Encoded ({:.1} MB)", bytes.len() as f64 / 1e6));
        }
    }

    let result = ExportResult {
        output_path: request.output.clone(),
        plan: job.plan,
        stats: ExportStats {
            total_time: start_time.elapsed(),
            encode_time,
            source_dimensions: prepared.dimensions,
            cue_count: request.cues.as_ref().map(Vec::len).unwrap_or(0),
            output_bytes: bytes.len(),
            engine: engine.name().to_string(),
            description,
        },
    };

    Ok(if cancelled {
        JobOutcome::Cancelled(result)
    } else {
        JobOutcome::Completed(result)
    })
}

/// Render one JPEG per timestamp into `out_dir`, returning the written paths.
///
/// Previews always draw subtitles into the frame, even for a soft-embed
/// request.
pub async fn preview_frames(
    engine: &dyn TranscodeEngine,
    config: &Config,
    request: &ExportRequest,
    times: &[f64],
    out_dir: &Path,
    cancel: &CancelFlag,
) -> Result<JobOutcome<Vec<PathBuf>>> {
    let prepared = prepare_export(config, request, false).await?;
    fs::create_dir_all(out_dir)?;

    let pb = progress_bar(request.show_progress, "Rendering previews...");
    let job = PreviewJob {
        source: request.video.clone(),
        subtitle: prepared.subtitle,
        fonts: prepared.fonts,
        plan: prepared.plan,
        times: times.to_vec(),
    };

    let outcome = engine.preview(&job, cancel).await?;
    let cancelled = outcome.is_cancelled();

    let mut paths = Vec::new();
    for (i, frame) in outcome.into_inner().into_iter().enumerate() {
        let path = out_dir.join(format!("preview_{i}.jpg"));
        fs::write(&path, frame)?;
        paths.push(path);
    }

    if let Some(pb) = pb {
        pb.finish_with_message(format!("✓ {} of {} frame(s)", paths.len(), times.len()));
    }
    info!("Wrote {} preview frame(s) to {:?}", paths.len(), out_dir);

    Ok(if cancelled {
        JobOutcome::Cancelled(paths)
    } else {
        JobOutcome::Completed(paths)
    })
}

/// Print a summary of an export.
pub fn print_summary(result: &ExportResult) {
    let stats = &result.stats;
    println!();
    println!("═══════════════════════════════════════════════════════════════");
    println!("                        Export Complete                         ");
    println!("═══════════════════════════════════════════════════════════════");
    println!();
    println!("  Output:     {}", result.output_path.display());
    println!("  Mode:       {}", stats.description);
    println!(
        "  Source:     {}x{}",
        stats.source_dimensions.0, stats.source_dimensions.1
    );
    println!("  Cues:       {}", stats.cue_count);
    println!("  Size:       {:.1} MB", stats.output_bytes as f64 / 1e6);
    println!("  Engine:     {}", stats.engine);
    println!();
    println!("  Timing:");
    println!("    Encode:      {:.2}s", stats.encode_time.as_secs_f64());
    println!("    Total:       {:.2}s", stats.total_time.as_secs_f64());
    println!();
    println!("═══════════════════════════════════════════════════════════════");
}
