//! ffmpeg filter-graph compilation.
//!
//! Node order is fixed: erasure, then subtitle burn, then scaling, so every
//! pixel coordinate in the graph and in the markup refers to the source
//! resolution.

use super::encoder::EncoderParams;
use super::interval::{enable_expression, merge_intervals, TimeRange, MERGE_TOLERANCE};
use super::ErasureSettings;
use crate::config::{QualityProfile, ResolutionMode};
use crate::error::Result;
use tracing::debug;

const SOURCE_VIDEO: &str = "[0:v]";
const ERASED_LABEL: &str = "[v_erased]";
const SUBBED_LABEL: &str = "[subbed]";
const OUTPUT_LABEL: &str = "[outv]";
const SCALED_LABEL: &str = "[scaled]";
const BLUR_PASSES: u8 = 2;

/// Subtitle codec used for soft tracks; portable across MP4 players.
pub const SOFT_SUBTITLE_CODEC: &str = "mov_text";

/// Escape a value embedded in a filter option. `\`, `:`, `,` and `'` are
/// filter-graph syntax.
pub fn escape_filter_value(raw: &str) -> String {
    raw.replace('\\', r"\\")
        .replace(':', r"\:")
        .replace(',', r"\,")
        .replace('\'', r"\'")
}

/// Subtitle document and font directory as the engine will see them.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleInput {
    pub file_name: String,
    pub fonts_dir: String,
}

impl SubtitleInput {
    pub fn new(file_name: impl Into<String>, fonts_dir: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            fonts_dir: fonts_dir.into(),
        }
    }

    fn burn_filter(&self) -> String {
        format!(
            "subtitles={}:fontsdir={}",
            escape_filter_value(&self.file_name),
            escape_filter_value(&self.fonts_dir)
        )
    }
}

#[derive(Debug, Clone)]
pub struct FilterGraphRequest {
    pub erasure: Option<ErasureSettings>,
    /// Cue spans gating the erasure node. `None` or empty keeps it always on.
    pub smart_ranges: Option<Vec<TimeRange>>,
    pub subtitles: Option<SubtitleInput>,
    pub resolution: ResolutionMode,
    pub quality: QualityProfile,
    pub soft_embed: bool,
    pub subtitle_language: String,
}

impl Default for FilterGraphRequest {
    fn default() -> Self {
        Self {
            erasure: None,
            smart_ranges: None,
            subtitles: None,
            resolution: ResolutionMode::Original,
            quality: QualityProfile::Medium,
            soft_embed: false,
            subtitle_language: "und".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum VideoFilter {
    /// Video passes through the encoder unfiltered.
    None,
    /// A single-input chain for `-vf`.
    Simple(String),
    /// A labelled graph for `-filter_complex`, with the label to map.
    Complex { graph: String, output: String },
}

/// Subtitle document mapped as a separate stream instead of being burned.
#[derive(Debug, Clone, PartialEq)]
pub struct SoftSubtitleTrack {
    pub file_name: String,
    pub language: String,
}

/// Everything the engine needs besides the input files.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportPlan {
    pub video_filter: VideoFilter,
    pub soft_subtitle: Option<SoftSubtitleTrack>,
    pub encoder: EncoderParams,
}

pub fn compile_filter_graph(request: &FilterGraphRequest) -> Result<ExportPlan> {
    let target_height = request.resolution.target_height();
    let burn = match (&request.subtitles, request.soft_embed) {
        (Some(subtitles), false) => Some(subtitles.burn_filter()),
        _ => None,
    };

    let erasure = request.erasure.filter(|settings| {
        let usable = settings.region.is_usable();
        if !usable {
            debug!("Skipping erasure for unusable region {:?}", settings.region);
        }
        usable
    });

    let video_filter = match erasure {
        Some(settings) => {
            let mut graph = erasure_node(&settings, request.smart_ranges.as_deref());
            let mut label = ERASED_LABEL;

            if let Some(burn) = &burn {
                graph.push_str(&format!(";{ERASED_LABEL}{burn}{OUTPUT_LABEL}"));
                label = OUTPUT_LABEL;
            }
            if let Some(height) = target_height {
                graph.push_str(&format!(";{label}scale=-2:{height}{SCALED_LABEL}"));
                label = SCALED_LABEL;
            }

            VideoFilter::Complex {
                graph,
                output: label.to_string(),
            }
        }
        None => match (target_height, &burn) {
            (Some(height), Some(burn)) => VideoFilter::Complex {
                graph: format!(
                    "{SOURCE_VIDEO}{burn}{SUBBED_LABEL};{SUBBED_LABEL}scale=-2:{height}{OUTPUT_LABEL}"
                ),
                output: OUTPUT_LABEL.to_string(),
            },
            (Some(height), None) => VideoFilter::Complex {
                graph: format!("{SOURCE_VIDEO}scale=-2:{height}{OUTPUT_LABEL}"),
                output: OUTPUT_LABEL.to_string(),
            },
            (None, Some(burn)) => VideoFilter::Simple(burn.clone()),
            (None, None) => VideoFilter::None,
        },
    };

    let soft_subtitle = match (&request.subtitles, request.soft_embed) {
        (Some(subtitles), true) => Some(SoftSubtitleTrack {
            file_name: subtitles.file_name.clone(),
            language: request.subtitle_language.clone(),
        }),
        _ => None,
    };

    debug!("Compiled video filter: {:?}", video_filter);

    Ok(ExportPlan {
        video_filter,
        soft_subtitle,
        encoder: EncoderParams::for_profile(request.quality),
    })
}

fn erasure_node(settings: &ErasureSettings, smart_ranges: Option<&[TimeRange]>) -> String {
    let (x, y, w, h) = settings.region.rounded();
    let enable = smart_ranges
        .map(|ranges| merge_intervals(ranges, MERGE_TOLERANCE))
        .filter(|merged| !merged.is_empty())
        .map(|merged| format!(":enable='{}'", enable_expression(&merged)))
        .unwrap_or_default();

    if settings.is_removal() {
        format!("{SOURCE_VIDEO}delogo=x={x}:y={y}:w={w}:h={h}:show=0{enable}{ERASED_LABEL}")
    } else {
        let radius = settings.blur_radius();
        format!(
            "{SOURCE_VIDEO}split[main][to_blur];[to_blur]crop={w}:{h}:{x}:{y},boxblur={radius}:{BLUR_PASSES}[blurred];[main][blurred]overlay={x}:{y}{enable}{ERASED_LABEL}"
        )
    }
}

impl ExportPlan {
    /// The filter expression, if any.
    pub fn graph_expression(&self) -> Option<&str> {
        match &self.video_filter {
            VideoFilter::None => None,
            VideoFilter::Simple(chain) => Some(chain.as_str()),
            VideoFilter::Complex { graph, .. } => Some(graph.as_str()),
        }
    }

    /// Explicit `-map` targets, empty when ffmpeg's default selection applies.
    pub fn output_mapping(&self) -> Vec<String> {
        let video = match &self.video_filter {
            VideoFilter::Complex { output, .. } => Some(output.clone()),
            _ if self.soft_subtitle.is_some() => Some("0:v".to_string()),
            _ => None,
        };

        let Some(video) = video else {
            return Vec::new();
        };

        let mut mapping = vec![video, "0:a?".to_string()];
        if self.soft_subtitle.is_some() {
            mapping.push("1:0".to_string());
        }
        mapping
    }

    /// Arguments for a full encode of `video` into `output`.
    pub fn encode_args(&self, video: &str, output: &str) -> Vec<String> {
        let mut args = vec!["-i".to_string(), video.to_string()];
        if let Some(track) = &self.soft_subtitle {
            args.extend(["-i".to_string(), track.file_name.clone()]);
        }

        args.extend(self.filter_args());
        for target in self.output_mapping() {
            args.extend(["-map".to_string(), target]);
        }

        if let Some(track) = &self.soft_subtitle {
            args.extend(
                [
                    "-c:s",
                    SOFT_SUBTITLE_CODEC,
                    "-metadata:s:s:0",
                    format!("language={}", track.language).as_str(),
                    "-metadata:s:s:0",
                    "title=Subtitle",
                    "-metadata:s:s:0",
                    "handler_name=Subtitle",
                    "-disposition:s:0",
                    "default",
                ]
                .map(String::from),
            );
        }

        args.extend(self.encoder.to_args());
        args.push(output.to_string());
        args
    }

    /// Arguments rendering a single frame at `time` seconds into `image`.
    pub fn preview_args(&self, video: &str, time: f64, image: &str) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "-ss".into(),
            time.to_string(),
            "-copyts".into(),
            "-i".into(),
            video.into(),
            "-vframes".into(),
            "1".into(),
        ];

        args.extend(self.filter_args());
        if let VideoFilter::Complex { output, .. } = &self.video_filter {
            args.extend(["-map".to_string(), output.clone()]);
        }

        args.push(image.to_string());
        args
    }

    fn filter_args(&self) -> Vec<String> {
        match &self.video_filter {
            VideoFilter::None => Vec::new(),
            VideoFilter::Simple(chain) => vec!["-vf".to_string(), chain.clone()],
            VideoFilter::Complex { graph, .. } => {
                vec!["-filter_complex".to_string(), graph.clone()]
            }
        }
    }
}
