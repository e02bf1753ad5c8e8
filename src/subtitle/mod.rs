pub mod ass;
pub mod edit;
pub mod history;
pub mod json;
pub mod srt;
pub mod style;
pub mod timecode;
pub mod vtt;

pub use edit::{
    align_secondary, insert_after, merge_adjacent, remove, reset_styles, split_at, swap_tracks,
    update_cue, update_text, MergeDirection,
};
pub use history::{EditHistory, DEFAULT_HISTORY_CAPACITY};
pub use style::{AssColor, FontFamily, StyleConfig};

use crate::config::{DisplayMode, SubtitleFormat};
use crate::error::{Result, SubforgeError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use timecode::{millis_to_seconds, seconds_to_millis};
use tracing::debug;

/// Sparse per-cue style override.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CueStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
}

impl CueStyle {
    pub fn is_empty(&self) -> bool {
        self == &CueStyle::default()
    }

    /// Absolute position, only when both coordinates are set.
    pub fn position(&self) -> Option<(f64, f64)> {
        match (self.x, self.y) {
            (Some(x), Some(y)) => Some((x, y)),
            _ => None,
        }
    }
}

/// Which of a cue's two text lines an edit targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextField {
    Text,
    Text2,
}

impl TextField {
    pub fn other(self) -> Self {
        match self {
            TextField::Text => TextField::Text2,
            TextField::Text2 => TextField::Text,
        }
    }
}

/// One timed text cue.
///
/// Cues are values: every `with_*` method consumes the cue and returns a new
/// one, so a list snapshot held by the edit history is never aliased by a
/// later edit. Times are stored as whole milliseconds; negative inputs clamp
/// to zero. A cue whose end is not after its start is kept as-is and reported
/// by [`Cue::is_valid`].
#[derive(Debug, Clone, PartialEq)]
pub struct Cue {
    start_ms: u64,
    end_ms: u64,
    text: String,
    text2: Option<String>,
    style: CueStyle,
}

impl Cue {
    pub fn new(start_time: f64, end_time: f64, text: impl Into<String>) -> Self {
        Self::from_millis(
            seconds_to_millis(start_time),
            seconds_to_millis(end_time),
            text,
        )
    }

    pub fn from_millis(start_ms: u64, end_ms: u64, text: impl Into<String>) -> Self {
        Self {
            start_ms,
            end_ms,
            text: text.into(),
            text2: None,
            style: CueStyle::default(),
        }
    }

    pub fn with_start_time(mut self, start_time: f64) -> Self {
        self.start_ms = seconds_to_millis(start_time);
        self
    }

    pub fn with_end_time(mut self, end_time: f64) -> Self {
        self.end_ms = seconds_to_millis(end_time);
        self
    }

    pub(crate) fn with_start_ms(mut self, start_ms: u64) -> Self {
        self.start_ms = start_ms;
        self
    }

    pub(crate) fn with_end_ms(mut self, end_ms: u64) -> Self {
        self.end_ms = end_ms;
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_text2(mut self, text2: Option<String>) -> Self {
        self.text2 = text2;
        self
    }

    pub fn with_style(mut self, style: CueStyle) -> Self {
        self.style = style;
        self
    }

    /// Replace one text field; `Text2` always ends up `Some`.
    pub fn with_field(self, field: TextField, value: impl Into<String>) -> Self {
        match field {
            TextField::Text => self.with_text(value),
            TextField::Text2 => self.with_text2(Some(value.into())),
        }
    }

    pub fn start_time(&self) -> f64 {
        millis_to_seconds(self.start_ms)
    }

    pub fn end_time(&self) -> f64 {
        millis_to_seconds(self.end_ms)
    }

    pub fn start_ms(&self) -> u64 {
        self.start_ms
    }

    pub fn end_ms(&self) -> u64 {
        self.end_ms
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn text2(&self) -> Option<&str> {
        self.text2.as_deref()
    }

    pub fn style(&self) -> &CueStyle {
        &self.style
    }

    /// Contents of a text field, with an absent secondary line read as empty.
    pub fn field(&self, field: TextField) -> &str {
        match field {
            TextField::Text => &self.text,
            TextField::Text2 => self.text2.as_deref().unwrap_or(""),
        }
    }

    /// Duration in seconds; negative for an illegal cue.
    pub fn duration(&self) -> f64 {
        (self.end_ms as i64 - self.start_ms as i64) as f64 / 1000.0
    }

    pub fn midpoint(&self) -> f64 {
        (self.start_time() + self.end_time()) / 2.0
    }

    /// Length of the time span shared with `other`, zero when disjoint.
    pub fn overlap(&self, other: &Cue) -> f64 {
        let start = self.start_time().max(other.start_time());
        let end = self.end_time().min(other.end_time());
        (end - start).max(0.0)
    }

    pub fn is_valid(&self) -> bool {
        self.start_ms < self.end_ms
    }

    /// Text shown for this cue in a plain-text export under `mode`.
    ///
    /// Dual mode stacks the secondary line above the main line, matching the
    /// order used by the ASS compiler.
    pub fn resolve_text(&self, mode: DisplayMode) -> String {
        let main = self.text.as_str();
        let secondary = self.field(TextField::Text2);
        match mode {
            DisplayMode::Main => main.to_string(),
            DisplayMode::Secondary => secondary.to_string(),
            DisplayMode::Dual => [secondary, main]
                .into_iter()
                .filter(|line| !line.is_empty())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// Parameters shared by every subtitle formatter.
#[derive(Debug, Clone)]
pub struct FormatOptions {
    pub mode: DisplayMode,
    pub style: StyleConfig,
    /// Canvas the markup is laid out against, in source-video pixels.
    pub width: u32,
    pub height: u32,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            mode: DisplayMode::Main,
            style: StyleConfig::default(),
            width: 1920,
            height: 1080,
        }
    }
}

pub trait SubtitleFormatter {
    fn format(&self, cues: &[Cue]) -> String;
    fn extension(&self) -> &'static str;
}

pub fn create_formatter(format: SubtitleFormat, options: &FormatOptions) -> Box<dyn SubtitleFormatter> {
    match format {
        SubtitleFormat::Srt => Box::new(srt::SrtFormatter { mode: options.mode }),
        SubtitleFormat::Vtt => Box::new(vtt::VttFormatter { mode: options.mode }),
        SubtitleFormat::Ass => Box::new(ass::AssFormatter::new(options.clone())),
        SubtitleFormat::Json => Box::new(json::JsonFormatter {
            mode: options.mode,
            ..Default::default()
        }),
    }
}

/// Parse subtitle text in the given format.
pub fn parse_subtitles(content: &str, format: SubtitleFormat) -> Result<Vec<Cue>> {
    let content = content.trim_start_matches('\u{feff}');
    let cues = match format {
        SubtitleFormat::Srt => srt::parse(content)?,
        SubtitleFormat::Vtt => vtt::parse(content)?,
        SubtitleFormat::Ass => ass::parse(content)?,
        SubtitleFormat::Json => json::parse(content)?,
    };
    debug!("Parsed {} cues as {}", cues.len(), format);
    Ok(cues)
}

/// Guess a subtitle format from its contents.
pub fn detect_format(content: &str) -> SubtitleFormat {
    let head = content.trim_start_matches('\u{feff}').trim_start();
    if head.starts_with("WEBVTT") {
        SubtitleFormat::Vtt
    } else if head.starts_with("[Script Info]") || head.contains("\nDialogue:") {
        SubtitleFormat::Ass
    } else if head.starts_with('[') || head.starts_with('{') {
        SubtitleFormat::Json
    } else {
        SubtitleFormat::Srt
    }
}

/// Read a subtitle file, using the extension when recognised and the
/// contents otherwise.
pub fn read_subtitle_file(path: &Path) -> Result<Vec<Cue>> {
    if !path.exists() {
        return Err(SubforgeError::MissingResource(path.display().to_string()));
    }
    let content = std::fs::read_to_string(path)?;
    let format = SubtitleFormat::from_path(path).unwrap_or_else(|| detect_format(&content));
    parse_subtitles(&content, format)
}

/// Reject lists holding an illegal cue before they reach a compiler.
pub fn validate_cues(cues: &[Cue]) -> Result<()> {
    match cues.iter().position(|cue| !cue.is_valid()) {
        Some(index) => {
            let cue = &cues[index];
            Err(SubforgeError::Validation(format!(
                "Cue {} has an invalid time range ({} -> {})",
                index + 1,
                timecode::seconds_to_timecode(cue.start_time()),
                timecode::seconds_to_timecode(cue.end_time())
            )))
        }
        None => Ok(()),
    }
}
