//! Advanced SubStation Alpha markup compiler and parser.
//!
//! The compiled document carries a single `Default` style derived from
//! [`StyleConfig`]; per-cue overrides are emitted as an inline `{...}` block
//! at the start of each dialogue line.

use super::style::{AssColor, FontFamily};
use super::timecode::{format_centis, parse_timecode_millis};
use super::{Cue, FormatOptions, SubtitleFormatter, TextField};
use crate::config::DisplayMode;
use crate::error::{Result, SubforgeError};
use regex::Regex;
use std::sync::LazyLock;

/// Secondary lines render at this fraction of the main font size.
pub const SECONDARY_SCALE: f64 = 0.8;

/// Transparent 25px line separating the two lines of a dual-mode cue.
const DUAL_SPACER: &str = "\\N{\\fs25\\1a&HFF&} \\N";

const OUTLINE: f64 = 2.5;
const SHADOW: f64 = 1.5;
const ALIGNMENT_BOTTOM_CENTER: u8 = 2;

static OVERRIDE_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[^}]*\}").expect("Invalid regex"));

pub struct AssFormatter {
    options: FormatOptions,
}

impl AssFormatter {
    pub fn new(options: FormatOptions) -> Self {
        Self { options }
    }
}

impl SubtitleFormatter for AssFormatter {
    fn format(&self, cues: &[Cue]) -> String {
        compile_markup(cues, &self.options)
    }

    fn extension(&self) -> &'static str {
        "ass"
    }
}

/// Compile a cue list into a complete ASS document.
pub fn compile_markup(cues: &[Cue], options: &FormatOptions) -> String {
    let header_size = header_font_size(options);
    let mut doc = script_header(options, header_size);

    for cue in cues {
        if let Some(text) = dialogue_text(cue, options, header_size) {
            doc.push_str(&format!(
                "\nDialogue: 0,{},{},Default,,0,0,0,,{}",
                format_centis(cue.start_ms()),
                format_centis(cue.end_ms()),
                text
            ));
        }
    }

    doc.push('\n');
    doc
}

fn header_font_size(options: &FormatOptions) -> f64 {
    match options.mode {
        DisplayMode::Secondary => (options.style.font_size * SECONDARY_SCALE).round(),
        _ => options.style.font_size,
    }
}

fn script_header(options: &FormatOptions, font_size: f64) -> String {
    let style = &options.style;
    let font = FontFamily::resolve(&style.font_family);
    let primary = AssColor::from_css(&style.color);
    let outline = AssColor::from_css(&style.background_color);
    let margin_lr = (options.width as f64 * 0.1).round() as i64;
    let margin_v = style.bottom + 10.0;

    format!(
        "[Script Info]\n\
         ScriptType: v4.00+\n\
         Collisions: Normal\n\
         PlayResX: {width}\n\
         PlayResY: {height}\n\
         ScaledBorderAndShadow: yes\n\
         WrapStyle: 0\n\
         \n\
         [V4+ Styles]\n\
         Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding\n\
         Style: Default,{font},{font_size},{primary},&H000000FF,{outline},&H00000000,0,0,0,0,100,100,{spacing},0,1,{OUTLINE},{SHADOW},{ALIGNMENT_BOTTOM_CENTER},{margin_lr},{margin_lr},{margin_v},1\n\
         \n\
         [Events]\n\
         Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text",
        width = options.width,
        height = options.height,
        font = font.font_name(),
        primary = primary.to_style_value(),
        outline = outline.to_style_value(),
        spacing = style.letter_spacing,
    )
}

fn escape_text(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\n', "\\N")
}

/// Text of one dialogue line including its override block, or `None` when
/// the cue has nothing to show in `mode`.
fn dialogue_text(cue: &Cue, options: &FormatOptions, header_size: f64) -> Option<String> {
    let mode = options.mode;
    let main = escape_text(cue.text());
    let secondary = escape_text(cue.field(TextField::Text2));

    let body = match mode {
        DisplayMode::Main => main,
        DisplayMode::Secondary => secondary,
        DisplayMode::Dual => {
            let main_size = cue.style().font_size.unwrap_or(header_size).round() as i64;
            let secondary_size = (main_size as f64 * SECONDARY_SCALE).round() as i64;
            // The spacer's transparency carries to the end of the line.
            let main_alpha = primary_alpha(cue, options);
            match (secondary.is_empty(), main.is_empty()) {
                (false, false) => format!(
                    "{{\\fs{secondary_size}}}{secondary}{DUAL_SPACER}{{\\fs{main_size}\\1a&H{main_alpha:02X}&}}{main}"
                ),
                (false, true) => format!("{{\\fs{secondary_size}}}{secondary}"),
                (true, false) => format!("{{\\fs{main_size}}}{main}"),
                (true, true) => String::new(),
            }
        }
    };

    if body.is_empty() {
        return None;
    }

    let overrides = override_tags(cue, mode);
    if overrides.is_empty() {
        Some(body)
    } else {
        Some(format!("{{{overrides}}}{body}"))
    }
}

/// Fill alpha of the main line: the cue's own color when overridden, the
/// global color otherwise.
fn primary_alpha(cue: &Cue, options: &FormatOptions) -> u8 {
    let color = cue.style().color.as_deref().unwrap_or(&options.style.color);
    AssColor::from_css(color).alpha
}

/// Inline directives for a cue's style override, in position, color, size,
/// font order. Dual mode sizes its lines itself, so `\fs` is left out there.
fn override_tags(cue: &Cue, mode: DisplayMode) -> String {
    let style = cue.style();
    let mut tags = String::new();

    if let Some((x, y)) = style.position() {
        tags.push_str(&format!("\\pos({},{})", x.round() as i64, y.round() as i64));
    }
    if let Some(color) = &style.color {
        tags.push_str(&AssColor::from_css(color).to_override_tags());
    }
    if let Some(size) = style.font_size {
        let base = size.round();
        match mode {
            DisplayMode::Main => tags.push_str(&format!("\\fs{}", base as i64)),
            DisplayMode::Secondary => {
                tags.push_str(&format!("\\fs{}", (base * SECONDARY_SCALE).round() as i64))
            }
            DisplayMode::Dual => {}
        }
    }
    if let Some(family) = &style.font_family {
        tags.push_str(&format!("\\fn{}", FontFamily::resolve(family).font_name()));
    }

    tags
}

/// Parse the `[Events]` section of an ASS/SSA document.
///
/// Override blocks are stripped, `\N`/`\n` become line breaks and `\h` a
/// space. Times keep the document's centisecond precision.
pub fn parse(content: &str) -> Result<Vec<Cue>> {
    let mut in_events = false;
    let mut fields: Option<Vec<String>> = None;
    let mut cues = Vec::new();

    for (line_no, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.starts_with('[') {
            in_events = line.eq_ignore_ascii_case("[events]");
            continue;
        }
        if !in_events {
            continue;
        }

        if let Some(format) = line.strip_prefix("Format:") {
            fields = Some(
                format
                    .split(',')
                    .map(|f| f.trim().to_ascii_lowercase())
                    .collect(),
            );
            continue;
        }

        let Some(values) = line.strip_prefix("Dialogue:") else {
            continue;
        };
        let fields = fields.as_ref().ok_or_else(|| {
            SubforgeError::Validation(format!(
                "Dialogue before Format line at line {}",
                line_no + 1
            ))
        })?;

        let parts: Vec<&str> = values.trim_start().splitn(fields.len(), ',').collect();
        let field = |name: &str| -> Result<&str> {
            fields
                .iter()
                .position(|f| f == name)
                .and_then(|i| parts.get(i).copied())
                .ok_or_else(|| {
                    SubforgeError::Validation(format!(
                        "Dialogue at line {} has no {} field",
                        line_no + 1,
                        name
                    ))
                })
        };

        let start_ms = parse_timecode_millis(field("start")?)?;
        let end_ms = parse_timecode_millis(field("end")?)?;
        cues.push(Cue::from_millis(start_ms, end_ms, strip_markup(field("text")?)));
    }

    if fields.is_none() {
        return Err(SubforgeError::Validation(
            "ASS document has no [Events] Format line".to_string(),
        ));
    }

    Ok(cues)
}

fn strip_markup(text: &str) -> String {
    OVERRIDE_BLOCK_RE
        .replace_all(text, "")
        .replace("\\N", "\n")
        .replace("\\n", "\n")
        .replace("\\h", " ")
}
