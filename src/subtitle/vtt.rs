// WebVTT subtitle format
use super::srt::{parse_timing_line, split_blocks};
use super::timecode::format_millis;
use super::{Cue, SubtitleFormatter};
use crate::config::DisplayMode;
use crate::error::{Result, SubforgeError};

#[derive(Default)]
pub struct VttFormatter {
    pub mode: DisplayMode,
}

impl SubtitleFormatter for VttFormatter {
    fn format(&self, cues: &[Cue]) -> String {
        let mut output = String::from("WEBVTT\n\n");

        for cue in cues {
            let text = cue.resolve_text(self.mode);
            if text.is_empty() {
                continue;
            }
            output.push_str(&format!(
                "{} --> {}\n{}\n\n",
                format_timestamp(cue.start_ms()),
                format_timestamp(cue.end_ms()),
                text
            ));
        }

        output
    }

    fn extension(&self) -> &'static str {
        "vtt"
    }
}

fn format_timestamp(ms: u64) -> String {
    format_millis(ms, '.')
}

/// Parse a WebVTT document, skipping the header, NOTE/STYLE/REGION blocks
/// and cue identifiers.
pub fn parse(content: &str) -> Result<Vec<Cue>> {
    let normalized = content.replace("\r\n", "\n");
    let blocks = split_blocks(&normalized);

    let Some(header) = blocks.first() else {
        return Err(SubforgeError::Validation("Empty WebVTT document".to_string()));
    };
    if !header[0].trim_start().starts_with("WEBVTT") {
        return Err(SubforgeError::Validation(
            "WebVTT document must start with 'WEBVTT'".to_string(),
        ));
    }

    let mut cues = Vec::new();
    for block in &blocks[1..] {
        let first = block[0].trim_start();
        if first.starts_with("NOTE") || first.starts_with("STYLE") || first.starts_with("REGION") {
            continue;
        }
        let Some(timing_pos) = block.iter().position(|line| line.contains("-->")) else {
            continue;
        };
        let (start_ms, end_ms) = parse_timing_line(block[timing_pos])?;
        cues.push(Cue::from_millis(start_ms, end_ms, block[timing_pos + 1..].join("\n")));
    }

    Ok(cues)
}
