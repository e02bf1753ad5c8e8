// SRT subtitle format
use super::timecode::{format_millis, parse_timecode_millis};
use super::{Cue, SubtitleFormatter};
use crate::config::DisplayMode;
use crate::error::{Result, SubforgeError};

#[derive(Default)]
pub struct SrtFormatter {
    pub mode: DisplayMode,
}

impl SubtitleFormatter for SrtFormatter {
    fn format(&self, cues: &[Cue]) -> String {
        cues.iter()
            .map(|cue| (cue, cue.resolve_text(self.mode)))
            .filter(|(_, text)| !text.is_empty())
            .enumerate()
            .map(|(i, (cue, text))| {
                format!(
                    "{}\n{} --> {}\n{}\n",
                    i + 1,
                    format_timestamp(cue.start_ms()),
                    format_timestamp(cue.end_ms()),
                    text
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn extension(&self) -> &'static str {
        "srt"
    }
}

fn format_timestamp(ms: u64) -> String {
    format_millis(ms, ',')
}

/// Parse SRT blocks. The numeric counter line is optional.
pub fn parse(content: &str) -> Result<Vec<Cue>> {
    let normalized = content.replace("\r\n", "\n");
    let mut cues = Vec::new();

    for (block_no, block) in split_blocks(&normalized).into_iter().enumerate() {
        let Some(timing_pos) = block.iter().position(|line| line.contains("-->")) else {
            return Err(SubforgeError::Validation(format!(
                "SRT block {} has no timing line",
                block_no + 1
            )));
        };

        let (start_ms, end_ms) = parse_timing_line(block[timing_pos])?;
        let text = block[timing_pos + 1..].join("\n");
        cues.push(Cue::from_millis(start_ms, end_ms, text));
    }

    Ok(cues)
}

/// Parse `start --> end`, ignoring anything after the end time.
pub(crate) fn parse_timing_line(line: &str) -> Result<(u64, u64)> {
    let (start, rest) = line.split_once("-->").ok_or_else(|| {
        SubforgeError::Validation(format!("Invalid timing line: {}", line.trim()))
    })?;
    let end = rest.split_whitespace().next().unwrap_or("");
    Ok((parse_timecode_millis(start)?, parse_timecode_millis(end)?))
}

/// Split text into blocks of non-blank lines.
pub(crate) fn split_blocks(content: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current = Vec::new();

    for line in content.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }

    blocks
}
