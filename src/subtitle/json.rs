// JSON subtitle format
use super::timecode::seconds_to_timecode;
use super::{Cue, CueStyle, SubtitleFormatter};
use crate::config::DisplayMode;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Writes the editor's lossless cue list (`text`, `text2`, `style`) plus the
/// text resolved for the configured display mode. Every cue is written, even
/// when its resolved text is empty.
#[derive(Default)]
pub struct JsonFormatter {
    pub source_file: Option<String>,
    pub language: Option<String>,
    pub mode: DisplayMode,
}

#[derive(Serialize)]
struct JsonOutput {
    metadata: JsonMetadata,
    subtitles: Vec<JsonSubtitle>,
}

#[derive(Serialize)]
struct JsonMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    source_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    language: Option<String>,
    display_mode: DisplayMode,
    subtitle_count: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonSubtitle {
    index: usize,
    start_time: f64,
    end_time: f64,
    start_formatted: String,
    end_formatted: String,
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    text2: Option<String>,
    display_text: String,
    #[serde(skip_serializing_if = "CueStyle::is_empty")]
    style: CueStyle,
}

impl SubtitleFormatter for JsonFormatter {
    fn format(&self, cues: &[Cue]) -> String {
        let subtitles: Vec<JsonSubtitle> = cues
            .iter()
            .enumerate()
            .map(|(i, cue)| JsonSubtitle {
                index: i + 1,
                start_time: cue.start_time(),
                end_time: cue.end_time(),
                start_formatted: seconds_to_timecode(cue.start_time()),
                end_formatted: seconds_to_timecode(cue.end_time()),
                text: cue.text().to_string(),
                text2: cue.text2().map(str::to_string),
                display_text: cue.resolve_text(self.mode),
                style: cue.style().clone(),
            })
            .collect();

        let output = JsonOutput {
            metadata: JsonMetadata {
                source_file: self.source_file.clone(),
                language: self.language.clone(),
                display_mode: self.mode,
                subtitle_count: subtitles.len(),
            },
            subtitles,
        };

        serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string())
    }

    fn extension(&self) -> &'static str {
        "json"
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonInput {
    Wrapped { subtitles: Vec<JsonCue> },
    Bare(Vec<JsonCue>),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonCue {
    #[serde(alias = "start")]
    start_time: f64,
    #[serde(alias = "end")]
    end_time: f64,
    #[serde(default)]
    text: String,
    #[serde(default)]
    text2: Option<String>,
    #[serde(default)]
    style: Option<CueStyle>,
}

/// Parse either an exported document or a bare array of cue objects.
pub fn parse(content: &str) -> Result<Vec<Cue>> {
    let input: JsonInput = serde_json::from_str(content)?;
    let items = match input {
        JsonInput::Wrapped { subtitles } => subtitles,
        JsonInput::Bare(items) => items,
    };

    Ok(items
        .into_iter()
        .map(|item| {
            Cue::new(item.start_time, item.end_time, item.text)
                .with_text2(item.text2)
                .with_style(item.style.unwrap_or_default())
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_format() {
        let cues = vec![Cue::from_millis(1500, 4000, "Hello, world!")];

        let formatter = JsonFormatter::default();
        let output = formatter.format(&cues);

        assert!(output.contains("\"subtitle_count\": 1"));
        assert!(output.contains("\"text\": \"Hello, world!\""));
        assert!(output.contains("\"startTime\": 1.5"));
        assert!(output.contains("\"startFormatted\": \"00:00:01.500\""));
        assert!(!output.contains("\"style\""));
    }

    #[test]
    fn test_json_round_trip_keeps_secondary_and_style() {
        let style = CueStyle {
            color: Some("#ff0000".to_string()),
            x: Some(10.0),
            y: Some(20.0),
            ..Default::default()
        };
        let cues = vec![
            Cue::from_millis(1001, 2002, "main")
                .with_text2(Some("second".to_string()))
                .with_style(style),
            Cue::from_millis(3000, 3999, "plain"),
        ];

        let output = JsonFormatter::default().format(&cues);
        assert_eq!(parse(&output).unwrap(), cues);
    }

    #[test]
    fn test_parse_bare_array() {
        let content = r#"[{"startTime": 0.5, "endTime": 1.25, "text": "a", "style": {"fontSize": 40}}]"#;
        let cues = parse(content).unwrap();

        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].start_ms(), 500);
        assert_eq!(cues[0].end_ms(), 1250);
        assert_eq!(cues[0].style().font_size, Some(40.0));
        assert_eq!(cues[0].text2(), None);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse("{\"nope\": true}").is_err());
        assert!(parse("not json").is_err());
    }

    #[test]
    fn test_secondary_mode_keeps_cues_without_secondary() {
        let cues = vec![
            Cue::from_millis(0, 1000, "main only"),
            Cue::from_millis(1000, 2000, "m").with_text2(Some("s".to_string())),
        ];
        let formatter = JsonFormatter {
            mode: DisplayMode::Secondary,
            ..Default::default()
        };
        let output = formatter.format(&cues);
        assert!(output.contains("\"subtitle_count\": 2"));
        assert!(output.contains("\"displayText\": \"\""));
        assert!(output.contains("\"displayText\": \"s\""));
        assert_eq!(parse(&output).unwrap(), cues);
    }
}
