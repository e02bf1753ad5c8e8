//! Embedded text-subtitle stream discovery and extraction.

use super::ffmpeg::FfmpegEngine;
use super::{is_cancelled, CancelFlag, JobOutcome};
use crate::error::{Result, SubforgeError};
use crate::subtitle::{srt, Cue};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tempfile::TempDir;
use tracing::{debug, info, warn};

static STREAM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Stream #0:(\d+)(?:\(([a-zA-Z0-9]+)\))?: Subtitle: (.*)").expect("Invalid regex")
});

#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleStream {
    /// Absolute stream index within the container.
    pub index: u32,
    /// Language tag, `und` when the container has none.
    pub language: String,
    pub codec: String,
    /// The matched diagnostic line.
    pub info: String,
}

impl SubtitleStream {
    pub fn file_name(&self) -> String {
        format!("track_{}_{}.srt", self.index, self.language)
    }
}

#[derive(Debug, Clone)]
pub struct ExtractedTrack {
    pub stream: SubtitleStream,
    /// The track as SRT text.
    pub content: String,
    pub cues: Vec<Cue>,
}

/// Find subtitle streams in `ffmpeg -i` diagnostics.
pub fn parse_subtitle_streams(diagnostics: &str) -> Vec<SubtitleStream> {
    diagnostics
        .lines()
        .filter_map(|line| {
            let caps = STREAM_RE.captures(line)?;
            Some(SubtitleStream {
                index: caps[1].parse().ok()?,
                language: caps
                    .get(2)
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_else(|| "und".to_string()),
                codec: caps[3].split_whitespace().next().unwrap_or("").to_string(),
                info: caps[0].trim().to_string(),
            })
        })
        .collect()
}

impl FfmpegEngine {
    /// List the subtitle streams of `video`.
    pub async fn probe_subtitle_streams(&self, video: &Path) -> Result<Vec<SubtitleStream>> {
        // `ffmpeg -i` without an output always exits non-zero; only stderr matters.
        let output = tokio::process::Command::new(self.ffmpeg_path())
            .args(["-hide_banner", "-nostdin", "-i"])
            .arg(video)
            .output()
            .await
            .map_err(|e| SubforgeError::Engine(format!("Failed to start FFmpeg: {e}")))?;

        let streams = parse_subtitle_streams(&String::from_utf8_lossy(&output.stderr));
        debug!("Found {} subtitle stream(s)", streams.len());
        Ok(streams)
    }

    /// Extract every text subtitle stream of `video` as SRT.
    ///
    /// Streams that fail to convert or come out empty are skipped. The
    /// cancellation flag is checked between streams.
    pub async fn extract_subtitles(
        &self,
        video: &Path,
        cancel: &CancelFlag,
    ) -> Result<JobOutcome<Vec<ExtractedTrack>>> {
        if !video.is_file() {
            return Err(SubforgeError::MissingResource(video.display().to_string()));
        }

        let streams = self.probe_subtitle_streams(video).await?;
        let _permit = self.acquire().await?;
        let workspace = TempDir::new()?;
        let mut tracks = Vec::new();

        for stream in streams {
            if is_cancelled(cancel) {
                warn!("Extraction cancelled after {} track(s)", tracks.len());
                return Ok(JobOutcome::Cancelled(tracks));
            }

            let out_path = workspace.path().join(format!("out_{}.srt", stream.index));
            let output = tokio::process::Command::new(self.ffmpeg_path())
                .args(["-y", "-nostdin", "-hide_banner", "-i"])
                .arg(video)
                .arg("-map")
                .arg(format!("0:{}", stream.index))
                .arg(&out_path)
                .output()
                .await
                .map_err(|e| SubforgeError::Engine(format!("Failed to start FFmpeg: {e}")))?;

            if !output.status.success() {
                warn!(
                    "Failed to extract stream {}: {}",
                    stream.index,
                    String::from_utf8_lossy(&output.stderr).trim()
                );
                continue;
            }

            let content = match tokio::fs::read_to_string(&out_path).await {
                Ok(content) if !content.trim().is_empty() => content,
                Ok(_) => {
                    warn!("Stream {} is empty", stream.index);
                    continue;
                }
                Err(e) => {
                    warn!("Failed to read stream {}: {e}", stream.index);
                    continue;
                }
            };

            match srt::parse(&content) {
                Ok(cues) => {
                    info!(
                        "Extracted stream {} ({}, {}): {} cues",
                        stream.index,
                        stream.language,
                        stream.codec,
                        cues.len()
                    );
                    tracks.push(ExtractedTrack {
                        stream,
                        content,
                        cues,
                    });
                }
                Err(e) => warn!("Stream {} is not valid SRT: {e}", stream.index),
            }
        }

        Ok(JobOutcome::Completed(tracks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIAGNOSTICS: &str = "\
Input #0, mov,mp4,m4a,3gp,3g2,mj2, from 'input.mp4':
  Stream #0:0(und): Video: h264 (High) (avc1 / 0x31637661), yuv420p, 1920x1080
  Stream #0:1(eng): Audio: aac (LC) (mp4a / 0x6134706D), 48000 Hz, stereo
  Stream #0:2(eng): Subtitle: mov_text (tx3g / 0x67337874), 0 kb/s (default)
  Stream #0:3: Subtitle: subrip
";

    #[test]
    fn test_parse_subtitle_streams() {
        let streams = parse_subtitle_streams(DIAGNOSTICS);

        assert_eq!(streams.len(), 2);
        assert_eq!(streams[0].index, 2);
        assert_eq!(streams[0].language, "eng");
        assert_eq!(streams[0].codec, "mov_text");
        assert!(streams[0].info.starts_with("Stream #0:2(eng): Subtitle"));
        assert_eq!(streams[1].index, 3);
        assert_eq!(streams[1].language, "und");
        assert_eq!(streams[1].codec, "subrip");
        assert_eq!(streams[1].file_name(), "track_3_und.srt");
    }

    #[test]
    fn test_no_subtitle_streams() {
        assert!(parse_subtitle_streams("Stream #0:0: Video: h264").is_empty());
    }
}
