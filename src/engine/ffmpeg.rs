use super::fonts::provision_fonts;
use super::{
    is_cancelled, CancelFlag, EncodeJob, FontAsset, JobOutcome, PreviewJob, ProgressFn,
    SubtitleAsset, TranscodeEngine,
};
use crate::config::Config;
use crate::error::{Result, SubforgeError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Used when probing the source fails or times out.
pub const FALLBACK_DIMENSIONS: (u32, u32) = (1920, 1080);

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(100);
const OUTPUT_NAME: &str = "output.mp4";

/// Check if FFmpeg is installed and accessible.
pub fn check_ffmpeg(ffmpeg: &str) -> Result<()> {
    let output = Command::new(ffmpeg).arg("-version").output().map_err(|e| {
        SubforgeError::Engine(format!(
            "FFmpeg not found. Please install FFmpeg and ensure it's in your PATH. Error: {e}"
        ))
    })?;

    if !output.status.success() {
        return Err(SubforgeError::Engine("FFmpeg check failed".to_string()));
    }

    debug!("FFmpeg is available");
    Ok(())
}

/// Check if FFprobe is installed and accessible.
pub fn check_ffprobe(ffprobe: &str) -> Result<()> {
    let output = Command::new(ffprobe).arg("-version").output().map_err(|e| {
        SubforgeError::Engine(format!(
            "FFprobe not found. Please install FFmpeg (includes FFprobe). Error: {e}"
        ))
    })?;

    if !output.status.success() {
        return Err(SubforgeError::Engine("FFprobe check failed".to_string()));
    }

    debug!("FFprobe is available");
    Ok(())
}

/// Get media duration in seconds using FFprobe.
pub async fn probe_duration(ffprobe: &str, input: &Path) -> Result<f64> {
    let output = tokio::process::Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(input)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| SubforgeError::Engine(format!("Failed to run FFprobe: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(SubforgeError::Engine(format!("FFprobe failed: {stderr}")));
    }

    let duration_str = String::from_utf8_lossy(&output.stdout);
    duration_str.trim().parse().map_err(|e| {
        SubforgeError::Engine(format!(
            "Failed to parse duration '{}': {e}",
            duration_str.trim()
        ))
    })
}

/// Width and height of the first video stream.
///
/// Never fails: any probe error or a probe exceeding `timeout` yields
/// [`FALLBACK_DIMENSIONS`].
pub async fn probe_dimensions(ffprobe: &str, input: &Path, timeout: Duration) -> (u32, u32) {
    let probe = tokio::process::Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height",
            "-of",
            "csv=s=x:p=0",
        ])
        .arg(input)
        .kill_on_drop(true)
        .output();

    match tokio::time::timeout(timeout, probe).await {
        Ok(Ok(output)) if output.status.success() => {
            let text = String::from_utf8_lossy(&output.stdout);
            parse_dimensions(&text).unwrap_or_else(|| {
                warn!("Unexpected ffprobe output '{}', assuming 1920x1080", text.trim());
                FALLBACK_DIMENSIONS
            })
        }
        Ok(Ok(output)) => {
            warn!(
                "FFprobe failed, assuming 1920x1080: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
            FALLBACK_DIMENSIONS
        }
        Ok(Err(e)) => {
            warn!("Failed to run FFprobe, assuming 1920x1080: {e}");
            FALLBACK_DIMENSIONS
        }
        Err(_) => {
            warn!("FFprobe timed out after {:?}, assuming 1920x1080", timeout);
            FALLBACK_DIMENSIONS
        }
    }
}

fn parse_dimensions(text: &str) -> Option<(u32, u32)> {
    let line = text.lines().map(str::trim).find(|l| !l.is_empty())?;
    let (w, h) = line.split_once('x')?;
    let (w, h) = (w.trim().parse().ok()?, h.trim().trim_end_matches('x').parse().ok()?);
    if w == 0 || h == 0 {
        return None;
    }
    Some((w, h))
}

/// Encoder position from one `-progress` line as a ratio of `duration`.
fn parse_progress_line(line: &str, duration: Option<f64>) -> Option<f64> {
    let (key, value) = line.trim().split_once('=')?;
    match key {
        "progress" if value == "end" => Some(1.0),
        "out_time_us" | "out_time_ms" => {
            let duration = duration.filter(|d| *d > 0.0)?;
            let micros: f64 = value.parse().ok()?;
            Some((micros / 1_000_000.0 / duration).clamp(0.0, 1.0))
        }
        _ => None,
    }
}

/// Scratch directory holding everything one job hands to ffmpeg.
struct JobWorkspace {
    dir: TempDir,
    fontconfig: Option<PathBuf>,
}

impl JobWorkspace {
    fn prepare(subtitle: Option<&SubtitleAsset>, fonts: &[FontAsset]) -> Result<Self> {
        let dir = TempDir::new()?;
        debug!("Using job workspace: {:?}", dir.path());

        if let Some(subtitle) = subtitle {
            std::fs::write(dir.path().join(&subtitle.file_name), &subtitle.contents)?;
        }
        let fontconfig = if fonts.is_empty() {
            None
        } else {
            Some(provision_fonts(dir.path(), fonts)?)
        };

        Ok(Self { dir, fontconfig })
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn command(&self, ffmpeg: &str) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(ffmpeg);
        cmd.current_dir(self.path())
            .args(["-y", "-nostdin", "-hide_banner"])
            .kill_on_drop(true);
        if let Some(conf) = &self.fontconfig {
            cmd.env("FONTCONFIG_FILE", conf);
        }
        cmd
    }
}

fn absolute_source(source: &Path) -> Result<PathBuf> {
    if !source.is_file() {
        return Err(SubforgeError::MissingResource(source.display().to_string()));
    }
    Ok(std::path::absolute(source)?)
}

/// Runs jobs through a local `ffmpeg` binary, one at a time.
pub struct FfmpegEngine {
    ffmpeg: String,
    lock: Semaphore,
}

impl FfmpegEngine {
    pub fn new(ffmpeg: impl Into<String>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            lock: Semaphore::new(1),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.ffmpeg_path.clone())
    }

    pub fn ffmpeg_path(&self) -> &str {
        &self.ffmpeg
    }

    pub(crate) async fn acquire(&self) -> Result<tokio::sync::SemaphorePermit<'_>> {
        self.lock
            .acquire()
            .await
            .map_err(|e| SubforgeError::Engine(format!("Engine unavailable: {e}")))
    }
}

#[async_trait]
impl TranscodeEngine for FfmpegEngine {
    async fn encode(
        &self,
        job: &EncodeJob,
        cancel: &CancelFlag,
        progress: Option<ProgressFn>,
    ) -> Result<JobOutcome<Vec<u8>>> {
        let _permit = self.acquire().await?;
        let source = absolute_source(&job.source)?;
        let workspace = JobWorkspace::prepare(job.subtitle.as_ref(), &job.fonts)?;
        let output_path = workspace.path().join(OUTPUT_NAME);

        let args = job.plan.encode_args(&source.to_string_lossy(), OUTPUT_NAME);
        debug!("ffmpeg {}", args.join(" "));

        let mut child = workspace
            .command(&self.ffmpeg)
            .args(["-progress", "pipe:1", "-nostats"])
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SubforgeError::Engine(format!("Failed to start FFmpeg: {e}")))?;

        let stderr = child.stderr.take();
        let stderr_task = tokio::spawn(async move {
            let mut text = String::new();
            if let Some(mut stderr) = stderr {
                let _ = stderr.read_to_string(&mut text).await;
            }
            text
        });

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SubforgeError::Engine("FFmpeg stdout unavailable".to_string()))?;
        let mut lines = BufReader::new(stdout).lines();
        let mut ticker = tokio::time::interval(CANCEL_POLL_INTERVAL);
        let mut stdout_open = true;

        let status = loop {
            if is_cancelled(cancel) {
                warn!("Encode cancelled, stopping FFmpeg");
                let _ = child.kill().await;
                let partial = tokio::fs::read(&output_path).await.unwrap_or_default();
                return Ok(JobOutcome::Cancelled(partial));
            }

            tokio::select! {
                line = lines.next_line(), if stdout_open => match line? {
                    Some(line) => {
                        if let (Some(report), Some(ratio)) =
                            (&progress, parse_progress_line(&line, job.duration))
                        {
                            report(ratio);
                        }
                    }
                    None => stdout_open = false,
                },
                status = child.wait(), if !stdout_open => break status?,
                _ = ticker.tick() => {}
            }
        };

        let diagnostics = stderr_task.await.unwrap_or_default();
        if !status.success() {
            return Err(SubforgeError::Engine(format!(
                "FFmpeg exited with {status}: {}",
                diagnostics.trim()
            )));
        }

        let bytes = tokio::fs::read(&output_path).await?;
        info!("Encoded {} bytes", bytes.len());
        Ok(JobOutcome::Completed(bytes))
    }

    async fn preview(
        &self,
        job: &PreviewJob,
        cancel: &CancelFlag,
    ) -> Result<JobOutcome<Vec<Vec<u8>>>> {
        let _permit = self.acquire().await?;
        let source = absolute_source(&job.source)?;
        let workspace = JobWorkspace::prepare(job.subtitle.as_ref(), &job.fonts)?;
        let source = source.to_string_lossy();

        let mut frames = Vec::with_capacity(job.times.len());
        for (i, &time) in job.times.iter().enumerate() {
            if is_cancelled(cancel) {
                warn!("Preview cancelled after {} frame(s)", frames.len());
                return Ok(JobOutcome::Cancelled(frames));
            }

            let image = format!("output_{i}.jpg");
            let output = workspace
                .command(&self.ffmpeg)
                .args(job.plan.preview_args(&source, time, &image))
                .output()
                .await
                .map_err(|e| SubforgeError::Engine(format!("Failed to start FFmpeg: {e}")))?;

            if !output.status.success() {
                warn!(
                    "Failed to render preview frame at {}s: {}",
                    time,
                    String::from_utf8_lossy(&output.stderr).trim()
                );
                continue;
            }

            let image_path = workspace.path().join(&image);
            match tokio::fs::read(&image_path).await {
                Ok(bytes) => {
                    frames.push(bytes);
                    let _ = tokio::fs::remove_file(&image_path).await;
                }
                Err(e) => warn!("Failed to read preview frame at {}s: {e}", time),
            }
            debug!("Preview {}/{} done", i + 1, job.times.len());
        }

        Ok(JobOutcome::Completed(frames))
    }

    fn name(&self) -> &'static str {
        "ffmpeg"
    }
}
