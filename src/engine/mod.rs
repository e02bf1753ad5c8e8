pub mod ffmpeg;
pub mod fonts;
pub mod streams;

pub use ffmpeg::{check_ffmpeg, check_ffprobe, probe_dimensions, probe_duration, FfmpegEngine};
pub use fonts::{required_families, resolve_font, FontAsset, FONTS_DIR_NAME};
pub use streams::{parse_subtitle_streams, ExtractedTrack, SubtitleStream};

use crate::error::Result;
use crate::render::ExportPlan;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag shared with a running job.
pub type CancelFlag = Arc<AtomicBool>;

/// Encode progress in `[0, 1]`.
pub type ProgressFn = Arc<dyn Fn(f64) + Send + Sync>;

pub fn new_cancel_flag() -> CancelFlag {
    Arc::new(AtomicBool::new(false))
}

pub fn is_cancelled(flag: &CancelFlag) -> bool {
    flag.load(Ordering::Relaxed)
}

/// Terminal state of an engine job. A cancelled job still hands back
/// whatever it produced before stopping.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome<T> {
    Completed(T),
    Cancelled(T),
}

impl<T> JobOutcome<T> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, JobOutcome::Cancelled(_))
    }

    pub fn into_inner(self) -> T {
        match self {
            JobOutcome::Completed(value) | JobOutcome::Cancelled(value) => value,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> JobOutcome<U> {
        match self {
            JobOutcome::Completed(value) => JobOutcome::Completed(f(value)),
            JobOutcome::Cancelled(value) => JobOutcome::Cancelled(f(value)),
        }
    }
}

/// Compiled subtitle document written next to the job under `file_name`.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleAsset {
    pub file_name: String,
    pub contents: String,
}

#[derive(Debug, Clone)]
pub struct EncodeJob {
    pub source: PathBuf,
    pub subtitle: Option<SubtitleAsset>,
    pub fonts: Vec<FontAsset>,
    pub plan: ExportPlan,
    /// Source duration in seconds, used to turn encoder time into a ratio.
    pub duration: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct PreviewJob {
    pub source: PathBuf,
    pub subtitle: Option<SubtitleAsset>,
    pub fonts: Vec<FontAsset>,
    pub plan: ExportPlan,
    /// Timestamps in seconds, one frame each.
    pub times: Vec<f64>,
}

/// An external transcoder that executes compiled export plans.
///
/// Implementations run one job at a time; a second call waits until the
/// first has released its resources.
#[async_trait]
pub trait TranscodeEngine: Send + Sync {
    /// Encode the whole source, returning the output container bytes.
    async fn encode(
        &self,
        job: &EncodeJob,
        cancel: &CancelFlag,
        progress: Option<ProgressFn>,
    ) -> Result<JobOutcome<Vec<u8>>>;

    /// Render one JPEG per requested timestamp. Frames that fail are skipped.
    async fn preview(&self, job: &PreviewJob, cancel: &CancelFlag)
        -> Result<JobOutcome<Vec<Vec<u8>>>>;

    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_outcome_helpers() {
        let done: JobOutcome<Vec<u8>> = JobOutcome::Completed(vec![1, 2]);
        assert!(!done.is_cancelled());
        assert_eq!(done.map(|v| v.len()), JobOutcome::Completed(2));

        let partial = JobOutcome::Cancelled(vec![1]);
        assert!(partial.is_cancelled());
        assert_eq!(partial.into_inner(), vec![1]);
    }

    #[test]
    fn test_cancel_flag() {
        let flag = new_cancel_flag();
        assert!(!is_cancelled(&flag));
        flag.store(true, Ordering::Relaxed);
        assert!(is_cancelled(&flag));
    }
}
