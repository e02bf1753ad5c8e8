pub mod config;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod render;
pub mod session;
pub mod subtitle;

pub use config::Config;
pub use engine::{FfmpegEngine, JobOutcome, TranscodeEngine};
pub use error::{Result, SubforgeError};
pub use pipeline::{
    export_subtitles, export_video, preview_frames, print_summary, ExportRequest, ExportResult,
    ExportStats,
};
pub use render::{compile_filter_graph, ExportPlan, FilterGraphRequest};
pub use session::Session;
pub use subtitle::{ass::compile_markup, Cue, FormatOptions};
