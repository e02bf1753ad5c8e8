pub mod encoder;
pub mod filter_graph;
pub mod interval;

pub use encoder::{EncoderParams, RateControl};
pub use filter_graph::{
    compile_filter_graph, escape_filter_value, ExportPlan, FilterGraphRequest, SoftSubtitleTrack,
    SubtitleInput, VideoFilter,
};
pub use interval::{cue_ranges, enable_expression, merge_intervals, TimeRange, MERGE_TOLERANCE};

/// Strength above which the region is removed with `delogo` instead of blurred.
pub const REMOVAL_THRESHOLD: f64 = 90.0;

/// Rectangle to erase, in source-video pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErasureRegion {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl ErasureRegion {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// `(x, y, w, h)` rounded half away from zero.
    pub fn rounded(&self) -> (i64, i64, i64, i64) {
        (
            self.x.round() as i64,
            self.y.round() as i64,
            self.w.round() as i64,
            self.h.round() as i64,
        )
    }

    /// False for regions with a non-finite coordinate or that round to zero
    /// width or height. Such regions are skipped rather than rejected.
    pub fn is_usable(&self) -> bool {
        let finite = [self.x, self.y, self.w, self.h].iter().all(|v| v.is_finite());
        let (_, _, w, h) = self.rounded();
        finite && w > 0 && h > 0
    }
}

impl std::str::FromStr for ErasureRegion {
    type Err = String;

    /// Parse `x,y,w,h`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let values: Vec<f64> = s
            .split(',')
            .map(|part| part.trim().parse::<f64>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| format!("Invalid region '{}': {}", s, e))?;

        match values.as_slice() {
            &[x, y, w, h] => Ok(Self::new(x, y, w, h)),
            _ => Err(format!(
                "Invalid region '{}': expected x,y,w,h",
                s
            )),
        }
    }
}

/// Region plus erasure strength in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErasureSettings {
    pub region: ErasureRegion,
    pub strength: f64,
}

impl ErasureSettings {
    pub fn new(region: ErasureRegion, strength: f64) -> Self {
        let strength = if strength.is_nan() { 0.0 } else { strength.clamp(0.0, 100.0) };
        Self { region, strength }
    }

    pub fn is_removal(&self) -> bool {
        self.strength > REMOVAL_THRESHOLD
    }

    /// `boxblur` luma radius for this strength.
    pub fn blur_radius(&self) -> i64 {
        ((self.strength / 2.5).round() as i64).max(1)
    }
}
