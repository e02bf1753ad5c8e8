use crate::subtitle::Cue;

/// Gap, in seconds, bridged when merging neighbouring ranges.
pub const MERGE_TOLERANCE: f64 = 0.1;

/// A `[start, end)` span in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

impl TimeRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && t < self.end
    }
}

/// Time spans of every cue, in list order.
pub fn cue_ranges(cues: &[Cue]) -> Vec<TimeRange> {
    cues.iter()
        .map(|cue| TimeRange::new(cue.start_time(), cue.end_time()))
        .collect()
}

/// Sort ranges by start and fold together any range starting within
/// `tolerance` of the accumulated end.
///
/// Ranges with a non-finite bound or an end before their start are dropped.
pub fn merge_intervals(ranges: &[TimeRange], tolerance: f64) -> Vec<TimeRange> {
    let mut sorted: Vec<TimeRange> = ranges
        .iter()
        .copied()
        .filter(|r| r.start.is_finite() && r.end.is_finite() && r.end >= r.start)
        .collect();
    sorted.sort_by(|a, b| a.start.total_cmp(&b.start));

    let mut merged: Vec<TimeRange> = Vec::with_capacity(sorted.len());
    for range in sorted {
        match merged.last_mut() {
            Some(current) if range.start <= current.end + tolerance => {
                current.end = current.end.max(range.end);
            }
            _ => merged.push(range),
        }
    }

    merged
}

/// ffmpeg timeline expression that is non-zero inside any of `ranges`.
pub fn enable_expression(ranges: &[TimeRange]) -> String {
    ranges
        .iter()
        .map(|r| format!("between(t,{},{})", r.start, r.end))
        .collect::<Vec<_>>()
        .join("+")
}
