//! Pure edit operations over cue lists.
//!
//! Every operation takes a list snapshot and returns a new list. Cues that
//! change are rebuilt; untouched cues are cloned as-is. Out-of-range indices
//! and edits at list boundaries are no-ops that return an equal list.

use super::{Cue, CueStyle, TextField};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeDirection {
    Prev,
    Next,
}

/// Insert an empty cue after `index`, filling the gap up to the next cue.
///
/// The new cue starts where `list[index]` ends (0 when there is no such cue)
/// and ends where `list[index + 1]` starts, or one second later.
pub fn insert_after(list: &[Cue], index: usize) -> Vec<Cue> {
    let Some(next) = index.checked_add(1) else {
        return list.to_vec();
    };
    let start_ms = list.get(index).map(|c| c.end_ms()).unwrap_or(0);
    let end_ms = list
        .get(next)
        .map(|c| c.start_ms())
        .unwrap_or(start_ms.saturating_add(1000));

    let mut result = list.to_vec();
    let at = next.min(result.len());
    result.insert(
        at,
        Cue::from_millis(start_ms, end_ms, "").with_text2(Some(String::new())),
    );
    result
}

pub fn remove(list: &[Cue], index: usize) -> Vec<Cue> {
    let mut result = list.to_vec();
    if index < result.len() {
        result.remove(index);
    }
    result
}

/// Split the cue at `index` at a character `offset` of one text field.
///
/// The time range is always bisected at its midpoint, whatever the offset.
/// The second half keeps the tail of `field` and has the other field cleared.
/// Offsets past the end of the text clamp to its length.
pub fn split_at(list: &[Cue], index: usize, field: TextField, offset: usize) -> Vec<Cue> {
    let Some(item) = list.get(index) else {
        return list.to_vec();
    };

    let target = item.field(field);
    let byte = target
        .char_indices()
        .nth(offset)
        .map(|(i, _)| i)
        .unwrap_or(target.len());
    let (head, tail) = target.split_at(byte);

    // NOTE: bisects time at the midpoint rather than proportionally to `offset`.
    let split_ms = ((item.start_ms() + item.end_ms()) as f64 / 2.0).round() as u64;

    let first = item
        .clone()
        .with_end_ms(split_ms)
        .with_field(field, head);
    let second = item
        .clone()
        .with_start_ms(split_ms)
        .with_field(field, tail);
    let second = match field.other() {
        TextField::Text => second.with_text(""),
        TextField::Text2 => second.with_text2(None),
    };

    debug!("Split cue {} at {}ms", index, split_ms);

    let mut result = list.to_vec();
    result.splice(index..=index, [first, second]);
    result
}

/// Merge the cue at `index` with its neighbour in `direction`.
///
/// The merged cue keeps the earlier cue's style, spans from the earlier
/// start to the later end and joins both text fields with a single space.
pub fn merge_adjacent(list: &[Cue], index: usize, direction: MergeDirection) -> Vec<Cue> {
    let first_index = match direction {
        MergeDirection::Prev if index > 0 && index < list.len() => index - 1,
        MergeDirection::Next if index + 1 < list.len() => index,
        _ => return list.to_vec(),
    };

    let first = &list[first_index];
    let second = &list[first_index + 1];

    let text2 = match (first.text2(), second.text2()) {
        (None, None) => None,
        (a, b) => Some(join_trimmed(a.unwrap_or(""), b.unwrap_or(""))),
    };
    let merged = first
        .clone()
        .with_end_ms(second.end_ms())
        .with_text(join_trimmed(first.text(), second.text()))
        .with_text2(text2);

    let mut result = list.to_vec();
    result.splice(first_index..=first_index + 1, [merged]);
    result
}

fn join_trimmed(a: &str, b: &str) -> String {
    format!("{} {}", a, b).trim().to_string()
}

/// Exchange the main and secondary text of every cue.
pub fn swap_tracks(list: &[Cue]) -> Vec<Cue> {
    list.iter()
        .map(|cue| {
            let text = cue.text().to_string();
            let text2 = cue.field(TextField::Text2).to_string();
            cue.clone().with_text(text2).with_text2(Some(text))
        })
        .collect()
}

/// Copy secondary-track text into `text2` of each overlapping primary cue.
///
/// Among the secondary cues that overlap a primary cue, the one whose
/// midpoint is closest to the primary midpoint wins; the first such cue wins
/// a tie. Primary cues without an overlapping candidate keep their `text2`.
pub fn align_secondary(primary: &[Cue], secondary: &[Cue]) -> Vec<Cue> {
    primary
        .iter()
        .map(|main| {
            let mid = main.midpoint();
            let best = secondary
                .iter()
                .filter(|candidate| main.overlap(candidate) > 0.0)
                .fold(None::<&Cue>, |best, candidate| match best {
                    Some(b) if (b.midpoint() - mid).abs() <= (candidate.midpoint() - mid).abs() => {
                        Some(b)
                    }
                    _ => Some(candidate),
                });

            match best {
                Some(matched) => main.clone().with_text2(Some(matched.text().to_string())),
                None => main.clone(),
            }
        })
        .collect()
}

/// Replace the cue at `index`.
pub fn update_cue(list: &[Cue], index: usize, cue: Cue) -> Vec<Cue> {
    let mut result = list.to_vec();
    if let Some(slot) = result.get_mut(index) {
        *slot = cue;
    }
    result
}

/// Replace one text field of the cue at `index`.
pub fn update_text(list: &[Cue], index: usize, field: TextField, text: &str) -> Vec<Cue> {
    match list.get(index) {
        Some(cue) => update_cue(list, index, cue.clone().with_field(field, text)),
        None => list.to_vec(),
    }
}

/// Drop every per-cue style override.
pub fn reset_styles(list: &[Cue]) -> Vec<Cue> {
    list.iter()
        .map(|cue| cue.clone().with_style(CueStyle::default()))
        .collect()
}
