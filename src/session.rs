//! Editing session: the live cue list, its undo history and the
//! independent secondary track.

use crate::subtitle::{self, Cue, EditHistory};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct Session {
    cues: Vec<Cue>,
    secondary: Vec<Cue>,
    history: EditHistory,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history_capacity(capacity: usize) -> Self {
        Self {
            history: EditHistory::with_capacity(capacity),
            ..Default::default()
        }
    }

    /// Start from an existing list with an empty history.
    pub fn with_cues(mut self, cues: Vec<Cue>) -> Self {
        self.cues = cues;
        self
    }

    pub fn cues(&self) -> &[Cue] {
        &self.cues
    }

    pub fn secondary(&self) -> &[Cue] {
        &self.secondary
    }

    pub fn history(&self) -> &EditHistory {
        &self.history
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    /// Replace the list. Returns false, recording nothing, when `cues` equals
    /// the current list.
    pub fn set_cues(&mut self, cues: Vec<Cue>, save_history: bool) -> bool {
        if cues == self.cues {
            return false;
        }
        let previous = std::mem::replace(&mut self.cues, cues);
        if save_history {
            self.history.push(previous);
        }
        true
    }

    /// Run an edit operation against the current list, recording history.
    pub fn apply<F>(&mut self, op: F) -> bool
    where
        F: FnOnce(&[Cue]) -> Vec<Cue>,
    {
        let next = op(&self.cues);
        self.set_cues(next, true)
    }

    /// Restore the previous list. Undo itself is never recorded.
    pub fn undo(&mut self) -> bool {
        match self.history.pop() {
            Some(previous) => {
                self.cues = previous;
                debug!("Undo, {} step(s) left", self.history.len());
                true
            }
            None => false,
        }
    }

    /// Empty the list and forget all history.
    pub fn clear(&mut self) {
        self.set_cues(Vec::new(), true);
        self.history.clear();
    }

    /// Replace the secondary track without touching the primary list.
    pub fn set_secondary(&mut self, cues: Vec<Cue>) {
        self.secondary = cues;
    }

    /// Keep `cues` as the secondary track and, when a primary list exists,
    /// merge it into every cue's secondary text by time overlap.
    pub fn import_secondary(&mut self, cues: Vec<Cue>) -> bool {
        let changed = if self.cues.is_empty() {
            false
        } else {
            self.apply(|primary| subtitle::align_secondary(primary, &cues))
        };
        self.secondary = cues;
        changed
    }

    /// Re-run alignment against the retained secondary track.
    pub fn realign_secondary(&mut self) -> bool {
        let secondary = std::mem::take(&mut self.secondary);
        self.import_secondary(secondary)
    }

    pub fn reset_styles(&mut self) -> bool {
        self.apply(subtitle::reset_styles)
    }
}
