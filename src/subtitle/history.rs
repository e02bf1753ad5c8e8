use super::Cue;
use std::collections::VecDeque;

/// Maximum number of undo snapshots kept by default.
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

/// Bounded stack of cue-list snapshots.
///
/// Pushing at capacity evicts the oldest snapshot, so the most recent undo
/// depth is always preserved.
#[derive(Debug, Clone)]
pub struct EditHistory {
    snapshots: VecDeque<Vec<Cue>>,
    capacity: usize,
}

impl Default for EditHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

impl EditHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// A capacity of zero is treated as one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            snapshots: VecDeque::with_capacity(capacity.min(64)),
            capacity,
        }
    }

    pub fn push(&mut self, snapshot: Vec<Cue>) {
        if self.snapshots.len() >= self.capacity {
            self.snapshots.pop_front();
        }
        self.snapshots.push_back(snapshot);
    }

    /// Most recent snapshot, or `None` when the history is empty.
    pub fn pop(&mut self) -> Option<Vec<Cue>> {
        self.snapshots.pop_back()
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(n: u64) -> Vec<Cue> {
        vec![Cue::from_millis(n * 1000, n * 1000 + 500, n.to_string())]
    }

    #[test]
    fn test_push_pop_is_lifo() {
        let mut history = EditHistory::new();
        history.push(snapshot(1));
        history.push(snapshot(2));

        assert_eq!(history.pop(), Some(snapshot(2)));
        assert_eq!(history.pop(), Some(snapshot(1)));
        assert_eq!(history.pop(), None);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut history = EditHistory::with_capacity(3);
        for n in 0..5 {
            history.push(snapshot(n));
        }

        assert_eq!(history.len(), 3);
        let mut popped = Vec::new();
        while let Some(s) = history.pop() {
            popped.push(s);
        }
        assert_eq!(popped, vec![snapshot(4), snapshot(3), snapshot(2)]);
    }

    #[test]
    fn test_default_capacity_bound() {
        let mut history = EditHistory::new();
        for n in 0..(DEFAULT_HISTORY_CAPACITY as u64 + 10) {
            history.push(snapshot(n));
        }
        assert_eq!(history.len(), DEFAULT_HISTORY_CAPACITY);

        let mut last = None;
        while let Some(s) = history.pop() {
            last = Some(s);
        }
        // Snapshots 0..10 were evicted
        assert_eq!(last, Some(snapshot(10)));
    }

    #[test]
    fn test_clear() {
        let mut history = EditHistory::new();
        history.push(snapshot(1));
        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.pop(), None);
    }
}
