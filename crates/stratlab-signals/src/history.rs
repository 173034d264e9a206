//! Bounded history of discrete signal states.

use std::collections::VecDeque;

/// Fixed-capacity ring buffer, newest entry first on read.
///
/// Pushing past capacity evicts the oldest entry.
#[derive(Debug, Clone)]
pub struct SignalHistory<T> {
    entries: VecDeque<T>,
    capacity: usize,
}

impl<T: Copy> SignalHistory<T> {
    /// Create an empty history. A zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append the newest state.
    pub fn push(&mut self, value: T) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(value);
    }

    /// State `offset` closed bars ago (0 = newest).
    pub fn get(&self, offset: usize) -> Option<T> {
        let index = self.entries.len().checked_sub(offset + 1)?;
        self.entries.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterate newest to oldest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().rev()
    }
}
