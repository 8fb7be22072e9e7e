use std::collections::VecDeque;

use super::{UpdateCounter, Window};

/// Capped, insertion-ordered buffer. Once full, every append drops the
/// oldest entry before pushing the new one, so `len() <= capacity()` holds
/// at every point.
#[derive(Debug, Clone)]
pub struct BoundedSequence<T> {
    entries: VecDeque<T>,
    capacity: usize,
    updates: UpdateCounter,
}

impl<T: Clone> BoundedSequence<T> {
    /// A zero capacity is bumped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            updates: UpdateCounter::default(),
        }
    }

    pub fn append(&mut self, item: T) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(item);
        self.updates.record();
    }

    /// Copy out the live window and start a fresh batch.
    pub fn read(&mut self) -> Window<T> {
        let fresh = self.updates.take();
        Window {
            items: self.entries.iter().cloned().collect(),
            fresh,
        }
    }

    pub fn pending_count(&self) -> usize {
        self.updates.pending()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    pub fn last(&self) -> Option<&T> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.updates = UpdateCounter::default();
    }
}
