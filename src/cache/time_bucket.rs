use std::collections::{HashMap, HashSet, VecDeque};

use super::Window;
use crate::types::Candle;

/// Entries bucketed by an integer timestamp.
pub trait Timestamped {
    fn timestamp(&self) -> i64;
}

impl Timestamped for Candle {
    fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

/// Bounded series with at most one entry per timestamp.
///
/// The in-progress candle is pushed again on every tick with the same open
/// time; it replaces the stored entry in place instead of growing the
/// series. A new timestamp appends and evicts the oldest bucket when full.
/// The pending count is the number of distinct timestamps touched since the
/// last read.
#[derive(Debug, Clone)]
pub struct TimeBucketCache<T> {
    entries: VecDeque<T>,
    base: u64,
    by_timestamp: HashMap<i64, u64>,
    capacity: usize,
    touched: HashSet<i64>,
    fresh_batch: bool,
}

impl<T: Timestamped + Clone> TimeBucketCache<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            base: 0,
            by_timestamp: HashMap::new(),
            capacity,
            touched: HashSet::new(),
            fresh_batch: false,
        }
    }

    pub fn append(&mut self, item: T) {
        let ts = item.timestamp();
        match self.by_timestamp.get(&ts) {
            Some(&slot) => {
                let pos = (slot - self.base) as usize;
                self.entries[pos] = item;
            }
            None => {
                if self.entries.len() == self.capacity {
                    if let Some(oldest) = self.entries.pop_front() {
                        self.base += 1;
                        self.by_timestamp.remove(&oldest.timestamp());
                    }
                }
                let slot = self.base + self.entries.len() as u64;
                self.entries.push_back(item);
                self.by_timestamp.insert(ts, slot);
            }
        }

        if self.fresh_batch {
            self.fresh_batch = false;
            self.touched.clear();
        }
        self.touched.insert(ts);
    }

    pub fn read(&mut self) -> Window<T> {
        let fresh = self.pending_count();
        self.fresh_batch = true;
        Window {
            items: self.entries.iter().cloned().collect(),
            fresh,
        }
    }

    pub fn pending_count(&self) -> usize {
        if self.fresh_batch {
            0
        } else {
            self.touched.len()
        }
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
}
