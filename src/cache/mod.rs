// =============================================================================
// Bounded caches — recent trades, candles and orders per symbol
// =============================================================================
//
// All three caches share the same read contract: reading hands out a
// `Window` (a copy of the live entries plus how many were appended since the
// previous read) and marks the fresh batch, so the next append restarts the
// pending count at zero.
// =============================================================================

pub mod bounded;
pub mod keyed;
pub mod time_bucket;

pub use bounded::BoundedSequence;
pub use keyed::{Keyed, KeyedEntityCache};
pub use time_bucket::{TimeBucketCache, Timestamped};

/// Copy of a cache's live entries handed to a consumer.
#[derive(Debug, Clone, PartialEq)]
pub struct Window<T> {
    /// Live entries, oldest first.
    pub items: Vec<T>,
    /// Number of appends since the previous read.
    pub fresh: usize,
}

impl<T> Window<T> {
    /// The newly appended tail (never longer than `items`).
    pub fn fresh_tail(&self) -> &[T] {
        let start = self.items.len().saturating_sub(self.fresh);
        &self.items[start..]
    }

    /// How many entries a `newUpdates` consumer should take, capped by `limit`.
    pub fn fresh_limit(&self, limit: Option<usize>) -> usize {
        let fresh = self.fresh.min(self.items.len());
        match limit {
            Some(limit) => fresh.min(limit),
            None => fresh,
        }
    }
}

/// Pending-append counter with the fresh-batch flag.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct UpdateCounter {
    pending: usize,
    fresh_batch: bool,
}

impl UpdateCounter {
    pub(crate) fn record(&mut self) {
        if self.fresh_batch {
            self.fresh_batch = false;
            self.pending = 0;
        }
        self.pending += 1;
    }

    pub(crate) fn pending(&self) -> usize {
        if self.fresh_batch {
            0
        } else {
            self.pending
        }
    }

    /// Consumer read: returns the pending count and starts a fresh batch.
    pub(crate) fn take(&mut self) -> usize {
        let pending = self.pending();
        self.fresh_batch = true;
        pending
    }
}
