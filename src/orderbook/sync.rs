use tracing::{debug, warn};

use super::{DeltaMessage, FullBook, OrderBookSnapshot, OrderBookState};
use crate::error::SyncError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// No nonce yet; deltas are parked.
    Uninitialized,
    /// Snapshot requested; deltas keep being parked.
    Buffering,
    /// Deltas are applied on arrival.
    Synced,
}

/// What the caller should do after feeding the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// Delta parked, nothing to emit.
    Buffered,
    /// Delta parked; start a snapshot fetch tagged with `epoch`.
    FetchSnapshot { epoch: u64 },
    /// Book changed; emit it.
    Applied,
    /// Delta already covered by the nonce.
    Stale,
    /// Snapshot did not line up with the buffer; fetch again.
    RetrySnapshot { epoch: u64, attempt: usize },
    /// Retries exhausted; the engine re-armed itself.
    Rejected(SyncError),
    /// Snapshot belongs to an earlier arming of the engine.
    Ignored,
}

/// Index of the first buffered delta that follows `nonce`.
///
/// `None` when the snapshot predates the buffer
/// (`nonce < first.sequence_start - 1`) or the first start is out of range.
/// When no delta window contains the nonce the buffer length is returned,
/// meaning every buffered delta is already covered by the snapshot.
pub fn cache_index(nonce: i64, buffer: &[DeltaMessage]) -> Option<usize> {
    if let Some(first) = buffer.first() {
        if nonce < first.sequence_start.checked_sub(1)? {
            return None;
        }
    }
    let found = buffer.iter().position(|d| {
        d.sequence_start
            .checked_sub(1)
            .is_some_and(|start| nonce >= start && nonce < d.sequence_end)
    });
    Some(found.unwrap_or(buffer.len()))
}

/// Per-symbol reconciliation of a REST snapshot with streamed deltas.
#[derive(Debug, Clone)]
pub struct OrderBookSyncEngine {
    book: OrderBookState,
    phase: SyncPhase,
    buffer: Vec<DeltaMessage>,
    snapshot_delay: usize,
    max_retries: usize,
    attempts: usize,
    epoch: u64,
    depth: Option<usize>,
}

impl OrderBookSyncEngine {
    pub fn new(
        symbol: impl Into<String>,
        snapshot_delay: usize,
        max_retries: usize,
        depth: Option<usize>,
    ) -> Self {
        Self {
            book: OrderBookState::new(symbol),
            phase: SyncPhase::Uninitialized,
            buffer: Vec::new(),
            snapshot_delay,
            max_retries: max_retries.max(1),
            attempts: 0,
            epoch: 0,
            depth,
        }
    }

    pub fn on_delta(&mut self, delta: DeltaMessage) -> SyncOutcome {
        match self.phase {
            SyncPhase::Uninitialized => {
                let fetch = self.buffer.len() >= self.snapshot_delay;
                self.buffer.push(delta);
                if fetch {
                    self.phase = SyncPhase::Buffering;
                    debug!(
                        symbol = %self.book.symbol,
                        buffered = self.buffer.len(),
                        "requesting order book snapshot"
                    );
                    SyncOutcome::FetchSnapshot { epoch: self.epoch }
                } else {
                    SyncOutcome::Buffered
                }
            }
            SyncPhase::Buffering => {
                self.buffer.push(delta);
                SyncOutcome::Buffered
            }
            SyncPhase::Synced => {
                let nonce = self.book.nonce.unwrap_or(i64::MIN);
                if delta.sequence_end <= nonce {
                    return SyncOutcome::Stale;
                }
                self.book.apply_delta(&delta);
                SyncOutcome::Applied
            }
        }
    }

    pub fn on_snapshot(&mut self, epoch: u64, snapshot: OrderBookSnapshot) -> SyncOutcome {
        if epoch != self.epoch || self.phase != SyncPhase::Buffering {
            return SyncOutcome::Ignored;
        }

        let index = snapshot
            .position()
            .and_then(|nonce| cache_index(nonce, &self.buffer).map(|i| (nonce, i)));

        let Some((nonce, index)) = index else {
            warn!(
                symbol = %self.book.symbol,
                snapshot_nonce = ?snapshot.position(),
                first_delta = ?self.buffer.first().map(|d| d.sequence_start),
                "order book snapshot older than buffered deltas"
            );
            return self.failed_attempt(SyncError::InvalidNonce {
                symbol: self.book.symbol.clone(),
                retries: self.attempts + 1,
            });
        };

        self.book.load_snapshot(&snapshot, nonce);
        for delta in self.buffer.drain(..).skip(index) {
            self.book.apply_delta(&delta);
        }
        self.phase = SyncPhase::Synced;
        self.attempts = 0;
        debug!(
            symbol = %self.book.symbol,
            nonce = ?self.book.nonce,
            "order book synced"
        );
        SyncOutcome::Applied
    }

    /// The snapshot fetch itself failed; counts against the same budget.
    pub fn on_snapshot_error(&mut self, epoch: u64, reason: &str) -> SyncOutcome {
        if epoch != self.epoch || self.phase != SyncPhase::Buffering {
            return SyncOutcome::Ignored;
        }
        warn!(symbol = %self.book.symbol, reason, "order book snapshot fetch failed");
        self.failed_attempt(SyncError::Snapshot {
            symbol: self.book.symbol.clone(),
            reason: reason.to_string(),
        })
    }

    /// Whole-book push; bypasses the sequence machinery.
    pub fn on_full_replace(&mut self, full: &FullBook) -> SyncOutcome {
        self.buffer.clear();
        self.attempts = 0;
        self.book.replace(full);
        SyncOutcome::Applied
    }

    /// Drop all state and wait for a fresh snapshot cycle.
    pub fn rearm(&mut self) {
        self.book.reset();
        self.buffer.clear();
        self.phase = SyncPhase::Uninitialized;
        self.attempts = 0;
        self.epoch += 1;
    }

    pub fn set_depth(&mut self, depth: Option<usize>) {
        self.depth = depth;
    }

    pub fn depth(&self) -> Option<usize> {
        self.depth
    }

    pub fn book(&self) -> &OrderBookState {
        &self.book
    }

    /// Book limited to the subscribed depth, as handed to waiters.
    pub fn view(&self) -> OrderBookState {
        self.book.truncated(self.depth)
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    fn failed_attempt(&mut self, err: SyncError) -> SyncOutcome {
        self.attempts += 1;
        if self.attempts < self.max_retries {
            return SyncOutcome::RetrySnapshot {
                epoch: self.epoch,
                attempt: self.attempts,
            };
        }
        let err = match err {
            SyncError::InvalidNonce { symbol, .. } => SyncError::InvalidNonce {
                symbol,
                retries: self.attempts,
            },
            other => other,
        };
        self.rearm();
        SyncOutcome::Rejected(err)
    }
}
