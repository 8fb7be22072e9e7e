// =============================================================================
// Order book synchronisation — snapshot + sequenced deltas
// =============================================================================

pub mod book;
pub mod sync;

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;

pub use book::{BookSide, OrderBookState};
pub use sync::{cache_index, OrderBookSyncEngine, SyncOutcome, SyncPhase};

/// `(price, size)`; a zero size deletes the level.
pub type Level = (Decimal, Decimal);

/// Incremental update covering sequence numbers `sequence_start..=sequence_end`.
#[derive(Debug, Clone, PartialEq)]
pub struct DeltaMessage {
    pub symbol: String,
    pub sequence_start: i64,
    pub sequence_end: i64,
    pub timestamp: Option<i64>,
    pub bids: Vec<Level>,
    pub asks: Vec<Level>,
}

/// Whole-book push from the depth-limited feeds.
#[derive(Debug, Clone, PartialEq)]
pub struct FullBook {
    pub bids: Vec<Level>,
    pub asks: Vec<Level>,
    pub timestamp: Option<i64>,
}

/// REST order book used as the base state for delta replay.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBookSnapshot {
    pub bids: Vec<Level>,
    pub asks: Vec<Level>,
    pub nonce: Option<i64>,
    pub timestamp: Option<i64>,
}

impl OrderBookSnapshot {
    /// Sequence position of the snapshot, falling back to its timestamp.
    pub fn position(&self) -> Option<i64> {
        self.nonce.or(self.timestamp)
    }
}

/// Where REST snapshots come from.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// `limit` is the subscribed depth, if any.
    async fn fetch_snapshot(&self, symbol: &str, limit: Option<usize>) -> Result<OrderBookSnapshot>;
}
