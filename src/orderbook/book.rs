use std::collections::BTreeMap;

use rust_decimal::Decimal;

use super::{DeltaMessage, FullBook, Level, OrderBookSnapshot};
use crate::types::iso8601;

/// One side of the book. Levels are kept in a price-sorted map; iteration
/// yields best price first (bids descending, asks ascending).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookSide {
    levels: BTreeMap<Decimal, Decimal>,
    descending: bool,
}

impl BookSide {
    pub fn bids() -> Self {
        Self {
            levels: BTreeMap::new(),
            descending: true,
        }
    }

    pub fn asks() -> Self {
        Self {
            levels: BTreeMap::new(),
            descending: false,
        }
    }

    /// Upsert `size` at `price`; a zero size removes the level.
    pub fn store(&mut self, price: Decimal, size: Decimal) {
        if size.is_zero() {
            self.levels.remove(&price);
        } else {
            self.levels.insert(price, size);
        }
    }

    pub fn store_all(&mut self, levels: &[Level]) {
        for &(price, size) in levels {
            self.store(price, size);
        }
    }

    pub fn iter(&self) -> Box<dyn Iterator<Item = Level> + '_> {
        let it = self.levels.iter().map(|(p, s)| (*p, *s));
        if self.descending {
            Box::new(it.rev())
        } else {
            Box::new(it)
        }
    }

    pub fn best(&self) -> Option<Level> {
        self.iter().next()
    }

    pub fn top(&self, depth: usize) -> Vec<Level> {
        self.iter().take(depth).collect()
    }

    pub fn size_at(&self, price: Decimal) -> Option<Decimal> {
        self.levels.get(&price).copied()
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn clear(&mut self) {
        self.levels.clear();
    }

    fn truncate(&mut self, depth: usize) {
        let keep: Vec<Level> = self.top(depth);
        self.levels = keep.into_iter().collect();
    }
}

/// Live book for one symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBookState {
    pub symbol: String,
    pub bids: BookSide,
    pub asks: BookSide,
    /// Last applied sequence end.
    pub nonce: Option<i64>,
    pub timestamp: Option<i64>,
    pub datetime: Option<String>,
}

impl OrderBookState {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            bids: BookSide::bids(),
            asks: BookSide::asks(),
            nonce: None,
            timestamp: None,
            datetime: None,
        }
    }

    pub fn reset(&mut self) {
        self.bids.clear();
        self.asks.clear();
        self.nonce = None;
        self.timestamp = None;
        self.datetime = None;
    }

    pub fn apply_delta(&mut self, delta: &DeltaMessage) {
        self.bids.store_all(&delta.bids);
        self.asks.store_all(&delta.asks);
        self.nonce = Some(delta.sequence_end);
        self.set_timestamp(delta.timestamp);
    }

    /// Discard everything and rebuild from a whole-book push.
    pub fn replace(&mut self, full: &FullBook) {
        self.reset();
        self.bids.store_all(&full.bids);
        self.asks.store_all(&full.asks);
        self.set_timestamp(full.timestamp);
    }

    pub fn load_snapshot(&mut self, snapshot: &OrderBookSnapshot, nonce: i64) {
        self.reset();
        self.bids.store_all(&snapshot.bids);
        self.asks.store_all(&snapshot.asks);
        self.nonce = Some(nonce);
        self.set_timestamp(snapshot.timestamp);
    }

    pub fn best_bid(&self) -> Option<Level> {
        self.bids.best()
    }

    pub fn best_ask(&self) -> Option<Level> {
        self.asks.best()
    }

    pub fn spread(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some((bid, _)), Some((ask, _))) => ask.checked_sub(bid),
            _ => None,
        }
    }

    /// Copy limited to `depth` levels per side.
    pub fn truncated(&self, depth: Option<usize>) -> Self {
        let mut copy = self.clone();
        if let Some(depth) = depth {
            copy.bids.truncate(depth);
            copy.asks.truncate(depth);
        }
        copy
    }

    fn set_timestamp(&mut self, timestamp: Option<i64>) {
        self.timestamp = timestamp;
        self.datetime = timestamp.and_then(iso8601);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn sides_iterate_best_first() {
        let mut book = OrderBookState::new("BTC/USDT");
        book.bids.store_all(&[(d("99"), d("1")), (d("101"), d("2")), (d("100"), d("3"))]);
        book.asks.store_all(&[(d("105"), d("1")), (d("103"), d("2"))]);

        let bid_prices: Vec<Decimal> = book.bids.iter().map(|(p, _)| p).collect();
        assert_eq!(bid_prices, vec![d("101"), d("100"), d("99")]);
        assert_eq!(book.best_ask(), Some((d("103"), d("2"))));
        assert_eq!(book.spread(), Some(d("2")));
    }

    #[test]
    fn zero_size_removes_level() {
        let mut side = BookSide::asks();
        side.store(d("10.5"), d("1"));
        side.store(d("10.5"), d("0"));
        assert!(side.is_empty());
        // Removing a level that is not there is a no-op.
        side.store(d("11"), d("0.000"));
        assert!(side.is_empty());
    }

    #[test]
    fn delta_updates_nonce_and_timestamp() {
        let mut book = OrderBookState::new("BTC/USDT");
        book.apply_delta(&DeltaMessage {
            symbol: "BTC/USDT".into(),
            sequence_start: 10,
            sequence_end: 12,
            timestamp: Some(1_634_641_987_564),
            bids: vec![(d("100"), d("1"))],
            asks: vec![],
        });
        assert_eq!(book.nonce, Some(12));
        assert_eq!(book.datetime.as_deref(), Some("2021-10-19T11:13:07.564Z"));
    }

    #[test]
    fn replace_discards_previous_levels() {
        let mut book = OrderBookState::new("ETH/USDT");
        book.bids.store(d("1"), d("1"));
        book.nonce = Some(77);
        book.replace(&FullBook {
            bids: vec![(d("2"), d("1"))],
            asks: vec![(d("3"), d("1"))],
            timestamp: Some(5),
        });
        assert_eq!(book.bids.len(), 1);
        assert_eq!(book.best_bid(), Some((d("2"), d("1"))));
        assert_eq!(book.nonce, None);
    }

    #[test]
    fn truncated_keeps_best_levels() {
        let mut book = OrderBookState::new("BTC/USDT");
        for p in 1..=10 {
            book.bids.store(Decimal::from(p), Decimal::ONE);
            book.asks.store(Decimal::from(100 + p), Decimal::ONE);
        }
        let top = book.truncated(Some(3));
        assert_eq!(top.bids.top(10).len(), 3);
        assert_eq!(top.bids.best(), Some((Decimal::from(10), Decimal::ONE)));
        assert_eq!(top.asks.best(), Some((Decimal::from(101), Decimal::ONE)));
        assert_eq!(book.bids.len(), 10);
    }
}
