use std::collections::{HashMap, VecDeque};

use super::{UpdateCounter, Window};
use crate::types::{Order, Trade};

/// Entities that are unique per `(symbol, id)`.
pub trait Keyed {
    fn symbol(&self) -> &str;
    fn key(&self) -> &str;
}

impl Keyed for Order {
    fn symbol(&self) -> &str {
        &self.symbol
    }

    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for Trade {
    fn symbol(&self) -> &str {
        &self.symbol
    }

    fn key(&self) -> &str {
        &self.id
    }
}

/// Bounded upsert-by-`(symbol, id)` cache.
///
/// Entries live in a single slot arena. The `symbol -> id -> slot` index
/// stores absolute slot numbers, so an update vacates the old slot and
/// appends a new one at the tail (move-to-most-recent) without touching any
/// other entry. Vacated slots are skipped on eviction and compacted away
/// once they make up half of the arena.
#[derive(Debug, Clone)]
pub struct KeyedEntityCache<T> {
    slots: VecDeque<Option<T>>,
    /// Absolute slot number of `slots[0]`.
    base: u64,
    live: usize,
    capacity: usize,
    index: HashMap<String, HashMap<String, u64>>,
    updates: UpdateCounter,
    updates_by_symbol: HashMap<String, UpdateCounter>,
}

impl<T: Keyed + Clone> KeyedEntityCache<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: VecDeque::with_capacity(capacity),
            base: 0,
            live: 0,
            capacity,
            index: HashMap::new(),
            updates: UpdateCounter::default(),
            updates_by_symbol: HashMap::new(),
        }
    }

    /// Insert or replace the entry for `(item.symbol(), item.key())`.
    ///
    /// Every call counts as one pending update, new or not.
    pub fn append(&mut self, item: T) {
        let symbol = item.symbol().to_string();
        let id = item.key().to_string();

        match self.slot_of(&symbol, &id) {
            Some(slot) => {
                let pos = (slot - self.base) as usize;
                self.slots[pos] = None;
                self.live -= 1;
            }
            None => {
                if self.live == self.capacity {
                    self.evict_oldest();
                }
            }
        }

        let slot = self.base + self.slots.len() as u64;
        self.slots.push_back(Some(item));
        self.live += 1;
        self.index
            .entry(symbol.clone())
            .or_default()
            .insert(id, slot);

        self.trim_front();
        if self.slots.len() > self.capacity * 2 {
            self.compact();
        }

        self.updates.record();
        self.updates_by_symbol.entry(symbol).or_default().record();
    }

    pub fn get(&self, symbol: &str, id: &str) -> Option<&T> {
        let slot = self.slot_of(symbol, id)?;
        self.slots
            .get((slot - self.base) as usize)
            .and_then(Option::as_ref)
    }

    /// Live entries, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().filter_map(Option::as_ref)
    }

    /// Copy out the live window (optionally one symbol only) and start a
    /// fresh batch for the counter that was read.
    pub fn read(&mut self, symbol: Option<&str>) -> Window<T> {
        match symbol {
            None => Window {
                items: self.iter().cloned().collect(),
                fresh: self.updates.take(),
            },
            Some(symbol) => {
                let fresh = self
                    .updates_by_symbol
                    .get_mut(symbol)
                    .map_or(0, UpdateCounter::take);
                Window {
                    items: self
                        .iter()
                        .filter(|item| item.symbol() == symbol)
                        .cloned()
                        .collect(),
                    fresh,
                }
            }
        }
    }

    pub fn pending_count(&self) -> usize {
        self.updates.pending()
    }

    pub fn pending_count_for(&self, symbol: &str) -> usize {
        self.updates_by_symbol
            .get(symbol)
            .map_or(0, UpdateCounter::pending)
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn slot_of(&self, symbol: &str, id: &str) -> Option<u64> {
        self.index.get(symbol).and_then(|ids| ids.get(id)).copied()
    }

    fn evict_oldest(&mut self) {
        self.trim_front();
        if let Some(Some(oldest)) = self.slots.pop_front() {
            self.base += 1;
            self.live -= 1;
            let symbol = oldest.symbol();
            if let Some(ids) = self.index.get_mut(symbol) {
                ids.remove(oldest.key());
                if ids.is_empty() {
                    self.index.remove(symbol);
                }
            }
        }
        self.trim_front();
    }

    fn trim_front(&mut self) {
        while matches!(self.slots.front(), Some(None)) {
            self.slots.pop_front();
            self.base += 1;
        }
    }

    /// Drop vacated slots and renumber; every index entry is rewritten in
    /// the same step.
    fn compact(&mut self) {
        let live: Vec<T> = self.slots.drain(..).flatten().collect();
        for (offset, item) in live.into_iter().enumerate() {
            let slot = self.base + offset as u64;
            if let Some(ids) = self.index.get_mut(item.symbol()) {
                ids.insert(item.key().to_string(), slot);
            }
            self.slots.push_back(Some(item));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(symbol: &str, id: &str, price: f64) -> Order {
        Order {
            id: id.into(),
            symbol: symbol.into(),
            price: Some(price),
            ..Order::default()
        }
    }

    fn ids(cache: &KeyedEntityCache<Order>) -> Vec<String> {
        cache.iter().map(|o| o.id.clone()).collect()
    }

    #[test]
    fn update_moves_entry_to_tail() {
        let mut cache = KeyedEntityCache::new(3);
        cache.append(order("BTC/USDT", "1", 10.0));
        cache.append(order("BTC/USDT", "2", 20.0));
        cache.append(order("BTC/USDT", "3", 30.0));

        cache.append(order("BTC/USDT", "2", 21.0));

        assert_eq!(ids(&cache), vec!["1", "3", "2"]);
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.get("BTC/USDT", "2").and_then(|o| o.price), Some(21.0));
    }

    #[test]
    fn new_key_at_capacity_evicts_oldest_and_its_index() {
        let mut cache = KeyedEntityCache::new(2);
        cache.append(order("BTC/USDT", "1", 1.0));
        cache.append(order("ETH/USDT", "2", 2.0));
        cache.append(order("ETH/USDT", "3", 3.0));

        assert_eq!(ids(&cache), vec!["2", "3"]);
        assert!(cache.get("BTC/USDT", "1").is_none());

        // Re-appending the evicted key is an insert, not an update.
        cache.append(order("BTC/USDT", "1", 1.5));
        assert_eq!(ids(&cache), vec!["3", "1"]);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn same_id_different_symbols_are_distinct() {
        let mut cache = KeyedEntityCache::new(5);
        cache.append(order("BTC/USDT", "1", 1.0));
        cache.append(order("ETH/USDT", "1", 2.0));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn heavy_update_churn_stays_consistent() {
        let mut cache = KeyedEntityCache::new(3);
        for round in 0..50 {
            for id in ["a", "b", "c"] {
                cache.append(order("BTC/USDT", id, round as f64));
            }
        }
        assert_eq!(cache.len(), 3);
        assert_eq!(ids(&cache), vec!["a", "b", "c"]);
        for id in ["a", "b", "c"] {
            assert_eq!(cache.get("BTC/USDT", id).and_then(|o| o.price), Some(49.0));
        }

        cache.append(order("BTC/USDT", "d", 0.0));
        assert_eq!(ids(&cache), vec!["b", "c", "d"]);
        assert!(cache.get("BTC/USDT", "a").is_none());
    }

    #[test]
    fn vacated_slots_are_compacted() {
        let mut cache = KeyedEntityCache::new(3);
        cache.append(order("BTC/USDT", "a", 0.0));
        cache.append(order("BTC/USDT", "b", 0.0));
        for i in 0..20 {
            cache.append(order("BTC/USDT", "c", i as f64));
        }
        assert!(cache.slots.len() <= cache.capacity() * 2);
        assert_eq!(ids(&cache), vec!["a", "b", "c"]);
        assert_eq!(cache.get("BTC/USDT", "c").and_then(|o| o.price), Some(19.0));

        cache.append(order("BTC/USDT", "d", 0.0));
        assert_eq!(ids(&cache), vec!["b", "c", "d"]);
    }

    #[test]
    fn updates_count_as_pending() {
        let mut cache = KeyedEntityCache::new(3);
        cache.append(order("BTC/USDT", "1", 1.0));
        cache.append(order("BTC/USDT", "1", 2.0));
        cache.append(order("ETH/USDT", "9", 2.0));
        assert_eq!(cache.pending_count(), 3);
        assert_eq!(cache.pending_count_for("BTC/USDT"), 2);

        let window = cache.read(Some("BTC/USDT"));
        assert_eq!(window.items.len(), 1);
        assert_eq!(window.fresh, 2);
        assert_eq!(cache.pending_count_for("BTC/USDT"), 0);
        // Reading one symbol leaves the global counter untouched.
        assert_eq!(cache.pending_count(), 3);
    }
}
