// =============================================================================
// Subscription multiplexer — topics, pending acks and per-hash waiters
// =============================================================================
//
// Many logical subscriptions share one stream connection. A subscribe
// request names the wire topic to send, the per-market topics it covers
// (the unit tracked as live) and the message hashes its caller waits on.
// Inbound pushes are resolved by message hash, so a push for one hash never
// wakes a waiter registered on another.
// =============================================================================

use std::collections::{BTreeMap, HashMap, HashSet};

use serde_json::{Map, Value};
use tokio::sync::oneshot;
use tracing::debug;

use crate::cache::Window;
use crate::error::SyncError;
use crate::orderbook::OrderBookState;
use crate::protocol::subscribe_frame;
use crate::types::{AccountBalances, Candle, Order, Ticker, Trade};

/// A value delivered to a waiter.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    Ticker(Ticker),
    Tickers(BTreeMap<String, Ticker>),
    BidsAsks(BTreeMap<String, Ticker>),
    Trades(Window<Trade>),
    Ohlcv(Window<Candle>),
    OrderBook(OrderBookState),
    Orders(Window<Order>),
    MyTrades(Window<Trade>),
    Balance(AccountBalances),
}

impl Update {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Ticker(_) => "ticker",
            Self::Tickers(_) => "tickers",
            Self::BidsAsks(_) => "bids/asks",
            Self::Trades(_) => "trades",
            Self::Ohlcv(_) => "ohlcv",
            Self::OrderBook(_) => "order book",
            Self::Orders(_) => "orders",
            Self::MyTrades(_) => "my trades",
            Self::Balance(_) => "balance",
        }
    }
}

pub type Waiter = oneshot::Sender<Result<Update, SyncError>>;

/// One-shot action run when the exchange acknowledges a subscribe.
#[derive(Debug, Clone, PartialEq)]
pub enum PostAck {
    /// Drop any state gathered before the ack and start a fresh snapshot
    /// cycle for each symbol.
    RearmOrderBooks {
        symbols: Vec<String>,
        depth: Option<usize>,
    },
}

#[derive(Debug, Clone, Default)]
pub struct SubscribeRequest {
    /// Topic sent on the wire (may batch several markets).
    pub topic: String,
    /// Per-market topics covered by `topic`.
    pub subscription_hashes: Vec<String>,
    /// Hashes the caller's waiter is registered on.
    pub message_hashes: Vec<String>,
    pub params: Map<String, Value>,
    pub on_ack: Option<PostAck>,
}

impl SubscribeRequest {
    /// Single-topic subscription resolved by a single hash.
    pub fn single(topic: impl Into<String>, message_hash: impl Into<String>) -> Self {
        let topic = topic.into();
        Self {
            subscription_hashes: vec![topic.clone()],
            topic,
            message_hashes: vec![message_hash.into()],
            ..Self::default()
        }
    }

    pub fn with_params(mut self, params: Map<String, Value>) -> Self {
        self.params = params;
        self
    }
}

#[derive(Debug)]
struct PendingAck {
    subscription_hashes: Vec<String>,
    message_hashes: Vec<String>,
    on_ack: Option<PostAck>,
}

#[derive(Debug)]
struct PendingWaiter {
    hashes: Vec<String>,
    tx: Waiter,
}

#[derive(Debug, Default)]
pub struct SubscriptionMultiplexer {
    next_id: u64,
    live: HashSet<String>,
    pending_acks: HashMap<String, PendingAck>,
    next_waiter: u64,
    waiters: HashMap<u64, PendingWaiter>,
    by_hash: HashMap<String, Vec<u64>>,
}

impl SubscriptionMultiplexer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Monotonically increasing request id, shared by subscribes and pings.
    pub fn next_request_id(&mut self) -> String {
        self.next_id += 1;
        self.next_id.to_string()
    }

    /// Register `waiter` on every message hash of `request`.
    ///
    /// Returns the subscribe frame to send when at least one of the covered
    /// topics is not live yet; otherwise the waiter just joins the existing
    /// subscription.
    pub fn subscribe(&mut self, request: SubscribeRequest, waiter: Waiter) -> Option<String> {
        self.register_waiter(request.message_hashes.clone(), waiter);

        let fresh: Vec<String> = request
            .subscription_hashes
            .iter()
            .filter(|hash| !self.live.contains(*hash))
            .cloned()
            .collect();
        if fresh.is_empty() {
            return None;
        }

        let id = self.next_request_id();
        self.live.extend(fresh.iter().cloned());
        let frame = subscribe_frame(&id, &request.topic, &request.params);
        debug!(id = %id, topic = %request.topic, "subscribing");
        self.pending_acks.insert(
            id,
            PendingAck {
                subscription_hashes: fresh,
                message_hashes: request.message_hashes,
                on_ack: request.on_ack,
            },
        );
        Some(frame)
    }

    /// Consume the pending-ack entry; unknown ids yield `None`.
    pub fn handle_ack(&mut self, id: &str) -> Option<PostAck> {
        match self.pending_acks.remove(id) {
            Some(pending) => pending.on_ack,
            None => {
                debug!(id, "ack for unknown request id");
                None
            }
        }
    }

    /// Reject the waiters of a failed request and forget its topics so a
    /// later subscribe sends a fresh frame. Returns false for unknown ids.
    pub fn reject_request(&mut self, id: &str, err: SyncError) -> bool {
        let Some(pending) = self.pending_acks.remove(id) else {
            return false;
        };
        for hash in &pending.subscription_hashes {
            self.live.remove(hash);
        }
        for hash in &pending.message_hashes {
            self.reject(hash, err.clone());
        }
        true
    }

    /// Deliver `update` to every waiter on `hash`. Returns how many were woken.
    pub fn resolve(&mut self, hash: &str, update: Update) -> usize {
        self.settle(hash, || Ok(update.clone()))
    }

    pub fn reject(&mut self, hash: &str, err: SyncError) -> usize {
        self.settle(hash, || Err(err.clone()))
    }

    pub fn has_waiters(&self, hash: &str) -> bool {
        self.by_hash.get(hash).is_some_and(|ids| !ids.is_empty())
    }

    /// Hashes with at least one waiter that start with `prefix`.
    pub fn find_message_hashes(&self, prefix: &str) -> Vec<String> {
        self.by_hash
            .iter()
            .filter(|(hash, ids)| hash.starts_with(prefix) && !ids.is_empty())
            .map(|(hash, _)| hash.clone())
            .collect()
    }

    pub fn is_live(&self, subscription_hash: &str) -> bool {
        self.live.contains(subscription_hash)
    }

    pub fn pending_ack_count(&self) -> usize {
        self.pending_acks.len()
    }

    /// Fail everything; used when the connection goes away.
    pub fn reject_all(&mut self, err: SyncError) {
        self.live.clear();
        self.pending_acks.clear();
        self.by_hash.clear();
        for (_, waiter) in self.waiters.drain() {
            let _ = waiter.tx.send(Err(err.clone()));
        }
    }

    fn register_waiter(&mut self, hashes: Vec<String>, tx: Waiter) {
        self.prune_closed();
        self.next_waiter += 1;
        let key = self.next_waiter;
        for hash in &hashes {
            self.by_hash.entry(hash.clone()).or_default().push(key);
        }
        self.waiters.insert(key, PendingWaiter { hashes, tx });
    }

    fn settle<F>(&mut self, hash: &str, outcome: F) -> usize
    where
        F: Fn() -> Result<Update, SyncError>,
    {
        let Some(keys) = self.by_hash.remove(hash) else {
            return 0;
        };
        let mut woken = 0;
        for key in keys {
            let Some(waiter) = self.waiters.remove(&key) else {
                continue;
            };
            self.unlink(key, &waiter.hashes, hash);
            if waiter.tx.send(outcome()).is_ok() {
                woken += 1;
            }
        }
        woken
    }

    /// Remove `key` from the other hashes it was registered on.
    fn unlink(&mut self, key: u64, hashes: &[String], settled: &str) {
        for other in hashes.iter().filter(|h| h.as_str() != settled) {
            if let Some(ids) = self.by_hash.get_mut(other) {
                ids.retain(|id| *id != key);
                if ids.is_empty() {
                    self.by_hash.remove(other);
                }
            }
        }
    }

    /// Forget waiters whose caller stopped listening.
    fn prune_closed(&mut self) {
        let closed: Vec<(u64, Vec<String>)> = self
            .waiters
            .iter()
            .filter(|(_, w)| w.tx.is_closed())
            .map(|(key, w)| (*key, w.hashes.clone()))
            .collect();
        for (key, hashes) in closed {
            self.waiters.remove(&key);
            self.unlink(key, &hashes, "");
        }
    }
}
