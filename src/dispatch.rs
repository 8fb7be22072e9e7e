// =============================================================================
// Dispatcher — routes inbound frames into synchronized state
// =============================================================================
//
// One dispatcher per connection, owned by that connection's task. It is the
// only writer of the caches and order-book engines it holds; side effects
// that need I/O (sending frames, fetching snapshots, dropping the endpoint
// memo) are returned to the caller as `Effect`s.
// =============================================================================

use std::collections::{BTreeMap, HashMap};

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cache::{BoundedSequence, KeyedEntityCache, TimeBucketCache};
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::multiplexer::{PostAck, SubscribeRequest, SubscriptionMultiplexer, Update, Waiter};
use crate::orderbook::{OrderBookSnapshot, OrderBookSyncEngine, SyncOutcome};
use crate::parsers::{
    self, market_id_to_symbol, parse_balance_update, parse_bid_ask, parse_delta,
    parse_full_replace, parse_ohlcv, parse_ticker, parse_trade, parse_ws_order, parse_ws_trade,
};
use crate::protocol::{
    self, hash, Frame, MessageKind, Push, ALL_TICKERS_TOPIC, TOKEN_EXPIRED,
};
use crate::types::{iso8601, AccountBalances, Candle, ChannelClass, Order, OrderStatus, Ticker, Trade};

/// I/O the connection task must perform on the dispatcher's behalf.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Send(String),
    FetchSnapshot {
        symbol: String,
        limit: Option<usize>,
        epoch: u64,
    },
    InvalidateEndpoint(ChannelClass),
}

/// Knobs the dispatcher needs from the configuration.
#[derive(Debug, Clone)]
pub struct DispatchOptions {
    pub trades_limit: usize,
    pub ohlcv_limit: usize,
    pub orders_limit: usize,
    pub snapshot_delay: usize,
    pub snapshot_max_retries: usize,
    pub balance_account_type: String,
    pub new_updates: bool,
}

impl From<&SyncConfig> for DispatchOptions {
    fn from(config: &SyncConfig) -> Self {
        Self {
            trades_limit: config.trades_limit,
            ohlcv_limit: config.ohlcv_limit,
            orders_limit: config.orders_limit,
            snapshot_delay: config.snapshot_delay,
            snapshot_max_retries: config.snapshot_max_retries,
            balance_account_type: config.balance_account_type.clone(),
            new_updates: config.new_updates,
        }
    }
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self::from(&SyncConfig::default())
    }
}

/// Everything synchronized over one connection.
#[derive(Debug)]
pub struct SyncState {
    pub order_books: HashMap<String, OrderBookSyncEngine>,
    pub trades: HashMap<String, BoundedSequence<Trade>>,
    /// symbol -> timeframe -> candles
    pub ohlcvs: HashMap<String, HashMap<String, TimeBucketCache<Candle>>>,
    pub tickers: BTreeMap<String, Ticker>,
    pub bids_asks: BTreeMap<String, Ticker>,
    pub orders: KeyedEntityCache<Order>,
    pub trigger_orders: KeyedEntityCache<Order>,
    pub my_trades: KeyedEntityCache<Trade>,
    /// account type -> balances
    pub balances: BTreeMap<String, AccountBalances>,
}

impl SyncState {
    fn new(options: &DispatchOptions) -> Self {
        Self {
            order_books: HashMap::new(),
            trades: HashMap::new(),
            ohlcvs: HashMap::new(),
            tickers: BTreeMap::new(),
            bids_asks: BTreeMap::new(),
            orders: KeyedEntityCache::new(options.orders_limit),
            trigger_orders: KeyedEntityCache::new(options.orders_limit),
            my_trades: KeyedEntityCache::new(options.trades_limit),
            balances: BTreeMap::new(),
        }
    }
}

pub struct Dispatcher {
    class: ChannelClass,
    options: DispatchOptions,
    mux: SubscriptionMultiplexer,
    state: SyncState,
    last_pong: Option<Instant>,
}

impl Dispatcher {
    pub fn new(class: ChannelClass, options: DispatchOptions) -> Self {
        let state = SyncState::new(&options);
        Self {
            class,
            options,
            mux: SubscriptionMultiplexer::new(),
            state,
            last_pong: None,
        }
    }

    pub fn state(&self) -> &SyncState {
        &self.state
    }

    pub fn last_pong(&self) -> Option<Instant> {
        self.last_pong
    }

    pub fn ping_frame(&mut self) -> String {
        protocol::ping_frame(&self.mux.next_request_id())
    }

    // -------------------------------------------------------------------------
    // Commands from callers
    // -------------------------------------------------------------------------

    pub fn subscribe(&mut self, request: SubscribeRequest, waiter: Waiter) -> Vec<Effect> {
        if let Some(PostAck::RearmOrderBooks { symbols, depth }) = &request.on_ack {
            for symbol in symbols {
                self.engine(symbol).set_depth(*depth);
            }
        }
        self.mux
            .subscribe(request, waiter)
            .map(Effect::Send)
            .into_iter()
            .collect()
    }

    /// Fail every waiter; the connection is gone.
    pub fn fail_all(&mut self, err: SyncError) {
        self.mux.reject_all(err);
    }

    // -------------------------------------------------------------------------
    // Inbound frames
    // -------------------------------------------------------------------------

    pub fn handle_text(&mut self, text: &str) -> Vec<Effect> {
        let frame = match protocol::parse_frame(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(class = %self.class, error = %e, "dropping malformed frame");
                return Vec::new();
            }
        };

        match frame {
            Frame::Welcome { id } => {
                info!(class = %self.class, id = ?id, "stream welcome received");
                Vec::new()
            }
            Frame::Ack { id } => {
                self.handle_ack(&id);
                Vec::new()
            }
            Frame::Pong { .. } => {
                self.last_pong = Some(Instant::now());
                Vec::new()
            }
            Frame::Error { id, code, data } => self.handle_error(id, code, data),
            Frame::Message(push) => self.handle_push(push),
            Frame::Unknown(kind) => {
                debug!(kind = %kind, "ignoring frame of unknown type");
                Vec::new()
            }
        }
    }

    /// A spawned snapshot fetch finished.
    pub fn handle_snapshot(
        &mut self,
        symbol: &str,
        epoch: u64,
        result: Result<OrderBookSnapshot, SyncError>,
    ) -> Vec<Effect> {
        let Some(engine) = self.state.order_books.get_mut(symbol) else {
            return Vec::new();
        };
        let outcome = match result {
            Ok(snapshot) => engine.on_snapshot(epoch, snapshot),
            Err(SyncError::Snapshot { reason, .. }) => engine.on_snapshot_error(epoch, &reason),
            Err(e) => engine.on_snapshot_error(epoch, &e.to_string()),
        };
        self.order_book_outcome(symbol, outcome)
    }

    fn handle_ack(&mut self, id: &str) {
        if let Some(PostAck::RearmOrderBooks { symbols, depth }) = self.mux.handle_ack(id) {
            for symbol in &symbols {
                let engine = self.engine(symbol);
                engine.set_depth(depth);
                engine.rearm();
            }
            debug!(id, symbols = ?symbols, "order books re-armed after ack");
        }
    }

    fn handle_error(&mut self, id: Option<String>, code: String, data: String) -> Vec<Effect> {
        let mut effects = Vec::new();
        if data == TOKEN_EXPIRED {
            warn!(class = %self.class, "stream token expired");
            effects.push(Effect::InvalidateEndpoint(self.class));
        }
        let err = SyncError::Exchange {
            code,
            message: data,
        };
        let rejected = id
            .as_deref()
            .is_some_and(|id| self.mux.reject_request(id, err.clone()));
        if !rejected {
            warn!(class = %self.class, error = %err, "exchange error frame");
        }
        effects
    }

    fn handle_push(&mut self, push: Push) -> Vec<Effect> {
        let kind = MessageKind::classify(&push.topic, &push.subject);
        let handled = match kind {
            MessageKind::Ticker => self.on_ticker(&push),
            MessageKind::BidAsk => self.on_bid_ask(&push),
            MessageKind::Candle => self.on_candle(&push),
            MessageKind::Trade => self.on_trade(&push),
            MessageKind::BookDelta => return self.on_book_delta(&push),
            MessageKind::FullBook => self.on_full_book(&push),
            MessageKind::Order => self.on_order(&push),
            MessageKind::MyTrade => self.on_my_trade(&push),
            MessageKind::Balance => self.on_balance(&push),
            MessageKind::Unknown => {
                debug!(topic = %push.topic, subject = %push.subject, "unrouted push");
                Ok(())
            }
        };
        if let Err(e) = handled {
            warn!(topic = %push.topic, subject = %push.subject, error = %e, "dropping malformed push");
        }
        Vec::new()
    }

    // -------------------------------------------------------------------------
    // Handlers
    // -------------------------------------------------------------------------

    fn on_ticker(&mut self, push: &Push) -> anyhow::Result<()> {
        let market_id = match push.topic_argument() {
            Some("all") if push.topic == ALL_TICKERS_TOPIC => Some(push.subject.as_str()),
            other => other,
        };
        // Snapshot pushes nest the ticker one level deeper.
        let raw = if push.data["data"].is_object() {
            &push.data["data"]
        } else {
            &push.data
        };
        let ticker = parse_ticker(raw, market_id)?;
        let symbol = ticker.symbol.clone();
        self.state.tickers.insert(symbol.clone(), ticker.clone());

        self.mux.resolve(&hash::ticker(&symbol), Update::Ticker(ticker.clone()));

        let all = if self.options.new_updates {
            BTreeMap::from([(symbol, ticker)])
        } else {
            self.state.tickers.clone()
        };
        self.mux.resolve(hash::TICKERS, Update::Tickers(all));

        for message_hash in self.mux.find_message_hashes(hash::TICKERS_PREFIX) {
            let wanted = hash::tickers_symbols(&message_hash);
            let matching: BTreeMap<String, Ticker> = self
                .state
                .tickers
                .iter()
                .filter(|(s, _)| wanted.contains(&s.as_str()))
                .map(|(s, t)| (s.clone(), t.clone()))
                .collect();
            if !matching.is_empty() {
                self.mux.resolve(&message_hash, Update::Tickers(matching));
            }
        }
        Ok(())
    }

    fn on_bid_ask(&mut self, push: &Push) -> anyhow::Result<()> {
        let market_id = push
            .topic_argument()
            .ok_or_else(|| anyhow::anyhow!("level1 topic without market"))?;
        let ticker = parse_bid_ask(&push.data, market_id)?;
        let symbol = ticker.symbol.clone();
        self.state.bids_asks.insert(symbol.clone(), ticker.clone());

        let delivered = if self.options.new_updates {
            BTreeMap::from([(symbol.clone(), ticker)])
        } else {
            self.state.bids_asks.clone()
        };
        self.mux.resolve(&hash::bid_ask(&symbol), Update::BidsAsks(delivered));
        Ok(())
    }

    fn on_candle(&mut self, push: &Push) -> anyhow::Result<()> {
        let (_, period) = push
            .topic
            .rsplit_once('_')
            .ok_or_else(|| anyhow::anyhow!("candle topic without period"))?;
        let timeframe = parsers::period_to_timeframe(period).to_string();
        let market_id = push.data["symbol"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("candle push without symbol"))?;
        let symbol = market_id_to_symbol(market_id);
        let candle = parse_ohlcv(&push.data["candles"])?;

        let limit = self.options.ohlcv_limit;
        let stored = self
            .state
            .ohlcvs
            .entry(symbol.clone())
            .or_default()
            .entry(timeframe.clone())
            .or_insert_with(|| TimeBucketCache::new(limit));
        stored.append(candle);

        let message_hash = hash::candles(&symbol, &timeframe);
        if self.mux.has_waiters(&message_hash) {
            let window = stored.read();
            self.mux.resolve(&message_hash, Update::Ohlcv(window));
        }
        Ok(())
    }

    fn on_trade(&mut self, push: &Push) -> anyhow::Result<()> {
        let trade = parse_trade(&push.data)?;
        let symbol = trade.symbol.clone();
        let limit = self.options.trades_limit;
        let stored = self
            .state
            .trades
            .entry(symbol.clone())
            .or_insert_with(|| BoundedSequence::new(limit));
        stored.append(trade);

        let message_hash = hash::trades(&symbol);
        if self.mux.has_waiters(&message_hash) {
            let window = stored.read();
            self.mux.resolve(&message_hash, Update::Trades(window));
        }
        Ok(())
    }

    fn on_book_delta(&mut self, push: &Push) -> Vec<Effect> {
        let delta = match parse_delta(&push.data, push.topic_argument()) {
            Ok(delta) => delta,
            Err(e) => {
                warn!(topic = %push.topic, error = %e, "dropping malformed order book delta");
                return Vec::new();
            }
        };
        let symbol = delta.symbol.clone();
        let outcome = self.engine(&symbol).on_delta(delta);
        self.order_book_outcome(&symbol, outcome)
    }

    fn on_full_book(&mut self, push: &Push) -> anyhow::Result<()> {
        let market_id = push
            .data["symbol"]
            .as_str()
            .or_else(|| push.topic_argument())
            .ok_or_else(|| anyhow::anyhow!("level2 push without market"))?;
        let symbol = market_id_to_symbol(market_id);
        let full = parse_full_replace(&push.data)?;
        let outcome = self.engine(&symbol).on_full_replace(&full);
        self.order_book_outcome(&symbol, outcome);
        Ok(())
    }

    fn on_order(&mut self, push: &Push) -> anyhow::Result<()> {
        let mut order = parse_ws_order(&push.data)?;
        let trigger = order.is_trigger_order();
        let cache = if trigger {
            &mut self.state.trigger_orders
        } else {
            &mut self.state.orders
        };
        let was_closed = cache
            .get(&order.symbol, &order.id)
            .is_some_and(|o| o.status == OrderStatus::Closed);
        if was_closed {
            order.status = OrderStatus::Closed;
        }
        let symbol = order.symbol.clone();
        cache.append(order);

        let base = if trigger {
            hash::TRIGGER_ORDERS
        } else {
            hash::ORDERS
        };
        for scope in [None, Some(symbol.as_str())] {
            let message_hash = hash::scoped(base, scope);
            if self.mux.has_waiters(&message_hash) {
                let window = cache.read(scope);
                self.mux.resolve(&message_hash, Update::Orders(window));
            }
        }
        Ok(())
    }

    fn on_my_trade(&mut self, push: &Push) -> anyhow::Result<()> {
        let trade = parse_ws_trade(&push.data)?;
        let symbol = trade.symbol.clone();
        self.state.my_trades.append(trade);

        for scope in [None, Some(symbol.as_str())] {
            let message_hash = hash::scoped(hash::MY_TRADES, scope);
            if self.mux.has_waiters(&message_hash) {
                let window = self.state.my_trades.read(scope);
                self.mux.resolve(&message_hash, Update::MyTrades(window));
            }
        }
        Ok(())
    }

    fn on_balance(&mut self, push: &Push) -> anyhow::Result<()> {
        let update = parse_balance_update(&push.data)?;
        let account = self
            .state
            .balances
            .entry(update.account_type.clone())
            .or_default();
        account.timestamp = update.timestamp;
        account.datetime = update.timestamp.and_then(iso8601);
        account.currencies.insert(update.currency, update.entry);

        if update.account_type == self.options.balance_account_type {
            let snapshot = account.clone();
            self.mux.resolve(hash::BALANCE, Update::Balance(snapshot));
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Order-book plumbing
    // -------------------------------------------------------------------------

    fn engine(&mut self, symbol: &str) -> &mut OrderBookSyncEngine {
        let delay = self.options.snapshot_delay;
        let retries = self.options.snapshot_max_retries;
        self.state
            .order_books
            .entry(symbol.to_string())
            .or_insert_with(|| OrderBookSyncEngine::new(symbol, delay, retries, None))
    }

    fn order_book_outcome(&mut self, symbol: &str, outcome: SyncOutcome) -> Vec<Effect> {
        let Some(engine) = self.state.order_books.get(symbol) else {
            return Vec::new();
        };
        match outcome {
            SyncOutcome::Buffered | SyncOutcome::Stale | SyncOutcome::Ignored => Vec::new(),
            SyncOutcome::FetchSnapshot { epoch } | SyncOutcome::RetrySnapshot { epoch, .. } => {
                vec![Effect::FetchSnapshot {
                    symbol: symbol.to_string(),
                    limit: engine.depth(),
                    epoch,
                }]
            }
            SyncOutcome::Applied => {
                let view = engine.view();
                self.mux.resolve(&hash::order_book(symbol), Update::OrderBook(view));
                Vec::new()
            }
            SyncOutcome::Rejected(err) => {
                warn!(symbol, error = %err, "order book resync failed");
                self.mux.reject(&hash::order_book(symbol), err);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use serde_json::Value;
    use tokio::sync::oneshot;
    use tokio::sync::oneshot::error::TryRecvError;

    use crate::orderbook::SyncPhase;
    use crate::protocol::{private_params, topic};

    fn dispatcher() -> Dispatcher {
        let options = DispatchOptions {
            snapshot_delay: 1,
            ..DispatchOptions::default()
        };
        Dispatcher::new(ChannelClass::Public, options)
    }

    fn order_book_request(symbol: &str, depth: Option<usize>) -> SubscribeRequest {
        let symbols = vec![symbol.to_string()];
        SubscribeRequest {
            topic: topic::batched(topic::ORDER_BOOK_DELTAS, &symbols),
            subscription_hashes: topic::per_symbol(topic::ORDER_BOOK_DELTAS, &symbols),
            message_hashes: vec![hash::order_book(symbol)],
            on_ack: Some(PostAck::RearmOrderBooks { symbols, depth }),
            ..SubscribeRequest::default()
        }
    }

    fn delta(start: i64, end: i64, bid: &str) -> String {
        format!(
            r#"{{"type":"message","topic":"/market/level2:BTC-USDT","subject":"trade.l2update",
                "data":{{"sequenceStart":{start},"sequenceEnd":{end},"symbol":"BTC-USDT",
                "changes":{{"asks":[],"bids":[["{bid}","1","{end}"]]}}}}}}"#
        )
    }

    fn sent_id(effects: &[Effect]) -> String {
        match effects.first() {
            Some(Effect::Send(frame)) => {
                let value: Value = serde_json::from_str(frame).unwrap();
                value["id"].as_str().unwrap().to_string()
            }
            other => panic!("expected a frame, got {other:?}"),
        }
    }

    #[test]
    fn order_book_lifecycle() {
        let mut d = dispatcher();
        let (tx, mut rx) = oneshot::channel();
        let effects = d.subscribe(order_book_request("BTC/USDT", Some(20)), tx);
        let id = sent_id(&effects);
        assert!(d.handle_text(&format!(r#"{{"id":"{id}","type":"ack"}}"#)).is_empty());

        assert!(d.handle_text(&delta(100, 105, "1")).is_empty());
        let effects = d.handle_text(&delta(106, 110, "2"));
        assert_eq!(
            effects,
            vec![Effect::FetchSnapshot {
                symbol: "BTC/USDT".into(),
                limit: Some(20),
                epoch: 1,
            }]
        );
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

        let snapshot = OrderBookSnapshot {
            bids: vec![(Decimal::from(50), Decimal::ONE)],
            asks: vec![(Decimal::from(60), Decimal::ONE)],
            nonce: Some(107),
            timestamp: None,
        };
        assert!(d.handle_snapshot("BTC/USDT", 1, Ok(snapshot)).is_empty());

        let Ok(Update::OrderBook(book)) = rx.try_recv().unwrap() else {
            panic!("expected an order book");
        };
        assert_eq!(book.nonce, Some(110));
        assert_eq!(book.best_bid(), Some((Decimal::from(50), Decimal::ONE)));
        assert_eq!(book.bids.size_at(Decimal::from(2)), Some(Decimal::ONE));
        assert_eq!(book.bids.size_at(Decimal::from(1)), None);
        assert_eq!(
            d.state().order_books["BTC/USDT"].phase(),
            SyncPhase::Synced
        );
    }

    fn synced_dispatcher() -> Dispatcher {
        let mut d = dispatcher();
        let (tx, _rx) = oneshot::channel();
        d.subscribe(order_book_request("BTC/USDT", None), tx);
        d.handle_text(&delta(100, 105, "1"));
        d.handle_text(&delta(106, 110, "2"));
        let snapshot = OrderBookSnapshot {
            bids: vec![(Decimal::from(50), Decimal::ONE)],
            asks: vec![(Decimal::from(60), Decimal::ONE)],
            nonce: Some(107),
            timestamp: None,
        };
        d.handle_snapshot("BTC/USDT", 0, Ok(snapshot));
        assert_eq!(d.state().order_books["BTC/USDT"].phase(), SyncPhase::Synced);
        d
    }

    #[test]
    fn malformed_delta_leaves_synced_book_untouched() {
        let mut d = synced_dispatcher();
        let before = d.state().order_books["BTC/USDT"].book().clone();

        let malformed = [
            r#"{"type":"message","topic":"/market/level2:BTC-USDT","subject":"trade.l2update",
                "data":{"sequenceStart":"abc","sequenceEnd":120,"symbol":"BTC-USDT",
                "changes":{"asks":[],"bids":[["9","1","120"]]}}}"#,
            r#"{"type":"message","topic":"/market/level2:BTC-USDT","subject":"trade.l2update",
                "data":{"sequenceStart":111,"symbol":"BTC-USDT",
                "changes":{"asks":[],"bids":[["9","1","120"]]}}}"#,
            r#"{"type":"message","topic":"/market/level2:BTC-USDT","subject":"trade.l2update",
                "data":{"sequenceStart":111,"sequenceEnd":120,"symbol":"BTC-USDT",
                "changes":{"asks":[],"bids":[["nine","1","120"]]}}}"#,
        ];
        for frame in malformed {
            assert!(d.handle_text(frame).is_empty());
        }

        let engine = &d.state().order_books["BTC/USDT"];
        assert_eq!(engine.phase(), SyncPhase::Synced);
        assert_eq!(engine.book(), &before);
        assert_eq!(engine.book().nonce, Some(110));

        // A well-formed delta still applies afterwards.
        d.handle_text(&delta(111, 112, "3"));
        assert_eq!(d.state().order_books["BTC/USDT"].book().nonce, Some(112));
    }

    #[test]
    fn out_of_range_sequence_start_forces_snapshot_retry() {
        let mut d = dispatcher();
        let (tx, mut rx) = oneshot::channel();
        d.subscribe(order_book_request("BTC/USDT", None), tx);
        d.handle_text(&delta(i64::MIN, 5, "1"));
        d.handle_text(&delta(6, 10, "1"));

        let snapshot = OrderBookSnapshot {
            bids: vec![(Decimal::from(50), Decimal::ONE)],
            asks: vec![(Decimal::from(60), Decimal::ONE)],
            nonce: Some(7),
            timestamp: None,
        };
        let effects = d.handle_snapshot("BTC/USDT", 0, Ok(snapshot));
        assert!(matches!(effects.as_slice(), [Effect::FetchSnapshot { epoch: 0, .. }]));
        assert_eq!(d.state().order_books["BTC/USDT"].phase(), SyncPhase::Buffering);
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn out_of_range_timestamps_do_not_stop_dispatch() {
        let mut d = dispatcher();
        let (trades_tx, mut trades_rx) = oneshot::channel();
        let (candles_tx, mut candles_rx) = oneshot::channel();
        d.subscribe(SubscribeRequest::single("/market/match:BTC-USDT", hash::trades("BTC/USDT")), trades_tx);
        d.subscribe(
            SubscribeRequest::single("/market/candles:BTC-USDT_1min", hash::candles("BTC/USDT", "1m")),
            candles_tx,
        );

        d.handle_text(
            r#"{"type":"message","topic":"/market/match:BTC-USDT","subject":"trade.l3match",
                "data":{"symbol":"BTC-USDT","side":"buy","size":"0.1","price":"9345",
                "time":"-9223372036854775807","tradeId":"t1"}}"#,
        );
        let Ok(Update::Trades(window)) = trades_rx.try_recv().unwrap() else {
            panic!("expected trades");
        };
        assert_eq!(window.items[0].timestamp, None);

        let candle = |open_time: &str| {
            format!(
                r#"{{"type":"message","topic":"/market/candles:BTC-USDT_1min","subject":"trade.candles.update",
                    "data":{{"symbol":"BTC-USDT","candles":["{open_time}","1","2","3","0.5","10","20"],"time":1}}}}"#
            )
        };
        assert!(d.handle_text(&candle("9223372036854775807")).is_empty());
        assert!(matches!(candles_rx.try_recv(), Err(TryRecvError::Empty)));

        d.handle_text(&candle("1624881240"));
        let Ok(Update::Ohlcv(window)) = candles_rx.try_recv().unwrap() else {
            panic!("expected candles");
        };
        assert_eq!(window.items[0].timestamp, 1_624_881_240_000);
    }

    #[test]
    fn snapshot_failures_reject_order_book_waiters() {
        let mut d = dispatcher();
        let (tx, mut rx) = oneshot::channel();
        d.subscribe(order_book_request("BTC/USDT", None), tx);
        d.handle_text(&delta(100, 105, "1"));
        d.handle_text(&delta(106, 110, "1"));

        for attempt in 0..3 {
            let effects = d.handle_snapshot(
                "BTC/USDT",
                0,
                Err(SyncError::Snapshot {
                    symbol: "BTC/USDT".into(),
                    reason: "timeout".into(),
                }),
            );
            if attempt < 2 {
                assert!(matches!(effects[0], Effect::FetchSnapshot { .. }));
            }
        }
        assert!(matches!(
            rx.try_recv().unwrap(),
            Err(SyncError::Snapshot { .. })
        ));
    }

    #[test]
    fn depth_feed_replaces_whole_book() {
        let mut d = dispatcher();
        let (tx, mut rx) = oneshot::channel();
        let request = SubscribeRequest::single(
            "/spotMarket/level2Depth5:BTC-USDT",
            hash::order_book("BTC/USDT"),
        );
        d.subscribe(request, tx);
        d.handle_text(
            r#"{"type":"message","topic":"/spotMarket/level2Depth5:BTC-USDT","subject":"level2",
                "data":{"asks":[["42815.6","1.2"]],"bids":[["42815.5","0.08"]],"timestamp":1707204474018}}"#,
        );
        let Ok(Update::OrderBook(book)) = rx.try_recv().unwrap() else {
            panic!("expected an order book");
        };
        assert_eq!(book.symbol, "BTC/USDT");
        assert_eq!(book.timestamp, Some(1_707_204_474_018));
        assert_eq!(book.asks.len(), 1);
    }

    #[test]
    fn trades_resolve_per_symbol() {
        let mut d = dispatcher();
        let (btc_tx, mut btc_rx) = oneshot::channel();
        let (eth_tx, mut eth_rx) = oneshot::channel();
        d.subscribe(SubscribeRequest::single("/market/match:BTC-USDT", hash::trades("BTC/USDT")), btc_tx);
        d.subscribe(SubscribeRequest::single("/market/match:ETH-USDT", hash::trades("ETH/USDT")), eth_tx);

        d.handle_text(
            r#"{"type":"message","topic":"/market/match:BTC-USDT","subject":"trade.l3match",
                "data":{"symbol":"BTC-USDT","side":"buy","size":"0.1","price":"9345",
                "time":"1580559434436443257","tradeId":"t1"}}"#,
        );
        let Ok(Update::Trades(window)) = btc_rx.try_recv().unwrap() else {
            panic!("expected trades");
        };
        assert_eq!(window.items.len(), 1);
        assert_eq!(window.fresh, 1);
        assert!(matches!(eth_rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn all_tickers_topic_and_filtered_hashes() {
        let mut d = dispatcher();
        let (all_tx, mut all_rx) = oneshot::channel();
        let (some_tx, mut some_rx) = oneshot::channel();
        d.subscribe(SubscribeRequest::single(ALL_TICKERS_TOPIC, hash::TICKERS), all_tx);
        d.subscribe(
            SubscribeRequest::single("/market/ticker:ETH-USDT", "tickers::ETH/USDT"),
            some_tx,
        );

        d.handle_text(
            r#"{"type":"message","topic":"/market/ticker:all","subject":"BTC-USDT",
                "data":{"bestAsk":"2","bestBid":"1","price":"1.5","time":1634641987564}}"#,
        );
        let Ok(Update::Tickers(all)) = all_rx.try_recv().unwrap() else {
            panic!("expected tickers");
        };
        assert_eq!(all["BTC/USDT"].last, Some(1.5));
        // No ETH ticker stored yet, so the filtered waiter keeps waiting.
        assert!(matches!(some_rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn closed_order_status_is_sticky() {
        let mut d = Dispatcher::new(ChannelClass::Private, DispatchOptions::default());
        let order = |kind: &str| {
            format!(
                r#"{{"type":"message","topic":"/spotMarket/tradeOrders","subject":"orderChange",
                    "data":{{"symbol":"XCAD-USDT","orderId":"o1","type":"{kind}","size":"1","side":"buy"}}}}"#
            )
        };
        d.handle_text(&order("filled"));
        d.handle_text(&order("update"));

        let (tx, mut rx) = oneshot::channel();
        let request = SubscribeRequest::single(topic::ORDERS, "orders:XCAD/USDT")
            .with_params(private_params());
        d.subscribe(request, tx);
        d.handle_text(&order("match"));

        let Ok(Update::Orders(window)) = rx.try_recv().unwrap() else {
            panic!("expected orders");
        };
        assert_eq!(window.items.len(), 1);
        assert_eq!(window.items[0].status, OrderStatus::Closed);
        assert_eq!(window.fresh, 3);
    }

    #[test]
    fn balance_resolves_only_configured_account() {
        let mut d = Dispatcher::new(ChannelClass::Private, DispatchOptions::default());
        let (tx, mut rx) = oneshot::channel();
        d.subscribe(SubscribeRequest::single(topic::BALANCE, hash::BALANCE), tx);

        let balance = |event: &str, available: &str| {
            format!(
                r#"{{"type":"message","topic":"/account/balance","subject":"account.balance",
                    "data":{{"available":"{available}","currency":"USDT","hold":"0",
                    "relationEvent":"{event}","time":"1645716561816","total":"{available}"}}}}"#
            )
        };
        d.handle_text(&balance("main.transfer", "89"));
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
        assert_eq!(d.state().balances["main"].currencies["USDT"].free, Some(89.0));

        d.handle_text(&balance("trade.hold", "10"));
        let Ok(Update::Balance(account)) = rx.try_recv().unwrap() else {
            panic!("expected balance");
        };
        assert_eq!(account.currencies["USDT"].total, Some(10.0));
    }

    #[test]
    fn error_frames() {
        let mut d = dispatcher();
        let (tx, mut rx) = oneshot::channel();
        let effects = d.subscribe(
            SubscribeRequest::single("/market/match:NOPE-USDT", hash::trades("NOPE/USDT")),
            tx,
        );
        let id = sent_id(&effects);
        let effects = d.handle_text(&format!(
            r#"{{"id":"{id}","type":"error","code":404,"data":"topic /market/match:NOPE-USDT is not found"}}"#
        ));
        assert!(effects.is_empty());
        assert!(matches!(
            rx.try_recv().unwrap(),
            Err(SyncError::Exchange { code, .. }) if code == "404"
        ));

        let effects = d.handle_text(r#"{"id":"99","type":"error","code":401,"data":"token is expired"}"#);
        assert_eq!(effects, vec![Effect::InvalidateEndpoint(ChannelClass::Public)]);
    }

    #[test]
    fn pong_and_garbage() {
        let mut d = dispatcher();
        assert!(d.last_pong().is_none());
        d.handle_text(r#"{"id":"1","type":"pong"}"#);
        assert!(d.last_pong().is_some());
        assert!(d.handle_text("{not json").is_empty());
        assert!(d.handle_text(r#"{"type":"message","topic":"/x:y","subject":"level1","data":5}"#).is_empty());
    }
}
