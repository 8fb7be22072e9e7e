// =============================================================================
// Sync client — watch API over negotiated stream connections
// =============================================================================
//
// One connection per channel class. Each connection runs a single task that
// owns its `Dispatcher`; callers send subscribe commands over an mpsc
// channel and await their value on a oneshot. Snapshot fetches run as
// spawned tasks and post their result back into the same task, so deltas of
// a symbol are never applied out of order.
// =============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::cache::Window;
use crate::config::SyncConfig;
use crate::dispatch::{DispatchOptions, Dispatcher, Effect};
use crate::error::{SyncError, SyncResult};
use crate::multiplexer::{PostAck, SubscribeRequest, Update, Waiter};
use crate::negotiator::{ConnectionNegotiator, Endpoint, EndpointSource};
use crate::orderbook::{OrderBookSnapshot, OrderBookState, SnapshotSource};
use crate::parsers::{market_id_to_symbol, timeframe_to_period};
use crate::protocol::{hash, private_params, topic, ALL_TICKERS_TOPIC};
use crate::rest::KucoinRest;
use crate::types::{AccountBalances, Candle, ChannelClass, Order, Ticker, Trade};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Order-book depths the exchange can stream.
const ORDER_BOOK_LIMITS: [usize; 4] = [5, 20, 50, 100];

enum Command {
    Subscribe {
        request: SubscribeRequest,
        waiter: Waiter,
    },
}

struct Connection {
    connect_id: String,
    commands: mpsc::UnboundedSender<Command>,
}

/// One slot per channel class; connecting one class never waits on the other.
#[derive(Default)]
struct ConnectionSlots {
    public: Mutex<Option<Connection>>,
    private: Mutex<Option<Connection>>,
}

impl ConnectionSlots {
    fn get(&self, class: ChannelClass) -> &Mutex<Option<Connection>> {
        match class {
            ChannelClass::Public => &self.public,
            ChannelClass::Private => &self.private,
        }
    }
}

struct SnapshotDone {
    symbol: String,
    epoch: u64,
    result: Result<OrderBookSnapshot, SyncError>,
}

pub struct SyncClient {
    config: Arc<SyncConfig>,
    negotiator: Arc<ConnectionNegotiator>,
    snapshots: Arc<dyn SnapshotSource>,
    connections: ConnectionSlots,
}

impl SyncClient {
    pub fn new(
        config: SyncConfig,
        endpoints: Arc<dyn EndpointSource>,
        snapshots: Arc<dyn SnapshotSource>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            negotiator: Arc::new(ConnectionNegotiator::new(endpoints)),
            snapshots,
            connections: ConnectionSlots::default(),
        }
    }

    /// Client backed by the KuCoin REST API for both collaborators.
    pub fn kucoin(config: SyncConfig) -> anyhow::Result<Self> {
        let rest = Arc::new(KucoinRest::new(&config)?);
        Ok(Self::new(config, rest.clone(), rest))
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    // -------------------------------------------------------------------------
    // Public market data
    // -------------------------------------------------------------------------

    pub async fn watch_ticker(&self, symbol: &str) -> SyncResult<Ticker> {
        let symbol = market_id_to_symbol(symbol);
        let channel = self.config.ticker_method.as_str();
        let request = SubscribeRequest::single(
            topic::batched(channel, std::slice::from_ref(&symbol)),
            hash::ticker(&symbol),
        );
        match self.watch(ChannelClass::Public, request).await? {
            Update::Ticker(ticker) => Ok(ticker),
            other => Err(SyncError::UnexpectedUpdate(other.kind())),
        }
    }

    /// Every market when `symbols` is `None`.
    pub async fn watch_tickers(&self, symbols: Option<&[&str]>) -> SyncResult<BTreeMap<String, Ticker>> {
        let symbols = symbols.map(normalize);
        let request = match &symbols {
            Some(list) => SubscribeRequest::single(
                topic::batched(topic::TICKERS, list),
                hash::tickers(Some(list)),
            ),
            None => SubscribeRequest::single(ALL_TICKERS_TOPIC, hash::tickers(None)),
        };
        match self.watch(ChannelClass::Public, request).await? {
            Update::Tickers(tickers) => Ok(tickers),
            other => Err(SyncError::UnexpectedUpdate(other.kind())),
        }
    }

    pub async fn watch_bids_asks(&self, symbols: &[&str]) -> SyncResult<BTreeMap<String, Ticker>> {
        let symbols = normalize(symbols);
        self.check_symbol_count("watch_bids_asks", &symbols)?;
        let request = SubscribeRequest {
            topic: topic::batched(topic::BID_ASK, &symbols),
            subscription_hashes: topic::per_symbol(topic::BID_ASK, &symbols),
            message_hashes: symbols.iter().map(|s| hash::bid_ask(s)).collect(),
            ..SubscribeRequest::default()
        };
        match self.watch(ChannelClass::Public, request).await? {
            Update::BidsAsks(mut tickers) => {
                tickers.retain(|symbol, _| symbols.contains(symbol));
                Ok(tickers)
            }
            other => Err(SyncError::UnexpectedUpdate(other.kind())),
        }
    }

    pub async fn watch_ohlcv(
        &self,
        symbol: &str,
        timeframe: &str,
        since: Option<i64>,
        limit: Option<usize>,
    ) -> SyncResult<Vec<Candle>> {
        let period = timeframe_to_period(timeframe).ok_or_else(|| {
            SyncError::BadArguments(format!("unsupported timeframe {timeframe}"))
        })?;
        let symbol = market_id_to_symbol(symbol);
        let request = SubscribeRequest::single(
            topic::candles(&symbol, period),
            hash::candles(&symbol, timeframe),
        );
        match self.watch(ChannelClass::Public, request).await? {
            Update::Ohlcv(window) => Ok(self.slice(window, since, limit, |c| Some(c.timestamp))),
            other => Err(SyncError::UnexpectedUpdate(other.kind())),
        }
    }

    pub async fn watch_trades(
        &self,
        symbol: &str,
        since: Option<i64>,
        limit: Option<usize>,
    ) -> SyncResult<Vec<Trade>> {
        self.watch_trades_for_symbols(&[symbol], since, limit).await
    }

    pub async fn watch_trades_for_symbols(
        &self,
        symbols: &[&str],
        since: Option<i64>,
        limit: Option<usize>,
    ) -> SyncResult<Vec<Trade>> {
        if symbols.is_empty() {
            return Err(SyncError::BadArguments(
                "watch_trades_for_symbols requires a non-empty symbol list".into(),
            ));
        }
        let symbols = normalize(symbols);
        self.check_symbol_count("watch_trades_for_symbols", &symbols)?;
        let request = SubscribeRequest {
            topic: topic::batched(topic::TRADES, &symbols),
            subscription_hashes: topic::per_symbol(topic::TRADES, &symbols),
            message_hashes: symbols.iter().map(|s| hash::trades(s)).collect(),
            ..SubscribeRequest::default()
        };
        match self.watch(ChannelClass::Public, request).await? {
            Update::Trades(window) => Ok(self.slice(window, since, limit, |t| t.timestamp)),
            other => Err(SyncError::UnexpectedUpdate(other.kind())),
        }
    }

    pub async fn watch_order_book(&self, symbol: &str, limit: Option<usize>) -> SyncResult<OrderBookState> {
        self.watch_order_book_for_symbols(&[symbol], limit).await
    }

    /// Resolves with the book of whichever symbol updated first.
    ///
    /// `limit` must be 5, 20, 50 or 100; 5 and 50 use the depth channels
    /// that push whole books instead of deltas.
    pub async fn watch_order_book_for_symbols(
        &self,
        symbols: &[&str],
        limit: Option<usize>,
    ) -> SyncResult<OrderBookState> {
        if symbols.is_empty() {
            return Err(SyncError::BadArguments(
                "watch_order_book_for_symbols requires a non-empty symbol list".into(),
            ));
        }
        if let Some(limit) = limit {
            if !ORDER_BOOK_LIMITS.contains(&limit) {
                return Err(SyncError::BadArguments(format!(
                    "order book limit must be one of 5, 20, 50 or 100, got {limit}"
                )));
            }
        }
        let symbols = normalize(symbols);
        self.check_symbol_count("watch_order_book_for_symbols", &symbols)?;

        let channel = topic::order_book_channel(&self.config.order_book_method, limit);
        let on_ack = (channel == topic::ORDER_BOOK_DELTAS).then(|| PostAck::RearmOrderBooks {
            symbols: symbols.clone(),
            depth: limit,
        });
        let request = SubscribeRequest {
            topic: topic::batched(&channel, &symbols),
            subscription_hashes: topic::per_symbol(&channel, &symbols),
            message_hashes: symbols.iter().map(|s| hash::order_book(s)).collect(),
            on_ack,
            ..SubscribeRequest::default()
        };
        match self.watch(ChannelClass::Public, request).await? {
            Update::OrderBook(book) => Ok(book),
            other => Err(SyncError::UnexpectedUpdate(other.kind())),
        }
    }

    // -------------------------------------------------------------------------
    // Private account data
    // -------------------------------------------------------------------------

    /// Regular orders, or trigger (stop) orders when `trigger` is set.
    pub async fn watch_orders(
        &self,
        symbol: Option<&str>,
        since: Option<i64>,
        limit: Option<usize>,
        trigger: bool,
    ) -> SyncResult<Vec<Order>> {
        let symbol = symbol.map(market_id_to_symbol);
        let (channel, base) = if trigger {
            (topic::TRIGGER_ORDERS, hash::TRIGGER_ORDERS)
        } else {
            (topic::ORDERS, hash::ORDERS)
        };
        let request = SubscribeRequest::single(channel, hash::scoped(base, symbol.as_deref()))
            .with_params(private_params());
        match self.watch(ChannelClass::Private, request).await? {
            Update::Orders(window) => Ok(self.slice(window, since, limit, |o| o.timestamp)),
            other => Err(SyncError::UnexpectedUpdate(other.kind())),
        }
    }

    pub async fn watch_my_trades(
        &self,
        symbol: Option<&str>,
        since: Option<i64>,
        limit: Option<usize>,
    ) -> SyncResult<Vec<Trade>> {
        let symbol = symbol.map(market_id_to_symbol);
        let request = SubscribeRequest::single(
            topic::MY_TRADES,
            hash::scoped(hash::MY_TRADES, symbol.as_deref()),
        )
        .with_params(private_params());
        match self.watch(ChannelClass::Private, request).await? {
            Update::MyTrades(window) => Ok(self.slice(window, since, limit, |t| t.timestamp)),
            other => Err(SyncError::UnexpectedUpdate(other.kind())),
        }
    }

    pub async fn watch_balance(&self) -> SyncResult<AccountBalances> {
        let request = SubscribeRequest::single(topic::BALANCE, hash::BALANCE)
            .with_params(private_params());
        match self.watch(ChannelClass::Private, request).await? {
            Update::Balance(balance) => Ok(balance),
            other => Err(SyncError::UnexpectedUpdate(other.kind())),
        }
    }

    // -------------------------------------------------------------------------
    // Plumbing
    // -------------------------------------------------------------------------

    async fn watch(&self, class: ChannelClass, request: SubscribeRequest) -> SyncResult<Update> {
        let commands = self.connection(class).await?;
        let (tx, rx) = oneshot::channel();
        commands
            .send(Command::Subscribe {
                request,
                waiter: tx,
            })
            .map_err(|_| SyncError::DispatchStopped)?;
        rx.await.map_err(|_| SyncError::DispatchStopped)?
    }

    /// Live command channel for `class`, connecting first if needed.
    ///
    /// Negotiation and the socket handshake are each bounded by
    /// `request_timeout_secs`.
    async fn connection(&self, class: ChannelClass) -> SyncResult<mpsc::UnboundedSender<Command>> {
        let mut slot = self.connections.get(class).lock().await;
        if let Some(conn) = slot.as_ref() {
            if !conn.commands.is_closed() {
                return Ok(conn.commands.clone());
            }
            debug!(class = %class, connect_id = %conn.connect_id, "replacing dead connection");
        }
        *slot = None;

        let timeout = Duration::from_secs(self.config.request_timeout_secs);
        let endpoint = match tokio::time::timeout(timeout, self.negotiator.negotiate(class)).await {
            Ok(result) => result?,
            Err(_) => {
                self.negotiator.invalidate(class);
                return Err(SyncError::negotiation(
                    class,
                    format!("timed out after {timeout:?}"),
                ));
            }
        };

        info!(class = %class, connect_id = %endpoint.connect_id, "connecting to stream");
        let ws = match tokio::time::timeout(timeout, connect_async(endpoint.url.as_str())).await {
            Ok(Ok((ws, _response))) => ws,
            Ok(Err(e)) => {
                self.negotiator.invalidate(class);
                return Err(SyncError::ConnectionClosed(format!("connect failed: {e}")));
            }
            Err(_) => {
                self.negotiator.invalidate(class);
                return Err(SyncError::ConnectionClosed(format!(
                    "connect timed out after {timeout:?}"
                )));
            }
        };
        info!(class = %class, connect_id = %endpoint.connect_id, "stream connected");

        let (tx, rx) = mpsc::unbounded_channel();
        let dispatcher = Dispatcher::new(class, DispatchOptions::from(self.config.as_ref()));
        *slot = Some(Connection {
            connect_id: endpoint.connect_id.clone(),
            commands: tx.clone(),
        });
        tokio::spawn(run_connection(
            ws,
            endpoint,
            dispatcher,
            rx,
            Arc::clone(&self.snapshots),
            Arc::clone(&self.negotiator),
        ));
        Ok(tx)
    }

    fn check_symbol_count(&self, method: &str, symbols: &[String]) -> SyncResult<()> {
        let max = self.config.max_symbols_per_subscription;
        if symbols.len() > max {
            return Err(SyncError::BadArguments(format!(
                "{method} accepts a maximum of {max} symbols"
            )));
        }
        Ok(())
    }

    /// Apply `new_updates` slicing, then `since` and `limit`.
    fn slice<T>(
        &self,
        window: Window<T>,
        since: Option<i64>,
        limit: Option<usize>,
        timestamp: impl Fn(&T) -> Option<i64>,
    ) -> Vec<T> {
        let limit = if self.config.new_updates {
            Some(window.fresh_limit(limit))
        } else {
            limit
        };
        filter_by_since_limit(window.items, since, limit, timestamp)
    }
}

fn normalize(symbols: &[&str]) -> Vec<String> {
    symbols.iter().map(|s| market_id_to_symbol(s)).collect()
}

/// Keep entries at or after `since`, then the newest `limit` of them.
pub fn filter_by_since_limit<T>(
    items: Vec<T>,
    since: Option<i64>,
    limit: Option<usize>,
    timestamp: impl Fn(&T) -> Option<i64>,
) -> Vec<T> {
    let mut items: Vec<T> = match since {
        Some(since) => items
            .into_iter()
            .filter(|item| timestamp(item).is_some_and(|ts| ts >= since))
            .collect(),
        None => items,
    };
    if let Some(limit) = limit {
        if items.len() > limit {
            items.drain(..items.len() - limit);
        }
    }
    items
}

// ---------------------------------------------------------------------------
// Connection task
// ---------------------------------------------------------------------------

async fn run_connection(
    ws: WsStream,
    endpoint: Endpoint,
    mut dispatcher: Dispatcher,
    mut commands: mpsc::UnboundedReceiver<Command>,
    snapshots: Arc<dyn SnapshotSource>,
    negotiator: Arc<ConnectionNegotiator>,
) {
    let class = endpoint.class;
    let (mut write, mut read) = ws.split();
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<SnapshotDone>();

    let mut heartbeat = tokio::time::interval(endpoint.keep_alive);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    heartbeat.tick().await;
    let started = Instant::now();
    let pong_deadline = endpoint.keep_alive + endpoint.ping_timeout;

    let reason = 'conn: loop {
        let effects = tokio::select! {
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => dispatcher.handle_text(&text),
                Some(Ok(Message::Close(frame))) => break format!("closed by server: {frame:?}"),
                Some(Ok(_)) => continue,
                Some(Err(e)) => break format!("read error: {e}"),
                None => break "stream ended".to_string(),
            },
            command = commands.recv() => match command {
                Some(Command::Subscribe { request, waiter }) => dispatcher.subscribe(request, waiter),
                None => break "client dropped".to_string(),
            },
            Some(done) = done_rx.recv() => {
                dispatcher.handle_snapshot(&done.symbol, done.epoch, done.result)
            }
            _ = heartbeat.tick() => {
                let last = dispatcher.last_pong().unwrap_or(started);
                if last.elapsed() > pong_deadline {
                    break format!("no pong for {:?}", last.elapsed());
                }
                vec![Effect::Send(dispatcher.ping_frame())]
            }
        };

        for effect in effects {
            match effect {
                Effect::Send(frame) => {
                    if let Err(e) = write.send(Message::Text(frame)).await {
                        break 'conn format!("write error: {e}");
                    }
                }
                Effect::FetchSnapshot {
                    symbol,
                    limit,
                    epoch,
                } => {
                    let source = Arc::clone(&snapshots);
                    let done_tx = done_tx.clone();
                    tokio::spawn(async move {
                        let result = source
                            .fetch_snapshot(&symbol, limit)
                            .await
                            .map_err(|e| SyncError::Snapshot {
                                symbol: symbol.clone(),
                                reason: format!("{e:#}"),
                            });
                        let _ = done_tx.send(SnapshotDone {
                            symbol,
                            epoch,
                            result,
                        });
                    });
                }
                Effect::InvalidateEndpoint(class) => negotiator.invalidate(class),
            }
        }
    };

    warn!(class = %class, connect_id = %endpoint.connect_id, reason = %reason, "stream connection closed");
    dispatcher.fail_all(SyncError::ConnectionClosed(reason));
    negotiator.invalidate(class);
    let _ = write.close().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use tokio::net::TcpListener;

    use crate::negotiator::NegotiationResponse;

    struct LocalEndpoint(String);

    #[async_trait]
    impl EndpointSource for LocalEndpoint {
        async fn negotiate_endpoint(
            &self,
            _class: ChannelClass,
        ) -> Result<NegotiationResponse, SyncError> {
            Ok(NegotiationResponse {
                endpoint: self.0.clone(),
                token: "local".into(),
                ping_interval_ms: 30_000,
                ping_timeout_ms: 10_000,
            })
        }
    }

    /// Public negotiation succeeds; private negotiation never completes.
    struct StalledPrivate(String);

    #[async_trait]
    impl EndpointSource for StalledPrivate {
        async fn negotiate_endpoint(
            &self,
            class: ChannelClass,
        ) -> Result<NegotiationResponse, SyncError> {
            if class.is_private() {
                std::future::pending::<()>().await;
            }
            LocalEndpoint(self.0.clone()).negotiate_endpoint(class).await
        }
    }

    struct NoSnapshots;

    #[async_trait]
    impl SnapshotSource for NoSnapshots {
        async fn fetch_snapshot(
            &self,
            _symbol: &str,
            _limit: Option<usize>,
        ) -> anyhow::Result<OrderBookSnapshot> {
            anyhow::bail!("no snapshots in tests")
        }
    }

    fn client(url: String) -> SyncClient {
        SyncClient::new(
            SyncConfig::default(),
            Arc::new(LocalEndpoint(url)),
            Arc::new(NoSnapshots),
        )
    }

    const TRADE_PUSH: &str = r#"{"type":"message","topic":"/market/match:BTC-USDT","subject":"trade.l3match",
        "data":{"symbol":"BTC-USDT","side":"sell","size":"0.25","price":"9345",
        "time":"1580559434436443257","tradeId":"t-1"}}"#;

    /// Accepts one connection; acks every subscribe and answers it with
    /// `push` when given, or closes the socket when not.
    async fn serve_once(push: Option<&'static str>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            ws.send(Message::Text(json!({"id": "w1", "type": "welcome"}).to_string()))
                .await
                .unwrap();
            while let Some(Ok(msg)) = ws.next().await {
                let Message::Text(text) = msg else { continue };
                let frame: Value = serde_json::from_str(&text).unwrap();
                if frame["type"] != "subscribe" {
                    continue;
                }
                match push {
                    Some(push) => {
                        let ack = json!({"id": frame["id"], "type": "ack"});
                        ws.send(Message::Text(ack.to_string())).await.unwrap();
                        ws.send(Message::Text(push.to_string())).await.unwrap();
                    }
                    None => {
                        let _ = ws.close(None).await;
                        return;
                    }
                }
            }
        });
        format!("ws://{addr}/")
    }

    #[tokio::test]
    async fn watch_trades_over_local_stream() {
        let client = client(serve_once(Some(TRADE_PUSH)).await);
        let trades = client.watch_trades("BTC/USDT", None, None).await.unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].id, "t-1");
        assert_eq!(trades[0].symbol, "BTC/USDT");
        assert_eq!(trades[0].amount, Some(0.25));
    }

    #[tokio::test]
    async fn stalled_private_negotiation_does_not_block_public_watches() {
        let url = serve_once(Some(TRADE_PUSH)).await;
        let config = SyncConfig {
            request_timeout_secs: 1,
            ..SyncConfig::default()
        };
        let client = Arc::new(SyncClient::new(
            config,
            Arc::new(StalledPrivate(url)),
            Arc::new(NoSnapshots),
        ));

        let private = {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.watch_balance().await })
        };
        tokio::task::yield_now().await;

        let trades = tokio::time::timeout(
            Duration::from_millis(900),
            client.watch_trades("BTC/USDT", None, None),
        )
        .await
        .expect("public watch waited on the private connection")
        .unwrap();
        assert_eq!(trades.len(), 1);

        let err = private.await.unwrap().unwrap_err();
        assert!(
            matches!(err, SyncError::Negotiation { class: ChannelClass::Private, .. }),
            "{err:?}"
        );
    }

    #[tokio::test]
    async fn closed_connection_rejects_waiters() {
        let client = client(serve_once(None).await);
        let err = client.watch_ticker("BTC/USDT").await.unwrap_err();
        assert!(matches!(err, SyncError::ConnectionClosed(_)), "{err:?}");
    }

    #[tokio::test]
    async fn arguments_are_checked_before_connecting() {
        // Nothing listens here; a connect attempt would fail differently.
        let client = client("ws://127.0.0.1:9/".into());
        assert!(matches!(
            client.watch_order_book("BTC/USDT", Some(7)).await,
            Err(SyncError::BadArguments(_))
        ));
        assert!(matches!(
            client.watch_trades_for_symbols(&[], None, None).await,
            Err(SyncError::BadArguments(_))
        ));
        assert!(matches!(
            client.watch_ohlcv("BTC/USDT", "7m", None, None).await,
            Err(SyncError::BadArguments(_))
        ));

        let many: Vec<String> = (0..101).map(|i| format!("C{i}/USDT")).collect();
        let many: Vec<&str> = many.iter().map(String::as_str).collect();
        assert!(matches!(
            client.watch_bids_asks(&many).await,
            Err(SyncError::BadArguments(_))
        ));
    }

    #[test]
    fn since_and_limit_keep_the_newest() {
        let items = vec![1_i64, 2, 3, 4, 5];
        assert_eq!(filter_by_since_limit(items.clone(), Some(3), None, |v| Some(*v)), vec![3, 4, 5]);
        assert_eq!(filter_by_since_limit(items.clone(), None, Some(2), |v| Some(*v)), vec![4, 5]);
        assert_eq!(filter_by_since_limit(items, Some(2), Some(10), |v| Some(*v)), vec![2, 3, 4, 5]);
    }
}
