// =============================================================================
// KuCoin payload translators — raw JSON into canonical shapes
// =============================================================================
//
// Numeric fields arrive either as JSON numbers or as decimal strings; both
// are accepted everywhere. Order-book levels are parsed into `Decimal` so
// price keys compare exactly.
// =============================================================================

use std::str::FromStr;

use anyhow::{bail, Context, Result};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::negotiator::NegotiationResponse;
use crate::orderbook::{DeltaMessage, FullBook, Level, OrderBookSnapshot};
use crate::types::{
    iso8601, BalanceEntry, Candle, Fee, Order, OrderStatus, Ticker, Trade,
};

// ---------------------------------------------------------------------------
// Markets and timeframes
// ---------------------------------------------------------------------------

/// `BTC-USDT` -> `BTC/USDT`.
pub fn market_id_to_symbol(market_id: &str) -> String {
    market_id.replacen('-', "/", 1)
}

/// `BTC/USDT` -> `BTC-USDT`.
pub fn symbol_to_market_id(symbol: &str) -> String {
    symbol.replacen('/', "-", 1)
}

/// Quote currency of a unified symbol.
pub fn quote_of(symbol: &str) -> Option<&str> {
    symbol.split_once('/').map(|(_, quote)| quote)
}

const TIMEFRAMES: &[(&str, &str)] = &[
    ("1m", "1min"),
    ("3m", "3min"),
    ("5m", "5min"),
    ("15m", "15min"),
    ("30m", "30min"),
    ("1h", "1hour"),
    ("2h", "2hour"),
    ("4h", "4hour"),
    ("6h", "6hour"),
    ("8h", "8hour"),
    ("12h", "12hour"),
    ("1d", "1day"),
    ("1w", "1week"),
    ("1M", "1month"),
];

/// `None` for timeframes the exchange does not stream.
pub fn timeframe_to_period(timeframe: &str) -> Option<&'static str> {
    TIMEFRAMES
        .iter()
        .find(|(tf, _)| *tf == timeframe)
        .map(|(_, period)| *period)
}

pub fn period_to_timeframe(period: &str) -> &str {
    TIMEFRAMES
        .iter()
        .find(|(_, p)| *p == period)
        .map_or(period, |(tf, _)| tf)
}

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

fn num(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Millisecond timestamp from a value that may be in ns, us, ms or s.
/// `None` when the seconds value does not fit in milliseconds.
fn millis(value: &Value) -> Option<i64> {
    match int(value)? {
        r if r >= 100_000_000_000_000_000 => Some(r / 1_000_000),
        r if r >= 100_000_000_000_000 => Some(r / 1000),
        r if r >= 100_000_000_000 => Some(r),
        r => r.checked_mul(1000),
    }
}

fn decimal(value: &Value) -> Result<Decimal> {
    match value {
        Value::String(s) => Decimal::from_str(s).with_context(|| format!("invalid decimal {s}")),
        Value::Number(n) => {
            Decimal::from_str(&n.to_string()).with_context(|| format!("invalid decimal {n}"))
        }
        other => bail!("expected decimal, got {other}"),
    }
}

/// `[[price, size(, sequence)], ...]`; zero-price entries only advance the
/// sequence and are skipped.
fn levels(value: &Value) -> Result<Vec<Level>> {
    let Some(rows) = value.as_array() else {
        return Ok(Vec::new());
    };
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let price = decimal(&row[0]).context("level price")?;
        let size = decimal(&row[1]).context("level size")?;
        if price.is_zero() {
            continue;
        }
        out.push((price, size));
    }
    Ok(out)
}

fn product(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    Some(a? * b?)
}

// ---------------------------------------------------------------------------
// Tickers
// ---------------------------------------------------------------------------

/// Parse either a `/market/snapshot` payload (the inner `data` object) or a
/// `/market/ticker` payload. `market_id` comes from the topic when the
/// payload itself carries no symbol.
pub fn parse_ticker(raw: &Value, market_id: Option<&str>) -> Result<Ticker> {
    let id = raw["symbol"]
        .as_str()
        .or(market_id)
        .context("ticker without market id")?;
    let timestamp = millis(&raw["datetime"]).or_else(|| millis(&raw["time"]));

    let last = num(&raw["lastTradedPrice"]).or_else(|| num(&raw["price"]));
    let change_rate = num(&raw["changeRate"]);

    Ok(Ticker {
        symbol: market_id_to_symbol(id),
        timestamp,
        datetime: timestamp.and_then(iso8601),
        high: num(&raw["high"]),
        low: num(&raw["low"]),
        bid: num(&raw["buy"]).or_else(|| num(&raw["bestBid"])),
        bid_volume: num(&raw["bestBidSize"]),
        ask: num(&raw["sell"]).or_else(|| num(&raw["bestAsk"])),
        ask_volume: num(&raw["bestAskSize"]),
        last,
        change: num(&raw["changePrice"]),
        percentage: change_rate.map(|r| r * 100.0),
        base_volume: num(&raw["vol"]),
        quote_volume: num(&raw["volValue"]),
    })
}

/// Level-1 best bid/ask push: `{asks: [p, s], bids: [p, s], timestamp}`.
pub fn parse_bid_ask(data: &Value, market_id: &str) -> Result<Ticker> {
    if !data.is_object() {
        bail!("level1 payload is not an object");
    }
    let timestamp = int(&data["timestamp"]);
    Ok(Ticker {
        symbol: market_id_to_symbol(market_id),
        timestamp,
        datetime: timestamp.and_then(iso8601),
        ask: num(&data["asks"][0]),
        ask_volume: num(&data["asks"][1]),
        bid: num(&data["bids"][0]),
        bid_volume: num(&data["bids"][1]),
        ..Ticker::default()
    })
}

// ---------------------------------------------------------------------------
// Trades
// ---------------------------------------------------------------------------

/// Public match from `/market/match`.
pub fn parse_trade(data: &Value) -> Result<Trade> {
    let id = string(&data["tradeId"]).context("trade missing tradeId")?;
    let market_id = data["symbol"].as_str().context("trade missing symbol")?;
    let price = num(&data["price"]);
    let amount = num(&data["size"]);
    let timestamp = millis(&data["time"]);

    Ok(Trade {
        id,
        order: string(&data["takerOrderId"]),
        symbol: market_id_to_symbol(market_id),
        timestamp,
        datetime: timestamp.and_then(iso8601),
        side: data["side"].as_str().map(str::to_lowercase),
        order_type: None,
        taker_or_maker: Some("taker".into()),
        price,
        amount,
        cost: product(price, amount),
        fee: None,
    })
}

/// Own fill from `/spot/tradeFills`.
pub fn parse_ws_trade(data: &Value) -> Result<Trade> {
    let id = string(&data["tradeId"]).context("fill missing tradeId")?;
    let market_id = data["symbol"].as_str().context("fill missing symbol")?;
    let symbol = market_id_to_symbol(market_id);
    let price = num(&data["price"]);
    let amount = num(&data["size"]);
    let timestamp = millis(&data["time"]);

    let fee_cost = num(&data["fee"]);
    let fee_rate = num(&data["feeRate"]);
    let fee = (fee_cost.is_some() || fee_rate.is_some()).then(|| Fee {
        cost: fee_cost,
        rate: fee_rate,
        currency: data["feeCurrency"]
            .as_str()
            .map(str::to_string)
            .or_else(|| quote_of(&symbol).map(str::to_string)),
    });

    Ok(Trade {
        id,
        order: string(&data["orderId"]),
        timestamp,
        datetime: timestamp.and_then(iso8601),
        side: data["side"].as_str().map(str::to_lowercase),
        order_type: data["orderType"].as_str().map(str::to_lowercase),
        taker_or_maker: data["liquidity"].as_str().map(str::to_lowercase),
        price,
        amount,
        cost: product(price, amount),
        fee,
        symbol,
    })
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

pub fn parse_order_status(raw: &str) -> OrderStatus {
    match raw {
        "open" | "match" | "update" => OrderStatus::Open,
        "filled" => OrderStatus::Closed,
        "canceled" | "cancel" => OrderStatus::Canceled,
        "TRIGGERED" | "triggered" => OrderStatus::Triggered,
        _ => OrderStatus::Unknown,
    }
}

/// Order push from `/spotMarket/tradeOrders` or `/spotMarket/advancedOrders`.
///
/// A trigger push with `triggerSuccess` present but not `true` is reported
/// as canceled.
pub fn parse_ws_order(data: &Value) -> Result<Order> {
    let id = string(&data["orderId"]).context("order missing orderId")?;
    let market_id = data["symbol"].as_str().context("order missing symbol")?;
    let mut status = data["type"]
        .as_str()
        .map_or(OrderStatus::Unknown, parse_order_status);

    let trigger_failed = !data["triggerSuccess"].is_null() && data["triggerSuccess"] != true;
    if status == OrderStatus::Triggered && trigger_failed {
        status = OrderStatus::Canceled;
    }

    let timestamp = millis(&data["orderTime"]).or_else(|| millis(&data["createdAt"]));
    let amount = num(&data["size"]);
    let filled = num(&data["filledSize"]);
    let remaining = num(&data["remainSize"]).or_else(|| Some(amount? - filled?));

    Ok(Order {
        id,
        client_order_id: string(&data["clientOid"]),
        symbol: market_id_to_symbol(market_id),
        timestamp,
        datetime: timestamp.and_then(iso8601),
        order_type: data["orderType"].as_str().map(str::to_lowercase),
        side: data["side"].as_str().map(str::to_lowercase),
        price: num(&data["price"]).or_else(|| num(&data["orderPrice"])),
        trigger_price: num(&data["stopPrice"]),
        amount,
        filled,
        remaining,
        status,
    })
}

// ---------------------------------------------------------------------------
// Candles
// ---------------------------------------------------------------------------

/// `[time(s), open, close, high, low, volume, turnover]`.
pub fn parse_ohlcv(candle: &Value) -> Result<Candle> {
    let field = |i: usize, name: &str| -> Result<f64> {
        num(&candle[i]).with_context(|| format!("candle missing {name}"))
    };
    let seconds = int(&candle[0]).context("candle missing open time")?;
    Ok(Candle {
        timestamp: seconds
            .checked_mul(1000)
            .with_context(|| format!("candle open time {seconds} out of range"))?,
        open: field(1, "open")?,
        close: field(2, "close")?,
        high: field(3, "high")?,
        low: field(4, "low")?,
        volume: field(5, "volume")?,
    })
}

// ---------------------------------------------------------------------------
// Balances
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct BalanceUpdate {
    /// Unified account type (`trade`, `main`, `margin`, ...).
    pub account_type: String,
    pub currency: String,
    pub entry: BalanceEntry,
    pub timestamp: Option<i64>,
}

/// Map the prefix of `relationEvent` onto a unified account type.
pub fn account_type_of(relation_event: Option<&str>) -> &'static str {
    let prefix = relation_event
        .and_then(|event| event.split('.').next())
        .unwrap_or_default();
    match prefix {
        "main" | "funding" => "main",
        "margin" | "cross" => "margin",
        "isolated" => "isolated",
        "trade_hf" | "hf" => "trade_hf",
        "contract" | "future" | "swap" => "contract",
        "pool" | "mining" => "pool",
        _ => "trade",
    }
}

pub fn parse_balance_update(data: &Value) -> Result<BalanceUpdate> {
    let currency = data["currency"]
        .as_str()
        .context("balance update missing currency")?
        .to_string();
    Ok(BalanceUpdate {
        account_type: account_type_of(data["relationEvent"].as_str()).to_string(),
        currency,
        entry: BalanceEntry {
            free: num(&data["available"]),
            used: num(&data["hold"]),
            total: num(&data["total"]),
        },
        timestamp: int(&data["time"]),
    })
}

// ---------------------------------------------------------------------------
// Order books
// ---------------------------------------------------------------------------

/// `trade.l2update` payload. The symbol falls back to the topic market id.
pub fn parse_delta(data: &Value, topic_market_id: Option<&str>) -> Result<DeltaMessage> {
    let sequence_start = int(&data["sequenceStart"]).context("delta missing sequenceStart")?;
    let sequence_end = int(&data["sequenceEnd"]).context("delta missing sequenceEnd")?;
    let market_id = data["symbol"]
        .as_str()
        .or(topic_market_id)
        .context("delta without market id")?;
    let changes = if data["changes"].is_object() {
        &data["changes"]
    } else {
        data
    };

    Ok(DeltaMessage {
        symbol: market_id_to_symbol(market_id),
        sequence_start,
        sequence_end,
        timestamp: int(&data["time"]).or_else(|| int(&data["timestamp"])),
        bids: levels(&changes["bids"]).context("delta bids")?,
        asks: levels(&changes["asks"]).context("delta asks")?,
    })
}

/// `level2` push from the depth-limited channels.
pub fn parse_full_replace(data: &Value) -> Result<FullBook> {
    if !data.is_object() {
        bail!("level2 payload is not an object");
    }
    Ok(FullBook {
        bids: levels(&data["bids"]).context("full book bids")?,
        asks: levels(&data["asks"]).context("full book asks")?,
        timestamp: int(&data["timestamp"]),
    })
}

/// REST `GET /api/v1/market/orderbook/level2_*` `data` object.
pub fn parse_order_book_snapshot(data: &Value) -> Result<OrderBookSnapshot> {
    Ok(OrderBookSnapshot {
        bids: levels(&data["bids"]).context("snapshot bids")?,
        asks: levels(&data["asks"]).context("snapshot asks")?,
        nonce: int(&data["sequence"]),
        timestamp: int(&data["time"]),
    })
}

/// REST `POST /api/v1/bullet-*` `data` object.
pub fn parse_bullet(data: &Value) -> Result<NegotiationResponse> {
    let token = data["token"]
        .as_str()
        .context("bullet response missing token")?
        .to_string();
    let server = &data["instanceServers"][0];
    let endpoint = server["endpoint"]
        .as_str()
        .context("bullet response missing instance server endpoint")?
        .to_string();
    Ok(NegotiationResponse {
        endpoint,
        token,
        ping_interval_ms: int(&server["pingInterval"]).unwrap_or(18_000).max(1) as u64,
        ping_timeout_ms: int(&server["pingTimeout"]).unwrap_or(10_000).max(0) as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn json(text: &str) -> Value {
        serde_json::from_str(text).unwrap()
    }

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn symbol_and_timeframe_mapping() {
        assert_eq!(market_id_to_symbol("BTC-USDT"), "BTC/USDT");
        assert_eq!(symbol_to_market_id("BTC/USDT"), "BTC-USDT");
        assert_eq!(quote_of("LTC/USDT"), Some("USDT"));
        assert_eq!(timeframe_to_period("1h"), Some("1hour"));
        assert_eq!(timeframe_to_period("7m"), None);
        assert_eq!(period_to_timeframe("1week"), "1w");
        assert_eq!(period_to_timeframe("7min"), "7min");
    }

    #[test]
    fn snapshot_ticker() {
        let raw = json(
            r#"{"trading":true,"symbol":"KCS-BTC","buy":0.00011,"sell":0.00012,
                "volValue":3.13851792584,"datetime":1548388122031,"high":0.00013,
                "vol":27514.34842,"low":0.0001,"changePrice":-1.0e-5,
                "changeRate":-0.0769,"lastTradedPrice":0.00012}"#,
        );
        let t = parse_ticker(&raw, None).unwrap();
        assert_eq!(t.symbol, "KCS/BTC");
        assert_eq!(t.timestamp, Some(1_548_388_122_031));
        assert_eq!(t.bid, Some(0.00011));
        assert_eq!(t.last, Some(0.00012));
        assert_eq!(t.base_volume, Some(27514.34842));
        assert!((t.percentage.unwrap() + 7.69).abs() < 1e-9);
    }

    #[test]
    fn stream_ticker_uses_topic_market() {
        let raw = json(
            r#"{"bestAsk":"62163","bestAskSize":"0.99011388","bestBid":"62162.9",
                "bestBidSize":"0.04794181","price":"62162.9","sequence":"1621383371852",
                "size":"0.00832274","time":1634641987564}"#,
        );
        let t = parse_ticker(&raw, Some("BTC-USDT")).unwrap();
        assert_eq!(t.symbol, "BTC/USDT");
        assert_eq!(t.ask, Some(62163.0));
        assert_eq!(t.bid_volume, Some(0.04794181));
        assert_eq!(t.datetime.as_deref(), Some("2021-10-19T11:13:07.564Z"));
    }

    #[test]
    fn bid_ask() {
        let data = json(
            r#"{"asks":["3347.42","2.0778387"],"bids":["3347.41","6.0411697"],"timestamp":1712231142085}"#,
        );
        let t = parse_bid_ask(&data, "ETH-USDT").unwrap();
        assert_eq!(t.symbol, "ETH/USDT");
        assert_eq!(t.ask, Some(3347.42));
        assert_eq!(t.bid_volume, Some(6.0411697));
    }

    #[test]
    fn public_trade_nanosecond_time() {
        let data = json(
            r#"{"sequence":"1568787654360","symbol":"BTC-USDT","side":"buy",
                "size":"0.5","price":"9345","takerOrderId":"5e356c4a9f1a790008f8d921",
                "time":"1580559434436443257","type":"match",
                "makerOrderId":"5e356bffedf0010008fa5d7f","tradeId":"5e356c4aeefabd62c62a1ece"}"#,
        );
        let t = parse_trade(&data).unwrap();
        assert_eq!(t.id, "5e356c4aeefabd62c62a1ece");
        assert_eq!(t.timestamp, Some(1_580_559_434_436));
        assert_eq!(t.cost, Some(4672.5));
        assert_eq!(t.side.as_deref(), Some("buy"));
    }

    #[test]
    fn own_fill_with_fee() {
        let data = json(
            r#"{"fee":0.00262148,"feeRate":0.001,"orderId":"62417436b29df8000183df2f",
                "orderType":"market","price":131.074,"side":"sell","size":0.02,
                "symbol":"LTC-USDT","time":"1648456758734571745","tradeId":"624174362e113d2f467b3043"}"#,
        );
        let t = parse_ws_trade(&data).unwrap();
        assert_eq!(t.symbol, "LTC/USDT");
        assert_eq!(t.order.as_deref(), Some("62417436b29df8000183df2f"));
        let fee = t.fee.unwrap();
        assert_eq!(fee.currency.as_deref(), Some("USDT"));
        assert_eq!(fee.rate, Some(0.001));
    }

    #[test]
    fn order_statuses() {
        let data = json(
            r#"{"symbol":"XCAD-USDT","orderType":"limit","side":"buy",
                "orderId":"6249167327218b000135e749","type":"filled",
                "orderTime":1648957043065280224,"size":"100.452","filledSize":"100.452",
                "price":"2.9635","clientOid":"buy-1","remainSize":"0","status":"done"}"#,
        );
        let o = parse_ws_order(&data).unwrap();
        assert_eq!(o.status, OrderStatus::Closed);
        assert_eq!(o.timestamp, Some(1_648_957_043_065));
        assert!(!o.is_trigger_order());

        let trigger = json(
            r#"{"createdAt":1692745706437,"orderId":"vs86","orderPrice":"0.26",
                "orderType":"stop","side":"sell","size":"5","stop":"loss",
                "stopPrice":"0.26","symbol":"ADA-USDT","triggerSuccess":false,"type":"TRIGGERED"}"#,
        );
        let o = parse_ws_order(&trigger).unwrap();
        assert!(o.is_trigger_order());
        assert_eq!(o.status, OrderStatus::Canceled);
        assert_eq!(o.price, Some(0.26));

        let ok = json(
            r#"{"orderId":"x","symbol":"ADA-USDT","stopPrice":"1","triggerSuccess":true,"type":"triggered"}"#,
        );
        assert_eq!(parse_ws_order(&ok).unwrap().status, OrderStatus::Triggered);
    }

    #[test]
    fn timestamps_in_any_unit_become_millis() {
        assert_eq!(millis(&json("1624881240")), Some(1_624_881_240_000));
        assert_eq!(millis(&json("1624881240123")), Some(1_624_881_240_123));
        assert_eq!(millis(&json("1624881240123456")), Some(1_624_881_240_123));
        assert_eq!(millis(&json(r#""1624881240123456789""#)), Some(1_624_881_240_123));
        assert_eq!(millis(&json(r#""-9223372036854775807""#)), None);
    }

    #[test]
    fn candle_open_time_out_of_range_is_an_error() {
        let raw = json(r#"["9223372036854775807","1","1","1","1","1","1"]"#);
        assert!(parse_ohlcv(&raw).is_err());
    }

    #[test]
    fn candle_field_order() {
        let raw = json(
            r#"["1624881240","34138.8","34121.6","34138.8","34097.9","3.06097133","104430.955068564"]"#,
        );
        let c = parse_ohlcv(&raw).unwrap();
        assert_eq!(c.timestamp, 1_624_881_240_000);
        assert_eq!(c.open, 34138.8);
        assert_eq!(c.close, 34121.6);
        assert_eq!(c.high, 34138.8);
        assert_eq!(c.low, 34097.9);
        assert!(parse_ohlcv(&json(r#"["1"]"#)).is_err());
    }

    #[test]
    fn balance_account_type() {
        let data = json(
            r#"{"accountId":"6217","available":"89","currency":"USDT","hold":"1",
                "relationEvent":"main.transfer","time":"1645716561816","total":"90"}"#,
        );
        let b = parse_balance_update(&data).unwrap();
        assert_eq!(b.account_type, "main");
        assert_eq!(b.entry.free, Some(89.0));
        assert_eq!(b.entry.used, Some(1.0));
        assert_eq!(b.timestamp, Some(1_645_716_561_816));
        assert_eq!(account_type_of(Some("trade.hold")), "trade");
        assert_eq!(account_type_of(None), "trade");
    }

    #[test]
    fn delta_payload() {
        let data = json(
            r#"{"sequenceStart":1545896669105,"sequenceEnd":1545896669106,"symbol":"BTC-USDT",
                "changes":{"asks":[["6","1","1545896669105"]],"bids":[["4","1","1545896669106"],["0","0","1545896669106"]]}}"#,
        );
        let delta = parse_delta(&data, None).unwrap();
        assert_eq!(delta.symbol, "BTC/USDT");
        assert_eq!(delta.sequence_end, 1_545_896_669_106);
        assert_eq!(delta.asks, vec![(d("6"), d("1"))]);
        assert_eq!(delta.bids, vec![(d("4"), d("1"))]);

        let malformed = json(r#"{"sequenceEnd":"x","symbol":"BTC-USDT"}"#);
        assert!(parse_delta(&malformed, None).is_err());
    }

    #[test]
    fn full_book_and_snapshot() {
        let data = json(
            r#"{"asks":[["42815.6","1.24016245"]],"bids":[["42815.5","0.08652716"]],"timestamp":1707204474018}"#,
        );
        let full = parse_full_replace(&data).unwrap();
        assert_eq!(full.bids, vec![(d("42815.5"), d("0.08652716"))]);
        assert_eq!(full.timestamp, Some(1_707_204_474_018));

        let snap = json(
            r#"{"sequence":"3262786978","time":1550653727731,"bids":[["6500.12","0.45054140"]],"asks":[["6500.16","0.57753524"]]}"#,
        );
        let snapshot = parse_order_book_snapshot(&snap).unwrap();
        assert_eq!(snapshot.nonce, Some(3_262_786_978));
        assert_eq!(snapshot.position(), Some(3_262_786_978));
    }

    #[test]
    fn bullet_response() {
        let data = json(
            r#"{"token":"abc","instanceServers":[{"endpoint":"wss://ws-api-spot.kucoin.com/",
                "encrypt":true,"protocol":"websocket","pingInterval":18000,"pingTimeout":10000}]}"#,
        );
        let resp = parse_bullet(&data).unwrap();
        assert_eq!(resp.endpoint, "wss://ws-api-spot.kucoin.com/");
        assert_eq!(resp.ping_interval_ms, 18_000);
        assert!(parse_bullet(&json(r#"{"token":"abc","instanceServers":[]}"#)).is_err());
    }
}
