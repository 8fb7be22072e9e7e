// =============================================================================
// Stream wire protocol — frame classification, topics and message hashes
// =============================================================================
//
// Every inbound text frame carries a `type`. Data pushes (`type: "message"`)
// are further routed by `subject`, except the all-markets ticker topic which
// reuses the market id as its subject.
// =============================================================================

use anyhow::{Context, Result};
use serde_json::{json, Map, Value};

use crate::parsers::symbol_to_market_id;

/// Ticker topic that covers every market at once.
pub const ALL_TICKERS_TOPIC: &str = "/market/ticker:all";

/// Error text the exchange sends when the negotiated token has lapsed.
pub const TOKEN_EXPIRED: &str = "token is expired";

/// One data push.
#[derive(Debug, Clone, PartialEq)]
pub struct Push {
    pub topic: String,
    pub subject: String,
    pub data: Value,
}

impl Push {
    /// The part of the topic after `:`, usually a market id list.
    pub fn topic_argument(&self) -> Option<&str> {
        self.topic.split_once(':').map(|(_, arg)| arg)
    }

    pub fn topic_channel(&self) -> &str {
        self.topic.split(':').next().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Welcome { id: Option<String> },
    Ack { id: String },
    Pong { id: Option<String> },
    Error {
        id: Option<String>,
        code: String,
        data: String,
    },
    Message(Push),
    Unknown(String),
}

/// What kind of state a push updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    BidAsk,
    FullBook,
    BookDelta,
    Ticker,
    Trade,
    Candle,
    Balance,
    MyTrade,
    Order,
    Unknown,
}

impl MessageKind {
    pub fn classify(topic: &str, subject: &str) -> Self {
        if topic == ALL_TICKERS_TOPIC {
            return Self::Ticker;
        }
        match subject {
            "level1" => Self::BidAsk,
            "level2" => Self::FullBook,
            "trade.l2update" => Self::BookDelta,
            "trade.ticker" | "trade.snapshot" => Self::Ticker,
            "trade.l3match" => Self::Trade,
            "trade.candles.update" => Self::Candle,
            "account.balance" => Self::Balance,
            "/spot/tradeFills" => Self::MyTrade,
            "orderChange" | "stopOrder" => Self::Order,
            _ => Self::Unknown,
        }
    }
}

/// Ids arrive as strings, but numbers are tolerated.
fn frame_id(root: &Value) -> Option<String> {
    match &root["id"] {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Classify a raw text frame.
pub fn parse_frame(text: &str) -> Result<Frame> {
    let root: Value = serde_json::from_str(text).context("failed to parse stream frame JSON")?;
    let kind = root["type"].as_str().context("frame missing field type")?;

    let frame = match kind {
        "welcome" => Frame::Welcome { id: frame_id(&root) },
        "ack" => Frame::Ack {
            id: frame_id(&root).context("ack frame missing id")?,
        },
        "pong" => Frame::Pong { id: frame_id(&root) },
        "error" => Frame::Error {
            id: frame_id(&root),
            code: text_of(&root["code"]),
            data: text_of(&root["data"]),
        },
        "message" => {
            let topic = root["topic"]
                .as_str()
                .context("message frame missing topic")?
                .to_string();
            let subject = root["subject"].as_str().unwrap_or_default().to_string();
            Frame::Message(Push {
                topic,
                subject,
                data: root["data"].clone(),
            })
        }
        other => Frame::Unknown(other.to_string()),
    };
    Ok(frame)
}

/// `{id, type: "subscribe", topic, response: true}` merged with `params`.
pub fn subscribe_frame(id: &str, topic: &str, params: &Map<String, Value>) -> String {
    let mut frame = Map::new();
    frame.insert("id".into(), Value::String(id.to_string()));
    frame.insert("type".into(), Value::String("subscribe".into()));
    frame.insert("topic".into(), Value::String(topic.to_string()));
    frame.insert("response".into(), Value::Bool(true));
    for (key, value) in params {
        frame.insert(key.clone(), value.clone());
    }
    Value::Object(frame).to_string()
}

pub fn ping_frame(id: &str) -> String {
    json!({ "id": id, "type": "ping" }).to_string()
}

/// Subscribe parameters for topics on the private connection.
pub fn private_params() -> Map<String, Value> {
    let mut params = Map::new();
    params.insert("privateChannel".into(), Value::Bool(true));
    params
}

// ---------------------------------------------------------------------------
// Message hashes
// ---------------------------------------------------------------------------

pub mod hash {
    pub const TICKERS: &str = "tickers";
    pub const TICKERS_PREFIX: &str = "tickers::";
    pub const ORDERS: &str = "orders";
    pub const TRIGGER_ORDERS: &str = "triggerOrders";
    pub const MY_TRADES: &str = "myTrades";
    pub const BALANCE: &str = "balance";

    pub fn ticker(symbol: &str) -> String {
        format!("ticker:{symbol}")
    }

    /// `tickers` for every market, `tickers::A,B` for a fixed list.
    pub fn tickers(symbols: Option<&[String]>) -> String {
        match symbols {
            Some(symbols) => format!("{TICKERS_PREFIX}{}", symbols.join(",")),
            None => TICKERS.to_string(),
        }
    }

    /// Symbols listed in a `tickers::A,B` hash.
    pub fn tickers_symbols(hash: &str) -> Vec<&str> {
        hash.strip_prefix(TICKERS_PREFIX)
            .map(|list| list.split(',').filter(|s| !s.is_empty()).collect())
            .unwrap_or_default()
    }

    pub fn bid_ask(symbol: &str) -> String {
        format!("bidask@{symbol}")
    }

    pub fn candles(symbol: &str, timeframe: &str) -> String {
        format!("candles:{symbol}:{timeframe}")
    }

    pub fn trades(symbol: &str) -> String {
        format!("trades:{symbol}")
    }

    pub fn order_book(symbol: &str) -> String {
        format!("orderbook:{symbol}")
    }

    pub fn scoped(base: &str, symbol: Option<&str>) -> String {
        match symbol {
            Some(symbol) => format!("{base}:{symbol}"),
            None => base.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Topics
// ---------------------------------------------------------------------------

pub mod topic {
    use super::symbol_to_market_id;

    pub const ORDER_BOOK_DELTAS: &str = "/market/level2";
    pub const TRADES: &str = "/market/match";
    pub const BID_ASK: &str = "/spotMarket/level1";
    pub const TICKERS: &str = "/market/ticker";
    pub const ORDERS: &str = "/spotMarket/tradeOrders";
    pub const TRIGGER_ORDERS: &str = "/spotMarket/advancedOrders";
    pub const MY_TRADES: &str = "/spot/tradeFills";
    pub const BALANCE: &str = "/account/balance";

    /// `channel:ID1,ID2` for unified symbols.
    pub fn batched(channel: &str, symbols: &[String]) -> String {
        let ids: Vec<String> = symbols.iter().map(|s| symbol_to_market_id(s)).collect();
        format!("{channel}:{}", ids.join(","))
    }

    /// One `channel:ID` per symbol, the unit tracked as live.
    pub fn per_symbol(channel: &str, symbols: &[String]) -> Vec<String> {
        symbols
            .iter()
            .map(|s| format!("{channel}:{}", symbol_to_market_id(s)))
            .collect()
    }

    /// Depth-limited full-book channel for limits 5 and 50.
    pub fn order_book_channel(default_method: &str, limit: Option<usize>) -> String {
        match limit {
            Some(depth @ (5 | 50)) => format!("/spotMarket/level2Depth{depth}"),
            _ => default_method.to_string(),
        }
    }

    pub fn candles(symbol: &str, period: &str) -> String {
        format!("/market/candles:{}_{period}", symbol_to_market_id(symbol))
    }
}
