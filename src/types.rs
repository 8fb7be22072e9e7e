// =============================================================================
// Canonical shapes produced by the translators and held by the caches
// =============================================================================

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat};
use serde::{Deserialize, Serialize};

/// Which negotiated connection a topic lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelClass {
    Public,
    Private,
}

impl ChannelClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }

    pub fn is_private(&self) -> bool {
        matches!(self, Self::Private)
    }
}

impl std::fmt::Display for ChannelClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Render a millisecond timestamp as ISO-8601 with millisecond precision.
pub fn iso8601(timestamp_ms: i64) -> Option<String> {
    DateTime::from_timestamp_millis(timestamp_ms)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// 24h statistics or best bid/ask for a single market.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    pub symbol: String,
    pub timestamp: Option<i64>,
    pub datetime: Option<String>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub bid: Option<f64>,
    pub bid_volume: Option<f64>,
    pub ask: Option<f64>,
    pub ask_volume: Option<f64>,
    pub last: Option<f64>,
    pub change: Option<f64>,
    pub percentage: Option<f64>,
    pub base_volume: Option<f64>,
    pub quote_volume: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fee {
    pub cost: Option<f64>,
    pub rate: Option<f64>,
    pub currency: Option<String>,
}

/// A public match or one of our own fills.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: String,
    pub order: Option<String>,
    pub symbol: String,
    pub timestamp: Option<i64>,
    pub datetime: Option<String>,
    pub side: Option<String>,
    pub order_type: Option<String>,
    pub taker_or_maker: Option<String>,
    pub price: Option<f64>,
    pub amount: Option<f64>,
    pub cost: Option<f64>,
    pub fee: Option<Fee>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Open,
    Closed,
    Canceled,
    Triggered,
    Unknown,
}

impl Default for OrderStatus {
    fn default() -> Self {
        Self::Unknown
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Canceled => "canceled",
            Self::Triggered => "triggered",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub client_order_id: Option<String>,
    pub symbol: String,
    pub timestamp: Option<i64>,
    pub datetime: Option<String>,
    pub order_type: Option<String>,
    pub side: Option<String>,
    pub price: Option<f64>,
    pub trigger_price: Option<f64>,
    pub amount: Option<f64>,
    pub filled: Option<f64>,
    pub remaining: Option<f64>,
    pub status: OrderStatus,
}

impl Order {
    pub fn is_trigger_order(&self) -> bool {
        self.trigger_price.is_some()
    }
}

/// One OHLCV candle; `timestamp` is the bucket open time in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Balance of a single currency inside an account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BalanceEntry {
    pub free: Option<f64>,
    pub used: Option<f64>,
    pub total: Option<f64>,
}

/// Balances of one account type (trade, main, margin, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountBalances {
    pub timestamp: Option<i64>,
    pub datetime: Option<String>,
    pub currencies: BTreeMap<String, BalanceEntry>,
}
