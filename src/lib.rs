// =============================================================================
// Market Sync — KuCoin streaming market-data and account synchronisation
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
pub mod cache;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod multiplexer;
pub mod negotiator;
pub mod orderbook;
pub mod parsers;
pub mod protocol;
pub mod rest;
pub mod session;
pub mod types;

pub use config::SyncConfig;
pub use error::{SyncError, SyncResult};
pub use negotiator::{ConnectionNegotiator, Endpoint, EndpointSource, NegotiationResponse};
pub use orderbook::{OrderBookSnapshot, OrderBookState, SnapshotSource};
pub use rest::KucoinRest;
pub use session::SyncClient;
pub use types::{AccountBalances, Candle, ChannelClass, Order, OrderStatus, Ticker, Trade};
