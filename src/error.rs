// =============================================================================
// Sync errors — values a pending waiter can be rejected with
// =============================================================================
//
// Every variant is `Clone` so one failure can be fanned out to all callers
// waiting on the same message hash or the same negotiation future.
// I/O-facing code (REST, config, parsers) keeps using `anyhow` and converts
// at the boundary.
// =============================================================================

use thiserror::Error;

use crate::types::ChannelClass;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyncError {
    /// The stream connection went away before the waiter was resolved.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Endpoint negotiation (token exchange) failed.
    #[error("{class} endpoint negotiation failed: {reason}")]
    Negotiation { class: ChannelClass, reason: String },

    /// The exchange pushed an error frame referencing one of our requests.
    #[error("exchange error {code}: {message}")]
    Exchange { code: String, message: String },

    /// No order-book snapshot lined up with the buffered deltas.
    #[error("{symbol} order book snapshot is stale after {retries} attempts")]
    InvalidNonce { symbol: String, retries: usize },

    /// The snapshot fetch itself failed.
    #[error("{symbol} snapshot fetch failed: {reason}")]
    Snapshot { symbol: String, reason: String },

    /// Caller passed arguments the exchange cannot accept.
    #[error("bad arguments: {0}")]
    BadArguments(String),

    /// Local rate-limit guard refused the request.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// A waiter received a value of another kind than it asked for.
    #[error("unexpected {0} update")]
    UnexpectedUpdate(&'static str),

    /// The dispatch task for the connection is no longer running.
    #[error("dispatch loop stopped")]
    DispatchStopped,
}

impl SyncError {
    pub fn negotiation(class: ChannelClass, err: impl std::fmt::Display) -> Self {
        Self::Negotiation {
            class,
            reason: err.to_string(),
        }
    }
}

pub type SyncResult<T> = std::result::Result<T, SyncError>;
