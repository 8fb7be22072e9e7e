// =============================================================================
// Sync Configuration — limits, resync tuning and persisted settings
// =============================================================================
//
// Persistence uses an atomic tmp + rename pattern to prevent corruption on
// crash. All fields carry serde defaults so that adding new fields never
// breaks loading an older config file.
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_true() -> bool {
    true
}

fn default_rest_base_url() -> String {
    "https://api.kucoin.com".to_string()
}

fn default_symbols() -> Vec<String> {
    vec!["BTC/USDT".to_string(), "ETH/USDT".to_string()]
}

fn default_cache_limit() -> usize {
    1000
}

fn default_snapshot_delay() -> usize {
    5
}

fn default_snapshot_max_retries() -> usize {
    3
}

fn default_order_book_method() -> String {
    "/market/level2".to_string()
}

fn default_ticker_method() -> String {
    "/market/snapshot".to_string()
}

fn default_balance_account_type() -> String {
    "trade".to_string()
}

fn default_max_symbols_per_subscription() -> usize {
    100
}

fn default_request_timeout_secs() -> u64 {
    10
}

// =============================================================================
// SyncConfig
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// REST host used for snapshots and token negotiation.
    #[serde(default = "default_rest_base_url")]
    pub rest_base_url: String,

    /// Unified symbols (`BTC/USDT`) the binary watches.
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,

    // --- Cache capacities ---------------------------------------------------
    #[serde(default = "default_cache_limit")]
    pub trades_limit: usize,
    #[serde(default = "default_cache_limit")]
    pub ohlcv_limit: usize,
    #[serde(default = "default_cache_limit")]
    pub orders_limit: usize,

    // --- Order-book resync --------------------------------------------------
    /// Deltas buffered before the REST snapshot is requested.
    #[serde(default = "default_snapshot_delay")]
    pub snapshot_delay: usize,
    /// Snapshot attempts before waiters are rejected.
    #[serde(default = "default_snapshot_max_retries")]
    pub snapshot_max_retries: usize,
    /// Delta channel; limits 5 and 50 always use the depth channels.
    #[serde(default = "default_order_book_method")]
    pub order_book_method: String,

    /// `/market/snapshot` (2s stats) or `/market/ticker` (every trade).
    #[serde(default = "default_ticker_method")]
    pub ticker_method: String,

    /// Account type whose balance updates resolve `watch_balance`.
    #[serde(default = "default_balance_account_type")]
    pub balance_account_type: String,

    /// Hand callers only what arrived since their previous read.
    #[serde(default = "default_true")]
    pub new_updates: bool,

    #[serde(default = "default_max_symbols_per_subscription")]
    pub max_symbols_per_subscription: usize,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            rest_base_url: default_rest_base_url(),
            symbols: default_symbols(),
            trades_limit: default_cache_limit(),
            ohlcv_limit: default_cache_limit(),
            orders_limit: default_cache_limit(),
            snapshot_delay: default_snapshot_delay(),
            snapshot_max_retries: default_snapshot_max_retries(),
            order_book_method: default_order_book_method(),
            ticker_method: default_ticker_method(),
            balance_account_type: default_balance_account_type(),
            new_updates: true,
            max_symbols_per_subscription: default_max_symbols_per_subscription(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl SyncConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// A missing file is an error so the caller can fall back to defaults
    /// with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read sync config from {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse sync config from {}", path.display()))?;

        info!(
            path = %path.display(),
            symbols = ?config.symbols,
            order_book_method = %config.order_book_method,
            "sync config loaded"
        );
        Ok(config)
    }

    /// Persist to `path` via a `.tmp` sibling and rename.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content =
            serde_json::to_string_pretty(self).context("failed to serialise sync config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "sync config saved (atomic)");
        Ok(())
    }

    /// Override the symbol list from a comma-separated value such as
    /// `BTC/USDT,ETH-USDT`. Market ids are accepted too.
    pub fn apply_symbols_override(&mut self, raw: &str) {
        let symbols: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.replacen('-', "/", 1).to_uppercase())
            .collect();
        if !symbols.is_empty() {
            self.symbols = symbols;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
