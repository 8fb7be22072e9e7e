// =============================================================================
// KuCoin REST Client — order-book snapshots and stream token negotiation
// =============================================================================
//
// Only public endpoints are called. Private stream tokens need a signed
// request; callers who have one plug their own `EndpointSource` in instead.
// Every response is checked for the `{"code": "200000", "data": ...}`
// envelope before the payload is handed to the translators.
// =============================================================================

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, instrument};

use super::rate_limit::RateLimitTracker;
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::negotiator::{EndpointSource, NegotiationResponse};
use crate::orderbook::{OrderBookSnapshot, SnapshotSource};
use crate::parsers::{parse_bullet, parse_order_book_snapshot, symbol_to_market_id};
use crate::types::ChannelClass;

/// Success code inside the response envelope.
const OK_CODE: &str = "200000";

/// REST depth for a subscribed limit; the exchange serves 20 or 100 levels.
pub fn snapshot_depth(limit: Option<usize>) -> usize {
    match limit {
        Some(limit) if limit <= 20 => 20,
        _ => 100,
    }
}

#[derive(Clone)]
pub struct KucoinRest {
    base_url: String,
    client: reqwest::Client,
    rate_limit: Arc<RateLimitTracker>,
}

impl KucoinRest {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    pub fn new(config: &SyncConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("failed to build reqwest client")?;

        debug!(base_url = %config.rest_base_url, "KucoinRest initialised");

        Ok(Self {
            base_url: config.rest_base_url.trim_end_matches('/').to_string(),
            client,
            rate_limit: Arc::new(RateLimitTracker::new()),
        })
    }

    pub fn rate_limit(&self) -> &RateLimitTracker {
        &self.rate_limit
    }

    // -------------------------------------------------------------------------
    // Public market data
    // -------------------------------------------------------------------------

    /// GET /api/v1/market/orderbook/level2_{20|100}
    #[instrument(skip(self), name = "kucoin::get_order_book")]
    pub async fn get_order_book(&self, symbol: &str, limit: Option<usize>) -> Result<OrderBookSnapshot> {
        let path = format!("/api/v1/market/orderbook/level2_{}", snapshot_depth(limit));
        let url = format!("{}{}?symbol={}", self.base_url, path, symbol_to_market_id(symbol));

        let data = self.send(self.client.get(&url), &path).await?;
        let snapshot = parse_order_book_snapshot(&data)?;

        debug!(
            symbol,
            nonce = ?snapshot.nonce,
            bids = snapshot.bids.len(),
            asks = snapshot.asks.len(),
            "order book snapshot fetched"
        );
        Ok(snapshot)
    }

    /// POST /api/v1/bullet-public
    #[instrument(skip(self), name = "kucoin::bullet_public")]
    pub async fn bullet_public(&self) -> Result<NegotiationResponse> {
        let path = "/api/v1/bullet-public";
        let url = format!("{}{}", self.base_url, path);

        let data = self.send(self.client.post(&url), path).await?;
        let response = parse_bullet(&data)?;

        debug!(
            endpoint = %response.endpoint,
            ping_interval_ms = response.ping_interval_ms,
            "public stream token issued"
        );
        Ok(response)
    }

    // -------------------------------------------------------------------------
    // Internal helpers
    // -------------------------------------------------------------------------

    /// Send, track quota, unwrap the envelope and return `data`.
    async fn send(&self, request: reqwest::RequestBuilder, path: &str) -> Result<serde_json::Value> {
        if !self.rate_limit.can_send_request(1) {
            anyhow::bail!(SyncError::RateLimited(path.to_string()));
        }

        let resp = request
            .send()
            .await
            .with_context(|| format!("{path} request failed"))?;

        self.rate_limit.update_from_headers(resp.headers());
        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            self.rate_limit.record_throttled();
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .with_context(|| format!("failed to parse {path} response"))?;

        if !status.is_success() {
            anyhow::bail!("KuCoin {} returned {}: {}", path, status, body);
        }
        let code = body["code"].as_str().unwrap_or_default();
        if code != OK_CODE {
            anyhow::bail!(
                "KuCoin {} rejected with code {}: {}",
                path,
                code,
                body["msg"].as_str().unwrap_or_default()
            );
        }

        Ok(body["data"].clone())
    }
}

impl std::fmt::Debug for KucoinRest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KucoinRest")
            .field("base_url", &self.base_url)
            .field("rate_limit", &self.rate_limit)
            .finish()
    }
}

#[async_trait]
impl SnapshotSource for KucoinRest {
    async fn fetch_snapshot(&self, symbol: &str, limit: Option<usize>) -> Result<OrderBookSnapshot> {
        self.get_order_book(symbol, limit).await
    }
}

#[async_trait]
impl EndpointSource for KucoinRest {
    async fn negotiate_endpoint(
        &self,
        class: ChannelClass,
    ) -> Result<NegotiationResponse, SyncError> {
        match class {
            ChannelClass::Public => self
                .bullet_public()
                .await
                .map_err(|e| SyncError::negotiation(class, format!("{e:#}"))),
            ChannelClass::Private => Err(SyncError::negotiation(
                class,
                "private stream tokens need a signed EndpointSource",
            )),
        }
    }
}
