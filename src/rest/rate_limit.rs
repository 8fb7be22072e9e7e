// =============================================================================
// Rate-Limit Tracker — follows the gateway quota reported by KuCoin
// =============================================================================
//
// Every REST response carries the resource pool quota:
//   gw-ratelimit-limit      quota of the current window
//   gw-ratelimit-remaining  quota left in the window
//   gw-ratelimit-reset      milliseconds until the window resets
//
// The tracker keeps the latest values in atomics so any task can query them
// lock-free before issuing a request.
// =============================================================================

use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Below this share of the quota we start warning.
const WARN_RATIO: f64 = 0.2;

/// Thread-safe tracker backed by atomic counters.
pub struct RateLimitTracker {
    limit: AtomicU32,
    remaining: AtomicU32,
    /// Unix ms at which the current window resets; 0 when unknown.
    reset_at_ms: AtomicI64,
}

/// Immutable copy of the current quota state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitSnapshot {
    pub limit: u32,
    pub remaining: u32,
    pub reset_at_ms: i64,
}

fn header_value<T: std::str::FromStr>(headers: &reqwest::header::HeaderMap, name: &str) -> Option<T> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl RateLimitTracker {
    pub fn new() -> Self {
        Self {
            limit: AtomicU32::new(0),
            remaining: AtomicU32::new(u32::MAX),
            reset_at_ms: AtomicI64::new(0),
        }
    }

    // -------------------------------------------------------------------------
    // Header-based updates
    // -------------------------------------------------------------------------

    pub fn update_from_headers(&self, headers: &reqwest::header::HeaderMap) {
        self.update_at(headers, now_ms());
    }

    fn update_at(&self, headers: &reqwest::header::HeaderMap, now: i64) {
        if let Some(limit) = header_value::<u32>(headers, "gw-ratelimit-limit") {
            self.limit.store(limit, Ordering::Relaxed);
        }
        if let Some(reset) = header_value::<i64>(headers, "gw-ratelimit-reset") {
            self.reset_at_ms.store(now + reset, Ordering::Relaxed);
        }
        if let Some(remaining) = header_value::<u32>(headers, "gw-ratelimit-remaining") {
            let prev = self.remaining.swap(remaining, Ordering::Relaxed);
            let limit = self.limit.load(Ordering::Relaxed);
            let threshold = (f64::from(limit) * WARN_RATIO) as u32;
            if limit > 0 && remaining <= threshold && prev > threshold {
                warn!(remaining, limit, "rate-limit quota crossed warning threshold");
            }
            debug!(remaining, limit, "rate-limit quota updated from headers");
        }
    }

    /// The gateway answered 429; nothing is left until the reset.
    pub fn record_throttled(&self) {
        self.remaining.store(0, Ordering::Relaxed);
        warn!("request throttled by exchange gateway");
    }

    // -------------------------------------------------------------------------
    // Pre-flight checks
    // -------------------------------------------------------------------------

    /// `true` if `weight` more quota can be spent without hitting the limit.
    pub fn can_send_request(&self, weight: u32) -> bool {
        self.can_send_at(weight, now_ms())
    }

    fn can_send_at(&self, weight: u32, now: i64) -> bool {
        let reset_at = self.reset_at_ms.load(Ordering::Relaxed);
        if reset_at > 0 && now >= reset_at {
            return true;
        }
        let remaining = self.remaining.load(Ordering::Relaxed);
        let allowed = remaining >= weight;
        if !allowed {
            warn!(
                remaining,
                requested_weight = weight,
                reset_in_ms = reset_at - now,
                "request blocked — quota exhausted until reset"
            );
        }
        allowed
    }

    pub fn snapshot(&self) -> RateLimitSnapshot {
        RateLimitSnapshot {
            limit: self.limit.load(Ordering::Relaxed),
            remaining: self.remaining.load(Ordering::Relaxed),
            reset_at_ms: self.reset_at_ms.load(Ordering::Relaxed),
        }
    }
}

impl Default for RateLimitTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RateLimitTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snap = self.snapshot();
        f.debug_struct("RateLimitTracker")
            .field("limit", &snap.limit)
            .field("remaining", &snap.remaining)
            .field("reset_at_ms", &snap.reset_at_ms)
            .finish()
    }
}
