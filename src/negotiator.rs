// =============================================================================
// Connection negotiator — one in-flight token exchange per channel class
// =============================================================================
//
// Stream endpoints are handed out by a REST call that returns a short-lived
// token. Concurrent callers for the same class join a single memoized
// future; a failure clears the memo (if nobody replaced it meanwhile) so the
// next caller starts over.
// =============================================================================

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::SyncError;
use crate::types::ChannelClass;

/// Raw outcome of the token exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegotiationResponse {
    pub endpoint: String,
    pub token: String,
    pub ping_interval_ms: u64,
    pub ping_timeout_ms: u64,
}

#[async_trait]
pub trait EndpointSource: Send + Sync {
    async fn negotiate_endpoint(&self, class: ChannelClass)
        -> Result<NegotiationResponse, SyncError>;
}

/// A connectable stream endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub class: ChannelClass,
    pub url: String,
    pub keep_alive: Duration,
    pub ping_timeout: Duration,
    pub connect_id: String,
}

impl Endpoint {
    /// `endpoint?token=…&privateChannel=…&connectId=…`
    pub fn from_response(
        class: ChannelClass,
        response: NegotiationResponse,
    ) -> Result<Self, SyncError> {
        let connect_id = format!("{}-{}", class, Uuid::new_v4().simple());
        let private = if class.is_private() { "true" } else { "false" };
        let url = reqwest::Url::parse_with_params(
            &response.endpoint,
            &[
                ("token", response.token.as_str()),
                ("privateChannel", private),
                ("connectId", connect_id.as_str()),
            ],
        )
        .map_err(|e| SyncError::negotiation(class, e))?;

        Ok(Self {
            class,
            url: url.into(),
            keep_alive: Duration::from_millis(response.ping_interval_ms.max(1)),
            ping_timeout: Duration::from_millis(response.ping_timeout_ms),
            connect_id,
        })
    }
}

type SharedEndpoint = Shared<BoxFuture<'static, Result<Endpoint, SyncError>>>;

struct Slot {
    generation: u64,
    future: SharedEndpoint,
}

pub struct ConnectionNegotiator {
    source: Arc<dyn EndpointSource>,
    slots: Mutex<HashMap<ChannelClass, Slot>>,
    generation: AtomicU64,
}

impl ConnectionNegotiator {
    pub fn new(source: Arc<dyn EndpointSource>) -> Self {
        Self {
            source,
            slots: Mutex::new(HashMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    pub async fn negotiate(&self, class: ChannelClass) -> Result<Endpoint, SyncError> {
        let (generation, future) = {
            let mut slots = self.slots.lock();
            match slots.get(&class) {
                Some(slot) => (slot.generation, slot.future.clone()),
                None => {
                    let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
                    let source = Arc::clone(&self.source);
                    let future = async move {
                        let response = source.negotiate_endpoint(class).await?;
                        Endpoint::from_response(class, response)
                    }
                    .boxed()
                    .shared();
                    slots.insert(
                        class,
                        Slot {
                            generation,
                            future: future.clone(),
                        },
                    );
                    debug!(class = %class, generation, "negotiating stream endpoint");
                    (generation, future)
                }
            }
        };

        let result = future.await;
        match &result {
            Ok(endpoint) => {
                debug!(class = %class, connect_id = %endpoint.connect_id, "endpoint ready");
            }
            Err(e) => {
                warn!(class = %class, error = %e, "endpoint negotiation failed");
                let mut slots = self.slots.lock();
                if slots.get(&class).map(|s| s.generation) == Some(generation) {
                    slots.remove(&class);
                }
            }
        }
        result
    }

    /// Drop the memo so the next caller negotiates a fresh token.
    pub fn invalidate(&self, class: ChannelClass) {
        if self.slots.lock().remove(&class).is_some() {
            info!(class = %class, "stream endpoint invalidated");
        }
    }

    pub fn is_memoized(&self, class: ChannelClass) -> bool {
        self.slots.lock().contains_key(&class)
    }
}
