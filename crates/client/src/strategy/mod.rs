//! The three caching strategies.
//!
//! Every strategy takes a request and the name of the partition it owns and
//! always produces a response: the stored entry, the network response, or the
//! synthetic 503 "Offline". Storage is best-effort. A failed lookup counts as
//! a miss and a failed write is logged and dropped, so the cache can never
//! turn a good network response into an error.

mod cache_first;
mod network_first;
mod stale_while_revalidate;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use y7_sw_core::{CacheDb, CachedResponse, Error, Request, Strategy};

use crate::fetch::Network;

pub use cache_first::cache_first;
pub use network_first::network_first;
pub use stale_while_revalidate::stale_while_revalidate;

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Cache,
    Network,
    Offline,
}

/// A response together with its provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Served {
    pub response: CachedResponse,
    pub source: ResponseSource,
}

impl Served {
    pub fn cache(response: CachedResponse) -> Self {
        Self { response, source: ResponseSource::Cache }
    }

    pub fn network(response: CachedResponse) -> Self {
        Self { response, source: ResponseSource::Network }
    }

    pub fn offline() -> Self {
        Self { response: CachedResponse::offline(), source: ResponseSource::Offline }
    }
}

/// Shared handles every strategy works with.
#[derive(Clone)]
pub struct StrategyContext {
    cache: CacheDb,
    network: Arc<dyn Network>,
}

impl StrategyContext {
    pub fn new(cache: CacheDb, network: Arc<dyn Network>) -> Self {
        Self { cache, network }
    }

    pub fn cache(&self) -> &CacheDb {
        &self.cache
    }

    pub fn network(&self) -> &Arc<dyn Network> {
        &self.network
    }

    /// Stored entry for the request; storage errors are reported as a miss.
    pub(crate) async fn lookup(&self, partition: &str, request: &Request) -> Option<CachedResponse> {
        match self.cache.match_entry(partition, request).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(partition, %request, error = %e, "cache lookup failed, treating as miss");
                None
            }
        }
    }

    /// Persist a complete response. Anything but a 200 is skipped.
    pub(crate) async fn store(&self, partition: &str, request: &Request, response: &CachedResponse) {
        if !response.is_complete() {
            tracing::debug!(partition, %request, status = response.status, "not storing incomplete response");
            return;
        }
        if let Err(e) = self.cache.put_entry(partition, request, response).await {
            tracing::warn!(partition, %request, error = %e, "cache write failed");
        }
    }

    pub(crate) async fn fetch(&self, request: &Request) -> Result<CachedResponse, Error> {
        self.network.fetch(request).await
    }
}

/// Run `strategy` for a request against `partition`.
pub async fn execute(strategy: Strategy, ctx: &StrategyContext, partition: &str, request: &Request) -> Served {
    match strategy {
        Strategy::CacheFirst => cache_first(ctx, partition, request).await,
        Strategy::NetworkFirst => network_first(ctx, partition, request).await,
        Strategy::StaleWhileRevalidate => stale_while_revalidate(ctx, partition, request).await,
    }
}
