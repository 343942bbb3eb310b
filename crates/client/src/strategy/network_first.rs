use y7_sw_core::Request;

use super::{Served, StrategyContext};

/// Prefer the network; on failure fall back to the stored entry, then to offline.
pub async fn network_first(ctx: &StrategyContext, partition: &str, request: &Request) -> Served {
    match ctx.fetch(request).await {
        Ok(response) => {
            ctx.store(partition, request, &response).await;
            Served::network(response)
        }
        Err(e) => {
            tracing::debug!(partition, %request, error = %e, "network failed, trying cache");
            match ctx.lookup(partition, request).await {
                Some(stale) => Served::cache(stale),
                None => Served::offline(),
            }
        }
    }
}
