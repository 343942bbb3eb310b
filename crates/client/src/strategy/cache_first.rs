use y7_sw_core::Request;

use super::{Served, StrategyContext};

/// Serve from the partition when possible; go to the network only on a miss.
///
/// A network failure on a miss yields the offline response.
pub async fn cache_first(ctx: &StrategyContext, partition: &str, request: &Request) -> Served {
    if let Some(hit) = ctx.lookup(partition, request).await {
        tracing::debug!(partition, %request, "cache hit");
        return Served::cache(hit);
    }

    match ctx.fetch(request).await {
        Ok(response) => {
            ctx.store(partition, request, &response).await;
            Served::network(response)
        }
        Err(e) => {
            tracing::debug!(partition, %request, error = %e, "cache miss and network failed");
            Served::offline()
        }
    }
}
