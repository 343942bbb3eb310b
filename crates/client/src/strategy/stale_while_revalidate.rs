use y7_sw_core::{CachedResponse, Request};

use super::{Served, StrategyContext};

/// Answer from the partition right away while refreshing it in the background.
///
/// The refresh is spawned before the lookup so both run concurrently. With a
/// stored entry the caller never waits on the network and a failed refresh is
/// only logged. Without one the caller waits for the refresh and gets the
/// offline response if it fails.
pub async fn stale_while_revalidate(ctx: &StrategyContext, partition: &str, request: &Request) -> Served {
    let refresh = tokio::spawn(revalidate(ctx.clone(), partition.to_string(), request.clone()));

    if let Some(stale) = ctx.lookup(partition, request).await {
        tracing::debug!(partition, %request, "serving stored entry, revalidating in background");
        return Served::cache(stale);
    }

    match refresh.await {
        Ok(Some(response)) => Served::network(response),
        Ok(None) => Served::offline(),
        Err(e) => {
            tracing::warn!(partition, %request, error = %e, "revalidation task aborted");
            Served::offline()
        }
    }
}

async fn revalidate(ctx: StrategyContext, partition: String, request: Request) -> Option<CachedResponse> {
    match ctx.fetch(&request).await {
        Ok(response) => {
            ctx.store(&partition, &request, &response).await;
            Some(response)
        }
        Err(e) => {
            tracing::debug!(partition, %request, error = %e, "background revalidation failed");
            None
        }
    }
}
