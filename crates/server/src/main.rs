//! y7-sw server entry point.
//!
//! Loads configuration, opens the cache, brings the worker up (install then
//! activate) and serves its tools over stdio.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;
use y7_sw_core::AppConfig;

mod handler;
mod host;
mod state;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(origin = %config.origin, db = %config.db_path.display(), "Starting y7-sw server on stdio transport");

    let worker = state::WorkerHandle::open(&config).await?;
    worker.boot().await;
    let cache = worker.router.cache().clone();

    let handler = handler::WorkerServer::new(worker);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;
    cache.close().await?;

    Ok(())
}
