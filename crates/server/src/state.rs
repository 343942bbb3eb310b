//! Shared state handed to every tool.

use std::sync::Arc;

use y7_sw_client::{CacheRouter, FetchClient, FetchConfig, Network};
use y7_sw_core::{AppConfig, CacheDb, Error};

use crate::host::RecordingHost;

/// The running worker plus the handles tools need around it.
#[derive(Clone)]
pub struct WorkerHandle {
    pub router: Arc<CacheRouter>,
    pub host: Arc<RecordingHost>,
    /// Used directly for requests the worker does not intercept.
    pub network: Arc<dyn Network>,
}

impl WorkerHandle {
    /// Open the cache and build the worker from configuration.
    pub async fn open(config: &AppConfig) -> Result<Self, Error> {
        let cache = CacheDb::open(&config.db_path).await?;
        let network: Arc<dyn Network> = Arc::new(FetchClient::new(FetchConfig::from(config))?);
        Self::with_parts(config, cache, network)
    }

    pub fn with_parts(config: &AppConfig, cache: CacheDb, network: Arc<dyn Network>) -> Result<Self, Error> {
        let host = Arc::new(RecordingHost::new());
        let router = CacheRouter::from_app_config(config, cache, network.clone(), host.clone())?;
        Ok(Self { router: Arc::new(router), host, network })
    }

    /// Install then activate, the way a browser brings up a newly registered worker.
    ///
    /// An install failure is logged and leaves the worker unactivated; requests
    /// then go straight to the network.
    pub async fn boot(&self) {
        if let Err(e) = self.router.on_install().await {
            tracing::error!(error = %e, "worker install failed; serving without cache");
            return;
        }
        match self.router.on_activate().await {
            Ok(deleted) => tracing::info!(deleted = ?deleted, "worker activated"),
            Err(e) => tracing::error!(error = %e, "worker activation failed"),
        }
    }
}
