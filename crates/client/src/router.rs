//! The caching worker: lifecycle events and request dispatch.
//!
//! A [`CacheRouter`] is built from configuration, then driven by its host:
//!
//! 1. `on_install` pre-caches the critical shell into the primary partition
//!    (all or nothing) and asks the host to skip waiting.
//! 2. `on_activate` deletes every partition that is not one of the three
//!    current names and claims open pages.
//! 3. `on_fetch` routes each GET through the route table and runs the
//!    matching strategy.
//!
//! Requests arriving before activation completes are not intercepted.

use std::sync::Arc;

use futures_util::future::try_join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use url::Url;
use y7_sw_core::{
    AppConfig, CacheDb, CachedResponse, Error, PartitionRole, Request, ResourceClass, RouteTable, Strategy,
    WorkerConfig,
};

use crate::fetch::resolve;
use crate::host::{BACKGROUND_SYNC_TAG, Host, Notification, PushPayload};
use crate::strategy::{ResponseSource, StrategyContext, execute};

/// Worker lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    /// Install failed; the host keeps its previous worker.
    Redundant,
}

/// Result of an intercepted fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routed {
    pub class: ResourceClass,
    pub strategy: Strategy,
    pub partition: String,
    pub source: ResponseSource,
    pub response: CachedResponse,
}

pub struct CacheRouter {
    config: WorkerConfig,
    origin: Url,
    routes: RouteTable,
    ctx: StrategyContext,
    host: Arc<dyn Host>,
    state: RwLock<WorkerState>,
}

impl CacheRouter {
    pub fn new(
        config: WorkerConfig, origin: Url, ctx: StrategyContext, host: Arc<dyn Host>,
    ) -> Result<Self, Error> {
        let routes = RouteTable::from_config(&config, &origin)?;
        Ok(Self { config, origin, routes, ctx, host, state: RwLock::new(WorkerState::Parsed) })
    }

    /// Build a router from the application config.
    pub fn from_app_config(
        app: &AppConfig, cache: CacheDb, network: Arc<dyn crate::Network>, host: Arc<dyn Host>,
    ) -> Result<Self, Error> {
        let origin = Url::parse(&app.origin).map_err(|e| Error::InvalidUrl(format!("{}: {e}", app.origin)))?;
        Self::new(app.worker.clone(), origin, StrategyContext::new(cache, network), host)
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn cache(&self) -> &CacheDb {
        self.ctx.cache()
    }

    /// Name of the partition backing a role.
    pub fn partition_name(&self, role: PartitionRole) -> &str {
        self.config.partitions.name(role)
    }

    /// Resolve a path or URL against the worker origin.
    pub fn resolve(&self, target: &str) -> Result<Url, Error> {
        resolve(target, &self.origin).map_err(|e| Error::InvalidUrl(e.to_string()))
    }

    async fn set_state(&self, state: WorkerState) {
        *self.state.write().await = state;
        tracing::info!(?state, "worker state changed");
    }

    /// Pre-cache the critical shell and request immediate activation.
    ///
    /// On an already activated worker this only refreshes the shell; the
    /// worker keeps serving whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns `Error::InstallFailed` if any shell resource cannot be fetched
    /// with a 200 or the batch cannot be stored. Nothing is written then and
    /// a worker that was not yet active becomes `Redundant`.
    pub async fn on_install(&self) -> Result<(), Error> {
        let serving = self.state().await == WorkerState::Activated;
        if !serving {
            self.set_state(WorkerState::Installing).await;
        }

        if let Err(e) = self.precache_shell().await {
            tracing::error!(error = %e, serving, "install failed");
            if !serving {
                self.set_state(WorkerState::Redundant).await;
            }
            return Err(e);
        }

        if !serving {
            self.set_state(WorkerState::Installed).await;
        }
        self.host.skip_waiting().await
    }

    async fn precache_shell(&self) -> Result<(), Error> {
        let partition = self.partition_name(PartitionRole::Primary).to_string();
        let cache = self.ctx.cache();
        cache.open_partition(&partition).await.map_err(install_failed)?;

        let requests = self
            .config
            .critical_shell_resources
            .iter()
            .map(|path| self.resolve(path).map(Request::get))
            .collect::<Result<Vec<_>, _>>()
            .map_err(install_failed)?;

        let fetches = requests.into_iter().map(|request| async move {
            let response = self
                .ctx
                .network()
                .fetch(&request)
                .await
                .map_err(|e| Error::InstallFailed(format!("{request}: {e}")))?;
            if !response.is_complete() {
                return Err(Error::InstallFailed(format!("{request}: status {}", response.status)));
            }
            Ok((request, response))
        });
        let items = try_join_all(fetches).await?;

        cache.put_entries(&partition, &items).await.map_err(install_failed)?;
        tracing::info!(partition = %partition, resources = items.len(), "critical shell cached");
        Ok(())
    }

    /// Delete stale partitions and take control of open pages.
    ///
    /// Returns the names of the deleted partitions. An active worker stays
    /// active while this runs again.
    pub async fn on_activate(&self) -> Result<Vec<String>, Error> {
        let state = self.state().await;
        if !matches!(state, WorkerState::Installed | WorkerState::Activated) {
            return Err(Error::WorkerState(format!("cannot activate from {state:?}")));
        }
        if state == WorkerState::Installed {
            self.set_state(WorkerState::Activating).await;
        }

        let (pruned, claimed) = tokio::join!(self.prune_partitions(), self.host.claim_clients());
        let deleted = match (pruned, claimed) {
            (Ok(deleted), Ok(())) => deleted,
            (Err(e), _) | (_, Err(e)) => {
                self.set_state(state).await;
                return Err(e);
            }
        };

        self.set_state(WorkerState::Activated).await;
        Ok(deleted)
    }

    async fn prune_partitions(&self) -> Result<Vec<String>, Error> {
        let cache = self.ctx.cache();
        let stale: Vec<String> = cache
            .partition_names()
            .await?
            .into_iter()
            .filter(|name| !self.config.partitions.contains(name))
            .collect();

        try_join_all(stale.iter().map(|name| async move {
            cache.delete_partition(name).await?;
            tracing::info!(partition = %name, "deleted stale partition");
            Ok::<_, Error>(())
        }))
        .await?;

        Ok(stale)
    }

    /// Route a request and answer it.
    ///
    /// Returns `None` when the request is not intercepted (not a GET, or the
    /// worker is not active yet); the host then goes to the network itself.
    pub async fn on_fetch(&self, request: &Request) -> Option<Routed> {
        if self.state().await != WorkerState::Activated {
            tracing::debug!(%request, "worker not active, not intercepting");
            return None;
        }

        let route = self.routes.route(request)?;
        let partition = self.partition_name(route.partition).to_string();
        tracing::debug!(%request, class = %route.class, strategy = ?route.strategy, partition = %partition, "routed");

        let served = execute(route.strategy, &self.ctx, &partition, request).await;
        Some(Routed {
            class: route.class,
            strategy: route.strategy,
            partition,
            source: served.source,
            response: served.response,
        })
    }

    /// Show a notification built from a push message.
    pub async fn on_push(&self, data: &[u8]) -> Result<Notification, Error> {
        let notification = Notification::from_payload(PushPayload::from_bytes(data), &self.config.notification);
        self.host.show_notification(notification.clone()).await?;
        Ok(notification)
    }

    /// Focus or open the site root.
    pub async fn on_notification_click(&self) -> Result<Url, Error> {
        let root = self.resolve("/")?;
        self.host.open_window(&root).await?;
        Ok(root)
    }

    /// Handle a sync event. Returns whether the tag was recognised.
    pub async fn on_sync(&self, tag: &str) -> Result<bool, Error> {
        if tag != BACKGROUND_SYNC_TAG {
            tracing::debug!(tag, "ignoring unknown sync tag");
            return Ok(false);
        }
        self.host.run_deferred_work().await?;
        Ok(true)
    }
}

fn install_failed(err: Error) -> Error {
    match err {
        Error::InstallFailed(_) => err,
        other => Error::InstallFailed(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::strategy::testing::{Reply, ScriptedNetwork};

    #[derive(Default)]
    struct RecordingHost {
        events: Mutex<Vec<String>>,
    }

    impl RecordingHost {
        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }

        fn push(&self, event: String) {
            self.events.lock().unwrap().push(event);
        }
    }

    #[async_trait]
    impl Host for RecordingHost {
        async fn skip_waiting(&self) -> Result<(), Error> {
            self.push("skip_waiting".into());
            Ok(())
        }

        async fn claim_clients(&self) -> Result<(), Error> {
            self.push("claim_clients".into());
            Ok(())
        }

        async fn show_notification(&self, notification: Notification) -> Result<(), Error> {
            self.push(format!("notify:{}", notification.title));
            Ok(())
        }

        async fn open_window(&self, url: &Url) -> Result<(), Error> {
            self.push(format!("open:{url}"));
            Ok(())
        }

        async fn run_deferred_work(&self) -> Result<(), Error> {
            self.push("deferred".into());
            Ok(())
        }
    }

    const ORIGIN: &str = "https://y7sauces.com";

    struct Fixture {
        router: CacheRouter,
        net: Arc<ScriptedNetwork>,
        host: Arc<RecordingHost>,
    }

    async fn fixture() -> Fixture {
        let config = WorkerConfig {
            critical_shell_resources: vec!["/".into(), "/manifest.json".into()],
            ..Default::default()
        };
        let db = CacheDb::open_in_memory().await.unwrap();
        let net = Arc::new(ScriptedNetwork::new());
        let host = Arc::new(RecordingHost::default());
        let router = CacheRouter::new(
            config,
            Url::parse(ORIGIN).unwrap(),
            StrategyContext::new(db, net.clone()),
            host.clone(),
        )
        .unwrap();
        Fixture { router, net, host }
    }

    fn shell_online(net: &ScriptedNetwork) {
        net.respond("https://y7sauces.com/", 200, "<html>shell</html>");
        net.respond("https://y7sauces.com/manifest.json", 200, "{}");
    }

    async fn activated() -> Fixture {
        let f = fixture().await;
        shell_online(&f.net);
        f.router.on_install().await.unwrap();
        f.router.on_activate().await.unwrap();
        f
    }

    fn get(path: &str) -> Request {
        Request::get(Url::parse(ORIGIN).unwrap().join(path).unwrap())
    }

    #[tokio::test]
    async fn test_install_precaches_shell() {
        let f = fixture().await;
        shell_online(&f.net);

        f.router.on_install().await.unwrap();

        assert_eq!(f.router.state().await, WorkerState::Installed);
        assert_eq!(f.router.cache().entry_count("y7-sauces-v1").await.unwrap(), 2);
        assert_eq!(f.host.events(), vec!["skip_waiting".to_string()]);
    }

    #[tokio::test]
    async fn test_install_is_all_or_nothing() {
        let f = fixture().await;
        f.net.respond("https://y7sauces.com/", 200, "<html>shell</html>");

        let result = f.router.on_install().await;

        assert!(matches!(result, Err(Error::InstallFailed(_))));
        assert_eq!(f.router.state().await, WorkerState::Redundant);
        assert_eq!(f.router.cache().entry_count("y7-sauces-v1").await.unwrap(), 0);
        assert!(f.host.events().is_empty());
    }

    #[tokio::test]
    async fn test_install_rejects_partial_content() {
        let f = fixture().await;
        f.net.respond("https://y7sauces.com/", 200, "<html>shell</html>");
        f.net.respond("https://y7sauces.com/manifest.json", 206, "{");

        assert!(f.router.on_install().await.is_err());
        assert_eq!(f.router.cache().entry_count("y7-sauces-v1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_repeated_install_is_idempotent() {
        let f = fixture().await;
        shell_online(&f.net);

        f.router.on_install().await.unwrap();
        f.router.on_install().await.unwrap();

        let keys = f.router.cache().entry_keys("y7-sauces-v1").await.unwrap();
        let urls: Vec<_> = keys.into_iter().map(|(_, url)| url).collect();
        assert_eq!(urls, vec!["https://y7sauces.com/".to_string(), "https://y7sauces.com/manifest.json".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_reinstall_keeps_serving() {
        let f = activated().await;
        f.net.reply("https://y7sauces.com/manifest.json", Reply::Fail);

        let result = f.router.on_install().await;

        assert!(matches!(result, Err(Error::InstallFailed(_))));
        assert_eq!(f.router.state().await, WorkerState::Activated);
        let routed = f.router.on_fetch(&get("/manifest.json")).await.unwrap();
        assert_eq!(routed.source, ResponseSource::Cache);
        assert_eq!(routed.response.body_text(), "{}");
    }

    #[tokio::test]
    async fn test_reinstall_refreshes_shell_while_serving() {
        let f = activated().await;
        f.net.respond("https://y7sauces.com/manifest.json", 200, r#"{"v":2}"#);

        f.router.on_install().await.unwrap();

        assert_eq!(f.router.state().await, WorkerState::Activated);
        let routed = f.router.on_fetch(&get("/manifest.json")).await.unwrap();
        assert_eq!(routed.source, ResponseSource::Cache);
        assert_eq!(routed.response.body_text(), r#"{"v":2}"#);
    }

    #[tokio::test]
    async fn test_reactivate_keeps_serving() {
        let f = activated().await;
        f.router.cache().open_partition("old-cache-v0").await.unwrap();

        let deleted = f.router.on_activate().await.unwrap();

        assert_eq!(deleted, vec!["old-cache-v0".to_string()]);
        assert_eq!(f.router.state().await, WorkerState::Activated);
        assert!(f.router.on_fetch(&get("/")).await.is_some());
    }

    #[tokio::test]
    async fn test_activate_prunes_only_stale_partitions() {
        let f = fixture().await;
        shell_online(&f.net);
        let cache = f.router.cache();
        for name in ["y7-static-v1", "y7-dynamic-v1", "old-cache-v0"] {
            cache.open_partition(name).await.unwrap();
        }
        f.router.on_install().await.unwrap();

        let deleted = f.router.on_activate().await.unwrap();

        assert_eq!(deleted, vec!["old-cache-v0".to_string()]);
        let mut remaining = cache.partition_names().await.unwrap();
        remaining.sort();
        assert_eq!(remaining, vec!["y7-dynamic-v1", "y7-sauces-v1", "y7-static-v1"]);
        assert_eq!(f.router.state().await, WorkerState::Activated);
        assert!(f.host.events().contains(&"claim_clients".to_string()));
    }

    #[tokio::test]
    async fn test_activate_requires_install() {
        let f = fixture().await;
        let result = f.router.on_activate().await;
        assert!(matches!(result, Err(Error::WorkerState(_))));
    }

    #[tokio::test]
    async fn test_fetch_not_intercepted_before_activation() {
        let f = fixture().await;
        assert!(f.router.on_fetch(&get("/api/v1/products")).await.is_none());
    }

    #[tokio::test]
    async fn test_fetch_ignores_non_get() {
        let f = activated().await;
        let req = Request::new("POST", Url::parse("https://y7sauces.com/api/v1/orders").unwrap());
        assert!(f.router.on_fetch(&req).await.is_none());
        assert_eq!(f.net.calls(), 2);
    }

    #[tokio::test]
    async fn test_shell_served_from_primary_without_network() {
        let f = activated().await;
        let calls = f.net.calls();

        let routed = f.router.on_fetch(&get("/")).await.unwrap();

        assert_eq!(routed.class, ResourceClass::CriticalShell);
        assert_eq!(routed.partition, "y7-sauces-v1");
        assert_eq!(routed.source, ResponseSource::Cache);
        assert_eq!(routed.response.body_text(), "<html>shell</html>");
        assert_eq!(f.net.calls(), calls);
    }

    #[tokio::test]
    async fn test_offline_image() {
        let f = activated().await;

        let routed = f.router.on_fetch(&get("/images/logo.png")).await.unwrap();

        assert_eq!(routed.class, ResourceClass::Image);
        assert_eq!(routed.partition, "y7-static-v1");
        assert_eq!(routed.response.status, 503);
        assert_eq!(routed.response.body_text(), "Offline");
    }

    #[tokio::test]
    async fn test_static_asset_cached_once() {
        let f = activated().await;
        f.net.respond("https://y7sauces.com/assets/index-abc.js", 200, "console.log(1)");
        let before = f.net.calls();

        f.router.on_fetch(&get("/assets/index-abc.js")).await.unwrap();
        let second = f.router.on_fetch(&get("/assets/index-abc.js")).await.unwrap();

        assert_eq!(second.source, ResponseSource::Cache);
        assert_eq!(f.net.calls(), before + 1);
    }

    #[tokio::test]
    async fn test_api_falls_back_to_stored_entry() {
        let f = activated().await;
        let req = get("/api/v1/products");
        f.router
            .cache()
            .put_entry("y7-dynamic-v1", &req, &CachedResponse::new(200, "[]"))
            .await
            .unwrap();

        let routed = f.router.on_fetch(&req).await.unwrap();

        assert_eq!(routed.class, ResourceClass::ApiCall);
        assert_eq!(routed.strategy, Strategy::NetworkFirst);
        assert_eq!(routed.source, ResponseSource::Cache);
        assert_eq!(routed.response.body_text(), "[]");
    }

    #[tokio::test]
    async fn test_default_uses_stale_while_revalidate() {
        let f = activated().await;
        f.net.respond("https://y7sauces.com/about", 200, "about us");

        let routed = f.router.on_fetch(&get("/about")).await.unwrap();

        assert_eq!(routed.class, ResourceClass::Default);
        assert_eq!(routed.strategy, Strategy::StaleWhileRevalidate);
        assert_eq!(routed.partition, "y7-dynamic-v1");
        assert_eq!(routed.response.body_text(), "about us");
    }

    #[tokio::test]
    async fn test_push_and_click_hooks() {
        let f = fixture().await;

        let shown = f.router.on_push(br#"{"title":"Flash sale"}"#).await.unwrap();
        assert_eq!(shown.title, "Flash sale");
        assert_eq!(shown.icon, "/icons/icon-192x192.png");

        let opened = f.router.on_notification_click().await.unwrap();
        assert_eq!(opened.as_str(), "https://y7sauces.com/");

        assert_eq!(
            f.host.events(),
            vec!["notify:Flash sale".to_string(), "open:https://y7sauces.com/".to_string()]
        );
    }

    #[tokio::test]
    async fn test_sync_hook() {
        let f = fixture().await;

        assert!(f.router.on_sync("background-sync").await.unwrap());
        assert!(!f.router.on_sync("periodic-refresh").await.unwrap());
        assert_eq!(f.host.events(), vec!["deferred".to_string()]);
    }
}
