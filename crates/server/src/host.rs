//! Host side of the worker when running as an MCP server.
//!
//! There are no pages or notification tray here, so every request the worker
//! makes of its host is logged and recorded for the status tools.

use std::sync::Mutex;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;
use y7_sw_client::{Host, Notification};
use y7_sw_core::Error;

/// A notification the worker asked the host to show.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ShownNotification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub shown_at: String,
}

/// Everything the worker has asked of the host so far.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct HostLog {
    pub skip_waiting_requested: bool,
    pub clients_claimed: bool,
    pub notifications: Vec<ShownNotification>,
    pub opened_windows: Vec<String>,
    pub deferred_work_runs: u32,
}

#[derive(Debug, Default)]
pub struct RecordingHost {
    log: Mutex<HostLog>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> HostLog {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HostLog> {
        // A poisoned log only means a panic mid-record; the data is still usable.
        self.log.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Host for RecordingHost {
    async fn skip_waiting(&self) -> Result<(), Error> {
        tracing::info!("worker requested skip waiting");
        self.lock().skip_waiting_requested = true;
        Ok(())
    }

    async fn claim_clients(&self) -> Result<(), Error> {
        tracing::info!("worker claimed clients");
        self.lock().clients_claimed = true;
        Ok(())
    }

    async fn show_notification(&self, notification: Notification) -> Result<(), Error> {
        tracing::info!(title = %notification.title, "showing notification");
        self.lock().notifications.push(ShownNotification {
            title: notification.title,
            body: notification.body,
            icon: notification.icon,
            shown_at: chrono::Utc::now().to_rfc3339(),
        });
        Ok(())
    }

    async fn open_window(&self, url: &Url) -> Result<(), Error> {
        tracing::info!(%url, "opening window");
        self.lock().opened_windows.push(url.to_string());
        Ok(())
    }

    async fn run_deferred_work(&self) -> Result<(), Error> {
        tracing::debug!("background sync: no deferred work queued");
        self.lock().deferred_work_runs += 1;
        Ok(())
    }
}
