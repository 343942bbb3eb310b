//! Host runtime boundary.
//!
//! The router never talks to pages or the notification system directly; it
//! asks its [`Host`] to. Push, notification click and background sync are
//! pass-through hooks.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;
use y7_sw_core::{Error, NotificationDefaults};

/// Tag of the sync event that triggers deferred work.
pub const BACKGROUND_SYNC_TAG: &str = "background-sync";

/// Capabilities the host runtime provides to the worker.
#[async_trait]
pub trait Host: Send + Sync {
    /// Activate the freshly installed worker without waiting for open pages to close.
    async fn skip_waiting(&self) -> Result<(), Error>;

    /// Take control of every open page without a reload.
    async fn claim_clients(&self) -> Result<(), Error>;

    async fn show_notification(&self, notification: Notification) -> Result<(), Error>;

    /// Focus a page showing `url`, or open one.
    async fn open_window(&self, url: &Url) -> Result<(), Error>;

    /// Work queued while offline. Nothing is queued yet.
    async fn run_deferred_work(&self) -> Result<(), Error> {
        Ok(())
    }
}

/// Push message body as sent by the backend. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushPayload {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
}

impl PushPayload {
    /// Decode a raw push message. JSON is read field by field; any other
    /// text becomes the notification body.
    pub fn from_bytes(data: &[u8]) -> Self {
        if data.is_empty() {
            return Self::default();
        }
        serde_json::from_slice(data).unwrap_or_else(|_| Self {
            body: Some(String::from_utf8_lossy(data).into_owned()),
            ..Default::default()
        })
    }
}

/// A notification ready to show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
}

impl Notification {
    pub fn from_payload(payload: PushPayload, defaults: &NotificationDefaults) -> Self {
        Self {
            title: payload.title.unwrap_or_else(|| defaults.title.clone()),
            body: payload.body.unwrap_or_else(|| defaults.body.clone()),
            icon: payload.icon.unwrap_or_else(|| defaults.icon.clone()),
        }
    }
}
