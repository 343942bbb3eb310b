//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (Y7_SW_*)
//! 2. TOML config file (if Y7_SW_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::route::PartitionRole;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (Y7_SW_*), nested keys separated by `__`
/// 2. TOML config file (if Y7_SW_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to SQLite cache database holding all partitions.
    ///
    /// Set via Y7_SW_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin the worker is scoped to. Relative request paths resolve against it.
    ///
    /// Set via Y7_SW_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// User-Agent string for network fetches.
    ///
    /// Set via Y7_SW_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via Y7_SW_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Optional network timeout in milliseconds. Unset means no timeout.
    ///
    /// Set via Y7_SW_TIMEOUT_MS environment variable.
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Maximum number of redirects followed per fetch.
    ///
    /// Set via Y7_SW_MAX_REDIRECTS environment variable.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Routing and partition settings for the worker.
    #[serde(default)]
    pub worker: WorkerConfig,
}

/// Routing, pre-cache and partition settings of the caching worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Paths fetched and stored in the primary partition at install, in order.
    #[serde(default = "default_critical_shell")]
    pub critical_shell_resources: Vec<String>,

    /// Path prefixes that mark a request as a static asset.
    #[serde(default = "default_static_prefixes")]
    pub static_asset_prefixes: Vec<String>,

    /// Regex applied to the path to detect static assets by extension.
    #[serde(default = "default_static_pattern")]
    pub static_asset_pattern: String,

    /// Path prefixes that mark a request as an API call.
    #[serde(default = "default_api_prefixes")]
    pub api_path_prefixes: Vec<String>,

    /// Absolute URL prefixes (e.g. a cross-origin API host) treated as API calls.
    #[serde(default)]
    pub api_allowlist: Vec<String>,

    /// Regex applied to the path to detect images by extension.
    #[serde(default = "default_image_pattern")]
    pub image_extension_pattern: String,

    /// Version-tagged partition names.
    #[serde(default)]
    pub partitions: PartitionNames,

    /// Fallbacks for push notifications whose payload omits fields.
    #[serde(default)]
    pub notification: NotificationDefaults,
}

/// The three current partition names. Bumping a version token here is how
/// old caches get dropped on the next activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionNames {
    #[serde(default = "default_primary_partition")]
    pub primary: String,
    #[serde(rename = "static", default = "default_static_partition")]
    pub static_assets: String,
    #[serde(default = "default_dynamic_partition")]
    pub dynamic: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationDefaults {
    #[serde(default = "default_notification_title")]
    pub title: String,
    #[serde(default = "default_notification_body")]
    pub body: String,
    #[serde(default = "default_notification_icon")]
    pub icon: String,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./y7-sw-cache.sqlite")
}

fn default_origin() -> String {
    "http://localhost:3000".into()
}

fn default_user_agent() -> String {
    "y7-sw/0.1".into()
}

fn default_max_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_max_redirects() -> usize {
    5
}

fn default_critical_shell() -> Vec<String> {
    ["/", "/manifest.json", "/favicon.ico", "/icons/icon-192x192.png", "/icons/icon-512x512.png"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_static_prefixes() -> Vec<String> {
    vec!["/assets/".into(), "/static/".into()]
}

fn default_static_pattern() -> String {
    r"(?i)\.(?:js|mjs|css|woff2?|ttf|otf|eot)$".into()
}

fn default_api_prefixes() -> Vec<String> {
    vec!["/api/".into()]
}

fn default_image_pattern() -> String {
    r"(?i)\.(?:png|jpe?g|gif|webp|avif|svg|ico)$".into()
}

fn default_primary_partition() -> String {
    "y7-sauces-v1".into()
}

fn default_static_partition() -> String {
    "y7-static-v1".into()
}

fn default_dynamic_partition() -> String {
    "y7-dynamic-v1".into()
}

fn default_notification_title() -> String {
    "Y7 Sauces".into()
}

fn default_notification_body() -> String {
    "You have a new update".into()
}

fn default_notification_icon() -> String {
    "/icons/icon-192x192.png".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            origin: default_origin(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: None,
            max_redirects: default_max_redirects(),
            worker: WorkerConfig::default(),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            critical_shell_resources: default_critical_shell(),
            static_asset_prefixes: default_static_prefixes(),
            static_asset_pattern: default_static_pattern(),
            api_path_prefixes: default_api_prefixes(),
            api_allowlist: Vec::new(),
            image_extension_pattern: default_image_pattern(),
            partitions: PartitionNames::default(),
            notification: NotificationDefaults::default(),
        }
    }
}

impl Default for PartitionNames {
    fn default() -> Self {
        Self {
            primary: default_primary_partition(),
            static_assets: default_static_partition(),
            dynamic: default_dynamic_partition(),
        }
    }
}

impl Default for NotificationDefaults {
    fn default() -> Self {
        Self {
            title: default_notification_title(),
            body: default_notification_body(),
            icon: default_notification_icon(),
        }
    }
}

impl PartitionNames {
    /// Name of the partition backing a role.
    pub fn name(&self, role: PartitionRole) -> &str {
        match role {
            PartitionRole::Primary => &self.primary,
            PartitionRole::Static => &self.static_assets,
            PartitionRole::Dynamic => &self.dynamic,
        }
    }

    pub fn current(&self) -> [&str; 3] {
        [self.primary.as_str(), self.static_assets.as_str(), self.dynamic.as_str()]
    }

    /// Whether `name` belongs to the current generation of partitions.
    pub fn contains(&self, name: &str) -> bool {
        self.current().contains(&name)
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest, if one is configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `Y7_SW_`
    /// 2. TOML file from `Y7_SW_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("Y7_SW_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("Y7_SW_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
