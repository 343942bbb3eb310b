//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use std::collections::HashSet;

use crate::config::AppConfig;
use regex::Regex;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `max_bytes` is 0 or exceeds 100MB
    /// - `timeout_ms` is set and below 100ms or above 5 minutes
    /// - `user_agent` is empty
    /// - `origin` is not an http(s) URL
    /// - a routing regex does not compile
    /// - partition names are empty or not distinct
    /// - a critical shell resource is not an absolute path
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > 100 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must not exceed 100MB".into() });
        }

        if let Some(timeout_ms) = self.timeout_ms {
            if timeout_ms < 100 {
                return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
            }
            if timeout_ms > 300_000 {
                return Err(ConfigError::Invalid {
                    field: "timeout_ms".into(),
                    reason: "must not exceed 5 minutes (300000ms)".into(),
                });
            }
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        match url::Url::parse(&self.origin) {
            Ok(origin) if matches!(origin.scheme(), "http" | "https") => {}
            Ok(origin) => {
                return Err(ConfigError::Invalid {
                    field: "origin".into(),
                    reason: format!("unsupported scheme: {}", origin.scheme()),
                });
            }
            Err(e) => return Err(ConfigError::Invalid { field: "origin".into(), reason: e.to_string() }),
        }

        let worker = &self.worker;
        for (field, pattern) in [
            ("worker.static_asset_pattern", &worker.static_asset_pattern),
            ("worker.image_extension_pattern", &worker.image_extension_pattern),
        ] {
            if let Err(e) = Regex::new(pattern) {
                return Err(ConfigError::Invalid { field: field.into(), reason: e.to_string() });
            }
        }

        let names = worker.partitions.current();
        if names.iter().any(|n| n.trim().is_empty()) {
            return Err(ConfigError::Invalid {
                field: "worker.partitions".into(),
                reason: "partition names must not be empty".into(),
            });
        }
        if names.iter().collect::<HashSet<_>>().len() != names.len() {
            return Err(ConfigError::Invalid {
                field: "worker.partitions".into(),
                reason: "partition names must be distinct".into(),
            });
        }

        if let Some(bad) = worker.critical_shell_resources.iter().find(|p| !p.starts_with('/')) {
            return Err(ConfigError::Invalid {
                field: "worker.critical_shell_resources".into(),
                reason: format!("{bad} is not an absolute path"),
            });
        }

        if worker.critical_shell_resources.is_empty() {
            tracing::warn!("critical_shell_resources is empty; nothing will be available offline after install");
        }

        Ok(())
    }
}
