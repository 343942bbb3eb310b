//! Worker runtime for y7-sw.
//!
//! This crate provides the network fetch pipeline, the three caching
//! strategies and the [`CacheRouter`] that drives them through the worker
//! lifecycle, plus the [`Host`] boundary it reports to.

pub mod fetch;
pub mod host;
pub mod router;
pub mod strategy;

pub use fetch::{FetchClient, FetchConfig, Network, resolve};
pub use host::{BACKGROUND_SYNC_TAG, Host, Notification, PushPayload};
pub use router::{CacheRouter, Routed, WorkerState};
pub use strategy::{ResponseSource, Served, StrategyContext};
