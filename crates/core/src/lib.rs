//! Core types and shared functionality for y7-sw.
//!
//! This crate provides:
//! - Partitioned response cache with SQLite backend
//! - Request/response model and the ordered route table
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod request;
pub mod response;
pub mod route;

pub use cache::{CacheDb, CacheEntry, PartitionInfo};
pub use config::{AppConfig, ConfigError, NotificationDefaults, PartitionNames, WorkerConfig};
pub use error::Error;
pub use request::Request;
pub use response::CachedResponse;
pub use route::{PartitionRole, ResourceClass, Route, RouteTable, Strategy};
