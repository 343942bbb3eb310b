//! SQLite-backed response cache split into named partitions.
//!
//! This module provides a persistent, partitioned key→response store using
//! SQLite with async access via tokio-rusqlite. It supports:
//!
//! - Request-addressed keys using SHA-256 over method and URL
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - Whole-partition deletion for version-based invalidation

pub mod connection;
pub mod hash;
pub mod migrations;
pub mod partitions;

pub use crate::Error;

pub use connection::CacheDb;
pub use partitions::{CacheEntry, PartitionInfo};
