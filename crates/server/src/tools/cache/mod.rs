//! Cache inspection MCP tools.
//!
//! Read and prune the worker's partitions directly, outside any strategy.

pub mod get;
pub mod list;
pub mod purge;

pub use get::{CacheGetParams, get_impl};
pub use list::{CacheListParams, list_impl};
pub use purge::{CachePurgeParams, purge_impl};
