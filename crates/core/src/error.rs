//! Unified error types for y7-sw.
//!
//! The uppercase prefixes are stable codes surfaced to hosts.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the caching worker.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., unknown partition).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// No cache entry found for the given key.
    #[error("CACHE_MISS: {0}")]
    CacheMiss(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Stored headers could not be encoded or decoded.
    #[error("CACHE_ERROR: corrupt entry: {0}")]
    CorruptEntry(String),

    /// Response status is not a complete success and must not be stored.
    #[error("NOT_CACHEABLE: status {status} for {url}")]
    NotCacheable { url: String, status: u16 },

    /// Transport-level failure (DNS, refused connection, offline).
    #[error("NETWORK_ERROR: {0}")]
    Network(String),

    /// Fetch timeout.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// Fetch response too large.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// Critical shell population failed; the install is abandoned.
    #[error("INSTALL_FAILED: {0}")]
    InstallFailed(String),

    /// Lifecycle event arrived in a state that cannot handle it.
    #[error("WORKER_STATE: {0}")]
    WorkerState(String),
}

impl Error {
    /// Whether the error came from the network rather than from storage or input.
    pub fn is_network(&self) -> bool {
        matches!(self, Error::Network(_) | Error::FetchTimeout(_) | Error::FetchTooLarge(_))
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::CorruptEntry(err.to_string())
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let code = match &err {
            Error::InvalidInput(_) => -32602,
            Error::CacheMiss(_) => -32001,
            Error::Database(_) | Error::MigrationFailed(_) | Error::CorruptEntry(_) => -32002,
            Error::InvalidUrl(_) => -32003,
            Error::NotCacheable { .. } => -32004,
            Error::Network(_) => -32005,
            Error::FetchTimeout(_) => -32006,
            Error::FetchTooLarge(_) => -32007,
            Error::InstallFailed(_) => -32008,
            Error::WorkerState(_) => -32009,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}
