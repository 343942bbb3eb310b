//! Database connection management with pragma configuration.
//!
//! Opens the SQLite database behind all partitions, applies WAL and
//! foreign-key pragmas (entry rows cascade with their partition), and runs
//! migrations.

use super::migrations;
use crate::Error;
use std::path::Path;
use tokio_rusqlite::Connection;

const PRAGMAS: &str = "PRAGMA journal_mode=WAL;
     PRAGMA synchronous=NORMAL;
     PRAGMA temp_store=MEMORY;
     PRAGMA foreign_keys=ON;";

/// Handle to the partition store.
///
/// Wraps a tokio-rusqlite Connection that runs database operations on a
/// background thread. Clones share the same connection, so one handle can be
/// passed to every concurrently running request.
#[derive(Clone, Debug)]
pub struct CacheDb {
    pub(crate) conn: Connection,
}

impl CacheDb {
    /// Open a database at the specified path.
    ///
    /// Creates the file if it doesn't exist, applies pragmas, and runs any
    /// pending migrations.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let conn = Connection::open(path).await.map_err(|e| Error::Database(e.into()))?;
        Self::init(conn).await
    }

    /// Open an in-memory database for testing.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::Database(e.into()))?;
        Self::init(conn).await
    }

    /// Close the connection, flushing the WAL. Every clone of this handle
    /// fails with a database error afterwards.
    pub async fn close(self) -> Result<(), Error> {
        self.conn.close().await.map_err(Error::Database)
    }

    async fn init(conn: Connection) -> Result<Self, Error> {
        conn.call(|conn| conn.execute_batch(PRAGMAS))
            .await
            .map_err(Error::Database)?;

        migrations::run(&conn).await?;

        Ok(Self { conn })
    }
}
