//! Partition and entry operations.
//!
//! Mirrors the host cache-storage contract: open/has/keys/delete on named
//! partitions and match/put/delete on entries inside them. Entries are keyed
//! by request identity and only complete (200) responses are ever written.

use super::connection::CacheDb;
use super::hash::compute_cache_key;
use crate::{CachedResponse, Error, Request};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, OptionalExtension};

/// A stored entry together with its request identity.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CacheEntry {
    pub partition: String,
    pub method: String,
    pub url: String,
    pub stored_at: String,
    pub response: CachedResponse,
}

/// Summary row for listing partitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct PartitionInfo {
    pub name: String,
    pub created_at: String,
    pub entries: u64,
}

struct PreparedEntry {
    key_hash: String,
    method: String,
    url: String,
    status: u16,
    status_text: String,
    headers_json: String,
    body: Vec<u8>,
}

impl PreparedEntry {
    fn new(request: &Request, response: &CachedResponse) -> Result<Self, Error> {
        if !response.is_complete() {
            return Err(Error::NotCacheable { url: request.url.to_string(), status: response.status });
        }
        Ok(Self {
            key_hash: compute_cache_key(&request.method, request.url.as_str()),
            method: request.method.clone(),
            url: request.url.to_string(),
            status: response.status,
            status_text: response.status_text.clone(),
            headers_json: serde_json::to_string(&response.headers)?,
            body: response.body.clone(),
        })
    }
}

fn ensure_partition(conn: &rusqlite::Connection, name: &str, now: &str) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO partitions (name, created_at) VALUES (?1, ?2) ON CONFLICT(name) DO NOTHING",
        params![name, now],
    )?;
    Ok(())
}

fn upsert_entry(conn: &rusqlite::Connection, partition: &str, entry: &PreparedEntry, now: &str) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO entries (partition, key_hash, method, url, status, status_text, headers_json, body, stored_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT(partition, key_hash) DO UPDATE SET
            method = excluded.method,
            url = excluded.url,
            status = excluded.status,
            status_text = excluded.status_text,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at",
        params![
            partition,
            &entry.key_hash,
            &entry.method,
            &entry.url,
            entry.status,
            &entry.status_text,
            &entry.headers_json,
            &entry.body,
            now,
        ],
    )?;
    Ok(())
}

impl CacheDb {
    /// Create a partition if it does not exist yet.
    pub async fn open_partition(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                ensure_partition(conn, &name, &now)?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    pub async fn has_partition(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM partitions WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// Names of all existing partitions, oldest first.
    pub async fn partition_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM partitions ORDER BY created_at, name")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Partitions with their entry counts.
    pub async fn list_partitions(&self) -> Result<Vec<PartitionInfo>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<PartitionInfo>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT p.name, p.created_at, COUNT(e.key_hash)
                     FROM partitions p LEFT JOIN entries e ON e.partition = p.name
                     GROUP BY p.name, p.created_at
                     ORDER BY p.created_at, p.name",
                )?;
                let rows = stmt
                    .query_map([], |row| {
                        Ok(PartitionInfo {
                            name: row.get(0)?,
                            created_at: row.get(1)?,
                            entries: row.get::<_, i64>(2)? as u64,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a partition and every entry in it.
    ///
    /// Returns whether the partition existed.
    pub async fn delete_partition(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM partitions WHERE name = ?1", params![name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Remove all entries of a partition but keep the partition itself.
    ///
    /// Returns the number of deleted entries.
    pub async fn clear_partition(&self, name: &str) -> Result<u64, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM entries WHERE partition = ?1", params![name])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Look up the stored response for a request.
    ///
    /// Returns None if the partition or the entry doesn't exist.
    pub async fn match_entry(&self, partition: &str, request: &Request) -> Result<Option<CachedResponse>, Error> {
        Ok(self.get_entry(partition, request).await?.map(|e| e.response))
    }

    /// Like [`CacheDb::match_entry`] but with identity and storage time.
    pub async fn get_entry(&self, partition: &str, request: &Request) -> Result<Option<CacheEntry>, Error> {
        let partition = partition.to_string();
        let key_hash = compute_cache_key(&request.method, request.url.as_str());
        self.conn
            .call(move |conn| -> Result<Option<CacheEntry>, Error> {
                let row = conn
                    .query_row(
                        "SELECT method, url, status, status_text, headers_json, body, stored_at
                         FROM entries WHERE partition = ?1 AND key_hash = ?2",
                        params![partition, key_hash],
                        |row| {
                            Ok((
                                row.get::<_, String>(0)?,
                                row.get::<_, String>(1)?,
                                row.get::<_, u16>(2)?,
                                row.get::<_, String>(3)?,
                                row.get::<_, String>(4)?,
                                row.get::<_, Vec<u8>>(5)?,
                                row.get::<_, String>(6)?,
                            ))
                        },
                    )
                    .optional()?;

                let Some((method, url, status, status_text, headers_json, body, stored_at)) = row else {
                    return Ok(None);
                };

                let headers = serde_json::from_str(&headers_json)?;
                Ok(Some(CacheEntry {
                    partition,
                    method,
                    url,
                    stored_at,
                    response: CachedResponse { status, status_text, headers, body },
                }))
            })
            .await
            .map_err(Error::from)
    }

    /// Store a response, creating the partition if needed.
    ///
    /// Uses UPSERT semantics: a second write for the same request replaces the
    /// first. Anything but a 200 is refused with `Error::NotCacheable`.
    pub async fn put_entry(&self, partition: &str, request: &Request, response: &CachedResponse) -> Result<(), Error> {
        let entry = PreparedEntry::new(request, response)?;
        let partition = partition.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                ensure_partition(conn, &partition, &now)?;
                upsert_entry(conn, &partition, &entry, &now)?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Store several responses in one transaction: either all are written or none.
    pub async fn put_entries(&self, partition: &str, items: &[(Request, CachedResponse)]) -> Result<(), Error> {
        let entries = items
            .iter()
            .map(|(req, resp)| PreparedEntry::new(req, resp))
            .collect::<Result<Vec<_>, _>>()?;
        let partition = partition.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                ensure_partition(&tx, &partition, &now)?;
                for entry in &entries {
                    upsert_entry(&tx, &partition, entry, &now)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Delete the entry for a request. Returns whether it existed.
    pub async fn delete_entry(&self, partition: &str, request: &Request) -> Result<bool, Error> {
        let partition = partition.to_string();
        let key_hash = compute_cache_key(&request.method, request.url.as_str());
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute(
                    "DELETE FROM entries WHERE partition = ?1 AND key_hash = ?2",
                    params![partition, key_hash],
                )?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Request identities stored in a partition as (method, url), sorted by URL.
    pub async fn entry_keys(&self, partition: &str) -> Result<Vec<(String, String)>, Error> {
        let partition = partition.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<(String, String)>, Error> {
                let mut stmt = conn.prepare("SELECT method, url FROM entries WHERE partition = ?1 ORDER BY url, method")?;
                let keys = stmt
                    .query_map(params![partition], |row| Ok((row.get(0)?, row.get(1)?)))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }

    pub async fn entry_count(&self, partition: &str) -> Result<u64, Error> {
        let partition = partition.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE partition = ?1", params![partition], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
