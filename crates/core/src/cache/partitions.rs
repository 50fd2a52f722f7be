//! Named cache partitions.
//!
//! A partition maps request identities to stored responses. Entries keep
//! their insertion sequence so the dynamic partition can be trimmed oldest
//! first. Partitions not named by the current [`PartitionRegistry`] are
//! orphans from an earlier version and get deleted on activation.

use super::connection::CacheDb;
use super::hash::compute_request_key;
use crate::Error;
use crate::http::{Request, Response};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, OptionalExtension, Transaction};

/// The three resource classes the worker caches separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Partition {
    /// Immutable shipped assets from the pre-cache manifest.
    Static,
    /// Same-origin pages and resources fetched at runtime.
    Dynamic,
    /// Responses from declared API origins.
    Api,
}

impl Partition {
    pub const ALL: [Partition; 3] = [Partition::Static, Partition::Dynamic, Partition::Api];

    pub fn as_str(&self) -> &'static str {
        match self {
            Partition::Static => "static",
            Partition::Dynamic => "dynamic",
            Partition::Api => "api",
        }
    }
}

/// Partition names current for one worker version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionRegistry {
    names: [String; 3],
}

impl PartitionRegistry {
    /// Names are `<prefix>-<class>-<version>`.
    pub fn new(prefix: &str, version: &str) -> Self {
        Self { names: Partition::ALL.map(|p| format!("{prefix}-{}-{version}", p.as_str())) }
    }

    pub fn name(&self, partition: Partition) -> &str {
        match partition {
            Partition::Static => &self.names[0],
            Partition::Dynamic => &self.names[1],
            Partition::Api => &self.names[2],
        }
    }

    pub fn active_names(&self) -> Vec<String> {
        self.names.to_vec()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }
}

/// Summary of a stored entry, without its body.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheEntry {
    /// Insertion sequence; lower is older.
    pub seq: i64,
    pub method: String,
    pub url: String,
    pub status: u16,
    pub stored_at: String,
}

fn ensure_partition(tx: &Transaction<'_>, name: &str) -> Result<(), Error> {
    tx.execute(
        "INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)",
        params![name, chrono::Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

fn insert_entry(tx: &Transaction<'_>, name: &str, request: &Request, response: &Response) -> Result<(), Error> {
    let key = compute_request_key(&request.method, &request.url);
    let headers_json = serde_json::to_string(&response.headers)?;

    tx.execute("DELETE FROM entries WHERE partition = ?1 AND key = ?2", params![name, key])?;
    tx.execute(
        "INSERT INTO entries (partition, key, method, url, status, headers_json, body, stored_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            name,
            key,
            request.method.to_ascii_uppercase(),
            request.url,
            response.status,
            headers_json,
            response.body,
            chrono::Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn decode_response(status: i64, headers_json: &str, body: Vec<u8>) -> Result<Response, Error> {
    let status = u16::try_from(status).map_err(|_| Error::InvalidInput(format!("stored status {status}")))?;
    let headers = serde_json::from_str(headers_json)?;
    Ok(Response { status, headers, body })
}

type RawResponse = (i64, String, Vec<u8>);

impl CacheDb {
    /// Create a partition if it doesn't exist yet.
    pub async fn open_partition(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                ensure_partition(&tx, &name)?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Store a response, replacing any entry with the same request identity.
    ///
    /// The partition is created if needed. A replaced entry moves to the
    /// newest insertion position.
    pub async fn put(&self, name: &str, request: &Request, response: &Response) -> Result<(), Error> {
        self.put_all(name, vec![(request.clone(), response.clone())]).await
    }

    /// Store many responses in one transaction: either all become visible or
    /// none do.
    pub async fn put_all(&self, name: &str, entries: Vec<(Request, Response)>) -> Result<(), Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                ensure_partition(&tx, &name)?;
                for (request, response) in &entries {
                    insert_entry(&tx, &name, request, response)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up a request in one partition.
    pub async fn match_in(&self, name: &str, request: &Request) -> Result<Option<Response>, Error> {
        let name = name.to_string();
        let key = compute_request_key(&request.method, &request.url);
        self.conn
            .call(move |conn| -> Result<Option<Response>, Error> {
                let raw: Option<RawResponse> = conn
                    .query_row(
                        "SELECT status, headers_json, body FROM entries WHERE partition = ?1 AND key = ?2",
                        params![name, key],
                        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                    )
                    .optional()?;

                raw.map(|(status, headers, body)| decode_response(status, &headers, body))
                    .transpose()
            })
            .await
            .map_err(Error::from)
    }

    /// Look up a request across all partitions, oldest partition first.
    pub async fn match_any(&self, request: &Request) -> Result<Option<Response>, Error> {
        let key = compute_request_key(&request.method, &request.url);
        self.conn
            .call(move |conn| -> Result<Option<Response>, Error> {
                let raw: Option<RawResponse> = conn
                    .query_row(
                        "SELECT e.status, e.headers_json, e.body
                         FROM entries e JOIN partitions p ON p.name = e.partition
                         WHERE e.key = ?1
                         ORDER BY p.rowid ASC
                         LIMIT 1",
                        params![key],
                        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                    )
                    .optional()?;

                raw.map(|(status, headers, body)| decode_response(status, &headers, body))
                    .transpose()
            })
            .await
            .map_err(Error::from)
    }

    /// All partition names in creation order.
    pub async fn partition_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM partitions ORDER BY rowid ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, rusqlite::Error>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a partition and every entry in it.
    ///
    /// Returns false if the partition did not exist.
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

    /// Delete every partition whose name is not in `active`.
    ///
    /// Returns the deleted names.
    pub async fn delete_all_except(&self, active: &[String]) -> Result<Vec<String>, Error> {
        let mut deleted = Vec::new();
        for name in self.partition_names().await? {
            if active.contains(&name) {
                continue;
            }
            if self.delete_partition(&name).await? {
                tracing::info!("deleted orphaned partition {}", name);
                deleted.push(name);
            }
        }
        Ok(deleted)
    }

    /// Number of entries in a partition.
    pub async fn entry_count(&self, name: &str) -> Result<u64, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE partition = ?1", params![name], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Entry summaries of a partition, oldest first.
    pub async fn entries(&self, name: &str) -> Result<Vec<CacheEntry>, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<CacheEntry>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT seq, method, url, status, stored_at FROM entries
                     WHERE partition = ?1 ORDER BY seq ASC",
                )?;
                let entries = stmt
                    .query_map(params![name], |row| {
                        Ok(CacheEntry {
                            seq: row.get(0)?,
                            method: row.get(1)?,
                            url: row.get(2)?,
                            status: row.get(3)?,
                            stored_at: row.get(4)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, rusqlite::Error>>()?;
                Ok(entries)
            })
            .await
            .map_err(Error::from)
    }
}
