//! Durable storage for queued mutations.
//!
//! Writes that could not reach the network are kept here until a replay
//! succeeds. Records are keyed by their enqueue timestamp, which the store
//! keeps strictly increasing so two writes in the same millisecond never
//! collide.

use crate::Error;
use crate::cache::CacheDb;
use crate::http::Request;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A write request waiting for connectivity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct QueuedMutation {
    /// Enqueue time in milliseconds since the Unix epoch; the record's key.
    pub timestamp: i64,
    pub url: String,
    pub method: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl QueuedMutation {
    /// Rebuild the request to replay.
    pub fn to_request(&self) -> Request {
        Request {
            method: self.method.clone(),
            url: self.url.clone(),
            headers: self.headers.clone(),
            body: self.body.clone(),
        }
    }
}

impl CacheDb {
    /// Persist a request for later replay.
    pub async fn enqueue_mutation(&self, request: &Request) -> Result<QueuedMutation, Error> {
        let request = request.clone();
        let now = chrono::Utc::now().timestamp_millis();
        self.conn
            .call(move |conn| -> Result<QueuedMutation, Error> {
                let tx = conn.transaction()?;
                let last: i64 =
                    tx.query_row("SELECT COALESCE(MAX(timestamp), 0) FROM mutation_queue", [], |row| row.get(0))?;
                let timestamp = now.max(last + 1);

                tx.execute(
                    "INSERT INTO mutation_queue (timestamp, url, method, headers_json, body)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        timestamp,
                        &request.url,
                        &request.method,
                        serde_json::to_string(&request.headers)?,
                        &request.body,
                    ],
                )?;
                tx.commit()?;

                Ok(QueuedMutation {
                    timestamp,
                    url: request.url,
                    method: request.method,
                    headers: request.headers,
                    body: request.body,
                })
            })
            .await
            .map_err(Error::from)
    }

    /// Every queued mutation, oldest first.
    pub async fn queued_mutations(&self) -> Result<Vec<QueuedMutation>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<QueuedMutation>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT timestamp, url, method, headers_json, body FROM mutation_queue ORDER BY timestamp ASC",
                )?;
                let rows = stmt
                    .query_map([], |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, Option<String>>(4)?,
                        ))
                    })?
                    .collect::<Result<Vec<_>, rusqlite::Error>>()?;

                rows.into_iter()
                    .map(|(timestamp, url, method, headers_json, body)| {
                        Ok(QueuedMutation { timestamp, url, method, headers: serde_json::from_str(&headers_json)?, body })
                    })
                    .collect()
            })
            .await
            .map_err(Error::from)
    }

    /// Remove a mutation after it was replayed.
    ///
    /// Returns false if no record had that timestamp.
    pub async fn remove_mutation(&self, timestamp: i64) -> Result<bool, Error> {
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM mutation_queue WHERE timestamp = ?1", params![timestamp])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    pub async fn queued_count(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM mutation_queue", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
