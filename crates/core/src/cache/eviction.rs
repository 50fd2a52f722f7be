//! FIFO eviction for bounded partitions.
//!
//! Entries are removed oldest-inserted first. Reads don't refresh an entry's
//! position; only a re-put moves it to the newest slot.

use super::connection::CacheDb;
use crate::Error;
use tokio_rusqlite::params;

/// Upper bound on the number of entries a partition may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvictionPolicy {
    max_entries: usize,
}

impl Default for EvictionPolicy {
    fn default() -> Self {
        Self { max_entries: 50 }
    }
}

impl EvictionPolicy {
    pub fn new(max_entries: usize) -> Self {
        Self { max_entries }
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Trim `partition` down to the bound. Run after every write to it.
    ///
    /// Returns the number of evicted entries.
    pub async fn enforce(&self, db: &CacheDb, partition: &str) -> Result<u64, Error> {
        let evicted = db.trim_partition(partition, self.max_entries).await?;
        if evicted > 0 {
            tracing::debug!("evicted {} entries from {}", evicted, partition);
        }
        Ok(evicted)
    }
}

impl CacheDb {
    /// Delete oldest-inserted entries until count <= max_entries.
    ///
    /// Returns the number of deleted entries.
    pub async fn trim_partition(&self, name: &str, max_entries: usize) -> Result<u64, Error> {
        let name = name.to_string();
        let max = max_entries as i64;
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE partition = ?1", params![name], |row| {
                        row.get(0)
                    })?;
                if count <= max {
                    return Ok(0);
                }

                let to_delete = count - max;
                let deleted = conn.execute(
                    "DELETE FROM entries WHERE seq IN (
                    SELECT seq FROM entries WHERE partition = ?1 ORDER BY seq ASC LIMIT ?2
                )",
                    params![name, to_delete],
                )?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }
}
