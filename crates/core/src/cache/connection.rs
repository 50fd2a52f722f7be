//! Opening the worker's SQLite store.

use super::migrations;
use crate::Error;
use std::path::Path;
use std::time::Duration;
use tokio_rusqlite::Connection;

/// Partition deletes rely on `foreign_keys` to cascade to their entries.
const PRAGMAS: &str = "PRAGMA journal_mode=WAL;
     PRAGMA synchronous=NORMAL;
     PRAGMA foreign_keys=ON;";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to the worker's durable storage: cache partitions and the
/// mutation queue.
///
/// Clones share one tokio-rusqlite connection, whose background thread runs
/// calls one at a time.
#[derive(Clone, Debug)]
pub struct CacheDb {
    pub(crate) conn: Connection,
}

impl CacheDb {
    /// Open (or create) the store at `path` and bring its schema up to date.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .map_err(|e| Error::InvalidInput(format!("cannot create {}: {e}", dir.display())))?;
        }
        let conn = Connection::open(path).await.map_err(|e| Error::Database(e.into()))?;
        Self::prepare(conn).await
    }

    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::Database(e.into()))?;
        Self::prepare(conn).await
    }

    async fn prepare(conn: Connection) -> Result<Self, Error> {
        conn.call(|conn| {
            conn.busy_timeout(BUSY_TIMEOUT)?;
            conn.execute_batch(PRAGMAS)
        })
        .await
        .map_err(Error::Database)?;

        migrations::run(&conn).await?;
        Ok(Self { conn })
    }
}
