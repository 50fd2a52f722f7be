//! Versioned schema migrations.
//!
//! Applied versions are recorded in `_migrations`. Each pending migration
//! runs in its own transaction together with its version row, so a failed
//! upgrade leaves the database at the last good version.

use super::Error;
use tokio_rusqlite::rusqlite::Connection as RawConnection;
use tokio_rusqlite::{Connection, params};

/// Schema versions in application order.
const MIGRATIONS: &[(i64, &str)] = &[
    (1, include_str!("../../migrations/001_partitions.sql")),
    (2, include_str!("../../migrations/002_mutation_queue.sql")),
];

/// Bring the schema up to the newest version.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> { apply(conn, MIGRATIONS) })
        .await
        .map_err(Error::from)
}

fn apply(conn: &mut RawConnection, migrations: &[(i64, &str)]) -> Result<(), Error> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS _migrations (version INTEGER PRIMARY KEY, applied_at TEXT NOT NULL)",
        [],
    )?;
    let current: i64 = conn.query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |row| row.get(0))?;

    for (version, sql) in migrations.iter().filter(|(v, _)| *v > current) {
        let tx = conn.transaction()?;
        tx.execute_batch(sql)
            .map_err(|e| Error::MigrationFailed(format!("version {version}: {e}")))?;
        tx.execute(
            "INSERT INTO _migrations (version, applied_at) VALUES (?1, ?2)",
            params![version, chrono::Utc::now().to_rfc3339()],
        )?;
        tx.commit()?;
        tracing::debug!("applied schema version {}", version);
    }
    Ok(())
}
