//! SQLite schema versions.
//!
//! `MIGRATIONS[i]` upgrades the schema from version `i` to `i + 1`. Applied
//! versions are recorded in `schema_migrations`; a file written by a newer
//! build is refused rather than reinterpreted.

use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::error::{Result, StoreError};

const MIGRATIONS: &[&str] = &[
    // v1: one row per block. The canonical encoding is authoritative; the
    // other columns are copies for lookup.
    r#"
    CREATE TABLE blocks (
        seq             INTEGER PRIMARY KEY,
        content_hash    BLOB NOT NULL,
        previous_hash   BLOB NOT NULL,
        miner           BLOB NOT NULL,
        canonical_bytes BLOB NOT NULL,
        stored_at       INTEGER NOT NULL
    );
    CREATE INDEX blocks_by_content_hash ON blocks(content_hash);
    CREATE INDEX blocks_by_miner ON blocks(miner);
    "#,
];

/// Schema version this build writes.
pub const CURRENT_VERSION: u32 = MIGRATIONS.len() as u32;

/// Bring `conn` up to [`CURRENT_VERSION`]. Safe to call on every open.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version    INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
    )?;

    let found = schema_version(conn)?;
    if found > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "schema version {found} was written by a newer release (this one supports {CURRENT_VERSION})"
        )));
    }
    if found == CURRENT_VERSION {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for (index, sql) in MIGRATIONS.iter().enumerate().skip(found as usize) {
        let version = index as u32 + 1;
        debug!(version, "applying schema migration");
        tx.execute_batch(sql)?;
        tx.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
            params![version, now_millis()],
        )?;
    }
    tx.commit()?;

    Ok(())
}

/// Highest applied version, 0 for a fresh database.
pub fn schema_version(conn: &Connection) -> Result<u32> {
    let version: Option<u32> = conn
        .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| row.get(0))
        .optional()?
        .flatten();
    Ok(version.unwrap_or(0))
}

pub(crate) fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
}
