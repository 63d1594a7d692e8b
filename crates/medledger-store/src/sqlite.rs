//! SQLite implementation of the Store trait.
//!
//! This is the primary storage backend for MedLedger. It uses rusqlite with
//! bundled SQLite, wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use medledger_core::{decode_block, Blake3Hash, Block};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{InsertResult, Store};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "opening sqlite store");
        Self::from_connection(Connection::open(path)?)
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(mut conn: Connection) -> Result<Self> {
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking operation on the connection off the async runtime.
    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::Poisoned(e.to_string()))?;
            f(&mut conn)
        })
        .await?
    }
}

fn seq_to_sql(seq: u64) -> Result<i64> {
    i64::try_from(seq).map_err(|_| StoreError::InvalidData(format!("seq {seq} out of range")))
}

fn seq_from_sql(seq: i64) -> Result<u64> {
    u64::try_from(seq).map_err(|_| StoreError::InvalidData(format!("negative seq {seq}")))
}

fn hash_from_blob(blob: Vec<u8>) -> Result<Blake3Hash> {
    let bytes: [u8; 32] = blob.try_into().map_err(|b: Vec<u8>| {
        StoreError::InvalidData(format!("content_hash: expected 32 bytes, got {}", b.len()))
    })?;
    Ok(Blake3Hash::from_bytes(bytes))
}

fn decode_rows(rows: Vec<Vec<u8>>) -> Result<Vec<Block>> {
    rows.iter()
        .map(|bytes| decode_block(bytes).map_err(StoreError::from))
        .collect()
}

#[async_trait]
impl Store for SqliteStore {
    async fn insert_block(&self, block: &Block, canonical: &[u8]) -> Result<InsertResult> {
        let seq = seq_to_sql(block.seq)?;
        let content_hash = block.content_hash;
        let previous_hash = block.previous_hash;
        let miner = block.miner;
        let canonical = canonical.to_vec();

        let result = self
            .run(move |conn| {
                let tx = conn.transaction()?;

                let existing: Option<(Vec<u8>, Vec<u8>)> = tx
                    .query_row(
                        "SELECT content_hash, canonical_bytes FROM blocks WHERE seq = ?1",
                        params![seq],
                        |row| Ok((row.get(0)?, row.get(1)?)),
                    )
                    .optional()?;

                if let Some((existing_hash, existing_bytes)) = existing {
                    if existing_bytes == canonical {
                        return Ok(InsertResult::AlreadyExists);
                    }
                    return Ok(InsertResult::Conflict {
                        existing: hash_from_blob(existing_hash)?,
                    });
                }

                tx.execute(
                    "INSERT INTO blocks (
                        seq, content_hash, previous_hash, miner, canonical_bytes, stored_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        seq,
                        content_hash.as_bytes().as_slice(),
                        previous_hash.as_bytes().as_slice(),
                        miner.as_bytes().as_slice(),
                        canonical.as_slice(),
                        migration::now_millis(),
                    ],
                )?;
                tx.commit()?;

                Ok(InsertResult::Inserted)
            })
            .await?;

        debug!(seq, ?result, "sqlite insert_block");
        Ok(result)
    }

    async fn get_block(&self, seq: u64) -> Result<Option<Block>> {
        let bytes = self.get_canonical_bytes(seq).await?;
        bytes
            .map(|b| decode_block(&b).map_err(StoreError::from))
            .transpose()
    }

    async fn get_blocks_range(&self, start: u64, end: u64) -> Result<Vec<Block>> {
        if start > end || start > i64::MAX as u64 {
            return Ok(Vec::new());
        }
        let start = seq_to_sql(start)?;
        let end = seq_to_sql(end.min(i64::MAX as u64))?;

        let rows = self
            .run(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT canonical_bytes FROM blocks
                     WHERE seq >= ?1 AND seq <= ?2
                     ORDER BY seq",
                )?;
                let rows = stmt
                    .query_map(params![start, end], |row| row.get(0))?
                    .collect::<rusqlite::Result<Vec<Vec<u8>>>>()?;
                Ok(rows)
            })
            .await?;

        decode_rows(rows)
    }

    async fn get_canonical_bytes(&self, seq: u64) -> Result<Option<Bytes>> {
        let Ok(seq) = i64::try_from(seq) else {
            return Ok(None);
        };

        let bytes: Option<Vec<u8>> = self
            .run(move |conn| {
                conn.query_row(
                    "SELECT canonical_bytes FROM blocks WHERE seq = ?1",
                    params![seq],
                    |row| row.get(0),
                )
                .optional()
                .map_err(StoreError::from)
            })
            .await?;

        Ok(bytes.map(Bytes::from))
    }

    async fn head(&self) -> Result<Option<(u64, Blake3Hash)>> {
        let row: Option<(i64, Vec<u8>)> = self
            .run(|conn| {
                conn.query_row(
                    "SELECT seq, content_hash FROM blocks ORDER BY seq DESC LIMIT 1",
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()
                .map_err(StoreError::from)
            })
            .await?;

        row.map(|(seq, hash)| -> Result<(u64, Blake3Hash)> {
            Ok((seq_from_sql(seq)?, hash_from_blob(hash)?))
        })
        .transpose()
    }

    async fn block_count(&self) -> Result<u64> {
        let count: i64 = self
            .run(|conn| {
                conn.query_row("SELECT COUNT(*) FROM blocks", [], |row| row.get(0))
                    .map_err(StoreError::from)
            })
            .await?;

        seq_from_sql(count)
    }

    async fn load_all(&self) -> Result<Vec<Block>> {
        let rows = self
            .run(|conn| {
                let mut stmt = conn.prepare("SELECT canonical_bytes FROM blocks ORDER BY seq")?;
                let rows = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<rusqlite::Result<Vec<Vec<u8>>>>()?;
                Ok(rows)
            })
            .await?;

        debug!(count = rows.len(), "sqlite load_all");
        decode_rows(rows)
    }
}
