//! In-memory implementation of the Store trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use bytes::Bytes;
use medledger_core::{decode_block, Blake3Hash, Block};
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::traits::{InsertResult, Store};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

struct MemoryStoreInner {
    /// Blocks indexed by sequence number.
    blocks: BTreeMap<u64, StoredBlock>,
}

struct StoredBlock {
    content_hash: Blake3Hash,
    canonical: Bytes,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner {
                blocks: BTreeMap::new(),
            }),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_block(&self, block: &Block, canonical: &[u8]) -> Result<InsertResult> {
        let mut inner = self.write()?;

        if let Some(existing) = inner.blocks.get(&block.seq) {
            if existing.canonical.as_ref() == canonical {
                return Ok(InsertResult::AlreadyExists);
            }
            return Ok(InsertResult::Conflict {
                existing: existing.content_hash,
            });
        }

        inner.blocks.insert(
            block.seq,
            StoredBlock {
                content_hash: block.content_hash,
                canonical: Bytes::copy_from_slice(canonical),
            },
        );
        debug!(seq = block.seq, "stored block in memory");

        Ok(InsertResult::Inserted)
    }

    async fn get_block(&self, seq: u64) -> Result<Option<Block>> {
        let inner = self.read()?;
        inner
            .blocks
            .get(&seq)
            .map(|sb| decode_block(&sb.canonical).map_err(StoreError::from))
            .transpose()
    }

    async fn get_blocks_range(&self, start: u64, end: u64) -> Result<Vec<Block>> {
        if start > end {
            return Ok(Vec::new());
        }
        let inner = self.read()?;
        inner
            .blocks
            .range(start..=end)
            .map(|(_, sb)| decode_block(&sb.canonical).map_err(StoreError::from))
            .collect()
    }

    async fn get_canonical_bytes(&self, seq: u64) -> Result<Option<Bytes>> {
        let inner = self.read()?;
        Ok(inner.blocks.get(&seq).map(|sb| sb.canonical.clone()))
    }

    async fn head(&self) -> Result<Option<(u64, Blake3Hash)>> {
        let inner = self.read()?;
        Ok(inner
            .blocks
            .iter()
            .next_back()
            .map(|(seq, sb)| (*seq, sb.content_hash)))
    }

    async fn block_count(&self) -> Result<u64> {
        let inner = self.read()?;
        Ok(inner.blocks.len() as u64)
    }

    async fn load_all(&self) -> Result<Vec<Block>> {
        let inner = self.read()?;
        inner
            .blocks
            .values()
            .map(|sb| decode_block(&sb.canonical).map_err(StoreError::from))
            .collect()
    }
}
