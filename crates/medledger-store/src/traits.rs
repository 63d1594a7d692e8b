//! Store trait: the abstract interface for block persistence.
//!
//! Blocks are stored as their canonical encoding. Reads decode those exact
//! bytes, so a block loaded back from any backend verifies exactly as it did
//! when it was written.

use async_trait::async_trait;
use bytes::Bytes;
use medledger_core::{Blake3Hash, Block};

use crate::error::Result;

/// Result of inserting a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertResult {
    /// Block was inserted successfully.
    Inserted,
    /// The identical block is already stored (idempotent, not an error).
    AlreadyExists,
    /// A different block is already stored at this sequence number.
    Conflict {
        /// Content hash of the block already stored.
        existing: Blake3Hash,
    },
}

/// The Store trait: async interface for block persistence.
///
/// All methods are async to support both sync (SQLite) and async backends.
/// For SQLite, we use `spawn_blocking` internally to avoid blocking the runtime.
///
/// A store does not verify what it is given. It only keeps one block per
/// sequence number; integrity is checked by the chain when blocks are loaded.
#[async_trait]
pub trait Store: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Writes
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert a block.
    ///
    /// # Arguments
    /// - `block`: The block to insert.
    /// - `canonical`: Its canonical encoding, as produced by `encode_block`.
    ///
    /// # Returns
    /// - `Inserted` if nothing was stored at `block.seq`.
    /// - `AlreadyExists` if the same bytes are already stored there.
    /// - `Conflict` if a different block occupies `block.seq`.
    async fn insert_block(&self, block: &Block, canonical: &[u8]) -> Result<InsertResult>;

    // ─────────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────────

    /// Get the block with sequence number `seq`.
    async fn get_block(&self, seq: u64) -> Result<Option<Block>>;

    /// Get blocks with `start <= seq <= end`, ordered by seq.
    async fn get_blocks_range(&self, start: u64, end: u64) -> Result<Vec<Block>>;

    /// Get the stored canonical bytes of block `seq`.
    async fn get_canonical_bytes(&self, seq: u64) -> Result<Option<Bytes>>;

    /// The highest stored sequence number and that block's content hash.
    async fn head(&self) -> Result<Option<(u64, Blake3Hash)>>;

    /// Number of stored blocks.
    async fn block_count(&self) -> Result<u64>;

    /// Every stored block, ordered by seq.
    async fn load_all(&self) -> Result<Vec<Block>>;
}
