//! # MedLedger Store
//!
//! Storage abstraction for MedLedger. Provides a trait-based interface for
//! block persistence with SQLite and in-memory implementations.
//!
//! ## Overview
//!
//! The store module abstracts block storage behind the [`Store`] trait,
//! allowing the ledger to be storage-agnostic. The primary implementation
//! is [`SqliteStore`], with [`MemoryStore`] for testing.
//!
//! ## Key Types
//!
//! - [`Store`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`InsertResult`] - Result of inserting a block
//!
//! ## Usage
//!
//! ```rust,no_run
//! use medledger_core::{encode_block, Chain, Keypair};
//! use medledger_store::{InsertResult, SqliteStore, Store};
//!
//! async fn example() {
//!     let store = SqliteStore::open("ledger.db").unwrap();
//!
//!     let miner = Keypair::generate();
//!     let chain = Chain::initialize(&miner);
//!     let genesis = chain.head();
//!
//!     let result = store.insert_block(genesis, &encode_block(genesis)).await.unwrap();
//!     assert_eq!(result, InsertResult::Inserted);
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Canonical bytes are the record**: rows hold the exact encoding; blocks
//!   are decoded from it on every read
//! - **Idempotent inserts**: Inserting the same block twice returns `AlreadyExists`
//! - **Conflict detection**: A different block at the same seq returns `Conflict`

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{InsertResult, Store};
