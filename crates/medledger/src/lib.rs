//! # MedLedger
//!
//! A tamper-evident ledger of medical billing records.
//!
//! ## Overview
//!
//! Each billing event is a [`TransactionRecord`] signed twice: first by the
//! patient over the payload, then by the medical authority over the payload
//! together with the patient's signature. A single trusted operator (the
//! miner) links records into an append-only chain of blocks. Each block binds
//! its record and position with a content hash and is signed by the miner
//! over its link to the previous block.
//!
//! Verification walks the chain from the genesis block and stops at the first
//! failure, reporting what failed and where.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use medledger::{Keypair, Ledger, LedgerConfig};
//! use medledger::store::SqliteStore;
//!
//! async fn example() {
//!     let miner = Keypair::generate();
//!     let patient = Keypair::generate();
//!     let authority = Keypair::generate();
//!
//!     let store = SqliteStore::open("ledger.db").unwrap();
//!     let ledger = Ledger::open(miner, store, LedgerConfig::default())
//!         .await
//!         .unwrap();
//!
//!     let block = ledger
//!         .record(&patient, &authority, "2021-03-14", "128.50")
//!         .await
//!         .unwrap();
//!     assert_eq!(block.seq, 1);
//!
//!     assert_eq!(ledger.verify().await.unwrap(), 1);
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `medledger::core` - Records, blocks, chain, verification
//! - `medledger::store` - Storage abstraction and SQLite

pub mod error;
pub mod ledger;

pub use medledger_core as core;
pub use medledger_store as store;

pub use error::{LedgerError, Result};
pub use ledger::{Ledger, LedgerConfig};

pub use medledger_core::{
    Amount, BillingDate, Blake3Hash, Block, Chain, Ed25519PublicKey, Ed25519Signature, Keypair,
    TransactionRecord, VerificationFailure, VerifyError,
};
