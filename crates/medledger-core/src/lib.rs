//! # MedLedger Core
//!
//! Pure primitives for MedLedger: signed billing records, blocks, and the
//! cascading chain verification that detects tampering.
//!
//! This crate contains no I/O, no storage, no logging. It is pure computation
//! over cryptographic data structures.
//!
//! ## Key Types
//!
//! - [`TransactionRecord`] - A billing event signed by the patient, then by the authority
//! - [`Block`] - Links one record into the chain via a content hash and miner signature
//! - [`Chain`] - Append-only sequence of blocks, starting with the genesis block
//! - [`VerificationFailure`] - Structured result of a failed verification
//!
//! ## Canonicalization
//!
//! Every hashed or signed payload is encoded with deterministic CBOR. See the
//! [`canonical`] module.

pub mod block;
pub mod canonical;
pub mod chain;
pub mod crypto;
pub mod error;
pub mod transaction;
pub mod types;

pub use block::Block;
pub use canonical::{decode_block, encode_block};
pub use chain::Chain;
pub use crypto::{Blake3Hash, Ed25519PublicKey, Ed25519Signature, Keypair};
pub use error::{CoreError, VerificationFailure, VerifyError};
pub use transaction::{PatientSigned, PendingTransaction, TransactionRecord};
pub use types::{Amount, BillingDate};
