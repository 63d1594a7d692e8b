//! Error types for the Ledger.

use medledger_core::{Blake3Hash, CoreError, VerificationFailure, VerifyError};
use medledger_store::StoreError;
use thiserror::Error;

/// Errors that can occur during Ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Malformed input or a structurally invalid chain.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// The chain failed verification.
    #[error("verification failed: {0}")]
    Verification(#[from] VerificationFailure),

    /// A transaction offered for append does not verify.
    #[error("transaction rejected: {0}")]
    RejectedTransaction(VerifyError),

    /// The store already holds a different block at this sequence number.
    #[error("conflict at seq {seq}: existing block {existing}")]
    Conflict { seq: u64, existing: Blake3Hash },
}

/// Result type for Ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
