//! Error types for MedLedger Core.

use thiserror::Error;

use crate::crypto::Blake3Hash;

/// Core errors raised while constructing, encoding or assembling ledger data.
///
/// These are distinct from [`VerifyError`]: a `CoreError` means an input was
/// rejected up front, never that signed data failed verification.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("decoding error: {0}")]
    Decoding(String),

    #[error("malformed block: {0}")]
    MalformedBlock(String),

    #[error("invalid sequence number: expected {expected}, got {got}")]
    InvalidSequence { expected: u64, got: u64 },

    #[error("block {seq} does not extend the current head {head:?}")]
    StaleBlock { seq: u64, head: Blake3Hash },

    #[error("chain has no genesis block")]
    EmptyChain,
}

/// The kind of integrity failure found during verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum VerifyError {
    #[error("patient signature invalid")]
    PatientSignatureInvalid,

    #[error("authority signature invalid")]
    AuthoritySignatureInvalid,

    #[error("genesis signature invalid")]
    GenesisSignatureInvalid,

    #[error("content hash mismatch")]
    ContentHashMismatch,

    #[error("miner signature invalid")]
    MinerSignatureInvalid,

    #[error("broken linkage")]
    BrokenLinkage,

    /// Transaction presence does not match the sequence number.
    #[error("malformed block")]
    MalformedBlock,

    /// Block was signed by a miner other than the pinned operator.
    #[error("untrusted miner")]
    UntrustedMiner,
}

/// A verification failure located at a block.
///
/// `index` is the failing block's position in the chain (equal to its
/// sequence number).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{kind} at block {index}")]
pub struct VerificationFailure {
    pub index: u64,
    pub kind: VerifyError,
}

impl VerificationFailure {
    pub const fn new(index: u64, kind: VerifyError) -> Self {
        Self { index, kind }
    }

    /// Human-readable description of the failure kind.
    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}
