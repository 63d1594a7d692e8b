//! Block: links one transaction record into the chain.
//!
//! Block 0 is the genesis block. It carries no transaction; its content hash
//! is the hash of [`GENESIS_ZERO`] and its previous hash repeats its own
//! content hash by convention (nothing precedes it, so that field is never
//! checked). Every later block binds its transaction and sequence number in
//! `content_hash` and is signed by the miner over
//! `Blake3(authority_signature || seq || previous_hash)`.

use serde::{Deserialize, Serialize};

use crate::canonical::{block_content_bytes, miner_message, GENESIS_ZERO};
use crate::crypto::{Blake3Hash, Ed25519PublicKey, Ed25519Signature, Keypair};
use crate::error::{CoreError, VerificationFailure, VerifyError};
use crate::transaction::TransactionRecord;

/// A block in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Position in the chain, starting at 0.
    pub seq: u64,

    /// Blake3 of the canonical block content.
    pub content_hash: Blake3Hash,

    /// `content_hash` of the preceding block (own hash for genesis).
    pub previous_hash: Blake3Hash,

    /// The miner's signature over the linkage digest.
    pub miner_signature: Ed25519Signature,

    /// The miner's exported public key.
    pub miner: Ed25519PublicKey,

    /// The billing record; present iff `seq > 0`.
    pub transaction: Option<TransactionRecord>,
}

impl Block {
    /// Create the genesis block.
    pub fn genesis(miner: &Keypair) -> Self {
        let content_hash = genesis_content_hash();
        let miner_signature = miner.sign_digest(&Blake3Hash::hash(content_hash.as_bytes()));

        Self {
            seq: 0,
            content_hash,
            previous_hash: content_hash,
            miner_signature,
            miner: miner.public_key(),
            transaction: None,
        }
    }

    /// Create block `seq` holding `transaction`, linked to `previous_hash`.
    ///
    /// The caller is responsible for `seq` being one past the current head;
    /// [`Chain`](crate::chain::Chain) guarantees this. Sequence 0 is reserved
    /// for the genesis block.
    pub fn next(
        seq: u64,
        miner: &Keypair,
        transaction: TransactionRecord,
        previous_hash: Blake3Hash,
    ) -> Result<Self, CoreError> {
        if seq == 0 {
            return Err(CoreError::InvalidSequence { expected: 1, got: 0 });
        }
        Ok(Self::link(seq, miner, transaction, previous_hash))
    }

    /// Build a transaction block; `seq` is already known to be non-zero.
    pub(crate) fn link(
        seq: u64,
        miner: &Keypair,
        transaction: TransactionRecord,
        previous_hash: Blake3Hash,
    ) -> Self {
        let content_hash = Blake3Hash::hash(&block_content_bytes(&transaction, seq));
        let linkage = miner_message(&transaction.authority_signature, seq, &previous_hash);
        let miner_signature = miner.sign_digest(&Blake3Hash::hash(&linkage));

        Self {
            seq,
            content_hash,
            previous_hash,
            miner_signature,
            miner: miner.public_key(),
            transaction: Some(transaction),
        }
    }

    /// Whether this is the genesis block.
    pub fn is_genesis(&self) -> bool {
        self.seq == 0
    }

    /// Recompute the content hash from the stored fields.
    ///
    /// Returns `None` when the transaction is missing from a non-genesis block.
    pub fn compute_content_hash(&self) -> Option<Blake3Hash> {
        if self.is_genesis() {
            return Some(genesis_content_hash());
        }
        self.transaction
            .as_ref()
            .map(|tx| Blake3Hash::hash(&block_content_bytes(tx, self.seq)))
    }

    /// Verify this block in isolation (linkage to its predecessor is the
    /// chain's job).
    ///
    /// The genesis block only checks the miner signature over the hash of
    /// [`GENESIS_ZERO`]. A rewritten genesis `content_hash` surfaces as
    /// `BrokenLinkage` at block 1.
    ///
    /// For a transaction block the checks run in order: the transaction's
    /// two signatures, the content hash, then the miner signature. The first
    /// failure is returned with this block's sequence number.
    pub fn verify(&self) -> Result<(), VerificationFailure> {
        let fail = |kind| VerificationFailure::new(self.seq, kind);

        if self.is_genesis() {
            if self.transaction.is_some() {
                return Err(fail(VerifyError::MalformedBlock));
            }
            // The stored hash is not consulted: the signature is checked over
            // the hash of the zero representation, recomputed here.
            let content_hash = genesis_content_hash();
            return self
                .miner
                .verify_digest(&Blake3Hash::hash(content_hash.as_bytes()), &self.miner_signature)
                .map_err(|_| fail(VerifyError::GenesisSignatureInvalid));
        }

        let tx = self
            .transaction
            .as_ref()
            .ok_or_else(|| fail(VerifyError::MalformedBlock))?;

        tx.verify().map_err(fail)?;

        if Blake3Hash::hash(&block_content_bytes(tx, self.seq)) != self.content_hash {
            return Err(fail(VerifyError::ContentHashMismatch));
        }

        let linkage = miner_message(&tx.authority_signature, self.seq, &self.previous_hash);
        self.miner
            .verify_digest(&Blake3Hash::hash(&linkage), &self.miner_signature)
            .map_err(|_| fail(VerifyError::MinerSignatureInvalid))
    }
}

/// The content hash every genesis block carries.
pub fn genesis_content_hash() -> Blake3Hash {
    Blake3Hash::hash(&GENESIS_ZERO)
}
