//! The Ledger: a persisted, single-writer chain operated by one miner.
//!
//! The Ledger owns the miner key pair and the in-memory [`Chain`], and writes
//! every block to a [`Store`] before making it visible. Readers take a shared
//! lock on the chain and never see a block that is still being built.

use std::sync::Arc;

use medledger_core::{
    encode_block, Block, Chain, Ed25519PublicKey, Keypair, TransactionRecord,
};
use medledger_store::{InsertResult, Store};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::{LedgerError, Result};

/// Configuration for the Ledger.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Verify the loaded chain against the miner key when opening.
    pub verify_on_open: bool,
    /// Verify each transaction's signatures before appending it.
    pub verify_on_append: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            verify_on_open: true,
            verify_on_append: true,
        }
    }
}

/// The main Ledger struct.
///
/// Provides:
/// - Opening a chain from storage (or creating its genesis block)
/// - Appending signed billing records
/// - Verifying the whole chain
/// - Read access to published blocks
pub struct Ledger<S: Store> {
    /// The miner keypair that signs every block.
    miner: Keypair,
    /// The storage backend.
    store: Arc<S>,
    /// Configuration.
    config: LedgerConfig,
    /// Published blocks.
    chain: RwLock<Chain>,
    /// Held for the whole of an append.
    writer: Mutex<()>,
}

impl<S: Store> Ledger<S> {
    /// Open a ledger over `store`.
    ///
    /// An empty store receives a fresh genesis block signed by `miner`.
    /// Otherwise the stored blocks are loaded and, with
    /// [`LedgerConfig::verify_on_open`], verified against the miner key.
    pub async fn open(miner: Keypair, store: S, config: LedgerConfig) -> Result<Self> {
        let blocks = store.load_all().await?;

        let chain = if blocks.is_empty() {
            let chain = Chain::initialize(&miner);
            persist(&store, chain.head()).await?;
            info!(miner = %miner.public_key().to_hex(), "initialized new ledger");
            chain
        } else {
            let chain = Chain::from_blocks(blocks)?;
            info!(head_seq = chain.head_seq(), "loaded ledger from store");
            chain
        };

        if config.verify_on_open {
            let head = chain
                .verify_trusted(&miner.public_key())
                .map_err(|failure| {
                    warn!(index = failure.index, kind = %failure.kind, "stored chain failed verification");
                    failure
                })?;
            debug!(head_seq = head, "stored chain verified");
        }

        Ok(Self {
            miner,
            store: Arc::new(store),
            config,
            chain: RwLock::new(chain),
            writer: Mutex::new(()),
        })
    }

    /// Get the miner's public key.
    pub fn miner_public_key(&self) -> Ed25519PublicKey {
        self.miner.public_key()
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Write Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a record signed by `patient` then `authority`, and append it.
    ///
    /// `date` must be `YYYY-MM-DD` and `amount` a non-negative decimal with at
    /// most two fractional digits; anything else fails before signing.
    pub async fn record(
        &self,
        patient: &Keypair,
        authority: &Keypair,
        date: &str,
        amount: &str,
    ) -> Result<Block> {
        let transaction = TransactionRecord::create_from_text(patient, authority, date, amount)?;
        self.append(transaction).await
    }

    /// Append a signed record as the next block.
    ///
    /// Only one append runs at a time. The block is built against the current
    /// head, written to the store, and only then published to readers.
    pub async fn append(&self, transaction: TransactionRecord) -> Result<Block> {
        let _writer = self.writer.lock().await;

        if self.config.verify_on_append {
            transaction.verify().map_err(|kind| {
                warn!(%kind, "rejected transaction");
                LedgerError::RejectedTransaction(kind)
            })?;
        }

        let block = self.chain.read().await.prepare_next(transaction, &self.miner);
        persist(self.store.as_ref(), &block).await?;

        let mut chain = self.chain.write().await;
        let published = chain.publish(block)?.clone();
        info!(seq = published.seq, content_hash = %published.content_hash, "appended block");

        Ok(published)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Read Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Verify the whole chain, requiring every block to carry the miner key.
    ///
    /// Returns the head sequence number on success.
    pub async fn verify(&self) -> Result<u64> {
        let chain = self.chain.read().await;
        chain.verify_trusted(&self.miner.public_key()).map_err(|failure| {
            warn!(index = failure.index, kind = %failure.kind, "chain failed verification");
            LedgerError::Verification(failure)
        })
    }

    /// A copy of the chain as currently published.
    pub async fn snapshot(&self) -> Chain {
        self.chain.read().await.clone()
    }

    /// The highest published sequence number.
    pub async fn head_seq(&self) -> u64 {
        self.chain.read().await.head_seq()
    }

    /// Get a published block.
    pub async fn block(&self, seq: u64) -> Option<Block> {
        self.chain.read().await.get(seq).cloned()
    }
}

/// Write a block to the store. An identical block already present counts as
/// written; a different one is a conflict.
async fn persist<S: Store + ?Sized>(store: &S, block: &Block) -> Result<()> {
    let canonical = encode_block(block);

    match store.insert_block(block, &canonical).await? {
        InsertResult::Inserted => Ok(()),
        InsertResult::AlreadyExists => {
            debug!(seq = block.seq, "block already stored");
            Ok(())
        }
        InsertResult::Conflict { existing } => {
            warn!(seq = block.seq, %existing, "store holds a different block");
            Err(LedgerError::Conflict {
                seq: block.seq,
                existing,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medledger_core::{VerificationFailure, VerifyError};
    use medledger_store::MemoryStore;

    fn keys() -> (Keypair, Keypair, Keypair) {
        (
            Keypair::from_seed(&[0x01; 32]),
            Keypair::from_seed(&[0x02; 32]),
            Keypair::from_seed(&[0x03; 32]),
        )
    }

    #[tokio::test]
    async fn test_open_empty_store_writes_genesis() {
        let (_, _, miner) = keys();
        let ledger = Ledger::open(miner, MemoryStore::new(), LedgerConfig::default())
            .await
            .unwrap();

        assert_eq!(ledger.head_seq().await, 0);
        assert_eq!(ledger.store().block_count().await.unwrap(), 1);
        assert_eq!(ledger.verify().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_record_and_verify() {
        let (patient, authority, miner) = keys();
        let ledger = Ledger::open(miner, MemoryStore::new(), LedgerConfig::default())
            .await
            .unwrap();

        let block = ledger
            .record(&patient, &authority, "2021-03-14", "128.50")
            .await
            .unwrap();
        assert_eq!(block.seq, 1);
        assert_eq!(ledger.block(1).await, Some(block));
        assert_eq!(ledger.verify().await.unwrap(), 1);
        assert_eq!(ledger.store().block_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_malformed_input_appends_nothing() {
        let (patient, authority, miner) = keys();
        let ledger = Ledger::open(miner, MemoryStore::new(), LedgerConfig::default())
            .await
            .unwrap();

        let result = ledger.record(&patient, &authority, "2021-3-14", "1.00").await;
        assert!(matches!(result, Err(LedgerError::Core(_))));
        assert_eq!(ledger.head_seq().await, 0);
    }

    #[tokio::test]
    async fn test_forged_transaction_rejected() {
        let (patient, authority, miner) = keys();
        let ledger = Ledger::open(miner, MemoryStore::new(), LedgerConfig::default())
            .await
            .unwrap();

        let mut tx =
            TransactionRecord::create_from_text(&patient, &authority, "2021-03-14", "128.50")
                .unwrap();
        tx.amount = "128.51".parse().unwrap();

        let result = ledger.append(tx).await;
        assert!(matches!(
            result,
            Err(LedgerError::RejectedTransaction(VerifyError::PatientSignatureInvalid))
        ));
        assert_eq!(ledger.store().block_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_forged_transaction_caught_by_verify_when_not_checked() {
        let (patient, authority, miner) = keys();
        let config = LedgerConfig {
            verify_on_append: false,
            ..LedgerConfig::default()
        };
        let ledger = Ledger::open(miner, MemoryStore::new(), config).await.unwrap();

        let mut tx =
            TransactionRecord::create_from_text(&patient, &authority, "2021-03-14", "128.50")
                .unwrap();
        tx.amount = "128.51".parse().unwrap();
        ledger.append(tx).await.unwrap();

        assert!(matches!(
            ledger.verify().await,
            Err(LedgerError::Verification(VerificationFailure {
                index: 1,
                kind: VerifyError::PatientSignatureInvalid
            }))
        ));
    }

    #[tokio::test]
    async fn test_reopen_with_other_miner_is_untrusted() {
        let (patient, authority, miner) = keys();
        let store = Arc::new(MemoryStore::new());

        let ledger = Ledger::open(miner, SharedStore(store.clone()), LedgerConfig::default())
            .await
            .unwrap();
        ledger
            .record(&patient, &authority, "2021-03-14", "10.00")
            .await
            .unwrap();

        let intruder = Keypair::from_seed(&[0x66; 32]);
        let result = Ledger::open(intruder, SharedStore(store), LedgerConfig::default()).await;
        assert!(matches!(
            result,
            Err(LedgerError::Verification(VerificationFailure {
                index: 0,
                kind: VerifyError::UntrustedMiner
            }))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_appends_stay_linked() {
        let (patient, authority, miner) = keys();
        let ledger = Arc::new(
            Ledger::open(miner, MemoryStore::new(), LedgerConfig::default())
                .await
                .unwrap(),
        );

        let mut handles = Vec::new();
        for i in 0..8u64 {
            let ledger = Arc::clone(&ledger);
            let tx = TransactionRecord::create_from_text(
                &patient,
                &authority,
                "2021-03-14",
                &format!("{i}.00"),
            )
            .unwrap();
            handles.push(tokio::spawn(async move { ledger.append(tx).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(ledger.verify().await.unwrap(), 8);
        let stored = Chain::from_blocks(ledger.store().load_all().await.unwrap()).unwrap();
        assert_eq!(stored, ledger.snapshot().await);
    }

    /// Lets two ledgers in one test share a backing store.
    struct SharedStore(Arc<MemoryStore>);

    #[async_trait::async_trait]
    impl Store for SharedStore {
        async fn insert_block(
            &self,
            block: &Block,
            canonical: &[u8],
        ) -> medledger_store::Result<InsertResult> {
            self.0.insert_block(block, canonical).await
        }

        async fn get_block(&self, seq: u64) -> medledger_store::Result<Option<Block>> {
            self.0.get_block(seq).await
        }

        async fn get_blocks_range(
            &self,
            start: u64,
            end: u64,
        ) -> medledger_store::Result<Vec<Block>> {
            self.0.get_blocks_range(start, end).await
        }

        async fn get_canonical_bytes(
            &self,
            seq: u64,
        ) -> medledger_store::Result<Option<bytes::Bytes>> {
            self.0.get_canonical_bytes(seq).await
        }

        async fn head(
            &self,
        ) -> medledger_store::Result<Option<(u64, medledger_core::Blake3Hash)>> {
            self.0.head().await
        }

        async fn block_count(&self) -> medledger_store::Result<u64> {
            self.0.block_count().await
        }

        async fn load_all(&self) -> medledger_store::Result<Vec<Block>> {
            self.0.load_all().await
        }
    }
}
