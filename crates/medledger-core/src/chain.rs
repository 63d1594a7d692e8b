//! Chain: the append-only sequence of blocks.
//!
//! A chain always holds at least the genesis block. Growth happens in two
//! steps: [`Chain::prepare_next`] builds the next block from a shared borrow,
//! and [`Chain::publish`] makes it visible. [`Chain::append`] does both.
//! There is no removal, truncation, or reordering.
//!
//! ## Verification
//!
//! [`Chain::verify`] walks the blocks in order and stops at the first failure.
//! For each block after genesis the link to its predecessor is checked before
//! the block itself, so a rewired block is reported as `BrokenLinkage` even if
//! it is otherwise well signed.

use crate::block::Block;
use crate::crypto::{Ed25519PublicKey, Keypair};
use crate::error::{CoreError, VerificationFailure, VerifyError};
use crate::transaction::TransactionRecord;

/// An append-only, hash-linked sequence of blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    // Never empty; blocks[i].seq == i.
    blocks: Vec<Block>,
}

impl Chain {
    /// Create a chain holding only the genesis block signed by `miner`.
    pub fn initialize(miner: &Keypair) -> Self {
        Self {
            blocks: vec![Block::genesis(miner)],
        }
    }

    /// Rebuild a chain from stored blocks.
    ///
    /// Only the shape is checked here: the list is non-empty, sequence numbers
    /// match positions, and a transaction is present exactly on non-genesis
    /// blocks. Hashes and signatures are left to [`Chain::verify`].
    pub fn from_blocks(blocks: Vec<Block>) -> Result<Self, CoreError> {
        if blocks.is_empty() {
            return Err(CoreError::EmptyChain);
        }

        for (index, block) in blocks.iter().enumerate() {
            let index = index as u64;
            if block.seq != index {
                return Err(CoreError::MalformedBlock(format!(
                    "block at position {index} has sequence number {}",
                    block.seq
                )));
            }
            if block.is_genesis() == block.transaction.is_some() {
                return Err(CoreError::MalformedBlock(format!(
                    "block {index}: transaction presence does not match sequence number"
                )));
            }
        }

        Ok(Self { blocks })
    }

    /// Append a transaction as the next block and return it.
    pub fn append(&mut self, transaction: TransactionRecord, miner: &Keypair) -> &Block {
        let block = self.prepare_next(transaction, miner);
        self.push(block)
    }

    /// Build the block that would follow the current head, without
    /// publishing it.
    pub fn prepare_next(&self, transaction: TransactionRecord, miner: &Keypair) -> Block {
        let head = self.head();
        Block::link(head.seq + 1, miner, transaction, head.content_hash)
    }

    /// Publish a block built by [`Chain::prepare_next`].
    ///
    /// The block must extend the current head: its sequence number is one
    /// past the head's and its previous hash is the head's content hash.
    pub fn publish(&mut self, block: Block) -> Result<&Block, CoreError> {
        let head = self.head();
        let expected = head.seq + 1;

        if block.seq != expected {
            return Err(CoreError::InvalidSequence {
                expected,
                got: block.seq,
            });
        }
        if block.previous_hash != head.content_hash {
            return Err(CoreError::StaleBlock {
                seq: block.seq,
                head: head.content_hash,
            });
        }
        if block.transaction.is_none() {
            return Err(CoreError::MalformedBlock(format!(
                "block {} carries no transaction",
                block.seq
            )));
        }

        Ok(self.push(block))
    }

    fn push(&mut self, block: Block) -> &Block {
        self.blocks.push(block);
        &self.blocks[self.blocks.len() - 1]
    }

    /// Verify every block in order.
    ///
    /// Returns the head sequence number when the whole chain checks out,
    /// otherwise the first failure found.
    pub fn verify(&self) -> Result<u64, VerificationFailure> {
        self.verify_with(|_| Ok(()))
    }

    /// Like [`Chain::verify`], and also require every block to be signed by
    /// `miner`.
    ///
    /// The miner check runs after linkage and before the block's own checks.
    pub fn verify_trusted(&self, miner: &Ed25519PublicKey) -> Result<u64, VerificationFailure> {
        self.verify_with(|block| {
            if block.miner == *miner {
                Ok(())
            } else {
                Err(VerificationFailure::new(block.seq, VerifyError::UntrustedMiner))
            }
        })
    }

    fn verify_with<F>(&self, pin: F) -> Result<u64, VerificationFailure>
    where
        F: Fn(&Block) -> Result<(), VerificationFailure>,
    {
        let mut previous: Option<&Block> = None;

        for block in &self.blocks {
            if let Some(prev) = previous {
                if block.previous_hash != prev.content_hash {
                    return Err(VerificationFailure::new(
                        block.seq,
                        VerifyError::BrokenLinkage,
                    ));
                }
            }
            pin(block)?;
            block.verify()?;
            previous = Some(block);
        }

        Ok(self.head_seq())
    }

    /// The most recently published block.
    pub fn head(&self) -> &Block {
        &self.blocks[self.blocks.len() - 1]
    }

    /// The highest assigned sequence number.
    pub fn head_seq(&self) -> u64 {
        self.head().seq
    }

    /// Block `seq`, if published.
    pub fn get(&self, seq: u64) -> Option<&Block> {
        usize::try_from(seq).ok().and_then(|i| self.blocks.get(i))
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Block> {
        self.blocks.iter()
    }

    /// Number of blocks, including genesis.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn into_blocks(self) -> Vec<Block> {
        self.blocks
    }
}

impl<'a> IntoIterator for &'a Chain {
    type Item = &'a Block;
    type IntoIter = std::slice::Iter<'a, Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Blake3Hash;
    use crate::types::Amount;

    fn miner() -> Keypair {
        Keypair::from_seed(&[0x03; 32])
    }

    fn patient() -> Keypair {
        Keypair::from_seed(&[0x01; 32])
    }

    fn authority() -> Keypair {
        Keypair::from_seed(&[0x02; 32])
    }

    fn record(date: &str, amount: &str) -> TransactionRecord {
        TransactionRecord::create_from_text(&patient(), &authority(), date, amount).unwrap()
    }

    fn chain_with(n: u64) -> Chain {
        let miner = miner();
        let mut chain = Chain::initialize(&miner);
        for i in 0..n {
            let amount = format!("{}.{:02}", 10 + i, i % 100);
            chain.append(record("2021-03-14", &amount), &miner);
        }
        chain
    }

    #[test]
    fn test_initialize() {
        let chain = Chain::initialize(&miner());
        assert_eq!(chain.block_count(), 1);
        assert_eq!(chain.head_seq(), 0);
        assert!(chain.head().is_genesis());
        assert_eq!(chain.verify(), Ok(0));
    }

    #[test]
    fn test_append_links_to_head() {
        let miner = miner();
        let mut chain = Chain::initialize(&miner);
        let genesis_hash = chain.head().content_hash;

        let block = chain.append(record("2021-03-14", "128.50"), &miner);
        assert_eq!(block.seq, 1);
        assert_eq!(block.previous_hash, genesis_hash);
        assert_eq!(chain.head_seq(), 1);
    }

    #[test]
    fn test_n_appends_verify() {
        for n in [0, 1, 2, 7] {
            assert_eq!(chain_with(n).verify(), Ok(n));
        }
    }

    #[test]
    fn test_concrete_scenario() {
        let t = record("2021-03-14", "128.50");
        assert_eq!(t.verify(), Ok(()));

        let mut forged = t.clone();
        forged.amount = Amount::parse("128.51").unwrap();
        assert_eq!(forged.verify(), Err(VerifyError::PatientSignatureInvalid));

        let miner = miner();
        let mut chain = Chain::initialize(&miner);
        chain.append(t, &miner);
        assert_eq!(chain.verify(), Ok(1));

        let mut blocks = chain.into_blocks();
        blocks[1].previous_hash = Blake3Hash::hash(b"foreign digest");
        let tampered = Chain::from_blocks(blocks).unwrap();
        assert_eq!(
            tampered.verify(),
            Err(VerificationFailure::new(1, VerifyError::BrokenLinkage))
        );
    }

    #[test]
    fn test_broken_linkage_leaves_prefix_valid() {
        let mut blocks = chain_with(5).into_blocks();
        blocks[3].previous_hash = Blake3Hash::hash(b"elsewhere");

        let tampered = Chain::from_blocks(blocks.clone()).unwrap();
        assert_eq!(
            tampered.verify(),
            Err(VerificationFailure::new(3, VerifyError::BrokenLinkage))
        );

        for block in &blocks[..3] {
            assert_eq!(block.verify(), Ok(()));
        }
    }

    #[test]
    fn test_short_circuits_at_first_failure() {
        let mut blocks = chain_with(4).into_blocks();
        if let Some(tx) = blocks[2].transaction.as_mut() {
            tx.amount = Amount::from_cents(1);
        }
        blocks[4].previous_hash = Blake3Hash::ZERO;

        let chain = Chain::from_blocks(blocks).unwrap();
        assert_eq!(
            chain.verify(),
            Err(VerificationFailure::new(2, VerifyError::PatientSignatureInvalid))
        );
    }

    #[test]
    fn test_rewritten_content_hash_detected() {
        let mut blocks = chain_with(3).into_blocks();
        blocks[1].content_hash = Blake3Hash::hash(b"rehash");

        let chain = Chain::from_blocks(blocks).unwrap();
        assert_eq!(
            chain.verify().unwrap_err(),
            VerificationFailure::new(1, VerifyError::ContentHashMismatch)
        );
    }

    #[test]
    fn test_genesis_only_chain_depends_on_signature() {
        let mut blocks = Chain::initialize(&miner()).into_blocks();
        blocks[0].miner_signature.0[0] ^= 0xff;
        let chain = Chain::from_blocks(blocks).unwrap();
        assert_eq!(
            chain.verify(),
            Err(VerificationFailure::new(0, VerifyError::GenesisSignatureInvalid))
        );
    }

    #[test]
    fn test_rewritten_genesis_hash_caught_by_linkage() {
        let miner = miner();
        let mut blocks = Chain::initialize(&miner).into_blocks();
        blocks[0].content_hash = Blake3Hash::hash(b"another anchor");
        let genesis_only = Chain::from_blocks(blocks).unwrap();
        assert_eq!(genesis_only.verify(), Ok(0));

        let mut chain = Chain::initialize(&miner);
        chain.append(record("2021-03-14", "1.00"), &miner);
        let mut blocks = chain.into_blocks();
        blocks[0].content_hash = Blake3Hash::hash(b"another anchor");
        let chain = Chain::from_blocks(blocks).unwrap();
        assert_eq!(
            chain.verify(),
            Err(VerificationFailure::new(1, VerifyError::BrokenLinkage))
        );
    }

    #[test]
    fn test_prepare_then_publish() {
        let miner = miner();
        let mut chain = Chain::initialize(&miner);

        let block = chain.prepare_next(record("2021-03-14", "1.00"), &miner);
        assert_eq!(chain.block_count(), 1);

        chain.publish(block).unwrap();
        assert_eq!(chain.head_seq(), 1);
        assert_eq!(chain.verify(), Ok(1));
    }

    #[test]
    fn test_publish_rejects_stale_block() {
        let miner = miner();
        let mut chain = Chain::initialize(&miner);

        // Two writers racing on the same head.
        let first = chain.prepare_next(record("2021-03-14", "1.00"), &miner);
        let second = chain.prepare_next(record("2021-03-15", "2.00"), &miner);

        chain.publish(first).unwrap();
        assert!(matches!(
            chain.publish(second),
            Err(CoreError::InvalidSequence { expected: 2, got: 1 })
        ));
    }

    #[test]
    fn test_publish_rejects_fork() {
        let miner = miner();
        let mut chain = chain_with(1);
        let other = chain_with(2);

        let mut block = other.prepare_next(record("2021-03-14", "3.00"), &miner);
        block.seq = 2;
        assert!(matches!(
            chain.publish(block),
            Err(CoreError::StaleBlock { seq: 2, .. })
        ));
        assert_eq!(chain.head_seq(), 1);
    }

    #[test]
    fn test_from_blocks_structure() {
        assert!(matches!(Chain::from_blocks(vec![]), Err(CoreError::EmptyChain)));

        let mut blocks = chain_with(2).into_blocks();
        blocks.swap(1, 2);
        assert!(matches!(
            Chain::from_blocks(blocks),
            Err(CoreError::MalformedBlock(_))
        ));

        let mut blocks = chain_with(1).into_blocks();
        blocks[1].transaction = None;
        assert!(matches!(
            Chain::from_blocks(blocks),
            Err(CoreError::MalformedBlock(_))
        ));
    }

    #[test]
    fn test_verify_trusted_pins_miner() {
        let miner = miner();
        let intruder = Keypair::from_seed(&[0x66; 32]);

        let mut chain = chain_with(2);
        let block = chain.prepare_next(record("2021-03-16", "9.99"), &intruder);
        chain.publish(block).unwrap();

        // Self-consistent, so plain verification passes.
        assert_eq!(chain.verify(), Ok(3));
        assert_eq!(
            chain.verify_trusted(&miner.public_key()),
            Err(VerificationFailure::new(3, VerifyError::UntrustedMiner))
        );
    }

    #[test]
    fn test_accessors() {
        let chain = chain_with(3);
        assert_eq!(chain.get(2).map(|b| b.seq), Some(2));
        assert!(chain.get(4).is_none());
        assert_eq!(chain.iter().count(), 4);
        assert_eq!((&chain).into_iter().count(), chain.blocks().len());
    }

    #[test]
    fn test_content_hash_is_deterministic() {
        let a = chain_with(3);
        let b = chain_with(3);
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.content_hash, y.content_hash);
            assert_eq!(x.compute_content_hash(), Some(x.content_hash));
        }
    }
}
