//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use medledger::{Ledger, LedgerConfig, Result};
use medledger_core::{Amount, BillingDate, Chain, Keypair, TransactionRecord};
use medledger_store::MemoryStore;

/// The three parties of a ledger: one patient, one authority, the miner.
pub struct TestFixture {
    pub patient: Keypair,
    pub authority: Keypair,
    pub miner: Keypair,
}

impl TestFixture {
    /// Create a new test fixture with random keypairs.
    pub fn new() -> Self {
        Self {
            patient: Keypair::generate(),
            authority: Keypair::generate(),
            miner: Keypair::generate(),
        }
    }

    /// Create with deterministic keypairs derived from one seed byte.
    pub fn with_seed(seed: u8) -> Self {
        let derive = |role: u8| {
            let mut bytes = [seed; 32];
            bytes[31] = role;
            Keypair::from_seed(&bytes)
        };
        Self {
            patient: derive(1),
            authority: derive(2),
            miner: derive(3),
        }
    }

    /// Create a signed record between this fixture's patient and authority.
    pub fn record(&self, date: BillingDate, amount: Amount) -> TransactionRecord {
        TransactionRecord::create(&self.patient, &self.authority, date, amount)
    }

    /// The `i`-th of a deterministic series of records.
    pub fn nth_record(&self, i: u64) -> TransactionRecord {
        self.record(nth_date(i), Amount::from_cents(1_000 + i * 137))
    }

    /// A chain with `n` records appended after genesis.
    pub fn chain_with(&self, n: u64) -> Chain {
        let mut chain = Chain::initialize(&self.miner);
        for i in 0..n {
            chain.append(self.nth_record(i), &self.miner);
        }
        chain
    }

    /// Open a ledger over an empty in-memory store, mined by this fixture.
    pub async fn ledger(&self) -> Result<Ledger<MemoryStore>> {
        Ledger::open(
            self.miner.clone(),
            MemoryStore::new(),
            LedgerConfig::default(),
        )
        .await
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Create fixtures for tests with several independent parties.
pub fn multi_party_fixtures(count: usize) -> Vec<TestFixture> {
    (0..count).map(|i| TestFixture::with_seed(i as u8)).collect()
}

/// A date in 2021 or later; days stay within 1..=28 so every month is valid.
pub fn nth_date(i: u64) -> BillingDate {
    let year = 2021 + (i / 336) as i32;
    let month = 1 + ((i / 28) % 12) as u32;
    let day = 1 + (i % 28) as u32;
    BillingDate::from_ymd(year, month, day).expect("day 1..=28 exists in every month")
}
