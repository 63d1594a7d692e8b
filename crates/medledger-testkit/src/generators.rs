//! Proptest generators for property-based testing.

use proptest::prelude::*;

use medledger_core::{
    Amount, BillingDate, Blake3Hash, Chain, Ed25519PublicKey, Keypair, TransactionRecord,
};

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate a random Blake3Hash.
pub fn blake3_hash() -> impl Strategy<Value = Blake3Hash> {
    any::<[u8; 32]>().prop_map(Blake3Hash)
}

/// Generate a random Ed25519PublicKey.
pub fn public_key() -> impl Strategy<Value = Ed25519PublicKey> {
    keypair().prop_map(|kp| kp.public_key())
}

/// Generate a valid billing date between 1900 and 2199.
pub fn billing_date() -> impl Strategy<Value = BillingDate> {
    (1900i32..2200, 1u32..=12, 1u32..=31).prop_filter_map("no such day", |(y, m, d)| {
        BillingDate::from_ymd(y, m, d).ok()
    })
}

/// Generate an amount up to ten million units.
pub fn amount() -> impl Strategy<Value = Amount> {
    (0u64..=1_000_000_000).prop_map(Amount::from_cents)
}

/// Parameters for generating a transaction record.
#[derive(Debug, Clone)]
pub struct RecordParams {
    pub patient: Keypair,
    pub authority: Keypair,
    pub date: BillingDate,
    pub amount: Amount,
}

impl Arbitrary for RecordParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (keypair(), keypair(), billing_date(), amount())
            .prop_map(|(patient, authority, date, amount)| RecordParams {
                patient,
                authority,
                date,
                amount,
            })
            .boxed()
    }
}

/// Create a record from parameters.
pub fn record_from_params(params: &RecordParams) -> TransactionRecord {
    TransactionRecord::create(&params.patient, &params.authority, params.date, params.amount)
}

/// Generate a chain of up to `max_len` appended records, all mined by one key.
pub fn chain(max_len: usize) -> impl Strategy<Value = Chain> {
    (keypair(), prop::collection::vec(any::<RecordParams>(), 0..=max_len)).prop_map(
        |(miner, records)| {
            let mut chain = Chain::initialize(&miner);
            for params in &records {
                chain.append(record_from_params(params), &miner);
            }
            chain
        },
    )
}

/// A single-field mutation of a signed record.
#[derive(Debug, Clone)]
pub enum RecordMutation {
    Date,
    Amount,
    PatientKey(Ed25519PublicKey),
    AuthorityKey(Ed25519PublicKey),
    PatientSignature(usize),
    AuthoritySignature(usize),
}

impl RecordMutation {
    /// Apply the mutation. Returns false if it would leave the record unchanged.
    pub fn apply(&self, tx: &mut TransactionRecord) -> bool {
        match self {
            RecordMutation::Date => {
                let next = tx.date.date().succ_opt().unwrap_or(tx.date.date());
                let changed = next != tx.date.date();
                tx.date = BillingDate::new(next);
                changed
            }
            RecordMutation::Amount => {
                tx.amount = Amount::from_cents(tx.amount.cents() ^ 1);
                true
            }
            RecordMutation::PatientKey(key) => {
                let changed = *key != tx.patient;
                tx.patient = *key;
                changed
            }
            RecordMutation::AuthorityKey(key) => {
                let changed = *key != tx.authority;
                tx.authority = *key;
                changed
            }
            RecordMutation::PatientSignature(byte) => {
                tx.patient_signature.0[byte % 64] ^= 0x01;
                true
            }
            RecordMutation::AuthoritySignature(byte) => {
                tx.authority_signature.0[byte % 64] ^= 0x01;
                true
            }
        }
    }

    /// Whether the patient signature check is the one that fails.
    pub fn breaks_patient_signature(&self) -> bool {
        !matches!(self, RecordMutation::AuthoritySignature(_))
    }
}

/// Generate a record mutation.
pub fn record_mutation() -> impl Strategy<Value = RecordMutation> {
    prop_oneof![
        Just(RecordMutation::Date),
        Just(RecordMutation::Amount),
        public_key().prop_map(RecordMutation::PatientKey),
        public_key().prop_map(RecordMutation::AuthorityKey),
        any::<usize>().prop_map(RecordMutation::PatientSignature),
        any::<usize>().prop_map(RecordMutation::AuthoritySignature),
    ]
}
