//! # MedLedger Testkit
//!
//! Testing utilities for MedLedger.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Pinned keys and payload bytes for fixed inputs
//! - **Generators**: Proptest strategies for records, chains and tampering
//! - **Fixtures**: Patient, authority and miner keys with ready-made chains
//!
//! ## Golden Vectors
//!
//! ```rust
//! use medledger_testkit::vectors::{all_vectors, content_hash_for_vector};
//!
//! for vector in all_vectors() {
//!     println!("{}: {}", vector.name, content_hash_for_vector(&vector).to_hex());
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use medledger_testkit::generators::{record_from_params, RecordParams};
//!
//! proptest! {
//!     #[test]
//!     fn records_verify(params: RecordParams) {
//!         prop_assert!(record_from_params(&params).is_valid());
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use medledger_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::new();
//! let chain = fixture.chain_with(3);
//! assert_eq!(chain.verify(), Ok(3));
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{multi_party_fixtures, nth_date, TestFixture};
pub use generators::{record_from_params, RecordParams};
pub use vectors::{
    all_vectors, check_vector, content_hash_for_vector, generate_record_from_vector,
    verify_all_vectors, GoldenVector,
};
