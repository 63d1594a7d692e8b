//! Golden test vectors for deterministic encoding.
//!
//! Public keys, payload bytes and content hashes are pinned, so a change to
//! key derivation or to either canonical layout fails a test.

use medledger_core::{Amount, BillingDate, Blake3Hash, Chain, Keypair, TransactionRecord};

/// A golden test vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Patient key seed.
    pub patient_seed: [u8; 32],
    /// Authority key seed.
    pub authority_seed: [u8; 32],
    /// Billing date, `YYYY-MM-DD`.
    pub date: &'static str,
    /// Amount as entered.
    pub amount: &'static str,
    /// Expected patient public key (hex).
    pub expected_patient_pk: &'static str,
    /// Expected authority public key (hex).
    pub expected_authority_pk: &'static str,
    /// Expected canonical payload (hex).
    pub expected_payload_hex: &'static str,
    /// Expected content hash of the record appended at seq 1 (hex).
    pub expected_content_hash: &'static str,
}

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "Pi day clinic visit",
            patient_seed: [0x11; 32],
            authority_seed: [0x22; 32],
            date: "2021-03-14",
            amount: "128.50",
            expected_patient_pk: "d04ab232742bb4ab3a1368bd4615e4e6d0224ab71a016baf8520a332c9778737",
            expected_authority_pk:
                "a09aa5f47a6759802ff955f8dc2d2a14a5c99d23be97f864127ff9383455a4f0",
            expected_payload_hex: concat!(
                "a4005820d04ab232742bb4ab3a1368bd4615e4e6d0224ab71a016baf8520a332c9778737",
                "015820a09aa5f47a6759802ff955f8dc2d2a14a5c99d23be97f864127ff9383455a4f0",
                "026a323032312d30332d3134",
                "03663132382e3530",
            ),
            expected_content_hash:
                "8abeaa967d4f8842dfdaa5df3bd2606b1a0a5767df2d3251b708fb2826a49bcc",
        },
        GoldenVector {
            name: "Zero amount on the last day of the century",
            patient_seed: [0x01; 32],
            authority_seed: [0x02; 32],
            date: "1999-12-31",
            amount: "0",
            expected_patient_pk: "8a88e3dd7409f195fd52db2d3cba5d72ca6709bf1d94121bf3748801b40f6f5c",
            expected_authority_pk:
                "8139770ea87d175f56a35466c34c7ecccb8d8a91b4ee37a25df60f5b8fc9b394",
            expected_payload_hex: concat!(
                "a40058208a88e3dd7409f195fd52db2d3cba5d72ca6709bf1d94121bf3748801b40f6f5c",
                "0158208139770ea87d175f56a35466c34c7ecccb8d8a91b4ee37a25df60f5b8fc9b394",
                "026a313939392d31322d3331",
                "0364302e3030",
            ),
            expected_content_hash:
                "19dcb906d3440a005b7092cae4d272998e41ff3dc6972d1b74156fb67727fd00",
        },
        GoldenVector {
            name: "Leap day surgery",
            patient_seed: [0x00; 32],
            authority_seed: [0xff; 32],
            date: "2024-02-29",
            amount: "1234567.89",
            expected_patient_pk: "3b6a27bcceb6a42d62a3a8d02a6f0d73653215771de243a63ac048a18b59da29",
            expected_authority_pk:
                "76a1592044a6e4f511265bca73a604d90b0529d1df602be30a19a9257660d1f5",
            expected_payload_hex: concat!(
                "a40058203b6a27bcceb6a42d62a3a8d02a6f0d73653215771de243a63ac048a18b59da29",
                "01582076a1592044a6e4f511265bca73a604d90b0529d1df602be30a19a9257660d1f5",
                "026a323032342d30322d3239",
                "036a313233343536372e3839",
            ),
            expected_content_hash:
                "d68595134b874f9618d60f6f3447a0b94691c11e173e28209e59eb4d0c3617ed",
        },
    ]
}

/// Build the signed record a vector describes.
///
/// # Panics
///
/// If the vector's date or amount text does not parse.
pub fn generate_record_from_vector(vector: &GoldenVector) -> TransactionRecord {
    let patient = Keypair::from_seed(&vector.patient_seed);
    let authority = Keypair::from_seed(&vector.authority_seed);
    let date = BillingDate::parse(vector.date).expect("vector date parses");
    let amount = Amount::parse(vector.amount).expect("vector amount parses");
    TransactionRecord::create(&patient, &authority, date, amount)
}

/// Content hash of the vector's record appended at seq 1 after a genesis
/// mined by a fixed key.
pub fn content_hash_for_vector(vector: &GoldenVector) -> Blake3Hash {
    let miner = Keypair::from_seed(&[0x33; 32]);
    let mut chain = Chain::initialize(&miner);
    chain.append(generate_record_from_vector(vector), &miner).content_hash
}

/// Check one vector: `(matches, payload_hex, content_hash_hex)`.
///
/// Both expectations must be present and equal; an empty one never matches.
pub fn check_vector(vector: &GoldenVector) -> (bool, String, String) {
    let payload = hex::encode(generate_record_from_vector(vector).payload_bytes());
    let content_hash = content_hash_for_vector(vector).to_hex();

    let matches = !vector.expected_payload_hex.is_empty()
        && !vector.expected_content_hash.is_empty()
        && payload == vector.expected_payload_hex
        && content_hash == vector.expected_content_hash;

    (matches, payload, content_hash)
}

/// Check every vector.
///
/// Returns `(name, matches, payload_hex, content_hash_hex)` per vector.
pub fn verify_all_vectors() -> Vec<(String, bool, String, String)> {
    all_vectors()
        .iter()
        .map(|v| {
            let (matches, payload, content_hash) = check_vector(v);
            (v.name.to_string(), matches, payload, content_hash)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_keys_match() {
        for vector in all_vectors() {
            let record = generate_record_from_vector(&vector);
            assert_eq!(record.patient.to_hex(), vector.expected_patient_pk, "{}", vector.name);
            assert_eq!(record.authority.to_hex(), vector.expected_authority_pk, "{}", vector.name);
        }
    }

    #[test]
    fn test_all_vectors_match() {
        for (name, matches, payload, content_hash) in verify_all_vectors() {
            assert!(
                matches,
                "Vector '{}' produced payload {} and content hash {}",
                name, payload, content_hash
            );
        }
    }

    #[test]
    fn test_content_hashes_pinned() {
        for vector in all_vectors() {
            assert_eq!(
                content_hash_for_vector(&vector).to_hex(),
                vector.expected_content_hash,
                "{}",
                vector.name
            );
        }
    }

    #[test]
    fn test_empty_expectation_fails() {
        let mut vector = all_vectors().remove(0);
        vector.expected_content_hash = "";
        assert!(!check_vector(&vector).0);

        let mut vector = all_vectors().remove(0);
        vector.expected_payload_hex = "";
        assert!(!check_vector(&vector).0);
    }

    #[test]
    fn test_vectors_verify() {
        for vector in all_vectors() {
            assert_eq!(generate_record_from_vector(&vector).verify(), Ok(()));
        }
    }

    #[test]
    fn test_vectors_are_deterministic() {
        for vector in all_vectors() {
            let r1 = generate_record_from_vector(&vector);
            let r2 = generate_record_from_vector(&vector);

            // Ed25519 signatures are deterministic
            assert_eq!(r1, r2, "Vector '{}' differs on regeneration", vector.name);
            assert_eq!(content_hash_for_vector(&vector), content_hash_for_vector(&vector));
        }
    }

    #[test]
    fn test_different_amounts_different_hashes() {
        let mut v1 = all_vectors().remove(0);
        let mut v2 = v1.clone();
        v1.amount = "128.50";
        v2.amount = "128.51";

        assert_ne!(content_hash_for_vector(&v1), content_hash_for_vector(&v2));
    }
}
