//! Cryptographic primitives for MedLedger.
//!
//! Ed25519 signatures and Blake3 digests behind fixed-width newtypes. Every
//! signature in the ledger is taken over a 32-byte Blake3 digest, never over
//! raw payload bytes.
//!
//! Keys, digests and signatures all serialize as lowercase hex.

use std::fmt;

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoreError;

/// Implements the shared surface of a fixed-width byte newtype: raw and hex
/// conversions, `AsRef`, `From`, a short `Debug` and hex serde.
macro_rules! byte_newtype {
    ($name:ident, $len:literal, $label:literal) => {
        impl $name {
            /// Number of bytes.
            pub const LEN: usize = $len;

            pub const fn from_bytes(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            pub const fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            /// Lowercase hex.
            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }

            /// Parse exactly `2 * LEN` hex digits.
            pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
                let mut bytes = [0u8; $len];
                hex::decode_to_slice(s, &mut bytes)?;
                Ok(Self(bytes))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                // Eight bytes are enough to tell values apart in logs.
                write!(f, concat!($label, "({}..)"), hex::encode(&self.0[..8]))
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Self::from_hex(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

/// A Blake3 digest. Block content hashes and signed digests use this type.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Blake3Hash(pub [u8; 32]);

byte_newtype!(Blake3Hash, 32, "Blake3");

impl Blake3Hash {
    /// All zero bytes. Never the digest of real data.
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn hash(data: &[u8]) -> Self {
        Self(blake3::hash(data).into())
    }
}

impl fmt::Display for Blake3Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// An exported Ed25519 public key.
///
/// The bytes are not checked to be a curve point until a signature is
/// verified against them.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ed25519PublicKey(pub [u8; 32]);

byte_newtype!(Ed25519PublicKey, 32, "PublicKey");

impl Ed25519PublicKey {
    /// Check `signature` over `message`.
    ///
    /// Returns `InvalidPublicKey` when the key bytes do not import, and
    /// `InvalidSignature` when the check itself fails.
    pub fn verify(&self, message: &[u8], signature: &Ed25519Signature) -> Result<(), CoreError> {
        let key = VerifyingKey::from_bytes(&self.0).map_err(|_| CoreError::InvalidPublicKey)?;
        key.verify(message, &Signature::from_bytes(&signature.0))
            .map_err(|_| CoreError::InvalidSignature)
    }

    pub fn verify_digest(
        &self,
        digest: &Blake3Hash,
        signature: &Ed25519Signature,
    ) -> Result<(), CoreError> {
        self.verify(digest.as_bytes(), signature)
    }
}

impl fmt::Display for Ed25519PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// An Ed25519 signature.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Ed25519Signature(pub [u8; 64]);

byte_newtype!(Ed25519Signature, 64, "Signature");

/// A key pair held by a patient, an authority or the miner.
///
/// Records, blocks and chains never own one. They store the exported
/// [`Ed25519PublicKey`] and borrow the pair only while signing.
#[derive(Clone)]
pub struct Keypair(SigningKey);

impl Keypair {
    /// A fresh key pair from the thread RNG.
    pub fn generate() -> Self {
        Self(SigningKey::generate(&mut rand::thread_rng()))
    }

    /// A deterministic key pair. Intended for tests and fixed vectors.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self(SigningKey::from_bytes(seed))
    }

    /// The canonical export of this pair's public half.
    pub fn public_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey(self.0.verifying_key().to_bytes())
    }

    pub fn sign(&self, message: &[u8]) -> Ed25519Signature {
        Ed25519Signature(self.0.sign(message).to_bytes())
    }

    pub fn sign_digest(&self, digest: &Blake3Hash) -> Ed25519Signature {
        self.sign(digest.as_bytes())
    }

    /// Secret seed bytes.
    pub fn seed(&self) -> [u8; 32] {
        self.0.to_bytes()
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Keypair").field(&self.public_key()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_binds_message_and_key() {
        let patient = Keypair::from_seed(&[0x11; 32]);
        let other = Keypair::from_seed(&[0x12; 32]);
        let signature = patient.sign(b"visit 2021-03-14");

        assert!(patient.public_key().verify(b"visit 2021-03-14", &signature).is_ok());
        assert!(matches!(
            patient.public_key().verify(b"visit 2021-03-15", &signature),
            Err(CoreError::InvalidSignature)
        ));
        assert!(matches!(
            other.public_key().verify(b"visit 2021-03-14", &signature),
            Err(CoreError::InvalidSignature)
        ));
    }

    #[test]
    fn test_digest_signature_binds_digest() {
        let keypair = Keypair::from_seed(&[0x11; 32]);
        let digest = Blake3Hash::hash(b"claim #1");
        let signature = keypair.sign_digest(&digest);

        assert!(keypair.public_key().verify_digest(&digest, &signature).is_ok());

        let other = Blake3Hash::hash(b"claim #2");
        assert!(matches!(
            keypair.public_key().verify_digest(&other, &signature),
            Err(CoreError::InvalidSignature)
        ));
    }

    #[test]
    fn test_seed_is_stable() {
        let seed = [0x5a; 32];
        let a = Keypair::from_seed(&seed);
        assert_eq!(a.seed(), seed);
        assert_eq!(a.public_key(), Keypair::from_seed(&a.seed()).public_key());
        assert_ne!(a.public_key(), Keypair::generate().public_key());
    }

    #[test]
    fn test_known_public_key() {
        assert_eq!(
            Keypair::from_seed(&[0x11; 32]).public_key().to_hex(),
            "d04ab232742bb4ab3a1368bd4615e4e6d0224ab71a016baf8520a332c9778737"
        );
    }

    #[test]
    fn test_zero_hash_is_not_hash_of_zeros() {
        assert_ne!(Blake3Hash::hash(&[0u8; 32]), Blake3Hash::ZERO);
        assert_eq!(Blake3Hash::hash(b"a"), Blake3Hash::hash(b"a"));
    }

    #[test]
    fn test_hex_parsing_is_exact_width() {
        let pk = Keypair::from_seed(&[9; 32]).public_key();
        assert_eq!(Ed25519PublicKey::from_hex(&pk.to_hex()).unwrap(), pk);

        assert!(Ed25519Signature::from_hex(&"ab".repeat(63)).is_err());
        assert!(Ed25519Signature::from_hex(&"ab".repeat(65)).is_err());
        assert!(Ed25519Signature::from_hex(&"ab".repeat(64)).is_ok());
        assert!(Blake3Hash::from_hex("zz").is_err());
    }

    #[test]
    fn test_debug_is_abbreviated() {
        let hash = Blake3Hash::from_bytes([0xab; 32]);
        assert_eq!(format!("{hash:?}"), "Blake3(abababababababab..)");
        assert_eq!(hash.to_string().len(), 64);
    }

    #[test]
    fn test_serde_as_hex() {
        let sig = Keypair::from_seed(&[7; 32]).sign(b"x");
        let json = serde_json::to_string(&sig).unwrap();
        assert_eq!(json, format!("\"{}\"", sig.to_hex()));
        assert_eq!(serde_json::from_str::<Ed25519Signature>(&json).unwrap(), sig);

        let pk = Keypair::from_seed(&[7; 32]).public_key();
        let json = serde_json::to_string(&pk).unwrap();
        assert_eq!(serde_json::from_str::<Ed25519PublicKey>(&json).unwrap(), pk);
        assert!(serde_json::from_str::<Blake3Hash>("\"00\"").is_err());
    }

    #[test]
    fn test_garbage_public_key_fails_import() {
        let sig = Keypair::from_seed(&[3; 32]).sign(b"m");

        // Not every 32-byte string is a curve point.
        let bad = (0u8..=255)
            .map(|b| {
                let mut bytes = [0xffu8; 32];
                bytes[0] = b;
                Ed25519PublicKey(bytes)
            })
            .find(|pk| VerifyingKey::from_bytes(pk.as_bytes()).is_err())
            .expect("some non-canonical point");

        assert!(matches!(bad.verify(b"m", &sig), Err(CoreError::InvalidPublicKey)));
    }
}
