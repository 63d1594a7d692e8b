//! TransactionRecord: one billing event between a patient and a medical
//! authority.
//!
//! A record carries two signatures, produced in a fixed order:
//!
//! 1. the patient signs `Blake3(P)`, where `P` is the canonical payload
//!    (both public keys, date, amount);
//! 2. the authority signs `Blake3(P || patient_signature)`.
//!
//! The authority's signature therefore attests the patient's attestation.
//! Records are immutable once signed: any later change to a field is caught by
//! [`TransactionRecord::verify`].

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::canonical::{authority_message, transaction_payload};
use crate::crypto::{Blake3Hash, Ed25519PublicKey, Ed25519Signature, Keypair};
use crate::error::{CoreError, VerifyError};
use crate::types::{Amount, BillingDate};

/// A signed billing record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// The patient's exported public key.
    pub patient: Ed25519PublicKey,

    /// The medical authority's exported public key.
    pub authority: Ed25519PublicKey,

    /// Date of the billing event.
    pub date: BillingDate,

    /// Billed amount.
    pub amount: Amount,

    /// Patient signature over `Blake3(P)`.
    pub patient_signature: Ed25519Signature,

    /// Authority signature over `Blake3(P || patient_signature)`.
    pub authority_signature: Ed25519Signature,
}

impl TransactionRecord {
    /// Create and sign a record with both parties' key pairs.
    pub fn create(
        patient: &Keypair,
        authority: &Keypair,
        date: BillingDate,
        amount: Amount,
    ) -> Self {
        PendingTransaction::new(patient.public_key(), authority.public_key(), date, amount)
            .attach_patient_signature(patient)
            .attach_authority_signature(authority)
    }

    /// Create a record from the textual date and amount.
    ///
    /// Fails with `MalformedInput` before anything is signed if either value
    /// is not acceptable.
    pub fn create_from_text(
        patient: &Keypair,
        authority: &Keypair,
        date: &str,
        amount: &str,
    ) -> Result<Self, CoreError> {
        let date = BillingDate::parse(date)?;
        let amount = Amount::parse(amount)?;
        Ok(Self::create(patient, authority, date, amount))
    }

    /// The canonical payload `P` covered by the patient signature.
    pub fn payload_bytes(&self) -> Vec<u8> {
        transaction_payload(&self.patient, &self.authority, &self.date, &self.amount)
    }

    /// Check both signatures, patient first.
    ///
    /// Deterministic and read-only. A change to the keys, date, amount or
    /// patient signature is reported as `PatientSignatureInvalid`, since all
    /// of them feed the first digest; only a bad authority signature reaches
    /// `AuthoritySignatureInvalid`.
    pub fn verify(&self) -> Result<(), VerifyError> {
        let payload = self.payload_bytes();

        self.patient
            .verify_digest(&Blake3Hash::hash(&payload), &self.patient_signature)
            .map_err(|_| VerifyError::PatientSignatureInvalid)?;

        let countersigned = authority_message(&payload, &self.patient_signature);
        self.authority
            .verify_digest(&Blake3Hash::hash(&countersigned), &self.authority_signature)
            .map_err(|_| VerifyError::AuthoritySignatureInvalid)
    }

    /// Whether both signatures check out.
    pub fn is_valid(&self) -> bool {
        self.verify().is_ok()
    }

    /// The display line followed by the verification verdict, e.g.
    /// `2021-03-14  $128.50(valid)`.
    pub fn report_line(&self) -> String {
        let verdict = if self.is_valid() { "valid" } else { "invalid" };
        format!("{self}({verdict})")
    }
}

impl fmt::Display for TransactionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}  ${}", self.date, self.amount)
    }
}

/// A record whose payload is fixed but which nobody has signed yet.
///
/// Lets the patient and the authority sign on separate machines while keeping
/// the order of the two signatures explicit.
#[derive(Debug, Clone)]
pub struct PendingTransaction {
    patient: Ed25519PublicKey,
    authority: Ed25519PublicKey,
    date: BillingDate,
    amount: Amount,
    payload: Vec<u8>,
}

impl PendingTransaction {
    pub fn new(
        patient: Ed25519PublicKey,
        authority: Ed25519PublicKey,
        date: BillingDate,
        amount: Amount,
    ) -> Self {
        let payload = transaction_payload(&patient, &authority, &date, &amount);
        Self {
            patient,
            authority,
            date,
            amount,
            payload,
        }
    }

    /// The digest the patient signs.
    pub fn patient_digest(&self) -> Blake3Hash {
        Blake3Hash::hash(&self.payload)
    }

    /// Sign as the patient named in the payload.
    pub fn sign_as_patient(self, patient: &Keypair) -> Result<PatientSigned, CoreError> {
        if patient.public_key() != self.patient {
            return Err(CoreError::MalformedInput(
                "keypair does not match the record's patient key".into(),
            ));
        }
        Ok(self.attach_patient_signature(patient))
    }

    fn attach_patient_signature(self, patient: &Keypair) -> PatientSigned {
        let patient_signature = patient.sign_digest(&self.patient_digest());
        PatientSigned {
            pending: self,
            patient_signature,
        }
    }
}

/// A record signed by the patient, awaiting the authority's countersignature.
#[derive(Debug, Clone)]
pub struct PatientSigned {
    pending: PendingTransaction,
    patient_signature: Ed25519Signature,
}

impl PatientSigned {
    /// The patient's signature.
    pub fn patient_signature(&self) -> &Ed25519Signature {
        &self.patient_signature
    }

    /// The digest the authority signs: `Blake3(P || patient_signature)`.
    pub fn authority_digest(&self) -> Blake3Hash {
        Blake3Hash::hash(&authority_message(
            &self.pending.payload,
            &self.patient_signature,
        ))
    }

    /// Countersign as the authority named in the payload.
    ///
    /// The patient signature is checked first; an authority never
    /// countersigns an attestation that does not hold.
    pub fn sign_as_authority(self, authority: &Keypair) -> Result<TransactionRecord, CoreError> {
        if authority.public_key() != self.pending.authority {
            return Err(CoreError::MalformedInput(
                "keypair does not match the record's authority key".into(),
            ));
        }
        self.pending
            .patient
            .verify_digest(&self.pending.patient_digest(), &self.patient_signature)?;
        Ok(self.attach_authority_signature(authority))
    }

    fn attach_authority_signature(self, authority: &Keypair) -> TransactionRecord {
        let authority_signature = authority.sign_digest(&self.authority_digest());
        let PendingTransaction {
            patient,
            authority: authority_key,
            date,
            amount,
            ..
        } = self.pending;

        TransactionRecord {
            patient,
            authority: authority_key,
            date,
            amount,
            patient_signature: self.patient_signature,
            authority_signature,
        }
    }
}
