//! The credential record, on the wire and as held client-side
//! (spec §3 Credential / StoredCredential).

#![allow(dead_code)]

use serde::{Deserialize, Serialize};

use crate::abi::{SuiteId, SUITE_PEDERSEN_SCHNORR_POSEIDON_ULTRAHONK};
use crate::crypto::poseidon::poseidon_h7;
use crate::crypto::{pedersen_commit, Point};
use crate::F;

/// An immutable record created by the facilitator, returned to the
/// client, and proved about by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub suite: String,
    #[serde(with = "crate::wire::field_hex")]
    pub service_id: F,
    pub tier: u32,
    pub identity_budget: u32,
    pub issued_at: i64,
    pub expires_at: i64,
    /// Suite-prefixed uncompressed point: `"<suite>:0x04||X||Y"`.
    pub commitment: String,
    /// `R.x || R.y || s`, each 32 bytes, as `0x`-prefixed hex.
    pub signature: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CredentialError {
    #[error("unsupported_suite")]
    UnsupportedSuite,
    #[error("malformed commitment encoding: {0}")]
    MalformedCommitment(String),
    #[error("malformed signature encoding: {0}")]
    MalformedSignature(String),
}

impl Credential {
    pub fn suite_id(&self) -> Option<SuiteId> {
        SuiteId::parse(&self.suite)
    }

    /// The message signed by the facilitator:
    /// `poseidon_h7(service_id, tier, identity_budget, issued_at,
    /// expires_at, C.x, C.y)`.
    pub fn signed_message(&self) -> Result<F, CredentialError> {
        let point = self.commitment_point()?;
        Ok(poseidon_h7(
            self.service_id,
            F::from(self.tier as u64),
            F::from(self.identity_budget as u64),
            F::from(self.issued_at as u64),
            F::from(self.expires_at as u64),
            point.x(),
            point.y(),
        ))
    }

    /// Decode `commitment` into a curve point, checking the suite prefix.
    pub fn commitment_point(&self) -> Result<Point, CredentialError> {
        let prefix = format!("{}:", SUITE_PEDERSEN_SCHNORR_POSEIDON_ULTRAHONK);
        let hex = self
            .commitment
            .strip_prefix(&prefix)
            .ok_or(CredentialError::UnsupportedSuite)?;
        Point::decode_uncompressed(hex)
            .map_err(|e| CredentialError::MalformedCommitment(e.to_string()))
    }

    /// Decode `signature` (`0x` + `R.x` + `R.y` + `s`, each 32 bytes) into
    /// its point and scalar parts, as a client assembling a proof witness
    /// needs (spec §4.2 proof statement, input 2).
    pub fn signature_parts(&self) -> Result<(Point, crate::crypto::Scalar), CredentialError> {
        let hex = self.signature.strip_prefix("0x").unwrap_or(&self.signature);
        let bytes = hex::decode(hex)
            .map_err(|e| CredentialError::MalformedSignature(e.to_string()))?;
        if bytes.len() != 96 {
            return Err(CredentialError::MalformedSignature(format!(
                "expected 96 bytes (R.x||R.y||s), got {}",
                bytes.len()
            )));
        }
        let rx = crate::crypto::decode_field(&format!("0x{}", hex::encode(&bytes[0..32])))
            .map_err(|e| CredentialError::MalformedSignature(e.to_string()))?;
        let ry = crate::crypto::decode_field(&format!("0x{}", hex::encode(&bytes[32..64])))
            .map_err(|e| CredentialError::MalformedSignature(e.to_string()))?;
        let r = Point::new(rx, ry).map_err(|e| CredentialError::MalformedSignature(e.to_string()))?;
        use ark_ff::PrimeField;
        let s = crate::crypto::Scalar::from_be_bytes_mod_order(&bytes[64..96]);
        Ok((r, s))
    }
}

/// Client-local extension of [`Credential`]: wire credential plus the
/// client-held secrets and usage counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCredential {
    pub credential: Credential,
    #[serde(with = "crate::wire::field_hex")]
    pub nullifier_seed: F,
    #[serde(with = "crate::wire::field_hex")]
    pub blinding_factor: F,
    /// `0x04||X||Y` uncompressed, no suite prefix (internal storage only).
    pub facilitator_pubkey: String,
    pub presentation_count: u32,
    pub obtained_at: i64,
}

/// Validity state derived from `(now, expires_at, presentation_count,
/// identity_budget)` (spec invariant 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialStatus {
    Valid,
    Expired,
    Exhausted,
}

impl StoredCredential {
    /// Verify invariant 1: the stored commitment matches
    /// `Pedersen(nullifier_seed, blinding_factor)`.
    pub fn verify_commitment(&self) -> Result<bool, CredentialError> {
        let claimed = self.credential.commitment_point()?;
        let recomputed = pedersen_commit(self.nullifier_seed, self.blinding_factor);
        Ok(claimed == recomputed)
    }

    pub fn status(&self, now: i64) -> CredentialStatus {
        if now >= self.credential.expires_at {
            CredentialStatus::Expired
        } else if self.presentation_count >= self.credential.identity_budget {
            CredentialStatus::Exhausted
        } else {
            CredentialStatus::Valid
        }
    }

    pub fn is_usable(&self, now: i64) -> bool {
        self.status(now) == CredentialStatus::Valid
    }
}
