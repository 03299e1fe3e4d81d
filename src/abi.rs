//! The proof statement: public input/output layout, suite registry, and
//! witness marshalling (spec §4.2).
//!
//! The prover knows `(nullifier_seed, blinding_factor, credential_fields,
//! signature, identity_index)` such that:
//!
//! 1. `C = Pedersen(nullifier_seed, blinding_factor)` and
//!    `C == credential.commitment`;
//! 2. `SchnorrVerify(facilitator_pubkey, m, signature)` holds, where
//!    `m = poseidon_h7(service_id, tier, identity_budget, issued_at,
//!    expires_at, C.x, C.y)`;
//! 3. `credential.service_id == public.service_id`;
//! 4. `credential.expires_at >= public.current_time`;
//! 5. `identity_index < credential.identity_budget`;
//! 6. `origin_token = poseidon_h3(nullifier_seed, origin_id, identity_index)`;
//! 7. the circuit emits `(origin_token, tier)` as public outputs.
//!
//! ## Public I/O layout (spec §9 Open Question 1)
//!
//! Two source paths disagreed on whether `expires_at` is a public input
//! alongside the statement's other public values, or stays purely
//! private (constrained only via inequality #4 above). This suite picks
//! the 8-element vector that *includes* `expires_at`, so that a verifier
//! can read the credential's expiry straight back out of the proof's
//! public outputs without a side channel:
//!
//! ```text
//! inputs:  [service_id, current_time, origin_id, pk.x, pk.y]      (5)
//! outputs: [origin_token, tier, expires_at]                       (3)
//! ```
//!
//! giving `PUBLIC_IO_LEN = 8`. Per spec invariant 7, any verifier MUST
//! reject a public-input/output vector shorter than `MIN_PUBLIC_IO_LEN`
//! (the 7-element statement-only length, kept as the floor so a future
//! suite that drops `expires_at` from the public outputs remains
//! acceptable without a breaking change here).

#![allow(dead_code)]

use serde::{Deserialize, Serialize};

use crate::F;

/// The single registered suite in v0.2.0.
pub const SUITE_PEDERSEN_SCHNORR_POSEIDON_ULTRAHONK: &str =
    "pedersen-schnorr-poseidon-ultrahonk";

/// Closed registry of proof suites this crate understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SuiteId {
    PedersenSchnorrPoseidonUltrahonk,
}

impl SuiteId {
    pub fn as_str(self) -> &'static str {
        match self {
            SuiteId::PedersenSchnorrPoseidonUltrahonk => {
                SUITE_PEDERSEN_SCHNORR_POSEIDON_ULTRAHONK
            }
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            SUITE_PEDERSEN_SCHNORR_POSEIDON_ULTRAHONK => {
                Some(SuiteId::PedersenSchnorrPoseidonUltrahonk)
            }
            _ => None,
        }
    }
}

/// Number of public input elements: `[service_id, current_time,
/// origin_id, pk.x, pk.y]`.
pub const PUBLIC_INPUT_LEN: usize = 5;

/// Number of public output elements: `[origin_token, tier, expires_at]`.
pub const PUBLIC_OUTPUT_LEN: usize = 3;

/// Concatenated public I/O length normative for this suite.
pub const PUBLIC_IO_LEN: usize = PUBLIC_INPUT_LEN + PUBLIC_OUTPUT_LEN;

/// The statement-only floor (inputs + `{origin_token, tier}` only, no
/// `expires_at`): the minimum length any verifier implementation of this
/// spec must accept without rejecting as too short (spec invariant 7).
pub const MIN_PUBLIC_IO_LEN: usize = PUBLIC_INPUT_LEN + 2;

/// The normative public-input vector, in order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PublicInputs {
    pub service_id: F,
    pub current_time: F,
    pub origin_id: F,
    pub facilitator_pubkey_x: F,
    pub facilitator_pubkey_y: F,
}

impl PublicInputs {
    pub fn to_vec(self) -> Vec<F> {
        vec![
            self.service_id,
            self.current_time,
            self.origin_id,
            self.facilitator_pubkey_x,
            self.facilitator_pubkey_y,
        ]
    }
}

/// The normative public-output vector, in order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PublicOutputs {
    pub origin_token: F,
    pub tier: u32,
    pub expires_at: i64,
}

impl PublicOutputs {
    /// Parse the trailing `PUBLIC_OUTPUT_LEN` elements of a verifier's
    /// returned public I/O vector. `tier` and `expires_at` round-trip
    /// through `F` since the circuit only speaks field elements.
    pub fn from_tail(io: &[F]) -> Option<Self> {
        if io.len() < MIN_PUBLIC_IO_LEN {
            return None;
        }
        // Two accepted shapes: the full 3-element tail (origin_token, tier,
        // expires_at) when the proof includes expires_at as a public
        // output, or the 2-element statement-only tail when it doesn't.
        if io.len() >= PUBLIC_IO_LEN {
            let tail = &io[io.len() - PUBLIC_OUTPUT_LEN..];
            Some(Self {
                origin_token: tail[0],
                tier: field_to_u32(tail[1])?,
                expires_at: field_to_i64(tail[2])?,
            })
        } else {
            let tail = &io[io.len() - 2..];
            Some(Self {
                origin_token: tail[0],
                tier: field_to_u32(tail[1])?,
                expires_at: 0,
            })
        }
    }
}

fn field_to_u32(x: F) -> Option<u32> {
    use ark_ff::{BigInteger, PrimeField};
    let bytes = x.into_bigint().to_bytes_be();
    if bytes.iter().take(bytes.len().saturating_sub(4)).any(|&b| b != 0) {
        return None;
    }
    let mut buf = [0u8; 4];
    let n = bytes.len().min(4);
    buf[4 - n..].copy_from_slice(&bytes[bytes.len() - n..]);
    Some(u32::from_be_bytes(buf))
}

fn field_to_i64(x: F) -> Option<i64> {
    use ark_ff::{BigInteger, PrimeField};
    let bytes = x.into_bigint().to_bytes_be();
    if bytes.iter().take(bytes.len().saturating_sub(8)).any(|&b| b != 0) {
        return None;
    }
    let mut buf = [0u8; 8];
    let n = bytes.len().min(8);
    buf[8 - n..].copy_from_slice(&bytes[bytes.len() - n..]);
    u64::from_be_bytes(buf).try_into().ok()
}

/// The private witness a client assembles to generate a proof.
#[derive(Debug, Clone)]
pub struct Witness {
    pub nullifier_seed: F,
    pub blinding_factor: F,
    pub service_id: F,
    pub tier: u32,
    pub identity_budget: u32,
    pub issued_at: i64,
    pub expires_at: i64,
    pub commitment_x: F,
    pub commitment_y: F,
    pub facilitator_pubkey_x: F,
    pub facilitator_pubkey_y: F,
    pub signature_r_x: F,
    pub signature_r_y: F,
    pub signature_s: crate::crypto::Scalar,
    pub identity_index: u32,
}

/// Bytes produced by a `Prover` and consumed by a `Verifier` (spec §6
/// collaborator interfaces). Opaque to this crate beyond its length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofBytes(#[serde(with = "serde_bytes_base64")] pub Vec<u8>);

impl ProofBytes {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

mod serde_bytes_base64 {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Vec<u8>, s: S) -> Result<S::Ok, S::Error> {
        base64::engine::general_purpose::STANDARD
            .encode(bytes)
            .serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        base64::engine::general_purpose::STANDARD
            .decode(s.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
