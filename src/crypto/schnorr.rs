//! Schnorr signatures over Grumpkin, bound to Poseidon for the challenge.
//!
//! `R = k·G`, `e = Poseidon([R.x, R.y, pk.x, pk.y, m])`,
//! `s = (k + e·sk) mod n`. These signatures are not intended for
//! Ethereum-style `ecrecover` — the canonical verifier for this suite is
//! the circuit itself (spec §4.1); the verifier below exists for
//! completeness and is used by this crate's own tests.

#![allow(dead_code)]

use ark_ff::{BigInteger, PrimeField, UniformRand, Zero};

use super::curve::{CurveError, Point, Scalar};
use super::field::FieldReduce;
use super::poseidon::poseidon;
use crate::F;

/// `(R, s)`. `s` is transmitted on the wire split into 128-bit low/high
/// halves by the proof ABI layer, not by this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchnorrSignature {
    pub r: Point,
    pub s: Scalar,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SchnorrError {
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    #[error(transparent)]
    Curve(#[from] CurveError),
}

/// The curve's canonical generator, used as the Schnorr base point.
pub fn base_point() -> Point {
    super::curve::try_and_increment("schnorr-base-point")
}

/// Derive the public key `pk = sk·G` for a nonzero secret scalar.
pub fn derive_pubkey(sk: &Scalar) -> Result<Point, SchnorrError> {
    if sk.is_zero() {
        return Err(SchnorrError::InvalidInput("sk == 0"));
    }
    Ok(base_point().scalar_mul(sk))
}

fn challenge(r: &Point, pk: &Point, m: F) -> Scalar {
    let e = poseidon(&[r.x(), r.y(), pk.x(), pk.y(), m]);
    e.reduce_to_scalar()
}

/// Sample `k` uniformly in `[1, n)`, compute `R = k·G`,
/// `e = Poseidon([R.x, R.y, pk.x, pk.y, m])`, `s = (k + e·sk) mod n`.
///
/// Errors with `InvalidInput` if `sk == 0`; `m` is always a valid field
/// element by construction (a negative-message case does not arise for an
/// unsigned field type).
pub fn schnorr_sign(sk: &Scalar, m: F) -> Result<SchnorrSignature, SchnorrError> {
    if sk.is_zero() {
        return Err(SchnorrError::InvalidInput("sk == 0"));
    }
    let pk = derive_pubkey(sk)?;
    let mut rng = rand::rngs::OsRng;
    let k = loop {
        let candidate = Scalar::rand(&mut rng);
        if !candidate.is_zero() {
            break candidate;
        }
    };
    let r = base_point().scalar_mul(&k);
    let e = challenge(&r, &pk, m);
    let s = k + e * sk;
    Ok(SchnorrSignature { r, s })
}

/// Verify a signature. Present for specification completeness and this
/// crate's own property tests — the canonical verifier for this suite is
/// the circuit (spec §4.1). Fails (`false`) if the public key is off-curve
/// or at infinity, which [`Point`] already guarantees cannot be
/// constructed outside this module, so the only remaining failure mode is
/// the Schnorr equation itself.
pub fn schnorr_verify(pk: &Point, m: F, sig: &SchnorrSignature) -> bool {
    let e = challenge(&sig.r, pk, m);
    let lhs = base_point().scalar_mul(&sig.s);
    let rhs = sig.r.add(&pk.scalar_mul(&e));
    lhs == rhs
}

/// Split `s` into 128-bit low/high halves (big-endian bytes), matching the
/// wire ABI's scalar transmission format.
pub fn split_scalar(s: &Scalar) -> (u128, u128) {
    let bytes = s.into_bigint().to_bytes_be();
    let mut padded = [0u8; 32];
    let start = 32 - bytes.len();
    padded[start..].copy_from_slice(&bytes);
    let mut hi = [0u8; 16];
    let mut lo = [0u8; 16];
    hi.copy_from_slice(&padded[..16]);
    lo.copy_from_slice(&padded[16..]);
    (u128::from_be_bytes(lo), u128::from_be_bytes(hi))
}
