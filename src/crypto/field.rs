//! Field element encodings and the `stringToField` mapping.
//!
//! The scalar field is `F = ark_bn254::Fr`, order
//! `p = 21888242871839275222246405745257275088548364400416034343698184575808495617`
//! give or take the exact digit string arkworks compiles in — callers must
//! never hardcode `p`; go through `F` and let arkworks reduce.

#![allow(dead_code)]

use ark_ff::{BigInteger, PrimeField, UniformRand};
use rand::RngCore;

use crate::F;

/// Errors from field element encoding/decoding.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FieldError {
    #[error("hex string has odd length or contains non-hex characters")]
    BadHex,
    #[error("encoded field element is not exactly 32 bytes")]
    BadLength { got: usize },
}

/// Encode a field element as `"0x"` followed by 64 lowercase hex digits,
/// big-endian, left-padded with zeros.
pub fn encode_field(x: &F) -> String {
    let bytes = x.into_bigint().to_bytes_be();
    let mut padded = [0u8; 32];
    let start = 32 - bytes.len();
    padded[start..].copy_from_slice(&bytes);
    format!("0x{}", hex::encode(padded))
}

/// Decode a `"0x"`-prefixed (or bare) hex string into a field element.
///
/// Rejects non-hex input. A decoded value that is `>= p` is silently
/// reduced modulo `p` by `PrimeField::from_be_bytes_mod_order`, matching
/// the tolerant behavior of the in-circuit field-element reader.
pub fn decode_field(s: &str) -> Result<F, FieldError> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    if s.is_empty() || s.len() % 2 != 0 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(FieldError::BadHex);
    }
    let bytes = hex::decode(s).map_err(|_| FieldError::BadHex)?;
    if bytes.len() > 32 {
        return Err(FieldError::BadLength { got: bytes.len() });
    }
    Ok(F::from_be_bytes_mod_order(&bytes))
}

/// `stringToField(s) = SHA-256(utf8(s))` reinterpreted big-endian and
/// reduced modulo `p`.
///
/// This is the cryptographic form named in spec Open Question 3; the
/// alternative non-cryptographic Horner-style mapping was rejected because
/// origin-id collisions would otherwise be feasible to search for.
pub fn string_to_field(s: &str) -> F {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(s.as_bytes());
    F::from_be_bytes_mod_order(&digest)
}

/// 64 bytes of CSPRNG output interpreted big-endian and reduced mod `p`
/// (bias negligible, `<= 2^-250` per spec).
pub fn random_field_element() -> F {
    let mut rng = rand::rngs::OsRng;
    let mut buf = [0u8; 64];
    rng.fill_bytes(&mut buf);
    F::from_be_bytes_mod_order(&buf)
}

/// Sample a uniform field element using arkworks' own `UniformRand`
/// (used where a test wants a `rand::Rng`-seeded deterministic draw rather
/// than the CSPRNG path above).
pub fn random_field_element_with<R: rand::Rng + ?Sized>(rng: &mut R) -> F {
    F::rand(rng)
}

/// Reduce a scalar-field element into the Grumpkin group's scalar field
/// (BN254's base field `Fq`), used wherever a field element needs to act
/// as an exponent for curve scalar multiplication (Pedersen/Schnorr).
pub trait FieldReduce {
    fn reduce_to_scalar(&self) -> super::curve::Scalar;
}

impl FieldReduce for F {
    fn reduce_to_scalar(&self) -> super::curve::Scalar {
        use ark_ff::BigInteger;
        let bytes = self.into_bigint().to_bytes_be();
        super::curve::Scalar::from_be_bytes_mod_order(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ff::Zero;

    #[test]
    fn encode_decode_round_trip() {
        let x = F::from(1234567u64);
        let hex = encode_field(&x);
        assert_eq!(hex.len(), 2 + 64);
        assert_eq!(decode_field(&hex).unwrap(), x);
    }

    #[test]
    fn decode_rejects_non_hex() {
        assert_eq!(decode_field("0xnothex"), Err(FieldError::BadHex));
        assert_eq!(decode_field("abc"), Err(FieldError::BadHex));
    }

    #[test]
    fn zero_encodes_to_all_zero_bytes() {
        let hex = encode_field(&F::zero());
        assert_eq!(hex, format!("0x{}", "0".repeat(64)));
    }

    #[test]
    fn string_to_field_is_deterministic() {
        assert_eq!(string_to_field("hello"), string_to_field("hello"));
        assert_ne!(string_to_field("hello"), string_to_field("Hello"));
    }

    #[test]
    fn random_field_elements_are_reduced_and_distinct() {
        let a = random_field_element();
        let b = random_field_element();
        assert_ne!(a, b, "collision probability is negligible");
    }
}
