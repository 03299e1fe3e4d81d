//! Grumpkin curve point arithmetic.
//!
//! Grumpkin is `y^2 = x^3 - 17` over the base field `Fr` of BN254 — chosen
//! by the target circuit stack precisely because Grumpkin's own scalar
//! field is BN254's base field `Fq`, completing the two-cycle that lets a
//! BN254-based SNARK prove statements about Grumpkin group operations
//! natively (the same reason Aztec/Noir use this pairing).
//!
//! Arkworks does not publish a Grumpkin curve crate, so rather than pull in
//! an unreviewed third-party dependency we implement the minimal affine
//! short-Weierstrass arithmetic directly over `ark_bn254::{Fr, Fq}` — the
//! same two field types `pcs.rs`/`srs_setup.rs` already compute with for
//! BN254's own group law.

#![allow(dead_code)]

use ark_ff::{BigInteger, Field, PrimeField, Zero};

use crate::F;

use super::field::{decode_field, encode_field, FieldError};

/// Grumpkin's scalar field (BN254's base field `Fq`); the curve's group
/// order `n` is this field's modulus.
pub type Scalar = ark_bn254::Fq;

/// `b` in `y^2 = x^3 + a*x + b`, with `a = 0`.
fn coeff_b() -> F {
    -F::from(17u64)
}

/// Errors from point construction, decoding, or validation.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CurveError {
    #[error("point is not on the Grumpkin curve")]
    NotOnCurve,
    #[error("the point at infinity is not a valid public key or commitment")]
    AtInfinity,
    #[error("malformed point encoding: {0}")]
    BadEncoding(String),
}

impl From<FieldError> for CurveError {
    fn from(e: FieldError) -> Self {
        CurveError::BadEncoding(e.to_string())
    }
}

/// An affine Grumpkin point, or the point at infinity.
///
/// Invariant: a non-infinity `Point` always satisfies the curve equation;
/// this is enforced at every construction site (`new`, `decode_uncompressed`),
/// never assumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    x: F,
    y: F,
    infinity: bool,
}

impl Point {
    /// The point at infinity (group identity). Spec: never a valid public
    /// key or commitment; `(0,0)` on the wire decodes to this and is
    /// always rejected by `new`/`decode_uncompressed`.
    pub fn infinity() -> Self {
        Self { x: F::zero(), y: F::zero(), infinity: true }
    }

    pub fn is_infinity(&self) -> bool {
        self.infinity
    }

    pub fn x(&self) -> F {
        self.x
    }

    pub fn y(&self) -> F {
        self.y
    }

    /// Construct from coordinates, checking the curve equation and
    /// rejecting `(0, 0)` / infinity.
    pub fn new(x: F, y: F) -> Result<Self, CurveError> {
        if x.is_zero() && y.is_zero() {
            return Err(CurveError::AtInfinity);
        }
        let lhs = y * y;
        let rhs = x * x * x + coeff_b();
        if lhs != rhs {
            return Err(CurveError::NotOnCurve);
        }
        Ok(Self { x, y, infinity: false })
    }

    fn new_unchecked(x: F, y: F) -> Self {
        Self { x, y, infinity: false }
    }

    pub fn double(&self) -> Self {
        if self.infinity || self.y.is_zero() {
            return Self::infinity();
        }
        let three = F::from(3u64);
        let two = F::from(2u64);
        let lambda = (three * self.x * self.x) / (two * self.y);
        let x3 = lambda * lambda - two * self.x;
        let y3 = lambda * (self.x - x3) - self.y;
        Self::new_unchecked(x3, y3)
    }

    pub fn add(&self, other: &Self) -> Self {
        if self.infinity {
            return *other;
        }
        if other.infinity {
            return *self;
        }
        if self.x == other.x {
            if self.y == other.y {
                return self.double();
            }
            return Self::infinity();
        }
        let lambda = (other.y - self.y) / (other.x - self.x);
        let x3 = lambda * lambda - self.x - other.x;
        let y3 = lambda * (self.x - x3) - self.y;
        Self::new_unchecked(x3, y3)
    }

    /// Scalar multiplication via double-and-add, MSB-first over the
    /// scalar's canonical big-endian bit representation.
    pub fn scalar_mul(&self, scalar: &Scalar) -> Self {
        let bits = scalar.into_bigint().to_bits_be();
        let mut acc = Self::infinity();
        for bit in bits {
            acc = acc.double();
            if bit {
                acc = acc.add(self);
            }
        }
        acc
    }

    /// Uncompressed wire encoding: `0x04 || X(32 bytes BE) || Y(32 bytes BE)`,
    /// hex-printed without the suite prefix (callers add `"<suite>:"`).
    pub fn encode_uncompressed(&self) -> String {
        assert!(!self.infinity, "the point at infinity has no wire encoding");
        let x_hex = &encode_field(&self.x)[2..];
        let y_hex = &encode_field(&self.y)[2..];
        format!("0x04{}{}", x_hex, y_hex)
    }

    /// Decode `0x04 || X(64 hex) || Y(64 hex)`, validating the curve
    /// equation.
    pub fn decode_uncompressed(s: &str) -> Result<Self, CurveError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let s = s
            .strip_prefix("04")
            .ok_or_else(|| CurveError::BadEncoding("missing 0x04 uncompressed tag".into()))?;
        if s.len() != 128 {
            return Err(CurveError::BadEncoding(format!(
                "expected 128 hex chars for X||Y, got {}",
                s.len()
            )));
        }
        let x = decode_field(&s[..64])?;
        let y = decode_field(&s[64..])?;
        Self::new(x, y)
    }
}

/// Hash-to-curve via try-and-increment, used to derive Pedersen generators
/// deterministically from a domain-separation label (no generator's
/// discrete log relative to another is known to anyone, by construction).
pub fn try_and_increment(label: &str) -> Point {
    let mut counter: u64 = 0;
    loop {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"grumpkin-try-and-increment-v1");
        hasher.update(label.as_bytes());
        hasher.update(&counter.to_be_bytes());
        let digest = hasher.finalize();
        let candidate_x = F::from_be_bytes_mod_order(digest.as_bytes());
        let rhs = candidate_x * candidate_x * candidate_x + coeff_b();
        if let Some(y) = rhs.sqrt() {
            if !(candidate_x.is_zero() && y.is_zero()) {
                return Point::new_unchecked(candidate_x, y);
            }
        }
        counter += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generator_is_on_curve_and_deterministic() {
        let g0 = try_and_increment("pedersen-generator-0");
        let g0b = try_and_increment("pedersen-generator-0");
        assert_eq!(g0, g0b);
        assert!(!g0.is_infinity());
        assert_eq!(g0.y() * g0.y(), g0.x() * g0.x() * g0.x() + coeff_b());
    }

    #[test]
    fn distinct_labels_give_distinct_generators() {
        let g0 = try_and_increment("pedersen-generator-0");
        let g1 = try_and_increment("pedersen-generator-1");
        assert_ne!(g0, g1);
    }

    #[test]
    fn encode_decode_round_trip() {
        let g = try_and_increment("encode-test");
        let hex = g.encode_uncompressed();
        let back = Point::decode_uncompressed(&hex).unwrap();
        assert_eq!(g, back);
    }

    #[test]
    fn zero_zero_is_rejected() {
        assert_eq!(Point::new(F::zero(), F::zero()), Err(CurveError::AtInfinity));
    }

    #[test]
    fn off_curve_point_is_rejected() {
        assert_eq!(
            Point::new(F::from(1u64), F::from(1u64)),
            Err(CurveError::NotOnCurve)
        );
    }

    #[test]
    fn double_and_add_agree() {
        let g = try_and_increment("scalar-mul-test");
        let two = Scalar::from(2u64);
        assert_eq!(g.scalar_mul(&two), g.double());
        let three = Scalar::from(3u64);
        assert_eq!(g.scalar_mul(&three), g.double().add(&g));
    }

    #[test]
    fn scalar_mul_by_zero_is_infinity() {
        let g = try_and_increment("zero-scalar-test");
        let zero = Scalar::zero();
        assert!(g.scalar_mul(&zero).is_infinity());
    }

    #[test]
    fn add_with_infinity_is_identity() {
        let g = try_and_increment("identity-test");
        assert_eq!(g.add(&Point::infinity()), g);
        assert_eq!(Point::infinity().add(&g), g);
    }
}
