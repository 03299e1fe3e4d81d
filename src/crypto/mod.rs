//! Cryptographic primitives: field/curve arithmetic, Poseidon, Pedersen,
//! Schnorr. Everything here must be bit-exact with the corresponding
//! in-circuit definitions (spec §4.1) — this module is the one place in
//! the crate where "close enough" is not an acceptable outcome.

pub mod curve;
pub mod field;
pub mod pedersen;
pub mod poseidon;
pub mod schnorr;

pub use curve::{CurveError, Point, Scalar};
pub use field::{decode_field, encode_field, random_field_element, string_to_field, FieldError};
pub use pedersen::{pedersen_commit, pedersen_commit_with, GeneratorTable, GeneratorTableError, PedersenError};
pub use poseidon::{poseidon, poseidon_h2, poseidon_h3, poseidon_h4, poseidon_h7};
pub use schnorr::{derive_pubkey, schnorr_sign, schnorr_verify, SchnorrError, SchnorrSignature};

/// Umbrella error type for call sites that want a single `?`-friendly
/// error across the crypto module (the ABI and credential layers use
/// this; the submodules themselves keep narrower error enums).
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error(transparent)]
    Field(#[from] FieldError),
    #[error(transparent)]
    Curve(#[from] CurveError),
    #[error(transparent)]
    Schnorr(#[from] SchnorrError),
    #[error(transparent)]
    Pedersen(#[from] PedersenError),
}
