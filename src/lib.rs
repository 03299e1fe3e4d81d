//! Crate root: public surface and core aliases for the pay-once,
//! redeem-many ZK credential protocol.
//!
//! This crate implements the three-role protocol described by the
//! `pedersen-schnorr-poseidon-ultrahonk` suite: a **facilitator** that
//! converts a settled payment plus a client commitment into a signed
//! credential; a **resource server** middleware that mediates settlement
//! and verifies zero-knowledge proofs of credential possession locally;
//! and a **client** that holds the credential and proves possession on
//! each protected request.
//!
//! ## Invariants
//!
//! - **Field & curve.** The scalar field is `ark_bn254::Fr` (`F` below).
//!   Commitments and signatures operate over Grumpkin, the curve whose
//!   base field is `F` and whose own scalar field is `ark_bn254::Fq`
//!   (see [`crypto::curve`]).
//! - **Suite.** The only registered suite in this version is
//!   `pedersen-schnorr-poseidon-ultrahonk` ([`abi::SuiteId`]).
//! - **No facilitator-side linkage.** The facilitator never persists or
//!   logs a mapping from commitment to payer identity, transaction hash,
//!   or IP beyond what settling the payment itself requires.
//! - **Proofs verify locally.** Once a client holds a credential, the
//!   resource server verifies every subsequent proof itself; there is no
//!   per-request facilitator round trip.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

/// Scalar field used across the crate (BN254).
pub type F = ark_bn254::Fr;

/// Cryptographic primitives: field/curve arithmetic, Poseidon, Pedersen,
/// Schnorr.
pub mod crypto;

/// Proof statement: public input/output layout, suite registry, witness.
pub mod abi;

/// Canonical origin-id derivation and origin tokens.
pub mod origin;

/// Credential record (wire) and client-local stored credential.
pub mod credential;

/// Wire types: x402 envelopes, presentation envelope, structured errors.
pub mod wire;

/// Injectable clock, for deterministic tests.
pub mod clock;

/// Server/facilitator/client configuration option sets.
pub mod config;

/// The facilitator: settlement mediation, tier selection, credential
/// minting.
pub mod facilitator;

/// The resource-server middleware: discovery, payment mediation, proof
/// verification, rate limiting.
pub mod server;

/// The client: commitment lifecycle, storage, presentation strategies,
/// proof generation, proof cache.
pub mod client;
