//! Wire types and the structured error taxonomy (spec §6, §7).
//!
//! Decoding is strict: every envelope here is a plain `serde`
//! `Deserialize` derive with no permissive defaults beyond fields marked
//! optional, so an unrecognized suite or a missing required field fails
//! closed at the `serde_json::from_*` call site rather than producing a
//! partially-populated struct (spec §9 "Dynamic-typed wire decoding").

#![allow(dead_code)]

use serde::{Deserialize, Serialize};

pub mod x402;
pub use x402::*;

/// Serde helper: field elements as `"0x"`-prefixed 64-hex-digit strings.
pub mod field_hex {
    use crate::crypto::{decode_field, encode_field};
    use crate::F;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(x: &F, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&encode_field(x))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<F, D::Error> {
        let raw = String::deserialize(d)?;
        decode_field(&raw).map_err(serde::de::Error::custom)
    }
}

/// The structured error kinds the credential-verification path (§7), the
/// resource server's payment-mediation path (§4.4.2), and the
/// facilitator's own settle algorithm (§4.3) can surface, mapped to HTTP
/// status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    CredentialMissing,
    UnsupportedSuite,
    /// `proof` decodes to zero bytes, or `current_time` drifts beyond
    /// tolerance (spec §4.4.3 steps 3–4): 400.
    InvalidProofFormat,
    /// The `Verifier` backend rejected the proof (spec §4.4.3 step 6): 401.
    InvalidProofVerification,
    CredentialExpired,
    TierInsufficient,
    RateLimited,
    FacilitatorUnavailable,
    PaymentRejected,
    FacilitatorError,
    PaymentProcessingError,
    /// Facilitator-side (§4.3 step 2): the payment backend's `verify`
    /// rejected the payload.
    PaymentVerificationFailed,
    /// Facilitator-side (§4.3 step 3): the payment backend's `settle`
    /// failed after verification succeeded.
    PaymentSettlementFailed,
    /// Facilitator-side (§4.3 step 4): no configured tier's
    /// `min_amount_cents` is met by the settled payment.
    BelowMinimumTier,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::CredentialMissing => "credential_missing",
            ErrorKind::UnsupportedSuite => "unsupported_suite",
            ErrorKind::InvalidProofFormat => "invalid_proof",
            ErrorKind::InvalidProofVerification => "invalid_proof",
            ErrorKind::CredentialExpired => "credential_expired",
            ErrorKind::TierInsufficient => "tier_insufficient",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::FacilitatorUnavailable => "FACILITATOR_UNAVAILABLE",
            ErrorKind::PaymentRejected => "PAYMENT_REJECTED",
            ErrorKind::FacilitatorError => "FACILITATOR_ERROR",
            ErrorKind::PaymentProcessingError => "PAYMENT_PROCESSING_ERROR",
            ErrorKind::PaymentVerificationFailed => "payment_verification_failed",
            ErrorKind::PaymentSettlementFailed => "payment_settlement_failed",
            ErrorKind::BelowMinimumTier => "below_minimum_tier",
        }
    }

    /// The HTTP status this kind is mapped to by §7 / §4.4.2 / §4.3.
    pub fn http_status(self) -> u16 {
        match self {
            ErrorKind::CredentialMissing => 401,
            ErrorKind::UnsupportedSuite => 400,
            ErrorKind::InvalidProofFormat => 400,
            ErrorKind::InvalidProofVerification => 401,
            ErrorKind::CredentialExpired => 401,
            ErrorKind::TierInsufficient => 403,
            ErrorKind::RateLimited => 429,
            ErrorKind::FacilitatorUnavailable => 503,
            ErrorKind::PaymentRejected => 402,
            ErrorKind::FacilitatorError => 502,
            ErrorKind::PaymentProcessingError => 500,
            ErrorKind::PaymentVerificationFailed => 402,
            ErrorKind::PaymentSettlementFailed => 402,
            ErrorKind::BelowMinimumTier => 402,
        }
    }
}

/// `{ "error": <kind>, "message"?: ..., "details"?: ... }` — the uniform
/// body shape for every error response (spec §7).
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorBody {
    pub fn new(kind: ErrorKind) -> Self {
        Self { error: kind.as_str(), message: None, details: None }
    }

    pub fn with_message(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { error: kind.as_str(), message: Some(message.into()), details: None }
    }

    /// Production builds omit `details` entirely (spec §7 "internal
    /// details omitted in production builds"); only a non-redacted build
    /// attaches them.
    pub fn with_details(mut self, details: serde_json::Value, redact: bool) -> Self {
        if !redact {
            self.details = Some(details);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_mapping_matches_spec_table() {
        assert_eq!(ErrorKind::CredentialMissing.http_status(), 401);
        assert_eq!(ErrorKind::UnsupportedSuite.http_status(), 400);
        assert_eq!(ErrorKind::InvalidProofFormat.http_status(), 400);
        assert_eq!(ErrorKind::InvalidProofVerification.http_status(), 401);
        assert_eq!(ErrorKind::CredentialExpired.http_status(), 401);
        assert_eq!(ErrorKind::TierInsufficient.http_status(), 403);
        assert_eq!(ErrorKind::RateLimited.http_status(), 429);
    }

    #[test]
    fn facilitator_settle_error_kinds_use_the_spec_4_3_literal_strings() {
        assert_eq!(ErrorKind::PaymentVerificationFailed.as_str(), "payment_verification_failed");
        assert_eq!(ErrorKind::PaymentSettlementFailed.as_str(), "payment_settlement_failed");
        assert_eq!(ErrorKind::BelowMinimumTier.as_str(), "below_minimum_tier");
    }

    #[test]
    fn error_body_redacts_details_by_default() {
        let body = ErrorBody::new(ErrorKind::InvalidProofVerification)
            .with_details(serde_json::json!({"raw": "stack trace"}), true);
        assert!(body.details.is_none());
        let body = ErrorBody::new(ErrorKind::InvalidProofVerification)
            .with_details(serde_json::json!({"raw": "stack trace"}), false);
        assert!(body.details.is_some());
    }

    #[test]
    fn presentation_envelope_round_trips() {
        let env = PresentationEnvelope {
            zk_credential: Presentation {
                version: "0.2.0".to_string(),
                suite: crate::abi::SUITE_PEDERSEN_SCHNORR_POSEIDON_ULTRAHONK.to_string(),
                kid: None,
                proof: crate::abi::ProofBytes(vec![1, 2, 3]),
                public_outputs: PresentedPublicOutputs {
                    origin_token: crate::F::from(42u64),
                    tier: 1,
                    expires_at: 1_700_000_000,
                    current_time: None,
                },
            },
        };
        let json = serde_json::to_string(&env).unwrap();
        let back: PresentationEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(back.zk_credential.suite, env.zk_credential.suite);
        assert_eq!(back.zk_credential.public_outputs.tier, 1);
    }

    #[test]
    fn presentation_envelope_rejects_missing_required_field() {
        let missing_proof = serde_json::json!({
            "zk_credential": {
                "version": "0.2.0",
                "suite": "pedersen-schnorr-poseidon-ultrahonk",
                "public_outputs": {
                    "origin_token": "0x01",
                    "tier": 1,
                    "expires_at": 1
                }
            }
        });
        let result: Result<PresentationEnvelope, _> = serde_json::from_value(missing_proof);
        assert!(result.is_err());
    }
}
