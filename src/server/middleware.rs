//! The resource-server's three-branch dispatcher (spec §4.4): discovery,
//! payment mediation, and credential verification. Pure, transport-free
//! functions — `router.rs` is the only place that touches axum request/
//! response types.

#![allow(dead_code)]

use serde_json::Value;

use crate::abi::{PUBLIC_INPUT_LEN, PUBLIC_OUTPUT_LEN};
use crate::clock::Clock;
use crate::config::ServerConfig;
use crate::crypto::Point;
use crate::origin::origin_id;
use crate::server::ratelimit::{CheckResult, RateLimiter};
use crate::server::verifier_backend::{Verifier, VerifierHandle};
use crate::wire::{
    ChallengeExtensions, Extra, PaymentPayload, PaymentRequired, PaymentRequirements, Presentation,
    SettlementCommitmentExtension, ZkCredentialChallengeExtension,
};
use crate::wire::ErrorKind;
use crate::F;

/// Drift tolerance for a client-supplied `current_time` (spec §4.4.3 step 4).
pub const CLOCK_DRIFT_SECONDS: i64 = 60;

/// Which of the three branches a request body falls into (spec §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    PaymentBearing,
    CredentialPresenting,
    Neither,
}

/// Inspect the top-level keys of a request body to choose a branch. A body
/// with both `payment` and `zk_credential` is treated as payment-bearing
/// (payment mediation takes priority; the client must re-request with the
/// credential once settled).
pub fn classify(body: &Value) -> Branch {
    let has_payment = body.get("payment").is_some();
    let has_credential = body.get("zk_credential").is_some();
    if has_payment {
        Branch::PaymentBearing
    } else if has_credential {
        Branch::CredentialPresenting
    } else {
        Branch::Neither
    }
}

/// Build the 402 challenge body (spec §4.4.1).
pub fn build_challenge(config: &ServerConfig, resource_url: &str) -> PaymentRequired {
    PaymentRequired {
        x402_version: crate::wire::X402_VERSION,
        accepts: vec![PaymentRequirements {
            scheme: crate::wire::schemes::EXACT.to_string(),
            network: config.network.clone(),
            max_amount_required: config.payment_amount.clone(),
            asset: config.payment_asset.clone(),
            pay_to: config.payment_recipient.clone(),
            resource: resource_url.to_string(),
            description: config.resource_description.clone(),
            max_timeout_seconds: 60,
            extra: Extra::default(),
        }],
        extensions: ChallengeExtensions {
            zk_credential: ZkCredentialChallengeExtension {
                version: "0.2.0".to_string(),
                credential_suites: vec![
                    crate::abi::SUITE_PEDERSEN_SCHNORR_POSEIDON_ULTRAHONK.to_string(),
                ],
                facilitator_pubkey: config.facilitator_pubkey.clone(),
                facilitator_url: config.facilitator_url.clone(),
            },
        },
    }
}

/// Errors the payment-mediation branch can surface (spec §4.4.2), already
/// paired with the `ErrorKind` their caller maps to HTTP status.
#[derive(Debug, thiserror::Error)]
pub enum MediationError {
    #[error("request body is missing payment or commitment fields")]
    MalformedRequest,
    #[error("transport error reaching facilitator: {0}")]
    Transport(String),
    #[error("facilitator rejected the payment (status {0})")]
    FacilitatorRejected(u16),
    #[error("facilitator returned a server error (status {0})")]
    FacilitatorServerError(u16),
    #[error("facilitator response violated the expected shape: {0}")]
    BodyShapeViolation(String),
    #[error("unexpected error mediating payment: {0}")]
    Uncaught(String),
}

impl MediationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MediationError::MalformedRequest => ErrorKind::CredentialMissing,
            MediationError::Transport(_) => ErrorKind::FacilitatorUnavailable,
            MediationError::FacilitatorRejected(_) => ErrorKind::PaymentRejected,
            MediationError::FacilitatorServerError(_) => ErrorKind::FacilitatorUnavailable,
            MediationError::BodyShapeViolation(_) => ErrorKind::FacilitatorError,
            MediationError::Uncaught(_) => ErrorKind::PaymentProcessingError,
        }
    }
}

/// The successful payment-mediation response body (spec §4.4.2): `200
/// { x402: { payment_response: receipt }, zk_credential: { credential } }`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct MediationSuccess {
    pub x402: X402PaymentResponse,
    pub zk_credential: crate::wire::CredentialExtension,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct X402PaymentResponse {
    pub payment_response: crate::wire::PaymentReceipt,
}

/// Parse a payment-bearing request body, POST a settle request to the
/// facilitator, and translate its response (or transport failure) into the
/// §4.4.2 taxonomy. `http` is injected so tests can point it at a mock
/// server or skip the network entirely.
pub async fn mediate_payment(
    http: &reqwest::Client,
    facilitator_url: &str,
    body: &Value,
    requirements: PaymentRequirements,
) -> Result<MediationSuccess, MediationError> {
    let payment: PaymentPayload = serde_json::from_value(body.get("payment").cloned().unwrap_or(Value::Null))
        .map_err(|_| MediationError::MalformedRequest)?;
    let commitment = body
        .get("extensions")
        .and_then(|e| e.get("zk_credential"))
        .and_then(|z| z.get("commitment"))
        .and_then(|c| c.as_str())
        .ok_or(MediationError::MalformedRequest)?
        .to_string();

    let settle_request = crate::wire::SettlementRequest {
        payment,
        payment_requirements: requirements,
        extensions: crate::wire::SettlementExtensions {
            zk_credential: SettlementCommitmentExtension { commitment },
        },
    };

    let response = http
        .post(format!("{}/settle", facilitator_url.trim_end_matches('/')))
        .json(&settle_request)
        .send()
        .await
        .map_err(|e| MediationError::Transport(e.to_string()))?;

    let status = response.status();
    if status.is_client_error() {
        return Err(MediationError::FacilitatorRejected(status.as_u16()));
    }
    if status.is_server_error() {
        return Err(MediationError::FacilitatorServerError(status.as_u16()));
    }

    let body: crate::wire::SettlementResponse = response
        .json()
        .await
        .map_err(|e| MediationError::BodyShapeViolation(e.to_string()))?;

    if body.payment_receipt.status != "settled" {
        return Err(MediationError::BodyShapeViolation(format!(
            "unexpected payment_receipt.status {:?}",
            body.payment_receipt.status
        )));
    }

    Ok(MediationSuccess {
        x402: X402PaymentResponse { payment_response: body.payment_receipt },
        zk_credential: body.extensions.zk_credential,
    })
}

/// A presentation that has passed every §4.4.3 check, ready for rate-limit
/// consultation and handoff to the downstream handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifiedPresentation {
    pub tier: u32,
    pub origin_token: F,
}

/// The outcome of dispatching a request body through §4.4.3: either a
/// structured taxonomy error, or the sentinel that means "no `zk_credential`
/// key at all", which the caller must turn into a 402 challenge instead of
/// a 401.
#[derive(Debug)]
pub enum VerifyOutcome {
    Verified(VerifiedPresentation, CheckResult),
    ChallengeRequired,
    Rejected(ErrorKind, String),
}

/// Run the full eight-step credential-verification order (spec §4.4.3),
/// first-failure-wins, followed by a rate-limit consultation on success.
#[allow(clippy::too_many_arguments)]
pub async fn verify_presentation<V: Verifier>(
    config: &ServerConfig,
    verifier: &VerifierHandle<V>,
    limiter: &RateLimiter,
    clock: &dyn Clock,
    facilitator_pubkey: &Point,
    resource_url: &str,
    body: &Value,
) -> VerifyOutcome {
    if body.get("zk_credential").is_none() {
        return VerifyOutcome::ChallengeRequired;
    }

    let envelope: Presentation = match serde_json::from_value(body["zk_credential"].clone()) {
        Ok(p) => p,
        Err(e) => return VerifyOutcome::Rejected(ErrorKind::CredentialMissing, e.to_string()),
    };

    if envelope.suite != crate::abi::SUITE_PEDERSEN_SCHNORR_POSEIDON_ULTRAHONK {
        return VerifyOutcome::Rejected(ErrorKind::UnsupportedSuite, envelope.suite);
    }

    if envelope.proof.is_empty() {
        return VerifyOutcome::Rejected(ErrorKind::InvalidProofFormat, "proof decodes to zero bytes".to_string());
    }

    let server_time = clock.now();
    let current_time = match envelope.public_outputs.current_time {
        Some(proof_time) => {
            if (server_time - proof_time).abs() > CLOCK_DRIFT_SECONDS {
                return VerifyOutcome::Rejected(
                    ErrorKind::InvalidProofFormat,
                    format!("proof time {proof_time} drifted beyond {CLOCK_DRIFT_SECONDS}s of server time {server_time}"),
                );
            }
            proof_time
        }
        None => server_time,
    };

    let origin = match origin_id(resource_url) {
        Ok(id) => id,
        Err(e) => return VerifyOutcome::Rejected(ErrorKind::InvalidProofVerification, e.to_string()),
    };

    let public_outputs = &envelope.public_outputs;
    let mut public_io = Vec::with_capacity(PUBLIC_INPUT_LEN + PUBLIC_OUTPUT_LEN);
    public_io.push(config.service_id);
    public_io.push(F::from(current_time as u64));
    public_io.push(origin);
    public_io.push(facilitator_pubkey.x());
    public_io.push(facilitator_pubkey.y());
    public_io.push(public_outputs.origin_token);
    public_io.push(F::from(public_outputs.tier as u64));
    public_io.push(F::from(public_outputs.expires_at as u64));

    if !config.skip_proof_verification {
        match verifier.verify(&envelope.proof, &public_io).await {
            Ok(true) => {}
            Ok(false) => {
                return VerifyOutcome::Rejected(
                    ErrorKind::InvalidProofVerification,
                    "verifier rejected the proof".to_string(),
                )
            }
            Err(e) => return VerifyOutcome::Rejected(ErrorKind::InvalidProofVerification, e.to_string()),
        }
    }

    if public_outputs.expires_at < server_time - CLOCK_DRIFT_SECONDS {
        return VerifyOutcome::Rejected(ErrorKind::CredentialExpired, "credential has expired".to_string());
    }

    if public_outputs.tier < config.min_tier {
        return VerifyOutcome::Rejected(ErrorKind::TierInsufficient, "tier below minimum".to_string());
    }

    let check = limiter.check(public_outputs.origin_token, server_time);
    if !check.allowed {
        return VerifyOutcome::Rejected(ErrorKind::RateLimited, "Rate limit exceeded".to_string());
    }

    VerifyOutcome::Verified(
        VerifiedPresentation { tier: public_outputs.tier, origin_token: public_outputs.origin_token },
        check,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::crypto::derive_pubkey;
    use crate::server::verifier_backend::StubVerifier;

    fn config() -> ServerConfig {
        ServerConfig {
            service_id: F::from(1u64),
            facilitator_pubkey: "x".to_string(),
            facilitator_url: "http://localhost:9999".to_string(),
            min_tier: 0,
            skip_proof_verification: true,
            rate_limit: crate::config::RateLimitConfig { max_requests_per_token: 100, window_seconds: 60 },
            payment_amount: "10000".to_string(),
            payment_asset: "USDC".to_string(),
            payment_recipient: "0xabc".to_string(),
            network: "eip155:8453".to_string(),
            resource_description: "protected resource".to_string(),
            public_base_url: "https://example.com".to_string(),
            facilitator_timeout_seconds: 10,
        }
    }

    fn presentation_body(origin_token_hex: &str, tier: u32, expires_at: i64) -> Value {
        serde_json::json!({
            "zk_credential": {
                "version": "0.2.0",
                "suite": crate::abi::SUITE_PEDERSEN_SCHNORR_POSEIDON_ULTRAHONK,
                "proof": base64::Engine::encode(&base64::engine::general_purpose::STANDARD, [1u8, 2, 3]),
                "public_outputs": {
                    "origin_token": origin_token_hex,
                    "tier": tier,
                    "expires_at": expires_at
                }
            }
        })
    }

    #[test]
    fn classify_detects_all_three_branches() {
        assert_eq!(classify(&serde_json::json!({"payment": {}})), Branch::PaymentBearing);
        assert_eq!(classify(&serde_json::json!({"zk_credential": {}})), Branch::CredentialPresenting);
        assert_eq!(classify(&serde_json::json!({})), Branch::Neither);
    }

    #[test]
    fn challenge_advertises_the_registered_suite() {
        let challenge = build_challenge(&config(), "https://example.com/api/whoami");
        assert_eq!(challenge.x402_version, 2);
        assert_eq!(challenge.accepts[0].scheme, "exact");
        assert!(challenge
            .extensions
            .zk_credential
            .credential_suites
            .contains(&crate::abi::SUITE_PEDERSEN_SCHNORR_POSEIDON_ULTRAHONK.to_string()));
    }

    #[tokio::test]
    async fn s1_missing_envelope_yields_challenge_required() {
        let cfg = config();
        let limiter = RateLimiter::new(100, 60);
        let clock = FixedClock::new(1_700_000_000);
        let verifier = VerifierHandle::new(StubVerifier::accepting());
        let pk = derive_pubkey(&crate::crypto::Scalar::from(1u64)).unwrap();
        let outcome = verify_presentation(
            &cfg, &verifier, &limiter, &clock, &pk, "https://example.com/api/whoami", &serde_json::json!({}),
        )
        .await;
        assert!(matches!(outcome, VerifyOutcome::ChallengeRequired));
    }

    #[tokio::test]
    async fn s2_skip_verification_happy_path() {
        let cfg = config();
        let limiter = RateLimiter::new(100, 60);
        let clock = FixedClock::new(1_700_000_000);
        let verifier = VerifierHandle::new(StubVerifier::accepting());
        let pk = derive_pubkey(&crate::crypto::Scalar::from(1u64)).unwrap();
        let body = presentation_body("0x01", 2, 1_700_000_060);
        let outcome = verify_presentation(
            &cfg, &verifier, &limiter, &clock, &pk, "https://example.com/api/whoami", &body,
        )
        .await;
        match outcome {
            VerifyOutcome::Verified(v, check) => {
                assert_eq!(v.tier, 2);
                assert_eq!(check.remaining, 99);
            }
            other => panic!("expected Verified, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn s3_tier_insufficient() {
        let mut cfg = config();
        cfg.min_tier = 2;
        let limiter = RateLimiter::new(100, 60);
        let clock = FixedClock::new(1_700_000_000);
        let verifier = VerifierHandle::new(StubVerifier::accepting());
        let pk = derive_pubkey(&crate::crypto::Scalar::from(1u64)).unwrap();
        let body = presentation_body("0x01", 1, 1_700_000_060);
        let outcome = verify_presentation(
            &cfg, &verifier, &limiter, &clock, &pk, "https://example.com/api/whoami", &body,
        )
        .await;
        assert!(matches!(outcome, VerifyOutcome::Rejected(ErrorKind::TierInsufficient, _)));
    }

    #[tokio::test]
    async fn s4_expired_credential() {
        let cfg = config();
        let limiter = RateLimiter::new(100, 60);
        let clock = FixedClock::new(1_700_000_000);
        let verifier = VerifierHandle::new(StubVerifier::accepting());
        let pk = derive_pubkey(&crate::crypto::Scalar::from(1u64)).unwrap();
        let body = presentation_body("0x01", 1, 1_700_000_000 - 120);
        let outcome = verify_presentation(
            &cfg, &verifier, &limiter, &clock, &pk, "https://example.com/api/whoami", &body,
        )
        .await;
        assert!(matches!(outcome, VerifyOutcome::Rejected(ErrorKind::CredentialExpired, _)));
    }

    #[tokio::test]
    async fn s5_rate_limit_then_third_rejected() {
        let mut cfg = config();
        cfg.rate_limit.max_requests_per_token = 2;
        let limiter = RateLimiter::new(2, 60);
        let clock = FixedClock::new(1_700_000_000);
        let verifier = VerifierHandle::new(StubVerifier::accepting());
        let pk = derive_pubkey(&crate::crypto::Scalar::from(1u64)).unwrap();
        let body = presentation_body("0xab", 1, 1_700_000_060);

        let first = verify_presentation(&cfg, &verifier, &limiter, &clock, &pk, "https://example.com/api/x", &body).await;
        let second = verify_presentation(&cfg, &verifier, &limiter, &clock, &pk, "https://example.com/api/x", &body).await;
        let third = verify_presentation(&cfg, &verifier, &limiter, &clock, &pk, "https://example.com/api/x", &body).await;

        assert!(matches!(first, VerifyOutcome::Verified(_, _)));
        assert!(matches!(second, VerifyOutcome::Verified(_, _)));
        assert!(matches!(third, VerifyOutcome::Rejected(ErrorKind::RateLimited, _)));

        let other_body = presentation_body("0xcd", 1, 1_700_000_060);
        let other = verify_presentation(&cfg, &verifier, &limiter, &clock, &pk, "https://example.com/api/x", &other_body).await;
        assert!(matches!(other, VerifyOutcome::Verified(_, _)));
    }

    #[tokio::test]
    async fn zero_byte_proof_is_a_400_not_a_401() {
        let cfg = config();
        let limiter = RateLimiter::new(100, 60);
        let clock = FixedClock::new(1_700_000_000);
        let verifier = VerifierHandle::new(StubVerifier::accepting());
        let pk = derive_pubkey(&crate::crypto::Scalar::from(1u64)).unwrap();
        let body = serde_json::json!({
            "zk_credential": {
                "version": "0.2.0",
                "suite": crate::abi::SUITE_PEDERSEN_SCHNORR_POSEIDON_ULTRAHONK,
                "proof": "",
                "public_outputs": { "origin_token": "0x01", "tier": 1, "expires_at": 1_700_000_060 }
            }
        });
        let outcome = verify_presentation(
            &cfg, &verifier, &limiter, &clock, &pk, "https://example.com/api/whoami", &body,
        )
        .await;
        match outcome {
            VerifyOutcome::Rejected(kind, _) => {
                assert_eq!(kind, ErrorKind::InvalidProofFormat);
                assert_eq!(kind.http_status(), 400);
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn clock_drift_beyond_tolerance_is_a_400_not_a_401() {
        let cfg = config();
        let limiter = RateLimiter::new(100, 60);
        let clock = FixedClock::new(1_700_000_000);
        let verifier = VerifierHandle::new(StubVerifier::accepting());
        let pk = derive_pubkey(&crate::crypto::Scalar::from(1u64)).unwrap();
        let body = serde_json::json!({
            "zk_credential": {
                "version": "0.2.0",
                "suite": crate::abi::SUITE_PEDERSEN_SCHNORR_POSEIDON_ULTRAHONK,
                "proof": base64::Engine::encode(&base64::engine::general_purpose::STANDARD, [1u8, 2, 3]),
                "public_outputs": {
                    "origin_token": "0x01",
                    "tier": 1,
                    "expires_at": 1_700_000_060,
                    "current_time": 1_700_000_000 - 120
                }
            }
        });
        let outcome = verify_presentation(
            &cfg, &verifier, &limiter, &clock, &pk, "https://example.com/api/whoami", &body,
        )
        .await;
        match outcome {
            VerifyOutcome::Rejected(kind, _) => {
                assert_eq!(kind, ErrorKind::InvalidProofFormat);
                assert_eq!(kind.http_status(), 400);
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn verifier_rejection_is_a_401_not_a_400() {
        let cfg = config();
        let limiter = RateLimiter::new(100, 60);
        let clock = FixedClock::new(1_700_000_000);
        let verifier = VerifierHandle::new(StubVerifier::rejecting());
        let pk = derive_pubkey(&crate::crypto::Scalar::from(1u64)).unwrap();
        let mut cfg_with_verification = cfg.clone();
        cfg_with_verification.skip_proof_verification = false;
        let body = presentation_body("0x01", 1, 1_700_000_060);
        let outcome = verify_presentation(
            &cfg_with_verification, &verifier, &limiter, &clock, &pk, "https://example.com/api/whoami", &body,
        )
        .await;
        match outcome {
            VerifyOutcome::Rejected(kind, _) => {
                assert_eq!(kind, ErrorKind::InvalidProofVerification);
                assert_eq!(kind.http_status(), 401);
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unsupported_suite_is_rejected_before_proof_checks() {
        let cfg = config();
        let limiter = RateLimiter::new(100, 60);
        let clock = FixedClock::new(1_700_000_000);
        let verifier = VerifierHandle::new(StubVerifier::rejecting());
        let pk = derive_pubkey(&crate::crypto::Scalar::from(1u64)).unwrap();
        let body = serde_json::json!({
            "zk_credential": {
                "version": "0.2.0",
                "suite": "some-other-suite",
                "proof": "AQID",
                "public_outputs": { "origin_token": "0x01", "tier": 1, "expires_at": 1_700_000_060 }
            }
        });
        let outcome = verify_presentation(&cfg, &verifier, &limiter, &clock, &pk, "https://example.com/api/x", &body).await;
        assert!(matches!(outcome, VerifyOutcome::Rejected(ErrorKind::UnsupportedSuite, _)));
    }
}
