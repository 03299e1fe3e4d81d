//! The facilitator (credential issuer): discovery metadata, JWKS, and the
//! `settle` algorithm that turns a verified payment into a signed
//! credential (spec §4.3).

#![allow(dead_code)]

pub mod payment;
pub mod tiers;

use std::sync::Arc;

use ark_ff::BigInteger;
use ark_ff::PrimeField;
use serde::Serialize;
use tokio::sync::OnceCell;

use crate::abi::SUITE_PEDERSEN_SCHNORR_POSEIDON_ULTRAHONK;
use crate::clock::Clock;
use crate::credential::Credential;
use crate::crypto::{derive_pubkey, poseidon::poseidon_h7, schnorr_sign, Point, Scalar};
use crate::wire::{PaymentPayload, PaymentRequirements, SettlementCommitmentExtension};
use crate::F;

use self::payment::PaymentBackend;
use self::tiers::{select_tier, Tier};

#[derive(Debug, thiserror::Error)]
pub enum SettleError {
    #[error("unsupported_suite")]
    UnsupportedSuite,
    #[error("malformed commitment: {0}")]
    InvalidCommitment(String),
    #[error("payment verification failed: {0}")]
    PaymentVerificationFailed(String),
    #[error("payment settlement failed: {0}")]
    PaymentSettlementFailed(String),
    #[error("below_minimum_tier")]
    BelowMinimumTier,
    #[error("payment backend error: {0}")]
    Backend(#[from] payment::PaymentBackendError),
}

/// `GET /info` response body (spec §6).
#[derive(Debug, Clone, Serialize)]
pub struct FacilitatorInfo {
    pub suite: String,
    pub facilitator_pubkey: String,
    pub kid: Option<String>,
    pub tiers: Vec<Tier>,
}

/// `GET /.well-known/zk-credential-keys` response body.
#[derive(Debug, Clone, Serialize)]
pub struct Jwks {
    pub keys: Vec<JwkEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JwkEntry {
    pub kid: Option<String>,
    pub suite: String,
    pub pubkey: String,
}

/// Issues credentials against settled payments. Holds the facilitator's
/// long-lived secret key and derives the public key exactly once via a
/// single-flight `tokio::sync::OnceCell`, mirroring the
/// `SRS_INITIALIZED`-gated lazy setup pattern used for the prover/verifier
/// parameters elsewhere in this crate.
pub struct CredentialIssuer<B: PaymentBackend> {
    service_id: F,
    secret_key: Scalar,
    kid: Option<String>,
    tiers: Vec<Tier>,
    backend: Arc<B>,
    clock: Arc<dyn Clock>,
    pubkey: OnceCell<Point>,
}

impl<B: PaymentBackend> CredentialIssuer<B> {
    pub fn new(
        service_id: F,
        secret_key: Scalar,
        kid: Option<String>,
        tiers: Vec<Tier>,
        backend: Arc<B>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { service_id, secret_key, kid, tiers, backend, clock, pubkey: OnceCell::new() }
    }

    /// Single-flight derivation of the facilitator's public key. Safe to
    /// call concurrently from every request handler; only the first caller
    /// actually does the scalar multiplication.
    pub async fn initialize(&self) -> Result<Point, SettleError> {
        self.pubkey
            .get_or_try_init(|| async {
                derive_pubkey(&self.secret_key)
                    .map_err(|e| SettleError::InvalidCommitment(e.to_string()))
            })
            .await
            .map(|pk| *pk)
    }

    pub async fn get_info(&self) -> Result<FacilitatorInfo, SettleError> {
        let pk = self.initialize().await?;
        Ok(FacilitatorInfo {
            suite: SUITE_PEDERSEN_SCHNORR_POSEIDON_ULTRAHONK.to_string(),
            facilitator_pubkey: format!(
                "{}:{}",
                SUITE_PEDERSEN_SCHNORR_POSEIDON_ULTRAHONK,
                pk.encode_uncompressed()
            ),
            kid: self.kid.clone(),
            tiers: self.tiers.clone(),
        })
    }

    pub async fn jwks(&self) -> Result<Jwks, SettleError> {
        let pk = self.initialize().await?;
        Ok(Jwks {
            keys: vec![JwkEntry {
                kid: self.kid.clone(),
                suite: SUITE_PEDERSEN_SCHNORR_POSEIDON_ULTRAHONK.to_string(),
                pubkey: pk.encode_uncompressed(),
            }],
        })
    }

    /// The seven-step settlement algorithm (spec §4.3):
    ///
    /// 1. parse the client's Pedersen commitment off the request extension;
    /// 2. ask the payment backend to `verify` the payload against the
    ///    accepted requirements;
    /// 3. ask the backend to `settle` it (moves funds on-chain);
    /// 4. convert the settled amount to cents and select the highest
    ///    qualifying tier;
    /// 5. compute `issued_at = now`, `expires_at = now + tier.duration`;
    /// 6. sign `poseidon_h7(service_id, tier, identity_budget, issued_at,
    ///    expires_at, C.x, C.y)` with the facilitator's Schnorr key;
    /// 7. return the settlement response with the receipt and credential.
    pub async fn settle(
        &self,
        payment: &PaymentPayload,
        requirements: &PaymentRequirements,
        commitment_ext: &SettlementCommitmentExtension,
    ) -> Result<(crate::wire::PaymentReceipt, Credential), SettleError> {
        let prefix = format!("{}:", SUITE_PEDERSEN_SCHNORR_POSEIDON_ULTRAHONK);
        let commitment_hex = commitment_ext
            .commitment
            .strip_prefix(&prefix)
            .ok_or(SettleError::UnsupportedSuite)?;
        let commitment = Point::decode_uncompressed(commitment_hex)
            .map_err(|e| SettleError::InvalidCommitment(e.to_string()))?;

        let verify_outcome = self.backend.verify(payment, requirements).await?;
        if !verify_outcome.is_valid {
            return Err(SettleError::PaymentVerificationFailed(
                verify_outcome.invalid_reason.unwrap_or_else(|| "rejected".to_string()),
            ));
        }

        let settle_outcome = self.backend.settle(payment, requirements).await?;
        if !settle_outcome.success {
            return Err(SettleError::PaymentSettlementFailed(
                settle_outcome.error_reason.unwrap_or_else(|| "settlement failed".to_string()),
            ));
        }

        let paid_cents = self
            .backend
            .amount_to_cents(requirements)
            .ok_or_else(|| SettleError::PaymentSettlementFailed("unparseable amount".to_string()))?;
        let tier = select_tier(&self.tiers, paid_cents).ok_or(SettleError::BelowMinimumTier)?;

        let issued_at = self.clock.now();
        let expires_at = issued_at + tier.duration_seconds;

        let message = poseidon_h7(
            self.service_id,
            F::from(tier.tier as u64),
            F::from(tier.identity_limit as u64),
            F::from(issued_at as u64),
            F::from(expires_at as u64),
            commitment.x(),
            commitment.y(),
        );
        let sig = schnorr_sign(&self.secret_key, message)
            .map_err(|e| SettleError::InvalidCommitment(e.to_string()))?;

        let credential = Credential {
            suite: SUITE_PEDERSEN_SCHNORR_POSEIDON_ULTRAHONK.to_string(),
            service_id: self.service_id,
            tier: tier.tier,
            identity_budget: tier.identity_limit,
            issued_at,
            expires_at,
            commitment: format!("{}{}", prefix, commitment.encode_uncompressed()),
            signature: encode_signature(&sig.r, &sig.s),
            kid: self.kid.clone(),
        };

        let receipt = crate::wire::PaymentReceipt {
            status: "settled".to_string(),
            tx_hash: settle_outcome.transaction.unwrap_or_default(),
            amount_usdc: tier.price_usdc.clone(),
        };

        Ok((receipt, credential))
    }
}

/// `R.x || R.y || s`, each 32 bytes big-endian, `0x`-prefixed.
fn encode_signature(r: &Point, s: &Scalar) -> String {
    let rx = crate::crypto::encode_field(&r.x());
    let ry = crate::crypto::encode_field(&r.y());
    let mut s_bytes = s.into_bigint().to_bytes_be();
    while s_bytes.len() < 32 {
        s_bytes.insert(0, 0);
    }
    format!("{}{}{}", rx, &ry[2..], hex::encode(s_bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::facilitator::payment::MockPaymentBackend;
    use crate::facilitator::tiers::default_tiers;
    use crate::wire::Extra;

    fn requirements(amount: &str) -> PaymentRequirements {
        PaymentRequirements {
            scheme: "exact".to_string(),
            network: "eip155:8453".to_string(),
            max_amount_required: amount.to_string(),
            asset: "USDC".to_string(),
            pay_to: "0xabc".to_string(),
            resource: "https://example.com/api".to_string(),
            description: "test".to_string(),
            max_timeout_seconds: 60,
            extra: Extra::default(),
        }
    }

    fn payment() -> PaymentPayload {
        PaymentPayload {
            x402_version: 2,
            scheme: "exact".to_string(),
            network: "eip155:8453".to_string(),
            payload: serde_json::json!({}),
        }
    }

    fn issuer() -> CredentialIssuer<MockPaymentBackend> {
        CredentialIssuer::new(
            F::from(1u64),
            Scalar::from(777u64),
            Some("facilitator-key-1".to_string()),
            default_tiers(),
            Arc::new(MockPaymentBackend::new()),
            Arc::new(FixedClock::new(1_700_000_000)),
        )
    }

    #[tokio::test]
    async fn initialize_is_idempotent() {
        let issuer = issuer();
        let pk1 = issuer.initialize().await.unwrap();
        let pk2 = issuer.initialize().await.unwrap();
        assert_eq!(pk1, pk2);
    }

    #[tokio::test]
    async fn settle_issues_a_verifiable_credential() {
        let issuer = issuer();
        let pk = issuer.initialize().await.unwrap();

        let nullifier_seed = F::from(42u64);
        let blinding = F::from(99u64);
        let commitment = crate::crypto::pedersen_commit(nullifier_seed, blinding);
        let commitment_ext = SettlementCommitmentExtension {
            commitment: format!(
                "{}:{}",
                SUITE_PEDERSEN_SCHNORR_POSEIDON_ULTRAHONK,
                commitment.encode_uncompressed()
            ),
        };

        let (receipt, cred) = issuer
            .settle(&payment(), &requirements("1000000"), &commitment_ext)
            .await
            .unwrap();

        assert_eq!(receipt.status, "settled");
        assert_eq!(cred.tier, 2);
        assert_eq!(cred.identity_budget, 1000);
        assert_eq!(cred.expires_at - cred.issued_at, 7 * 86_400);

        let message = cred.signed_message().unwrap();
        let sig_hex = cred.signature.strip_prefix("0x").unwrap();
        let bytes = hex::decode(sig_hex).unwrap();
        let rx = crate::crypto::decode_field(&format!("0x{}", hex::encode(&bytes[0..32]))).unwrap();
        let ry = crate::crypto::decode_field(&format!("0x{}", hex::encode(&bytes[32..64]))).unwrap();
        let r = Point::new(rx, ry).unwrap();
        use ark_ff::PrimeField as _;
        let s = Scalar::from_be_bytes_mod_order(&bytes[64..96]);
        let sig = crate::crypto::schnorr::SchnorrSignature { r, s };
        assert!(crate::crypto::schnorr_verify(&pk, message, &sig));
    }

    #[tokio::test]
    async fn settle_rejects_below_minimum_payment() {
        let issuer = issuer();
        let nullifier_seed = F::from(1u64);
        let blinding = F::from(2u64);
        let commitment = crate::crypto::pedersen_commit(nullifier_seed, blinding);
        let commitment_ext = SettlementCommitmentExtension {
            commitment: format!(
                "{}:{}",
                SUITE_PEDERSEN_SCHNORR_POSEIDON_ULTRAHONK,
                commitment.encode_uncompressed()
            ),
        };
        let result = issuer.settle(&payment(), &requirements("0"), &commitment_ext).await;
        assert!(matches!(result, Err(SettleError::BelowMinimumTier)));
    }

    #[tokio::test]
    async fn settle_propagates_payment_verification_failure() {
        let issuer = CredentialIssuer::new(
            F::from(1u64),
            Scalar::from(777u64),
            None,
            default_tiers(),
            Arc::new(MockPaymentBackend::always_fail_verify()),
            Arc::new(FixedClock::new(1_700_000_000)),
        );
        let commitment = crate::crypto::pedersen_commit(F::from(1u64), F::from(2u64));
        let commitment_ext = SettlementCommitmentExtension {
            commitment: format!(
                "{}:{}",
                SUITE_PEDERSEN_SCHNORR_POSEIDON_ULTRAHONK,
                commitment.encode_uncompressed()
            ),
        };
        let result = issuer.settle(&payment(), &requirements("1000000"), &commitment_ext).await;
        assert!(matches!(result, Err(SettleError::PaymentVerificationFailed(_))));
    }
}
