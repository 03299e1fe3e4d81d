//! `PaymentBackend`: the on-chain settlement collaborator interface
//! (spec §6). The real USDC transfer-authorization verification is out
//! of this crate's scope (spec §1); what's normative is the contract:
//! `verify` returns `{valid, invalidReason?}`, `settle` returns
//! `{success, transaction?, errorReason?}`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

use crate::wire::{PaymentPayload, PaymentRequirements};

/// Mirrors the spec's `{isValid, invalidReason?}` shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOutcome {
    pub is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalid_reason: Option<String>,
}

/// Mirrors the spec's `{success, transaction?, errorReason?}` shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum PaymentBackendError {
    #[error("payment backend transport error: {0}")]
    Transport(String),
}

/// `verify(payment, requirements) -> {isValid, invalidReason?}`;
/// `settle(payment, requirements) -> {success, transaction?, errorReason?}`.
///
/// Per spec §9 Open Question 4, `verify` is treated as side-effect free /
/// idempotent; callers (the facilitator's `settle` algorithm) call
/// `settle` exactly once per payload regardless of how many times
/// `verify` was called.
#[async_trait]
pub trait PaymentBackend: Send + Sync {
    async fn verify(
        &self,
        payment: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<VerifyOutcome, PaymentBackendError>;

    async fn settle(
        &self,
        payment: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<SettleOutcome, PaymentBackendError>;

    /// Smallest-unit amount, converted to cents, for the paid amount
    /// named in `requirements` (spec §4.3 step 4). A real backend reads
    /// the asset's decimals on-chain; the mock backend below just treats
    /// the requirement's `max_amount_required` as already being the
    /// smallest USDC unit (6 decimals) and converts accordingly.
    fn amount_to_cents(&self, requirements: &PaymentRequirements) -> Option<u64>;
}

/// An in-memory payment backend for local development and tests
/// (`allow_mock_payments` in `FacilitatorConfig`, spec §6). Always
/// succeeds unless configured to fail, and never touches a real chain.
pub struct MockPaymentBackend {
    fail_verify: bool,
    fail_settle: bool,
    settled: Mutex<Vec<String>>,
}

impl MockPaymentBackend {
    pub fn new() -> Self {
        Self { fail_verify: false, fail_settle: false, settled: Mutex::new(Vec::new()) }
    }

    pub fn always_fail_verify() -> Self {
        Self { fail_verify: true, fail_settle: false, settled: Mutex::new(Vec::new()) }
    }

    pub fn always_fail_settle() -> Self {
        Self { fail_verify: false, fail_settle: true, settled: Mutex::new(Vec::new()) }
    }

    pub fn settled_count(&self) -> usize {
        self.settled.lock().expect("settled mutex poisoned").len()
    }
}

impl Default for MockPaymentBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentBackend for MockPaymentBackend {
    async fn verify(
        &self,
        _payment: &PaymentPayload,
        _requirements: &PaymentRequirements,
    ) -> Result<VerifyOutcome, PaymentBackendError> {
        if self.fail_verify {
            Ok(VerifyOutcome { is_valid: false, invalid_reason: Some("mock_verify_failed".into()) })
        } else {
            Ok(VerifyOutcome { is_valid: true, invalid_reason: None })
        }
    }

    async fn settle(
        &self,
        _payment: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<SettleOutcome, PaymentBackendError> {
        if self.fail_settle {
            return Ok(SettleOutcome {
                success: false,
                transaction: None,
                error_reason: Some("mock_settle_failed".into()),
            });
        }
        let tx_hash = format!("0x{}", blake3::hash(requirements.max_amount_required.as_bytes()).to_hex());
        self.settled.lock().expect("settled mutex poisoned").push(tx_hash.clone());
        Ok(SettleOutcome { success: true, transaction: Some(tx_hash), error_reason: None })
    }

    fn amount_to_cents(&self, requirements: &PaymentRequirements) -> Option<u64> {
        // USDC has 6 decimals; smallest-unit amount / 10_000 = cents.
        let smallest_units: u64 = requirements.max_amount_required.parse().ok()?;
        Some(smallest_units / 10_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
            extra: Default::default(),
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

    #[tokio::test]
    async fn mock_backend_succeeds_by_default() {
        let backend = MockPaymentBackend::new();
        let reqs = requirements("1000000");
        let v = backend.verify(&payment(), &reqs).await.unwrap();
        assert!(v.is_valid);
        let s = backend.settle(&payment(), &reqs).await.unwrap();
        assert!(s.success);
        assert_eq!(backend.settled_count(), 1);
    }

    #[tokio::test]
    async fn mock_backend_can_be_configured_to_fail() {
        let backend = MockPaymentBackend::always_fail_verify();
        let v = backend.verify(&payment(), &requirements("1000000")).await.unwrap();
        assert!(!v.is_valid);
        assert_eq!(v.invalid_reason.as_deref(), Some("mock_verify_failed"));
    }

    #[test]
    fn amount_to_cents_converts_usdc_decimals() {
        let backend = MockPaymentBackend::new();
        assert_eq!(backend.amount_to_cents(&requirements("1000000")), Some(100));
        assert_eq!(backend.amount_to_cents(&requirements("10000")), Some(1));
    }
}
