//! x402 v2 wire types: the payment-required challenge and its
//! `zk_credential` extension block (spec §4.4.1, §6).
//!
//! Shaped after the coinbase x402 reference facilitator's
//! `PaymentRequirements`/`PaymentPayload` types and the nodalync x402
//! crate's request/response layout — this crate only needs the subset
//! those two examples show plus the `extensions.zk_credential` block this
//! suite adds on top.

use serde::{Deserialize, Serialize};

use super::field_hex;
use crate::F;

/// `x402Version` carried at the top of every x402 body in this suite.
pub const X402_VERSION: u32 = 2;

pub mod schemes {
    pub const EXACT: &str = "exact";
}

/// EIP-3009-specific fields carried in `accepts[0].extra`. Empty in the
/// 402 challenge; the client fills these in itself from the EIP-712
/// domain it already knows (spec §4.4.1).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Extra {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// One accepted payment method, per x402 v2.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequirements {
    pub scheme: String,
    /// CAIP-2 network identifier, e.g. `"eip155:8453"`.
    pub network: String,
    pub max_amount_required: String,
    pub asset: String,
    pub pay_to: String,
    pub resource: String,
    pub description: String,
    pub max_timeout_seconds: u64,
    #[serde(default)]
    pub extra: Extra,
}

/// `extensions.zk_credential` as carried on the 402 challenge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZkCredentialChallengeExtension {
    pub version: String,
    pub credential_suites: Vec<String>,
    /// Suite-prefixed uncompressed point.
    pub facilitator_pubkey: String,
    pub facilitator_url: String,
}

/// The full body of a 402 response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequired {
    pub x402_version: u32,
    pub accepts: Vec<PaymentRequirements>,
    pub extensions: ChallengeExtensions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeExtensions {
    pub zk_credential: ZkCredentialChallengeExtension,
}

/// `extensions.zk_credential.commitment` carried on a payment-bearing
/// request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementCommitmentExtension {
    pub commitment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementExtensions {
    pub zk_credential: SettlementCommitmentExtension,
}

/// Opaque on-chain payment payload (out of scope beyond this shape, per
/// spec §1 — the `PaymentBackend` trait is what actually interprets it).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPayload {
    pub x402_version: u32,
    pub scheme: String,
    pub network: String,
    pub payload: serde_json::Value,
}

/// Body POSTed by the resource server to the facilitator's `/settle`
/// (spec §4.4.2: `{ payment, paymentRequirements, extensions }`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementRequest {
    pub payment: PaymentPayload,
    pub payment_requirements: PaymentRequirements,
    pub extensions: SettlementExtensions,
}

/// `payment_receipt` in a successful settle response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub status: String,
    pub tx_hash: String,
    pub amount_usdc: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialExtension {
    pub credential: crate::credential::Credential,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementResponseExtensions {
    pub zk_credential: CredentialExtension,
}

/// Body returned by the facilitator's `/settle`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementResponse {
    pub payment_receipt: PaymentReceipt,
    pub extensions: SettlementResponseExtensions,
}

/// `body.zk_credential` on a credential-presenting request (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresentationEnvelope {
    pub zk_credential: Presentation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Presentation {
    pub version: String,
    pub suite: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    pub proof: crate::abi::ProofBytes,
    pub public_outputs: PresentedPublicOutputs,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresentedPublicOutputs {
    #[serde(with = "field_hex")]
    pub origin_token: F,
    pub tier: u32,
    pub expires_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_time: Option<i64>,
}
