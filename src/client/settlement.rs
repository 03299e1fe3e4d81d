//! Settlement: turn a payment plus a freshly sampled commitment into a
//! stored credential (spec §4.6.1).

#![allow(dead_code)]

use reqwest::StatusCode;

use crate::abi::SUITE_PEDERSEN_SCHNORR_POSEIDON_ULTRAHONK;
use crate::credential::StoredCredential;
use crate::crypto::{pedersen_commit, random_field_element};
use crate::wire::{
    PaymentPayload, PaymentRequirements, SettlementCommitmentExtension, SettlementExtensions,
    SettlementRequest, SettlementResponse,
};

#[derive(Debug, thiserror::Error)]
pub enum SettlementError {
    #[error("transport error reaching {0}: {1}")]
    Transport(String, String),
    #[error("facilitator rejected settlement with status {0}: {1}")]
    Rejected(u16, String),
    #[error("malformed settlement response: {0}")]
    MalformedResponse(String),
    /// The facilitator's response echoed a commitment other than the one
    /// this client sent: it minted a credential against some other
    /// party's secret, and presenting it would prove nothing this client
    /// actually knows (spec §4.6.1 step 5, §8 property 6, scenario S6).
    #[error("malicious_facilitator: commitment mismatch")]
    MaliciousFacilitator,
}

/// Sample `(nullifier_seed, blinding_factor)`, commit to them, settle the
/// payment against the facilitator, and verify it issued a credential
/// against exactly that commitment.
pub async fn settle_and_obtain_credential(
    http: &reqwest::Client,
    facilitator_url: &str,
    facilitator_pubkey: &str,
    payment: PaymentPayload,
    requirements: PaymentRequirements,
) -> Result<StoredCredential, SettlementError> {
    let nullifier_seed = random_field_element();
    let blinding_factor = random_field_element();
    let commitment = pedersen_commit(nullifier_seed, blinding_factor);
    let commitment_hex = format!(
        "{}:{}",
        SUITE_PEDERSEN_SCHNORR_POSEIDON_ULTRAHONK,
        commitment.encode_uncompressed()
    );

    let request = SettlementRequest {
        payment,
        payment_requirements: requirements,
        extensions: SettlementExtensions {
            zk_credential: SettlementCommitmentExtension { commitment: commitment_hex.clone() },
        },
    };

    let url = format!("{}/settle", facilitator_url.trim_end_matches('/'));
    let response = http
        .post(&url)
        .json(&request)
        .send()
        .await
        .map_err(|e| SettlementError::Transport(url.clone(), e.to_string()))?;

    let status = response.status();
    if status != StatusCode::OK {
        let body_text = response.text().await.unwrap_or_default();
        return Err(SettlementError::Rejected(status.as_u16(), body_text));
    }

    let body: SettlementResponse = response
        .json()
        .await
        .map_err(|e| SettlementError::MalformedResponse(e.to_string()))?;

    let credential = body.extensions.zk_credential.credential;
    if !commitments_echo(&credential.commitment, &commitment_hex) {
        return Err(SettlementError::MaliciousFacilitator);
    }

    let obtained_at = credential.issued_at;
    Ok(StoredCredential {
        credential,
        nullifier_seed,
        blinding_factor,
        facilitator_pubkey: facilitator_pubkey.to_string(),
        presentation_count: 0,
        obtained_at,
    })
}

fn commitments_echo(returned: &str, sent: &str) -> bool {
    returned.eq_ignore_ascii_case(sent)
}
