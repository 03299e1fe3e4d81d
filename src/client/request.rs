//! Authenticated-request assembly (spec §4.6.4): select an identity index,
//! reuse a cached proof or generate a fresh one, and merge the resulting
//! presentation envelope into the caller's application payload.

#![allow(dead_code)]

use std::collections::HashMap;

use serde_json::Value;

use crate::abi::{ProofBytes, PublicInputs, PublicOutputs, Witness, SUITE_PEDERSEN_SCHNORR_POSEIDON_ULTRAHONK};
use crate::client::cache::{CacheKey, CachedProof, ProofCache};
use crate::client::prover_backend::{Prover, ProverError};
use crate::client::strategy::Strategy;
use crate::credential::{CredentialError, StoredCredential};
use crate::crypto::{CurveError, Point};
use crate::origin::{origin_id, OriginError};
use crate::wire::{Presentation, PresentationEnvelope, PresentedPublicOutputs};
use crate::F;

/// Build the JSON body for a credential-presenting request: `{
/// zk_credential: {...} }` merged with whatever top-level fields the
/// caller's own application payload carries. A field name collision with
/// `zk_credential` itself is not possible — `zk_credential` is always the
/// envelope's own key — but a collision with an application field keeps
/// the application's value, since the envelope is inserted first and
/// `entry().or_insert` never overwrites it.
pub fn build_presentation_body(
    proof: ProofBytes,
    kid: Option<String>,
    origin_token: F,
    tier: u32,
    expires_at: i64,
    current_time: Option<i64>,
    application_payload: Option<Value>,
) -> Value {
    let envelope = PresentationEnvelope {
        zk_credential: Presentation {
            version: "0.2.0".to_string(),
            suite: SUITE_PEDERSEN_SCHNORR_POSEIDON_ULTRAHONK.to_string(),
            kid,
            proof,
            public_outputs: PresentedPublicOutputs { origin_token, tier, expires_at, current_time },
        },
    };
    let mut body = serde_json::to_value(&envelope).expect("presentation envelope always serializes");

    if let Some(Value::Object(app_fields)) = application_payload {
        if let Value::Object(ref mut map) = body {
            for (k, v) in app_fields {
                map.entry(k).or_insert(v);
            }
        }
    }

    body
}

#[derive(Debug, thiserror::Error)]
pub enum AuthenticatedRequestError {
    #[error("credential is expired or exhausted")]
    CredentialUnusable,
    #[error("origin error: {0}")]
    Origin(#[from] OriginError),
    #[error("malformed stored credential: {0}")]
    Credential(#[from] CredentialError),
    #[error("malformed facilitator public key: {0}")]
    FacilitatorPubkey(CurveError),
    #[error("prover error: {0}")]
    Prover(#[from] ProverError),
    #[error("prover returned a public I/O vector too short to parse")]
    MalformedPublicOutputs,
}

pub struct AuthenticatedRequestOutcome {
    pub body: Value,
    pub identity_index: u32,
    pub from_cache: bool,
}

/// Assemble one credential-presenting request (spec §4.6.4): reject an
/// unusable credential up front, select an identity index per `strategy`,
/// reuse a cached proof for that `(origin, identity_index, time_bucket)`
/// shape if one is live, otherwise assemble the witness and invoke
/// `prover`, then merge the resulting presentation envelope with
/// `application_payload`.
#[allow(clippy::too_many_arguments)]
pub async fn authenticated_request<P: Prover>(
    prover: &P,
    credential: &mut StoredCredential,
    cache: &mut ProofCache,
    strategy: Strategy,
    time_bucket_seconds: i64,
    force_unlinkable: bool,
    per_origin_memo: &mut HashMap<F, u32>,
    resource_url: &str,
    now: i64,
    application_payload: Option<Value>,
) -> Result<AuthenticatedRequestOutcome, AuthenticatedRequestError> {
    if !credential.is_usable(now) {
        return Err(AuthenticatedRequestError::CredentialUnusable);
    }

    let origin = origin_id(resource_url)?;
    let (identity_index, time_bucket) = strategy.select(
        credential,
        origin,
        now,
        time_bucket_seconds,
        force_unlinkable,
        per_origin_memo,
    );

    let cache_key = CacheKey {
        service_id: credential.credential.service_id,
        origin_id: origin,
        identity_index,
        time_bucket,
    };

    let (proof, origin_token, tier, expires_at, from_cache) =
        if let Some(cached) = cache.get(&cache_key, now) {
            (cached.proof, cached.origin_token, cached.tier, cached.expires_at, true)
        } else {
            let facilitator_pubkey = Point::decode_uncompressed(&credential.facilitator_pubkey)
                .map_err(AuthenticatedRequestError::FacilitatorPubkey)?;
            let commitment = credential.credential.commitment_point()?;
            let (sig_r, sig_s) = credential.credential.signature_parts()?;

            let witness = Witness {
                nullifier_seed: credential.nullifier_seed,
                blinding_factor: credential.blinding_factor,
                service_id: credential.credential.service_id,
                tier: credential.credential.tier,
                identity_budget: credential.credential.identity_budget,
                issued_at: credential.credential.issued_at,
                expires_at: credential.credential.expires_at,
                commitment_x: commitment.x(),
                commitment_y: commitment.y(),
                facilitator_pubkey_x: facilitator_pubkey.x(),
                facilitator_pubkey_y: facilitator_pubkey.y(),
                signature_r_x: sig_r.x(),
                signature_r_y: sig_r.y(),
                signature_s: sig_s,
                identity_index,
            };
            let public_inputs = PublicInputs {
                service_id: credential.credential.service_id,
                current_time: F::from(now as u64),
                origin_id: origin,
                facilitator_pubkey_x: facilitator_pubkey.x(),
                facilitator_pubkey_y: facilitator_pubkey.y(),
            };

            let (proof, io) = prover.prove(&witness, &public_inputs).await?;
            let outputs = PublicOutputs::from_tail(&io)
                .ok_or(AuthenticatedRequestError::MalformedPublicOutputs)?;

            cache.insert(
                cache_key,
                CachedProof {
                    proof: proof.clone(),
                    origin_token: outputs.origin_token,
                    tier: outputs.tier,
                    expires_at: outputs.expires_at,
                },
                now,
            );
            (proof, outputs.origin_token, outputs.tier, outputs.expires_at, false)
        };

    let body = build_presentation_body(
        proof,
        credential.credential.kid.clone(),
        origin_token,
        tier,
        expires_at,
        Some(now),
        application_payload,
    );

    Ok(AuthenticatedRequestOutcome { body, identity_index, from_cache })
}
