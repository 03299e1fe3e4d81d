//! The `Prover` collaborator interface (spec §6) and a stub implementation
//! for integration tests that don't link a real UltraHonk prover.

#![allow(dead_code)]

use async_trait::async_trait;

use crate::abi::{ProofBytes, PublicInputs, Witness};
use crate::origin::origin_token;
use crate::F;

#[derive(Debug, thiserror::Error)]
pub enum ProverError {
    #[error("proving backend error: {0}")]
    Backend(String),
}

/// Produces a proof and its public I/O vector for a witness against a set
/// of public inputs. A production build wires this to the UltraHonk
/// prover for the registered suite; this crate only needs the seam.
#[async_trait]
pub trait Prover: Send + Sync {
    async fn prove(
        &self,
        witness: &Witness,
        public_inputs: &PublicInputs,
    ) -> Result<(ProofBytes, Vec<F>), ProverError>;
}

/// Computes the same public outputs a real circuit would emit
/// (`origin_token`, `tier`, `expires_at`) but returns fixed, non-succinct
/// proof bytes — good enough to drive a `skip_proof_verification` resource
/// server end to end without a real proving backend.
pub struct StubProver;

#[async_trait]
impl Prover for StubProver {
    async fn prove(
        &self,
        witness: &Witness,
        public_inputs: &PublicInputs,
    ) -> Result<(ProofBytes, Vec<F>), ProverError> {
        let token = origin_token(witness.nullifier_seed, public_inputs.origin_id, witness.identity_index);
        let mut io = public_inputs.to_vec();
        io.push(token);
        io.push(F::from(witness.tier as u64));
        io.push(F::from(witness.expires_at as u64));
        Ok((ProofBytes(vec![0x5au8; 32]), io))
    }
}
