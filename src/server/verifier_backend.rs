//! The `Verifier` collaborator interface (spec §6) and its single-flight
//! lifecycle, mirroring the `SRS_INITIALIZED`-gated init/destroy pattern
//! used for proving parameters elsewhere in this crate's teacher lineage.

#![allow(dead_code)]

use async_trait::async_trait;
use tokio::sync::OnceCell;

use crate::abi::ProofBytes;
use crate::F;

#[derive(Debug, thiserror::Error)]
pub enum VerifierError {
    #[error("proof failed verification")]
    Rejected,
    #[error("verifier backend error: {0}")]
    Backend(String),
}

/// `init() -> ()`, `verify({proof, public_inputs}) -> {valid, error?}`,
/// `destroy() -> ()` (spec §6). The middleware MUST survive an error from
/// `verify` without tearing the backend down (spec §5 Resource policy):
/// only `destroy` releases backend resources.
#[async_trait]
pub trait Verifier: Send + Sync {
    async fn init(&self) -> Result<(), VerifierError>;
    async fn verify(&self, proof: &ProofBytes, public_io: &[F]) -> Result<bool, VerifierError>;
    async fn destroy(&self);
}

/// A verifier whose accept/reject behavior is fixed at construction time,
/// for resource-server integration tests that don't want to depend on a
/// real proving backend (paired with `skip_proof_verification`, spec
/// §4.4.4, for end-to-end dev-mode testing).
pub struct StubVerifier {
    accept: bool,
}

impl StubVerifier {
    pub fn accepting() -> Self {
        Self { accept: true }
    }

    pub fn rejecting() -> Self {
        Self { accept: false }
    }
}

#[async_trait]
impl Verifier for StubVerifier {
    async fn init(&self) -> Result<(), VerifierError> {
        Ok(())
    }

    async fn verify(&self, proof: &ProofBytes, _public_io: &[F]) -> Result<bool, VerifierError> {
        if proof.is_empty() {
            return Err(VerifierError::Backend("empty proof bytes".to_string()));
        }
        Ok(self.accept)
    }

    async fn destroy(&self) {}
}

/// Wraps any [`Verifier`] with a single-flight `init()` guard: concurrent
/// first calls to [`VerifierHandle::ensure_initialized`] share one
/// in-flight initialization rather than racing the backend's `init`. On
/// failure the cell is left empty so a subsequent call can retry (spec §5
/// "on failure the stored future MUST be cleared").
pub struct VerifierHandle<V> {
    inner: V,
    initialized: OnceCell<()>,
}

impl<V: Verifier> VerifierHandle<V> {
    pub fn new(inner: V) -> Self {
        Self { inner, initialized: OnceCell::new() }
    }

    pub async fn ensure_initialized(&self) -> Result<(), VerifierError> {
        self.initialized
            .get_or_try_init(|| async { self.inner.init().await })
            .await
            .map(|_| ())
    }

    pub async fn verify(&self, proof: &ProofBytes, public_io: &[F]) -> Result<bool, VerifierError> {
        self.ensure_initialized().await?;
        self.inner.verify(proof, public_io).await
    }

    pub async fn destroy(&self) {
        self.inner.destroy().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn accepting_stub_verifies_nonempty_proofs() {
        let v = StubVerifier::accepting();
        let proof = ProofBytes(vec![1, 2, 3]);
        assert!(v.verify(&proof, &[]).await.unwrap());
    }

    #[tokio::test]
    async fn rejecting_stub_rejects() {
        let v = StubVerifier::rejecting();
        let proof = ProofBytes(vec![1, 2, 3]);
        assert!(!v.verify(&proof, &[]).await.unwrap());
    }

    #[tokio::test]
    async fn empty_proof_bytes_error_out() {
        let v = StubVerifier::accepting();
        let proof = ProofBytes(vec![]);
        assert!(v.verify(&proof, &[]).await.is_err());
    }

    #[tokio::test]
    async fn handle_initializes_once_and_survives_verify_errors() {
        let handle = VerifierHandle::new(StubVerifier::accepting());
        handle.ensure_initialized().await.unwrap();
        handle.ensure_initialized().await.unwrap();

        let empty = ProofBytes(vec![]);
        assert!(handle.verify(&empty, &[]).await.is_err());
        // The backend survives a verify() error; a subsequent verify()
        // still works rather than needing re-initialization.
        let nonempty = ProofBytes(vec![9]);
        assert!(handle.verify(&nonempty, &[]).await.unwrap());
    }
}
