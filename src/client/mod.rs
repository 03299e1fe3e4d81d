//! The client: commitment lifecycle, storage, presentation strategies,
//! proof generation, and the proof cache (spec §4.6, §4.7).

pub mod cache;
pub mod discovery;
pub mod prover_backend;
pub mod request;
pub mod settlement;
pub mod storage;
pub mod strategy;

pub use cache::{CacheKey, CachedProof, ProofCache};
pub use discovery::{discover, DiscoveryCache, DiscoveryError};
pub use prover_backend::{Prover, ProverError, StubProver};
pub use request::{authenticated_request, build_presentation_body, AuthenticatedRequestError, AuthenticatedRequestOutcome};
pub use settlement::{settle_and_obtain_credential, SettlementError};
pub use storage::{CredentialStore, InMemoryCredentialStore, StoreError};
pub use strategy::Strategy;
