//! Client-local credential storage (spec §6 CredentialStore collaborator
//! interface, §4.7 presentation-count monotonicity).

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::credential::StoredCredential;
use crate::F;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("no credential stored for this service")]
    NotFound,
}

/// Persists at most one [`StoredCredential`] per `service_id`. A real
/// deployment backs this with a file or a platform keystore (`storage_path`
/// in [`crate::config::ClientConfig`]); this trait is the seam.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get(&self, service_id: F) -> Option<StoredCredential>;
    async fn set(&self, credential: StoredCredential);
    async fn remove(&self, service_id: F);
    async fn list(&self) -> Vec<StoredCredential>;
    async fn clear(&self);

    /// Atomically bump and return the new `presentation_count` for the
    /// credential stored against `service_id`. Spec invariant: counts
    /// handed out this way are strictly increasing and never repeat, even
    /// under concurrent callers racing the same service.
    async fn increment_presentation_count(&self, service_id: F) -> Result<u32, StoreError>;
}

#[derive(Default)]
pub struct InMemoryCredentialStore {
    entries: Mutex<HashMap<F, StoredCredential>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn get(&self, service_id: F) -> Option<StoredCredential> {
        self.entries.lock().unwrap().get(&service_id).cloned()
    }

    async fn set(&self, credential: StoredCredential) {
        let service_id = credential.credential.service_id;
        self.entries.lock().unwrap().insert(service_id, credential);
    }

    async fn remove(&self, service_id: F) {
        self.entries.lock().unwrap().remove(&service_id);
    }

    async fn list(&self) -> Vec<StoredCredential> {
        self.entries.lock().unwrap().values().cloned().collect()
    }

    async fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }

    async fn increment_presentation_count(&self, service_id: F) -> Result<u32, StoreError> {
        let mut guard = self.entries.lock().unwrap();
        let entry = guard.get_mut(&service_id).ok_or(StoreError::NotFound)?;
        entry.presentation_count = entry.presentation_count.wrapping_add(1);
        Ok(entry.presentation_count)
    }
}
