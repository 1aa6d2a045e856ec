//! In-memory key store

use crate::error::CollaboratorError;
use crate::wallet::{KeyMaterial, KeyRef, KeyStore};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

/// Key references mapped to secrets, with a record of every lookup.
#[derive(Default)]
pub struct MemoryKeyStore {
    secrets: HashMap<String, String>,
    locked: AtomicBool,
    requested: Mutex<Vec<KeyRef>>,
}

impl MemoryKeyStore {
    pub fn new(secrets: HashMap<String, String>) -> Self {
        Self {
            secrets,
            ..Self::default()
        }
    }

    pub fn with_key(mut self, reference: impl Into<String>, secret: impl Into<String>) -> Self {
        self.secrets.insert(reference.into(), secret.into());
        self
    }

    /// A locked store denies every lookup.
    pub fn set_locked(&self, locked: bool) {
        self.locked.store(locked, Ordering::SeqCst);
    }

    /// References looked up so far, in order.
    pub fn requested(&self) -> Vec<KeyRef> {
        self.requested
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl KeyStore for MemoryKeyStore {
    async fn get_key(&self, key: &KeyRef) -> Result<KeyMaterial, CollaboratorError> {
        self.requested
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(key.clone());

        if self.locked.load(Ordering::SeqCst) {
            return Err(CollaboratorError::AccessDenied("wallet is locked".to_string()));
        }
        self.secrets
            .get(key.as_str())
            .map(|secret| KeyMaterial::new(secret.as_str()))
            .ok_or_else(|| CollaboratorError::NotFound(format!("key {}", key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn locked_store_denies_and_records_lookups() {
        let store = MemoryKeyStore::default().with_key("active", "secret");
        assert_eq!(store.get_key(&KeyRef::new("active")).await.unwrap().expose(), "secret");

        store.set_locked(true);
        let err = store.get_key(&KeyRef::new("active")).await.unwrap_err();
        assert!(matches!(err, CollaboratorError::AccessDenied(_)));
        assert_eq!(store.requested().len(), 2);
    }
}
