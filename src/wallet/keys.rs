//! Key material access
//!
//! SECURITY: key material only exists inside `KeyMaterial`.
//! - It is never serialized
//! - Its `Debug` output is redacted
//! - It is never logged

use super::KeyRef;
use crate::error::CollaboratorError;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

/// Decrypted signing key handed to the chain library for a single operation.
pub struct KeyMaterial {
    secret: SecretString,
}

impl KeyMaterial {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: SecretString::from(secret.into()),
        }
    }

    /// Raw key string for the chain library. Never log the returned value.
    pub fn expose(&self) -> &str {
        self.secret.expose_secret()
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Secure key retrieval. Fails when the key is absent or access is denied.
#[async_trait]
pub trait KeyStore: Send + Sync {
    async fn get_key(&self, key: &KeyRef) -> Result<KeyMaterial, CollaboratorError>;
}
