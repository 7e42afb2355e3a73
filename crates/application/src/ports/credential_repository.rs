//! Credential repository port
//!
//! Defines the interface for persisting the current credential set.

use std::sync::Arc;

use async_trait::async_trait;
use warden_domain::{AuthError, Credentials};

/// Errors that can occur during credential persistence.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The record was written by an incompatible version.
    #[error("Unsupported schema version: {0}")]
    UnsupportedSchema(u32),
}

impl From<StorageError> for AuthError {
    fn from(error: StorageError) -> Self {
        Self::storage(error.to_string())
    }
}

/// Repository trait for the persisted credential copy.
#[async_trait]
pub trait CredentialRepository: Send + Sync {
    /// Loads the persisted credentials.
    ///
    /// # Returns
    /// `None` if nothing is persisted.
    async fn load(&self) -> Result<Option<Credentials>, StorageError>;

    /// Replaces the persisted credentials.
    ///
    /// Implementations must never leave a mix of old and new fields behind.
    ///
    /// # Errors
    /// Returns an error if the record cannot be written.
    async fn save(&self, credentials: &Credentials) -> Result<(), StorageError>;

    /// Removes the persisted credentials. Removing nothing is not an error.
    async fn clear(&self) -> Result<(), StorageError>;
}

#[async_trait]
impl<T: CredentialRepository + ?Sized> CredentialRepository for Arc<T> {
    async fn load(&self) -> Result<Option<Credentials>, StorageError> {
        (**self).load().await
    }

    async fn save(&self, credentials: &Credentials) -> Result<(), StorageError> {
        (**self).save(credentials).await
    }

    async fn clear(&self) -> Result<(), StorageError> {
        (**self).clear().await
    }
}
