//! File-based credential repository.
//!
//! The current credential set lives in `credentials.json` inside the store
//! directory. Writes go to a temporary sibling first and are renamed over
//! the record, so a reader sees either the old or the new set, never a mix.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use warden_application::ports::{CredentialRepository, FileSystem, FileSystemError, StorageError};
use warden_domain::{Credentials, Scope};

use crate::serialization::{from_json_bytes, to_json_stable_bytes};

/// Current on-disk schema version.
pub const CREDENTIALS_SCHEMA_VERSION: u32 = 1;

const CREDENTIALS_FILE: &str = "credentials.json";
const CREDENTIALS_TMP_FILE: &str = "credentials.json.tmp";

/// On-disk shape of the credential record.
///
/// ```json
/// {
///   "schema_version": 1,
///   "access_token": "...",
///   "refresh_token": "...",
///   "id_token": null,
///   "expires_at": "2025-01-01T12:00:00Z",
///   "scope": "email offline_access openid profile"
/// }
/// ```
#[derive(Serialize, Deserialize)]
struct StoredCredentials {
    schema_version: u32,
    access_token: String,
    refresh_token: Option<String>,
    id_token: Option<String>,
    expires_at: DateTime<Utc>,
    scope: String,
}

impl From<&Credentials> for StoredCredentials {
    fn from(credentials: &Credentials) -> Self {
        Self {
            schema_version: CREDENTIALS_SCHEMA_VERSION,
            access_token: credentials.access_token.clone(),
            refresh_token: credentials.refresh_token.clone(),
            id_token: credentials.id_token.clone(),
            expires_at: credentials.expires_at,
            scope: credentials.scope.to_string(),
        }
    }
}

impl From<StoredCredentials> for Credentials {
    fn from(stored: StoredCredentials) -> Self {
        Self {
            access_token: stored.access_token,
            refresh_token: stored.refresh_token,
            id_token: stored.id_token,
            expires_at: stored.expires_at,
            scope: Scope::parse(&stored.scope),
        }
    }
}

/// Credential repository backed by a private JSON file.
#[derive(Debug, Clone)]
pub struct FileCredentialRepository<F> {
    fs: F,
    dir: PathBuf,
}

impl<F: FileSystem> FileCredentialRepository<F> {
    /// Creates a repository storing its record in `dir`.
    pub fn new(fs: F, dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            dir: dir.into(),
        }
    }

    /// Platform default store directory, e.g. `~/.local/share/warden`.
    #[must_use]
    pub fn default_dir() -> Option<PathBuf> {
        dirs::data_local_dir().map(|dir| dir.join("warden"))
    }

    /// Path of the credential record.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        Self::record_path(&self.dir)
    }

    fn record_path(dir: &Path) -> PathBuf {
        dir.join(CREDENTIALS_FILE)
    }

    /// Removes a temporary record left behind by an interrupted write.
    async fn remove_tmp(&self, tmp: &Path) -> Result<(), StorageError> {
        match self.fs.remove_file(tmp).await {
            Ok(()) | Err(FileSystemError::NotFound(_)) => Ok(()),
            Err(error) => Err(StorageError::Io(error.into())),
        }
    }
}

#[async_trait]
impl<F: FileSystem> CredentialRepository for FileCredentialRepository<F> {
    async fn load(&self) -> Result<Option<Credentials>, StorageError> {
        let path = self.path();
        let bytes = match self.fs.read_file(&path).await {
            Ok(bytes) => bytes,
            Err(FileSystemError::NotFound(_)) => return Ok(None),
            Err(error) => return Err(StorageError::Io(error.into())),
        };

        let stored: StoredCredentials =
            from_json_bytes(&bytes).map_err(|e| StorageError::Serialization(e.to_string()))?;
        if stored.schema_version != CREDENTIALS_SCHEMA_VERSION {
            return Err(StorageError::UnsupportedSchema(stored.schema_version));
        }
        Ok(Some(stored.into()))
    }

    async fn save(&self, credentials: &Credentials) -> Result<(), StorageError> {
        let content = to_json_stable_bytes(&StoredCredentials::from(credentials))
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        self.fs
            .create_dir_all(&self.dir)
            .await
            .map_err(|e| StorageError::Io(e.into()))?;

        let tmp = self.dir.join(CREDENTIALS_TMP_FILE);
        self.remove_tmp(&tmp).await?;
        self.fs
            .write_private_file(&tmp, &content)
            .await
            .map_err(|e| StorageError::Io(e.into()))?;
        if let Err(error) = self.fs.rename(&tmp, &self.path()).await {
            if let Err(cleanup) = self.remove_tmp(&tmp).await {
                warn!(error = %cleanup, "cannot remove temporary credential record");
            }
            return Err(StorageError::Io(error.into()));
        }

        debug!(path = %self.path().display(), "credential record written");
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        match self.fs.remove_file(&self.path()).await {
            Ok(()) | Err(FileSystemError::NotFound(_)) => Ok(()),
            Err(error) => Err(StorageError::Io(error.into())),
        }
    }

}
