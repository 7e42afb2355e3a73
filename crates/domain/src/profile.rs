//! User profile and metadata types

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::auth::AuthError;

/// Free-form, provider-defined user metadata.
pub type Metadata = BTreeMap<String, Value>;

/// How much of the profile the provider returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileFidelity {
    /// Claims from the ID token or userinfo endpoint.
    Minimal,
    /// Record from the management API, including metadata.
    Full,
}

/// A user as known to the identity provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Stable user identifier, e.g. `auth0|123`.
    pub id: String,
    /// Display name.
    pub name: Option<String>,
    /// Email address.
    pub email: Option<String>,
    /// User metadata; empty for minimal profiles.
    #[serde(default)]
    pub user_metadata: Metadata,
    /// Source of this profile.
    pub fidelity: ProfileFidelity,
}

impl UserProfile {
    /// Creates a minimal profile.
    #[must_use]
    pub fn minimal(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            email: None,
            user_metadata: Metadata::new(),
            fidelity: ProfileFidelity::Minimal,
        }
    }

    /// Creates a full profile.
    #[must_use]
    pub fn full(id: impl Into<String>, user_metadata: Metadata) -> Self {
        Self {
            user_metadata,
            fidelity: ProfileFidelity::Full,
            ..Self::minimal(id)
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the email.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Gets a metadata value.
    #[must_use]
    pub fn metadata(&self, key: &str) -> Option<&Value> {
        self.user_metadata.get(key)
    }

    /// Gets a metadata value if it is a string.
    #[must_use]
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata(key).and_then(Value::as_str)
    }

    /// Merges a profile fetched for the same user into this one.
    ///
    /// Fields carried by `other` win; fields it lacks keep their current
    /// value. Metadata is replaced only by a full profile.
    pub fn merge(&mut self, other: Self) {
        if other.id != self.id {
            *self = other;
            return;
        }
        if other.name.is_some() {
            self.name = other.name;
        }
        if other.email.is_some() {
            self.email = other.email;
        }
        if other.fidelity == ProfileFidelity::Full {
            self.user_metadata = other.user_metadata;
            self.fidelity = ProfileFidelity::Full;
        }
    }
}

/// A validated set of metadata changes.
///
/// Keys not present in the patch are left untouched at the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataPatch(Metadata);

impl MetadataPatch {
    /// Validates a metadata map.
    ///
    /// # Errors
    /// Returns `AuthError::Validation` for an empty patch or a blank key.
    pub fn new(entries: Metadata) -> Result<Self, AuthError> {
        if entries.is_empty() {
            return Err(AuthError::validation("metadata patch is empty"));
        }
        if entries.keys().any(|key| key.trim().is_empty()) {
            return Err(AuthError::validation("metadata keys must not be blank"));
        }
        Ok(Self(entries))
    }

    /// Creates a patch setting one key.
    ///
    /// # Errors
    /// Returns `AuthError::Validation` if the key is blank.
    pub fn single(key: impl Into<String>, value: impl Into<Value>) -> Result<Self, AuthError> {
        Self::new(Metadata::from([(key.into(), value.into())]))
    }

    /// Borrows the changes.
    #[must_use]
    pub const fn as_map(&self) -> &Metadata {
        &self.0
    }

    /// Applies the patch to local metadata, preserving other keys.
    pub fn apply_to(&self, metadata: &mut Metadata) {
        for (key, value) in &self.0 {
            metadata.insert(key.clone(), value.clone());
        }
    }
}

impl TryFrom<Metadata> for MetadataPatch {
    type Error = AuthError;

    fn try_from(entries: Metadata) -> Result<Self, Self::Error> {
        Self::new(entries)
    }
}
