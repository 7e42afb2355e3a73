//! Management API port

use std::sync::Arc;

use async_trait::async_trait;
use warden_domain::{AuthResult, MetadataPatch, UserProfile};

/// Port for reading and patching full user profiles.
#[async_trait]
pub trait ProfileApi: Send + Sync {
    /// Fetches the full profile, including metadata.
    ///
    /// # Errors
    /// `InvalidCredentials` for a rejected token, or `Network`.
    async fn get_full_profile(&self, user_id: &str, access_token: &str)
    -> AuthResult<UserProfile>;

    /// Merges `patch` into the user's metadata at the provider and returns
    /// the updated full profile. Keys not in the patch are preserved.
    ///
    /// # Errors
    /// As [`ProfileApi::get_full_profile`], plus `Validation` when the
    /// provider rejects the values.
    async fn update_metadata(
        &self,
        user_id: &str,
        access_token: &str,
        patch: &MetadataPatch,
    ) -> AuthResult<UserProfile>;
}

#[async_trait]
impl<T: ProfileApi + ?Sized> ProfileApi for Arc<T> {
    async fn get_full_profile(
        &self,
        user_id: &str,
        access_token: &str,
    ) -> AuthResult<UserProfile> {
        (**self).get_full_profile(user_id, access_token).await
    }

    async fn update_metadata(
        &self,
        user_id: &str,
        access_token: &str,
        patch: &MetadataPatch,
    ) -> AuthResult<UserProfile> {
        (**self).update_metadata(user_id, access_token, patch).await
    }
}
