//! Management API adapter for full user profiles.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;
use warden_application::ports::ProfileApi;
use warden_domain::{AuthError, AuthResult, IdentityConfig, Metadata, MetadataPatch, UserProfile};

use super::http::{ErrorBody, build_client, map_transport_error, server_error};

/// `GET /api/v2/users/{id}` response.
#[derive(Debug, Deserialize)]
struct UserResponse {
    user_id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: Option<Metadata>,
}

impl From<UserResponse> for UserProfile {
    fn from(user: UserResponse) -> Self {
        let mut profile = Self::full(user.user_id, user.user_metadata.unwrap_or_default());
        profile.name = user.name;
        profile.email = user.email;
        profile
    }
}

#[derive(Serialize)]
struct MetadataUpdate<'a> {
    user_metadata: &'a Metadata,
}

/// Profile API backed by the provider's management API.
pub struct ManagementApiClient {
    http: Client,
    base: Url,
}

impl ManagementApiClient {
    /// Creates a client for the configured tenant.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the tenant URL is invalid and `Network` if
    /// the HTTP client cannot be built.
    pub fn new(config: &IdentityConfig) -> AuthResult<Self> {
        let base = config
            .endpoint("api/v2/users/")
            .map_err(|e| AuthError::validation(e.to_string()))?;
        Ok(Self {
            http: build_client(config.request_timeout())?,
            base,
        })
    }

    /// URL of one user; the id is percent-encoded as a single path segment.
    fn user_url(&self, user_id: &str) -> Url {
        let segment: String = url::form_urlencoded::byte_serialize(user_id.as_bytes()).collect();
        let mut url = self.base.clone();
        url.set_path(&format!("{}{segment}", self.base.path()));
        url
    }

    async fn into_profile(response: Response) -> AuthResult<UserProfile> {
        let status = response.status();
        debug!(status = status.as_u16(), "management API responded");
        match status {
            s if s.is_success() => {
                let user: UserResponse = response.json().await.map_err(map_transport_error)?;
                Ok(user.into())
            }
            StatusCode::BAD_REQUEST => {
                let body = ErrorBody::read(response).await;
                Err(AuthError::validation(
                    body.description()
                        .or_else(|| body.code())
                        .unwrap_or("request rejected"),
                ))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(AuthError::InvalidCredentials),
            StatusCode::NOT_FOUND => Err(AuthError::provider("user_not_found")),
            s if s.is_server_error() => Err(server_error(s)),
            s => {
                let body = ErrorBody::read(response).await;
                Err(AuthError::provider(body.code_or(&format!("http_{}", s.as_u16()))))
            }
        }
    }
}

#[async_trait]
impl ProfileApi for ManagementApiClient {
    async fn get_full_profile(
        &self,
        user_id: &str,
        access_token: &str,
    ) -> AuthResult<UserProfile> {
        let response = self
            .http
            .get(self.user_url(user_id))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(map_transport_error)?;
        Self::into_profile(response).await
    }

    async fn update_metadata(
        &self,
        user_id: &str,
        access_token: &str,
        patch: &MetadataPatch,
    ) -> AuthResult<UserProfile> {
        let response = self
            .http
            .patch(self.user_url(user_id))
            .bearer_auth(access_token)
            .json(&MetadataUpdate {
                user_metadata: patch.as_map(),
            })
            .send()
            .await
            .map_err(map_transport_error)?;
        Self::into_profile(response).await
    }
}
