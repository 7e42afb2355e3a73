//! Identity provider port

use std::sync::Arc;

use async_trait::async_trait;
use warden_domain::{AuthResult, Credentials, Scope, UserProfile};

/// Parameters of a browser login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    /// Scopes to request.
    pub scope: Scope,
    /// API audience, if any.
    pub audience: Option<String>,
}

impl AuthorizationRequest {
    /// Creates a request without an audience.
    #[must_use]
    pub const fn new(scope: Scope) -> Self {
        Self {
            scope,
            audience: None,
        }
    }

    /// Sets the audience.
    #[must_use]
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }
}

/// Port for the identity provider's authentication API.
///
/// Implementations never retry; every failure is returned to the caller.
#[async_trait]
pub trait IdentityClient: Send + Sync {
    /// Runs the authorization-code flow with PKCE through the user agent.
    ///
    /// # Errors
    /// `UserCancelled` if the user backed out, `Network`, or `Provider`
    /// when the provider rejected the request.
    async fn begin_authorization(&self, request: &AuthorizationRequest)
    -> AuthResult<Credentials>;

    /// Invalidates the provider-side browser session.
    ///
    /// # Errors
    /// Same kinds as [`IdentityClient::begin_authorization`].
    async fn end_session(&self) -> AuthResult<()>;

    /// Exchanges a refresh token for new credentials.
    ///
    /// The returned credentials carry a refresh token only if the provider
    /// rotated it.
    ///
    /// # Errors
    /// `InvalidGrant` if the refresh token was revoked or expired,
    /// `Network` for transient failures.
    async fn exchange_refresh_token(
        &self,
        refresh_token: &str,
        scope: &Scope,
    ) -> AuthResult<Credentials>;

    /// Fetches the minimal profile of the token's owner.
    ///
    /// # Errors
    /// `InvalidCredentials` if the token is rejected, or `Network`.
    async fn fetch_user_info(&self, access_token: &str) -> AuthResult<UserProfile>;
}

#[async_trait]
impl<T: IdentityClient + ?Sized> IdentityClient for Arc<T> {
    async fn begin_authorization(
        &self,
        request: &AuthorizationRequest,
    ) -> AuthResult<Credentials> {
        (**self).begin_authorization(request).await
    }

    async fn end_session(&self) -> AuthResult<()> {
        (**self).end_session().await
    }

    async fn exchange_refresh_token(
        &self,
        refresh_token: &str,
        scope: &Scope,
    ) -> AuthResult<Credentials> {
        (**self).exchange_refresh_token(refresh_token, scope).await
    }

    async fn fetch_user_info(&self, access_token: &str) -> AuthResult<UserProfile> {
        (**self).fetch_user_info(access_token).await
    }
}
