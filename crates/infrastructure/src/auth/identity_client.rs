//! Identity provider adapter.
//!
//! Speaks the provider's OAuth endpoints over HTTPS: authorization code with
//! PKCE through a [`UserAgent`], refresh-token exchange, user info and
//! browser logout.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;
use warden_application::ports::{AuthorizationRequest, Clock, IdentityClient, UserAgent};
use warden_domain::{AuthError, AuthResult, Credentials, IdentityConfig, Scope, UserProfile};

use super::pkce::PkcePair;
use crate::adapters::SystemClock;
use crate::adapters::http::{
    ErrorBody, FORM_CONTENT_TYPE, build_client, map_transport_error, server_error,
};

/// Token endpoint response.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    id_token: Option<String>,
    expires_in: u64,
    #[serde(default)]
    scope: Option<String>,
}

impl TokenResponse {
    fn into_credentials(self, requested: &Scope, issued_at: DateTime<Utc>) -> Credentials {
        let scope = self
            .scope
            .as_deref()
            .map_or_else(|| requested.clone(), Scope::parse);
        let mut credentials =
            Credentials::issued(self.access_token, self.expires_in, scope, issued_at);
        credentials.refresh_token = self.refresh_token;
        credentials.id_token = self.id_token;
        credentials
    }
}

/// User info endpoint response.
#[derive(Debug, Deserialize)]
struct UserInfoResponse {
    sub: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

impl From<UserInfoResponse> for UserProfile {
    fn from(info: UserInfoResponse) -> Self {
        let mut profile = Self::minimal(info.sub);
        profile.name = info.name;
        profile.email = info.email;
        profile
    }
}

/// Identity client talking to the provider over HTTP.
pub struct HttpIdentityClient<U> {
    config: IdentityConfig,
    http: Client,
    user_agent: U,
    clock: Arc<dyn Clock>,
}

impl<U: UserAgent> HttpIdentityClient<U> {
    /// Creates a client for the configured tenant.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for an invalid configuration and `Network` if
    /// the HTTP client cannot be built.
    pub fn new(config: IdentityConfig, user_agent: U) -> AuthResult<Self> {
        config
            .validate()
            .map_err(|e| AuthError::validation(e.to_string()))?;
        let http = build_client(config.request_timeout())?;
        Ok(Self {
            config,
            http,
            user_agent,
            clock: Arc::new(SystemClock::new()),
        })
    }

    /// Uses `clock` to stamp issued credentials.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The provider configuration.
    #[must_use]
    pub const fn config(&self) -> &IdentityConfig {
        &self.config
    }

    /// Builds the `/authorize` URL for one attempt.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the issuer URL is invalid.
    pub fn authorization_url(
        &self,
        request: &AuthorizationRequest,
        pkce: &PkcePair,
    ) -> AuthResult<Url> {
        let mut url = self.endpoint("authorize")?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("response_type", "code")
                .append_pair("client_id", &self.config.client_id)
                .append_pair("redirect_uri", &self.config.redirect_uri())
                .append_pair("scope", &request.scope.to_string())
                .append_pair("state", &pkce.state)
                .append_pair("code_challenge", &pkce.challenge)
                .append_pair("code_challenge_method", "S256");
            if let Some(audience) = &request.audience {
                query.append_pair("audience", audience);
            }
        }
        Ok(url)
    }

    /// Builds the browser logout URL.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the issuer URL is invalid.
    pub fn logout_url(&self) -> AuthResult<Url> {
        let mut url = self.endpoint("v2/logout")?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("returnTo", &self.config.redirect_uri());
        Ok(url)
    }

    fn endpoint(&self, path: &str) -> AuthResult<Url> {
        self.config
            .endpoint(path)
            .map_err(|e| AuthError::validation(e.to_string()))
    }

    async fn exchange_code(
        &self,
        code: &str,
        verifier: &str,
        requested: &Scope,
    ) -> AuthResult<Credentials> {
        let redirect_uri = self.config.redirect_uri();
        let params = [
            ("grant_type", "authorization_code"),
            ("client_id", self.config.client_id.as_str()),
            ("code", code),
            ("code_verifier", verifier),
            ("redirect_uri", redirect_uri.as_str()),
        ];

        // A rejected code is a failed login, not a revoked session.
        self.token_request(&params, requested)
            .await
            .map_err(|error| match error {
                AuthError::InvalidGrant => AuthError::provider("invalid_grant"),
                other => other,
            })
    }

    async fn token_request(
        &self,
        params: &[(&str, &str)],
        requested: &Scope,
    ) -> AuthResult<Credentials> {
        let body = serde_urlencoded::to_string(params)
            .map_err(|e| AuthError::validation(format!("failed to encode form: {e}")))?;
        let url = self.endpoint("oauth/token")?;

        let response = self
            .http
            .post(url)
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        debug!(status = status.as_u16(), "token endpoint responded");
        if status.is_success() {
            let token: TokenResponse = response.json().await.map_err(map_transport_error)?;
            return Ok(token.into_credentials(requested, self.clock.now()));
        }
        if status.is_server_error() {
            return Err(server_error(status));
        }

        let body = ErrorBody::read(response).await;
        match body.code() {
            Some("invalid_grant") => Err(AuthError::InvalidGrant),
            Some(code) => Err(AuthError::provider(code)),
            None => Err(AuthError::provider(format!("http_{}", status.as_u16()))),
        }
    }
}

/// Extracts the authorization code from the redirect that ended the flow.
///
/// # Errors
///
/// - `UserCancelled` if the user denied or cancelled
/// - `Provider{code: "invalid_state"}` if `state` does not match
/// - `Provider{code}` for any other error the provider reported
pub fn parse_callback(redirect: &Url, expected_state: &str) -> AuthResult<String> {
    let mut code = None;
    let mut state = None;
    let mut error = None;
    for (key, value) in redirect.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Err(match error.as_str() {
            "access_denied" | "a0.authentication_canceled" => AuthError::UserCancelled,
            _ => AuthError::provider(error),
        });
    }
    if state.as_deref() != Some(expected_state) {
        return Err(AuthError::provider("invalid_state"));
    }
    code.filter(|code| !code.is_empty())
        .ok_or_else(|| AuthError::provider("missing_code"))
}

#[async_trait]
impl<U: UserAgent> IdentityClient for HttpIdentityClient<U> {
    async fn begin_authorization(
        &self,
        request: &AuthorizationRequest,
    ) -> AuthResult<Credentials> {
        let pkce = PkcePair::generate();
        let url = self.authorization_url(request, &pkce)?;
        info!(client_id = %self.config.client_id, scope = %request.scope, "starting browser authorization");

        let redirect = self
            .user_agent
            .authorize(&url, &self.config.redirect_uri())
            .await?;
        let code = parse_callback(&redirect, &pkce.state)?;
        debug!("authorization code received, exchanging");
        self.exchange_code(&code, &pkce.verifier, &request.scope)
            .await
    }

    async fn end_session(&self) -> AuthResult<()> {
        let url = self.logout_url()?;
        let redirect = self
            .user_agent
            .authorize(&url, &self.config.redirect_uri())
            .await?;
        if let Some((_, error)) = redirect.query_pairs().find(|(key, _)| key == "error") {
            return Err(AuthError::provider(error.into_owned()));
        }
        debug!("provider session ended");
        Ok(())
    }

    async fn exchange_refresh_token(
        &self,
        refresh_token: &str,
        scope: &Scope,
    ) -> AuthResult<Credentials> {
        let scope_param = scope.to_string();
        let params = [
            ("grant_type", "refresh_token"),
            ("client_id", self.config.client_id.as_str()),
            ("refresh_token", refresh_token),
            ("scope", scope_param.as_str()),
        ];
        debug!(scope = %scope, "refreshing credentials");
        self.token_request(&params, scope).await
    }

    async fn fetch_user_info(&self, access_token: &str) -> AuthResult<UserProfile> {
        let url = self.endpoint("userinfo")?;
        let response = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        debug!(status = status.as_u16(), "userinfo responded");
        match status {
            s if s.is_success() => {
                let info: UserInfoResponse = response.json().await.map_err(map_transport_error)?;
                Ok(info.into())
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(AuthError::InvalidCredentials),
            s if s.is_server_error() => Err(server_error(s)),
            s => {
                let body = ErrorBody::read(response).await;
                Err(AuthError::provider(body.code_or(&format!("http_{}", s.as_u16()))))
            }
        }
    }
}
