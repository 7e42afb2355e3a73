//! Credential set issued by the identity provider

use chrono::{DateTime, Duration, Utc};
use std::fmt;

use super::Scope;

/// Tokens issued by the identity provider, with expiry tracking.
///
/// `Debug` redacts every token so credentials can be traced safely.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Short-lived token authorizing API calls.
    pub access_token: String,
    /// Long-lived token used to obtain new access tokens.
    pub refresh_token: Option<String>,
    /// Token carrying identity claims.
    pub id_token: Option<String>,
    /// When the access token expires.
    pub expires_at: DateTime<Utc>,
    /// Permissions granted by the provider.
    pub scope: Scope,
}

impl Credentials {
    /// Creates credentials with no refresh or ID token.
    #[must_use]
    pub fn new(access_token: impl Into<String>, expires_at: DateTime<Utc>, scope: Scope) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            id_token: None,
            expires_at,
            scope,
        }
    }

    /// Creates credentials from a token response's `expires_in`.
    #[must_use]
    pub fn issued(
        access_token: impl Into<String>,
        expires_in_secs: u64,
        scope: Scope,
        issued_at: DateTime<Utc>,
    ) -> Self {
        let expires_at = i64::try_from(expires_in_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|lifetime| issued_at.checked_add_signed(lifetime))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self::new(access_token, expires_at, scope)
    }

    /// Sets the refresh token.
    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Sets the ID token.
    #[must_use]
    pub fn with_id_token(mut self, id_token: impl Into<String>) -> Self {
        self.id_token = Some(id_token.into());
        self
    }

    /// Returns true if the access token stays valid for longer than
    /// `margin` after `now`.
    #[must_use]
    pub fn is_fresh_at(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        self.expires_at > now + margin
    }

    /// Returns true if the access token has already expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Check if the credentials can be renewed.
    #[must_use]
    pub const fn can_refresh(&self) -> bool {
        self.refresh_token.is_some()
    }

    /// Seconds until expiry; negative once expired.
    #[must_use]
    pub fn seconds_until_expiry(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_seconds()
    }

    /// Applies a renewal response.
    ///
    /// Access token, ID token, expiry and scope come from `renewal`. The
    /// refresh token rotates only if the response carried one.
    #[must_use]
    pub fn renewed_with(self, renewal: Self) -> Self {
        Self {
            refresh_token: renewal.refresh_token.or(self.refresh_token),
            ..renewal
        }
    }

    /// Returns the Authorization header value.
    #[must_use]
    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("id_token", &self.id_token.as_ref().map(|_| "<redacted>"))
            .field("expires_at", &self.expires_at)
            .field("scope", &self.scope.to_string())
            .finish()
    }
}
