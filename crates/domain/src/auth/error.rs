//! Session error taxonomy shared by every layer.

use thiserror::Error;

/// Errors surfaced by identity, credential, profile and session operations.
///
/// Messages never carry token material: adapters only put status codes,
/// provider error codes and transport descriptions in here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The user closed or backed out of the browser flow.
    #[error("user cancelled authentication")]
    UserCancelled,

    /// Transport failure, timeout or provider-side 5xx.
    #[error("network error: {message}")]
    Network {
        /// Error description.
        message: String,
    },

    /// An access token was rejected by an API.
    #[error("credentials were rejected")]
    InvalidCredentials,

    /// The refresh token was revoked or has expired.
    #[error("refresh token is invalid or revoked")]
    InvalidGrant,

    /// The provider rejected the request.
    #[error("identity provider error: {code}")]
    Provider {
        /// Provider error code, e.g. `unauthorized_client`.
        code: String,
    },

    /// The provider (or local validation) rejected malformed input.
    #[error("validation error: {message}")]
    Validation {
        /// Error description.
        message: String,
    },

    /// No session or persisted credentials exist.
    #[error("no session is available")]
    MissingSession,

    /// Another login or renewal is in progress.
    #[error("another session operation is in progress")]
    SessionBusy,

    /// Login was requested while a session is already active.
    #[error("a session is already active")]
    AlreadyAuthenticated,

    /// Renewal was requested but the session holds no refresh token.
    #[error("session has no refresh token")]
    NoRefreshToken,

    /// The persisted credential copy could not be read or written.
    #[error("credential storage error: {message}")]
    Storage {
        /// Error description.
        message: String,
    },
}

impl AuthError {
    /// Creates a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Creates a provider error from an OAuth error code.
    #[must_use]
    pub fn provider(code: impl Into<String>) -> Self {
        Self::Provider { code: code.into() }
    }

    /// Creates a validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates a storage error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Returns true for failures after which state and stored credentials
    /// are kept so the caller can retry later.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    /// Returns true if the local session can no longer be used at all.
    #[must_use]
    pub const fn requires_teardown(&self) -> bool {
        matches!(self, Self::InvalidGrant | Self::MissingSession)
    }
}

/// Result type alias for session operations.
pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_network_is_transient() {
        assert!(AuthError::network("timed out").is_transient());
        assert!(!AuthError::InvalidGrant.is_transient());
        assert!(!AuthError::SessionBusy.is_transient());
        assert!(!AuthError::validation("bad").is_transient());
    }

    #[test]
    fn test_teardown_policy() {
        assert!(AuthError::InvalidGrant.requires_teardown());
        assert!(AuthError::MissingSession.requires_teardown());
        assert!(!AuthError::InvalidCredentials.requires_teardown());
        assert!(!AuthError::network("offline").requires_teardown());
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(
            AuthError::provider("unauthorized_client").to_string(),
            "identity provider error: unauthorized_client"
        );
        assert_eq!(
            AuthError::network("connection refused").to_string(),
            "network error: connection refused"
        );
    }
}
