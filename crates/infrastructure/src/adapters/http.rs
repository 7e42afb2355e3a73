//! Reqwest plumbing shared by the provider adapters.

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use warden_domain::AuthError;

/// User-Agent header sent with every provider request.
pub const USER_AGENT: &str = concat!("warden/", env!("CARGO_PKG_VERSION"));

/// Content-Type for form-urlencoded data.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Builds the HTTP client used against the provider.
///
/// Redirects are not followed and every request is bounded by `timeout`.
///
/// # Errors
///
/// Returns `Network` if the TLS backend cannot be initialised.
pub fn build_client(timeout: Duration) -> Result<Client, AuthError> {
    Client::builder()
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::none())
        .timeout(timeout)
        .build()
        .map_err(|e| AuthError::network(format!("failed to build HTTP client: {e}")))
}

/// Maps a transport failure to `Network`.
///
/// The URL is stripped first so query parameters never reach error text.
pub fn map_transport_error(error: reqwest::Error) -> AuthError {
    let error = error.without_url();
    if error.is_timeout() {
        return AuthError::network("request timed out");
    }
    if error.is_connect() {
        return AuthError::network(format!("connection failed: {error}"));
    }
    if error.is_decode() {
        return AuthError::network(format!("malformed response: {error}"));
    }
    AuthError::network(error.to_string())
}

/// Provider error body.
///
/// The token endpoint answers `{"error", "error_description"}`; the
/// management API answers `{"error", "errorCode", "message"}`.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    /// OAuth error code, or the HTTP reason phrase on the management API.
    #[serde(default)]
    pub error: Option<String>,
    /// Management API error code.
    #[serde(default, rename = "errorCode")]
    pub error_code: Option<String>,
    /// OAuth error description.
    #[serde(default)]
    pub error_description: Option<String>,
    /// Management API error description.
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorBody {
    /// Reads and parses an error response body. Unparsable bodies yield an
    /// empty `ErrorBody`.
    pub async fn read(response: Response) -> Self {
        response
            .bytes()
            .await
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .unwrap_or_default()
    }

    /// The most specific error code in the body.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.error_code.as_deref().or(self.error.as_deref())
    }

    /// The code, or `fallback` if the body carried none.
    #[must_use]
    pub fn code_or(&self, fallback: &str) -> String {
        self.code().unwrap_or(fallback).to_string()
    }

    /// The human-readable description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.error_description.as_deref().or(self.message.as_deref())
    }
}

/// Maps a server-side failure status to `Network`.
#[must_use]
pub fn server_error(status: StatusCode) -> AuthError {
    AuthError::network(format!("provider returned HTTP {}", status.as_u16()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body_accepts_both_shapes() {
        let oauth: ErrorBody =
            serde_json::from_str(r#"{"error":"invalid_grant","error_description":"revoked"}"#)
                .unwrap();
        assert_eq!(oauth.code(), Some("invalid_grant"));
        assert_eq!(oauth.description(), Some("revoked"));

        let management: ErrorBody = serde_json::from_str(
            r#"{"statusCode":400,"error":"Bad Request","message":"Payload validation error","errorCode":"invalid_body"}"#,
        )
        .unwrap();
        assert_eq!(management.code(), Some("invalid_body"));
        assert_eq!(management.description(), Some("Payload validation error"));
    }

    #[test]
    fn test_code_or_fallback() {
        assert_eq!(ErrorBody::default().code_or("http_418"), "http_418");
    }

    #[test]
    fn test_server_error_message() {
        assert_eq!(
            server_error(StatusCode::BAD_GATEWAY),
            AuthError::network("provider returned HTTP 502")
        );
    }
}
