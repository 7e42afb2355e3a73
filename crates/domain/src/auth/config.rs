//! Identity provider configuration

use serde::{Deserialize, Serialize};
use url::Url;

use super::Scope;
use crate::error::{DomainError, DomainResult};

/// Scope requested at login when none is configured.
pub const DEFAULT_SCOPE: &str = "openid profile email offline_access";

/// Settings describing the identity provider application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Client identifier registered at the provider.
    pub client_id: String,
    /// Provider domain, e.g. `tenant.eu.auth0.com`.
    pub domain: String,
    /// Explicit issuer base URL. Defaults to `https://{domain}/`.
    #[serde(default)]
    pub issuer: Option<String>,
    /// Scheme of the redirect URI.
    #[serde(default = "default_redirect_scheme")]
    pub redirect_scheme: String,
    /// Local port the browser is redirected back to.
    #[serde(default = "default_callback_port")]
    pub callback_port: u16,
    /// Space-separated scopes requested at login.
    #[serde(default = "default_scope")]
    pub scope: String,
    /// API audience. Defaults to the management API of `domain`.
    #[serde(default)]
    pub audience: Option<String>,
    /// Space-separated scopes requested on explicit renewal.
    #[serde(default)]
    pub renewal_scope: Option<String>,
    /// Credentials expiring within this window are treated as expired.
    #[serde(default = "default_expiry_margin_secs")]
    pub expiry_margin_secs: u64,
    /// Upper bound on the browser flow.
    #[serde(default = "default_authorization_timeout_secs")]
    pub authorization_timeout_secs: u64,
    /// Upper bound on ending the session at the provider.
    #[serde(default = "default_logout_timeout_secs")]
    pub logout_timeout_secs: u64,
    /// Timeout applied to each HTTP request.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_redirect_scheme() -> String {
    "http".to_string()
}

const fn default_callback_port() -> u16 {
    8080
}

fn default_scope() -> String {
    DEFAULT_SCOPE.to_string()
}

const fn default_expiry_margin_secs() -> u64 {
    60
}

const fn default_authorization_timeout_secs() -> u64 {
    300
}

const fn default_logout_timeout_secs() -> u64 {
    60
}

const fn default_request_timeout_secs() -> u64 {
    30
}

impl IdentityConfig {
    /// Creates a configuration with default settings.
    #[must_use]
    pub fn new(client_id: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            domain: domain.into(),
            issuer: None,
            redirect_scheme: default_redirect_scheme(),
            callback_port: default_callback_port(),
            scope: default_scope(),
            audience: None,
            renewal_scope: None,
            expiry_margin_secs: default_expiry_margin_secs(),
            authorization_timeout_secs: default_authorization_timeout_secs(),
            logout_timeout_secs: default_logout_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }

    /// Overrides the issuer base URL.
    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Sets the scopes requested at login.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Sets the scopes requested on renewal.
    #[must_use]
    pub fn with_renewal_scope(mut self, scope: impl Into<String>) -> Self {
        self.renewal_scope = Some(scope.into());
        self
    }

    /// Sets the API audience.
    #[must_use]
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    /// Set the local callback port.
    #[must_use]
    pub const fn with_callback_port(mut self, port: u16) -> Self {
        self.callback_port = port;
        self
    }

    /// Set the expiry safety margin.
    #[must_use]
    pub const fn with_expiry_margin_secs(mut self, secs: u64) -> Self {
        self.expiry_margin_secs = secs;
        self
    }

    /// Set the browser flow timeout.
    #[must_use]
    pub const fn with_authorization_timeout_secs(mut self, secs: u64) -> Self {
        self.authorization_timeout_secs = secs;
        self
    }

    /// Set the provider logout timeout.
    #[must_use]
    pub const fn with_logout_timeout_secs(mut self, secs: u64) -> Self {
        self.logout_timeout_secs = secs;
        self
    }

    /// Checks that the configuration can produce valid endpoints.
    ///
    /// # Errors
    /// Returns an error for blank identifiers, a domain carrying a scheme,
    /// or an unparsable issuer.
    pub fn validate(&self) -> DomainResult<()> {
        if self.client_id.trim().is_empty() {
            return Err(DomainError::InvalidConfig("client_id is empty".to_string()));
        }
        if self.domain.trim().is_empty() {
            return Err(DomainError::InvalidConfig("domain is empty".to_string()));
        }
        if self.domain.contains("://") {
            return Err(DomainError::InvalidConfig(format!(
                "domain must not include a scheme: {}",
                self.domain
            )));
        }
        if self.redirect_scheme.trim().is_empty() {
            return Err(DomainError::InvalidConfig(
                "redirect_scheme is empty".to_string(),
            ));
        }
        self.issuer_url()?;
        Ok(())
    }

    /// Base URL every provider endpoint hangs off.
    ///
    /// # Errors
    /// Returns an error if the URL cannot be parsed.
    pub fn issuer_url(&self) -> DomainResult<Url> {
        let raw = self
            .issuer
            .clone()
            .unwrap_or_else(|| format!("https://{}/", self.domain));
        let mut url = Url::parse(&raw).map_err(|e| DomainError::InvalidUrl(format!("{e}: {raw}")))?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }

    /// Resolves an endpoint path relative to the issuer.
    ///
    /// # Errors
    /// Returns an error if the issuer or the joined URL is invalid.
    pub fn endpoint(&self, path: &str) -> DomainResult<Url> {
        self.issuer_url()?
            .join(path.trim_start_matches('/'))
            .map_err(|e| DomainError::InvalidUrl(format!("{e}: {path}")))
    }

    /// Redirect URI registered for both login and logout.
    #[must_use]
    pub fn redirect_uri(&self) -> String {
        format!(
            "{}://127.0.0.1:{}/callback",
            self.redirect_scheme, self.callback_port
        )
    }

    /// Audience requested at login.
    #[must_use]
    pub fn effective_audience(&self) -> String {
        self.audience
            .clone()
            .unwrap_or_else(|| format!("https://{}/api/v2/", self.domain))
    }

    /// Scopes requested at login.
    #[must_use]
    pub fn login_scope(&self) -> Scope {
        Scope::parse(&self.scope)
    }

    /// Scopes requested on explicit renewal, falling back to the login scope.
    #[must_use]
    pub fn effective_renewal_scope(&self) -> Scope {
        self.renewal_scope
            .as_deref()
            .map_or_else(|| self.login_scope(), Scope::parse)
    }

    /// Expiry safety margin.
    #[must_use]
    pub fn expiry_margin(&self) -> chrono::Duration {
        i64::try_from(self.expiry_margin_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }

    /// Browser flow timeout.
    #[must_use]
    pub const fn authorization_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.authorization_timeout_secs)
    }

    /// Provider logout timeout.
    #[must_use]
    pub const fn logout_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.logout_timeout_secs)
    }

    /// HTTP request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = IdentityConfig::new("client", "tenant.auth0.com");
        assert!(config.validate().is_ok());
        assert_eq!(config.scope, DEFAULT_SCOPE);
        assert_eq!(config.callback_port, 8080);
        assert_eq!(config.redirect_uri(), "http://127.0.0.1:8080/callback");
        assert_eq!(config.effective_audience(), "https://tenant.auth0.com/api/v2/");
        assert_eq!(config.effective_renewal_scope(), config.login_scope());
        assert_eq!(config.expiry_margin(), chrono::Duration::seconds(60));
    }

    #[test]
    fn test_endpoints() {
        let config = IdentityConfig::new("client", "tenant.auth0.com");
        assert_eq!(
            config.endpoint("/oauth/token").unwrap().as_str(),
            "https://tenant.auth0.com/oauth/token"
        );
        assert_eq!(
            config.endpoint("api/v2/users/").unwrap().as_str(),
            "https://tenant.auth0.com/api/v2/users/"
        );
    }

    #[test]
    fn test_issuer_override_without_trailing_slash() {
        let config =
            IdentityConfig::new("client", "tenant.auth0.com").with_issuer("http://127.0.0.1:9999/t");
        assert_eq!(
            config.endpoint("userinfo").unwrap().as_str(),
            "http://127.0.0.1:9999/t/userinfo"
        );
    }

    #[test]
    fn test_validate_rejects_bad_config() {
        assert!(matches!(
            IdentityConfig::new(" ", "tenant.auth0.com").validate(),
            Err(DomainError::InvalidConfig(_))
        ));
        assert!(matches!(
            IdentityConfig::new("client", "https://tenant.auth0.com").validate(),
            Err(DomainError::InvalidConfig(_))
        ));
        assert!(matches!(
            IdentityConfig::new("client", "tenant").with_issuer("not a url").validate(),
            Err(DomainError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_renewal_scope_override() {
        let config = IdentityConfig::new("client", "tenant.auth0.com")
            .with_renewal_scope("openid offline_access update:current_user_metadata");
        assert!(config
            .effective_renewal_scope()
            .contains("update:current_user_metadata"));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: IdentityConfig =
            serde_json::from_str(r#"{"client_id": "abc", "domain": "tenant.auth0.com"}"#).unwrap();
        assert_eq!(config, IdentityConfig::new("abc", "tenant.auth0.com"));
    }
}
