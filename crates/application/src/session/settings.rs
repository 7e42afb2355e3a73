//! Per-controller session parameters

use std::time::Duration;

use warden_domain::{IdentityConfig, Scope};

/// Parameters the controller passes to the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// Scope requested at login.
    pub login_scope: Scope,
    /// API audience requested at login.
    pub audience: Option<String>,
    /// Scope requested by an explicit renewal.
    pub renewal_scope: Scope,
    /// Upper bound on the browser flow.
    pub authorization_timeout: Duration,
    /// Upper bound on ending the session at the provider.
    pub logout_timeout: Duration,
}

impl SessionSettings {
    /// Derives settings from the provider configuration.
    #[must_use]
    pub fn from_config(config: &IdentityConfig) -> Self {
        Self {
            login_scope: config.login_scope(),
            audience: Some(config.effective_audience()),
            renewal_scope: config.effective_renewal_scope(),
            authorization_timeout: config.authorization_timeout(),
            logout_timeout: config.logout_timeout(),
        }
    }

    /// Sets the authorization timeout.
    #[must_use]
    pub const fn with_authorization_timeout(mut self, timeout: Duration) -> Self {
        self.authorization_timeout = timeout;
        self
    }

    /// Sets the provider logout timeout.
    #[must_use]
    pub const fn with_logout_timeout(mut self, timeout: Duration) -> Self {
        self.logout_timeout = timeout;
        self
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            login_scope: Scope::parse(warden_domain::DEFAULT_SCOPE),
            audience: None,
            renewal_scope: Scope::parse(warden_domain::DEFAULT_SCOPE),
            authorization_timeout: Duration::from_secs(300),
            logout_timeout: Duration::from_secs(60),
        }
    }
}
