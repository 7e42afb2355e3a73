//! Persisted credential cache with expiry-aware, single-flight renewal.
//!
//! The store wraps a [`CredentialRepository`] and answers "give me a
//! currently valid access token". Refreshes are serialized behind a gate:
//! callers that queued on it re-read the persisted copy and reuse the
//! result of the refresh that ran before them.

use std::sync::Arc;

use chrono::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use warden_domain::{AuthError, AuthResult, Credentials, Scope};

use crate::ports::{Clock, CredentialRepository, IdentityClient};

/// Default window before expiry inside which credentials are renewed.
pub const DEFAULT_EXPIRY_MARGIN_SECS: i64 = 60;

/// Credential cache backed by a repository.
pub struct CredentialStore<R> {
    repository: R,
    clock: Arc<dyn Clock>,
    /// Credentials expiring within this window are treated as expired.
    expiry_margin: Duration,
    refresh_gate: Mutex<()>,
}

impl<R: CredentialRepository> CredentialStore<R> {
    /// Create a new store with the default expiry margin.
    pub fn new(repository: R, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            clock,
            expiry_margin: Duration::seconds(DEFAULT_EXPIRY_MARGIN_SECS),
            refresh_gate: Mutex::new(()),
        }
    }

    /// Create with a custom expiry margin.
    #[must_use]
    pub const fn with_expiry_margin(mut self, expiry_margin: Duration) -> Self {
        self.expiry_margin = expiry_margin;
        self
    }

    /// The configured expiry margin.
    #[must_use]
    pub const fn expiry_margin(&self) -> Duration {
        self.expiry_margin
    }

    /// Overwrites the persisted credentials.
    ///
    /// # Errors
    /// Returns `Storage` if the record cannot be written.
    pub async fn save(&self, credentials: &Credentials) -> AuthResult<()> {
        self.repository.save(credentials).await?;
        debug!(expires_at = %credentials.expires_at, "credentials persisted");
        Ok(())
    }

    /// Loads the persisted credentials.
    ///
    /// # Errors
    /// `MissingSession` if nothing is persisted, `Storage` on read failure.
    pub async fn load(&self) -> AuthResult<Credentials> {
        self.repository
            .load()
            .await?
            .ok_or(AuthError::MissingSession)
    }

    /// Removes the persisted credentials. Idempotent.
    ///
    /// Waits for an in-flight refresh to finish first, so a renewal that
    /// started before the clear cannot write its result back afterwards.
    ///
    /// # Errors
    /// Returns `Storage` if the record exists but cannot be removed.
    pub async fn clear(&self) -> AuthResult<()> {
        let _gate = self.refresh_gate.lock().await;
        self.clear_locked().await
    }

    /// Clears the record. Must be called with the refresh gate held.
    async fn clear_locked(&self) -> AuthResult<()> {
        self.repository.clear().await?;
        debug!("persisted credentials cleared");
        Ok(())
    }

    /// Returns credentials whose access token is still valid, refreshing
    /// them first if they are expired or about to expire.
    ///
    /// Concurrent callers collapse into a single refresh exchange.
    ///
    /// # Errors
    /// - `MissingSession` if nothing is persisted, if the refresh token was
    ///   rejected (the store is cleared), or if expired credentials carry no
    ///   refresh token (the store is cleared)
    /// - `Network` if the refresh failed transiently; the persisted copy is
    ///   left untouched
    pub async fn get_valid<I>(&self, identity: &I) -> AuthResult<Credentials>
    where
        I: IdentityClient + ?Sized,
    {
        let current = self.load().await?;
        if self.is_fresh(&current) {
            return Ok(current);
        }

        let _gate = self.refresh_gate.lock().await;
        let current = self.load().await?;
        if self.is_fresh(&current) {
            debug!("credentials were renewed by a concurrent caller");
            return Ok(current);
        }

        let Some(refresh_token) = current.refresh_token.clone() else {
            info!("credentials expired without a refresh token");
            self.clear_locked().await?;
            return Err(AuthError::MissingSession);
        };
        let scope = current.scope.clone();
        self.refresh_locked(identity, current, &refresh_token, &scope)
            .await
            .map_err(Self::grant_to_missing_session)
    }

    /// Refreshes after an API rejected `rejected_access_token`.
    ///
    /// If the persisted access token already differs, another caller
    /// refreshed in the meantime and its result is returned without a
    /// network call.
    ///
    /// # Errors
    /// As [`CredentialStore::get_valid`].
    pub async fn force_refresh<I>(
        &self,
        identity: &I,
        rejected_access_token: &str,
    ) -> AuthResult<Credentials>
    where
        I: IdentityClient + ?Sized,
    {
        let _gate = self.refresh_gate.lock().await;
        let current = self.load().await?;
        if current.access_token != rejected_access_token {
            debug!("rejected token was already replaced");
            return Ok(current);
        }

        let Some(refresh_token) = current.refresh_token.clone() else {
            info!("rejected credentials have no refresh token");
            self.clear_locked().await?;
            return Err(AuthError::MissingSession);
        };
        let scope = current.scope.clone();
        self.refresh_locked(identity, current, &refresh_token, &scope)
            .await
            .map_err(Self::grant_to_missing_session)
    }

    /// Unconditionally exchanges the refresh token for new credentials
    /// with the given scope.
    ///
    /// # Errors
    /// - `MissingSession` if nothing is persisted
    /// - `NoRefreshToken` if the persisted credentials cannot be renewed
    /// - `InvalidGrant` if the refresh token was rejected (the store is
    ///   cleared)
    /// - `Network` for transient failures (the store is untouched)
    pub async fn renew<I>(&self, identity: &I, scope: &Scope) -> AuthResult<Credentials>
    where
        I: IdentityClient + ?Sized,
    {
        let _gate = self.refresh_gate.lock().await;
        let current = self.load().await?;
        let Some(refresh_token) = current.refresh_token.clone() else {
            return Err(AuthError::NoRefreshToken);
        };
        self.refresh_locked(identity, current, &refresh_token, scope)
            .await
    }

    /// Get credential status for display. Never touches the network.
    ///
    /// # Errors
    /// Returns `Storage` on read failure.
    pub async fn status(&self) -> AuthResult<CredentialStatus> {
        let Some(credentials) = self.repository.load().await? else {
            return Ok(CredentialStatus::NotAuthenticated);
        };
        let now = self.clock.now();
        let can_refresh = credentials.can_refresh();
        Ok(if credentials.is_expired_at(now) {
            CredentialStatus::Expired { can_refresh }
        } else if credentials.is_fresh_at(now, self.expiry_margin) {
            CredentialStatus::Valid {
                seconds_remaining: credentials.seconds_until_expiry(now),
            }
        } else {
            CredentialStatus::Expiring {
                seconds_remaining: credentials.seconds_until_expiry(now),
                can_refresh,
            }
        })
    }

    fn is_fresh(&self, credentials: &Credentials) -> bool {
        credentials.is_fresh_at(self.clock.now(), self.expiry_margin)
    }

    /// Runs the exchange. Must be called with the refresh gate held.
    async fn refresh_locked<I>(
        &self,
        identity: &I,
        current: Credentials,
        refresh_token: &str,
        scope: &Scope,
    ) -> AuthResult<Credentials>
    where
        I: IdentityClient + ?Sized,
    {
        debug!(scope = %scope, "exchanging refresh token");
        match identity.exchange_refresh_token(refresh_token, scope).await {
            Ok(renewal) => {
                let renewed = current.renewed_with(renewal);
                self.save(&renewed).await?;
                info!(expires_at = %renewed.expires_at, "credentials renewed");
                Ok(renewed)
            }
            Err(AuthError::InvalidGrant) => {
                warn!("refresh token rejected, clearing persisted credentials");
                self.clear_locked().await?;
                Err(AuthError::InvalidGrant)
            }
            Err(error) => {
                warn!(error = %error, "credential renewal failed");
                Err(error)
            }
        }
    }

    fn grant_to_missing_session(error: AuthError) -> AuthError {
        match error {
            AuthError::InvalidGrant => AuthError::MissingSession,
            other => other,
        }
    }
}

/// Status of the persisted credentials for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialStatus {
    /// Nothing is persisted.
    NotAuthenticated,
    /// Credentials are valid and not expiring soon.
    Valid {
        /// Seconds until expiry.
        seconds_remaining: i64,
    },
    /// Credentials are valid but inside the expiry margin.
    Expiring {
        /// Seconds until expiry.
        seconds_remaining: i64,
        /// Whether the credentials can be renewed.
        can_refresh: bool,
    },
    /// Credentials have expired.
    Expired {
        /// Whether the credentials can be renewed.
        can_refresh: bool,
    },
}

impl CredentialStatus {
    /// Returns true if the access token is still usable.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. } | Self::Expiring { .. })
    }

    /// Returns true if the next `get_valid` will renew the credentials.
    #[must_use]
    pub const fn needs_refresh(&self) -> bool {
        matches!(
            self,
            Self::Expiring {
                can_refresh: true,
                ..
            } | Self::Expired { can_refresh: true }
        )
    }

    /// Get a user-friendly display message.
    #[must_use]
    pub fn display_message(&self) -> String {
        match self {
            Self::NotAuthenticated => "Not authenticated".to_string(),
            Self::Valid { seconds_remaining } => {
                let secs = *seconds_remaining;
                if secs > 3600 {
                    format!("Valid for {} hours", secs / 3600)
                } else if secs > 60 {
                    format!("Valid for {} minutes", secs / 60)
                } else {
                    format!("Valid for {secs} seconds")
                }
            }
            Self::Expiring {
                seconds_remaining,
                can_refresh,
            } => {
                let refresh_hint = if *can_refresh {
                    " (will auto-refresh)"
                } else {
                    ""
                };
                format!("Expiring in {seconds_remaining} seconds{refresh_hint}")
            }
            Self::Expired { can_refresh } => {
                if *can_refresh {
                    "Expired (can refresh)".to_string()
                } else {
                    "Expired".to_string()
                }
            }
        }
    }
}
