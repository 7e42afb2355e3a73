//! Session controller.
//!
//! The controller is the only writer of session state. Every action is an
//! `async fn` returning a typed [`AuthError`]; observers read immutable
//! [`SessionSnapshot`]s through [`SessionController::snapshot`] or a watch
//! channel from [`SessionController::subscribe`].
//!
//! Transitions into `Authenticating` and `Refreshing` are a single
//! check-and-set on the watch channel, so a second login or renewal while
//! one is in flight fails with `SessionBusy` instead of racing it.

use std::future::Future;

use tokio::sync::watch;
use tracing::{debug, info, warn};
use warden_domain::{
    AuthError, AuthResult, Credentials, MetadataPatch, Session, SessionSnapshot, SessionState,
    UserProfile,
};

use super::SessionSettings;
use crate::auth::CredentialStore;
use crate::ports::{AuthorizationRequest, CredentialRepository, IdentityClient, ProfileApi};

/// Orchestrates login, renewal, profile access and logout.
pub struct SessionController<I, P, R> {
    identity: I,
    profiles: P,
    store: CredentialStore<R>,
    settings: SessionSettings,
    state: watch::Sender<SessionSnapshot>,
}

impl<I, P, R> SessionController<I, P, R>
where
    I: IdentityClient,
    P: ProfileApi,
    R: CredentialRepository,
{
    /// Creates a controller in the `LoggedOut` state.
    pub fn new(
        identity: I,
        profiles: P,
        store: CredentialStore<R>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            identity,
            profiles,
            store,
            settings,
            state: watch::Sender::new(SessionSnapshot::logged_out()),
        }
    }

    /// Returns the last published snapshot. Never blocks on network work.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state.borrow().state
    }

    /// Subscribes to snapshot changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    /// The credential store backing this controller.
    pub const fn store(&self) -> &CredentialStore<R> {
        &self.store
    }

    /// Runs the browser login and activates the resulting session.
    ///
    /// # Errors
    /// - `AlreadyAuthenticated` if a session is active
    /// - `SessionBusy` if a login or renewal is in flight
    /// - any error of the authorization, user-info or persistence step;
    ///   the controller is back in `LoggedOut` afterwards
    pub async fn login(&self) -> AuthResult<Session> {
        self.enter_authenticating()?;
        info!(state = %SessionState::Authenticating, "login started");

        match self.authenticate().await {
            Ok(session) => Ok(self.activate(session)),
            Err(error) => {
                warn!(error = %error, "login failed");
                self.state.send_replace(SessionSnapshot::logged_out());
                Err(error)
            }
        }
    }

    /// Rebuilds the session from persisted credentials without a browser.
    ///
    /// # Errors
    /// - `AlreadyAuthenticated` / `SessionBusy` as for [`Self::login`]
    /// - `MissingSession` if nothing usable is persisted
    /// - `Network` if renewal or user info failed transiently; the
    ///   persisted copy is kept for a later attempt
    pub async fn restore(&self) -> AuthResult<Session> {
        self.enter_authenticating()?;
        debug!("restoring persisted session");

        match self.resume().await {
            Ok(session) => Ok(self.activate(session)),
            Err(error) => {
                debug!(error = %error, "restore failed");
                if error.requires_teardown() {
                    self.teardown(&error).await;
                } else {
                    self.state.send_replace(SessionSnapshot::logged_out());
                }
                Err(error)
            }
        }
    }

    /// Ends the provider session and destroys the local one.
    ///
    /// Local teardown happens even when the provider call fails or does not
    /// finish within the logout timeout; that failure is returned afterwards.
    ///
    /// # Errors
    /// - `MissingSession` if no session is active, `SessionBusy` while
    ///   one is being established or renewed
    /// - the provider logout error, or `Network` on timeout, after local
    ///   teardown
    /// - `Storage` if the persisted copy could not be removed
    pub async fn logout(&self) -> AuthResult<()> {
        let session = self.active_session()?;
        let ended =
            match tokio::time::timeout(self.settings.logout_timeout, self.identity.end_session())
                .await
            {
                Ok(result) => result,
                Err(_) => Err(AuthError::network("provider logout timed out")),
            };
        if let Err(error) = &ended {
            warn!(error = %error, "provider logout failed, clearing local session anyway");
        }

        let cleared = self.store.clear().await;
        self.state.send_replace(SessionSnapshot::logged_out());
        info!(user = session.user_id().unwrap_or_default(), "logged out");

        ended?;
        cleared
    }

    /// Destroys the local session without contacting the provider.
    ///
    /// Used when the session cannot be restored, e.g. while offline, but
    /// the persisted credentials must still go.
    ///
    /// # Errors
    /// - `SessionBusy` while a login or renewal is in flight
    /// - `Storage` if the persisted copy could not be removed
    pub async fn forget(&self) -> AuthResult<()> {
        if self.state().is_busy() {
            return Err(AuthError::SessionBusy);
        }
        self.store.clear().await?;
        self.state.send_replace(SessionSnapshot::logged_out());
        info!("local session forgotten");
        Ok(())
    }

    /// Fetches the full profile and merges it into the session.
    ///
    /// # Errors
    /// - `MissingSession` / `SessionBusy` if no session is usable
    /// - `InvalidCredentials` if the token is still rejected after one
    ///   refresh; the session is left as it was
    /// - `Network`, or `MissingSession` after a teardown
    pub async fn get_metadata(&self) -> AuthResult<UserProfile> {
        let user_id = self.active_user_id()?;
        let credentials = self.valid_credentials().await?;
        let user_id = user_id.as_str();

        let profile = self
            .call_with_retry(&credentials, |token| async move {
                self.profiles.get_full_profile(user_id, &token).await
            })
            .await?;
        debug!(user = user_id, "profile fetched");
        self.merge_profile(&profile);
        Ok(profile)
    }

    /// Merges `patch` into the user's metadata and the session profile.
    ///
    /// # Errors
    /// As [`Self::get_metadata`], plus `Validation` when the provider
    /// rejects the values.
    pub async fn patch_metadata(&self, patch: &MetadataPatch) -> AuthResult<UserProfile> {
        let user_id = self.active_user_id()?;
        let credentials = self.valid_credentials().await?;
        let user_id = user_id.as_str();

        let profile = self
            .call_with_retry(&credentials, |token| async move {
                self.profiles.update_metadata(user_id, &token, patch).await
            })
            .await?;
        info!(user = user_id, keys = patch.as_map().len(), "metadata updated");
        self.merge_profile(&profile);
        Ok(profile)
    }

    /// Returns valid credentials, renewing them if they are about to
    /// expire.
    ///
    /// # Errors
    /// - `MissingSession` if no session is active, or after teardown when
    ///   the refresh token was rejected
    /// - `SessionBusy` while a login or renewal is in flight
    /// - `Network` for transient failures; the session stays `Active`
    pub async fn get_or_refresh_credentials(&self) -> AuthResult<Credentials> {
        self.active_session()?;
        self.valid_credentials().await
    }

    /// Exchanges the refresh token for credentials with the renewal
    /// scope, regardless of the current expiry.
    ///
    /// # Errors
    /// - `MissingSession` / `SessionBusy` if no session is usable
    /// - `NoRefreshToken` if the session cannot be renewed
    /// - `InvalidGrant` after the session was torn down
    /// - `Network` with the session left `Active` and unchanged
    pub async fn renew(&self) -> AuthResult<Credentials> {
        let session = self.enter_refreshing()?;
        info!(
            user = session.user_id().unwrap_or_default(),
            state = %SessionState::Refreshing,
            "renewal started"
        );

        match self
            .store
            .renew(&self.identity, &self.settings.renewal_scope)
            .await
        {
            Ok(credentials) => {
                self.finish_refresh(Some(credentials.clone()));
                info!(expires_at = %credentials.expires_at, "session renewed");
                Ok(credentials)
            }
            Err(error) if error.requires_teardown() => {
                self.teardown(&error).await;
                Err(error)
            }
            Err(error) => {
                warn!(error = %error, "renewal failed, session unchanged");
                self.finish_refresh(None);
                Err(error)
            }
        }
    }

    async fn authenticate(&self) -> AuthResult<Session> {
        let mut request = AuthorizationRequest::new(self.settings.login_scope.clone());
        if let Some(audience) = &self.settings.audience {
            request = request.with_audience(audience.clone());
        }

        let credentials = tokio::time::timeout(
            self.settings.authorization_timeout,
            self.identity.begin_authorization(&request),
        )
        .await
        .map_err(|_| AuthError::network("authorization timed out"))??;

        let profile = self
            .identity
            .fetch_user_info(&credentials.access_token)
            .await?;
        self.store.save(&credentials).await?;
        Ok(Session::new(credentials, Some(profile)))
    }

    async fn resume(&self) -> AuthResult<Session> {
        let credentials = self.store.get_valid(&self.identity).await?;
        let profile = match self.identity.fetch_user_info(&credentials.access_token).await {
            Err(AuthError::InvalidCredentials) => {
                let renewed = self
                    .store
                    .force_refresh(&self.identity, &credentials.access_token)
                    .await?;
                let profile = self.identity.fetch_user_info(&renewed.access_token).await?;
                return Ok(Session::new(renewed, Some(profile)));
            }
            other => other?,
        };
        Ok(Session::new(credentials, Some(profile)))
    }

    /// Calls `call` with the current access token, and once more with a
    /// refreshed token if the first attempt was rejected.
    async fn call_with_retry<T, F, Fut>(&self, credentials: &Credentials, call: F) -> AuthResult<T>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = AuthResult<T>>,
    {
        match call(credentials.access_token.clone()).await {
            Err(AuthError::InvalidCredentials) => {
                debug!("access token rejected, refreshing once");
                let renewed = match self
                    .store
                    .force_refresh(&self.identity, &credentials.access_token)
                    .await
                {
                    Ok(renewed) => renewed,
                    Err(error) => return Err(self.credential_failure(error).await),
                };
                self.replace_credentials(&renewed);
                call(renewed.access_token).await
            }
            other => other,
        }
    }

    async fn valid_credentials(&self) -> AuthResult<Credentials> {
        match self.store.get_valid(&self.identity).await {
            Ok(credentials) => {
                self.replace_credentials(&credentials);
                Ok(credentials)
            }
            Err(error) => Err(self.credential_failure(error).await),
        }
    }

    async fn credential_failure(&self, error: AuthError) -> AuthError {
        if error.requires_teardown() {
            self.teardown(&error).await;
        }
        error
    }

    async fn teardown(&self, reason: &AuthError) {
        if let Err(error) = self.store.clear().await {
            warn!(error = %error, "failed to clear persisted credentials");
        }
        self.state.send_replace(SessionSnapshot::logged_out());
        info!(reason = %reason, "session torn down");
    }

    fn activate(&self, session: Session) -> Session {
        info!(
            user = session.user_id().unwrap_or_default(),
            state = %SessionState::Active,
            "session active"
        );
        self.state
            .send_replace(SessionSnapshot::active(session.clone()));
        session
    }

    fn enter_authenticating(&self) -> AuthResult<()> {
        let mut outcome = Ok(());
        self.state.send_if_modified(|snapshot| match snapshot.state {
            SessionState::LoggedOut => {
                snapshot.state = SessionState::Authenticating;
                snapshot.session = None;
                true
            }
            SessionState::Active => {
                outcome = Err(AuthError::AlreadyAuthenticated);
                false
            }
            SessionState::Authenticating | SessionState::Refreshing => {
                outcome = Err(AuthError::SessionBusy);
                false
            }
        });
        outcome
    }

    fn enter_refreshing(&self) -> AuthResult<Session> {
        let mut outcome = Err(AuthError::MissingSession);
        self.state
            .send_if_modified(|snapshot| match (snapshot.state, &snapshot.session) {
                (SessionState::Active, Some(session)) => {
                    outcome = Ok(session.clone());
                    snapshot.state = SessionState::Refreshing;
                    true
                }
                (state, _) if state.is_busy() => {
                    outcome = Err(AuthError::SessionBusy);
                    false
                }
                _ => false,
            });
        outcome
    }

    fn finish_refresh(&self, credentials: Option<Credentials>) {
        self.state.send_if_modified(|snapshot| {
            if snapshot.state != SessionState::Refreshing {
                return false;
            }
            snapshot.state = SessionState::Active;
            if let (Some(credentials), Some(session)) = (credentials, snapshot.session.as_mut()) {
                session.credentials = credentials;
            }
            true
        });
    }

    fn active_session(&self) -> AuthResult<Session> {
        let snapshot = self.state.borrow();
        match (snapshot.state, &snapshot.session) {
            (SessionState::Active, Some(session)) => Ok(session.clone()),
            (state, _) if state.is_busy() => Err(AuthError::SessionBusy),
            _ => Err(AuthError::MissingSession),
        }
    }

    fn active_user_id(&self) -> AuthResult<String> {
        self.active_session()?
            .user_id()
            .map(str::to_string)
            .ok_or(AuthError::MissingSession)
    }

    fn replace_credentials(&self, credentials: &Credentials) {
        self.state.send_if_modified(|snapshot| {
            if snapshot.state == SessionState::LoggedOut {
                return false;
            }
            match snapshot.session.as_mut() {
                Some(session) if session.credentials != *credentials => {
                    session.credentials = credentials.clone();
                    true
                }
                _ => false,
            }
        });
    }

    fn merge_profile(&self, profile: &UserProfile) {
        self.state.send_if_modified(|snapshot| {
            if snapshot.state == SessionState::LoggedOut {
                return false;
            }
            let Some(session) = snapshot.session.as_mut() else {
                return false;
            };
            match session.profile.as_mut() {
                Some(current) if current.id == profile.id => current.merge(profile.clone()),
                Some(_) => return false,
                None => session.profile = Some(profile.clone()),
            }
            true
        });
    }
}
