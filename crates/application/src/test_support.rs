//! In-memory port implementations shared by the unit tests.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use warden_domain::{
    AuthError, AuthResult, Credentials, Metadata, MetadataPatch, Scope, UserProfile,
};

use crate::ports::{
    AuthorizationRequest, Clock, CredentialRepository, IdentityClient, ProfileApi, StorageError,
};

pub const USER_ID: &str = "auth0|123";

/// Clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn arc() -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap()),
        })
    }

    pub fn advance_secs(&self, secs: i64) {
        let mut now = self.now.lock().unwrap();
        *now += Duration::seconds(secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

pub fn credentials_expiring_in(
    clock: &ManualClock,
    secs: i64,
    access_token: &str,
    refresh_token: Option<&str>,
) -> Credentials {
    let credentials = Credentials::new(
        access_token,
        clock.now() + Duration::seconds(secs),
        Scope::parse("openid profile email offline_access"),
    );
    match refresh_token {
        Some(token) => credentials.with_refresh_token(token),
        None => credentials,
    }
}

/// Repository holding the record in memory.
#[derive(Default)]
pub struct MemoryRepository {
    record: Mutex<Option<Credentials>>,
    pub saves: AtomicUsize,
}

impl MemoryRepository {
    pub fn arc() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn current(&self) -> Option<Credentials> {
        self.record.lock().unwrap().clone()
    }
}

#[async_trait]
impl CredentialRepository for MemoryRepository {
    async fn load(&self) -> Result<Option<Credentials>, StorageError> {
        Ok(self.record.lock().unwrap().clone())
    }

    async fn save(&self, credentials: &Credentials) -> Result<(), StorageError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        *self.record.lock().unwrap() = Some(credentials.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        *self.record.lock().unwrap() = None;
        Ok(())
    }
}

/// Identity provider that counts calls and replays scripted failures.
pub struct MockIdentity {
    clock: Arc<ManualClock>,
    refresh_delay: StdDuration,
    authorization_delay: StdDuration,
    end_session_delay: StdDuration,
    rotate_refresh_tokens: bool,
    pub authorize_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub end_session_calls: AtomicUsize,
    pub user_info_calls: AtomicUsize,
    authorization_failures: Mutex<VecDeque<AuthError>>,
    refresh_failures: Mutex<VecDeque<AuthError>>,
    end_session_failures: Mutex<VecDeque<AuthError>>,
    user_info_failures: Mutex<VecDeque<AuthError>>,
    last_request: Mutex<Option<AuthorizationRequest>>,
    last_refresh_scope: Mutex<Option<Scope>>,
}

impl MockIdentity {
    pub fn new() -> Self {
        Self::with_clock(ManualClock::arc())
    }

    pub fn with_clock(clock: Arc<ManualClock>) -> Self {
        Self {
            clock,
            refresh_delay: StdDuration::ZERO,
            authorization_delay: StdDuration::ZERO,
            end_session_delay: StdDuration::ZERO,
            rotate_refresh_tokens: false,
            authorize_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            end_session_calls: AtomicUsize::new(0),
            user_info_calls: AtomicUsize::new(0),
            authorization_failures: Mutex::new(VecDeque::new()),
            refresh_failures: Mutex::new(VecDeque::new()),
            end_session_failures: Mutex::new(VecDeque::new()),
            user_info_failures: Mutex::new(VecDeque::new()),
            last_request: Mutex::new(None),
            last_refresh_scope: Mutex::new(None),
        }
    }

    pub const fn with_refresh_delay_ms(mut self, millis: u64) -> Self {
        self.refresh_delay = StdDuration::from_millis(millis);
        self
    }

    pub const fn with_authorization_delay_ms(mut self, millis: u64) -> Self {
        self.authorization_delay = StdDuration::from_millis(millis);
        self
    }

    pub const fn with_end_session_delay_ms(mut self, millis: u64) -> Self {
        self.end_session_delay = StdDuration::from_millis(millis);
        self
    }

    pub const fn rotating_refresh_tokens(mut self) -> Self {
        self.rotate_refresh_tokens = true;
        self
    }

    pub fn fail_next_authorization(&self, error: AuthError) {
        self.authorization_failures.lock().unwrap().push_back(error);
    }

    pub fn fail_next_refresh(&self, error: AuthError) {
        self.refresh_failures.lock().unwrap().push_back(error);
    }

    pub fn fail_next_end_session(&self, error: AuthError) {
        self.end_session_failures.lock().unwrap().push_back(error);
    }

    pub fn fail_next_user_info(&self, error: AuthError) {
        self.user_info_failures.lock().unwrap().push_back(error);
    }

    pub fn last_request(&self) -> Option<AuthorizationRequest> {
        self.last_request.lock().unwrap().clone()
    }

    pub fn last_refresh_scope(&self) -> Option<Scope> {
        self.last_refresh_scope.lock().unwrap().clone()
    }

    fn issue(&self, access_token: String, scope: Scope) -> Credentials {
        Credentials::new(access_token, self.clock.now() + Duration::hours(1), scope)
    }
}

#[async_trait]
impl IdentityClient for MockIdentity {
    async fn begin_authorization(
        &self,
        request: &AuthorizationRequest,
    ) -> AuthResult<Credentials> {
        self.authorize_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        if !self.authorization_delay.is_zero() {
            tokio::time::sleep(self.authorization_delay).await;
        }
        if let Some(error) = self.authorization_failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        Ok(self
            .issue("access-login".to_string(), request.scope.clone())
            .with_refresh_token("refresh-login")
            .with_id_token("id-login"))
    }

    async fn end_session(&self) -> AuthResult<()> {
        self.end_session_calls.fetch_add(1, Ordering::SeqCst);
        if !self.end_session_delay.is_zero() {
            tokio::time::sleep(self.end_session_delay).await;
        }
        match self.end_session_failures.lock().unwrap().pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn exchange_refresh_token(
        &self,
        _refresh_token: &str,
        scope: &Scope,
    ) -> AuthResult<Credentials> {
        let call = self.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
        *self.last_refresh_scope.lock().unwrap() = Some(scope.clone());
        if !self.refresh_delay.is_zero() {
            tokio::time::sleep(self.refresh_delay).await;
        }
        if let Some(error) = self.refresh_failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        let renewal = self.issue(format!("access-refreshed-{call}"), scope.clone());
        Ok(if self.rotate_refresh_tokens {
            renewal.with_refresh_token(format!("refresh-rotated-{call}"))
        } else {
            renewal
        })
    }

    async fn fetch_user_info(&self, _access_token: &str) -> AuthResult<UserProfile> {
        self.user_info_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.user_info_failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        Ok(UserProfile::minimal(USER_ID)
            .with_name("Test User")
            .with_email("test@example.com"))
    }
}

/// Management API keeping metadata per user in memory.
pub struct MockProfiles {
    users: Mutex<BTreeMap<String, Metadata>>,
    rejected_tokens: Mutex<HashSet<String>>,
    reject_everything: bool,
    pub get_calls: AtomicUsize,
    pub update_calls: AtomicUsize,
    failures: Mutex<VecDeque<AuthError>>,
}

impl MockProfiles {
    pub fn new() -> Self {
        let metadata = Metadata::from([("country".to_string(), "CA".into())]);
        Self {
            users: Mutex::new(BTreeMap::from([(USER_ID.to_string(), metadata)])),
            rejected_tokens: Mutex::new(HashSet::new()),
            reject_everything: false,
            get_calls: AtomicUsize::new(0),
            update_calls: AtomicUsize::new(0),
            failures: Mutex::new(VecDeque::new()),
        }
    }

    /// Every token is answered with `InvalidCredentials`.
    pub const fn rejecting_all_tokens(mut self) -> Self {
        self.reject_everything = true;
        self
    }

    pub fn reject_token(&self, access_token: &str) {
        self.rejected_tokens
            .lock()
            .unwrap()
            .insert(access_token.to_string());
    }

    pub fn fail_next(&self, error: AuthError) {
        self.failures.lock().unwrap().push_back(error);
    }

    fn check(&self, access_token: &str) -> AuthResult<()> {
        if let Some(error) = self.failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        if self.reject_everything || self.rejected_tokens.lock().unwrap().contains(access_token) {
            return Err(AuthError::InvalidCredentials);
        }
        Ok(())
    }

    fn profile(&self, user_id: &str) -> AuthResult<UserProfile> {
        let users = self.users.lock().unwrap();
        let metadata = users
            .get(user_id)
            .ok_or_else(|| AuthError::provider("user_not_found"))?;
        Ok(UserProfile::full(user_id, metadata.clone()).with_name("Test User"))
    }
}

#[async_trait]
impl ProfileApi for MockProfiles {
    async fn get_full_profile(
        &self,
        user_id: &str,
        access_token: &str,
    ) -> AuthResult<UserProfile> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.check(access_token)?;
        self.profile(user_id)
    }

    async fn update_metadata(
        &self,
        user_id: &str,
        access_token: &str,
        patch: &MetadataPatch,
    ) -> AuthResult<UserProfile> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.check(access_token)?;
        {
            let mut users = self.users.lock().unwrap();
            let metadata = users
                .get_mut(user_id)
                .ok_or_else(|| AuthError::provider("user_not_found"))?;
            patch.apply_to(metadata);
        }
        self.profile(user_id)
    }
}
