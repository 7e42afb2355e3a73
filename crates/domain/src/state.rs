//! Session lifecycle state types.
//!
//! This module defines the session state machine and the immutable
//! snapshot handed to observers:
//! - `LoggedOut`: no session, login or restore allowed
//! - `Authenticating`: browser flow or restore in progress
//! - `Active`: credentials and profile available
//! - `Refreshing`: explicit renewal in progress

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::auth::Credentials;
use crate::profile::UserProfile;

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No session exists.
    #[default]
    LoggedOut,
    /// Login or restore is in progress.
    Authenticating,
    /// A session is available.
    Active,
    /// Credentials are being renewed.
    Refreshing,
}

impl SessionState {
    /// Returns true while a login or renewal is in flight.
    #[must_use]
    pub const fn is_busy(self) -> bool {
        matches!(self, Self::Authenticating | Self::Refreshing)
    }

    /// Returns true if a session is available.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }

    /// Returns the state name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LoggedOut => "logged_out",
            Self::Authenticating => "authenticating",
            Self::Active => "active",
            Self::Refreshing => "refreshing",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Credentials paired with the profile of the user they belong to.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// Current credentials.
    pub credentials: Credentials,
    /// Profile, once fetched.
    pub profile: Option<UserProfile>,
}

impl Session {
    /// Creates a session.
    #[must_use]
    pub const fn new(credentials: Credentials, profile: Option<UserProfile>) -> Self {
        Self {
            credentials,
            profile,
        }
    }

    /// Identifier of the signed-in user, if the profile is known.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.profile.as_ref().map(|p| p.id.as_str())
    }
}

/// Immutable view of the session for observers.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionSnapshot {
    /// Lifecycle state.
    pub state: SessionState,
    /// The session, present while `Active` or `Refreshing`.
    pub session: Option<Session>,
}

impl SessionSnapshot {
    /// Snapshot with no session.
    #[must_use]
    pub const fn logged_out() -> Self {
        Self {
            state: SessionState::LoggedOut,
            session: None,
        }
    }

    /// Snapshot of an active session.
    #[must_use]
    pub const fn active(session: Session) -> Self {
        Self {
            state: SessionState::Active,
            session: Some(session),
        }
    }

    /// Returns the profile if known.
    #[must_use]
    pub fn profile(&self) -> Option<&UserProfile> {
        self.session.as_ref().and_then(|s| s.profile.as_ref())
    }

    /// Returns the credentials if a session exists.
    #[must_use]
    pub fn credentials(&self) -> Option<&Credentials> {
        self.session.as_ref().map(|s| &s.credentials)
    }
}
