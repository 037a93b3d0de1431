use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Role, UserRecord};

use super::credentials::Credentials;
use super::role::HomeView;

/// Secure-storage key holding the serialized `StoredCredentials`
pub const SESSION_KEY: &str = "userToken";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub enum SessionStatus {
    /// Before the first hydration attempt starts
    Uninitialized,
    Hydrating,
    Authenticated,
    Unauthenticated,
}

/// A signed-in user together with the credentials that proved it.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    credentials: Credentials,
    user: UserRecord,
    token: Option<String>,
    authenticated_at: DateTime<Utc>,
    offline: bool,
}

impl Session {
    /// A session the server just vouched for.
    pub(crate) fn new(credentials: Credentials, user: UserRecord, token: Option<String>) -> Self {
        Self {
            credentials,
            user,
            token,
            authenticated_at: Utc::now(),
            offline: false,
        }
    }

    /// A session rebuilt from storage without asking the server.
    pub(crate) fn restored(
        credentials: Credentials,
        user: UserRecord,
        stored: &StoredCredentials,
        offline: bool,
    ) -> Self {
        Self {
            credentials,
            user,
            token: stored.token.clone(),
            authenticated_at: stored.saved_at,
            offline,
        }
    }

    pub fn identifier(&self) -> &str {
        self.credentials.identifier()
    }

    pub fn user(&self) -> &UserRecord {
        &self.user
    }

    pub fn role(&self) -> Role {
        self.user.role
    }

    pub fn home_view(&self) -> HomeView {
        self.user.role.into()
    }

    /// Server-issued token from the last login response, if any
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn authenticated_at(&self) -> DateTime<Utc> {
        self.authenticated_at
    }

    /// Time since the server last accepted these credentials
    pub fn age(&self) -> Duration {
        Utc::now() - self.authenticated_at
    }

    /// True when restored at boot because the server could not be reached
    pub fn is_offline(&self) -> bool {
        self.offline
    }

    pub(crate) fn credentials(&self) -> &Credentials {
        &self.credentials
    }
}

/// The JSON blob kept in secure storage under `SESSION_KEY`.
///
/// `identifier` and `secret` sit at the top level; the last known user and
/// token ride along so the session can be restored while offline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCredentials {
    #[serde(flatten)]
    pub credentials: Credentials,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<UserRecord>,
    #[serde(default = "Utc::now")]
    pub saved_at: DateTime<Utc>,
}

impl StoredCredentials {
    pub fn from_session(session: &Session) -> Self {
        Self {
            credentials: session.credentials().clone(),
            token: session.token.clone(),
            user: Some(session.user.clone()),
            saved_at: session.authenticated_at,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

/// Read-only view of session state handed to the rest of the app.
///
/// Only the constructors below build snapshots, so `session` is present
/// exactly when `status` is `Authenticated`.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    status: SessionStatus,
    session: Option<Arc<Session>>,
    is_loading: bool,
    error: Option<String>,
}

impl SessionSnapshot {
    pub(crate) fn uninitialized() -> Self {
        Self {
            status: SessionStatus::Uninitialized,
            session: None,
            is_loading: false,
            error: None,
        }
    }

    pub(crate) fn hydrating() -> Self {
        Self {
            status: SessionStatus::Hydrating,
            session: None,
            is_loading: true,
            error: None,
        }
    }

    pub(crate) fn authenticated(session: Arc<Session>) -> Self {
        Self {
            status: SessionStatus::Authenticated,
            session: Some(session),
            is_loading: false,
            error: None,
        }
    }

    pub(crate) fn unauthenticated(error: Option<String>) -> Self {
        Self {
            status: SessionStatus::Unauthenticated,
            session: None,
            is_loading: false,
            error,
        }
    }

    pub(crate) fn set_loading(&mut self, loading: bool) {
        self.is_loading = loading;
    }

    /// End a failed operation: loading off, error set, everything else
    /// kept. A failure before the first hydration settles the status to
    /// `Unauthenticated`.
    pub(crate) fn record_failure(&mut self, message: String) {
        if self.status == SessionStatus::Uninitialized {
            *self = Self::unauthenticated(Some(message));
            return;
        }
        self.is_loading = false;
        self.error = Some(message);
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn session(&self) -> Option<&Arc<Session>> {
        self.session.as_ref()
    }

    pub fn user(&self) -> Option<&UserRecord> {
        self.session.as_deref().map(Session::user)
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }

    /// Views that gate on the session must not render until this is false
    pub fn is_resolving(&self) -> bool {
        matches!(
            self.status,
            SessionStatus::Uninitialized | SessionStatus::Hydrating
        )
    }

    pub fn home_view(&self) -> Option<HomeView> {
        self.session.as_deref().map(Session::home_view)
    }
}

// ============================================================================
// Tests
// ============================================================================
