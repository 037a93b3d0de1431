//! The session state machine.
//!
//! `SessionManager` is the only writer of the session blob and of the
//! published `SessionSnapshot`. Operations hold an async mutex for their
//! whole duration, so overlapping calls queue instead of interleaving.
//! Each operation runs on its own task: a caller that stops waiting does not
//! stop the write-then-publish step.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::api::{RemoteAuthService, DEFAULT_REQUEST_TIMEOUT_SECS};
use crate::models::UserRecord;
use crate::storage::{SecurePersistence, StorageError};

use super::credentials::Credentials;
use super::error::{
    SessionError, DEFAULT_REJECTION_MESSAGE, INTERRUPTED_MESSAGE, MALFORMED_RESPONSE_MESSAGE,
    SAVE_FAILED_MESSAGE, SIGN_OUT_FAILED_MESSAGE, TIMEOUT_MESSAGE,
};
use super::session::{Session, SessionSnapshot, SessionStatus, StoredCredentials, SESSION_KEY};

/// How `hydrate` treats a stored blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HydrationPolicy {
    /// Re-send the stored pair to the server on every cold start; restore
    /// offline from the stored user only if the server can't be reached.
    #[default]
    Revalidate,
    /// Restore from the stored user record without a network call.
    TrustStored,
}

impl HydrationPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "revalidate" => Some(HydrationPolicy::Revalidate),
            "trust_stored" | "trust" => Some(HydrationPolicy::TrustStored),
            _ => None,
        }
    }
}

pub struct SessionManager {
    core: Core,
}

/// Everything an operation task needs. Cloning shares the store, remote,
/// lock and published state.
#[derive(Clone)]
struct Core {
    store: Arc<dyn SecurePersistence>,
    remote: Arc<dyn RemoteAuthService>,
    policy: HydrationPolicy,
    request_timeout: Duration,
    op_lock: Arc<Mutex<()>>,
    state: Arc<watch::Sender<SessionSnapshot>>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SecurePersistence>, remote: Arc<dyn RemoteAuthService>) -> Self {
        let (state, _) = watch::channel(SessionSnapshot::uninitialized());
        Self {
            core: Core {
                store,
                remote,
                policy: HydrationPolicy::default(),
                request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
                op_lock: Arc::new(Mutex::new(())),
                state: Arc::new(state),
            },
        }
    }

    pub fn with_policy(mut self, policy: HydrationPolicy) -> Self {
        self.core.policy = policy;
        self
    }

    /// Upper bound on a single login round trip, independent of whatever
    /// timeout the `RemoteAuthService` applies itself.
    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.core.request_timeout = request_timeout;
        self
    }

    pub fn policy(&self) -> HydrationPolicy {
        self.core.policy
    }

    // =========================================================================
    // Observation
    // =========================================================================

    pub fn snapshot(&self) -> SessionSnapshot {
        self.core.state.borrow().clone()
    }

    /// Receiver that wakes on every state change
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.core.state.subscribe()
    }

    pub fn status(&self) -> SessionStatus {
        self.core.state.borrow().status()
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Restore the session from secure storage. Call once at boot, before
    /// any gated view renders. Never fails: every problem ends in
    /// `Unauthenticated`.
    pub async fn hydrate(&self) {
        let core = self.core.clone();
        if let Err(e) = tokio::spawn(async move { core.hydrate().await }).await {
            error!(error = %e, "Hydration task failed");
            self.core.publish(SessionSnapshot::unauthenticated(None));
        }
    }

    /// Validate locally, ask the server once, then persist and publish.
    ///
    /// On any failure the published session and the stored blob are left as
    /// they were; only the error field changes (and not even that for
    /// validation failures). A failure before `hydrate` has run leaves the
    /// status `Unauthenticated`.
    pub async fn sign_in(&self, identifier: &str, secret: &str) -> Result<UserRecord, SessionError> {
        let credentials = Credentials::new(identifier, secret)?;

        let core = self.core.clone();
        tokio::spawn(async move { core.sign_in(credentials).await })
            .await
            .unwrap_or_else(|e| {
                error!(error = %e, "Sign-in task failed");
                Err(SessionError::Transport(INTERRUPTED_MESSAGE.to_string()))
            })
    }

    /// Log out locally and drop the stored blob. Succeeds when already
    /// signed out. A failed delete is reported, but the in-memory session is
    /// cleared regardless.
    pub async fn sign_out(&self) -> Result<(), SessionError> {
        let core = self.core.clone();
        tokio::spawn(async move { core.sign_out().await })
            .await
            .unwrap_or_else(|e| {
                error!(error = %e, "Sign-out task failed");
                self.core.publish(SessionSnapshot::unauthenticated(None));
                Err(SessionError::Persistence(SIGN_OUT_FAILED_MESSAGE.to_string()))
            })
    }
}

impl Core {
    fn publish(&self, snapshot: SessionSnapshot) {
        self.state.send_replace(snapshot);
    }

    fn set_loading(&self, loading: bool) {
        self.state.send_modify(|s| s.set_loading(loading));
    }

    // =========================================================================
    // Hydration
    // =========================================================================

    async fn hydrate(&self) {
        let _guard = self.op_lock.lock().await;
        self.publish(SessionSnapshot::hydrating());

        let next = match self.restore().await {
            Some(session) => {
                info!(
                    role = %session.role(),
                    offline = session.is_offline(),
                    "Session restored"
                );
                SessionSnapshot::authenticated(Arc::new(session))
            }
            None => {
                debug!("No session restored");
                SessionSnapshot::unauthenticated(None)
            }
        };
        self.publish(next);
    }

    async fn restore(&self) -> Option<Session> {
        let raw = match self.store.get(SESSION_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("No stored credentials");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "Failed to read stored credentials");
                return None;
            }
        };

        let stored = match StoredCredentials::from_json(&raw) {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, "Stored credentials are malformed, discarding");
                self.discard_stored().await;
                return None;
            }
        };
        if let Err(e) = stored.credentials.validate() {
            warn!(error = %e, "Stored credentials fail validation, discarding");
            self.discard_stored().await;
            return None;
        }

        if self.policy == HydrationPolicy::TrustStored {
            if let Some(user) = stored.user.clone() {
                return Some(Session::restored(stored.credentials.clone(), user, &stored, false));
            }
            debug!("Stored credentials carry no user record, revalidating");
        }

        match self.authenticate(&stored.credentials).await {
            Ok((user, token)) => {
                let session = Session::new(stored.credentials, user, token.or(stored.token));
                if let Err(e) = self.persist(&session).await {
                    // The stored pair is still the one the server accepted
                    warn!(error = %e, "Failed to refresh stored credentials");
                }
                Some(session)
            }
            Err(SessionError::AuthRejected(reason)) => {
                info!(reason = %reason, "Stored credentials rejected by server");
                self.discard_stored().await;
                None
            }
            Err(e) => match stored.user.clone() {
                Some(user) => {
                    info!(error = %e, "Server unavailable, restoring offline session");
                    Some(Session::restored(stored.credentials.clone(), user, &stored, true))
                }
                None => {
                    warn!(error = %e, "Server unavailable and no stored user record");
                    None
                }
            },
        }
    }

    async fn discard_stored(&self) {
        if let Err(e) = self.store.delete(SESSION_KEY).await {
            warn!(error = %e, "Failed to delete stored credentials");
        }
    }

    // =========================================================================
    // Sign-in / sign-out
    // =========================================================================

    async fn sign_in(&self, credentials: Credentials) -> Result<UserRecord, SessionError> {
        let _guard = self.op_lock.lock().await;
        self.set_loading(true);

        match self.sign_in_locked(credentials).await {
            Ok(session) => {
                let user = session.user().clone();
                info!(role = %user.role, "Sign-in successful");
                self.publish(SessionSnapshot::authenticated(Arc::new(session)));
                Ok(user)
            }
            Err(e) => {
                error!(kind = e.kind(), error = %e, "Sign-in failed");
                let message = e.to_string();
                self.state.send_modify(|s| s.record_failure(message));
                Err(e)
            }
        }
    }

    async fn sign_in_locked(&self, credentials: Credentials) -> Result<Session, SessionError> {
        let (user, token) = self.authenticate(&credentials).await?;
        let session = Session::new(credentials, user, token);

        self.persist(&session).await.map_err(|e| {
            error!(error = %e, "Failed to store credentials");
            SessionError::Persistence(SAVE_FAILED_MESSAGE.to_string())
        })?;

        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), SessionError> {
        let _guard = self.op_lock.lock().await;
        let was_authenticated = self.state.borrow().is_authenticated();

        let mut cleared = SessionSnapshot::unauthenticated(None);
        cleared.set_loading(true);
        self.publish(cleared);

        match self.store.delete(SESSION_KEY).await {
            Ok(()) => {
                if was_authenticated {
                    info!("Signed out");
                } else {
                    debug!("Sign-out with no active session");
                }
                self.publish(SessionSnapshot::unauthenticated(None));
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Failed to delete stored credentials during sign-out");
                self.publish(SessionSnapshot::unauthenticated(Some(
                    SIGN_OUT_FAILED_MESSAGE.to_string(),
                )));
                Err(SessionError::Persistence(SIGN_OUT_FAILED_MESSAGE.to_string()))
            }
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// One bounded round trip to the server, classified into a user record
    /// or a `SessionError`.
    async fn authenticate(
        &self,
        credentials: &Credentials,
    ) -> Result<(UserRecord, Option<String>), SessionError> {
        let response = match timeout(self.request_timeout, self.remote.login(credentials)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!(error = %e, "Login request failed");
                return Err(e.into());
            }
            Err(_) => {
                warn!(timeout_ms = self.request_timeout.as_millis() as u64, "Login request timed out");
                return Err(SessionError::Transport(TIMEOUT_MESSAGE.to_string()));
            }
        };

        if !response.success {
            let message = response
                .message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_REJECTION_MESSAGE.to_string());
            return Err(SessionError::AuthRejected(message));
        }

        let wire = response.user.ok_or_else(|| {
            warn!("Login succeeded without a user record");
            SessionError::Transport(MALFORMED_RESPONSE_MESSAGE.to_string())
        })?;
        let user = UserRecord::try_from(wire).map_err(|e| {
            warn!(error = %e, "Malformed user record in login response");
            SessionError::Transport(MALFORMED_RESPONSE_MESSAGE.to_string())
        })?;

        Ok((user, response.token))
    }

    async fn persist(&self, session: &Session) -> Result<(), StorageError> {
        let json = StoredCredentials::from_session(session)
            .to_json()
            .map_err(|e| StorageError::Encoding(e.to_string()))?;
        self.store.set(SESSION_KEY, &json).await
    }
}

// ============================================================================
// Tests
// ============================================================================
