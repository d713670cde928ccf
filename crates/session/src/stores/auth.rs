//! Auth store.
//!
//! Owns the logged-in session and is the only writer of the shared
//! [`BearerCredential`]. Every session change bumps an epoch; a login whose
//! epoch is no longer current when its response arrives is discarded.

use std::sync::{Arc, Mutex, PoisonError, Weak};

use secrecy::{ExposeSecret, SecretString};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use swan_botanical_core::{AuthStatus, Email, Identity};

use super::decode::decode_identity;
use crate::api::{ApiError, AuthApi, AuthGrant, BearerCredential};
use crate::storage::{SharedStore, keys};

const INVALID_EMAIL: &str = "Invalid email address";
const LOGIN_FAILED: &str = "Login failed";
const REGISTRATION_FAILED: &str = "Registration failed";
const SESSION_EXPIRED: &str = "Your session has expired. Please log in again.";

/// Bearer token and the identity it belongs to.
#[derive(Clone)]
pub struct Session {
    token: SecretString,
    identity: Identity,
}

impl Session {
    #[must_use]
    pub const fn identity(&self) -> &Identity {
        &self.identity
    }

    #[must_use]
    pub const fn token(&self) -> &SecretString {
        &self.token
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &"[REDACTED]")
            .field("identity", &self.identity)
            .finish()
    }
}

/// Snapshot of the auth store.
#[derive(Debug, Clone, Default)]
pub struct AuthState {
    status: AuthStatus,
    session: Option<Session>,
    error: Option<String>,
    ready: bool,
    epoch: u64,
}

impl AuthState {
    #[must_use]
    pub const fn status(&self) -> AuthStatus {
        self.status
    }

    #[must_use]
    pub const fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        self.session.as_ref().map(Session::identity)
    }

    /// Message from the last failed attempt or forced logout.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.ready
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self.status, AuthStatus::Authenticated)
    }
}

/// How a login or registration attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Authenticated(Identity),
    /// The attempt failed; the message is also exposed as [`AuthState::error`].
    Rejected(String),
    /// A logout or newer attempt happened while this one was in flight.
    Superseded,
}

/// The current session, mirrored under the `token` and `user` keys.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct AuthStore {
    inner: Arc<AuthInner>,
}

type SessionEndListener = Box<dyn Fn() + Send + Sync>;

struct AuthInner {
    storage: SharedStore,
    api: Arc<dyn AuthApi>,
    credential: BearerCredential,
    state: watch::Sender<AuthState>,
    on_end: Mutex<Vec<SessionEndListener>>,
}

impl AuthStore {
    /// Create the store and subscribe it to credential rejections, so a 401
    /// caused by the current token forces a logout.
    #[must_use]
    pub fn new(storage: SharedStore, api: Arc<dyn AuthApi>, credential: BearerCredential) -> Self {
        let (state, _) = watch::channel(AuthState::default());
        let inner = Arc::new(AuthInner {
            storage,
            api,
            credential,
            state,
            on_end: Mutex::new(Vec::new()),
        });

        let weak: Weak<AuthInner> = Arc::downgrade(&inner);
        inner.credential.on_rejected(move || {
            if let Some(inner) = weak.upgrade() {
                Self { inner }.force_logout();
            }
        });

        Self { inner }
    }

    /// Restore a persisted session. Later calls are no-ops.
    ///
    /// Both `token` and `user` must be present and valid; anything partial
    /// is deleted.
    pub fn initialize(&self) {
        if self.inner.state.borrow().ready {
            return;
        }

        let session = self.restore();
        if let Some(session) = &session {
            self.inner.credential.set(session.token.clone());
        }

        self.inner.state.send_if_modified(|state| {
            if state.ready {
                return false;
            }
            state.status = if session.is_some() {
                AuthStatus::Authenticated
            } else {
                AuthStatus::Unauthenticated
            };
            state.session = session;
            state.ready = true;
            debug!(status = %state.status, "Auth state restored");
            true
        });
    }

    fn restore(&self) -> Option<Session> {
        let storage = &self.inner.storage;
        let token = storage.read(keys::TOKEN);
        let user = storage.read(keys::USER);

        let session = match (&token, &user) {
            (Some(token), Some(user)) if !token.trim().is_empty() => match decode_identity(user) {
                Ok(identity) => Some(Session {
                    token: SecretString::from(token.clone()),
                    identity,
                }),
                Err(e) => {
                    warn!(error = %e, "Discarding unreadable persisted user");
                    None
                }
            },
            _ => None,
        };

        if session.is_none() && (token.is_some() || user.is_some()) {
            warn!("Discarding partial persisted session");
            storage.remove(keys::TOKEN);
            storage.remove(keys::USER);
        }
        session
    }

    /// Log in with email and password.
    ///
    /// Never fails; failures come back as [`LoginOutcome::Rejected`].
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> LoginOutcome {
        let Some((email, attempt)) = self.begin(email) else {
            return LoginOutcome::Rejected(INVALID_EMAIL.to_string());
        };
        let result = self.inner.api.login(&email, password).await;
        self.finish(attempt, result, LOGIN_FAILED)
    }

    /// Create an account and log in to it.
    ///
    /// Never fails; failures come back as [`LoginOutcome::Rejected`].
    #[instrument(skip(self, password))]
    pub async fn register(&self, email: &str, password: &str, name: &str) -> LoginOutcome {
        let Some((email, attempt)) = self.begin(email) else {
            return LoginOutcome::Rejected(INVALID_EMAIL.to_string());
        };
        let result = self.inner.api.register(&email, password, name).await;
        self.finish(attempt, result, REGISTRATION_FAILED)
    }

    /// Validate the address and move to `Authenticating` under a new epoch.
    fn begin(&self, email: &str) -> Option<(Email, Attempt<'_>)> {
        self.initialize();

        let Ok(email) = Email::parse(email) else {
            self.inner.state.send_modify(|state| {
                state.error = Some(INVALID_EMAIL.to_string());
            });
            return None;
        };

        let mut epoch = 0;
        self.inner.state.send_modify(|state| {
            state.epoch += 1;
            state.status = AuthStatus::Authenticating;
            state.error = None;
            epoch = state.epoch;
        });
        Some((
            email,
            Attempt {
                state: &self.inner.state,
                epoch,
                settled: false,
            },
        ))
    }

    fn finish(
        &self,
        mut attempt: Attempt<'_>,
        result: Result<AuthGrant, ApiError>,
        fallback: &str,
    ) -> LoginOutcome {
        attempt.settled = true;
        let storage = &self.inner.storage;
        let credential = &self.inner.credential;
        let mut outcome = LoginOutcome::Superseded;

        self.inner.state.send_if_modified(|state| {
            if state.epoch != attempt.epoch {
                debug!("Discarding superseded auth response");
                return false;
            }

            match result {
                Ok(AuthGrant { token, identity }) => {
                    storage.write(keys::TOKEN, token.expose_secret());
                    match serde_json::to_string(&identity) {
                        Ok(json) => storage.write(keys::USER, &json),
                        Err(e) => warn!(error = %e, "Failed to serialize user"),
                    }
                    credential.set(token.clone());
                    info!(email = %identity.email, "Logged in");

                    outcome = LoginOutcome::Authenticated(identity.clone());
                    state.session = Some(Session { token, identity });
                    state.status = AuthStatus::Authenticated;
                    state.error = None;
                }
                Err(e) => {
                    warn!(error = %e, "Authentication failed");
                    let message = e.server_message().unwrap_or(fallback).to_string();
                    outcome = LoginOutcome::Rejected(message.clone());
                    state.status = settled_status(state);
                    state.error = Some(message);
                }
            }
            true
        });
        outcome
    }

    /// Drop the session. Always succeeds and never touches the network.
    pub fn logout(&self) {
        self.end_session(None);
        info!("Logged out");
    }

    /// Drop the session because the API rejected its token.
    pub fn force_logout(&self) {
        self.end_session(Some(SESSION_EXPIRED));
        warn!("Session expired, logged out");
    }

    fn end_session(&self, error: Option<&str>) {
        self.initialize();
        let storage = &self.inner.storage;
        let credential = &self.inner.credential;

        self.inner.state.send_modify(|state| {
            storage.remove(keys::TOKEN);
            storage.remove(keys::USER);
            credential.clear();

            state.epoch += 1;
            state.session = None;
            state.status = AuthStatus::Unauthenticated;
            state.error = error.map(str::to_owned);
        });

        let listeners = self
            .inner
            .on_end
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for listener in listeners.iter() {
            listener();
        }
    }

    /// Register a callback run after every logout, forced or not.
    pub fn on_session_end(&self, listener: impl Fn() + Send + Sync + 'static) {
        self.inner
            .on_end
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(listener));
    }

    /// Dismiss the last error message.
    pub fn clear_error(&self) {
        self.inner
            .state
            .send_if_modified(|state| state.error.take().is_some());
    }

    /// Current snapshot.
    #[must_use]
    pub fn state(&self) -> AuthState {
        self.inner.state.borrow().clone()
    }

    /// Receive a snapshot after every change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.inner.state.subscribe()
    }

    #[must_use]
    pub fn status(&self) -> AuthStatus {
        self.inner.state.borrow().status
    }

    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.inner.state.borrow().identity().cloned()
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.inner.state.borrow().ready
    }
}

impl std::fmt::Debug for AuthStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthStore")
            .field("state", &*self.inner.state.borrow())
            .field("credential", &self.inner.credential)
            .finish_non_exhaustive()
    }
}

/// Status to fall back to when an attempt ends without a new session.
const fn settled_status(state: &AuthState) -> AuthStatus {
    if state.session.is_some() {
        AuthStatus::Authenticated
    } else {
        AuthStatus::Unauthenticated
    }
}

/// An in-flight login or registration. If dropped before it settles (the
/// caller's future was cancelled) and nothing newer has happened, the status
/// leaves `Authenticating`.
struct Attempt<'a> {
    state: &'a watch::Sender<AuthState>,
    epoch: u64,
    settled: bool,
}

impl Drop for Attempt<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        self.state.send_if_modified(|state| {
            if state.epoch != self.epoch || !state.status.is_in_flight() {
                return false;
            }
            state.status = settled_status(state);
            true
        });
    }
}
