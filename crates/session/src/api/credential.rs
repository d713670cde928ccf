//! Bearer credential shared between the auth store and the request layer.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use secrecy::{ExposeSecret, SecretString};

type RejectionListener = Box<dyn Fn() + Send + Sync>;

/// The token attached to outbound requests.
///
/// Only the auth store sets or clears it; the request layer reads it and
/// reports when the API rejects it.
#[derive(Clone, Default)]
pub struct BearerCredential {
    inner: Arc<CredentialInner>,
}

#[derive(Default)]
struct CredentialInner {
    token: RwLock<Option<SecretString>>,
    listeners: Mutex<Vec<RejectionListener>>,
}

impl BearerCredential {
    /// Create an empty credential.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a token is currently attached.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.inner
            .token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub(crate) fn current(&self) -> Option<SecretString> {
        self.inner
            .token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn set(&self, token: SecretString) {
        *self
            .inner
            .token
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(token);
    }

    pub(crate) fn clear(&self) {
        *self
            .inner
            .token
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Register a callback run when the API rejects the current token.
    pub(crate) fn on_rejected(&self, listener: impl Fn() + Send + Sync + 'static) {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(listener));
    }

    /// Report that a request made with `used` came back 401.
    ///
    /// Listeners only run if `used` is still the current token; a rejection
    /// of a token that has since been replaced or cleared is stale.
    /// Returns whether the listeners ran.
    pub(crate) fn reject(&self, used: &SecretString) -> bool {
        let still_current = self
            .current()
            .is_some_and(|current| current.expose_secret() == used.expose_secret());
        if !still_current {
            return false;
        }

        let listeners = self
            .inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for listener in listeners.iter() {
            listener();
        }
        true
    }
}

impl std::fmt::Debug for BearerCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerCredential")
            .field("token", &if self.is_set() { "[REDACTED]" } else { "<none>" })
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn test_reject_runs_listeners_for_current_token() {
        let credential = BearerCredential::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        credential.on_rejected(move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        credential.set(SecretString::from("t1"));
        assert!(credential.reject(&SecretString::from("t1")));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stale_rejection_is_ignored() {
        let credential = BearerCredential::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        credential.on_rejected(move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        credential.set(SecretString::from("new-token"));
        assert!(!credential.reject(&SecretString::from("old-token")));

        credential.clear();
        assert!(!credential.reject(&SecretString::from("new-token")));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_listener_may_clear_the_token() {
        let credential = BearerCredential::new();
        let handle = credential.clone();
        credential.on_rejected(move || handle.clear());

        credential.set(SecretString::from("t1"));
        credential.reject(&SecretString::from("t1"));
        assert!(!credential.is_set());
    }

    #[test]
    fn test_debug_redacts_token() {
        let credential = BearerCredential::new();
        credential.set(SecretString::from("super-secret"));
        let debug = format!("{credential:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("REDACTED"));
    }
}
