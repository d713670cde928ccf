//! End-to-end tests for the Swan Botanical session engine.
//!
//! Each test gets a [`TestContext`]: a `wiremock` server standing in for the
//! storefront API (mounted under `/api`) and a temporary state directory, so
//! a provider can be dropped and reopened to simulate a restart.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p swan-botanical-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `auth_flow` - Login, logout, forced logout and superseded logins
//! - `wishlist_sync` - Server reconciliation and product validation
//! - `cart_persistence` - Cart state across restarts and corrupt files

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::Path;

use serde_json::{Value, json};
use swan_botanical_core::WishlistSync;
use swan_botanical_session::{SessionConfig, SessionProvider};
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Mock API plus a state directory that outlives individual providers.
pub struct TestContext {
    pub server: MockServer,
    state_dir: TempDir,
}

impl TestContext {
    /// Start a mock API and create an empty state directory.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    pub async fn new() -> Self {
        #[allow(clippy::expect_used)]
        let state_dir = tempfile::tempdir().expect("Failed to create state directory");
        Self {
            server: MockServer::start().await,
            state_dir,
        }
    }

    #[must_use]
    pub fn state_dir(&self) -> &Path {
        self.state_dir.path()
    }

    /// Configuration pointing at the mock API and the state directory.
    ///
    /// # Panics
    ///
    /// Panics if the mock server URI is not a valid URL.
    #[must_use]
    pub fn config(&self, sync: WishlistSync) -> SessionConfig {
        #[allow(clippy::expect_used)]
        let base = Url::parse(&format!("{}/api", self.server.uri())).expect("mock server URI");
        let mut config = SessionConfig::new(base);
        config.wishlist_sync = sync;
        config.state_dir = Some(self.state_dir.path().to_path_buf());
        config
    }

    /// Open and initialize a provider, as an app would at start-up.
    ///
    /// # Panics
    ///
    /// Panics if the provider cannot be opened.
    #[must_use]
    pub fn provider(&self, sync: WishlistSync) -> SessionProvider {
        self.provider_with(self.config(sync))
    }

    /// Like [`provider`](Self::provider) with an explicit configuration.
    ///
    /// # Panics
    ///
    /// Panics if the provider cannot be opened.
    #[must_use]
    pub fn provider_with(&self, config: SessionConfig) -> SessionProvider {
        #[allow(clippy::expect_used)]
        let provider = SessionProvider::open(config).expect("Failed to open session provider");
        provider.initialize();
        provider
    }

    /// Accept `email` with password `secret` and hand out `token`.
    pub async fn mount_login(&self, email: &str, token: &str) {
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .and(wiremock::matchers::body_partial_json(
                json!({"email": email, "password": "secret"}),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(auth_response(email, token)))
            .mount(&self.server)
            .await;
    }

    /// Whether a persisted key exists in the state directory.
    #[must_use]
    pub fn has_persisted(&self, key: &str) -> bool {
        self.state_dir.path().join(key).exists()
    }
}

/// Body of a successful login or registration.
#[must_use]
pub fn auth_response(email: &str, token: &str) -> Value {
    json!({
        "token": token,
        "user": {"_id": "u1", "name": "Asha", "email": email}
    })
}

/// A populated product as the API returns it.
#[must_use]
pub fn product_json(id: &str, name: &str, price: u32) -> Value {
    json!({
        "_id": id,
        "name": name,
        "price": price,
        "images": [format!("/images/{id}.jpg")],
        "stock": 10
    })
}
