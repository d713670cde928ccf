//! Composition root for the session engine.

use std::sync::Arc;

use swan_botanical_core::WishlistSync;
use tracing::{debug, info};

use crate::api::{
    ApiClient, ApiError, AuthApi, BearerCredential, HttpAuthApi, HttpProductCatalog,
    HttpWishlistApi, ProductCatalog, WishlistApi,
};
use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::storage::{FileStore, MemoryStore, SharedStore};
use crate::stores::{AuthStore, CartStore, WishlistStore};

/// External services the stores talk to.
pub struct Collaborators {
    pub auth: Arc<dyn AuthApi>,
    /// Used only when the wishlist is in server mode.
    pub wishlist: Option<Arc<dyn WishlistApi>>,
    /// Used only when product validation is enabled.
    pub catalog: Option<Arc<dyn ProductCatalog>>,
}

/// Owns the three stores and the shared request layer.
///
/// Built once at start-up and handed to consumers by cheap clone.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
///
/// use swan_botanical_session::storage::MemoryStore;
/// use swan_botanical_session::{SessionConfig, SessionProvider};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = SessionConfig::from_env()?;
/// let provider = SessionProvider::new(config, Arc::new(MemoryStore::new()))?;
/// provider.initialize();
/// println!("{} items in cart", provider.cart().count());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SessionProvider {
    inner: Arc<ProviderInner>,
}

struct ProviderInner {
    config: SessionConfig,
    credential: BearerCredential,
    cart: CartStore,
    wishlist: WishlistStore,
    auth: AuthStore,
}

impl SessionProvider {
    /// Build the engine against the HTTP API in `config`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the HTTP client cannot be built.
    pub fn new(config: SessionConfig, storage: SharedStore) -> Result<Self, ApiError> {
        let credential = BearerCredential::new();
        let client = ApiClient::new(&config, credential.clone())?;

        let collaborators = Collaborators {
            auth: Arc::new(HttpAuthApi::new(client.clone())),
            wishlist: Some(Arc::new(HttpWishlistApi::new(client.clone()))),
            catalog: config
                .validate_products
                .then(|| Arc::new(HttpProductCatalog::new(client)) as Arc<dyn ProductCatalog>),
        };
        Ok(Self::from_parts(config, storage, credential, collaborators))
    }

    /// Open the engine with the storage `config` asks for: a [`FileStore`]
    /// under `state_dir`, or memory if unset.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the state directory cannot be created or
    /// the HTTP client cannot be built.
    pub fn open(config: SessionConfig) -> Result<Self, SessionError> {
        let storage: SharedStore = match &config.state_dir {
            Some(dir) => Arc::new(FileStore::open(dir)?),
            None => Arc::new(MemoryStore::new()),
        };
        Ok(Self::new(config, storage)?)
    }

    /// Build the engine from explicit collaborators.
    ///
    /// `credential` must be the one the collaborators' requests read from.
    #[must_use]
    pub fn from_parts(
        config: SessionConfig,
        storage: SharedStore,
        credential: BearerCredential,
        collaborators: Collaborators,
    ) -> Self {
        let catalog = if config.validate_products {
            collaborators.catalog
        } else {
            None
        };

        let cart = CartStore::new(Arc::clone(&storage));
        let wishlist = WishlistStore::new(
            Arc::clone(&storage),
            config.wishlist_sync,
            collaborators.wishlist,
            catalog,
        );
        let auth = AuthStore::new(storage, collaborators.auth, credential.clone());
        if wishlist.sync() == WishlistSync::Server {
            let wishlist = wishlist.clone();
            auth.on_session_end(move || wishlist.forget_server_copy());
        }
        debug!(api = %config.api_base_url, wishlist_sync = %wishlist.sync(), "Session engine built");

        Self {
            inner: Arc::new(ProviderInner {
                config,
                credential,
                cart,
                wishlist,
                auth,
            }),
        }
    }

    /// Load every store from storage. Safe to call more than once.
    pub fn initialize(&self) {
        self.inner.auth.initialize();
        self.inner.cart.initialize();
        self.inner.wishlist.initialize();
        info!(
            authenticated = self.inner.auth.state().is_authenticated(),
            cart_lines = self.inner.cart.state().lines().len(),
            wishlist_entries = self.inner.wishlist.state().len(),
            "Session engine ready"
        );
    }

    /// Whether every store has loaded.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.inner.auth.is_ready() && self.inner.cart.is_ready() && self.inner.wishlist.is_ready()
    }

    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.inner.cart
    }

    #[must_use]
    pub fn wishlist(&self) -> &WishlistStore {
        &self.inner.wishlist
    }

    #[must_use]
    pub fn auth(&self) -> &AuthStore {
        &self.inner.auth
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Credential attached to outbound requests.
    #[must_use]
    pub fn credential(&self) -> &BearerCredential {
        &self.inner.credential
    }
}

impl std::fmt::Debug for SessionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionProvider")
            .field("config", &self.inner.config)
            .field("cart", &self.inner.cart)
            .field("wishlist", &self.inner.wishlist)
            .field("auth", &self.inner.auth)
            .finish()
    }
}
