//! Wishlist store.
//!
//! In [`WishlistSync::Local`] mode the local collection is authoritative. In
//! [`WishlistSync::Server`] mode every mutation goes to the API and the local
//! collection is overwritten with the server's answer; the persisted mirror
//! then only serves as a cache between runs.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, instrument, warn};

use swan_botanical_core::{ProductId, WishlistEntry, WishlistSync};

use super::decode::decode_wishlist;
use crate::api::{ApiError, ProductCatalog, WishlistApi};
use crate::storage::{SharedStore, keys};

/// Errors returned by wishlist mutations.
#[derive(Debug, Error)]
pub enum WishlistError {
    #[error("product id is blank")]
    InvalidProduct,

    #[error("product {0} does not exist")]
    ProductNotFound(ProductId),

    #[error("log in to sync your wishlist")]
    Unauthorized,

    #[error("wishlist sync failed: {0}")]
    Remote(ApiError),
}

impl From<ApiError> for WishlistError {
    fn from(error: ApiError) -> Self {
        if error.is_unauthorized() {
            Self::Unauthorized
        } else {
            Self::Remote(error)
        }
    }
}

/// Result of a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Added,
    Removed,
}

/// Snapshot of the wishlist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WishlistState {
    entries: Vec<WishlistEntry>,
    ready: bool,
    in_flight: usize,
}

impl WishlistState {
    #[must_use]
    pub fn entries(&self) -> &[WishlistEntry] {
        &self.entries
    }

    #[must_use]
    pub fn contains(&self, product_id: &str) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.product_id.as_str() == product_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.ready
    }

    /// Whether a server or catalog call is in flight.
    #[must_use]
    pub const fn is_syncing(&self) -> bool {
        self.in_flight > 0
    }
}

/// Liked products mirrored under the `wishlist` key.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct WishlistStore {
    inner: Arc<WishlistInner>,
}

struct WishlistInner {
    storage: SharedStore,
    /// Present only in server mode.
    remote: Option<Arc<dyn WishlistApi>>,
    /// Present only when local adds are validated.
    catalog: Option<Arc<dyn ProductCatalog>>,
    state: watch::Sender<WishlistState>,
}

impl WishlistStore {
    /// Create a wishlist.
    ///
    /// Server mode needs `remote`; without it the store falls back to local
    /// mode. A `catalog` turns on existence checks for local adds.
    #[must_use]
    pub fn new(
        storage: SharedStore,
        sync: WishlistSync,
        remote: Option<Arc<dyn WishlistApi>>,
        catalog: Option<Arc<dyn ProductCatalog>>,
    ) -> Self {
        let remote = match (sync, remote) {
            (WishlistSync::Server, Some(remote)) => Some(remote),
            (WishlistSync::Server, None) => {
                warn!("Server wishlist sync requested without an API, using local mode");
                None
            }
            (WishlistSync::Local, _) => None,
        };
        let (state, _) = watch::channel(WishlistState::default());

        Self {
            inner: Arc::new(WishlistInner {
                storage,
                remote,
                catalog,
                state,
            }),
        }
    }

    /// The mode actually in effect.
    #[must_use]
    pub fn sync(&self) -> WishlistSync {
        if self.inner.remote.is_some() {
            WishlistSync::Server
        } else {
            WishlistSync::Local
        }
    }

    /// Load the persisted wishlist. Later calls are no-ops.
    pub fn initialize(&self) {
        if self.inner.state.borrow().ready {
            return;
        }

        let entries = match self.inner.storage.read(keys::WISHLIST) {
            None => Vec::new(),
            Some(raw) => decode_wishlist(&raw).unwrap_or_else(|e| {
                warn!(error = %e, "Discarding unreadable persisted wishlist");
                self.inner.storage.remove(keys::WISHLIST);
                Vec::new()
            }),
        };

        self.inner.state.send_if_modified(|state| {
            if state.ready {
                return false;
            }
            debug!(entries = entries.len(), "Wishlist loaded");
            state.entries = entries;
            state.ready = true;
            true
        });
    }

    /// Add the product if absent, remove it if present.
    ///
    /// # Errors
    ///
    /// Returns `WishlistError` if the id is blank, the product does not
    /// exist, or the server call fails. State is unchanged on error.
    #[instrument(skip(self, entry), fields(product_id = %entry.product_id))]
    pub async fn toggle(&self, entry: WishlistEntry) -> Result<ToggleOutcome, WishlistError> {
        self.initialize();
        if entry.product_id.is_blank() {
            return Err(WishlistError::InvalidProduct);
        }

        if let Some(remote) = &self.inner.remote {
            let entries = {
                let _sync = self.begin_sync();
                remote
                    .toggle(&entry.product_id)
                    .await
                    .map_err(|e| match e {
                        ApiError::NotFound(_) => {
                            WishlistError::ProductNotFound(entry.product_id.clone())
                        }
                        other => other.into(),
                    })?
            };
            self.reconcile(entries);
            let outcome = if self.contains(entry.product_id.as_str()) {
                ToggleOutcome::Added
            } else {
                ToggleOutcome::Removed
            };
            return Ok(outcome);
        }

        if self.contains(entry.product_id.as_str()) {
            self.remove_local(&entry.product_id);
            return Ok(ToggleOutcome::Removed);
        }

        if let Some(catalog) = &self.inner.catalog {
            let exists = {
                let _sync = self.begin_sync();
                catalog.exists_by_id(&entry.product_id).await?
            };
            if !exists {
                return Err(WishlistError::ProductNotFound(entry.product_id));
            }
        }

        let entry = WishlistEntry {
            added_at: entry.added_at.or_else(|| Some(Utc::now())),
            ..entry
        };
        self.mutate(|entries| {
            if entries.iter().any(|e| e.product_id == entry.product_id) {
                return false;
            }
            debug!(product_id = %entry.product_id, "Wishlist entry added");
            entries.push(entry);
            true
        });
        Ok(ToggleOutcome::Added)
    }

    /// Remove a product. Absent products are ignored.
    ///
    /// # Errors
    ///
    /// Returns `WishlistError` if the server call fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove(&self, product_id: &ProductId) -> Result<(), WishlistError> {
        self.initialize();

        if let Some(remote) = &self.inner.remote {
            let entries = {
                let _sync = self.begin_sync();
                remote.remove(product_id).await?
            };
            self.reconcile(entries);
        } else {
            self.remove_local(product_id);
        }
        Ok(())
    }

    /// Pull the server's wishlist. Does nothing in local mode.
    ///
    /// # Errors
    ///
    /// Returns `WishlistError` if the server call fails.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<(), WishlistError> {
        self.initialize();

        if let Some(remote) = &self.inner.remote {
            let entries = {
                let _sync = self.begin_sync();
                remote.fetch().await?
            };
            self.reconcile(entries);
        }
        Ok(())
    }

    #[must_use]
    pub fn contains(&self, product_id: &str) -> bool {
        self.inner.state.borrow().contains(product_id)
    }

    /// Current snapshot.
    #[must_use]
    pub fn state(&self) -> WishlistState {
        self.inner.state.borrow().clone()
    }

    /// Receive a snapshot after every change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<WishlistState> {
        self.inner.state.subscribe()
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.inner.state.borrow().ready
    }

    /// Drop the local copy of the server's wishlist. Does nothing in local
    /// mode, where the local collection belongs to the device.
    pub fn forget_server_copy(&self) {
        if self.inner.remote.is_none() {
            return;
        }
        let storage = &self.inner.storage;
        self.inner.state.send_if_modified(|state| {
            storage.remove(keys::WISHLIST);
            if state.entries.is_empty() {
                return false;
            }
            debug!(entries = state.entries.len(), "Server wishlist copy discarded");
            state.entries.clear();
            true
        });
    }

    fn remove_local(&self, product_id: &ProductId) {
        self.mutate(|entries| {
            let before = entries.len();
            entries.retain(|e| &e.product_id != product_id);
            entries.len() != before
        });
    }

    /// Overwrite local entries with the server's, keeping local `added_at`
    /// stamps for products that were already present.
    fn reconcile(&self, mut incoming: Vec<WishlistEntry>) {
        self.mutate(|entries| {
            for entry in &mut incoming {
                if entry.added_at.is_none() {
                    entry.added_at = entries
                        .iter()
                        .find(|e| e.product_id == entry.product_id)
                        .and_then(|e| e.added_at);
                }
            }
            if *entries == incoming {
                return false;
            }
            debug!(entries = incoming.len(), "Wishlist reconciled with server");
            *entries = incoming;
            true
        });
    }

    fn mutate(&self, op: impl FnOnce(&mut Vec<WishlistEntry>) -> bool) {
        let storage = &self.inner.storage;
        self.inner.state.send_if_modified(|state| {
            let changed = op(&mut state.entries);
            if changed {
                match serde_json::to_string(&state.entries) {
                    Ok(json) => storage.write(keys::WISHLIST, &json),
                    Err(e) => warn!(error = %e, "Failed to serialize wishlist"),
                }
            }
            changed
        });
    }

    fn begin_sync(&self) -> SyncGuard<'_> {
        self.inner.state.send_modify(|state| state.in_flight += 1);
        SyncGuard {
            state: &self.inner.state,
        }
    }
}

impl std::fmt::Debug for WishlistStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WishlistStore")
            .field("sync", &self.sync())
            .field("validates_products", &self.inner.catalog.is_some())
            .field("state", &*self.inner.state.borrow())
            .finish_non_exhaustive()
    }
}

/// Marks a collaborator call in flight; dropping it (including when the
/// caller's future is cancelled) clears the mark.
struct SyncGuard<'a> {
    state: &'a watch::Sender<WishlistState>,
}

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.state
            .send_modify(|state| state.in_flight = state.in_flight.saturating_sub(1));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use swan_botanical_core::{Price, Product};
    use tokio::sync::Notify;

    use super::*;
    use crate::storage::{KeyValueStore, MemoryStore};

    /// Server that keeps its own list and answers like the real API.
    #[derive(Default)]
    struct FakeServer {
        entries: Mutex<Vec<WishlistEntry>>,
        fail_with: Mutex<Option<fn() -> ApiError>>,
        gate: Option<Arc<Notify>>,
    }

    impl FakeServer {
        async fn answer(
            &self,
            change: impl FnOnce(&mut Vec<WishlistEntry>),
        ) -> Result<Vec<WishlistEntry>, ApiError> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if let Some(fail) = *self.fail_with.lock().unwrap() {
                return Err(fail());
            }
            let mut entries = self.entries.lock().unwrap();
            change(&mut entries);
            Ok(entries.clone())
        }
    }

    #[async_trait]
    impl WishlistApi for FakeServer {
        async fn fetch(&self) -> Result<Vec<WishlistEntry>, ApiError> {
            self.answer(|_| {}).await
        }

        async fn toggle(&self, product_id: &ProductId) -> Result<Vec<WishlistEntry>, ApiError> {
            let id = product_id.clone();
            self.answer(move |entries| {
                if entries.iter().any(|e| e.product_id == id) {
                    entries.retain(|e| e.product_id != id);
                } else {
                    entries.push(WishlistEntry::new(id, "From server"));
                }
            })
            .await
        }

        async fn remove(&self, product_id: &ProductId) -> Result<Vec<WishlistEntry>, ApiError> {
            let id = product_id.clone();
            self.answer(move |entries| entries.retain(|e| e.product_id != id))
                .await
        }
    }

    struct FakeCatalog {
        known: HashSet<&'static str>,
    }

    #[async_trait]
    impl ProductCatalog for FakeCatalog {
        async fn get_by_id(&self, id: &ProductId) -> Result<Product, ApiError> {
            if !self.known.contains(id.as_str()) {
                return Err(ApiError::NotFound(id.to_string()));
            }
            Ok(serde_json::from_value(serde_json::json!({
                "_id": id.as_str(),
                "name": "Known",
                "price": 100
            }))
            .unwrap())
        }
    }

    fn toner() -> WishlistEntry {
        WishlistEntry::new("p9", "Rose Toner").price(Price::from_units(650))
    }

    fn local_store() -> (WishlistStore, Arc<MemoryStore>) {
        let storage = Arc::new(MemoryStore::new());
        let store = WishlistStore::new(storage.clone(), WishlistSync::Local, None, None);
        store.initialize();
        (store, storage)
    }

    fn server_store(server: Arc<FakeServer>) -> (WishlistStore, Arc<MemoryStore>) {
        let storage = Arc::new(MemoryStore::new());
        let store = WishlistStore::new(storage.clone(), WishlistSync::Server, Some(server), None);
        store.initialize();
        (store, storage)
    }

    fn persisted_ids(storage: &MemoryStore) -> Vec<String> {
        decode_wishlist(&storage.read(keys::WISHLIST).unwrap())
            .unwrap()
            .into_iter()
            .map(|e| e.product_id.into_inner())
            .collect()
    }

    #[tokio::test]
    async fn test_double_toggle_restores_membership() {
        let (store, storage) = local_store();
        store.toggle(WishlistEntry::new("p1", "Cleanser")).await.unwrap();
        let before = store.state().entries().to_vec();

        assert_eq!(store.toggle(toner()).await.unwrap(), ToggleOutcome::Added);
        assert!(store.contains("p9"));
        assert!(store.state().entries()[1].added_at.is_some());

        assert_eq!(store.toggle(toner()).await.unwrap(), ToggleOutcome::Removed);
        assert_eq!(store.state().entries(), before.as_slice());
        assert_eq!(persisted_ids(&storage), ["p1"]);
    }

    #[tokio::test]
    async fn test_remove_absent_is_noop() {
        let (store, storage) = local_store();
        store.remove(&ProductId::new("p1")).await.unwrap();
        assert!(store.state().is_empty());
        assert!(!storage.contains(keys::WISHLIST));
    }

    #[tokio::test]
    async fn test_blank_id_is_refused() {
        let (store, _) = local_store();
        let err = store.toggle(WishlistEntry::new(" ", "Nothing")).await.unwrap_err();
        assert!(matches!(err, WishlistError::InvalidProduct));
    }

    #[test]
    fn test_corrupt_wishlist_loads_empty_and_is_deleted() {
        let storage = Arc::new(MemoryStore::with_entries([(keys::WISHLIST, "{\"oops\"")]));
        let store = WishlistStore::new(storage.clone(), WishlistSync::Local, None, None);
        store.initialize();
        assert!(store.is_ready());
        assert!(store.state().is_empty());
        assert!(!storage.contains(keys::WISHLIST));
    }

    #[test]
    fn test_loads_legacy_records() {
        let storage = Arc::new(MemoryStore::with_entries([(
            keys::WISHLIST,
            r#"[{"_id":"p1","id":"p1","name":"Cleanser","price":899,"image":"/c.jpg"}]"#,
        )]));
        let store = WishlistStore::new(storage, WishlistSync::Local, None, None);
        store.initialize();
        assert!(store.contains("p1"));
    }

    #[tokio::test]
    async fn test_server_answer_is_authoritative() {
        let server = Arc::new(FakeServer::default());
        server
            .entries
            .lock()
            .unwrap()
            .push(WishlistEntry::new("p5", "Added elsewhere"));
        let (store, storage) = server_store(server);

        assert_eq!(store.toggle(toner()).await.unwrap(), ToggleOutcome::Added);
        let ids: Vec<_> = store
            .state()
            .entries()
            .iter()
            .map(|e| e.product_id.as_str().to_owned())
            .collect();
        assert_eq!(ids, ["p5", "p9"]);
        assert_eq!(persisted_ids(&storage), ["p5", "p9"]);

        assert_eq!(store.toggle(toner()).await.unwrap(), ToggleOutcome::Removed);
        store.remove(&ProductId::new("p5")).await.unwrap();
        assert!(store.state().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_pulls_server_list() {
        let server = Arc::new(FakeServer::default());
        server
            .entries
            .lock()
            .unwrap()
            .push(WishlistEntry::new("p3", "Serum"));
        let (store, _) = server_store(server);

        store.refresh().await.unwrap();
        assert!(store.contains("p3"));
    }

    #[tokio::test]
    async fn test_server_failures_leave_state_unchanged() {
        let server = Arc::new(FakeServer::default());
        let (store, _) = server_store(server.clone());
        store.toggle(toner()).await.unwrap();

        *server.fail_with.lock().unwrap() = Some(|| ApiError::Unauthorized(None));
        let err = store.toggle(toner()).await.unwrap_err();
        assert!(matches!(err, WishlistError::Unauthorized));

        *server.fail_with.lock().unwrap() = Some(|| ApiError::Rejected {
            status: 500,
            message: None,
        });
        let err = store.remove(&ProductId::new("p9")).await.unwrap_err();
        assert!(matches!(err, WishlistError::Remote(_)));

        assert!(store.contains("p9"));
        assert!(!store.state().is_syncing());
    }

    #[tokio::test]
    async fn test_server_missing_product_is_not_found() {
        let server = Arc::new(FakeServer::default());
        let (store, storage) = server_store(server.clone());
        *server.fail_with.lock().unwrap() =
            Some(|| ApiError::NotFound("Product not found".to_string()));

        let err = store
            .toggle(WishlistEntry::new("ghost", "Ghost"))
            .await
            .unwrap_err();
        assert!(matches!(err, WishlistError::ProductNotFound(ref id) if id.as_str() == "ghost"));
        assert!(store.state().is_empty());
        assert!(!storage.contains(keys::WISHLIST));
    }

    #[tokio::test]
    async fn test_forget_server_copy() {
        let server = Arc::new(FakeServer::default());
        let (store, storage) = server_store(server);
        store.toggle(toner()).await.unwrap();
        assert!(storage.contains(keys::WISHLIST));

        store.forget_server_copy();
        assert!(store.state().is_empty());
        assert!(!storage.contains(keys::WISHLIST));

        let (local, storage) = local_store();
        local.toggle(toner()).await.unwrap();
        local.forget_server_copy();
        assert!(local.contains("p9"));
        assert_eq!(persisted_ids(&storage), ["p9"]);
    }

    #[tokio::test]
    async fn test_syncing_flag_while_in_flight() {
        let gate = Arc::new(Notify::new());
        let server = Arc::new(FakeServer {
            gate: Some(gate.clone()),
            ..FakeServer::default()
        });
        let (store, _) = server_store(server);
        let mut rx = store.subscribe();

        let task = tokio::spawn({
            let store = store.clone();
            async move { store.toggle(toner()).await }
        });

        rx.wait_for(WishlistState::is_syncing).await.unwrap();
        gate.notify_one();
        assert_eq!(task.await.unwrap().unwrap(), ToggleOutcome::Added);
        assert!(!store.state().is_syncing());
    }

    #[tokio::test]
    async fn test_server_mode_without_api_falls_back_to_local() {
        let store = WishlistStore::new(
            Arc::new(MemoryStore::new()),
            WishlistSync::Server,
            None,
            None,
        );
        assert_eq!(store.sync(), WishlistSync::Local);
        assert_eq!(store.toggle(toner()).await.unwrap(), ToggleOutcome::Added);
    }

    #[tokio::test]
    async fn test_catalog_refuses_unknown_products() {
        let catalog = Arc::new(FakeCatalog {
            known: HashSet::from(["p9"]),
        });
        let storage = Arc::new(MemoryStore::new());
        let store = WishlistStore::new(storage.clone(), WishlistSync::Local, None, Some(catalog));

        assert_eq!(store.toggle(toner()).await.unwrap(), ToggleOutcome::Added);

        let err = store
            .toggle(WishlistEntry::new("ghost", "Ghost"))
            .await
            .unwrap_err();
        assert!(matches!(err, WishlistError::ProductNotFound(ref id) if id.as_str() == "ghost"));
        assert_eq!(persisted_ids(&storage), ["p9"]);

        // Removing never needs the catalog
        assert_eq!(store.toggle(toner()).await.unwrap(), ToggleOutcome::Removed);
    }
}
