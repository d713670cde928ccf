//! Cart store.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, warn};

use swan_botanical_core::{CartItem, CartLine, LineKey, Price, normalize_variant};

use super::decode::decode_cart;
use crate::storage::{SharedStore, keys};

/// Snapshot of the cart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartState {
    lines: Vec<CartLine>,
    ready: bool,
}

impl CartState {
    /// Lines in display (insertion) order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Whether persisted state has been loaded.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.ready
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }

    /// Sum of `unit_price * quantity` over all lines.
    #[must_use]
    pub fn total(&self) -> Price {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Quantity held for a product and variant, zero if absent.
    #[must_use]
    pub fn quantity_of(&self, product_id: &str, variant: Option<&str>) -> u32 {
        let key = LineKey::new(product_id, variant);
        self.lines
            .iter()
            .find(|line| line.matches(key))
            .map_or(0, |line| line.quantity)
    }
}

/// Ordered purchase lines mirrored under the `cart` key.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartInner>,
}

struct CartInner {
    storage: SharedStore,
    state: watch::Sender<CartState>,
}

impl CartStore {
    #[must_use]
    pub fn new(storage: SharedStore) -> Self {
        let (state, _) = watch::channel(CartState::default());
        Self {
            inner: Arc::new(CartInner { storage, state }),
        }
    }

    /// Load the persisted cart. Later calls are no-ops.
    ///
    /// A blob that does not decode is discarded and the cart starts empty.
    pub fn initialize(&self) {
        if self.is_ready() {
            return;
        }

        let lines = match self.inner.storage.read(keys::CART) {
            None => Vec::new(),
            Some(raw) => decode_cart(&raw).unwrap_or_else(|e| {
                warn!(error = %e, "Discarding unreadable persisted cart");
                self.inner.storage.remove(keys::CART);
                Vec::new()
            }),
        };

        self.inner.state.send_if_modified(|state| {
            if state.ready {
                return false;
            }
            debug!(lines = lines.len(), "Cart loaded");
            state.lines = lines;
            state.ready = true;
            true
        });
    }

    /// Add an item, merging into an existing line with the same identity.
    ///
    /// A missing quantity means one; anything below one is raised to one.
    pub fn add(&self, item: CartItem) {
        if item.product_id.is_blank() {
            warn!("Ignoring cart add with a blank product id");
            return;
        }
        let quantity = clamp_quantity(item.quantity.unwrap_or(1).max(1));

        self.mutate(|lines| {
            if let Some(line) = lines.iter_mut().find(|line| line.matches(item.key())) {
                line.quantity = line.quantity.saturating_add(quantity);
                debug!(product_id = %line.product_id, quantity = line.quantity, "Cart line merged");
                return true;
            }

            let variant = normalize_variant(item.variant.as_deref()).map(str::to_owned);
            debug!(product_id = %item.product_id, ?variant, quantity, "Cart line added");
            lines.push(CartLine {
                product_id: item.product_id,
                variant,
                name: item.name,
                unit_price: item.unit_price,
                image_ref: item.image_ref,
                quantity,
            });
            true
        });
    }

    /// Remove a line. Absent lines are ignored.
    pub fn remove(&self, product_id: &str, variant: Option<&str>) {
        let key = LineKey::new(product_id, variant);
        self.mutate(|lines| {
            let before = lines.len();
            lines.retain(|line| !line.matches(key));
            lines.len() != before
        });
    }

    /// Replace a line's quantity in place; below one removes the line.
    pub fn set_quantity(&self, product_id: &str, variant: Option<&str>, quantity: i64) {
        if quantity < 1 {
            self.remove(product_id, variant);
            return;
        }

        let key = LineKey::new(product_id, variant);
        let quantity = clamp_quantity(quantity);
        self.mutate(|lines| match lines.iter_mut().find(|line| line.matches(key)) {
            Some(line) if line.quantity != quantity => {
                line.quantity = quantity;
                true
            }
            _ => false,
        });
    }

    /// Empty the cart. Also used once checkout completes.
    pub fn clear(&self) {
        self.mutate(|lines| {
            lines.clear();
            true
        });
    }

    /// Current snapshot.
    #[must_use]
    pub fn state(&self) -> CartState {
        self.inner.state.borrow().clone()
    }

    /// Receive a snapshot after every change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartState> {
        self.inner.state.subscribe()
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.inner.state.borrow().ready
    }

    #[must_use]
    pub fn count(&self) -> u64 {
        self.inner.state.borrow().count()
    }

    #[must_use]
    pub fn total(&self) -> Price {
        self.inner.state.borrow().total()
    }

    #[must_use]
    pub fn quantity_of(&self, product_id: &str, variant: Option<&str>) -> u32 {
        self.inner.state.borrow().quantity_of(product_id, variant)
    }

    /// Apply `op` and, if it changed anything, persist before subscribers
    /// are woken.
    fn mutate(&self, op: impl FnOnce(&mut Vec<CartLine>) -> bool) {
        self.initialize();
        let storage = &self.inner.storage;
        self.inner.state.send_if_modified(|state| {
            let changed = op(&mut state.lines);
            if changed {
                match serde_json::to_string(&state.lines) {
                    Ok(json) => storage.write(keys::CART, &json),
                    Err(e) => warn!(error = %e, "Failed to serialize cart"),
                }
            }
            changed
        });
    }
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("state", &*self.inner.state.borrow())
            .finish_non_exhaustive()
    }
}

fn clamp_quantity(quantity: i64) -> u32 {
    u32::try_from(quantity).unwrap_or(u32::MAX)
}
