//! Persistence adapter.
//!
//! A synchronous, process-local key/value store holding opaque strings. The
//! stores serialize their own state; the adapter never interprets values.
//! Each store owns its keys (see [`keys`]) and writes them independently, so
//! there are no cross-key transactions.
//!
//! Writes cannot fail from the caller's point of view: adapters log and
//! absorb I/O errors, and the next successful write overwrites whatever was
//! left behind.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use std::sync::Arc;

use thiserror::Error;

/// Errors raised inside storage adapters.
///
/// These never cross the [`KeyValueStore`] boundary; adapters log them.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("I/O error on key {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// Key contains characters that cannot be used as a file name.
    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),
}

/// Key/value persistence contract used by every store.
pub trait KeyValueStore: Send + Sync {
    /// Read the value under `key`, if any.
    fn read(&self, key: &str) -> Option<String>;

    /// Replace the value under `key`.
    fn write(&self, key: &str, value: &str);

    /// Delete `key`. Deleting a missing key is not an error.
    fn remove(&self, key: &str);
}

/// Persistence adapter shared by reference between the stores.
pub type SharedStore = Arc<dyn KeyValueStore>;

/// Storage keys, one namespace per store.
///
/// These names are what the first storefront release wrote to browser
/// storage; changing them orphans existing carts and sessions.
pub mod keys {
    /// Cart lines (JSON array).
    pub const CART: &str = "cart";

    /// Wishlist entries (JSON array).
    pub const WISHLIST: &str = "wishlist";

    /// Bearer token (raw string).
    pub const TOKEN: &str = "token";

    /// Logged-in identity (JSON object).
    pub const USER: &str = "user";
}
