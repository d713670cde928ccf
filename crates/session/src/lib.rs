//! Swan Botanical session engine.
//!
//! Client-side state for the storefront: the cart, the wishlist and the
//! logged-in session. Each store keeps reactive in-memory state, mirrors it
//! into a key/value persistence adapter and exposes a mutation API with
//! identity and merge rules.
//!
//! # Modules
//!
//! - [`storage`] - Persistence adapters (`MemoryStore`, `FileStore`)
//! - [`stores`] - `CartStore`, `WishlistStore`, `AuthStore`
//! - [`api`] - Request layer and the HTTP auth, product and wishlist collaborators
//! - [`provider`] - `SessionProvider`, which wires everything together
//! - [`config`] - Environment-driven configuration

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod error;
pub mod provider;
pub mod storage;
pub mod stores;

pub use config::{ConfigError, SessionConfig};
pub use error::SessionError;
pub use provider::{Collaborators, SessionProvider};
pub use stores::{
    AuthState, AuthStore, CartState, CartStore, LoginOutcome, Session, ToggleOutcome,
    WishlistError, WishlistState, WishlistStore,
};
