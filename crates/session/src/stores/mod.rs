//! The three reactive stores.
//!
//! Each store is a cheap-clone handle around a `tokio::sync::watch` channel.
//! Mutations update the state, write the persisted mirror and only then
//! notify subscribers, so a subscriber never observes state that is not yet
//! durable.

mod auth;
mod cart;
pub mod decode;
mod wishlist;

pub use auth::{AuthState, AuthStore, LoginOutcome, Session};
pub use cart::{CartState, CartStore};
pub use wishlist::{ToggleOutcome, WishlistError, WishlistState, WishlistStore};
