//! Core types for Swan Botanical.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod email;
pub mod id;
pub mod identity;
pub mod price;
pub mod product;
pub mod status;
pub mod wishlist;

pub use cart::{CartItem, CartLine, LineKey, normalize_variant};
pub use email::{Email, EmailError};
pub use id::*;
pub use identity::Identity;
pub use price::{Price, PriceError};
pub use product::{Product, ProductSize};
pub use status::*;
pub use wishlist::WishlistEntry;
