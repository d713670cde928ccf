//! Swan Botanical Core - Shared domain types.
//!
//! This crate provides the types shared by the session engine and its
//! consumers:
//! - `session` - Cart, wishlist and auth stores with persistence
//! - `cli` - Command-line driver for the engine
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no storage,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, prices and emails, plus the
//!   cart line, wishlist entry, identity and product records

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
