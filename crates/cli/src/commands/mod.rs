//! CLI subcommands.

#![allow(clippy::print_stdout)]

pub mod auth;
pub mod cart;
pub mod wishlist;
