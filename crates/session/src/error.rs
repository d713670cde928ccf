//! Errors raised while assembling the engine.
//!
//! Store operations never fail past their boundary; they report typed
//! outcomes instead. Only start-up can fail.

use thiserror::Error;

use crate::api::ApiError;
use crate::config::ConfigError;
use crate::storage::StorageError;

/// Errors that can occur while opening a [`SessionProvider`](crate::SessionProvider).
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("API client error: {0}")]
    Api(#[from] ApiError),
}
