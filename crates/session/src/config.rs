//! Session engine configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `SWAN_API_BASE_URL` - Storefront API root (default: <https://swan-botanical.onrender.com/api>)
//! - `SWAN_API_TIMEOUT_SECS` - Per-request timeout in seconds (default: 10)
//! - `SWAN_WISHLIST_SYNC` - `local` or `server` (default: local)
//! - `SWAN_VALIDATE_PRODUCTS` - Check products exist before a local wishlist add (default: false)
//! - `SWAN_STATE_DIR` - Directory for persisted state (default: in-memory only)

use std::path::PathBuf;
use std::time::Duration;

use swan_botanical_core::WishlistSync;
use thiserror::Error;
use url::Url;

/// Default storefront API root.
pub const DEFAULT_API_BASE_URL: &str = "https://swan-botanical.onrender.com/api";

const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Session engine configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Root of the storefront REST API
    pub api_base_url: Url,
    /// Timeout applied to every API request
    pub request_timeout: Duration,
    /// Which side is authoritative for wishlist membership
    pub wishlist_sync: WishlistSync,
    /// Whether local wishlist adds are checked against the catalog
    pub validate_products: bool,
    /// Where persisted state lives; `None` keeps it in memory
    pub state_dir: Option<PathBuf>,
}

impl SessionConfig {
    /// Configuration with defaults for everything but the API root.
    #[must_use]
    pub const fn new(api_base_url: Url) -> Self {
        Self {
            api_base_url,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            wishlist_sync: WishlistSync::Local,
            validate_products: false,
            state_dir: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an unparseable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let invalid = |key: &str, e: &dyn std::fmt::Display| {
            ConfigError::InvalidEnvVar(key.to_string(), e.to_string())
        };

        let api_base_url = get("SWAN_API_BASE_URL")
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE_URL)
            .parse::<Url>()
            .map_err(|e| invalid("SWAN_API_BASE_URL", &e))?;
        if !matches!(api_base_url.scheme(), "http" | "https") {
            return Err(invalid("SWAN_API_BASE_URL", &"must be an http(s) URL"));
        }

        let timeout_secs = match get("SWAN_API_TIMEOUT_SECS") {
            Some(v) => v
                .trim()
                .parse::<u64>()
                .map_err(|e| invalid("SWAN_API_TIMEOUT_SECS", &e))?,
            None => DEFAULT_TIMEOUT_SECS,
        };
        if timeout_secs == 0 {
            return Err(invalid("SWAN_API_TIMEOUT_SECS", &"must be greater than zero"));
        }

        let wishlist_sync = match get("SWAN_WISHLIST_SYNC") {
            Some(v) => v
                .parse::<WishlistSync>()
                .map_err(|e| invalid("SWAN_WISHLIST_SYNC", &e))?,
            None => WishlistSync::default(),
        };

        let validate_products = match get("SWAN_VALIDATE_PRODUCTS") {
            Some(v) => parse_bool(&v).ok_or_else(|| {
                invalid("SWAN_VALIDATE_PRODUCTS", &format!("expected a boolean, got {v:?}"))
            })?,
            None => false,
        };

        Ok(Self {
            api_base_url,
            request_timeout: Duration::from_secs(timeout_secs),
            wishlist_sync,
            validate_products,
            state_dir: get("SWAN_STATE_DIR").map(PathBuf::from),
        })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
