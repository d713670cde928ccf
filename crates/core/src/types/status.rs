//! Status enums shared by the stores and their consumers.

use serde::{Deserialize, Serialize};

/// Where the session currently stands.
///
/// `Authenticating` is transient: it only exists while a login or register
/// call is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthStatus {
    #[default]
    Unauthenticated,
    Authenticating,
    Authenticated,
}

impl AuthStatus {
    /// Whether a login/register call is pending.
    #[must_use]
    pub const fn is_in_flight(self) -> bool {
        matches!(self, Self::Authenticating)
    }
}

impl std::fmt::Display for AuthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unauthenticated => write!(f, "unauthenticated"),
            Self::Authenticating => write!(f, "authenticating"),
            Self::Authenticated => write!(f, "authenticated"),
        }
    }
}

/// Which side is authoritative for wishlist membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WishlistSync {
    /// The local toggle result is final; nothing is sent to the API.
    #[default]
    Local,
    /// Toggles are requested from the API and the local collection is
    /// reconciled to the server's answer.
    Server,
}

impl std::fmt::Display for WishlistSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Server => write!(f, "server"),
        }
    }
}

impl std::str::FromStr for WishlistSync {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "server" => Ok(Self::Server),
            _ => Err(format!("invalid wishlist sync mode: {s}")),
        }
    }
}
