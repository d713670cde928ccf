//! Authenticated user identity.

use serde::{Deserialize, Serialize};

use super::{Email, UserId};

/// Who is logged in.
///
/// The auth API does not always include the user id in login responses, so
/// it is optional; a valid email is what makes an identity structurally
/// valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<UserId>,
    pub email: Email,
    #[serde(default)]
    pub name: String,
}

impl Identity {
    /// Create an identity.
    #[must_use]
    pub fn new(id: Option<UserId>, email: Email, name: impl Into<String>) -> Self {
        Self {
            id,
            email,
            name: name.into(),
        }
    }

    /// Name to greet the user with, falling back to the email's local part.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            self.email
                .as_str()
                .split_once('@')
                .map_or(self.email.as_str(), |(local, _)| local)
        } else {
            &self.name
        }
    }
}
