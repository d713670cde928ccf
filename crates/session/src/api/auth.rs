//! Auth API collaborator.

use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use swan_botanical_core::{Email, Identity};

use super::{ApiClient, ApiError};

/// A successful login or registration.
#[derive(Debug, Clone)]
pub struct AuthGrant {
    pub token: SecretString,
    pub identity: Identity,
}

/// Credential exchange with the auth service.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchange email and password for a session.
    async fn login(&self, email: &Email, password: &str) -> Result<AuthGrant, ApiError>;

    /// Create an account and return its session.
    async fn register(
        &self,
        email: &Email,
        password: &str,
        name: &str,
    ) -> Result<AuthGrant, ApiError>;
}

#[derive(Serialize)]
struct CredentialsBody<'a> {
    email: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Deserialize)]
struct AuthResponse {
    token: String,
    user: Identity,
}

impl TryFrom<AuthResponse> for AuthGrant {
    type Error = ApiError;

    fn try_from(response: AuthResponse) -> Result<Self, Self::Error> {
        if response.token.trim().is_empty() {
            return Err(ApiError::InvalidResponse(
                "auth response carried an empty token".to_string(),
            ));
        }
        Ok(Self {
            token: SecretString::from(response.token),
            identity: response.user,
        })
    }
}

/// [`AuthApi`] over `POST /auth/login` and `POST /auth/register`.
#[derive(Debug, Clone)]
pub struct HttpAuthApi {
    client: ApiClient,
}

impl HttpAuthApi {
    #[must_use]
    pub const fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AuthApi for HttpAuthApi {
    #[instrument(skip(self, password), fields(email = %email))]
    async fn login(&self, email: &Email, password: &str) -> Result<AuthGrant, ApiError> {
        let body = CredentialsBody {
            email: email.as_str(),
            password,
            name: None,
        };
        let response: AuthResponse = self.client.post("auth/login", &body).await?;
        response.try_into()
    }

    #[instrument(skip(self, password), fields(email = %email))]
    async fn register(
        &self,
        email: &Email,
        password: &str,
        name: &str,
    ) -> Result<AuthGrant, ApiError> {
        let name = name.trim();
        let body = CredentialsBody {
            email: email.as_str(),
            password,
            name: (!name.is_empty()).then_some(name),
        };
        let response: AuthResponse = self.client.post("auth/register", &body).await?;
        response.try_into()
    }
}
