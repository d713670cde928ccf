//! Outbound request layer and the HTTP collaborators built on it.
//!
//! # Architecture
//!
//! - [`ApiClient`] wraps `reqwest` with the storefront API base URL and the
//!   shared [`BearerCredential`]; every request carries the current token.
//! - A 401 response reports the token it was sent with back to the
//!   credential, which forces a logout if that token is still current.
//! - [`AuthApi`], [`ProductCatalog`] and [`WishlistApi`] are the collaborator
//!   contracts the stores depend on; the `Http*` types implement them against
//!   the storefront API and tests substitute fakes.

mod auth;
mod credential;
mod products;
mod wishlist;

pub use auth::{AuthApi, AuthGrant, HttpAuthApi};
pub use credential::BearerCredential;
pub use products::{HttpProductCatalog, ProductCatalog};
pub use wishlist::{HttpWishlistApi, WishlistApi};

use std::sync::Arc;

use reqwest::{Method, StatusCode};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::config::SessionConfig;
use crate::stores::decode::DecodeError;

/// Errors that can occur when talking to the storefront API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed (connection, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Endpoint URL could not be built.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// The API rejected the credential (401).
    #[error("Unauthorized{}", format_message(.0.as_deref()))]
    Unauthorized(Option<String>),

    /// Resource not found (404).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Any other non-success status.
    #[error("API error: {status}{}", format_message(.message.as_deref()))]
    Rejected {
        status: u16,
        message: Option<String>,
    },

    /// Response body was not the expected JSON.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Response decoded but does not satisfy the contract.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Wishlist payload had the wrong shape.
    #[error("invalid wishlist payload: {0}")]
    Decode(#[from] DecodeError),
}

fn format_message(message: Option<&str>) -> String {
    message.map_or_else(String::new, |m| format!(" - {m}"))
}

impl ApiError {
    /// Human-readable message supplied by the server, if any.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Unauthorized(message) | Self::Rejected { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// Whether the API rejected the credential.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }
}

/// Pull `message` (or `error`) out of an error body.
fn extract_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["message", "error"]
        .iter()
        .find_map(|field| value.get(field).and_then(serde_json::Value::as_str))
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_owned)
}

/// Client for the storefront REST API.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    credential: BearerCredential,
}

impl ApiClient {
    /// Create a client for `config.api_base_url`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the HTTP client fails to build.
    pub fn new(config: &SessionConfig, credential: BearerCredential) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        // Url::join drops the last segment unless the base ends with '/'
        let mut base_url = config.api_base_url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url,
                credential,
            }),
        })
    }

    /// The credential attached to requests.
    #[must_use]
    pub fn credential(&self) -> &BearerCredential {
        &self.inner.credential
    }

    /// Resolve an API path against the base URL.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Url` if the path cannot be joined.
    pub fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.inner.base_url.join(path.trim_start_matches('/'))?)
    }

    /// `GET` a JSON resource.
    ///
    /// # Errors
    ///
    /// See [`ApiError`].
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.execute::<(), T>(Method::GET, path, None).await
    }

    /// `POST` a JSON body and decode the JSON response.
    ///
    /// # Errors
    ///
    /// See [`ApiError`].
    pub async fn post<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.execute(Method::POST, path, Some(body)).await
    }

    /// `DELETE` a resource and decode the JSON response.
    ///
    /// # Errors
    ///
    /// See [`ApiError`].
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.execute::<(), T>(Method::DELETE, path, None).await
    }

    async fn execute<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ApiError> {
        let url = self.endpoint(path)?;
        let token = self.inner.credential.current();

        let mut request = self.inner.client.request(method.clone(), url.clone());
        if let Some(token) = &token {
            request = request.bearer_auth(token.expose_secret());
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        // Read the body as text first for better error diagnostics
        let text = response.text().await?;
        debug!(%method, %url, status = status.as_u16(), "API response");

        if status == StatusCode::UNAUTHORIZED {
            if let Some(token) = &token {
                if self.inner.credential.reject(token) {
                    warn!(%url, "API rejected the session token, forcing logout");
                }
            }
            return Err(ApiError::Unauthorized(extract_message(&text)));
        }

        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(
                extract_message(&text).unwrap_or_else(|| path.to_string()),
            ));
        }

        if !status.is_success() {
            warn!(
                %url,
                status = %status,
                body = %text.chars().take(500).collect::<String>(),
                "API returned non-success status"
            );
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                message: extract_message(&text),
            });
        }

        Ok(serde_json::from_str(&text)?)
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("credential", &self.inner.credential)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use secrecy::SecretString;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn test_client(base_url: &str) -> ApiClient {
        let config = SessionConfig::new(Url::parse(base_url).unwrap());
        ApiClient::new(&config, BearerCredential::new()).unwrap()
    }

    #[test]
    fn test_extract_message() {
        assert_eq!(
            extract_message(r#"{"message":"Email already in use"}"#).as_deref(),
            Some("Email already in use")
        );
        assert_eq!(
            extract_message(r#"{"error":"Invalid credentials"}"#).as_deref(),
            Some("Invalid credentials")
        );
        assert_eq!(extract_message(r#"{"message":"  "}"#), None);
        assert_eq!(extract_message("<html>"), None);
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let client = test_client("https://swan.example/api");
        assert_eq!(
            client.endpoint("/auth/login").unwrap().as_str(),
            "https://swan.example/api/auth/login"
        );
        assert_eq!(
            client.endpoint("wishlist/toggle").unwrap().as_str(),
            "https://swan.example/api/wishlist/toggle"
        );
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::Rejected {
            status: 400,
            message: Some("Email already in use".to_string()),
        };
        assert_eq!(err.to_string(), "API error: 400 - Email already in use");
        assert_eq!(ApiError::Unauthorized(None).to_string(), "Unauthorized");
        assert_eq!(err.server_message(), Some("Email already in use"));
    }

    #[tokio::test]
    async fn test_attaches_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/wishlist"))
            .and(header("authorization", "Bearer t1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&format!("{}/api", server.uri()));
        client.credential().set(SecretString::from("t1"));
        let body: serde_json::Value = client.get("wishlist").await.unwrap();
        assert_eq!(body, serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_unauthorized_notifies_credential() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/wishlist"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(serde_json::json!({"error": "Invalid token signature"})),
            )
            .mount(&server)
            .await;

        let client = test_client(&format!("{}/api", server.uri()));
        let rejections = Arc::new(AtomicUsize::new(0));
        let rejections_clone = Arc::clone(&rejections);
        client.credential().on_rejected(move || {
            rejections_clone.fetch_add(1, Ordering::SeqCst);
        });

        // Without a token there is nothing to reject
        let err = client.get::<serde_json::Value>("wishlist").await.unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(rejections.load(Ordering::SeqCst), 0);

        client.credential().set(SecretString::from("expired"));
        let err = client.get::<serde_json::Value>("wishlist").await.unwrap_err();
        assert_eq!(err.server_message(), Some("Invalid token signature"));
        assert_eq!(rejections.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_maps_not_found_and_rejections() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/products/missing"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(serde_json::json!({"message": "Product not found"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/register"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad"))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client
            .get::<serde_json::Value>("products/missing")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(ref m) if m == "Product not found"));

        let err = client
            .post::<_, serde_json::Value>("auth/register", &serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ApiError::Rejected {
                status: 400,
                message: None
            }
        ));
    }

    #[tokio::test]
    async fn test_parse_error_on_bad_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wishlist"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client.get::<serde_json::Value>("wishlist").await.unwrap_err();
        assert!(matches!(err, ApiError::Parse(_)));
    }
}
