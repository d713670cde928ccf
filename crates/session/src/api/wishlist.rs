//! Server-held wishlist collaborator.

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::instrument;

use swan_botanical_core::{ProductId, WishlistEntry};

use super::{ApiClient, ApiError};
use crate::stores::decode::decode_wishlist_payload;

/// The authenticated user's wishlist on the server.
///
/// Every operation answers with the authoritative collection after the
/// change.
#[async_trait]
pub trait WishlistApi: Send + Sync {
    async fn fetch(&self) -> Result<Vec<WishlistEntry>, ApiError>;

    async fn toggle(&self, product_id: &ProductId) -> Result<Vec<WishlistEntry>, ApiError>;

    async fn remove(&self, product_id: &ProductId) -> Result<Vec<WishlistEntry>, ApiError>;
}

/// [`WishlistApi`] over `GET /wishlist`, `POST /wishlist/toggle` and
/// `DELETE /wishlist/{id}`.
#[derive(Debug, Clone)]
pub struct HttpWishlistApi {
    client: ApiClient,
}

impl HttpWishlistApi {
    #[must_use]
    pub const fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl WishlistApi for HttpWishlistApi {
    #[instrument(skip(self))]
    async fn fetch(&self) -> Result<Vec<WishlistEntry>, ApiError> {
        let payload: Value = self.client.get("wishlist").await?;
        Ok(decode_wishlist_payload(payload)?)
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn toggle(&self, product_id: &ProductId) -> Result<Vec<WishlistEntry>, ApiError> {
        let payload: Value = self
            .client
            .post("wishlist/toggle", &json!({ "productId": product_id }))
            .await?;
        Ok(decode_wishlist_payload(payload)?)
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn remove(&self, product_id: &ProductId) -> Result<Vec<WishlistEntry>, ApiError> {
        let path = format!("wishlist/{}", urlencoding::encode(product_id.as_str()));
        let payload: Value = self.client.delete(&path).await?;
        Ok(decode_wishlist_payload(payload)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use url::Url;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::api::BearerCredential;
    use crate::config::SessionConfig;

    fn test_api(base_url: &str) -> HttpWishlistApi {
        let config = SessionConfig::new(Url::parse(base_url).unwrap());
        HttpWishlistApi::new(ApiClient::new(&config, BearerCredential::new()).unwrap())
    }

    #[tokio::test]
    async fn test_toggle_returns_server_collection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/wishlist/toggle"))
            .and(body_json(json!({"productId": "p9"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "wishlist": [
                    {"_id": "p1", "name": "Cleanser", "price": 899, "images": ["/c.jpg"]},
                    {"_id": "p9", "name": "X", "price": 100}
                ]
            })))
            .mount(&server)
            .await;

        let api = test_api(&server.uri());
        let entries = api.toggle(&ProductId::new("p9")).await.unwrap();
        let ids: Vec<_> = entries.iter().map(|e| e.product_id.as_str()).collect();
        assert_eq!(ids, ["p1", "p9"]);
    }

    #[tokio::test]
    async fn test_fetch_accepts_bare_array() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wishlist"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let api = test_api(&server.uri());
        assert!(api.fetch().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_rejects_malformed_payload() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/wishlist/p1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .mount(&server)
            .await;

        let api = test_api(&server.uri());
        let err = api.remove(&ProductId::new("p1")).await.unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }
}
