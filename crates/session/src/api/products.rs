//! Product lookup collaborator.
//!
//! Lookups are cached with `moka` (5 minute TTL) since wishlist validation
//! tends to hit the same handful of products repeatedly.

use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use tracing::{debug, instrument};

use swan_botanical_core::{Product, ProductId};

use super::{ApiClient, ApiError};

/// Read access to the product catalog.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Fetch a product; `ApiError::NotFound` if it does not exist.
    async fn get_by_id(&self, id: &ProductId) -> Result<Product, ApiError>;

    /// Whether a product exists.
    async fn exists_by_id(&self, id: &ProductId) -> Result<bool, ApiError> {
        match self.get_by_id(id).await {
            Ok(_) => Ok(true),
            Err(ApiError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// [`ProductCatalog`] over `GET /products/{id}`.
#[derive(Clone)]
pub struct HttpProductCatalog {
    client: ApiClient,
    cache: Cache<ProductId, Product>,
}

impl HttpProductCatalog {
    #[must_use]
    pub fn new(client: ApiClient) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();
        Self { client, cache }
    }
}

#[async_trait]
impl ProductCatalog for HttpProductCatalog {
    #[instrument(skip(self), fields(product_id = %id))]
    async fn get_by_id(&self, id: &ProductId) -> Result<Product, ApiError> {
        if let Some(product) = self.cache.get(id).await {
            debug!("Product cache hit");
            return Ok(product);
        }

        let path = format!("products/{}", urlencoding::encode(id.as_str()));
        let product: Product = self.client.get(&path).await?;
        self.cache.insert(id.clone(), product.clone()).await;
        Ok(product)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use url::Url;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::api::BearerCredential;
    use crate::config::SessionConfig;

    fn test_catalog(base_url: &str) -> HttpProductCatalog {
        let config = SessionConfig::new(Url::parse(base_url).unwrap());
        HttpProductCatalog::new(ApiClient::new(&config, BearerCredential::new()).unwrap())
    }

    #[tokio::test]
    async fn test_get_by_id_is_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/products/p1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "_id": "p1",
                "name": "Gentle Botanical Cleanser",
                "price": 899
            })))
            .expect(1)
            .mount(&server)
            .await;

        let catalog = test_catalog(&server.uri());
        let id = ProductId::new("p1");
        assert_eq!(catalog.get_by_id(&id).await.unwrap().name, "Gentle Botanical Cleanser");
        assert!(catalog.exists_by_id(&id).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_product() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/products/nope"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let catalog = test_catalog(&server.uri());
        assert!(!catalog.exists_by_id(&ProductId::new("nope")).await.unwrap());
    }

    #[tokio::test]
    async fn test_server_errors_propagate() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/products/p1"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let catalog = test_catalog(&server.uri());
        let err = catalog.exists_by_id(&ProductId::new("p1")).await.unwrap_err();
        assert!(matches!(err, ApiError::Rejected { status: 500, .. }));
    }
}
