//! REST inventory API client.
//!
//! Uses `reqwest` for HTTP and caches product metadata using `moka`.
//! Stock is never cached.

use std::sync::Arc;

use moka::future::Cache;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use storefront_cart_core::{ProductDetails, ProductId, Stock};
use tracing::{debug, instrument};
use url::Url;

use super::{InventoryError, InventoryService};
use crate::config::InventoryApiConfig;

/// Characters of a failed response body kept for diagnostics.
const ERROR_BODY_PREVIEW: usize = 200;

/// Client for the inventory REST API.
///
/// Cheaply cloneable; clones share the connection pool and product cache.
#[derive(Clone)]
pub struct HttpInventoryClient {
    inner: Arc<HttpInventoryClientInner>,
}

struct HttpInventoryClientInner {
    client: reqwest::Client,
    base_url: Url,
    token: Option<SecretString>,
    products: Option<Cache<ProductId, ProductDetails>>,
}

impl HttpInventoryClient {
    /// Create a new inventory API client.
    ///
    /// # Errors
    ///
    /// Returns `InventoryError::Http` if the HTTP client cannot be built.
    pub fn new(config: &InventoryApiConfig) -> Result<Self, InventoryError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        let products = (!config.product_cache_ttl.is_zero()).then(|| {
            Cache::builder()
                .max_capacity(1000)
                .time_to_live(config.product_cache_ttl)
                .build()
        });

        Ok(Self {
            inner: Arc::new(HttpInventoryClientInner {
                client,
                base_url: config.base_url.clone(),
                token: config.token.clone(),
                products,
            }),
        })
    }

    /// Drop every cached product.
    pub fn invalidate_products(&self) {
        if let Some(cache) = &self.inner.products {
            cache.invalidate_all();
        }
    }

    /// GET a JSON document relative to the base URL.
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, InventoryError> {
        let url = self.inner.base_url.join(path)?;

        let mut request = self.inner.client.get(url);
        if let Some(token) = &self.inner.token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                InventoryError::Unavailable(e.to_string())
            } else {
                InventoryError::Http(e)
            }
        })?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(InventoryError::RateLimited(retry_after));
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(InventoryError::NotFound(path.to_string()));
        }

        // Get response body as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %response_text.chars().take(500).collect::<String>(),
                "Inventory API returned non-success status"
            );
            return Err(InventoryError::Status {
                status: status.as_u16(),
                body: response_text.chars().take(ERROR_BODY_PREVIEW).collect(),
            });
        }

        serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %response_text.chars().take(500).collect::<String>(),
                "Failed to parse inventory API response"
            );
            InventoryError::Parse(e)
        })
    }
}

impl InventoryService for HttpInventoryClient {
    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn stock(&self, product_id: ProductId) -> Result<Stock, InventoryError> {
        self.get_json(&format!("stock/{product_id}")).await
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn product(&self, product_id: ProductId) -> Result<ProductDetails, InventoryError> {
        if let Some(cache) = &self.inner.products
            && let Some(cached) = cache.get(&product_id).await
        {
            debug!("Cache hit for product");
            return Ok(cached);
        }

        let details: ProductDetails = self.get_json(&format!("products/{product_id}")).await?;

        // Malformed payloads are never cached so a fixed catalog entry is seen next time.
        if let Some(cache) = &self.inner.products
            && details.valid_id().is_some()
        {
            cache.insert(product_id, details.clone()).await;
        }

        Ok(details)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use axum::extract::{Path, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::{IntoResponse, Response};
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;

    use super::*;

    #[derive(Clone, Default)]
    struct Hits {
        products: Arc<AtomicUsize>,
    }

    async fn stock_handler(Path(id): Path<i64>, headers: HeaderMap) -> Response {
        match id {
            1 => Json(json!({ "id": 1, "amount": 3 })).into_response(),
            2 => Json(json!({ "id": 2, "amount": 0 })).into_response(),
            7 => {
                let authorized = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    == Some("Bearer test-token");
                if authorized {
                    Json(json!({ "id": 7, "amount": 1 })).into_response()
                } else {
                    StatusCode::UNAUTHORIZED.into_response()
                }
            }
            8 => (StatusCode::TOO_MANY_REQUESTS, [("Retry-After", "30")]).into_response(),
            9 => (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
            10 => "not json".into_response(),
            _ => StatusCode::NOT_FOUND.into_response(),
        }
    }

    async fn product_handler(State(hits): State<Hits>, Path(id): Path<i64>) -> Response {
        hits.products.fetch_add(1, Ordering::SeqCst);
        match id {
            1 => Json(json!({
                "id": 1,
                "title": "Tênis de Caminhada Leve Confortável",
                "price": 179.9,
                "image": "https://example.com/1.jpg"
            }))
            .into_response(),
            3 => Json(json!({ "title": "No id here" })).into_response(),
            _ => StatusCode::NOT_FOUND.into_response(),
        }
    }

    async fn spawn_api(hits: Hits) -> Url {
        let app = Router::new()
            .route("/stock/{id}", get(stock_handler))
            .route("/products/{id}", get(product_handler))
            .with_state(hits);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Url::parse(&format!("http://{addr}/")).unwrap()
    }

    fn client_for(base_url: Url, ttl: Duration) -> HttpInventoryClient {
        let config = InventoryApiConfig {
            base_url,
            token: None,
            timeout: Duration::from_secs(5),
            product_cache_ttl: ttl,
        };
        HttpInventoryClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_stock_lookup() {
        let base = spawn_api(Hits::default()).await;
        let client = client_for(base, Duration::ZERO);

        let stock = client.stock(ProductId::new(1)).await.unwrap();
        assert_eq!(stock, Stock::new(ProductId::new(1), 3));

        let stock = client.stock(ProductId::new(2)).await.unwrap();
        assert_eq!(stock.amount, 0);
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let base = spawn_api(Hits::default()).await;
        let client = client_for(base, Duration::ZERO);

        let err = client.stock(ProductId::new(404)).await.unwrap_err();
        assert!(matches!(err, InventoryError::NotFound(ref path) if path == "stock/404"));

        let err = client.stock(ProductId::new(8)).await.unwrap_err();
        assert!(matches!(err, InventoryError::RateLimited(30)));

        let err = client.stock(ProductId::new(9)).await.unwrap_err();
        assert!(matches!(err, InventoryError::Status { status: 500, ref body } if body == "boom"));

        let err = client.stock(ProductId::new(10)).await.unwrap_err();
        assert!(matches!(err, InventoryError::Parse(_)));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_unavailable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = client_for(
            Url::parse(&format!("http://{addr}/")).unwrap(),
            Duration::ZERO,
        );
        let err = client.stock(ProductId::new(1)).await.unwrap_err();
        assert!(matches!(err, InventoryError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_bearer_token_is_sent() {
        let base = spawn_api(Hits::default()).await;

        let anonymous = client_for(base.clone(), Duration::ZERO);
        let err = anonymous.stock(ProductId::new(7)).await.unwrap_err();
        assert!(matches!(err, InventoryError::Status { status: 401, .. }));

        let config = InventoryApiConfig {
            base_url: base,
            token: Some(SecretString::from("test-token")),
            timeout: Duration::from_secs(5),
            product_cache_ttl: Duration::ZERO,
        };
        let client = HttpInventoryClient::new(&config).unwrap();
        assert_eq!(client.stock(ProductId::new(7)).await.unwrap().amount, 1);
    }

    #[tokio::test]
    async fn test_product_metadata_is_cached() {
        let hits = Hits::default();
        let base = spawn_api(hits.clone()).await;
        let client = client_for(base, Duration::from_secs(60));

        let first = client.product(ProductId::new(1)).await.unwrap();
        let second = client.product(ProductId::new(1)).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.valid_id(), Some(ProductId::new(1)));
        assert_eq!(hits.products.load(Ordering::SeqCst), 1);

        client.invalidate_products();
        client.product(ProductId::new(1)).await.unwrap();
        assert_eq!(hits.products.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_product_without_id_is_not_cached() {
        let hits = Hits::default();
        let base = spawn_api(hits.clone()).await;
        let client = client_for(base, Duration::from_secs(60));

        let details = client.product(ProductId::new(3)).await.unwrap();
        assert_eq!(details.valid_id(), None);
        client.product(ProductId::new(3)).await.unwrap();
        assert_eq!(hits.products.load(Ordering::SeqCst), 2);
    }
}
