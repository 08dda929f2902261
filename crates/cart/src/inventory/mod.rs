//! Inventory service access.
//!
//! # Architecture
//!
//! - [`InventoryService`] is the seam the cart store validates against
//! - [`HttpInventoryClient`] talks to the REST inventory API with `reqwest`
//! - Stock is always fetched fresh; product metadata is cached via `moka`
//!
//! # Endpoints
//!
//! - `GET {base}/stock/{id}` → `{ "id": 1, "amount": 3 }`
//! - `GET {base}/products/{id}` → `{ "id": 1, "title": "...", "price": 179.9, "image": "..." }`

mod http;

use std::future::Future;
use std::sync::Arc;

use storefront_cart_core::{ProductDetails, ProductId, Stock};
use thiserror::Error;

pub use http::HttpInventoryClient;

/// Errors that can occur when talking to the inventory service.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status {
        /// Status code.
        status: u16,
        /// Leading part of the response body.
        body: String,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Request URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the service.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// The service could not be reached (connection refused, timeout) or no
    /// service is configured.
    #[error("Inventory unavailable: {0}")]
    Unavailable(String),
}

/// Read-only lookups against the remote inventory.
///
/// Implementations must be cheap to share; the cart store calls them from
/// every mutating operation.
pub trait InventoryService: Send + Sync {
    /// Current stock for a product.
    fn stock(
        &self,
        product_id: ProductId,
    ) -> impl Future<Output = Result<Stock, InventoryError>> + Send;

    /// Product metadata.
    ///
    /// A payload without a usable id is returned as-is; the caller decides
    /// whether it is acceptable.
    fn product(
        &self,
        product_id: ProductId,
    ) -> impl Future<Output = Result<ProductDetails, InventoryError>> + Send;
}

impl<T: InventoryService> InventoryService for Arc<T> {
    fn stock(
        &self,
        product_id: ProductId,
    ) -> impl Future<Output = Result<Stock, InventoryError>> + Send {
        (**self).stock(product_id)
    }

    fn product(
        &self,
        product_id: ProductId,
    ) -> impl Future<Output = Result<ProductDetails, InventoryError>> + Send {
        (**self).product(product_id)
    }
}
