//! Catalog and cart records.
//!
//! Field names follow the inventory API's JSON payloads. Metadata the cart
//! does not interpret is kept in `extra` and written back unchanged.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::id::ProductId;
use super::price::{CurrencyCode, Price, PriceError};

/// A product held in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub price: Decimal,
    #[serde(default)]
    pub image: String,
    /// Quantity held in the cart.
    pub amount: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Product {
    /// Unit price in the given currency.
    #[must_use]
    pub const fn unit_price(&self, currency_code: CurrencyCode) -> Price {
        Price::new(self.price, currency_code)
    }

    /// Unit price multiplied by the quantity in the cart.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Overflow` if the line total does not fit.
    pub fn subtotal(&self, currency_code: CurrencyCode) -> Result<Price, PriceError> {
        self.unit_price(currency_code).times(self.amount)
    }
}

/// Product metadata as returned by the inventory service.
///
/// `id` is optional: a payload without a usable id is rejected by the cart
/// rather than treated as a transport failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDetails {
    #[serde(default)]
    pub id: Option<ProductId>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub price: Decimal,
    #[serde(default)]
    pub image: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProductDetails {
    /// The id, if present and non-zero.
    #[must_use]
    pub fn valid_id(&self) -> Option<ProductId> {
        self.id.filter(|id| id.as_i64() != 0)
    }

    /// Turn the metadata into a cart entry holding `amount` units.
    ///
    /// Returns `None` when the metadata has no valid id.
    #[must_use]
    pub fn into_product(self, amount: i64) -> Option<Product> {
        let id = self.valid_id()?;
        // A stale `amount` in the metadata must not shadow the cart quantity.
        let mut extra = self.extra;
        extra.remove("amount");
        Some(Product {
            id,
            title: self.title,
            price: self.price,
            image: self.image,
            amount,
            extra,
        })
    }
}

/// Quantity available in inventory for one product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stock {
    #[serde(rename = "id", alias = "productId")]
    pub product_id: ProductId,
    pub amount: i64,
}

impl Stock {
    /// Create a stock record.
    #[must_use]
    pub const fn new(product_id: ProductId, amount: i64) -> Self {
        Self { product_id, amount }
    }
}
