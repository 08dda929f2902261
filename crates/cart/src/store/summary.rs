//! Derived cart figures for headers, listings and the cart page.

use std::collections::HashMap;

use serde::Serialize;
use storefront_cart_core::{CurrencyCode, Price, PriceError, Product, ProductId};

/// Totals for one cart snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartSummary {
    /// Distinct products.
    pub items: usize,
    /// Sum of all quantities.
    pub units: i64,
    /// Price × quantity per product, in cart order.
    pub lines: Vec<LineTotal>,
    /// Sum of the line totals.
    pub total: Price,
}

/// One product's line total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineTotal {
    pub product_id: ProductId,
    pub amount: i64,
    pub subtotal: Price,
}

impl CartSummary {
    /// Compute the summary of a cart.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Overflow` if a line or the total does not fit.
    pub fn of(cart: &[Product], currency_code: CurrencyCode) -> Result<Self, PriceError> {
        let mut total = Price::zero(currency_code);
        let mut units = 0_i64;
        let mut lines = Vec::with_capacity(cart.len());

        for product in cart {
            let subtotal = product.subtotal(currency_code)?;
            total = total.plus(subtotal)?;
            units = units.saturating_add(product.amount);
            lines.push(LineTotal {
                product_id: product.id,
                amount: product.amount,
                subtotal,
            });
        }

        Ok(Self {
            items: cart.len(),
            units,
            lines,
            total,
        })
    }
}

/// Quantity in the cart per product id.
#[must_use]
pub fn amounts_by_product(cart: &[Product]) -> HashMap<ProductId, i64> {
    cart.iter().map(|product| (product.id, product.amount)).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::Map;

    use super::*;

    fn product(id: i64, cents: i64, amount: i64) -> Product {
        Product {
            id: ProductId::new(id),
            title: format!("Sneaker {id}"),
            price: Decimal::new(cents, 2),
            image: String::new(),
            amount,
            extra: Map::new(),
        }
    }

    #[test]
    fn test_summary_of_empty_cart() {
        let summary = CartSummary::of(&[], CurrencyCode::USD).unwrap();
        assert_eq!(summary.items, 0);
        assert_eq!(summary.units, 0);
        assert_eq!(summary.total.format(), "$0.00");
    }

    #[test]
    fn test_summary_totals() {
        let cart = vec![product(1, 17990, 2), product(2, 13990, 1)];
        let summary = CartSummary::of(&cart, CurrencyCode::USD).unwrap();

        assert_eq!(summary.items, 2);
        assert_eq!(summary.units, 3);
        assert_eq!(summary.lines[0].subtotal.format(), "$359.80");
        assert_eq!(summary.lines[1].subtotal.format(), "$139.90");
        assert_eq!(summary.total.format(), "$499.70");
    }

    #[test]
    fn test_amounts_by_product() {
        let cart = vec![product(1, 100, 2), product(4, 100, 5)];
        let amounts = amounts_by_product(&cart);
        assert_eq!(amounts.get(&ProductId::new(1)), Some(&2));
        assert_eq!(amounts.get(&ProductId::new(4)), Some(&5));
        assert_eq!(amounts.get(&ProductId::new(2)), None);
    }
}
