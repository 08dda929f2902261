//! Tagged results of cart operations.

use storefront_cart_core::{Product, ProductId};
use thiserror::Error;

use crate::inventory::InventoryError;
use crate::notify::Notice;
use crate::storage::StorageError;

/// What a cart operation did.
///
/// Operations never return `Err`; callers that only care about the cart can
/// ignore this and read [`CartStore::cart`](super::CartStore::cart).
#[derive(Debug)]
pub enum CartOutcome {
    /// The cart changed and was persisted; holds the new snapshot.
    Updated(Vec<Product>),
    /// Nothing to do (non-positive quantity, or no matching entry).
    Unchanged,
    /// A business rule refused the change.
    Rejected(Rejection),
    /// A collaborator failed; the cart was left as it was.
    Failed(Failure),
}

impl CartOutcome {
    /// True if the cart changed.
    #[must_use]
    pub const fn is_updated(&self) -> bool {
        matches!(self, Self::Updated(_))
    }

    /// The new snapshot, if the cart changed.
    #[must_use]
    pub fn cart(&self) -> Option<&[Product]> {
        match self {
            Self::Updated(cart) => Some(cart),
            _ => None,
        }
    }
}

/// Business-rule violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    /// Not enough stock for the requested quantity.
    #[error("product {product_id}: requested {requested}, {available} in stock")]
    StockUnavailable {
        product_id: ProductId,
        requested: i64,
        available: i64,
    },

    /// Product metadata came back without a usable id, or for another product.
    #[error("product {product_id}: metadata has no valid id")]
    InvalidProduct { product_id: ProductId },

    /// The product is not in the cart.
    #[error("product {product_id} is not in the cart")]
    NotInCart { product_id: ProductId },
}

impl Rejection {
    /// Message shown for this rejection.
    #[must_use]
    pub const fn notice(&self) -> Notice {
        match self {
            Self::StockUnavailable { .. } => Notice::QuantityUnavailable,
            Self::InvalidProduct { .. } => Notice::AddFailed,
            Self::NotInCart { .. } => Notice::RemoveFailed,
        }
    }
}

/// Transport or storage failures.
#[derive(Debug, Error)]
pub enum Failure {
    /// Inventory lookup failed.
    #[error("inventory lookup failed: {0}")]
    Inventory(#[from] InventoryError),

    /// Durable write failed.
    #[error("cart could not be saved: {0}")]
    Storage(#[from] StorageError),
}

/// The public cart operations, for mapping failures to messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Add,
    Remove,
    Update,
}

impl Operation {
    /// Message shown when this operation fails.
    #[must_use]
    pub const fn failure_notice(self) -> Notice {
        match self {
            Self::Add => Notice::AddFailed,
            Self::Remove => Notice::RemoveFailed,
            Self::Update => Notice::UpdateFailed,
        }
    }

    /// Name used in log fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add_product",
            Self::Remove => "remove_product",
            Self::Update => "update_product_amount",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_notices() {
        let id = ProductId::new(1);
        assert_eq!(
            Rejection::StockUnavailable {
                product_id: id,
                requested: 2,
                available: 1
            }
            .notice(),
            Notice::QuantityUnavailable
        );
        assert_eq!(
            Rejection::InvalidProduct { product_id: id }.notice(),
            Notice::AddFailed
        );
        assert_eq!(
            Rejection::NotInCart { product_id: id }.notice(),
            Notice::RemoveFailed
        );
    }

    #[test]
    fn test_failure_notice_depends_on_operation() {
        assert_eq!(Operation::Add.failure_notice(), Notice::AddFailed);
        assert_eq!(Operation::Remove.failure_notice(), Notice::RemoveFailed);
        assert_eq!(Operation::Update.failure_notice(), Notice::UpdateFailed);
    }

    #[test]
    fn test_rejection_display() {
        let rejection = Rejection::StockUnavailable {
            product_id: ProductId::new(5),
            requested: 10,
            available: 3,
        };
        assert_eq!(rejection.to_string(), "product 5: requested 10, 3 in stock");
    }
}
