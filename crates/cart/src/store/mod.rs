//! The cart store.
//!
//! # Architecture
//!
//! - One [`CartStore`] per application, built at startup and cloned into
//!   every consumer (clones share state)
//! - Every mutation is validated against the [`InventoryService`], written to
//!   the [`KeyValueStore`] and only then applied in memory
//! - Refusals and failures are reported once through the
//!   [`NotificationSink`]; operations never return `Err`
//! - Listeners registered with [`CartStore::subscribe`] see each new snapshot
//!   after it has been persisted
//!
//! # Example
//!
//! ```rust,ignore
//! use storefront_cart::{CartStore, HttpInventoryClient, FileStore, TracingSink};
//!
//! let store = CartStore::new(
//!     HttpInventoryClient::new(config.require_inventory()?)?,
//!     FileStore::new(&config.storage_dir)?,
//!     TracingSink,
//! );
//!
//! store.add_product(ProductId::new(1)).await;
//! store.update_product_amount(UpdateProductAmount::new(ProductId::new(1), 3)).await;
//! store.remove_product(ProductId::new(1));
//! ```

mod outcome;
mod subscribe;
mod summary;

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use serde::{Deserialize, Serialize};
use storefront_cart_core::{CurrencyCode, PriceError, Product, ProductId};
use tracing::{debug, instrument};

use crate::inventory::InventoryService;
use crate::notify::NotificationSink;
use crate::storage::{KeyValueStore, StorageError};

pub use outcome::{CartOutcome, Failure, Operation, Rejection};
pub use subscribe::SubscriptionId;
pub use summary::{CartSummary, LineTotal, amounts_by_product};

use subscribe::Subscribers;

/// Key the cart snapshot is stored under.
pub const CART_STORAGE_KEY: &str = "@storefront:cart";

/// Request to set a product's quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductAmount {
    pub product_id: ProductId,
    pub amount: i64,
}

impl UpdateProductAmount {
    /// Create an update request.
    #[must_use]
    pub const fn new(product_id: ProductId, amount: i64) -> Self {
        Self { product_id, amount }
    }
}

/// Shopping cart state holder.
///
/// Cheaply cloneable via `Arc`; all clones see the same cart.
pub struct CartStore<I, S, N> {
    inner: Arc<CartStoreInner<I, S, N>>,
}

struct CartStoreInner<I, S, N> {
    inventory: I,
    storage: S,
    notifier: N,
    storage_key: String,
    cart: RwLock<Vec<Product>>,
    /// Bumped under the cart write lock on every committed change.
    revision: AtomicU64,
    subscribers: Subscribers,
}

impl<I, S, N> Clone for CartStore<I, S, N> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Decision taken against the current cart while holding the write lock.
enum Plan {
    Replace(Vec<Product>),
    Keep,
    Reject(Rejection),
}

impl<I, S, N> CartStore<I, S, N>
where
    I: InventoryService,
    S: KeyValueStore,
    N: NotificationSink,
{
    /// Create a store, loading the cart saved under [`CART_STORAGE_KEY`].
    pub fn new(inventory: I, storage: S, notifier: N) -> Self {
        Self::with_storage_key(inventory, storage, notifier, CART_STORAGE_KEY)
    }

    /// Create a store that persists under a custom key.
    ///
    /// A missing, unreadable or corrupt snapshot yields an empty cart.
    pub fn with_storage_key(inventory: I, storage: S, notifier: N, storage_key: &str) -> Self {
        let cart = load_snapshot(&storage, storage_key);
        debug!(storage_key, items = cart.len(), "Cart loaded");

        Self {
            inner: Arc::new(CartStoreInner {
                inventory,
                storage,
                notifier,
                storage_key: storage_key.to_string(),
                cart: RwLock::new(cart),
                revision: AtomicU64::new(0),
                subscribers: Subscribers::default(),
            }),
        }
    }

    /// Current cart snapshot.
    #[must_use]
    pub fn cart(&self) -> Vec<Product> {
        self.read_cart().clone()
    }

    /// Number of distinct products in the cart.
    #[must_use]
    pub fn cart_size(&self) -> usize {
        self.read_cart().len()
    }

    /// Quantity in the cart per product id.
    #[must_use]
    pub fn amounts_by_product(&self) -> HashMap<ProductId, i64> {
        amounts_by_product(&self.read_cart())
    }

    /// Line totals and cart total.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Overflow` if a total does not fit.
    pub fn summary(&self, currency_code: CurrencyCode) -> Result<CartSummary, PriceError> {
        CartSummary::of(&self.read_cart(), currency_code)
    }

    /// Register a listener called with every new snapshot after it is saved.
    ///
    /// Listeners never see an older snapshot after a newer one; when commits
    /// race, a snapshot superseded before delivery is skipped. Listeners run
    /// one at a time and must not change the cart from inside the callback.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&[Product]) + Send + Sync + 'static,
    {
        self.inner.subscribers.add(Arc::new(listener))
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.subscribers.remove(id)
    }

    /// Add one unit of a product.
    ///
    /// A product already in the cart is incremented by one if stock allows;
    /// otherwise its metadata is fetched and it is appended with amount 1.
    #[instrument(skip_all, fields(product_id = %product_id))]
    pub async fn add_product(&self, product_id: ProductId) -> CartOutcome {
        let outcome = self.try_add(product_id).await;
        self.report(Operation::Add, &outcome);
        outcome
    }

    /// Remove a product from the cart.
    #[instrument(skip_all, fields(product_id = %product_id))]
    pub fn remove_product(&self, product_id: ProductId) -> CartOutcome {
        let outcome = self.commit(|cart| {
            if cart.iter().any(|item| item.id == product_id) {
                Plan::Replace(
                    cart.iter()
                        .filter(|item| item.id != product_id)
                        .cloned()
                        .collect(),
                )
            } else {
                Plan::Reject(Rejection::NotInCart { product_id })
            }
        });
        self.report(Operation::Remove, &outcome);
        outcome
    }

    /// Set a product's quantity to exactly `amount`.
    ///
    /// Non-positive amounts and products not in the cart are silently ignored.
    #[instrument(skip_all, fields(product_id = %update.product_id, amount = update.amount))]
    pub async fn update_product_amount(&self, update: UpdateProductAmount) -> CartOutcome {
        let outcome = self.try_update(update).await;
        self.report(Operation::Update, &outcome);
        outcome
    }

    async fn try_add(&self, product_id: ProductId) -> CartOutcome {
        let stock = match self.inner.inventory.stock(product_id).await {
            Ok(stock) => stock,
            Err(e) => return CartOutcome::Failed(e.into()),
        };

        let existing = self.read_cart().iter().find(|item| item.id == product_id).cloned();

        // The line appended if the product is absent when the change is applied.
        let candidate = if let Some(item) = existing {
            Product { amount: 1, ..item }
        } else {
            if stock.amount <= 0 {
                return CartOutcome::Rejected(Rejection::StockUnavailable {
                    product_id,
                    requested: 1,
                    available: stock.amount,
                });
            }

            let details = match self.inner.inventory.product(product_id).await {
                Ok(details) => details,
                Err(e) => return CartOutcome::Failed(e.into()),
            };

            // Metadata for another product would bypass the one-line-per-id check below.
            if details.valid_id() != Some(product_id) {
                return CartOutcome::Rejected(Rejection::InvalidProduct { product_id });
            }

            match details.into_product(1) {
                Some(product) => product,
                None => return CartOutcome::Rejected(Rejection::InvalidProduct { product_id }),
            }
        };

        let available = stock.amount;
        self.commit(move |cart| {
            if let Some(item) = cart.iter().find(|item| item.id == product_id) {
                if available <= item.amount {
                    return Plan::Reject(Rejection::StockUnavailable {
                        product_id,
                        requested: item.amount.saturating_add(1),
                        available,
                    });
                }
                return Plan::Replace(
                    cart.iter()
                        .map(|item| {
                            if item.id == product_id {
                                Product {
                                    amount: item.amount + 1,
                                    ..item.clone()
                                }
                            } else {
                                item.clone()
                            }
                        })
                        .collect(),
                );
            }

            if available <= 0 {
                return Plan::Reject(Rejection::StockUnavailable {
                    product_id,
                    requested: 1,
                    available,
                });
            }

            let mut next = cart.to_vec();
            next.push(candidate);
            Plan::Replace(next)
        })
    }

    async fn try_update(&self, update: UpdateProductAmount) -> CartOutcome {
        let UpdateProductAmount { product_id, amount } = update;

        if amount <= 0 {
            debug!("Ignoring non-positive amount");
            return CartOutcome::Unchanged;
        }

        let stock = match self.inner.inventory.stock(product_id).await {
            Ok(stock) => stock,
            Err(e) => return CartOutcome::Failed(e.into()),
        };

        if stock.amount < amount {
            return CartOutcome::Rejected(Rejection::StockUnavailable {
                product_id,
                requested: amount,
                available: stock.amount,
            });
        }

        self.commit(|cart| {
            if !cart.iter().any(|item| item.id == product_id) {
                return Plan::Keep;
            }
            Plan::Replace(
                cart.iter()
                    .map(|item| {
                        if item.id == product_id {
                            Product {
                                amount,
                                ..item.clone()
                            }
                        } else {
                            item.clone()
                        }
                    })
                    .collect(),
            )
        })
    }

    /// Decide against the latest cart, persist, then swap in memory and notify.
    ///
    /// The write lock is held across the durable write so memory and storage
    /// always agree; it is never held across an `.await`.
    fn commit(&self, plan: impl FnOnce(&[Product]) -> Plan) -> CartOutcome {
        let (revision, snapshot) = {
            let mut cart = self.inner.cart.write().unwrap_or_else(PoisonError::into_inner);

            let next = match plan(&cart) {
                Plan::Replace(next) => next,
                Plan::Keep => return CartOutcome::Unchanged,
                Plan::Reject(rejection) => return CartOutcome::Rejected(rejection),
            };

            if let Err(e) = self.persist(&next) {
                return CartOutcome::Failed(e.into());
            }

            *cart = next.clone();
            let revision = self.inner.revision.fetch_add(1, Ordering::Relaxed) + 1;
            (revision, next)
        };

        self.inner.subscribers.notify(revision, &snapshot);
        CartOutcome::Updated(snapshot)
    }

    fn persist(&self, cart: &[Product]) -> Result<(), StorageError> {
        let raw = serde_json::to_string(cart)?;
        self.inner.storage.set(&self.inner.storage_key, &raw)
    }

    fn report(&self, operation: Operation, outcome: &CartOutcome) {
        match outcome {
            CartOutcome::Updated(cart) => {
                debug!(operation = operation.as_str(), items = cart.len(), "Cart updated");
            }
            CartOutcome::Unchanged => {}
            CartOutcome::Rejected(rejection) => {
                tracing::info!(
                    operation = operation.as_str(),
                    reason = %rejection,
                    "Cart change rejected"
                );
                self.inner.notifier.show_error(rejection.notice().message());
            }
            CartOutcome::Failed(failure) => {
                tracing::error!(
                    operation = operation.as_str(),
                    error = %failure,
                    "Cart operation failed"
                );
                self.inner
                    .notifier
                    .show_error(operation.failure_notice().message());
            }
        }
    }

    fn read_cart(&self) -> RwLockReadGuard<'_, Vec<Product>> {
        self.inner.cart.read().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Read the saved cart, falling back to empty on any problem.
///
/// Duplicate ids in a hand-edited snapshot keep their first entry.
fn load_snapshot<S: KeyValueStore>(storage: &S, key: &str) -> Vec<Product> {
    let raw = match storage.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(e) => {
            tracing::warn!(error = %e, storage_key = key, "Failed to read saved cart");
            return Vec::new();
        }
    };

    let cart: Vec<Product> = match serde_json::from_str(&raw) {
        Ok(cart) => cart,
        Err(e) => {
            tracing::warn!(error = %e, storage_key = key, "Ignoring corrupt saved cart");
            return Vec::new();
        }
    };

    let mut seen = HashSet::new();
    cart.into_iter().filter(|item| seen.insert(item.id)).collect()
}
