//! Cart commands.
//!
//! # Environment Variables
//!
//! - `CART_API_URL` - Inventory API base URL (needed by `add` and `update`)
//! - `CART_STORAGE_DIR` - Directory holding the saved cart (default: `.cart`)

use std::fmt::Write as _;

use storefront_cart::{
    CartConfig, CartOutcome, CartStore, CartSummary, ConfigError, FileStore, HttpInventoryClient,
    InventoryError, InventoryService, NotificationSink, StorageError,
};
use storefront_cart_core::{CurrencyCode, PriceError, Product, ProductDetails, ProductId, Stock};
use thiserror::Error;

/// Errors that can occur while running a cart command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Inventory client could not be built.
    #[error("Inventory error: {0}")]
    Inventory(#[from] InventoryError),

    /// Cart storage could not be opened.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Totals overflowed.
    #[error("Price error: {0}")]
    Price(#[from] PriceError),

    /// Output could not be encoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The cart refused or failed the change.
    #[error("Cart not changed: {0}")]
    NotApplied(String),
}

/// Prints cart notifications to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrSink;

impl NotificationSink for StderrSink {
    #[allow(clippy::print_stderr)]
    fn show_error(&self, message: &str) {
        eprintln!("{message}");
    }
}

/// Inventory for a single command.
///
/// Commands that only read or remove never look up stock, so they run
/// without `CART_API_URL`.
pub enum Inventory {
    Http(HttpInventoryClient),
    Offline,
}

impl Inventory {
    fn offline_error() -> InventoryError {
        InventoryError::Unavailable("CART_API_URL is not set".to_string())
    }
}

impl InventoryService for Inventory {
    async fn stock(&self, product_id: ProductId) -> Result<Stock, InventoryError> {
        match self {
            Self::Http(client) => client.stock(product_id).await,
            Self::Offline => Err(Self::offline_error()),
        }
    }

    async fn product(&self, product_id: ProductId) -> Result<ProductDetails, InventoryError> {
        match self {
            Self::Http(client) => client.product(product_id).await,
            Self::Offline => Err(Self::offline_error()),
        }
    }
}

pub type Store = CartStore<Inventory, FileStore, StderrSink>;

/// How results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    Table,
    Json,
}

/// Build the store from configuration.
///
/// `needs_inventory` is set for commands that validate stock; they fail up
/// front if the inventory API is not configured.
pub fn open_store(config: &CartConfig, needs_inventory: bool) -> Result<Store, CliError> {
    let inventory = if needs_inventory {
        Inventory::Http(HttpInventoryClient::new(config.require_inventory()?)?)
    } else {
        Inventory::Offline
    };
    let storage = FileStore::new(&config.storage_dir)?;
    tracing::debug!(storage_dir = %config.storage_dir.display(), "Cart store opened");
    Ok(CartStore::new(inventory, storage, StderrSink))
}

/// Print the current cart.
pub fn show(store: &Store, output: Output) -> Result<(), CliError> {
    print_cart(&store.cart(), output)
}

/// Print the result of a cart change.
///
/// Rejections and failures have already been shown by the sink; they are
/// returned as errors so the process exits non-zero.
pub fn report(outcome: &CartOutcome, output: Output) -> Result<(), CliError> {
    match outcome {
        CartOutcome::Updated(cart) => print_cart(cart, output),
        CartOutcome::Unchanged => {
            tracing::info!("Cart unchanged");
            Ok(())
        }
        CartOutcome::Rejected(rejection) => Err(CliError::NotApplied(rejection.to_string())),
        CartOutcome::Failed(failure) => Err(CliError::NotApplied(failure.to_string())),
    }
}

/// Print line totals and the cart total.
#[allow(clippy::print_stdout)]
pub fn total(store: &Store, currency_code: CurrencyCode, output: Output) -> Result<(), CliError> {
    let cart = store.cart();
    let summary = CartSummary::of(&cart, currency_code)?;

    match output {
        Output::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        Output::Table => print!("{}", render_summary(&cart, &summary)),
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_cart(cart: &[Product], output: Output) -> Result<(), CliError> {
    match output {
        Output::Json => println!("{}", serde_json::to_string_pretty(cart)?),
        Output::Table => print!("{}", render_cart(cart)),
    }
    Ok(())
}

/// One line per product: id, quantity and title.
fn render_cart(cart: &[Product]) -> String {
    if cart.is_empty() {
        return "Cart is empty\n".to_string();
    }

    let mut out = String::new();
    for item in cart {
        let _ = writeln!(out, "{:>6}  x{:<4} {}", item.id, item.amount, item.title);
    }
    out
}

fn render_summary(cart: &[Product], summary: &CartSummary) -> String {
    let mut out = String::new();
    for (item, line) in cart.iter().zip(&summary.lines) {
        let _ = writeln!(
            out,
            "{:>6}  x{:<4} {:<30} {:>12}",
            item.id,
            item.amount,
            item.title,
            line.subtotal.format()
        );
    }
    let _ = writeln!(
        out,
        "{} items, {} units, total {}",
        summary.items,
        summary.units,
        summary.total.format()
    );
    out
}
