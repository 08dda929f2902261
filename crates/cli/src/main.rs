//! Storefront Cart CLI - Inspect and edit the local cart.
//!
//! # Usage
//!
//! ```bash
//! # Show the cart
//! cart-cli show
//!
//! # Add one unit of product 1
//! cart-cli add 1
//!
//! # Set product 1 to three units
//! cart-cli update 1 3
//!
//! # Remove product 1
//! cart-cli remove 1
//!
//! # Cart total in Brazilian reais, as JSON
//! cart-cli --json total --currency brl
//! ```
//!
//! # Commands
//!
//! - `show` - Print the saved cart
//! - `add` / `update` - Change the cart (validated against inventory)
//! - `remove` - Remove a product (works without `CART_API_URL`)
//! - `total` - Print line totals and the cart total

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand, ValueEnum};
use sentry::integrations::tracing as sentry_tracing;
use storefront_cart::CartConfig;
use storefront_cart_core::{CurrencyCode, ProductId};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "cart-cli")]
#[command(author, version, about = "Storefront cart tools")]
struct Cli {
    /// Print JSON instead of a table
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the saved cart
    Show,
    /// Add one unit of a product
    Add {
        /// Product ID
        product_id: ProductId,
    },
    /// Remove a product from the cart
    Remove {
        /// Product ID
        product_id: ProductId,
    },
    /// Set a product's quantity
    Update {
        /// Product ID
        product_id: ProductId,

        /// New quantity
        #[arg(allow_negative_numbers = true)]
        amount: i64,
    },
    /// Print line totals and the cart total
    Total {
        /// Currency used to format prices
        #[arg(short, long, value_enum, default_value = "usd")]
        currency: Currency,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Currency {
    Usd,
    Eur,
    Gbp,
    Cad,
    Aud,
    Brl,
}

impl From<Currency> for CurrencyCode {
    fn from(currency: Currency) -> Self {
        match currency {
            Currency::Usd => Self::USD,
            Currency::Eur => Self::EUR,
            Currency::Gbp => Self::GBP,
            Currency::Cad => Self::CAD,
            Currency::Aud => Self::AUD,
            Currency::Brl => Self::BRL,
        }
    }
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &CartConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Configuration is loaded before tracing so Sentry can be initialized first
    let config = CartConfig::from_env();
    let _sentry_guard = config.as_ref().ok().and_then(init_sentry);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "storefront_cart=info,storefront_cart_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let result = match config {
        Ok(config) => run(cli, &config).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: &CartConfig) -> Result<(), commands::CliError> {
    let needs_inventory = matches!(cli.command, Commands::Add { .. } | Commands::Update { .. });
    let store = commands::open_store(config, needs_inventory)?;
    let output = if cli.json {
        commands::Output::Json
    } else {
        commands::Output::Table
    };

    match cli.command {
        Commands::Show => commands::show(&store, output)?,
        Commands::Add { product_id } => {
            let outcome = store.add_product(product_id).await;
            commands::report(&outcome, output)?;
        }
        Commands::Remove { product_id } => {
            let outcome = store.remove_product(product_id);
            commands::report(&outcome, output)?;
        }
        Commands::Update { product_id, amount } => {
            let outcome = store
                .update_product_amount(storefront_cart::UpdateProductAmount::new(
                    product_id, amount,
                ))
                .await;
            commands::report(&outcome, output)?;
        }
        Commands::Total { currency } => commands::total(&store, currency.into(), output)?,
    }
    Ok(())
}
