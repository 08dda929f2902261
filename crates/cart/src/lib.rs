//! Storefront Cart - client-side shopping cart store.
//!
//! Holds the shopper's cart in memory, validates every change against the
//! remote inventory and keeps a durable copy so the cart survives restarts.
//!
//! # Architecture
//!
//! - [`store`] - The [`CartStore`] and its operations
//! - [`inventory`] - Stock and product lookups ([`HttpInventoryClient`])
//! - [`storage`] - Durable key-value backends ([`FileStore`], [`MemoryStore`])
//! - [`notify`] - User-facing error messages ([`TracingSink`], [`ChannelSink`])
//! - [`config`] - Environment-based configuration

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod inventory;
pub mod notify;
pub mod storage;
pub mod store;

pub use config::{CartConfig, ConfigError, InventoryApiConfig};
pub use inventory::{HttpInventoryClient, InventoryError, InventoryService};
pub use notify::{ChannelSink, Notice, NotificationSink, TracingSink};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
pub use store::{
    CART_STORAGE_KEY, CartOutcome, CartStore, CartSummary, Failure, LineTotal, Operation,
    Rejection, SubscriptionId, UpdateProductAmount,
};
