//! Durable key-value storage for the cart snapshot.
//!
//! The cart store only needs two operations: read the raw value stored
//! under a key and overwrite it. Backends decide where the bytes live.
//!
//! - [`MemoryStore`] - process memory; shared between clones
//! - [`FileStore`] - one JSON file per key, replaced atomically

mod file;
mod memory;

use std::sync::Arc;

use thiserror::Error;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Errors from a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Value could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backend refused the operation.
    ///
    /// Not produced by the bundled backends; for implementations over
    /// quota-limited or read-only media.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// A durable string key-value store.
///
/// Methods take `&self`; implementations use interior mutability.
pub trait KeyValueStore: Send + Sync {
    /// Read the value under `key`.
    ///
    /// Returns `Ok(None)` if the key does not exist.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the value under `key`.
    ///
    /// Either the whole new value is stored or the old one is kept.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }
}
