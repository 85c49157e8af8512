//! Key-value store port
//!
//! The session is persisted entry by entry under fixed string keys, the way
//! a browser's local storage would hold it.

use async_trait::async_trait;

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Persistent string-to-string store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads a value.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Writes a value, replacing any previous one.
    ///
    /// # Errors
    /// Returns an error if the value cannot be persisted.
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removes a value. Returns whether the key was present.
    ///
    /// # Errors
    /// Returns an error if the removal cannot be persisted.
    async fn remove(&self, key: &str) -> Result<bool, StoreError>;
}
