//! Local persistent storage for cached collections.
//!
//! A [`LocalStore`] is a durable key to JSON-text mapping on the device. Each
//! entity family keeps its cached collection as a JSON array under a single
//! key. Nothing outside the [`Serializer`] should touch a store directly once
//! repositories are running.

mod file;
mod memory;
mod serializer;

use async_trait::async_trait;
use std::path::PathBuf;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use serializer::Serializer;
pub(crate) use serializer::{load_collection, save_collection};

/// Errors raised by a local store backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error for {}: {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Durable key/value storage holding serialized record arrays.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Returns the raw stored value, or `None` if the key was never written.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: String) -> Result<(), StoreError>;

    /// Removes `key`. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Removes every key.
    async fn clear(&self) -> Result<(), StoreError>;
}
