//! Key/value storage backends
//!
//! The persistence engine works against two stores with different lifetimes:
//!
//! - the **tab store**, scoped to one editor tab (survives reloads of that tab,
//!   not shared with other tabs, gone when the tab closes). It holds the
//!   namespaced snapshots, the session id and the output cache.
//! - the **durable store**, shared across tabs and surviving restarts. It holds
//!   the fallback text, the legacy key and the auth token.
//!
//! Both are modelled by [`KeyValueStore`]. Implementations use interior
//! mutability so one store can be shared between the components that read and
//! write it.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use std::sync::Arc;

/// Minimal string key/value store with web-storage semantics.
pub trait KeyValueStore: Send + Sync + std::fmt::Debug {
    /// Read a value; `Ok(None)` when the key is absent.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a key. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// List every key currently present.
    fn keys(&self) -> Result<Vec<String>, StorageError>;
}

/// Shared handle to a store.
pub type SharedStore = Arc<dyn KeyValueStore>;

/// Errors raised by storage backends
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The write was rejected because the store is full.
    QuotaExceeded { key: String },
    /// Underlying I/O failed.
    Io(String),
    /// The store cannot be used at all (disabled, poisoned, ...).
    Unavailable(String),
}

impl StorageError {
    pub fn is_quota(&self) -> bool {
        matches!(self, StorageError::QuotaExceeded { .. })
    }
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::QuotaExceeded { key } => write!(f, "Storage quota exceeded writing {key}"),
            StorageError::Io(msg) => write!(f, "IO error: {msg}"),
            StorageError::Unavailable(msg) => write!(f, "Storage unavailable: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}
