//! In-memory store
//!
//! Backs the tab store in embedded hosts and every store in tests. An optional
//! byte quota reproduces the "storage full" rejection browsers raise.

use super::{KeyValueStore, StorageError};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MemoryInner {
    entries: BTreeMap<String, String>,
    /// Maximum total bytes (keys + values) the store accepts.
    quota_bytes: Option<usize>,
    /// Successful `set` calls since creation.
    writes: usize,
    /// When set, every operation fails with `Unavailable`.
    unavailable: bool,
}

impl MemoryInner {
    fn used_bytes_without(&self, key: &str) -> usize {
        self.entries
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

/// Thread-safe in-memory [`KeyValueStore`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a shared store.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Create a store that rejects writes once `quota_bytes` would be exceeded.
    pub fn with_quota(quota_bytes: usize) -> Self {
        let store = Self::new();
        store.lock().quota_bytes = Some(quota_bytes);
        store
    }

    /// Change (or lift) the quota after creation.
    pub fn set_quota(&self, quota_bytes: Option<usize>) {
        self.lock().quota_bytes = quota_bytes;
    }

    /// Make every subsequent operation fail, as a disabled storage would.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    /// Number of successful writes performed so far.
    pub fn write_count(&self) -> usize {
        self.lock().writes
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        // A panic while holding the lock leaves the map itself consistent
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_available(inner: &MemoryInner) -> Result<(), StorageError> {
        if inner.unavailable {
            return Err(StorageError::Unavailable("memory store disabled".to_string()));
        }
        Ok(())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let inner = self.lock();
        Self::check_available(&inner)?;
        Ok(inner.entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut inner = self.lock();
        Self::check_available(&inner)?;
        if let Some(quota) = inner.quota_bytes {
            let needed = inner.used_bytes_without(key) + key.len() + value.len();
            if needed > quota {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                });
            }
        }
        inner.entries.insert(key.to_string(), value.to_string());
        inner.writes += 1;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut inner = self.lock();
        Self::check_available(&inner)?;
        inner.entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        let inner = self.lock();
        Self::check_available(&inner)?;
        Ok(inner.entries.keys().cloned().collect())
    }
}
