//! Durable single-slot text backups
//!
//! [`FallbackStore`] keeps the raw current text in the durable store so a new
//! tab (or a tab whose primary snapshot was lost) still has something to
//! restore, and so the very first paint isn't an empty editor.
//! [`OutputCache`] keeps the last execution output for the tab.

use crate::services::storage::{SharedStore, StorageError};

#[derive(Debug, Clone)]
pub struct FallbackStore {
    durable: SharedStore,
    key: String,
}

impl FallbackStore {
    pub fn new(durable: SharedStore, key: impl Into<String>) -> Self {
        Self {
            durable,
            key: key.into(),
        }
    }

    /// Overwrite the slot. Errors are returned so the caller can warn the user.
    pub fn save_text(&self, text: &str) -> Result<(), StorageError> {
        self.durable.set(&self.key, text)
    }

    pub fn load_text(&self) -> Option<String> {
        match self.durable.get(&self.key) {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!("Reading fallback text failed: {}", e);
                None
            }
        }
    }

    pub fn clear(&self) {
        if let Err(e) = self.durable.remove(&self.key) {
            tracing::debug!("Failed to clear fallback text: {}", e);
        }
    }
}

/// Last execution output, kept for the lifetime of the tab
#[derive(Debug, Clone)]
pub struct OutputCache {
    tab: SharedStore,
    key: String,
}

impl OutputCache {
    pub fn new(tab: SharedStore, key: impl Into<String>) -> Self {
        Self {
            tab,
            key: key.into(),
        }
    }

    /// Store `output`; an empty output removes the entry
    pub fn save(&self, output: &str) {
        let result = if output.is_empty() {
            self.tab.remove(&self.key)
        } else {
            self.tab.set(&self.key, output)
        };
        if let Err(e) = result {
            tracing::debug!("Failed to cache output: {}", e);
        }
    }

    pub fn load(&self) -> Option<String> {
        self.tab
            .get(&self.key)
            .unwrap_or_else(|e| {
                tracing::debug!("Reading cached output failed: {}", e);
                None
            })
            .filter(|output| !output.is_empty())
    }

    pub fn clear(&self) {
        self.save("");
    }
}
