//! Per-tab session identity
//!
//! A random id generated once per tab and cached in the tab store, so it
//! survives reloads of that tab while duplicated or new tabs get their own.

use crate::services::storage::KeyValueStore;

/// Stable identifier of one editor tab
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random id
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Return the tab's session id, generating and caching one on first use.
///
/// If the tab store cannot be read or written the generated id is still
/// returned; it just won't survive a reload.
pub fn get_or_create_session_id(store: &dyn KeyValueStore, key: &str) -> SessionId {
    match store.get(key) {
        Ok(Some(existing)) if !existing.is_empty() => return SessionId(existing),
        Ok(_) => {}
        Err(e) => tracing::debug!("Session id lookup failed: {}", e),
    }

    let id = SessionId::generate();
    if let Err(e) = store.set(key, id.as_str()) {
        tracing::warn!("Failed to persist session id {}: {}", id, e);
    } else {
        tracing::debug!("Generated session id {}", id);
    }
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::storage::MemoryStore;

    const KEY: &str = "compiler:session-id";

    #[test]
    fn test_idempotent_within_one_tab() {
        let tab = MemoryStore::new();
        let first = get_or_create_session_id(&tab, KEY);
        let second = get_or_create_session_id(&tab, KEY);
        assert_eq!(first, second);
        assert_eq!(tab.get(KEY).unwrap().as_deref(), Some(first.as_str()));
    }

    #[test]
    fn test_distinct_tabs_get_distinct_ids() {
        let a = get_or_create_session_id(&MemoryStore::new(), KEY);
        let b = get_or_create_session_id(&MemoryStore::new(), KEY);
        assert_ne!(a, b);
    }

    #[test]
    fn test_reuses_preseeded_id() {
        let tab = MemoryStore::new();
        tab.set(KEY, "test-session").unwrap();
        assert_eq!(get_or_create_session_id(&tab, KEY).as_str(), "test-session");
    }

    #[test]
    fn test_unavailable_store_still_yields_an_id() {
        let tab = MemoryStore::new();
        tab.set_unavailable(true);
        let id = get_or_create_session_id(&tab, KEY);
        assert!(!id.as_str().is_empty());
    }
}
