//! Primary snapshot store
//!
//! Full editor snapshots, one namespaced key per session id, kept in the tab
//! store. Anything that fails validation on the way out (wrong schema, past
//! the TTL, unparsable JSON, undecodable payload) is deleted rather than
//! returned, so callers only ever see complete snapshots.

use super::codec::{Codec, CodecError, Encoded};
use super::identity::SessionId;
use crate::config::StorageKeys;
use crate::model::{EditorSnapshot, EditorState, Selection, SCHEMA_VERSION};
use crate::services::storage::{KeyValueStore, SharedStore, StorageError};
use crate::services::time_source::SharedTimeSource;
use std::time::Duration;

/// Where a restored state came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreSource {
    /// This tab's namespaced snapshot
    Primary,
    /// The pre-namespacing single key, migrated on read
    Legacy,
    /// The durable raw-text backup
    Fallback,
    /// A change notification from another tab
    CrossTab,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedSnapshot {
    pub state: EditorState,
    pub source: RestoreSource,
}

/// Why a stored entry was thrown away
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscardReason {
    Empty,
    Malformed(String),
    SchemaMismatch(u32),
    Expired,
    Corrupt(CodecError),
}

impl std::fmt::Display for DiscardReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiscardReason::Empty => write!(f, "empty entry"),
            DiscardReason::Malformed(e) => write!(f, "malformed snapshot: {e}"),
            DiscardReason::SchemaMismatch(v) => write!(f, "unsupported schema version {v}"),
            DiscardReason::Expired => write!(f, "snapshot expired"),
            DiscardReason::Corrupt(e) => write!(f, "corrupt payload: {e}"),
        }
    }
}

#[derive(Debug)]
pub struct PrimaryStore {
    /// Per-tab storage holding the namespaced snapshots
    tab: SharedStore,
    /// Cross-tab storage holding the legacy key
    durable: SharedStore,
    codec: Codec,
    keys: StorageKeys,
    ttl: Duration,
    time: SharedTimeSource,
}

impl PrimaryStore {
    pub fn new(
        tab: SharedStore,
        durable: SharedStore,
        codec: Codec,
        keys: StorageKeys,
        ttl: Duration,
        time: SharedTimeSource,
    ) -> Self {
        Self {
            tab,
            durable,
            codec,
            keys,
            ttl,
            time,
        }
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    pub fn state_key(&self, session_id: &SessionId) -> String {
        self.keys.state_key(session_id.as_str())
    }

    fn ttl_millis(&self) -> i64 {
        self.ttl.as_millis().min(i64::MAX as u128) as i64
    }

    /// Encode and write a snapshot of `state` for `session_id`
    pub fn save(
        &self,
        session_id: &SessionId,
        state: &EditorState,
    ) -> Result<EditorSnapshot, StorageError> {
        let encoded = self.codec.encode(&state.code).unwrap_or_else(|e| {
            tracing::warn!("Snapshot compression failed, storing raw text: {}", e);
            Encoded::raw(&state.code)
        });

        let snapshot = EditorSnapshot {
            schema_version: SCHEMA_VERSION,
            code: encoded.value,
            compressed: encoded.compressed,
            selection: Some(state.selection),
            scroll_top: state.scroll_top,
            updated_at: self.time.now_millis(),
            session_id: session_id.as_str().to_string(),
        };
        let json =
            serde_json::to_string(&snapshot).map_err(|e| StorageError::Io(e.to_string()))?;

        self.tab.set(&self.state_key(session_id), &json)?;
        tracing::trace!(
            "Saved snapshot for session {} ({} bytes, compressed: {})",
            session_id,
            json.len(),
            snapshot.compressed
        );
        Ok(snapshot)
    }

    /// Load this session's snapshot, migrating the legacy key if no
    /// namespaced entry exists.
    pub fn load(&self, session_id: &SessionId) -> Option<LoadedSnapshot> {
        let key = self.state_key(session_id);
        let raw = match self.tab.get(&key) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::debug!("Reading {} failed: {}", key, e);
                None
            }
        };

        match raw {
            Some(raw) if !raw.is_empty() => match self.decode_entry(&raw, true) {
                Ok(state) => Some(LoadedSnapshot {
                    state,
                    source: RestoreSource::Primary,
                }),
                Err(reason) => {
                    log_discard(&key, &reason);
                    self.remove_quietly(self.tab.as_ref(), &key);
                    None
                }
            },
            _ => self.migrate_legacy(session_id),
        }
    }

    /// Validate and decode a stored snapshot.
    ///
    /// `check_ttl` is off for entries that were just written by another tab.
    pub fn decode_entry(&self, raw: &str, check_ttl: bool) -> Result<EditorState, DiscardReason> {
        let snapshot = self.parse_entry(raw)?;
        if check_ttl && snapshot.is_expired(self.time.now_millis(), self.ttl_millis()) {
            return Err(DiscardReason::Expired);
        }

        let code = self
            .codec
            .decode(&snapshot.code, snapshot.compressed)
            .map_err(DiscardReason::Corrupt)?;
        let selection = snapshot
            .selection
            .unwrap_or_else(|| Selection::end_of(&code));
        Ok(EditorState::new(code, selection, snapshot.scroll_top))
    }

    fn parse_entry(&self, raw: &str) -> Result<EditorSnapshot, DiscardReason> {
        if raw.is_empty() {
            return Err(DiscardReason::Empty);
        }
        let snapshot: EditorSnapshot =
            serde_json::from_str(raw).map_err(|e| DiscardReason::Malformed(e.to_string()))?;
        if snapshot.schema_version != SCHEMA_VERSION {
            return Err(DiscardReason::SchemaMismatch(snapshot.schema_version));
        }
        Ok(snapshot)
    }

    fn migrate_legacy(&self, session_id: &SessionId) -> Option<LoadedSnapshot> {
        let legacy_key = &self.keys.legacy;
        let legacy = match self.durable.get(legacy_key) {
            Ok(Some(text)) => text,
            Ok(None) => return None,
            Err(e) => {
                tracing::debug!("Reading legacy key failed: {}", e);
                return None;
            }
        };

        let state = EditorState::from_text(legacy);
        match self.save(session_id, &state) {
            Ok(_) => {
                self.remove_quietly(self.durable.as_ref(), legacy_key);
                self.remove_quietly(self.tab.as_ref(), legacy_key);
                tracing::info!(
                    "Migrated legacy editor text ({} bytes) to session {}",
                    state.code.len(),
                    session_id
                );
            }
            Err(e) => {
                tracing::warn!("Legacy migration write failed, keeping legacy key: {}", e);
            }
        }

        Some(LoadedSnapshot {
            state,
            source: RestoreSource::Legacy,
        })
    }

    /// Delete every namespaced entry that is expired or malformed.
    ///
    /// Returns the number of entries removed.
    pub fn sweep_expired(&self) -> usize {
        let keys = match self.tab.keys() {
            Ok(keys) => keys,
            Err(e) => {
                tracing::debug!("Sweep skipped, cannot list keys: {}", e);
                return 0;
            }
        };

        let now = self.time.now_millis();
        let ttl = self.ttl_millis();
        let mut removed = 0;

        for key in keys.iter().filter(|k| k.starts_with(&self.keys.state_prefix)) {
            let verdict = match self.tab.get(key) {
                Ok(Some(raw)) => self.parse_entry(&raw).and_then(|snapshot| {
                    if snapshot.is_expired(now, ttl) {
                        Err(DiscardReason::Expired)
                    } else {
                        Ok(())
                    }
                }),
                Ok(None) => Err(DiscardReason::Empty),
                Err(_) => Err(DiscardReason::Empty),
            };

            if let Err(reason) = verdict {
                log_discard(key, &reason);
                self.remove_quietly(self.tab.as_ref(), key);
                removed += 1;
            }
        }

        if removed > 0 {
            tracing::info!("Swept {} stale editor snapshots", removed);
        }
        removed
    }

    /// Delete the snapshots of every session plus the legacy key.
    pub fn clear_all(&self) -> usize {
        let mut removed = 0;
        match self.tab.keys() {
            Ok(keys) => {
                for key in keys {
                    if key.starts_with(&self.keys.state_prefix) || key == self.keys.legacy {
                        self.remove_quietly(self.tab.as_ref(), &key);
                        removed += 1;
                    }
                }
            }
            Err(e) => tracing::debug!("Cannot list tab keys for clear: {}", e),
        }
        self.remove_quietly(self.durable.as_ref(), &self.keys.legacy);
        removed
    }

    fn remove_quietly(&self, store: &dyn KeyValueStore, key: &str) {
        if let Err(e) = store.remove(key) {
            tracing::debug!("Failed to remove {}: {}", key, e);
        }
    }
}

fn log_discard(key: &str, reason: &DiscardReason) {
    match reason {
        DiscardReason::Corrupt(_) => tracing::warn!("Discarding {}: {}", key, reason),
        _ => tracing::debug!("Discarding {}: {}", key, reason),
    }
}
