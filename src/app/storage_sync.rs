//! Cross-tab storage notifications.
//!
//! Other tabs writing the same stores show up here as [`StorageChange`]s. A
//! write to this tab's snapshot key replaces the editor state (last writer
//! wins, no merge); removal of the auth token is a logout and wipes
//! everything.

use super::{CompilerSession, LifecycleState};
use crate::services::session::RestoreSource;

/// A key changed in one of the stores, outside this controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageChange {
    pub key: String,
    /// `None` when the key was removed
    pub new_value: Option<String>,
}

impl StorageChange {
    pub fn set(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            new_value: Some(value.into()),
        }
    }

    pub fn removed(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            new_value: None,
        }
    }
}

impl CompilerSession {
    /// Apply a change notification. Returns true if editor state changed.
    ///
    /// Applying the same notification twice is harmless.
    pub fn handle_external_change(&mut self, change: &StorageChange) -> bool {
        if self.lifecycle == LifecycleState::Unmounted {
            return false;
        }

        let logged_out = change.key == self.config.keys.auth_token
            && change.new_value.as_deref().is_none_or(str::is_empty);
        if logged_out {
            tracing::info!("Auth token removed in another tab, wiping editor state");
            self.wipe();
            return true;
        }

        let Some(session_id) = &self.session_id else {
            return false;
        };
        if change.key != self.primary.state_key(session_id) {
            return false;
        }
        let Some(raw) = change.new_value.as_deref().filter(|v| !v.is_empty()) else {
            return false;
        };

        // Just written by the other tab, so the TTL doesn't apply
        match self.primary.decode_entry(raw, false) {
            Ok(state) => {
                tracing::debug!(
                    "Merged {} bytes from another tab into session {}",
                    state.code.len(),
                    session_id
                );
                self.scheduler.cancel();
                self.scheduler.seed(state.clone());
                self.apply_state(state);
                self.restored_from = Some(RestoreSource::CrossTab);
                if self.lifecycle == LifecycleState::Cleared {
                    self.lifecycle = LifecycleState::Active;
                }
                true
            }
            Err(reason) => {
                tracing::debug!("Ignoring external change to {}: {}", change.key, reason);
                false
            }
        }
    }
}
