//! Debounced snapshot writes
//!
//! Every edit, selection change or scroll calls [`PersistenceScheduler::schedule_save`],
//! which replaces any pending candidate and restarts the quiet period
//! (trailing-edge debounce). The host drives the scheduler by calling
//! [`PersistenceScheduler::poll`] from its event loop; once the quiet period has
//! elapsed the candidate is compared against the last written state and, if it
//! differs, written to the primary store and mirrored as raw text into the
//! fallback store.
//!
//! A failed write leaves the candidate dropped: the next edit schedules a new
//! one, which is the retry.

use super::fallback::FallbackStore;
use super::identity::SessionId;
use super::primary::PrimaryStore;
use crate::model::EditorState;
use crate::services::storage::StorageError;
use crate::services::time_source::SharedTimeSource;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct PendingSave {
    state: EditorState,
    due: Instant,
}

/// Result of driving the scheduler once
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Nothing scheduled
    Idle,
    /// A save is scheduled but its quiet period hasn't elapsed
    Waiting,
    /// The candidate matched the last written state
    Skipped,
    Saved,
    Failed {
        error: StorageError,
        /// First quota failure since the last successful write
        warn_user: bool,
    },
}

#[derive(Debug)]
pub struct PersistenceScheduler {
    debounce: Duration,
    time: SharedTimeSource,
    pending: Option<PendingSave>,
    /// Last state known to be in the primary store (written or restored)
    last_saved: Option<EditorState>,
    quota_warned: bool,
}

impl PersistenceScheduler {
    pub fn new(debounce: Duration, time: SharedTimeSource) -> Self {
        Self {
            debounce,
            time,
            pending: None,
            last_saved: None,
            quota_warned: false,
        }
    }

    /// Replace the pending candidate and restart the quiet period
    pub fn schedule_save(&mut self, state: EditorState) {
        let due = self.time.now() + self.debounce;
        self.pending = Some(PendingSave { state, due });
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// When the pending save becomes due, if any
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.due)
    }

    /// Record a state as already persisted so an identical candidate is skipped
    pub fn seed(&mut self, state: EditorState) {
        self.last_saved = Some(state);
    }

    pub fn last_saved(&self) -> Option<&EditorState> {
        self.last_saved.as_ref()
    }

    /// Drop the pending candidate without writing it
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    /// Forget everything: pending save, dedup cache and warning state
    pub fn reset(&mut self) {
        self.pending = None;
        self.last_saved = None;
        self.quota_warned = false;
    }

    /// Write the pending candidate if its quiet period has elapsed
    pub fn poll(
        &mut self,
        session_id: &SessionId,
        primary: &PrimaryStore,
        fallback: &FallbackStore,
    ) -> SaveOutcome {
        match &self.pending {
            None => SaveOutcome::Idle,
            Some(pending) if self.time.now() < pending.due => SaveOutcome::Waiting,
            Some(_) => self.flush(session_id, primary, fallback),
        }
    }

    /// Write the pending candidate now, ignoring the quiet period
    pub fn flush(
        &mut self,
        session_id: &SessionId,
        primary: &PrimaryStore,
        fallback: &FallbackStore,
    ) -> SaveOutcome {
        let Some(pending) = self.pending.take() else {
            return SaveOutcome::Idle;
        };
        self.write(session_id, pending.state, primary, fallback)
    }

    fn write(
        &mut self,
        session_id: &SessionId,
        state: EditorState,
        primary: &PrimaryStore,
        fallback: &FallbackStore,
    ) -> SaveOutcome {
        if self.last_saved.as_ref() == Some(&state) {
            tracing::trace!("Snapshot unchanged, skipping save");
            return SaveOutcome::Skipped;
        }

        let mut failure = None;
        match primary.save(session_id, &state) {
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("Snapshot save failed for session {}: {}", session_id, e);
                failure = Some(e);
            }
        }
        if let Err(e) = fallback.save_text(&state.code) {
            tracing::warn!("Fallback text save failed: {}", e);
            failure.get_or_insert(e);
        }

        match failure {
            None => {
                self.quota_warned = false;
                self.last_saved = Some(state);
                SaveOutcome::Saved
            }
            Some(error) => {
                let warn_user = error.is_quota() && !self.quota_warned;
                if error.is_quota() {
                    self.quota_warned = true;
                }
                SaveOutcome::Failed { error, warn_user }
            }
        }
    }
}
