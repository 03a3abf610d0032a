//! Input handling and save driving for the controller.
//!
//! This module contains the per-event entry points the host calls:
//! - Content, selection and scroll changes
//! - Key-down tracking for smooth scrolling on Enter
//! - Viewport resizes
//! - The periodic tick that writes due snapshots
//! - Hide/unload/unmount backstops

use super::{CompilerSession, LifecycleState, Notice};
use crate::model::{EditorState, Selection};
use crate::services::session::SaveOutcome;
use crate::view::viewport::ScrollAdjustment;

impl CompilerSession {
    /// The text changed. Keeps the caret in view and schedules a save.
    pub fn edit(&mut self, text: impl Into<String>, selection: Selection) -> Option<ScrollAdjustment> {
        if self.lifecycle == LifecycleState::Unmounted {
            tracing::debug!("Ignoring edit after unmount");
            return None;
        }
        if self.lifecycle == LifecycleState::Cleared {
            self.lifecycle = LifecycleState::Active;
        }

        let prefer_smooth = std::mem::take(&mut self.prefer_smooth_next);
        self.state = EditorState::new(text, selection, self.state.scroll_top);

        let adjustment = self.follower.ensure_caret_visible(
            &mut self.viewport,
            &self.state.code,
            self.state.selection.start,
            prefer_smooth,
        );
        self.sync_scroll_from_viewport();
        self.schedule_save();
        adjustment
    }

    /// Selection moved without a text change (arrow keys, clicks, Ctrl+End)
    pub fn select(&mut self, selection: Selection) -> Option<ScrollAdjustment> {
        if self.lifecycle == LifecycleState::Unmounted {
            return None;
        }
        self.state.selection = selection.clamped_to(&self.state.code);

        let adjustment = self.follower.ensure_caret_visible(
            &mut self.viewport,
            &self.state.code,
            self.state.selection.start,
            false,
        );
        self.sync_scroll_from_viewport();
        self.schedule_save();
        adjustment
    }

    /// The user scrolled the text area
    pub fn scroll(&mut self, scroll_top: f64) {
        if self.lifecycle == LifecycleState::Unmounted {
            return;
        }
        self.viewport.set_scroll_top(scroll_top.max(0.0));
        self.sync_scroll_from_viewport();
        self.schedule_save();
    }

    /// A key went down in the text area. Enter marks the next content change
    /// as a deliberate jump that may scroll smoothly.
    pub fn key_down(&mut self, key: &str) {
        if key == "Enter" {
            self.prefer_smooth_next = true;
        }
    }

    /// The text area changed size
    pub fn resize(&mut self, client_height: f64, scroll_height: f64) -> Option<ScrollAdjustment> {
        self.viewport.client_height = client_height;
        self.viewport.scroll_height = scroll_height;
        let adjustment = self.follower.ensure_caret_visible(
            &mut self.viewport,
            &self.state.code,
            self.state.selection.start,
            false,
        );
        if adjustment.is_some() {
            self.sync_scroll_from_viewport();
        }
        adjustment
    }

    /// Write the pending snapshot if its quiet period has elapsed.
    ///
    /// Call this from the host's event loop; [`Self::next_save_deadline`] says
    /// when it has work to do.
    pub fn tick(&mut self) -> SaveOutcome {
        let Some(session_id) = self.session_id.clone() else {
            return SaveOutcome::Idle;
        };
        let outcome = self
            .scheduler
            .poll(&session_id, &self.primary, &self.fallback);
        self.note_save_outcome(&outcome);
        outcome
    }

    /// Write the pending snapshot now, ignoring the quiet period
    pub fn flush(&mut self) -> SaveOutcome {
        let Some(session_id) = self.session_id.clone() else {
            return SaveOutcome::Idle;
        };
        let outcome = self
            .scheduler
            .flush(&session_id, &self.primary, &self.fallback);
        self.note_save_outcome(&outcome);
        outcome
    }

    /// The tab was hidden. Backs the raw text up without waiting.
    pub fn hide(&mut self) {
        self.write_fallback_now();
    }

    /// The page is about to unload
    pub fn before_unload(&mut self) {
        self.write_fallback_now();
    }

    /// Tear down: drop the pending save and back the text up one last time
    pub fn unmount(&mut self) {
        if self.lifecycle == LifecycleState::Unmounted {
            return;
        }
        self.scheduler.cancel();
        self.write_fallback_now();
        self.lifecycle = LifecycleState::Unmounted;
        tracing::debug!("Session unmounted");
    }

    pub(super) fn schedule_save(&mut self) {
        // The id is created lazily so edits before mount still land somewhere
        self.ensure_session_id();
        self.scheduler.schedule_save(self.state.clone());
    }

    fn sync_scroll_from_viewport(&mut self) {
        self.state.scroll_top = self.viewport.scroll_top.max(0.0).round() as u32;
    }

    fn write_fallback_now(&mut self) {
        match self.fallback.save_text(&self.state.code) {
            Ok(()) => self.fallback_quota_warned = false,
            Err(e) => {
                tracing::warn!("Fallback backup failed: {}", e);
                if e.is_quota() && !self.fallback_quota_warned {
                    self.fallback_quota_warned = true;
                    self.notices.push(Notice::storage_full());
                }
            }
        }
    }

    fn note_save_outcome(&mut self, outcome: &SaveOutcome) {
        if let SaveOutcome::Failed {
            warn_user: true, ..
        } = outcome
        {
            self.notices.push(Notice::storage_full());
        }
    }
}
