//! Editor session controller
//!
//! [`CompilerSession`] owns one editor instance's persistence: it restores the
//! last state on mount, feeds every change through the viewport follower and
//! the save scheduler, backs the text up on hide/unload, and reacts to storage
//! changes made by other tabs.
//!
//! All state lives on the instance, so several sessions can run side by side
//! (tests do this to simulate duplicated tabs). The host drives deferred work by
//! calling [`CompilerSession::tick`] from its event loop.

mod editing_actions;
mod notice;
mod run_actions;
mod storage_sync;

pub use notice::{Notice, NoticeLevel};
pub use storage_sync::StorageChange;

use crate::config::Config;
use crate::model::{EditorState, Selection};
use crate::services::execution::ExecutionStatus;
use crate::services::session::{
    get_or_create_session_id, Codec, FallbackStore, LoadedSnapshot, OutputCache,
    PersistenceScheduler, PrimaryStore, RestoreSource, SessionId,
};
use crate::services::storage::SharedStore;
use crate::services::time_source::SharedTimeSource;
use crate::view::viewport::{Viewport, ViewportFollower};
use std::time::Instant;

/// Controller lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
    #[default]
    Uninitialized,
    Restoring,
    Active,
    Cleared,
    Unmounted,
}

/// How the page was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NavigationType {
    #[default]
    Navigate,
    Reload,
    BackForward,
    Prerender,
}

impl NavigationType {
    /// Parse the browser's navigation timing type; unknown values count as a
    /// plain navigation.
    pub fn from_timing_type(value: &str) -> Self {
        match value {
            "reload" => NavigationType::Reload,
            "back_forward" => NavigationType::BackForward,
            "prerender" => NavigationType::Prerender,
            _ => NavigationType::Navigate,
        }
    }
}

#[derive(Debug)]
pub struct CompilerSession {
    config: Config,

    primary: PrimaryStore,
    fallback: FallbackStore,
    output_cache: OutputCache,
    /// Tab store, for the session id
    tab: SharedStore,

    scheduler: PersistenceScheduler,
    follower: ViewportFollower,
    viewport: Viewport,

    session_id: Option<SessionId>,
    lifecycle: LifecycleState,
    state: EditorState,
    restored_from: Option<RestoreSource>,

    /// Next content change came from Enter and may scroll smoothly
    prefer_smooth_next: bool,

    /// Output area text; empty means the idle placeholder is shown
    output: String,
    status: ExecutionStatus,
    is_running: bool,

    notices: Vec<Notice>,
    /// A quota notice was already shown for the current run of failed
    /// fallback backups
    fallback_quota_warned: bool,
}

impl CompilerSession {
    /// Build a controller over the tab and durable stores.
    ///
    /// The initial text is the durable fallback (if any), so the first paint
    /// isn't empty while the richer snapshot is restored by [`Self::mount`].
    pub fn new(
        config: Config,
        tab: SharedStore,
        durable: SharedStore,
        time: SharedTimeSource,
    ) -> Self {
        let codec = Codec::detect(
            config.persistence.compression,
            config.persistence.compression_level,
        );
        let primary = PrimaryStore::new(
            tab.clone(),
            durable.clone(),
            codec,
            config.keys.clone(),
            config.persistence.state_ttl(),
            time.clone(),
        );
        let fallback = FallbackStore::new(durable, config.keys.fallback.clone());
        let output_cache = OutputCache::new(tab.clone(), config.keys.output.clone());
        let scheduler =
            PersistenceScheduler::new(config.persistence.save_debounce(), time.clone());
        let follower = ViewportFollower::new(config.viewport.clone(), time.clone());

        let state = fallback
            .load_text()
            .map(EditorState::from_text)
            .unwrap_or_default();

        Self {
            config,
            primary,
            fallback,
            output_cache,
            tab,
            scheduler,
            follower,
            viewport: Viewport::default(),
            session_id: None,
            lifecycle: LifecycleState::Uninitialized,
            state,
            restored_from: None,
            prefer_smooth_next: false,
            output: String::new(),
            status: ExecutionStatus::Idle,
            is_running: false,
            notices: Vec::new(),
            fallback_quota_warned: false,
        }
    }

    /// Restore the previous state of this tab.
    ///
    /// Sweeps stale snapshots, applies the output rule for `navigation` and
    /// loads the namespaced snapshot, then the legacy key, then the fallback
    /// text. Returns where the restored state came from, if anywhere.
    pub fn mount(&mut self, navigation: NavigationType) -> Option<RestoreSource> {
        if self.lifecycle == LifecycleState::Active {
            tracing::debug!("Session already mounted, ignoring mount");
            return self.restored_from;
        }
        let started = Instant::now();
        self.lifecycle = LifecycleState::Restoring;

        let session_id = self.ensure_session_id();
        self.primary.sweep_expired();

        if navigation == NavigationType::Reload {
            // Reload starts the output area fresh
            self.output_cache.clear();
            self.output.clear();
            self.status = ExecutionStatus::Idle;
        } else if let Some(cached) = self.output_cache.load() {
            self.output = cached;
        }

        let loaded = self.primary.load(&session_id).or_else(|| {
            self.fallback.load_text().map(|text| LoadedSnapshot {
                state: EditorState::from_text(text),
                source: RestoreSource::Fallback,
            })
        });

        self.restored_from = loaded.as_ref().map(|l| l.source);
        if let Some(LoadedSnapshot { state, source }) = loaded {
            tracing::info!(
                "Restored {} bytes from {:?} for session {} in {:?}",
                state.code.len(),
                source,
                session_id,
                started.elapsed()
            );
            self.apply_state(state.clone());
            self.scheduler.seed(state);
        }

        self.lifecycle = LifecycleState::Active;
        self.restored_from
    }

    /// Forget everything: every session's snapshot, the fallback text, the
    /// legacy key and the output.
    pub fn clear(&mut self) {
        let removed = self.wipe();
        tracing::info!("Compiler cleared ({} snapshots removed)", removed);
        self.notices.push(Notice::cleared());
    }

    /// Delete stale snapshots of any session. [`Self::mount`] already does
    /// this; hosts with long-lived tabs may call it periodically.
    pub fn sweep_expired(&self) -> usize {
        self.primary.sweep_expired()
    }

    fn wipe(&mut self) -> usize {
        let removed = self.primary.clear_all();
        self.fallback.clear();
        self.output_cache.clear();
        self.scheduler.reset();
        self.fallback_quota_warned = false;

        self.state = EditorState::default();
        self.viewport.set_scroll_top(0.0);
        self.prefer_smooth_next = false;
        self.output.clear();
        self.status = ExecutionStatus::Idle;
        self.lifecycle = LifecycleState::Cleared;
        removed
    }

    fn ensure_session_id(&mut self) -> SessionId {
        if let Some(id) = &self.session_id {
            return id.clone();
        }
        let id = get_or_create_session_id(self.tab.as_ref(), &self.config.keys.session_id);
        self.session_id = Some(id.clone());
        id
    }

    /// Replace the editor state (restore or cross-tab merge)
    fn apply_state(&mut self, state: EditorState) {
        self.viewport.set_scroll_top(f64::from(state.scroll_top));
        self.state = state;
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn lifecycle(&self) -> LifecycleState {
        self.lifecycle
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn code(&self) -> &str {
        &self.state.code
    }

    pub fn selection(&self) -> Selection {
        self.state.selection
    }

    pub fn scroll_top(&self) -> u32 {
        self.state.scroll_top
    }

    pub fn restored_from(&self) -> Option<RestoreSource> {
        self.restored_from
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Host-side geometry updates (metrics, reduced motion). Use
    /// [`Self::resize`] when the visible height changes.
    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    /// Raw output text; empty while idle
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Output as displayed, with the idle placeholder
    pub fn display_output(&self) -> &str {
        if self.output.is_empty() {
            crate::services::execution::IDLE_OUTPUT
        } else {
            &self.output
        }
    }

    pub fn status(&self) -> ExecutionStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    pub fn has_pending_save(&self) -> bool {
        self.scheduler.has_pending()
    }

    /// When the host should call [`Self::tick`] next, if a save is pending
    pub fn next_save_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    /// Drain queued notices
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }
}
