// Shared helpers for integration tests
#![allow(dead_code)]

pub mod tracing;

use compiler_session::app::{CompilerSession, NavigationType};
use compiler_session::config::Config;
use compiler_session::model::{EditorSnapshot, Selection};
use compiler_session::services::session::{Codec, SaveOutcome};
use compiler_session::services::storage::{KeyValueStore, MemoryStore};
use compiler_session::services::time_source::TestTimeSource;
use std::sync::Arc;
use std::time::Duration;

/// One simulated browser tab: its own tab store, a durable store that may be
/// shared with other tabs, and a controllable clock.
pub struct TestTab {
    pub session: CompilerSession,
    pub tab: Arc<MemoryStore>,
    pub durable: Arc<MemoryStore>,
    pub time: Arc<TestTimeSource>,
}

impl TestTab {
    /// Fresh tab over empty stores, not yet mounted
    pub fn new() -> Self {
        Self::with_stores(
            MemoryStore::shared(),
            MemoryStore::shared(),
            TestTimeSource::shared(),
        )
    }

    pub fn with_stores(
        tab: Arc<MemoryStore>,
        durable: Arc<MemoryStore>,
        time: Arc<TestTimeSource>,
    ) -> Self {
        self::tracing::init_tracing_from_env();
        let mut session =
            CompilerSession::new(Config::default(), tab.clone(), durable.clone(), time.clone());
        let viewport = session.viewport_mut();
        viewport.metrics.line_height = Some(24.0);
        viewport.client_height = 200.0;
        viewport.scroll_height = 2000.0;
        Self {
            session,
            tab,
            durable,
            time,
        }
    }

    /// Fresh tab, mounted by a plain navigation
    pub fn mounted() -> Self {
        let mut tab = Self::new();
        tab.session.mount(NavigationType::Navigate);
        tab
    }

    /// Reload this tab: same tab and durable stores, new controller
    pub fn reload(self) -> Self {
        self.session_reloaded(NavigationType::Reload)
    }

    pub fn session_reloaded(self, navigation: NavigationType) -> Self {
        let mut next = Self::with_stores(self.tab, self.durable, self.time);
        next.session.mount(navigation);
        next
    }

    /// Open a new tab of the same origin: new tab store, shared durable store
    pub fn open_new_tab(&self) -> Self {
        let mut next = Self::with_stores(
            MemoryStore::shared(),
            self.durable.clone(),
            self.time.clone(),
        );
        next.session.mount(NavigationType::Navigate);
        next
    }

    /// Replace the text with `text`, caret at end
    pub fn type_text(&mut self, text: &str) {
        self.session.edit(text, Selection::end_of(text));
    }

    /// Let `duration` pass and drive the controller once
    pub fn wait(&mut self, duration: Duration) -> SaveOutcome {
        self.time.advance(duration);
        self.session.tick()
    }

    pub fn state_key(&self) -> String {
        let id = self
            .session
            .session_id()
            .expect("session id assigned on mount");
        format!("compiler:state:{}", id)
    }

    /// The snapshot currently stored for this tab's session
    pub fn stored_snapshot(&self) -> Option<EditorSnapshot> {
        let raw = self.tab.get(&self.state_key()).unwrap()?;
        Some(serde_json::from_str(&raw).expect("stored snapshot is valid JSON"))
    }

    /// Decoded text of the stored snapshot
    pub fn stored_code(&self) -> Option<String> {
        let snapshot = self.stored_snapshot()?;
        Some(
            Codec::detect(true, 3)
                .decode(&snapshot.code, snapshot.compressed)
                .expect("stored code decodes"),
        )
    }

    pub fn fallback_text(&self) -> Option<String> {
        self.durable.get("compiler:code-fallback").unwrap()
    }
}

/// `n` numbered lines joined by newlines
pub fn numbered_lines(n: usize) -> String {
    (1..=n)
        .map(|i| format!("System.out.println({i});"))
        .collect::<Vec<_>>()
        .join("\n")
}

pub const SAVE_WAIT: Duration = Duration::from_millis(2600);
pub const DAY: Duration = Duration::from_secs(24 * 60 * 60);
