// Integration tests - driving the session controller through full tab lifecycles

mod common;

use common::{numbered_lines, TestTab, DAY, SAVE_WAIT};
use compiler_session::app::{
    CompilerSession, LifecycleState, NavigationType, Notice, StorageChange,
};
use compiler_session::config::Config;
use compiler_session::model::Selection;
use compiler_session::services::execution::IDLE_OUTPUT;
use compiler_session::services::session::{RestoreSource, SaveOutcome};
use compiler_session::services::storage::{FileStore, KeyValueStore};
use compiler_session::services::time_source::{TestTimeSource, TimeSource};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn test_typing_then_pause_persists_snapshot_and_fallback() {
    let mut t = TestTab::mounted();
    t.type_text("class Debounced {}");

    assert_eq!(t.wait(SAVE_WAIT), SaveOutcome::Saved);

    let snapshot = t.stored_snapshot().expect("snapshot written");
    assert_eq!(snapshot.schema_version, 1);
    assert_eq!(
        snapshot.session_id,
        t.session.session_id().unwrap().as_str()
    );
    assert_eq!(t.stored_code().as_deref(), Some("class Debounced {}"));
    assert_eq!(t.fallback_text().as_deref(), Some("class Debounced {}"));
}

#[test]
fn test_snapshot_json_carries_compressed_flag() {
    let mut t = TestTab::mounted();
    t.type_text("class Debounced {}");
    t.wait(SAVE_WAIT);

    let raw = t.tab.get(&t.state_key()).unwrap().unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert!(json["compressed"].is_boolean());
    assert!(json["code"].is_string());
    assert!(json["updatedAt"].is_i64());
}

#[test]
fn test_no_write_inside_debounce_window() {
    let mut t = TestTab::mounted();
    for (i, text) in ["c", "cl", "cla", "clas", "class"].iter().enumerate() {
        t.type_text(text);
        if i < 4 {
            assert_eq!(t.wait(Duration::from_millis(500)), SaveOutcome::Waiting);
        }
    }
    assert_eq!(t.tab.write_count(), 1); // session id only

    t.wait(SAVE_WAIT);
    assert_eq!(t.stored_code().as_deref(), Some("class"));
    assert_eq!(t.tab.write_count(), 2);
}

#[test]
fn test_identical_saves_write_once() {
    let mut t = TestTab::mounted();
    t.type_text("class Same {}");
    t.wait(SAVE_WAIT);
    let writes = t.tab.write_count();

    t.type_text("class Same {}");
    assert_eq!(t.wait(SAVE_WAIT), SaveOutcome::Skipped);
    assert_eq!(t.tab.write_count(), writes);
}

#[test]
fn test_reload_restores_text_selection_and_scroll() {
    let mut t = TestTab::mounted();
    let text = numbered_lines(50);
    t.session.edit(text.as_str(), Selection::new(10, 20));
    t.session.scroll(240.0);
    t.wait(SAVE_WAIT);

    let t = t.session_reloaded(NavigationType::Navigate);
    assert_eq!(t.session.restored_from(), Some(RestoreSource::Primary));
    assert_eq!(t.session.code(), text);
    assert_eq!(t.session.selection(), Selection::new(10, 20));
    assert_eq!(t.session.scroll_top(), 240);
    assert_eq!(t.session.viewport().gutter_scroll_top, 240.0);
}

#[test]
fn test_restore_seeds_dedup() {
    let mut t = TestTab::mounted();
    t.type_text("class Seeded {}");
    t.wait(SAVE_WAIT);

    let mut t = t.reload();
    let writes = t.tab.write_count();
    t.type_text("class Seeded {}");
    assert_eq!(t.wait(SAVE_WAIT), SaveOutcome::Skipped);
    assert_eq!(t.tab.write_count(), writes);
}

#[test]
fn test_fallback_restores_when_no_snapshot() {
    let t = TestTab::new();
    t.durable
        .set("compiler:code-fallback", "class Restored {}")
        .unwrap();
    let mut t = TestTab::with_stores(t.tab, t.durable, t.time);

    assert_eq!(
        t.session.mount(NavigationType::Navigate),
        Some(RestoreSource::Fallback)
    );
    assert_eq!(t.session.code(), "class Restored {}");
    assert_eq!(t.session.selection(), Selection::caret(17));
}

#[test]
fn test_new_tab_gets_fallback_not_other_tabs_snapshot() {
    let mut first = TestTab::mounted();
    first.type_text("class First {}");
    first.wait(SAVE_WAIT);

    let second = first.open_new_tab();
    assert_ne!(second.session.session_id(), first.session.session_id());
    assert_eq!(second.session.restored_from(), Some(RestoreSource::Fallback));
    assert_eq!(second.session.code(), "class First {}");
}

#[test]
fn test_duplicated_tabs_do_not_clobber_each_other() {
    let mut a = TestTab::mounted();
    a.type_text("class A {}");
    a.wait(SAVE_WAIT);

    // Both tabs write the same shared tab store under different ids
    let mut b = TestTab::with_stores(a.tab.clone(), a.durable.clone(), a.time.clone());
    b.tab.remove("compiler:session-id").unwrap();
    b.session.mount(NavigationType::Navigate);
    b.type_text("class B {}");
    b.wait(SAVE_WAIT);

    assert_ne!(a.state_key(), b.state_key());
    assert_eq!(a.stored_code().as_deref(), Some("class A {}"));
    assert_eq!(b.stored_code().as_deref(), Some("class B {}"));
}

#[test]
fn test_reload_clears_cached_output() {
    let t = TestTab::new();
    t.tab.set("compiler:output", "Previous output").unwrap();
    let t = t.session_reloaded(NavigationType::Reload);

    assert_eq!(t.session.output(), "");
    assert_eq!(t.session.display_output(), IDLE_OUTPUT);
    assert_eq!(t.tab.get("compiler:output").unwrap(), None);
}

#[test]
fn test_navigation_keeps_cached_output() {
    let t = TestTab::new();
    t.tab.set("compiler:output", "Previous output").unwrap();
    let t = t.session_reloaded(NavigationType::BackForward);

    assert_eq!(t.session.display_output(), "Previous output");
}

#[test]
fn test_clear_wipes_editor_and_fallback() {
    let mut t = TestTab::mounted();
    t.type_text("class ClearMe {}");
    t.wait(SAVE_WAIT);
    t.session.scroll(48.0);

    t.session.clear();

    assert_eq!(t.session.code(), "");
    assert_eq!(t.session.selection(), Selection::caret(0));
    assert_eq!(t.session.scroll_top(), 0);
    assert_eq!(t.fallback_text(), None);
    assert_eq!(t.stored_snapshot(), None);
    assert_eq!(t.session.lifecycle(), LifecycleState::Cleared);
    assert_eq!(t.session.take_notices(), vec![Notice::cleared()]);

    // Pending scroll save was dropped with everything else
    assert_eq!(t.wait(SAVE_WAIT), SaveOutcome::Idle);
}

#[test]
fn test_clear_removes_every_session_and_legacy_key() {
    let mut a = TestTab::mounted();
    a.type_text("class A {}");
    a.wait(SAVE_WAIT);
    a.tab.set("compiler:state:orphan", "{}").unwrap();
    a.durable.set("compiler:code", "legacy").unwrap();

    a.session.clear();

    let leftover: Vec<_> = a
        .tab
        .keys()
        .unwrap()
        .into_iter()
        .filter(|k| k.starts_with("compiler:state:"))
        .collect();
    assert!(leftover.is_empty());
    assert_eq!(a.durable.get("compiler:code").unwrap(), None);
}

#[test]
fn test_enter_on_last_of_200_lines_scrolls_into_view() {
    let mut t = TestTab::mounted();
    let text = numbered_lines(200);
    t.session.edit(text.as_str(), Selection::caret(0));
    t.session.scroll(0.0);
    assert_eq!(t.session.scroll_top(), 0);

    t.session.key_down("Enter");
    let with_newline = format!("{text}\n");
    t.session
        .edit(with_newline.as_str(), Selection::end_of(&with_newline));

    assert!(t.session.scroll_top() > 0);
    assert_eq!(
        t.session.viewport().gutter_scroll_top,
        t.session.viewport().scroll_top
    );
}

#[test]
fn test_expired_snapshot_is_dropped_on_mount() {
    let mut t = TestTab::mounted();
    t.type_text("class Old {}");
    t.wait(SAVE_WAIT);
    t.durable.remove("compiler:code-fallback").unwrap();
    let key = t.state_key();

    t.time.advance(7 * DAY + Duration::from_secs(1));
    let t = t.session_reloaded(NavigationType::Navigate);

    assert_eq!(t.session.restored_from(), None);
    assert_eq!(t.session.code(), "");
    assert_eq!(t.tab.get(&key).unwrap(), None);
}

#[test]
fn test_sweep_removes_abandoned_sessions() {
    let t = TestTab::new();
    let stale = format!(
        r#"{{"schemaVersion":1,"code":"x","compressed":false,"updatedAt":{},"sessionId":"gone"}}"#,
        0
    );
    t.tab.set("compiler:state:gone", &stale).unwrap();
    t.tab.set("compiler:state:junk", "not json").unwrap();

    let t = t.session_reloaded(NavigationType::Navigate);
    assert_eq!(t.tab.get("compiler:state:gone").unwrap(), None);
    assert_eq!(t.tab.get("compiler:state:junk").unwrap(), None);
}

#[test]
fn test_stale_selection_is_clamped_on_restore() {
    let t = TestTab::new();
    t.tab.set("compiler:session-id", "tab-1").unwrap();
    let raw = format!(
        r#"{{"schemaVersion":1,"code":"short","compressed":false,"selection":{{"start":2,"end":500}},"scrollTop":0,"updatedAt":{},"sessionId":"tab-1"}}"#,
        t.time.now_millis()
    );
    t.tab.set("compiler:state:tab-1", &raw).unwrap();

    let t = t.session_reloaded(NavigationType::Navigate);
    assert_eq!(t.session.code(), "short");
    assert_eq!(t.session.selection(), Selection::new(2, 5));
}

#[test]
fn test_legacy_key_is_migrated() {
    let t = TestTab::new();
    t.durable.set("compiler:code", "class Legacy {}").unwrap();
    let t = t.session_reloaded(NavigationType::Navigate);

    assert_eq!(t.session.restored_from(), Some(RestoreSource::Legacy));
    assert_eq!(t.session.code(), "class Legacy {}");
    assert_eq!(t.durable.get("compiler:code").unwrap(), None);
    assert_eq!(t.stored_code().as_deref(), Some("class Legacy {}"));
}

#[test]
fn test_corrupt_snapshot_falls_back() {
    let t = TestTab::new();
    t.tab.set("compiler:session-id", "tab-1").unwrap();
    t.durable
        .set("compiler:code-fallback", "class Backup {}")
        .unwrap();
    let raw = format!(
        r#"{{"schemaVersion":1,"code":"%%%not base64%%%","compressed":true,"updatedAt":{},"sessionId":"tab-1"}}"#,
        t.time.now_millis()
    );
    t.tab.set("compiler:state:tab-1", &raw).unwrap();

    let t = t.session_reloaded(NavigationType::Navigate);
    assert_eq!(t.session.restored_from(), Some(RestoreSource::Fallback));
    assert_eq!(t.session.code(), "class Backup {}");
    assert_eq!(t.tab.get("compiler:state:tab-1").unwrap(), None);
}

#[test]
fn test_multibyte_text_survives_reload() {
    let mut t = TestTab::mounted();
    let text = "// café ☕ 日本語\nclass Ünïcödé { String s = \"🦀\"; }";
    t.type_text(text);
    t.wait(SAVE_WAIT);

    let t = t.reload();
    assert_eq!(t.session.code(), text);
    assert_eq!(t.session.selection(), Selection::end_of(text));
}

#[test]
fn test_quota_failure_warns_once_and_editing_continues() {
    let mut t = TestTab::mounted();
    t.tab.set_quota(Some(80));

    t.type_text(&numbered_lines(40));
    assert!(matches!(
        t.wait(SAVE_WAIT),
        SaveOutcome::Failed {
            warn_user: true,
            ..
        }
    ));
    t.type_text(&numbered_lines(41));
    assert!(matches!(
        t.wait(SAVE_WAIT),
        SaveOutcome::Failed {
            warn_user: false,
            ..
        }
    ));

    assert_eq!(t.session.take_notices(), vec![Notice::storage_full()]);
    assert_eq!(t.session.code(), numbered_lines(41));
    // The durable fallback still caught the text
    assert_eq!(t.fallback_text(), Some(numbered_lines(41)));
}

#[test]
fn test_hide_backs_up_text_inside_debounce_window() {
    let mut t = TestTab::mounted();
    t.type_text("class Quick {}");
    t.session.hide();

    // Tab closed before the debounce fired; a new tab still recovers it
    let next = t.open_new_tab();
    assert_eq!(next.session.code(), "class Quick {}");
}

#[test]
fn test_cross_tab_change_merges_last_writer_wins() {
    let mut a = TestTab::mounted();
    a.type_text("class Mine {}");
    a.wait(SAVE_WAIT);

    let mut b = TestTab::with_stores(a.tab.clone(), a.durable.clone(), a.time.clone());
    b.session.mount(NavigationType::Navigate);
    b.type_text("class Theirs {}");
    b.wait(SAVE_WAIT);

    let key = a.state_key();
    let raw = a.tab.get(&key).unwrap().unwrap();
    assert!(a
        .session
        .handle_external_change(&StorageChange::set(key, raw)));
    assert_eq!(a.session.code(), "class Theirs {}");
}

#[test]
fn test_logout_elsewhere_wipes_state() {
    let mut t = TestTab::mounted();
    t.durable.set("access_token", "secret").unwrap();
    t.type_text("class Private {}");
    t.wait(SAVE_WAIT);

    t.durable.remove("access_token").unwrap();
    assert!(t
        .session
        .handle_external_change(&StorageChange::removed("access_token")));

    assert_eq!(t.session.code(), "");
    assert_eq!(t.fallback_text(), None);
    assert_eq!(t.stored_snapshot(), None);
}

#[test]
fn test_file_backed_stores_survive_process_restart() {
    let dir = tempfile::tempdir().unwrap();
    let time = TestTimeSource::shared();
    let open = || {
        let tab: Arc<FileStore> = Arc::new(FileStore::with_dir(dir.path().join("tab")));
        let durable: Arc<FileStore> = Arc::new(FileStore::with_dir(dir.path().join("durable")));
        CompilerSession::new(Config::default(), tab, durable, time.clone())
    };

    let mut first = open();
    first.mount(NavigationType::Navigate);
    first.edit("class OnDisk {}", Selection::caret(6));
    assert_eq!(first.flush(), SaveOutcome::Saved);
    first.unmount();

    let mut second = open();
    assert_eq!(second.code(), "class OnDisk {}");
    assert_eq!(
        second.mount(NavigationType::Reload),
        Some(RestoreSource::Primary)
    );
    assert_eq!(second.selection(), Selection::caret(6));
}

#[test]
fn test_uncompressed_config_still_round_trips() {
    let tab = compiler_session::services::storage::MemoryStore::shared();
    let durable = compiler_session::services::storage::MemoryStore::shared();
    let time = TestTimeSource::shared();
    let mut config = Config::default();
    config.persistence.compression = false;

    let mut session = CompilerSession::new(config.clone(), tab.clone(), durable.clone(), time.clone());
    session.mount(NavigationType::Navigate);
    session.edit("class Plain {}", Selection::caret(0));
    session.flush();

    let id = session.session_id().unwrap().clone();
    let raw = tab.get(&format!("compiler:state:{id}")).unwrap().unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["compressed"], false);
    assert_eq!(json["code"], "class Plain {}");

    let mut reloaded = CompilerSession::new(config, tab, durable, time);
    reloaded.mount(NavigationType::Reload);
    assert_eq!(reloaded.code(), "class Plain {}");
}
