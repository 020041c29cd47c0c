//! Integration test for the SQLite replica lifecycle.
//!
//! Exercises: open_db, migrate, SqliteDocStore put/fetch/list,
//! revision history, ReadStateStore, OverrideTracker + SettingsApplier,
//! TeamConfigManager, and the annotation flow end to end on disk.

use std::collections::BTreeMap;

use notesync_core::annotations::AnnotationStore;
use notesync_core::config::TeamConfigManager;
use notesync_core::db::{self, SqliteDocStore};
use notesync_core::readstate::ReadStateStore;
use notesync_core::settings::{
    OverrideTracker, SettingMode, SettingSpec, SettingsApplier, SettingsEntry, TeamSettingsStore,
};
use notesync_core::store::{DocWrite, DocumentStore, PutResult};
use notesync_core::types::{AnchorRange, CreateAnnotation, TeamRole};

fn temp_db_path() -> String {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.keep().join("replica.db");
    path.to_string_lossy().to_string()
}

fn stored_rev(result: PutResult) -> String {
    match result {
        PutResult::Stored { rev } => rev,
        PutResult::Conflict => panic!("unexpected conflict"),
    }
}

#[tokio::test]
async fn schema_and_wal_mode_apply_on_open() {
    let path = temp_db_path();
    let conn = db::open_db(&path).await.unwrap();

    let version: i64 = conn
        .call(|db| {
            Ok::<_, rusqlite::Error>(db.query_row("SELECT MAX(version) FROM schema_version", [], |r| r.get(0))?)
        })
        .await
        .unwrap();
    assert_eq!(version, 1, "schema_version should be 1");

    let journal: String = conn
        .call(|db| Ok::<_, rusqlite::Error>(db.query_row("PRAGMA journal_mode", [], |r| r.get(0))?))
        .await
        .unwrap();
    assert_eq!(journal, "wal", "journal_mode should be wal");

    let history_pk: i64 = conn
        .call(|db| {
            Ok::<_, rusqlite::Error>(db.query_row(
                "SELECT COUNT(*) FROM pragma_table_info('doc_history') WHERE pk > 0",
                [],
                |r| r.get(0),
            )?)
        })
        .await
        .unwrap();
    assert_eq!(history_pk, 2, "doc_history should have composite PK");
}

#[tokio::test]
async fn document_writes_conflict_and_keep_history() {
    let path = temp_db_path();
    let conn = db::open_db(&path).await.unwrap();
    let store = SqliteDocStore::new(conn);

    let rev1 = stored_rev(
        store
            .put(DocWrite {
                id: "notes/plan.md".into(),
                expected_rev: None,
                body: "first draft".into(),
                modified_by: "alice".into(),
            })
            .await
            .unwrap(),
    );
    assert!(rev1.starts_with("1-"));

    // Create over an existing doc conflicts.
    let clash = store
        .put(DocWrite {
            id: "notes/plan.md".into(),
            expected_rev: None,
            body: "usurper".into(),
            modified_by: "mallory".into(),
        })
        .await
        .unwrap();
    assert_eq!(clash, PutResult::Conflict);

    let rev2 = stored_rev(
        store
            .put(DocWrite {
                id: "notes/plan.md".into(),
                expected_rev: Some(rev1.clone()),
                body: "second draft".into(),
                modified_by: "bob".into(),
            })
            .await
            .unwrap(),
    );
    assert!(rev2.starts_with("2-"));

    // A stale writer loses.
    let stale = store
        .put(DocWrite {
            id: "notes/plan.md".into(),
            expected_rev: Some(rev1.clone()),
            body: "stale".into(),
            modified_by: "carol".into(),
        })
        .await
        .unwrap();
    assert_eq!(stale, PutResult::Conflict);

    // Current fetch sees the latest; history keeps the old revision.
    let current = store.fetch("notes/plan.md", None).await.unwrap().unwrap();
    assert_eq!(current.body, "second draft");
    assert_eq!(current.modified_by, "bob");
    let old = store.fetch("notes/plan.md", Some(&rev1)).await.unwrap().unwrap();
    assert_eq!(old.body, "first draft");

    assert!(store.fetch("notes/absent.md", None).await.unwrap().is_none());
    assert!(store.fetch("notes/plan.md", Some("9-zzzz")).await.unwrap().is_none());
}

#[tokio::test]
async fn prefix_listing_is_bounded_and_ordered() {
    let path = temp_db_path();
    let conn = db::open_db(&path).await.unwrap();
    let store = SqliteDocStore::new(conn);

    for id in ["team:annotation:b", "team:annotation:a", "team:config", "zeta.md"] {
        store
            .put(DocWrite {
                id: id.into(),
                expected_rev: None,
                body: "{}".into(),
                modified_by: "alice".into(),
            })
            .await
            .unwrap();
    }

    let listed = store.list_by_prefix("team:annotation:").await.unwrap();
    let ids: Vec<&str> = listed.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, ["team:annotation:a", "team:annotation:b"]);

    let everything = store.list_by_prefix("").await.unwrap();
    assert_eq!(everything.len(), 4);
}

#[tokio::test]
async fn read_state_round_trips_across_connections() {
    let path = temp_db_path();
    let conn = db::open_db(&path).await.unwrap();
    let reads = ReadStateStore::new(conn);

    // Never-seen files are unread for any revision.
    assert!(reads.is_unread("notes/plan.md", "1-abc").await);

    reads.mark_as_read("notes/plan.md", "1-abc").await.unwrap();
    assert!(!reads.is_unread("notes/plan.md", "1-abc").await);
    assert!(reads.is_unread("notes/plan.md", "2-def").await);

    // Re-marking overwrites unconditionally.
    reads.mark_as_read("notes/plan.md", "2-def").await.unwrap();
    assert!(!reads.is_unread("notes/plan.md", "2-def").await);

    let state = reads.get_read_state("notes/plan.md").await.unwrap().unwrap();
    assert_eq!(state.last_seen_rev, "2-def");
    assert!(state.last_seen_at > 0);

    // A second connection to the same file sees the ledger.
    let conn2 = db::open_db(&path).await.unwrap();
    let reads2 = ReadStateStore::new(conn2);
    assert!(!reads2.is_unread("notes/plan.md", "2-def").await);

    reads.clear_read_state("notes/plan.md").await.unwrap();
    assert!(reads.is_unread("notes/plan.md", "2-def").await);
}

#[tokio::test]
async fn annotations_persist_through_the_replica() {
    let path = temp_db_path();
    let conn = db::open_db(&path).await.unwrap();
    let annotations = AnnotationStore::new(SqliteDocStore::new(conn));

    let doc_text = "The quick brown fox jumps over the lazy dog";
    let created = annotations
        .create(CreateAnnotation {
            file_path: "notes/fox.md".into(),
            range: AnchorRange { start_line: 0, start_char: 10, end_line: 0, end_char: 19 },
            context_before: "The quick ".into(),
            context_after: " jumps over the lazy dog".into(),
            selected_text: "brown fox".into(),
            content: "is this fox fast enough?".into(),
            author: "alice".into(),
            mentions: vec!["bob".into()],
            parent_id: None,
        })
        .await
        .unwrap();

    annotations
        .create(CreateAnnotation {
            file_path: "notes/fox.md".into(),
            range: created.range,
            context_before: String::new(),
            context_after: String::new(),
            selected_text: String::new(),
            content: "plenty fast".into(),
            author: "bob".into(),
            mentions: vec![],
            parent_id: Some(created.id.clone()),
        })
        .await
        .unwrap();

    assert!(annotations.resolve(&created.id).await.unwrap());

    let edited = format!("PREFIX {doc_text}");
    let rendered = annotations.refresh_for_file("notes/fox.md", &edited).await.unwrap();
    assert_eq!(rendered.len(), 1);
    assert_eq!(rendered[0].reply_count, 1);
    assert!(rendered[0].resolved);
    assert_eq!(
        rendered[0].range,
        AnchorRange { start_line: 0, start_char: 17, end_line: 0, end_char: 26 }
    );
}

#[tokio::test]
async fn settings_apply_respects_modes_and_overrides() {
    let path = temp_db_path();
    let conn = db::open_db(&path).await.unwrap();
    let settings = TeamSettingsStore::new(SqliteDocStore::new(conn.clone()));
    let overrides = OverrideTracker::new(conn);
    let applier = SettingsApplier::new(&overrides);

    let mut pushed = BTreeMap::new();
    pushed.insert(
        "sync_interval".to_owned(),
        SettingSpec { value: serde_json::json!(30), mode: SettingMode::Enforced },
    );
    pushed.insert(
        "theme".to_owned(),
        SettingSpec { value: serde_json::json!("dark"), mode: SettingMode::Default },
    );
    let entry = SettingsEntry { managed_by: "alice".into(), updated_at: 1, settings: pushed };
    assert!(settings.save_entry("editor", &entry).await.unwrap());

    let loaded = settings.get_entry("editor").await.unwrap().unwrap();
    assert_eq!(loaded, entry);
    assert_eq!(settings.all_entries().await.unwrap().len(), 1);

    let mut current = BTreeMap::new();
    current.insert("sync_interval".to_owned(), serde_json::json!(300));
    current.insert("theme".to_owned(), serde_json::json!("light"));

    // No overrides yet: both pushed values land.
    let result = applier.apply("editor", &entry, &current).await.unwrap();
    assert_eq!(result.applied["sync_interval"], serde_json::json!(30));
    assert_eq!(result.applied["theme"], serde_json::json!("dark"));
    assert_eq!(result.enforced, ["sync_interval"]);

    // The member customizes the default-mode key; it must stick now.
    applier
        .detect_customization("editor", &entry, "theme", &serde_json::json!("light"))
        .await
        .unwrap();
    assert!(overrides.is_overridden("editor", "theme").await.unwrap());
    let result = applier.apply("editor", &entry, &current).await.unwrap();
    assert_eq!(result.applied["theme"], serde_json::json!("light"));
    // Enforced keys ignore customization.
    assert_eq!(result.applied["sync_interval"], serde_json::json!(30));

    // Setting it back to the pushed value clears the override.
    applier
        .detect_customization("editor", &entry, "theme", &serde_json::json!("dark"))
        .await
        .unwrap();
    assert!(!overrides.is_overridden("editor", "theme").await.unwrap());

    assert!(settings.remove_setting("editor", "theme").await.unwrap());
    let trimmed = settings.get_entry("editor").await.unwrap().unwrap();
    assert!(!trimmed.settings.contains_key("theme"));
}

#[tokio::test]
async fn team_config_survives_reopen() {
    let path = temp_db_path();
    {
        let conn = db::open_db(&path).await.unwrap();
        let manager = TeamConfigManager::new(SqliteDocStore::new(conn));
        assert!(manager.initialize_team("docs", "alice").await.unwrap());
        assert!(manager.add_member("bob", TeamRole::Editor).await.unwrap());
    }

    let conn = db::open_db(&path).await.unwrap();
    let manager = TeamConfigManager::new(SqliteDocStore::new(conn));
    let config = manager.get_config().await.unwrap().unwrap();
    assert_eq!(config.team_name, "docs");
    assert_eq!(config.members.len(), 2);
    assert_eq!(config.members["bob"].role, TeamRole::Editor);
}
