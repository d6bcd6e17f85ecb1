//! Reading migration state: paging, duplicates, status output.

mod common;

use common::{FakeStore, write_migration};
use esmigrate::migrations::render_status_table;
use esmigrate::{Config, MigrateError, Migrator, StoreError};
use serde_json::json;

const STATE: &str = ".es-migrate";

fn seed_record(store: &FakeStore, env: &str, version: i64, when: &str) {
    store.seed(
        STATE,
        &format!("{}-{}", env, version),
        json!({ "when": when, "version": version, "env": env }),
    );
}

#[tokio::test]
async fn test_state_is_read_across_scroll_pages() {
    let dir = tempfile::tempdir().unwrap();
    let store = FakeStore::new();
    for i in 1..=5 {
        let version = 20200101000000 + i;
        write_migration(dir.path(), version, &format!("m{}", i));
        seed_record(&store, "dev", version, "2020-02-01T10:00:00Z");
    }
    write_migration(dir.path(), 20200101000006, "m6");

    let mut config = Config::default();
    config.migrations.page_size = 2;

    let status = Migrator::new(&store, &config, "dev")
        .load(dir.path())
        .await
        .unwrap();

    assert_eq!(status.pending, 1);
    assert!(status.migrations[..5].iter().all(|m| m.applied_at.is_some()));
    assert!(status.migrations[5].is_pending());
    // 2 + 2 + 1 + the empty page that ends the scroll.
    assert_eq!(store.scroll_pages(), 4);
    assert_eq!(store.cleared_scrolls().len(), 1);
}

#[tokio::test]
async fn test_other_environments_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    write_migration(dir.path(), 20200101000001, "one");

    let store = FakeStore::new();
    seed_record(&store, "prod", 20200101000001, "2020-02-01T10:00:00Z");

    let config = Config::default();
    let status = Migrator::new(&store, &config, "dev")
        .load(dir.path())
        .await
        .unwrap();
    assert_eq!(status.pending, 1);
}

#[tokio::test]
async fn test_earliest_record_wins() {
    let dir = tempfile::tempdir().unwrap();
    write_migration(dir.path(), 20200101000001, "one");

    let store = FakeStore::new();
    seed_record(&store, "dev", 20200101000001, "2021-05-01T00:00:00Z");
    store.seed(
        STATE,
        "legacy",
        json!({ "when": "2020-03-01T00:00:00Z", "version": 20200101000001_i64, "env": "dev" }),
    );

    let config = Config::default();
    let status = Migrator::new(&store, &config, "dev")
        .load(dir.path())
        .await
        .unwrap();

    let applied = status.migrations[0].applied_at.unwrap();
    assert_eq!(applied.to_rfc3339(), "2020-03-01T00:00:00+00:00");
}

#[tokio::test]
async fn test_orphan_records_do_not_count() {
    let dir = tempfile::tempdir().unwrap();
    write_migration(dir.path(), 20200101000001, "one");
    write_migration(dir.path(), 20200101000003, "three");

    let store = FakeStore::new();
    seed_record(&store, "dev", 20200101000001, "2020-02-01T10:00:00Z");
    seed_record(&store, "dev", 20200101000002, "2020-02-01T10:00:00Z");

    let config = Config::default();
    let status = Migrator::new(&store, &config, "dev")
        .load(dir.path())
        .await
        .unwrap();

    assert_eq!(status.migrations.len(), 2);
    assert_eq!(status.pending, 1);
    assert_eq!(status.migrations[1].version, 20200101000003);
}

#[tokio::test]
async fn test_status_output_is_stable() {
    let dir = tempfile::tempdir().unwrap();
    write_migration(dir.path(), 20200101000001, "one");
    write_migration(dir.path(), 20200101000002, "two");

    let store = FakeStore::new();
    seed_record(&store, "dev", 20200101000001, "2020-02-01T10:00:00Z");

    let config = Config::default();
    let migrator = Migrator::new(&store, &config, "dev");

    let first = render_status_table(&migrator.load(dir.path()).await.unwrap().migrations);
    let second = render_status_table(&migrator.load(dir.path()).await.unwrap().migrations);

    assert_eq!(first, second);
    assert!(first.contains("Sat Feb  1 10:00:00 2020"));
    assert!(first.contains("Pending"));
    assert!(store.requests().is_empty());
}

#[tokio::test]
async fn test_failed_scroll_page_aborts_load() {
    let dir = tempfile::tempdir().unwrap();
    let store = FakeStore::new();
    for i in 1..=3 {
        let version = 20200101000000 + i;
        write_migration(dir.path(), version, &format!("m{}", i));
        seed_record(&store, "dev", version, "2020-02-01T10:00:00Z");
    }
    write_migration(dir.path(), 20200101000004, "m4");
    store.set_fail_scroll_next(true);

    let mut config = Config::default();
    config.migrations.page_size = 2;
    let migrator = Migrator::new(&store, &config, "dev");

    // The first page was served; the second one fails.
    let err = migrator.load(dir.path()).await.unwrap_err();
    match &err {
        MigrateError::StateRead(source) => assert_eq!(source.status(), Some(404)),
        other => panic!("expected state read error, got {:?}", other),
    }
    assert!(err.migration().is_none());

    let err = migrator.up(dir.path(), |_| {}).await.unwrap_err();
    assert!(matches!(err, MigrateError::StateRead(_)));
    assert!(store.requests().is_empty());
}

#[tokio::test]
async fn test_undecodable_record_aborts_load() {
    let dir = tempfile::tempdir().unwrap();
    write_migration(dir.path(), 20200101000001, "one");
    write_migration(dir.path(), 20200101000002, "two");

    let store = FakeStore::new();
    seed_record(&store, "dev", 20200101000001, "2020-02-01T10:00:00Z");
    store.seed(
        STATE,
        "dev-broken",
        json!({ "when": "yesterday", "version": "two", "env": "dev" }),
    );

    let config = Config::default();
    let err = Migrator::new(&store, &config, "dev")
        .up(dir.path(), |_| {})
        .await
        .unwrap_err();

    match err {
        MigrateError::StateRead(StoreError::Decode(message)) => {
            assert!(message.contains("invalid migration record"))
        }
        other => panic!("expected decode error, got {:?}", other),
    }
    assert!(store.requests().is_empty());
}
