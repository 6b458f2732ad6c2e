mod common;

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tempfile::TempDir;

use common::*;
use progression_engine::db::SqliteStore;
use progression_engine::store::{
    ActivityStore, Collection, DocumentKey, RawRecord, RecordQuery, SortOrder, TimeRange,
};
use progression_engine::MasteryTier;

async fn open_temp_store(dir: &TempDir) -> SqliteStore {
    let path = dir.path().join("nested").join("progression.db");
    SqliteStore::open(&path, StdDuration::from_secs(5))
        .await
        .expect("failed to open sqlite store")
}

#[tokio::test]
async fn creates_database_file_and_parent_dirs() {
    let dir = TempDir::new().unwrap();
    let store = open_temp_store(&dir).await;
    assert!(dir.path().join("nested").join("progression.db").exists());
    store.close().await;
}

#[tokio::test]
async fn unreadable_schema_metadata_fails_open() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("progression.db");
    let options = SqliteConnectOptions::new().filename(&path).create_if_missing(true);
    let pool = SqlitePoolOptions::new().max_connections(1).connect_with(options).await.unwrap();
    sqlx::query(r#"CREATE TABLE "_db_metadata" ("key" TEXT PRIMARY KEY)"#)
        .execute(&pool)
        .await
        .unwrap();
    pool.close().await;

    let result = SqliteStore::open(&path, StdDuration::from_secs(5)).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn reopening_keeps_schema_and_rows() {
    let dir = TempDir::new().unwrap();
    {
        let store = open_temp_store(&dir).await;
        store.append_record(&quiz(1, true, 90.0)).await.unwrap();
        store.close().await;
    }
    let store = open_temp_store(&dir).await;
    let rows = store
        .list_records(&RecordQuery::new(USER, Collection::QuizAttempts))
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn filters_by_range_category_and_activity() {
    let dir = TempDir::new().unwrap();
    let store = open_temp_store(&dir).await;

    for d in 0..10 {
        store.append_record(&practice("docker", d, d as f64)).await.unwrap();
        store.append_record(&practice("cicd", d, 50.0)).await.unwrap();
    }
    store.append_record(&drill(1, "drill-a", true, 80.0, 200.0)).await.unwrap();
    store.append_record(&drill(2, "drill-b", false, 40.0, 300.0)).await.unwrap();

    let query = RecordQuery::new(USER, Collection::Progress)
        .category("docker")
        .range(TimeRange::between(days_ago(5), days_ago(2)))
        .order(SortOrder::OldestFirst);
    let rows = store.list_records(&query).await.unwrap();
    let stamps: Vec<_> = rows.iter().map(|r| r.timestamp).collect();
    assert_eq!(stamps, vec![days_ago(4), days_ago(3), days_ago(2)]);
    assert!(rows.iter().all(|r| r.category.as_deref() == Some("docker")));

    let drills = store
        .list_records(&RecordQuery::new(USER, Collection::DrillAttempts).activity("drill-b"))
        .await
        .unwrap();
    assert_eq!(drills.len(), 1);
    assert_eq!(drills[0].payload["passed"], false);
    assert_eq!(drills[0].activity_id.as_deref(), Some("drill-b"));

    let other_user = store
        .list_records(&RecordQuery::new("someone-else", Collection::Progress))
        .await
        .unwrap();
    assert!(other_user.is_empty());
}

#[tokio::test]
async fn newest_first_with_limit_breaks_ties_by_insertion() {
    let store = SqliteStore::connect_in_memory().await.unwrap();
    let first = RawRecord::new(USER, Collection::QuizAttempts, now()).with_field("score", 1.0);
    let second = RawRecord::new(USER, Collection::QuizAttempts, now()).with_field("score", 2.0);
    let older = RawRecord::new(USER, Collection::QuizAttempts, days_ago(1));
    for record in [&older, &first, &second] {
        store.append_record(record).await.unwrap();
    }

    let rows = store
        .list_records(&RecordQuery::new(USER, Collection::QuizAttempts).limit(2))
        .await
        .unwrap();
    let ids: Vec<_> = rows.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec![second.id.as_str(), first.id.as_str()]);
}

#[tokio::test]
async fn documents_are_last_writer_wins() {
    let store = SqliteStore::connect_in_memory().await.unwrap();
    let key = DocumentKey::recertification(USER);

    assert!(store.get_document(&key).await.unwrap().is_none());
    store.upsert_document(&key, &serde_json::json!({"passed": false})).await.unwrap();
    store.upsert_document(&key, &serde_json::json!({"passed": true})).await.unwrap();

    let doc = store.get_document(&key).await.unwrap().unwrap();
    assert_eq!(doc, serde_json::json!({"passed": true}));
}

#[tokio::test]
async fn ledger_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let at = now();

    {
        let store = open_temp_store(&dir).await;
        let engine = engine_with(Arc::new(store.clone()));
        for (i, tier) in [MasteryTier::Intermediate, MasteryTier::Advanced].into_iter().enumerate() {
            engine
                .apply_adjustment_at(USER, tier, "promotion board", false, at + Duration::minutes(i as i64))
                .await
                .unwrap();
        }
        store.close().await;
    }

    let store = open_temp_store(&dir).await;
    let engine = engine_with(Arc::new(store));
    let history = engine.adjustment_history(USER).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].new_tier, MasteryTier::Intermediate);
    assert_eq!(history[1].previous_tier, MasteryTier::Intermediate);
    assert_eq!(engine.current_tier(USER).await.unwrap(), MasteryTier::Advanced);
    assert_eq!(engine.load_settings(USER).await.tier, MasteryTier::Advanced);
}

#[tokio::test]
async fn engine_metrics_match_memory_store() {
    let store = SqliteStore::connect_in_memory().await.unwrap();
    for record in strong_history() {
        store.append_record(&record).await.unwrap();
    }
    let sqlite_metrics = engine_with(Arc::new(store)).compute_metrics_at(USER, 30, now()).await;

    let memory = progression_engine::MemoryStore::with_records(strong_history());
    let memory_metrics = engine_with(Arc::new(memory)).compute_metrics_at(USER, 30, now()).await;

    assert_eq!(sqlite_metrics, memory_metrics);
    assert_eq!(sqlite_metrics.study_streak, 20);
}
