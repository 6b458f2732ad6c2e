#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;

use progression_engine::config::EngineConfig;
use progression_engine::store::{
    ActivityStore, Collection, DocumentKey, MemoryStore, RawRecord, RecordQuery, StoreError,
};
use progression_engine::ProgressionEngine;

pub const USER: &str = "user-1";

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 8, 20, 15, 0, 0).unwrap()
}

pub fn days_ago(days: i64) -> DateTime<Utc> {
    now() - Duration::days(days)
}

pub fn test_config() -> EngineConfig {
    EngineConfig {
        store_timeout: StdDuration::from_millis(200),
        ..EngineConfig::default()
    }
}

pub fn engine_with(store: Arc<dyn ActivityStore>) -> ProgressionEngine {
    ProgressionEngine::new(store, test_config())
}

pub fn quiz(days: i64, passed: bool, score: f64) -> RawRecord {
    RawRecord::new(USER, Collection::QuizAttempts, days_ago(days))
        .with_field("passed", passed)
        .with_field("score", score)
}

pub fn lab(days: i64, completed: bool, score: f64, time_spent: f64) -> RawRecord {
    RawRecord::new(USER, Collection::LabCompletions, days_ago(days))
        .with_field("completed", completed)
        .with_field("score", score)
        .with_field("timeSpent", time_spent)
}

pub fn drill(days: i64, activity: &str, passed: bool, score: f64, time_secs: f64) -> RawRecord {
    RawRecord::new(USER, Collection::DrillAttempts, days_ago(days))
        .with_activity(activity)
        .with_field("passed", passed)
        .with_field("score", score)
        .with_field("timeSeconds", time_secs)
}

pub fn session(at: DateTime<Utc>) -> RawRecord {
    RawRecord::new(USER, Collection::StudySessions, at)
}

pub fn failure(days: i64, aar_completed: bool) -> RawRecord {
    RawRecord::new(USER, Collection::FailureLogs, days_ago(days)).with_field("aarCompleted", aar_completed)
}

pub fn reset_token(days: i64) -> RawRecord {
    RawRecord::new(USER, Collection::ResetTokens, days_ago(days))
}

pub fn practice(category: &str, days: i64, score: f64) -> RawRecord {
    RawRecord::new(USER, Collection::Progress, days_ago(days))
        .with_category(category)
        .with_field("score", score)
}

pub fn easiness(days: i64, ef: f64) -> RawRecord {
    RawRecord::new(USER, Collection::Progress, days_ago(days)).with_field("easinessFactor", ef)
}

/// A user strong enough to clear every promotion gate below elite.
pub fn strong_history() -> Vec<RawRecord> {
    let mut records = Vec::new();
    for d in 0..20 {
        records.push(quiz(d, true, 95.0));
        records.push(lab(d, true, 92.0, 900.0));
        records.push(drill(d, "drill-1", true, 94.0, 240.0));
        records.push(session(now() - Duration::days(d) - Duration::minutes(30)));
        records.push(easiness(d, 2.9));
    }
    records
}

/// Every operation fails as if the backing database were down.
#[derive(Debug, Default)]
pub struct FailingStore;

#[async_trait::async_trait]
impl ActivityStore for FailingStore {
    async fn list_records(&self, _query: &RecordQuery) -> Result<Vec<RawRecord>, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn append_record(&self, _record: &RawRecord) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn upsert_document(&self, _key: &DocumentKey, _value: &serde_json::Value) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn get_document(&self, _key: &DocumentKey) -> Result<Option<serde_json::Value>, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
}

/// Reads hang longer than any test timeout.
#[derive(Debug, Default)]
pub struct StalledStore {
    inner: MemoryStore,
}

#[async_trait::async_trait]
impl ActivityStore for StalledStore {
    async fn list_records(&self, query: &RecordQuery) -> Result<Vec<RawRecord>, StoreError> {
        tokio::time::sleep(StdDuration::from_secs(5)).await;
        self.inner.list_records(query).await
    }

    async fn append_record(&self, record: &RawRecord) -> Result<(), StoreError> {
        self.inner.append_record(record).await
    }

    async fn upsert_document(&self, key: &DocumentKey, value: &serde_json::Value) -> Result<(), StoreError> {
        self.inner.upsert_document(key, value).await
    }

    async fn get_document(&self, key: &DocumentKey) -> Result<Option<serde_json::Value>, StoreError> {
        self.inner.get_document(key).await
    }
}

/// Memory store that remembers every query it served.
#[derive(Debug, Default)]
pub struct RecordingStore {
    pub inner: MemoryStore,
    queries: Mutex<Vec<RecordQuery>>,
}

impl RecordingStore {
    pub fn with_records(records: impl IntoIterator<Item = RawRecord>) -> Self {
        Self {
            inner: MemoryStore::with_records(records),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<RecordQuery> {
        self.queries.lock().clone()
    }
}

#[async_trait::async_trait]
impl ActivityStore for RecordingStore {
    async fn list_records(&self, query: &RecordQuery) -> Result<Vec<RawRecord>, StoreError> {
        self.queries.lock().push(query.clone());
        self.inner.list_records(query).await
    }

    async fn append_record(&self, record: &RawRecord) -> Result<(), StoreError> {
        self.inner.append_record(record).await
    }

    async fn upsert_document(&self, key: &DocumentKey, value: &serde_json::Value) -> Result<(), StoreError> {
        self.inner.upsert_document(key, value).await
    }

    async fn get_document(&self, key: &DocumentKey) -> Result<Option<serde_json::Value>, StoreError> {
        self.inner.get_document(key).await
    }
}

/// Memory store whose document upserts fail while `fail_upserts` is set.
#[derive(Debug, Default)]
pub struct UpsertFailingStore {
    pub inner: MemoryStore,
    pub fail_upserts: AtomicBool,
}

#[async_trait::async_trait]
impl ActivityStore for UpsertFailingStore {
    async fn list_records(&self, query: &RecordQuery) -> Result<Vec<RawRecord>, StoreError> {
        self.inner.list_records(query).await
    }

    async fn append_record(&self, record: &RawRecord) -> Result<(), StoreError> {
        self.inner.append_record(record).await
    }

    async fn upsert_document(&self, key: &DocumentKey, value: &serde_json::Value) -> Result<(), StoreError> {
        if self.fail_upserts.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("disk full".to_string()));
        }
        self.inner.upsert_document(key, value).await
    }

    async fn get_document(&self, key: &DocumentKey) -> Result<Option<serde_json::Value>, StoreError> {
        self.inner.get_document(key).await
    }
}
