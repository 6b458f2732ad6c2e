//! Activity store collaborator.
//!
//! The engine reads loosely-typed records through [`ActivityStore`] and turns
//! them into typed variants in [`records`]. Records are append-only: the trait
//! has no update or delete operation for them. Documents are last-writer-wins.

pub mod memory;
pub mod records;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use memory::MemoryStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    QuizAttempts,
    LabCompletions,
    DrillAttempts,
    StudySessions,
    FailureLogs,
    ResetTokens,
    Progress,
    DifficultyAdjustments,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::QuizAttempts => "quiz_attempts",
            Self::LabCompletions => "lab_completions",
            Self::DrillAttempts => "drill_attempts",
            Self::StudySessions => "study_sessions",
            Self::FailureLogs => "failure_logs",
            Self::ResetTokens => "reset_tokens",
            Self::Progress => "progress",
            Self::DifficultyAdjustments => "difficulty_adjustments",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "quiz_attempts" => Some(Self::QuizAttempts),
            "lab_completions" => Some(Self::LabCompletions),
            "drill_attempts" => Some(Self::DrillAttempts),
            "study_sessions" => Some(Self::StudySessions),
            "failure_logs" => Some(Self::FailureLogs),
            "reset_tokens" => Some(Self::ResetTokens),
            "progress" => Some(Self::Progress),
            "difficulty_adjustments" => Some(Self::DifficultyAdjustments),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentCollection {
    TierSettings,
    Recertifications,
}

impl DocumentCollection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TierSettings => "tier_settings",
            Self::Recertifications => "recertifications",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentKey {
    pub collection: DocumentCollection,
    pub id: String,
}

impl DocumentKey {
    pub fn tier_settings(user_id: &str) -> Self {
        Self {
            collection: DocumentCollection::TierSettings,
            id: user_id.to_string(),
        }
    }

    pub fn recertification(user_id: &str) -> Self {
        Self {
            collection: DocumentCollection::Recertifications,
            id: user_id.to_string(),
        }
    }
}

/// Store-side shape of a record. Anything beyond the indexed columns lives in
/// `payload` and is only interpreted by [`records`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRecord {
    pub id: String,
    pub user_id: String,
    pub collection: Collection,
    pub category: Option<String>,
    pub activity_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub payload: serde_json::Map<String, serde_json::Value>,
}

impl RawRecord {
    pub fn new(user_id: &str, collection: Collection, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            collection,
            category: None,
            activity_id: None,
            timestamp,
            payload: serde_json::Map::new(),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_activity(mut self, activity_id: impl Into<String>) -> Self {
        self.activity_id = Some(activity_id.into());
        self
    }

    pub fn with_field(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.payload.insert(key.to_string(), value.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

/// Half-open time range `(since, until]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeRange {
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl TimeRange {
    pub fn between(since: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        Self {
            since: Some(since),
            until: Some(until),
        }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.since.map_or(true, |since| ts > since) && self.until.map_or(true, |until| ts <= until)
    }

    pub fn overlaps(&self, other: &TimeRange) -> bool {
        let starts_before_other_ends = match (self.since, other.until) {
            (Some(since), Some(until)) => since < until,
            _ => true,
        };
        let other_starts_before_self_ends = match (other.since, self.until) {
            (Some(since), Some(until)) => since < until,
            _ => true,
        };
        starts_before_other_ends && other_starts_before_self_ends
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordQuery {
    pub user_id: String,
    pub collection: Collection,
    pub category: Option<String>,
    pub activity_id: Option<String>,
    pub range: TimeRange,
    pub order: SortOrder,
    pub limit: Option<usize>,
}

impl RecordQuery {
    pub fn new(user_id: &str, collection: Collection) -> Self {
        Self {
            user_id: user_id.to_string(),
            collection,
            category: None,
            activity_id: None,
            range: TimeRange::default(),
            order: SortOrder::NewestFirst,
            limit: None,
        }
    }

    pub fn category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }

    pub fn activity(mut self, activity_id: &str) -> Self {
        self.activity_id = Some(activity_id.to_string());
        self
    }

    pub fn range(mut self, range: TimeRange) -> Self {
        self.range = range;
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.range.since = Some(since);
        self
    }

    pub fn order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, record: &RawRecord) -> bool {
        record.user_id == self.user_id
            && record.collection == self.collection
            && self
                .category
                .as_deref()
                .map_or(true, |c| record.category.as_deref() == Some(c))
            && self
                .activity_id
                .as_deref()
                .map_or(true, |a| record.activity_id.as_deref() == Some(a))
            && self.range.contains(record.timestamp)
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("IO error: {0}")]
    Io(String),
}

#[async_trait::async_trait]
pub trait ActivityStore: Send + Sync {
    async fn list_records(&self, query: &RecordQuery) -> Result<Vec<RawRecord>, StoreError>;

    async fn append_record(&self, record: &RawRecord) -> Result<(), StoreError>;

    async fn upsert_document(
        &self,
        key: &DocumentKey,
        value: &serde_json::Value,
    ) -> Result<(), StoreError>;

    async fn get_document(&self, key: &DocumentKey) -> Result<Option<serde_json::Value>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(day: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap() + Duration::days(day)
    }

    #[test]
    fn range_is_exclusive_at_start_inclusive_at_end() {
        let range = TimeRange::between(at(0), at(7));
        assert!(!range.contains(at(0)));
        assert!(range.contains(at(1)));
        assert!(range.contains(at(7)));
        assert!(!range.contains(at(8)));
    }

    #[test]
    fn adjacent_ranges_do_not_overlap() {
        let older = TimeRange::between(at(0), at(30));
        let newer = TimeRange::between(at(30), at(60));
        assert!(!older.overlaps(&newer));
        assert!(!newer.overlaps(&older));

        let shifted = TimeRange::between(at(29), at(60));
        assert!(older.overlaps(&shifted));
    }

    #[test]
    fn collection_names_round_trip() {
        for collection in [
            Collection::QuizAttempts,
            Collection::LabCompletions,
            Collection::DrillAttempts,
            Collection::StudySessions,
            Collection::FailureLogs,
            Collection::ResetTokens,
            Collection::Progress,
            Collection::DifficultyAdjustments,
        ] {
            assert_eq!(Collection::parse(collection.as_str()), Some(collection));
        }
    }

    #[test]
    fn query_filters_by_category_and_activity() {
        let record = RawRecord::new("u1", Collection::DrillAttempts, at(3))
            .with_category("docker")
            .with_activity("drill-1");

        assert!(RecordQuery::new("u1", Collection::DrillAttempts).matches(&record));
        assert!(RecordQuery::new("u1", Collection::DrillAttempts).activity("drill-1").matches(&record));
        assert!(!RecordQuery::new("u1", Collection::DrillAttempts).activity("drill-2").matches(&record));
        assert!(!RecordQuery::new("u1", Collection::DrillAttempts).category("cicd").matches(&record));
        assert!(!RecordQuery::new("u2", Collection::DrillAttempts).matches(&record));
    }
}
