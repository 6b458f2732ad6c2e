use std::collections::HashMap;

use parking_lot::RwLock;

use super::{ActivityStore, DocumentKey, RawRecord, RecordQuery, SortOrder, StoreError};

/// In-process store. Records are kept in insertion order; queries sort by
/// timestamp with insertion order as the tie-breaker.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Vec<RawRecord>>,
    documents: RwLock<HashMap<DocumentKey, serde_json::Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = RawRecord>) -> Self {
        Self {
            records: RwLock::new(records.into_iter().collect()),
            documents: RwLock::new(HashMap::new()),
        }
    }

    pub fn record_count(&self) -> usize {
        self.records.read().len()
    }
}

#[async_trait::async_trait]
impl ActivityStore for MemoryStore {
    async fn list_records(&self, query: &RecordQuery) -> Result<Vec<RawRecord>, StoreError> {
        let mut matched: Vec<RawRecord> = self
            .records
            .read()
            .iter()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();

        match query.order {
            SortOrder::OldestFirst => matched.sort_by_key(|r| r.timestamp),
            SortOrder::NewestFirst => {
                matched.reverse();
                matched.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
            }
        }

        if let Some(limit) = query.limit {
            matched.truncate(limit);
        }

        Ok(matched)
    }

    async fn append_record(&self, record: &RawRecord) -> Result<(), StoreError> {
        self.records.write().push(record.clone());
        Ok(())
    }

    async fn upsert_document(
        &self,
        key: &DocumentKey,
        value: &serde_json::Value,
    ) -> Result<(), StoreError> {
        self.documents.write().insert(key.clone(), value.clone());
        Ok(())
    }

    async fn get_document(&self, key: &DocumentKey) -> Result<Option<serde_json::Value>, StoreError> {
        Ok(self.documents.read().get(key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Collection, TimeRange};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn at(day: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap() + Duration::days(day)
    }

    #[tokio::test]
    async fn lists_newest_first_with_limit() {
        let store = MemoryStore::with_records((0..5).map(|d| {
            RawRecord::new("u", Collection::QuizAttempts, at(d)).with_field("score", d as f64)
        }));

        let query = RecordQuery::new("u", Collection::QuizAttempts).limit(2);
        let rows = store.list_records(&query).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].timestamp, at(4));
        assert_eq!(rows[1].timestamp, at(3));
    }

    #[tokio::test]
    async fn honours_half_open_range() {
        let store = MemoryStore::with_records(
            (0..10).map(|d| RawRecord::new("u", Collection::StudySessions, at(d))),
        );
        let query = RecordQuery::new("u", Collection::StudySessions)
            .range(TimeRange::between(at(2), at(5)))
            .order(SortOrder::OldestFirst);
        let rows = store.list_records(&query).await.unwrap();
        let days: Vec<_> = rows.iter().map(|r| r.timestamp).collect();
        assert_eq!(days, vec![at(3), at(4), at(5)]);
    }

    #[tokio::test]
    async fn documents_are_last_writer_wins() {
        let store = MemoryStore::new();
        let key = DocumentKey::tier_settings("u");
        store.upsert_document(&key, &serde_json::json!({"v": 1})).await.unwrap();
        store.upsert_document(&key, &serde_json::json!({"v": 2})).await.unwrap();
        let doc = store.get_document(&key).await.unwrap();
        assert_eq!(doc, Some(serde_json::json!({"v": 2})));
        assert!(store.get_document(&DocumentKey::recertification("u")).await.unwrap().is_none());
    }
}
