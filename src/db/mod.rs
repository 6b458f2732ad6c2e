//! SQLite-backed [`ActivityStore`].
//!
//! Timestamps are stored as epoch milliseconds; record payloads and documents
//! as JSON text.

pub mod schema;

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use tracing::{info, warn};

use crate::store::{ActivityStore, DocumentKey, RawRecord, RecordQuery, SortOrder, StoreError};
use schema::{split_sql_statements, SCHEMA_SQL, SCHEMA_VERSION};

#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn open(path: &Path, busy_timeout: Duration) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Io(e.to_string()))?;
        }

        let db_url = format!("sqlite:{}?mode=rwc", path.display());
        let options = SqliteConnectOptions::from_str(&db_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(busy_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.apply_schema().await?;
        info!(path = %path.display(), "Opened SQLite activity store");
        Ok(store)
    }

    /// Private database living as long as the store. Single connection, since
    /// every in-memory connection would otherwise see its own database.
    pub async fn connect_in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.apply_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn apply_schema(&self) -> Result<(), StoreError> {
        let has_metadata: bool = sqlx::query_scalar(
            r#"SELECT EXISTS(SELECT 1 FROM "sqlite_master" WHERE "type" = 'table' AND "name" = '_db_metadata')"#,
        )
        .fetch_one(&self.pool)
        .await?;

        let version: Option<String> = if has_metadata {
            sqlx::query_scalar(r#"SELECT "value" FROM "_db_metadata" WHERE "key" = 'schema_version'"#)
                .fetch_optional(&self.pool)
                .await?
        } else {
            None
        };

        if version.as_deref() == Some(SCHEMA_VERSION) {
            return Ok(());
        }

        for stmt in split_sql_statements(SCHEMA_SQL) {
            sqlx::query(&stmt).execute(&self.pool).await?;
        }

        sqlx::query(r#"INSERT OR REPLACE INTO "_db_metadata" ("key", "value") VALUES ('schema_version', ?)"#)
            .bind(SCHEMA_VERSION)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

fn row_to_record(row: &SqliteRow, query: &RecordQuery) -> Result<RawRecord, StoreError> {
    let id: String = row.try_get("id")?;
    let timestamp_ms: i64 = row.try_get("timestampMs")?;
    let payload_text: String = row.try_get("payload")?;

    let timestamp = DateTime::<Utc>::from_timestamp_millis(timestamp_ms).unwrap_or_default();
    let payload = match serde_json::from_str(&payload_text) {
        Ok(map) => map,
        Err(e) => {
            warn!(record_id = %id, error = %e, "Unreadable record payload, treating as empty");
            serde_json::Map::new()
        }
    };

    Ok(RawRecord {
        id,
        user_id: row.try_get("userId")?,
        collection: query.collection,
        category: row.try_get("category")?,
        activity_id: row.try_get("activityId")?,
        timestamp,
        payload,
    })
}

#[async_trait::async_trait]
impl ActivityStore for SqliteStore {
    async fn list_records(&self, query: &RecordQuery) -> Result<Vec<RawRecord>, StoreError> {
        let mut qb = QueryBuilder::<Sqlite>::new(
            r#"SELECT "id", "userId", "category", "activityId", "timestampMs", "payload"
            FROM "activity_records" WHERE "userId" = "#,
        );
        qb.push_bind(query.user_id.as_str());
        qb.push(r#" AND "collection" = "#);
        qb.push_bind(query.collection.as_str());

        if let Some(category) = query.category.as_deref() {
            qb.push(r#" AND "category" = "#);
            qb.push_bind(category);
        }
        if let Some(activity_id) = query.activity_id.as_deref() {
            qb.push(r#" AND "activityId" = "#);
            qb.push_bind(activity_id);
        }
        if let Some(since) = query.range.since {
            qb.push(r#" AND "timestampMs" > "#);
            qb.push_bind(since.timestamp_millis());
        }
        if let Some(until) = query.range.until {
            qb.push(r#" AND "timestampMs" <= "#);
            qb.push_bind(until.timestamp_millis());
        }

        qb.push(match query.order {
            SortOrder::NewestFirst => r#" ORDER BY "timestampMs" DESC, "seq" DESC"#,
            SortOrder::OldestFirst => r#" ORDER BY "timestampMs" ASC, "seq" ASC"#,
        });

        if let Some(limit) = query.limit {
            qb.push(" LIMIT ");
            qb.push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
        }

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(|row| row_to_record(row, query)).collect()
    }

    async fn append_record(&self, record: &RawRecord) -> Result<(), StoreError> {
        let payload = serde_json::to_string(&record.payload)?;
        sqlx::query(
            r#"
            INSERT INTO "activity_records"
                ("id", "userId", "collection", "category", "activityId", "timestampMs", "payload")
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.user_id)
        .bind(record.collection.as_str())
        .bind(record.category.as_deref())
        .bind(record.activity_id.as_deref())
        .bind(record.timestamp.timestamp_millis())
        .bind(payload)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn upsert_document(&self, key: &DocumentKey, value: &serde_json::Value) -> Result<(), StoreError> {
        let body = serde_json::to_string(value)?;
        sqlx::query(
            r#"
            INSERT INTO "documents" ("collection", "id", "body", "updatedAtMs")
            VALUES (?, ?, ?, ?)
            ON CONFLICT ("collection", "id")
            DO UPDATE SET "body" = excluded."body", "updatedAtMs" = excluded."updatedAtMs"
            "#,
        )
        .bind(key.collection.as_str())
        .bind(&key.id)
        .bind(body)
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_document(&self, key: &DocumentKey) -> Result<Option<serde_json::Value>, StoreError> {
        let body: Option<String> =
            sqlx::query_scalar(r#"SELECT "body" FROM "documents" WHERE "collection" = ? AND "id" = ?"#)
                .bind(key.collection.as_str())
                .bind(&key.id)
                .fetch_optional(&self.pool)
                .await?;

        match body {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }
}
