//! Store-backed halves of the engine. Each service fetches what its pure
//! counterpart in [`crate::progression`] needs, bounded by the configured
//! store timeout.

pub mod decay;
pub mod ledger;
pub mod metrics;
pub mod recertification;
pub mod trend;

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use crate::store::{ActivityStore, RawRecord, RecordQuery, StoreError};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("store operation timed out: {operation}")]
    Timeout { operation: &'static str },
    #[error("invalid stored document: {0}")]
    InvalidDocument(#[from] serde_json::Error),
}

pub(crate) async fn bounded<T, F>(operation: &'static str, limit: Duration, fut: F) -> Result<T, EngineError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result.map_err(EngineError::from),
        Err(_) => Err(EngineError::Timeout { operation }),
    }
}

pub(crate) async fn fetch(
    store: &dyn ActivityStore,
    operation: &'static str,
    limit: Duration,
    query: RecordQuery,
) -> Result<Vec<RawRecord>, EngineError> {
    tracing::debug!(
        user_id = %query.user_id,
        collection = query.collection.as_str(),
        "Fetching records"
    );
    bounded(operation, limit, store.list_records(&query)).await
}
