use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::{bounded, decay, EngineError};
use crate::config::EngineConfig;
use crate::progression::recertification::{completion_record, schedule_status};
use crate::progression::types::{RecertificationRecord, RecertificationStatus};
use crate::store::{ActivityStore, DocumentKey};

pub async fn load_record(
    store: &dyn ActivityStore,
    config: &EngineConfig,
    user_id: &str,
) -> Result<Option<RecertificationRecord>, EngineError> {
    let key = DocumentKey::recertification(user_id);
    let Some(doc) = bounded("recertification", config.store_timeout, store.get_document(&key)).await? else {
        return Ok(None);
    };
    match serde_json::from_value(doc) {
        Ok(record) => Ok(Some(record)),
        Err(e) => {
            warn!(user_id = %user_id, error = %e, "Ignoring malformed recertification document");
            Ok(None)
        }
    }
}

pub async fn recertification_status(
    store: &dyn ActivityStore,
    config: &EngineConfig,
    user_id: &str,
    categories: &[String],
    now: DateTime<Utc>,
) -> Result<RecertificationStatus, EngineError> {
    let record = load_record(store, config, user_id).await?;
    let alerts = decay::analyze_decay(store, config, user_id, categories, now).await;

    Ok(schedule_status(record.as_ref(), config.recert_interval_days, now, alerts))
}

pub async fn complete_recertification(
    store: &dyn ActivityStore,
    config: &EngineConfig,
    user_id: &str,
    drill_results: BTreeMap<String, bool>,
    now: DateTime<Utc>,
) -> Result<RecertificationRecord, EngineError> {
    let record = completion_record(drill_results, now);
    let key = DocumentKey::recertification(user_id);
    let value = serde_json::to_value(&record)?;
    bounded("recertification_upsert", config.store_timeout, store.upsert_document(&key, &value)).await?;

    info!(
        user_id = %user_id,
        passed = record.passed,
        drills = record.drill_results.len(),
        "Recorded recertification"
    );
    Ok(record)
}
