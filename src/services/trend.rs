use chrono::{DateTime, Utc};
use tracing::info;

use super::{fetch, EngineError};
use crate::config::EngineConfig;
use crate::progression::recertification::RecertificationWatch;
use crate::progression::trend::{classify_trend, TrendClassification, MAX_CONSIDERED_ATTEMPTS};
use crate::store::records::{parse_all, DrillAttempt};
use crate::store::{ActivityStore, Collection, RecordQuery};

/// Newest first, at most the attempts the classifier considers.
pub async fn recent_drill_attempts(
    store: &dyn ActivityStore,
    config: &EngineConfig,
    user_id: &str,
    activity_id: &str,
) -> Result<Vec<DrillAttempt>, EngineError> {
    let query = RecordQuery::new(user_id, Collection::DrillAttempts)
        .activity(activity_id)
        .limit(MAX_CONSIDERED_ATTEMPTS);
    let raws = fetch(store, "drill_attempts", config.store_timeout, query).await?;
    Ok(parse_all(&raws))
}

pub async fn classify_activity(
    store: &dyn ActivityStore,
    config: &EngineConfig,
    watch: &RecertificationWatch,
    user_id: &str,
    activity_id: &str,
    now: DateTime<Utc>,
) -> Result<TrendClassification, EngineError> {
    let attempts = recent_drill_attempts(store, config, user_id, activity_id).await?;
    let classification = classify_trend(&attempts, now);

    if let Some(notice) = watch.observe(
        user_id,
        activity_id,
        classification.needs_recertification,
        classification.days_until_recertification,
    ) {
        info!(
            user_id = %notice.user_id,
            activity_id = %notice.activity_id,
            days_overdue = notice.days_overdue,
            "Drill now requires recertification"
        );
    }

    Ok(classification)
}
