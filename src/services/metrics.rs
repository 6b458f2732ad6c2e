use chrono::{DateTime, Utc};
use tracing::warn;

use super::{fetch, EngineError};
use crate::config::EngineConfig;
use crate::progression::metrics::{aggregate, MetricsInput, MetricsWindow};
use crate::progression::types::PerformanceMetrics;
use crate::store::records::ActivityRecord;
use crate::store::{ActivityStore, Collection, RecordQuery};

pub async fn try_compute_metrics(
    store: &dyn ActivityStore,
    config: &EngineConfig,
    user_id: &str,
    window_days: u32,
    now: DateTime<Utc>,
) -> Result<PerformanceMetrics, EngineError> {
    let window = MetricsWindow::new(now, window_days, config.utc_offset);
    let range = window.range();
    let limit = config.store_timeout;
    let windowed = |collection| RecordQuery::new(user_id, collection).range(range);

    let (quizzes, labs, drills, failures, tokens, progress, sessions) = tokio::try_join!(
        fetch(store, "quiz_attempts", limit, windowed(Collection::QuizAttempts)),
        fetch(store, "lab_completions", limit, windowed(Collection::LabCompletions)),
        fetch(store, "drill_attempts", limit, windowed(Collection::DrillAttempts)),
        fetch(store, "failure_logs", limit, windowed(Collection::FailureLogs)),
        fetch(store, "reset_tokens", limit, windowed(Collection::ResetTokens)),
        fetch(store, "progress", limit, RecordQuery::new(user_id, Collection::Progress)),
        fetch(
            store,
            "study_sessions",
            limit,
            RecordQuery::new(user_id, Collection::StudySessions).range(window.streak_range()),
        ),
    )?;

    let records = [quizzes, labs, drills, failures, tokens, progress, sessions]
        .into_iter()
        .flatten()
        .filter_map(|raw| ActivityRecord::from_raw(&raw));

    Ok(aggregate(&MetricsInput::from_records(records), &window))
}

/// Never fails: unreadable data yields the neutral all-zero snapshot.
pub async fn compute_metrics(
    store: &dyn ActivityStore,
    config: &EngineConfig,
    user_id: &str,
    window_days: u32,
    now: DateTime<Utc>,
) -> PerformanceMetrics {
    match try_compute_metrics(store, config, user_id, window_days, now).await {
        Ok(metrics) => metrics,
        Err(e) => {
            warn!(user_id = %user_id, error = %e, "Failed to load performance data, using neutral metrics");
            PerformanceMetrics::default()
        }
    }
}
