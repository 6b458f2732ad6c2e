use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::{fetch, EngineError};
use crate::config::EngineConfig;
use crate::progression::decay::{collect_alerts, CategorySamples, DecayWindows};
use crate::progression::types::SkillDecayAlert;
use crate::store::records::{parse_all, ProgressEntry};
use crate::store::{ActivityStore, Collection, RawRecord, RecordQuery};

pub async fn try_analyze_decay(
    store: &dyn ActivityStore,
    config: &EngineConfig,
    user_id: &str,
    categories: &[String],
    now: DateTime<Utc>,
) -> Result<Vec<SkillDecayAlert>, EngineError> {
    let windows = DecayWindows::at(now);
    let limit = config.store_timeout;
    let mut samples = Vec::with_capacity(categories.len());

    for category in categories {
        let base = RecordQuery::new(user_id, Collection::Progress).category(category);
        let (recent, historical, latest) = tokio::try_join!(
            fetch(store, "progress_recent", limit, base.clone().range(windows.recent)),
            fetch(store, "progress_historical", limit, base.clone().range(windows.historical)),
            fetch(store, "progress_latest", limit, base.clone().limit(1)),
        )?;

        samples.push(CategorySamples {
            category: category.clone(),
            recent: scores(&recent),
            historical: scores(&historical),
            last_practiced_at: latest.first().map(|r| r.timestamp),
        });
    }

    let alerts = collect_alerts(&samples);
    debug!(
        user_id = %user_id,
        categories = categories.len(),
        alerts = alerts.len(),
        "Decay analysis completed"
    );
    Ok(alerts)
}

/// Store failures degrade to "no alerts".
pub async fn analyze_decay(
    store: &dyn ActivityStore,
    config: &EngineConfig,
    user_id: &str,
    categories: &[String],
    now: DateTime<Utc>,
) -> Vec<SkillDecayAlert> {
    match try_analyze_decay(store, config, user_id, categories, now).await {
        Ok(alerts) => alerts,
        Err(e) => {
            warn!(user_id = %user_id, error = %e, "Decay analysis failed, reporting no alerts");
            Vec::new()
        }
    }
}

fn scores(raws: &[RawRecord]) -> Vec<f64> {
    parse_all::<ProgressEntry>(raws).into_iter().map(|p| p.score).collect()
}
