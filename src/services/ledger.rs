//! Append-only log of tier changes and the settings document derived from it.
//!
//! The current tier is never stored on its own: it is replayed from the
//! newest ledger entry, with the cached settings document and finally
//! [`MasteryTier::Novice`] as fallbacks.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{bounded, fetch, metrics, EngineError};
use crate::config::EngineConfig;
use crate::progression::evaluator::{evaluate_progression, should_auto_apply};
use crate::progression::settings::derive_settings;
use crate::progression::types::{DifficultyAdjustment, MasteryTier, Recommendation, TierSettings};
use crate::store::{ActivityStore, Collection, DocumentKey, RawRecord, RecordQuery, SortOrder};

pub const AUTO_ADJUST_REASON_PREFIX: &str = "Auto-adjusted: ";

#[derive(Debug, Clone, PartialEq)]
pub struct AutoAdjustOutcome {
    pub recommendation: Recommendation,
    pub adjustment: Option<DifficultyAdjustment>,
}

/// Tier in force after `entries`, whatever order they come in.
pub fn replay<'a>(
    entries: impl IntoIterator<Item = &'a DifficultyAdjustment>,
    cached: Option<MasteryTier>,
) -> MasteryTier {
    entries
        .into_iter()
        .fold(None::<&DifficultyAdjustment>, |latest, entry| match latest {
            Some(current) if current.timestamp > entry.timestamp => Some(current),
            _ => Some(entry),
        })
        .map(|entry| entry.new_tier)
        .or(cached)
        .unwrap_or_default()
}

pub fn to_record(adjustment: &DifficultyAdjustment) -> Result<RawRecord, EngineError> {
    let payload = match serde_json::to_value(adjustment)? {
        Value::Object(map) => map,
        _ => serde_json::Map::new(),
    };
    Ok(RawRecord {
        id: adjustment.id.clone(),
        user_id: adjustment.user_id.clone(),
        collection: Collection::DifficultyAdjustments,
        category: None,
        activity_id: None,
        timestamp: adjustment.timestamp,
        payload,
    })
}

fn decode_entries(raws: Vec<RawRecord>) -> Vec<DifficultyAdjustment> {
    raws.into_iter()
        .filter_map(|raw| {
            match serde_json::from_value::<DifficultyAdjustment>(Value::Object(raw.payload)) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(record_id = %raw.id, error = %e, "Skipping malformed ledger entry");
                    None
                }
            }
        })
        .collect()
}

async fn read_entries(
    store: &dyn ActivityStore,
    config: &EngineConfig,
    user_id: &str,
    order: SortOrder,
    limit: Option<usize>,
) -> Result<Vec<DifficultyAdjustment>, EngineError> {
    let mut query = RecordQuery::new(user_id, Collection::DifficultyAdjustments).order(order);
    if let Some(n) = limit {
        query = query.limit(n);
    }
    let raws = fetch(store, "difficulty_adjustments", config.store_timeout, query).await?;
    Ok(decode_entries(raws))
}

pub async fn recent_adjustments(
    store: &dyn ActivityStore,
    config: &EngineConfig,
    user_id: &str,
    limit: usize,
) -> Result<Vec<DifficultyAdjustment>, EngineError> {
    read_entries(store, config, user_id, SortOrder::NewestFirst, Some(limit)).await
}

/// Oldest first.
pub async fn adjustment_history(
    store: &dyn ActivityStore,
    config: &EngineConfig,
    user_id: &str,
) -> Result<Vec<DifficultyAdjustment>, EngineError> {
    read_entries(store, config, user_id, SortOrder::OldestFirst, None).await
}

async fn cached_settings(
    store: &dyn ActivityStore,
    config: &EngineConfig,
    user_id: &str,
) -> Result<Option<TierSettings>, EngineError> {
    let key = DocumentKey::tier_settings(user_id);
    let Some(doc) = bounded("tier_settings", config.store_timeout, store.get_document(&key)).await? else {
        return Ok(None);
    };
    match serde_json::from_value::<TierSettings>(doc) {
        Ok(settings) => Ok(Some(settings)),
        Err(e) => {
            warn!(user_id = %user_id, error = %e, "Ignoring malformed tier settings document");
            Ok(None)
        }
    }
}

async fn store_settings(
    store: &dyn ActivityStore,
    config: &EngineConfig,
    user_id: &str,
    settings: &TierSettings,
) -> Result<(), EngineError> {
    let key = DocumentKey::tier_settings(user_id);
    let value = serde_json::to_value(settings)?;
    bounded("tier_settings_upsert", config.store_timeout, store.upsert_document(&key, &value)).await
}

pub async fn current_tier(
    store: &dyn ActivityStore,
    config: &EngineConfig,
    user_id: &str,
) -> Result<MasteryTier, EngineError> {
    let newest = recent_adjustments(store, config, user_id, 1).await?;
    if !newest.is_empty() {
        return Ok(replay(&newest, None));
    }
    let cached = cached_settings(store, config, user_id).await?;
    Ok(replay(&newest, cached.map(|s| s.tier)))
}

/// Cached settings, initialised from the replayed tier on first access.
/// Falls back to novice settings without writing when the store is unreadable.
pub async fn load_settings(store: &dyn ActivityStore, config: &EngineConfig, user_id: &str) -> TierSettings {
    match try_load_settings(store, config, user_id).await {
        Ok(settings) => settings,
        Err(e) => {
            warn!(user_id = %user_id, error = %e, "Failed to load tier settings, using novice defaults");
            derive_settings(MasteryTier::Novice)
        }
    }
}

async fn try_load_settings(
    store: &dyn ActivityStore,
    config: &EngineConfig,
    user_id: &str,
) -> Result<TierSettings, EngineError> {
    let (newest, cached) = tokio::try_join!(
        recent_adjustments(store, config, user_id, 1),
        cached_settings(store, config, user_id),
    )?;
    let tier = replay(&newest, cached.as_ref().map(|s| s.tier));
    if let Some(settings) = cached.filter(|s| s.tier == tier) {
        return Ok(settings);
    }

    // Missing or behind the ledger: re-derive and rewrite the cache.
    let settings = derive_settings(tier);
    if let Err(e) = store_settings(store, config, user_id, &settings).await {
        warn!(user_id = %user_id, tier = tier.as_str(), error = %e, "Failed to refresh cached tier settings");
    } else {
        debug!(user_id = %user_id, tier = tier.as_str(), "Refreshed tier settings from ledger");
    }
    Ok(settings)
}

pub async fn apply_adjustment(
    store: &dyn ActivityStore,
    config: &EngineConfig,
    user_id: &str,
    new_tier: MasteryTier,
    reason: &str,
    auto_adjusted: bool,
    now: DateTime<Utc>,
) -> Result<DifficultyAdjustment, EngineError> {
    let previous_tier = current_tier(store, config, user_id).await?;
    let metrics_snapshot = metrics::compute_metrics(store, config, user_id, config.window_days, now).await;

    let adjustment = DifficultyAdjustment {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        timestamp: now,
        previous_tier,
        new_tier,
        reason: reason.to_string(),
        metrics_snapshot,
        auto_adjusted,
    };

    let record = to_record(&adjustment)?;
    bounded("ledger_append", config.store_timeout, store.append_record(&record)).await?;
    // The append is the commit point; a stale cache is repaired on the next load.
    if let Err(e) = store_settings(store, config, user_id, &derive_settings(new_tier)).await {
        warn!(user_id = %user_id, tier = new_tier.as_str(), error = %e, "Failed to update cached tier settings");
    }

    info!(
        user_id = %user_id,
        from = previous_tier.as_str(),
        to = new_tier.as_str(),
        auto_adjusted,
        "Applied tier adjustment"
    );

    Ok(adjustment)
}

pub async fn check_and_auto_adjust(
    store: &dyn ActivityStore,
    config: &EngineConfig,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<AutoAdjustOutcome, EngineError> {
    let tier = current_tier(store, config, user_id).await?;
    // Zeroed fallback metrics must never drive an automatic tier change.
    let metrics = metrics::try_compute_metrics(store, config, user_id, config.window_days, now).await?;
    let recommendation = evaluate_progression(tier, &metrics);

    if !should_auto_apply(&recommendation, config.auto_apply_confidence) {
        debug!(
            user_id = %user_id,
            kind = recommendation.kind.as_str(),
            confidence = recommendation.confidence,
            "Recommendation not auto-applied"
        );
        return Ok(AutoAdjustOutcome {
            recommendation,
            adjustment: None,
        });
    }

    let reason = format!("{}{}", AUTO_ADJUST_REASON_PREFIX, recommendation.reasoning.join(". "));
    let adjustment = apply_adjustment(
        store,
        config,
        user_id,
        recommendation.suggested_tier,
        &reason,
        true,
        now,
    )
    .await?;

    Ok(AutoAdjustOutcome {
        recommendation,
        adjustment: Some(adjustment),
    })
}
