//! Consumer-facing facade over the store-backed services and the pure core.
//!
//! Every operation that depends on wall-clock time has an `*_at` variant
//! taking `now` explicitly so evaluations can be replayed deterministically.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::EngineConfig;
use crate::progression::recertification::{RecertificationNotice, RecertificationWatch};
use crate::progression::trend::TrendClassification;
use crate::progression::types::{
    DifficultyAdjustment, MasteryTier, PerformanceMetrics, RecertificationRecord,
    RecertificationStatus, Recommendation, SkillDecayAlert, TierSettings,
};
use crate::progression::{evaluator, settings, trend};
use crate::services::{self, ledger::AutoAdjustOutcome};
use crate::store::records::DrillAttempt;
use crate::store::ActivityStore;

pub use crate::services::EngineError;

#[derive(Clone)]
pub struct ProgressionEngine {
    store: Arc<dyn ActivityStore>,
    config: EngineConfig,
    watch: Arc<RecertificationWatch>,
}

impl std::fmt::Debug for ProgressionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressionEngine")
            .field("config", &self.config)
            .field("watch", &self.watch)
            .finish_non_exhaustive()
    }
}

impl ProgressionEngine {
    pub fn new(store: Arc<dyn ActivityStore>, config: EngineConfig) -> Self {
        Self {
            store,
            config,
            watch: Arc::new(RecertificationWatch::new()),
        }
    }

    /// Registers the handler invoked when a drill starts needing recertification.
    pub fn with_recertification_callback(
        mut self,
        callback: impl Fn(&RecertificationNotice) + Send + Sync + 'static,
    ) -> Self {
        self.watch = Arc::new(RecertificationWatch::with_callback(callback));
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn ActivityStore> {
        &self.store
    }

    // Metrics

    pub async fn compute_metrics(&self, user_id: &str, window_days: u32) -> PerformanceMetrics {
        self.compute_metrics_at(user_id, window_days, Utc::now()).await
    }

    pub async fn compute_metrics_at(
        &self,
        user_id: &str,
        window_days: u32,
        now: DateTime<Utc>,
    ) -> PerformanceMetrics {
        services::metrics::compute_metrics(self.store.as_ref(), &self.config, user_id, window_days, now).await
    }

    pub async fn try_compute_metrics(
        &self,
        user_id: &str,
        window_days: u32,
    ) -> Result<PerformanceMetrics, EngineError> {
        self.try_compute_metrics_at(user_id, window_days, Utc::now()).await
    }

    pub async fn try_compute_metrics_at(
        &self,
        user_id: &str,
        window_days: u32,
        now: DateTime<Utc>,
    ) -> Result<PerformanceMetrics, EngineError> {
        services::metrics::try_compute_metrics(self.store.as_ref(), &self.config, user_id, window_days, now)
            .await
    }

    // Pure evaluation

    pub fn evaluate_progression(&self, current: MasteryTier, metrics: &PerformanceMetrics) -> Recommendation {
        evaluator::evaluate_progression(current, metrics)
    }

    pub fn should_auto_apply(&self, recommendation: &Recommendation) -> bool {
        evaluator::should_auto_apply(recommendation, self.config.auto_apply_confidence)
    }

    pub fn derive_settings(&self, tier: MasteryTier) -> TierSettings {
        settings::derive_settings(tier)
    }

    pub fn classify_trend(&self, attempts: &[DrillAttempt]) -> TrendClassification {
        trend::classify_trend(attempts, Utc::now())
    }

    pub fn classify_trend_at(&self, attempts: &[DrillAttempt], now: DateTime<Utc>) -> TrendClassification {
        trend::classify_trend(attempts, now)
    }

    // Decay

    pub async fn analyze_decay(&self, user_id: &str, categories: &[String]) -> Vec<SkillDecayAlert> {
        self.analyze_decay_at(user_id, categories, Utc::now()).await
    }

    pub async fn analyze_decay_at(
        &self,
        user_id: &str,
        categories: &[String],
        now: DateTime<Utc>,
    ) -> Vec<SkillDecayAlert> {
        services::decay::analyze_decay(self.store.as_ref(), &self.config, user_id, categories, now).await
    }

    pub async fn try_analyze_decay_at(
        &self,
        user_id: &str,
        categories: &[String],
        now: DateTime<Utc>,
    ) -> Result<Vec<SkillDecayAlert>, EngineError> {
        services::decay::try_analyze_decay(self.store.as_ref(), &self.config, user_id, categories, now).await
    }

    // Trends

    pub async fn classify_activity(
        &self,
        user_id: &str,
        activity_id: &str,
    ) -> Result<TrendClassification, EngineError> {
        self.classify_activity_at(user_id, activity_id, Utc::now()).await
    }

    pub async fn classify_activity_at(
        &self,
        user_id: &str,
        activity_id: &str,
        now: DateTime<Utc>,
    ) -> Result<TrendClassification, EngineError> {
        services::trend::classify_activity(
            self.store.as_ref(),
            &self.config,
            &self.watch,
            user_id,
            activity_id,
            now,
        )
        .await
    }

    // Ledger

    pub async fn current_tier(&self, user_id: &str) -> Result<MasteryTier, EngineError> {
        services::ledger::current_tier(self.store.as_ref(), &self.config, user_id).await
    }

    pub async fn apply_adjustment(
        &self,
        user_id: &str,
        new_tier: MasteryTier,
        reason: &str,
        auto_adjusted: bool,
    ) -> Result<DifficultyAdjustment, EngineError> {
        self.apply_adjustment_at(user_id, new_tier, reason, auto_adjusted, Utc::now())
            .await
    }

    pub async fn apply_adjustment_at(
        &self,
        user_id: &str,
        new_tier: MasteryTier,
        reason: &str,
        auto_adjusted: bool,
        now: DateTime<Utc>,
    ) -> Result<DifficultyAdjustment, EngineError> {
        services::ledger::apply_adjustment(
            self.store.as_ref(),
            &self.config,
            user_id,
            new_tier,
            reason,
            auto_adjusted,
            now,
        )
        .await
    }

    pub async fn recent_adjustments(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<DifficultyAdjustment>, EngineError> {
        services::ledger::recent_adjustments(self.store.as_ref(), &self.config, user_id, limit).await
    }

    pub async fn adjustment_history(&self, user_id: &str) -> Result<Vec<DifficultyAdjustment>, EngineError> {
        services::ledger::adjustment_history(self.store.as_ref(), &self.config, user_id).await
    }

    pub async fn check_and_auto_adjust(&self, user_id: &str) -> Result<AutoAdjustOutcome, EngineError> {
        self.check_and_auto_adjust_at(user_id, Utc::now()).await
    }

    pub async fn check_and_auto_adjust_at(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<AutoAdjustOutcome, EngineError> {
        services::ledger::check_and_auto_adjust(self.store.as_ref(), &self.config, user_id, now).await
    }

    pub async fn load_settings(&self, user_id: &str) -> TierSettings {
        services::ledger::load_settings(self.store.as_ref(), &self.config, user_id).await
    }

    // Recertification

    pub async fn recertification_status(
        &self,
        user_id: &str,
        categories: &[String],
    ) -> Result<RecertificationStatus, EngineError> {
        self.recertification_status_at(user_id, categories, Utc::now()).await
    }

    pub async fn recertification_status_at(
        &self,
        user_id: &str,
        categories: &[String],
        now: DateTime<Utc>,
    ) -> Result<RecertificationStatus, EngineError> {
        services::recertification::recertification_status(
            self.store.as_ref(),
            &self.config,
            user_id,
            categories,
            now,
        )
        .await
    }

    pub async fn complete_recertification(
        &self,
        user_id: &str,
        drill_results: BTreeMap<String, bool>,
    ) -> Result<RecertificationRecord, EngineError> {
        self.complete_recertification_at(user_id, drill_results, Utc::now())
            .await
    }

    pub async fn complete_recertification_at(
        &self,
        user_id: &str,
        drill_results: BTreeMap<String, bool>,
        now: DateTime<Utc>,
    ) -> Result<RecertificationRecord, EngineError> {
        services::recertification::complete_recertification(
            self.store.as_ref(),
            &self.config,
            user_id,
            drill_results,
            now,
        )
        .await
    }
}
