//! Promotion and demotion threshold tables.
//!
//! Promotion tables are keyed by the tier being promoted *to* and every
//! criterion must hold. Demotion tables are keyed by the tier being demoted
//! *from* and each criterion describes a breach; one breach is enough.

use serde::{Deserialize, Serialize};

use super::types::{MasteryTier, PerformanceMetrics};

const RELATIVE_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetricKey {
    QuizSuccessRate,
    AvgQuizScore,
    QuizStreak,
    LabCompletionRate,
    AvgLabScore,
    DrillSuccessRate,
    AvgEasinessFactor,
    WeakTopicCount,
    FailureRate,
    AarCompletionRate,
    ResetTokenUsage,
    StudyStreak,
    AvgSessionsPerWeek,
}

impl MetricKey {
    pub fn value(&self, metrics: &PerformanceMetrics) -> f64 {
        match self {
            Self::QuizSuccessRate => metrics.quiz_success_rate,
            Self::AvgQuizScore => metrics.avg_quiz_score,
            Self::QuizStreak => f64::from(metrics.quiz_streak),
            Self::LabCompletionRate => metrics.lab_completion_rate,
            Self::AvgLabScore => metrics.avg_lab_score,
            Self::DrillSuccessRate => metrics.drill_success_rate,
            Self::AvgEasinessFactor => metrics.avg_easiness_factor,
            Self::WeakTopicCount => f64::from(metrics.weak_topic_count),
            Self::FailureRate => metrics.failure_rate,
            Self::AarCompletionRate => metrics.aar_completion_rate,
            Self::ResetTokenUsage => f64::from(metrics.reset_token_usage),
            Self::StudyStreak => f64::from(metrics.study_streak),
            Self::AvgSessionsPerWeek => metrics.avg_sessions_per_week,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::QuizSuccessRate => "quiz success rate",
            Self::AvgQuizScore => "average quiz score",
            Self::QuizStreak => "quiz streak",
            Self::LabCompletionRate => "lab completion rate",
            Self::AvgLabScore => "average lab score",
            Self::DrillSuccessRate => "drill success rate",
            Self::AvgEasinessFactor => "average easiness factor",
            Self::WeakTopicCount => "weak topic count",
            Self::FailureRate => "failure rate",
            Self::AarCompletionRate => "after-action review completion rate",
            Self::ResetTokenUsage => "reset token usage",
            Self::StudyStreak => "study streak",
            Self::AvgSessionsPerWeek => "sessions per week",
        }
    }

    fn is_count(&self) -> bool {
        matches!(
            self,
            Self::QuizStreak | Self::WeakTopicCount | Self::ResetTokenUsage | Self::StudyStreak
        )
    }

    pub fn format(&self, value: f64) -> String {
        if self.is_count() {
            format!("{}", value.round() as i64)
        } else {
            format!("{value:.2}")
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonOperator {
    Gt,
    Gte,
    Lt,
    Lte,
}

impl ComparisonOperator {
    pub fn evaluate(&self, value: f64, threshold: f64) -> bool {
        match self {
            Self::Gt => value > threshold,
            Self::Gte => value >= threshold,
            Self::Lt => value < threshold,
            Self::Lte => value <= threshold,
        }
    }

    fn is_lower_bound(&self) -> bool {
        matches!(self, Self::Gt | Self::Gte)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Criterion {
    pub metric: MetricKey,
    pub operator: ComparisonOperator,
    pub threshold: f64,
}

impl Criterion {
    pub const fn new(metric: MetricKey, operator: ComparisonOperator, threshold: f64) -> Self {
        Self {
            metric,
            operator,
            threshold,
        }
    }
}

use ComparisonOperator::{Gt, Gte, Lt, Lte};
use MetricKey::*;

pub const PROMOTE_TO_INTERMEDIATE: &[Criterion] = &[
    Criterion::new(QuizSuccessRate, Gte, 0.8),
    Criterion::new(LabCompletionRate, Gte, 0.75),
    Criterion::new(DrillSuccessRate, Gte, 0.7),
    Criterion::new(StudyStreak, Gte, 5.0),
];

pub const PROMOTE_TO_ADVANCED: &[Criterion] = &[
    Criterion::new(QuizSuccessRate, Gte, 0.85),
    Criterion::new(LabCompletionRate, Gte, 0.85),
    Criterion::new(DrillSuccessRate, Gte, 0.8),
    Criterion::new(AvgEasinessFactor, Gte, 2.2),
    Criterion::new(StudyStreak, Gte, 10.0),
];

pub const PROMOTE_TO_ELITE: &[Criterion] = &[
    Criterion::new(QuizSuccessRate, Gte, 0.9),
    Criterion::new(LabCompletionRate, Gte, 0.9),
    Criterion::new(DrillSuccessRate, Gte, 0.85),
    Criterion::new(AvgEasinessFactor, Gte, 2.5),
    Criterion::new(StudyStreak, Gte, 14.0),
    Criterion::new(WeakTopicCount, Lte, 0.0),
];

pub const DEMOTE_FROM_ELITE: &[Criterion] = &[
    Criterion::new(QuizSuccessRate, Lt, 0.75),
    Criterion::new(DrillSuccessRate, Lt, 0.7),
    Criterion::new(FailureRate, Gt, 0.3),
    Criterion::new(ResetTokenUsage, Gt, 8.0),
];

pub const DEMOTE_FROM_ADVANCED: &[Criterion] = &[
    Criterion::new(QuizSuccessRate, Lt, 0.7),
    Criterion::new(DrillSuccessRate, Lt, 0.65),
    Criterion::new(FailureRate, Gt, 0.35),
    Criterion::new(ResetTokenUsage, Gt, 10.0),
];

pub const DEMOTE_FROM_INTERMEDIATE: &[Criterion] = &[
    Criterion::new(QuizSuccessRate, Lt, 0.65),
    Criterion::new(DrillSuccessRate, Lt, 0.6),
    Criterion::new(FailureRate, Gt, 0.4),
    Criterion::new(ResetTokenUsage, Gt, 12.0),
];

/// Criteria that must all hold to enter `target`.
pub fn promotion_criteria(target: MasteryTier) -> &'static [Criterion] {
    match target {
        MasteryTier::Novice => &[],
        MasteryTier::Intermediate => PROMOTE_TO_INTERMEDIATE,
        MasteryTier::Advanced => PROMOTE_TO_ADVANCED,
        MasteryTier::Elite => PROMOTE_TO_ELITE,
    }
}

/// Breach conditions that drop a user out of `current`.
pub fn demotion_criteria(current: MasteryTier) -> &'static [Criterion] {
    match current {
        MasteryTier::Novice => &[],
        MasteryTier::Intermediate => DEMOTE_FROM_INTERMEDIATE,
        MasteryTier::Advanced => DEMOTE_FROM_ADVANCED,
        MasteryTier::Elite => DEMOTE_FROM_ELITE,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateKind {
    /// Passes only when every criterion holds.
    Conjunctive,
    /// Passes when any criterion holds.
    Disjunctive,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CriterionOutcome {
    pub criterion: Criterion,
    pub value: f64,
    pub holds: bool,
    /// Signed distance past the threshold in the operator's direction,
    /// relative to the threshold. Positive when the criterion holds.
    pub relative_margin: f64,
}

impl CriterionOutcome {
    fn evaluate(criterion: &Criterion, metrics: &PerformanceMetrics) -> Self {
        let value = criterion.metric.value(metrics);
        let holds = criterion.operator.evaluate(value, criterion.threshold);
        let scale = if criterion.threshold.abs() > f64::EPSILON {
            criterion.threshold.abs()
        } else {
            1.0
        };
        let directed = if criterion.operator.is_lower_bound() {
            value - criterion.threshold
        } else {
            criterion.threshold - value
        };

        Self {
            criterion: *criterion,
            value,
            holds,
            relative_margin: directed / scale,
        }
    }

    pub fn clears_margin(&self, margin: f64) -> bool {
        self.holds && self.relative_margin + RELATIVE_EPSILON >= margin
    }

    pub fn label(&self) -> &'static str {
        self.criterion.metric.label()
    }

    pub fn formatted_value(&self) -> String {
        self.criterion.metric.format(self.value)
    }

    pub fn formatted_threshold(&self) -> String {
        self.criterion.metric.format(self.criterion.threshold)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GateResult {
    pub kind: GateKind,
    pub outcomes: Vec<CriterionOutcome>,
    pub passed: bool,
}

impl GateResult {
    pub fn holding(&self) -> impl Iterator<Item = &CriterionOutcome> {
        self.outcomes.iter().filter(|o| o.holds)
    }

    pub fn failing(&self) -> impl Iterator<Item = &CriterionOutcome> {
        self.outcomes.iter().filter(|o| !o.holds)
    }
}

pub fn evaluate_gate(criteria: &[Criterion], metrics: &PerformanceMetrics, kind: GateKind) -> GateResult {
    let outcomes: Vec<CriterionOutcome> = criteria
        .iter()
        .map(|c| CriterionOutcome::evaluate(c, metrics))
        .collect();

    let passed = !outcomes.is_empty()
        && match kind {
            GateKind::Conjunctive => outcomes.iter().all(|o| o.holds),
            GateKind::Disjunctive => outcomes.iter().any(|o| o.holds),
        };

    GateResult {
        kind,
        outcomes,
        passed,
    }
}
