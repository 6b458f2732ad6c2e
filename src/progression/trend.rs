use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::records::DrillAttempt;

pub const MAX_CONSIDERED_ATTEMPTS: usize = 10;
pub const RECENT_BUCKET: usize = 5;
pub const TREND_MIN_ATTEMPTS: usize = 6;
/// Score gap (points) between the newer and older halves that counts as movement.
pub const TREND_SCORE_DELTA: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrillTrend {
    Improving,
    Stable,
    Degrading,
}

impl DrillTrend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Improving => "improving",
            Self::Stable => "stable",
            Self::Degrading => "degrading",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProficiencyTier {
    Novice,
    Competent,
    Proficient,
    Expert,
}

impl ProficiencyTier {
    pub fn from_average_score(score: f64) -> Self {
        if score >= 95.0 {
            Self::Expert
        } else if score >= 85.0 {
            Self::Proficient
        } else if score >= 75.0 {
            Self::Competent
        } else {
            Self::Novice
        }
    }

    /// Days a proficiency level stays valid without a fresh attempt.
    pub fn cadence_days(&self) -> i64 {
        match self {
            Self::Novice => 7,
            Self::Competent => 14,
            Self::Proficient => 30,
            Self::Expert => 90,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendClassification {
    pub trend: DrillTrend,
    pub proficiency_tier: ProficiencyTier,
    pub average_time: f64,
    pub average_score: f64,
    pub best_time: f64,
    pub best_score: f64,
    pub recent_attempts: usize,
    pub days_since_last_attempt: Option<i64>,
    /// Negative once the cadence has lapsed.
    pub days_until_recertification: i64,
    pub needs_recertification: bool,
}

/// Classify drill attempts ordered newest first.
pub fn classify_trend(attempts: &[DrillAttempt], now: DateTime<Utc>) -> TrendClassification {
    let considered = &attempts[..attempts.len().min(MAX_CONSIDERED_ATTEMPTS)];
    let Some(newest) = considered.first() else {
        return TrendClassification {
            trend: DrillTrend::Stable,
            proficiency_tier: ProficiencyTier::Novice,
            average_time: 0.0,
            average_score: 0.0,
            best_time: 0.0,
            best_score: 0.0,
            recent_attempts: 0,
            days_since_last_attempt: None,
            days_until_recertification: 0,
            needs_recertification: true,
        };
    };

    let bucket = &considered[..considered.len().min(RECENT_BUCKET)];
    let average_time = mean(bucket.iter().map(|a| a.time_secs));
    let average_score = mean(bucket.iter().map(|a| a.score));

    let best_time = considered
        .iter()
        .map(|a| a.time_secs)
        .fold(f64::INFINITY, f64::min);
    let best_score = considered
        .iter()
        .map(|a| a.score)
        .fold(f64::NEG_INFINITY, f64::max);

    let proficiency_tier = ProficiencyTier::from_average_score(average_score);
    let days_since = (now - newest.timestamp).num_days();
    let days_until_recertification = proficiency_tier.cadence_days() - days_since;

    TrendClassification {
        trend: score_trend(considered),
        proficiency_tier,
        average_time,
        average_score,
        best_time,
        best_score,
        recent_attempts: bucket.len(),
        days_since_last_attempt: Some(days_since),
        days_until_recertification,
        needs_recertification: days_until_recertification <= 0,
    }
}

fn score_trend(attempts: &[DrillAttempt]) -> DrillTrend {
    if attempts.len() < TREND_MIN_ATTEMPTS {
        return DrillTrend::Stable;
    }
    let newer = mean(attempts[0..3].iter().map(|a| a.score));
    let older = mean(attempts[3..6].iter().map(|a| a.score));

    if newer - older > TREND_SCORE_DELTA {
        DrillTrend::Improving
    } else if older - newer > TREND_SCORE_DELTA {
        DrillTrend::Degrading
    } else {
        DrillTrend::Stable
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}
