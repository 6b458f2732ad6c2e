//! Skill decay: recent practice scores against an older baseline.

use chrono::{DateTime, Duration, Utc};

use super::types::SkillDecayAlert;
use crate::store::TimeRange;

pub const RECENT_WINDOW_DAYS: i64 = 7;
pub const HISTORICAL_START_DAYS: i64 = 60;
pub const HISTORICAL_END_DAYS: i64 = 30;

/// Alert when decay exceeds this percentage.
pub const DECAY_ALERT_THRESHOLD: f64 = 25.0;
/// Require recertification when decay exceeds this percentage.
pub const DECAY_RECERT_THRESHOLD: f64 = 40.0;

pub const DEFAULT_SKILL_CATEGORIES: [&str; 5] =
    ["docker", "kubernetes", "cicd", "networking", "scripting"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecayWindows {
    pub recent: TimeRange,
    pub historical: TimeRange,
}

impl DecayWindows {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            recent: TimeRange::between(now - Duration::days(RECENT_WINDOW_DAYS), now),
            historical: TimeRange::between(
                now - Duration::days(HISTORICAL_START_DAYS),
                now - Duration::days(HISTORICAL_END_DAYS),
            ),
        }
    }
}

/// Scores gathered for one category across both windows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategorySamples {
    pub category: String,
    pub recent: Vec<f64>,
    pub historical: Vec<f64>,
    pub last_practiced_at: Option<DateTime<Utc>>,
}

/// `None` when there is no usable baseline.
pub fn decay_percentage(historical_avg: f64, recent_avg: f64) -> Option<f64> {
    if historical_avg > 0.0 {
        Some((historical_avg - recent_avg) * 100.0 / historical_avg)
    } else {
        None
    }
}

pub fn evaluate_category(samples: &CategorySamples) -> Option<SkillDecayAlert> {
    if samples.historical.is_empty() {
        return None;
    }

    let historical = average(&samples.historical);
    let recent = average(&samples.recent);
    let decay = decay_percentage(historical, recent)?;
    let unpracticed = samples.recent.is_empty();

    if decay <= DECAY_ALERT_THRESHOLD && !unpracticed {
        return None;
    }

    Some(SkillDecayAlert {
        skill: skill_display_name(&samples.category),
        skill_category: samples.category.clone(),
        recent_performance: recent,
        historical_performance: historical,
        decay_percentage: decay,
        recent_sample_count: samples.recent.len(),
        last_practiced_at: samples.last_practiced_at.unwrap_or_default(),
        requires_recertification: decay > DECAY_RECERT_THRESHOLD || unpracticed,
    })
}

pub fn collect_alerts<'a>(samples: impl IntoIterator<Item = &'a CategorySamples>) -> Vec<SkillDecayAlert> {
    let mut alerts: Vec<SkillDecayAlert> = samples.into_iter().filter_map(evaluate_category).collect();
    alerts.sort_by(|a, b| b.decay_percentage.total_cmp(&a.decay_percentage));
    alerts
}

pub fn skill_display_name(category: &str) -> String {
    let mut chars = category.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn average(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
