use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MasteryTier {
    #[default]
    Novice,
    Intermediate,
    Advanced,
    Elite,
}

impl MasteryTier {
    pub const ALL: [MasteryTier; 4] = [
        MasteryTier::Novice,
        MasteryTier::Intermediate,
        MasteryTier::Advanced,
        MasteryTier::Elite,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Novice => "novice",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
            Self::Elite => "elite",
        }
    }

    /// Accepts both the current names and the legacy recruit/soldier/specialist
    /// names. Anything unknown maps to the bottom tier.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "intermediate" | "soldier" => Self::Intermediate,
            "advanced" | "specialist" => Self::Advanced,
            "elite" => Self::Elite,
            _ => Self::Novice,
        }
    }

    pub fn rank(&self) -> i64 {
        match self {
            Self::Novice => 0,
            Self::Intermediate => 1,
            Self::Advanced => 2,
            Self::Elite => 3,
        }
    }

    /// Out-of-range ranks are clamped rather than rejected.
    pub fn from_rank(rank: i64) -> Self {
        match rank {
            i64::MIN..=0 => Self::Novice,
            1 => Self::Intermediate,
            2 => Self::Advanced,
            _ => Self::Elite,
        }
    }

    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Novice => Some(Self::Intermediate),
            Self::Intermediate => Some(Self::Advanced),
            Self::Advanced => Some(Self::Elite),
            Self::Elite => None,
        }
    }

    pub fn previous(&self) -> Option<Self> {
        match self {
            Self::Novice => None,
            Self::Intermediate => Some(Self::Novice),
            Self::Advanced => Some(Self::Intermediate),
            Self::Elite => Some(Self::Advanced),
        }
    }

    pub fn promoted(&self) -> Self {
        Self::from_rank(self.rank() + 1)
    }

    pub fn demoted(&self) -> Self {
        Self::from_rank(self.rank() - 1)
    }

    pub fn is_top(&self) -> bool {
        self.next().is_none()
    }

    pub fn is_bottom(&self) -> bool {
        self.previous().is_none()
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Novice => "Novice",
            Self::Intermediate => "Intermediate",
            Self::Advanced => "Advanced",
            Self::Elite => "Elite",
        }
    }
}

impl std::fmt::Display for MasteryTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    pub quiz_success_rate: f64,
    pub avg_quiz_score: f64,
    pub quiz_streak: u32,

    pub lab_completion_rate: f64,
    pub avg_lab_score: f64,
    pub avg_lab_time: f64,

    pub drill_success_rate: f64,
    pub avg_drill_time: f64,

    pub avg_easiness_factor: f64,
    pub weak_topic_count: u32,

    pub failure_rate: f64,
    pub aar_completion_rate: f64,
    pub reset_token_usage: u32,

    pub study_streak: u32,
    pub avg_sessions_per_week: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabGuidance {
    Full,
    Partial,
    Minimal,
    None,
}

impl LabGuidance {
    /// Amount of support, higher means more help.
    pub fn support_level(&self) -> u8 {
        match self {
            Self::Full => 3,
            Self::Partial => 2,
            Self::Minimal => 1,
            Self::None => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStrictness {
    Lenient,
    Normal,
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrillComplexity {
    Basic,
    Intermediate,
    Advanced,
    Expert,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierSettings {
    pub tier: MasteryTier,

    pub quiz_time_multiplier: f64,
    pub quiz_hints_available: bool,
    pub quiz_passing_score: u32,

    pub lab_guidance: LabGuidance,
    pub lab_time_limit_secs: Option<u32>,
    pub lab_validation_strictness: ValidationStrictness,

    pub drill_time_target_secs: u32,
    pub drill_complexity: DrillComplexity,
    pub simultaneous_failures: u32,

    pub review_interval_multiplier: f64,
    pub new_items_per_day: u32,

    pub stress_intensity: u8,
    pub multitasking_required: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationKind {
    Increase,
    Decrease,
    Maintain,
}

impl RecommendationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Increase => "increase",
            Self::Decrease => "decrease",
            Self::Maintain => "maintain",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub kind: RecommendationKind,
    pub confidence: f64,
    pub reasoning: Vec<String>,
    pub current_tier: MasteryTier,
    pub suggested_tier: MasteryTier,
    pub metrics_snapshot: PerformanceMetrics,
}

impl Recommendation {
    pub fn is_change(&self) -> bool {
        self.kind != RecommendationKind::Maintain
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyAdjustment {
    pub id: String,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    pub previous_tier: MasteryTier,
    pub new_tier: MasteryTier,
    pub reason: String,
    pub metrics_snapshot: PerformanceMetrics,
    pub auto_adjusted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillDecayAlert {
    pub skill: String,
    pub skill_category: String,
    pub recent_performance: f64,
    pub historical_performance: f64,
    pub decay_percentage: f64,
    pub recent_sample_count: usize,
    pub last_practiced_at: DateTime<Utc>,
    pub requires_recertification: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecertificationStatus {
    pub last_recertified_at: Option<DateTime<Utc>>,
    pub next_due_at: Option<DateTime<Utc>>,
    pub days_until_due: i64,
    pub is_overdue: bool,
    pub skills_needing_recert: Vec<SkillDecayAlert>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecertificationRecord {
    pub last_recertified_at: DateTime<Utc>,
    pub drill_results: BTreeMap<String, bool>,
    pub passed: bool,
    pub skills_recertified: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_are_totally_ordered() {
        assert!(MasteryTier::Novice < MasteryTier::Intermediate);
        assert!(MasteryTier::Intermediate < MasteryTier::Advanced);
        assert!(MasteryTier::Advanced < MasteryTier::Elite);
    }

    #[test]
    fn promotion_and_demotion_saturate() {
        assert_eq!(MasteryTier::Elite.promoted(), MasteryTier::Elite);
        assert_eq!(MasteryTier::Novice.demoted(), MasteryTier::Novice);
        assert_eq!(MasteryTier::Advanced.promoted(), MasteryTier::Elite);
        assert_eq!(MasteryTier::from_rank(-4), MasteryTier::Novice);
        assert_eq!(MasteryTier::from_rank(99), MasteryTier::Elite);
    }

    #[test]
    fn parse_accepts_legacy_names() {
        assert_eq!(MasteryTier::parse("recruit"), MasteryTier::Novice);
        assert_eq!(MasteryTier::parse("Soldier"), MasteryTier::Intermediate);
        assert_eq!(MasteryTier::parse("specialist"), MasteryTier::Advanced);
        assert_eq!(MasteryTier::parse("elite"), MasteryTier::Elite);
        assert_eq!(MasteryTier::parse("garbage"), MasteryTier::Novice);
    }

    #[test]
    fn tier_serializes_lowercase() {
        let json = serde_json::to_string(&MasteryTier::Advanced).unwrap();
        assert_eq!(json, "\"advanced\"");
    }
}
