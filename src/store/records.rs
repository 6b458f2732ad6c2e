//! Typed activity records.
//!
//! Every mapping from [`RawRecord`] is total: missing or mistyped fields fall
//! back to zero / false so one bad row never aborts an evaluation.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use super::{Collection, RawRecord};

#[derive(Debug, Clone, PartialEq)]
pub struct QuizAttempt {
    pub timestamp: DateTime<Utc>,
    pub score: f64,
    pub passed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabCompletion {
    pub timestamp: DateTime<Utc>,
    pub completed: bool,
    pub score: f64,
    pub time_spent_secs: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrillAttempt {
    pub timestamp: DateTime<Utc>,
    pub activity_id: Option<String>,
    pub passed: bool,
    pub time_secs: f64,
    pub score: f64,
    pub hints_used: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudySession {
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FailureLog {
    pub timestamp: DateTime<Utc>,
    pub aar_completed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResetTokenUse {
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEntry {
    pub timestamp: DateTime<Utc>,
    pub category: Option<String>,
    pub score: f64,
    pub easiness_factor: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActivityRecord {
    Quiz(QuizAttempt),
    Lab(LabCompletion),
    Drill(DrillAttempt),
    Session(StudySession),
    Failure(FailureLog),
    ResetToken(ResetTokenUse),
    Progress(ProgressEntry),
}

impl ActivityRecord {
    /// Ledger rows are not activity and map to `None`.
    pub fn from_raw(raw: &RawRecord) -> Option<Self> {
        let record = match raw.collection {
            Collection::QuizAttempts => Self::Quiz(QuizAttempt::from(raw)),
            Collection::LabCompletions => Self::Lab(LabCompletion::from(raw)),
            Collection::DrillAttempts => Self::Drill(DrillAttempt::from(raw)),
            Collection::StudySessions => Self::Session(StudySession::from(raw)),
            Collection::FailureLogs => Self::Failure(FailureLog::from(raw)),
            Collection::ResetTokens => Self::ResetToken(ResetTokenUse::from(raw)),
            Collection::Progress => Self::Progress(ProgressEntry::from(raw)),
            Collection::DifficultyAdjustments => return None,
        };
        Some(record)
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Quiz(r) => r.timestamp,
            Self::Lab(r) => r.timestamp,
            Self::Drill(r) => r.timestamp,
            Self::Session(r) => r.started_at,
            Self::Failure(r) => r.timestamp,
            Self::ResetToken(r) => r.timestamp,
            Self::Progress(r) => r.timestamp,
        }
    }
}

impl From<&RawRecord> for QuizAttempt {
    fn from(raw: &RawRecord) -> Self {
        Self {
            timestamp: raw.timestamp,
            score: number(&raw.payload, &["score"]),
            passed: flag(&raw.payload, &["passed"]),
        }
    }
}

impl From<&RawRecord> for LabCompletion {
    fn from(raw: &RawRecord) -> Self {
        Self {
            timestamp: raw.timestamp,
            completed: flag(&raw.payload, &["completed"]),
            score: number(&raw.payload, &["score"]),
            time_spent_secs: number(&raw.payload, &["timeSpent", "timeSpentSecs"]),
        }
    }
}

impl From<&RawRecord> for DrillAttempt {
    fn from(raw: &RawRecord) -> Self {
        Self {
            timestamp: raw.timestamp,
            activity_id: raw.activity_id.clone(),
            passed: flag(&raw.payload, &["passed", "success"]),
            time_secs: number(&raw.payload, &["timeSeconds", "completionTime"]),
            score: number(&raw.payload, &["score"]),
            hints_used: number(&raw.payload, &["hintsUsed"]).max(0.0) as u32,
        }
    }
}

impl From<&RawRecord> for StudySession {
    fn from(raw: &RawRecord) -> Self {
        Self {
            started_at: raw.timestamp,
        }
    }
}

impl From<&RawRecord> for FailureLog {
    fn from(raw: &RawRecord) -> Self {
        Self {
            timestamp: raw.timestamp,
            aar_completed: flag(&raw.payload, &["aarCompleted"]),
        }
    }
}

impl From<&RawRecord> for ResetTokenUse {
    fn from(raw: &RawRecord) -> Self {
        Self {
            timestamp: raw.timestamp,
        }
    }
}

impl From<&RawRecord> for ProgressEntry {
    fn from(raw: &RawRecord) -> Self {
        Self {
            timestamp: raw.timestamp,
            category: raw.category.clone(),
            score: number(&raw.payload, &["score"]),
            easiness_factor: optional_number(&raw.payload, &["easinessFactor"]),
        }
    }
}

pub fn parse_all<'a, T>(raws: impl IntoIterator<Item = &'a RawRecord>) -> Vec<T>
where
    T: From<&'a RawRecord>,
{
    raws.into_iter().map(T::from).collect()
}

fn optional_number(payload: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .filter_map(|key| payload.get(*key))
        .find_map(|value| match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        })
        .filter(|v| v.is_finite())
}

fn number(payload: &Map<String, Value>, keys: &[&str]) -> f64 {
    optional_number(payload, keys).unwrap_or(0.0)
}

fn flag(payload: &Map<String, Value>, keys: &[&str]) -> bool {
    keys.iter()
        .filter_map(|key| payload.get(*key))
        .find_map(|value| match value {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_f64().map(|v| v != 0.0),
            Value::String(s) => match s.as_str() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 9, 30, 0).unwrap()
    }

    #[test]
    fn quiz_fields_map_directly() {
        let raw = RawRecord::new("u", Collection::QuizAttempts, ts())
            .with_field("score", 87.5)
            .with_field("passed", true);
        let quiz = QuizAttempt::from(&raw);
        assert_eq!(quiz.score, 87.5);
        assert!(quiz.passed);
    }

    #[test]
    fn missing_fields_default_to_zero() {
        let raw = RawRecord::new("u", Collection::LabCompletions, ts());
        let lab = LabCompletion::from(&raw);
        assert_eq!(lab.score, 0.0);
        assert_eq!(lab.time_spent_secs, 0.0);
        assert!(!lab.completed);
    }

    #[test]
    fn drill_accepts_legacy_field_names() {
        let raw = RawRecord::new("u", Collection::DrillAttempts, ts())
            .with_activity("drill-7")
            .with_field("success", true)
            .with_field("completionTime", 240);
        let drill = DrillAttempt::from(&raw);
        assert!(drill.passed);
        assert_eq!(drill.time_secs, 240.0);
        assert_eq!(drill.activity_id.as_deref(), Some("drill-7"));
    }

    #[test]
    fn mistyped_values_are_tolerated() {
        let raw = RawRecord::new("u", Collection::QuizAttempts, ts())
            .with_field("score", "91")
            .with_field("passed", "yes");
        let quiz = QuizAttempt::from(&raw);
        assert_eq!(quiz.score, 91.0);
        assert!(!quiz.passed);
    }

    #[test]
    fn ledger_rows_are_not_activity() {
        let raw = RawRecord::new("u", Collection::DifficultyAdjustments, ts());
        assert!(ActivityRecord::from_raw(&raw).is_none());

        let raw = RawRecord::new("u", Collection::Progress, ts()).with_field("easinessFactor", 1.7);
        match ActivityRecord::from_raw(&raw) {
            Some(ActivityRecord::Progress(entry)) => assert_eq!(entry.easiness_factor, Some(1.7)),
            other => panic!("unexpected record: {other:?}"),
        }
    }
}
