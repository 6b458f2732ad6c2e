//! Folding typed activity records into a [`PerformanceMetrics`] snapshot.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};

use super::types::PerformanceMetrics;
use crate::store::records::{
    ActivityRecord, DrillAttempt, FailureLog, LabCompletion, ProgressEntry, QuizAttempt,
    ResetTokenUse, StudySession,
};
use crate::store::TimeRange;

pub const DEFAULT_WINDOW_DAYS: u32 = 30;
pub const WEAK_TOPIC_EF_FLOOR: f64 = 2.0;
pub const STREAK_LOOKBACK_DAYS: i64 = 365;
/// Day offsets are clamped to this span before date arithmetic.
pub const MAX_SPAN_DAYS: i64 = 1_000_000;

/// `at + days`, saturating at the representable range instead of panicking.
pub fn offset_days(at: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    let delta = Duration::days(days.clamp(-MAX_SPAN_DAYS, MAX_SPAN_DAYS));
    at.checked_add_signed(delta).unwrap_or(if days < 0 {
        DateTime::<Utc>::MIN_UTC
    } else {
        DateTime::<Utc>::MAX_UTC
    })
}

/// Evaluation window ending at `now`. Calendar days are taken in `offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsWindow {
    pub now: DateTime<Utc>,
    pub days: u32,
    pub offset: FixedOffset,
}

impl MetricsWindow {
    pub fn new(now: DateTime<Utc>, days: u32, offset: FixedOffset) -> Self {
        Self { now, days, offset }
    }

    pub fn range(&self) -> TimeRange {
        TimeRange::between(offset_days(self.now, -i64::from(self.days)), self.now)
    }

    pub fn streak_range(&self) -> TimeRange {
        TimeRange::between(offset_days(self.now, -STREAK_LOOKBACK_DAYS), self.now)
    }

    pub fn today(&self) -> NaiveDate {
        self.now.with_timezone(&self.offset).date_naive()
    }

    pub fn weeks(&self) -> f64 {
        f64::from(self.days) / 7.0
    }
}

/// Records already fetched for one user. Quiz, lab, drill, failure and
/// reset-token streams are expected to be window-filtered by the caller;
/// sessions may span the longer streak lookback.
#[derive(Debug, Clone, Default)]
pub struct MetricsInput {
    pub quizzes: Vec<QuizAttempt>,
    pub labs: Vec<LabCompletion>,
    pub drills: Vec<DrillAttempt>,
    pub progress: Vec<ProgressEntry>,
    pub failures: Vec<FailureLog>,
    pub reset_tokens: Vec<ResetTokenUse>,
    pub sessions: Vec<StudySession>,
}

impl MetricsInput {
    pub fn from_records(records: impl IntoIterator<Item = ActivityRecord>) -> Self {
        let mut input = Self::default();
        for record in records {
            match record {
                ActivityRecord::Quiz(r) => input.quizzes.push(r),
                ActivityRecord::Lab(r) => input.labs.push(r),
                ActivityRecord::Drill(r) => input.drills.push(r),
                ActivityRecord::Progress(r) => input.progress.push(r),
                ActivityRecord::Failure(r) => input.failures.push(r),
                ActivityRecord::ResetToken(r) => input.reset_tokens.push(r),
                ActivityRecord::Session(r) => input.sessions.push(r),
            }
        }
        input
    }
}

pub fn aggregate(input: &MetricsInput, window: &MetricsWindow) -> PerformanceMetrics {
    let quiz_total = input.quizzes.len();
    let quiz_passes = input.quizzes.iter().filter(|q| q.passed).count();

    let lab_total = input.labs.len();
    let lab_completed = input.labs.iter().filter(|l| l.completed).count();

    let drill_total = input.drills.len();
    let drill_passed = input.drills.iter().filter(|d| d.passed).count();

    let easiness: Vec<f64> = input
        .progress
        .iter()
        .filter_map(|p| p.easiness_factor)
        .collect();
    let weak_topic_count = easiness.iter().filter(|ef| **ef < WEAK_TOPIC_EF_FLOOR).count();

    let attempts = quiz_total + lab_total + drill_total;
    let failures = (quiz_total - quiz_passes) + (lab_total - lab_completed) + (drill_total - drill_passed);

    let aar_completed = input.failures.iter().filter(|f| f.aar_completed).count();

    let range = window.range();
    let sessions_in_window = input
        .sessions
        .iter()
        .filter(|s| range.contains(s.started_at))
        .count();

    PerformanceMetrics {
        quiz_success_rate: ratio(quiz_passes, quiz_total),
        avg_quiz_score: mean(input.quizzes.iter().map(|q| q.score)),
        quiz_streak: longest_pass_run(&input.quizzes),
        lab_completion_rate: ratio(lab_completed, lab_total),
        avg_lab_score: mean(input.labs.iter().map(|l| l.score)),
        avg_lab_time: mean(input.labs.iter().map(|l| l.time_spent_secs)),
        drill_success_rate: ratio(drill_passed, drill_total),
        avg_drill_time: mean(input.drills.iter().map(|d| d.time_secs)),
        avg_easiness_factor: mean(easiness.iter().copied()),
        weak_topic_count: weak_topic_count as u32,
        failure_rate: ratio(failures, attempts),
        aar_completion_rate: ratio(aar_completed, input.failures.len()),
        reset_token_usage: input.reset_tokens.len() as u32,
        study_streak: study_streak(
            input.sessions.iter().map(|s| s.started_at),
            window.today(),
            &window.offset,
        ),
        avg_sessions_per_week: if window.days == 0 {
            0.0
        } else {
            sessions_in_window as f64 / window.weeks()
        },
    }
}

/// Consecutive calendar days with at least one session, counted back from
/// `today`. Zero when there was no session today.
pub fn study_streak(
    session_starts: impl IntoIterator<Item = DateTime<Utc>>,
    today: NaiveDate,
    offset: &FixedOffset,
) -> u32 {
    let days: BTreeSet<NaiveDate> = session_starts
        .into_iter()
        .map(|ts| ts.with_timezone(offset).date_naive())
        .collect();

    let mut streak = 0u32;
    let mut cursor = today;
    while days.contains(&cursor) {
        streak += 1;
        match cursor.pred_opt() {
            Some(prev) => cursor = prev,
            None => break,
        }
    }
    streak
}

/// Longest run of consecutive passes in chronological order.
pub fn longest_pass_run(quizzes: &[QuizAttempt]) -> u32 {
    let mut ordered: Vec<&QuizAttempt> = quizzes.iter().collect();
    ordered.sort_by_key(|q| q.timestamp);

    let mut best = 0u32;
    let mut current = 0u32;
    for quiz in ordered {
        if quiz.passed {
            current += 1;
            best = best.max(current);
        } else {
            current = 0;
        }
    }
    best
}

fn ratio(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}
