//! Recertification due dates and the rising-edge watch over drill trends.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

use super::metrics::offset_days;
use super::types::{RecertificationRecord, RecertificationStatus, SkillDecayAlert};

pub const DEFAULT_RECERT_INTERVAL_DAYS: i64 = 30;

const SECONDS_PER_DAY: i64 = 86_400;

pub fn schedule_status(
    record: Option<&RecertificationRecord>,
    interval_days: i64,
    now: DateTime<Utc>,
    skills_needing_recert: Vec<SkillDecayAlert>,
) -> RecertificationStatus {
    let Some(record) = record else {
        return RecertificationStatus {
            last_recertified_at: None,
            next_due_at: None,
            days_until_due: interval_days,
            is_overdue: false,
            skills_needing_recert,
        };
    };

    let next_due = offset_days(record.last_recertified_at, interval_days);
    let days_until_due = ceil_days(next_due - now);

    RecertificationStatus {
        last_recertified_at: Some(record.last_recertified_at),
        next_due_at: Some(next_due),
        days_until_due,
        is_overdue: days_until_due < 0,
        skills_needing_recert,
    }
}

/// Builds the document written when a user finishes a recertification run.
pub fn completion_record(
    drill_results: BTreeMap<String, bool>,
    now: DateTime<Utc>,
) -> RecertificationRecord {
    let passed = drill_results.values().all(|ok| *ok);
    // Every attempted drill is listed; `passed` carries the outcome.
    let skills_recertified = drill_results.keys().cloned().collect();

    RecertificationRecord {
        last_recertified_at: now,
        drill_results,
        passed,
        skills_recertified,
    }
}

fn ceil_days(delta: Duration) -> i64 {
    let secs = delta.num_seconds();
    let days = secs.div_euclid(SECONDS_PER_DAY);
    if secs.rem_euclid(SECONDS_PER_DAY) == 0 {
        days
    } else {
        days + 1
    }
}

/// Fired when a (user, activity) pair starts needing recertification.
#[derive(Debug, Clone, PartialEq)]
pub struct RecertificationNotice {
    pub user_id: String,
    pub activity_id: String,
    pub days_overdue: i64,
}

type NoticeCallback = Box<dyn Fn(&RecertificationNotice) + Send + Sync>;

/// Remembers which (user, activity) pairs currently need recertification and
/// reports only false -> true transitions. A first observation that already
/// needs recertification counts as a transition. Pairs drop out of the map
/// once they stop needing recertification, so it is bounded by the pending set.
#[derive(Default)]
pub struct RecertificationWatch {
    last_seen: Mutex<HashMap<(String, String), bool>>,
    callback: Option<NoticeCallback>,
}

impl RecertificationWatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: impl Fn(&RecertificationNotice) + Send + Sync + 'static) -> Self {
        Self {
            last_seen: Mutex::new(HashMap::new()),
            callback: Some(Box::new(callback)),
        }
    }

    /// Returns the notice when this observation is a rising edge.
    pub fn observe(
        &self,
        user_id: &str,
        activity_id: &str,
        needs_recertification: bool,
        days_until_recertification: i64,
    ) -> Option<RecertificationNotice> {
        let key = (user_id.to_string(), activity_id.to_string());
        // An absent key reads as "not needed", so only pending keys are kept.
        let previous = {
            let mut last_seen = self.last_seen.lock();
            if needs_recertification {
                last_seen.insert(key, true)
            } else {
                last_seen.remove(&key)
            }
        };

        if !is_rising_edge(previous, needs_recertification) {
            return None;
        }

        let notice = RecertificationNotice {
            user_id: user_id.to_string(),
            activity_id: activity_id.to_string(),
            days_overdue: (-days_until_recertification).max(0),
        };
        if let Some(callback) = &self.callback {
            callback(&notice);
        }
        Some(notice)
    }

    pub fn tracked(&self) -> usize {
        self.last_seen.lock().len()
    }
}

impl std::fmt::Debug for RecertificationWatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecertificationWatch")
            .field("tracked", &self.tracked())
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

pub fn is_rising_edge(previous: Option<bool>, current: bool) -> bool {
    current && !previous.unwrap_or(false)
}
