use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{FixedOffset, Local, Offset, Utc};

use crate::progression::decay::DEFAULT_SKILL_CATEGORIES;
use crate::progression::evaluator::DEFAULT_AUTO_APPLY_CONFIDENCE;
use crate::progression::metrics::DEFAULT_WINDOW_DAYS;
use crate::progression::recertification::DEFAULT_RECERT_INTERVAL_DAYS;

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub db_path: PathBuf,
    pub sqlite_busy_timeout: Duration,
    pub engine: EngineConfig,
}

impl Config {
    pub fn from_env() -> Self {
        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let db_path = std::env::var("PROGRESSION_DB_PATH")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(|v| resolve_path(&v))
            .unwrap_or_else(default_db_path);

        Self {
            log_level,
            db_path,
            sqlite_busy_timeout: Duration::from_millis(env_u64("SQLITE_BUSY_TIMEOUT_MS", 5000)),
            engine: EngineConfig::from_env(),
        }
    }
}

/// Knobs the engine reads at evaluation time.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub window_days: u32,
    /// Recommendations must be strictly more confident than this to auto-apply.
    pub auto_apply_confidence: f64,
    pub store_timeout: Duration,
    pub recert_interval_days: i64,
    /// Offset used to bucket study sessions into calendar days. UTC unless
    /// configured; `from_env` falls back to the local offset.
    pub utc_offset: FixedOffset,
    pub skill_categories: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            auto_apply_confidence: DEFAULT_AUTO_APPLY_CONFIDENCE,
            store_timeout: Duration::from_millis(5000),
            recert_interval_days: DEFAULT_RECERT_INTERVAL_DAYS,
            utc_offset: Utc.fix(),
            skill_categories: default_categories(),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let auto_apply_confidence = std::env::var("PROGRESSION_AUTO_APPLY_CONFIDENCE")
            .ok()
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| (0.0..=1.0).contains(v))
            .unwrap_or(defaults.auto_apply_confidence);

        let utc_offset = std::env::var("PROGRESSION_UTC_OFFSET_MINUTES")
            .ok()
            .and_then(|v| v.parse::<i32>().ok())
            .and_then(offset_from_minutes)
            .unwrap_or_else(|| Local::now().offset().fix());

        let skill_categories = std::env::var("PROGRESSION_SKILL_CATEGORIES")
            .ok()
            .map(|v| parse_categories(&v))
            .filter(|c| !c.is_empty())
            .unwrap_or(defaults.skill_categories);

        Self {
            window_days: env_u32("PROGRESSION_WINDOW_DAYS", defaults.window_days),
            auto_apply_confidence,
            store_timeout: Duration::from_millis(env_u64("PROGRESSION_STORE_TIMEOUT_MS", 5000)),
            recert_interval_days: env_i64("PROGRESSION_RECERT_INTERVAL_DAYS", defaults.recert_interval_days),
            utc_offset,
            skill_categories,
        }
    }
}

pub fn default_categories() -> Vec<String> {
    DEFAULT_SKILL_CATEGORIES.iter().map(|c| c.to_string()).collect()
}

fn parse_categories(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|c| c.trim().to_ascii_lowercase())
        .filter(|c| !c.is_empty())
        .collect()
}

fn offset_from_minutes(minutes: i32) -> Option<FixedOffset> {
    minutes.checked_mul(60).and_then(FixedOffset::east_opt)
}

fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("progression-engine")
        .join("progression.db")
}

fn resolve_path(value: &str) -> PathBuf {
    let raw = Path::new(value);
    if raw.is_absolute() {
        return raw.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(raw))
        .unwrap_or_else(|_| raw.to_path_buf())
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
        .unwrap_or(default)
}

fn env_i64(key: &str, default: i64) -> i64 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<i64>().ok())
        .unwrap_or(default)
}
