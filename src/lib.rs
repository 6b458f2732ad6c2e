//! Performance-based progression and skill decay engine.
//!
//! Aggregates activity records into [`progression::PerformanceMetrics`],
//! recommends mastery tier changes, detects skill decay between disjoint
//! windows and schedules recertification. Storage sits behind
//! [`store::ActivityStore`], with an in-memory and a SQLite implementation.

pub mod config;
pub mod db;
pub mod engine;
pub mod logging;
pub mod progression;
pub mod services;
pub mod store;

pub use config::{Config, EngineConfig};
pub use engine::{EngineError, ProgressionEngine};
pub use progression::{MasteryTier, PerformanceMetrics, Recommendation, RecommendationKind, TierSettings};
pub use store::{ActivityStore, MemoryStore};
