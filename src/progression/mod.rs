//! Pure progression core: metric folding, tier evaluation, decay, trends and
//! recertification scheduling. Nothing in here touches the store.

pub mod criteria;
pub mod decay;
pub mod evaluator;
pub mod metrics;
pub mod recertification;
pub mod settings;
pub mod trend;
pub mod types;

pub use criteria::{evaluate_gate, ComparisonOperator, Criterion, GateKind, GateResult, MetricKey};
pub use decay::{DecayWindows, DEFAULT_SKILL_CATEGORIES};
pub use evaluator::{evaluate_progression, should_auto_apply};
pub use metrics::{MetricsInput, MetricsWindow};
pub use recertification::{RecertificationNotice, RecertificationWatch};
pub use settings::derive_settings;
pub use trend::{classify_trend, DrillTrend, ProficiencyTier, TrendClassification};
pub use types::*;
