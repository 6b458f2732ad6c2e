use std::process::ExitCode;
use std::sync::Arc;

use serde::Serialize;

use progression_engine::config::Config;
use progression_engine::db::SqliteStore;
use progression_engine::logging::init_tracing;
use progression_engine::progression::types::{
    DifficultyAdjustment, MasteryTier, PerformanceMetrics, RecertificationStatus, Recommendation,
    SkillDecayAlert, TierSettings,
};
use progression_engine::{EngineError, ProgressionEngine};

const RECENT_ADJUSTMENT_LIMIT: usize = 10;
const USAGE: &str = "usage: progression-engine <user-id> [--apply]";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Report {
    user_id: String,
    current_tier: MasteryTier,
    settings: TierSettings,
    metrics: PerformanceMetrics,
    recommendation: Recommendation,
    auto_applied: Option<DifficultyAdjustment>,
    decay_alerts: Vec<SkillDecayAlert>,
    recertification: RecertificationStatus,
    recent_adjustments: Vec<DifficultyAdjustment>,
}

struct Args {
    user_id: String,
    apply: bool,
}

fn parse_args() -> Option<Args> {
    let mut user_id = None;
    let mut apply = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--apply" => apply = true,
            flag if flag.starts_with("--") => return None,
            _ if user_id.is_none() => user_id = Some(arg),
            _ => return None,
        }
    }
    user_id.map(|user_id| Args { user_id, apply })
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();
    let _log_guard = init_tracing(&config.log_level);

    let Some(args) = parse_args() else {
        eprintln!("{USAGE}");
        return ExitCode::from(2);
    };

    let store = match SqliteStore::open(&config.db_path, config.sqlite_busy_timeout).await {
        Ok(store) => store,
        Err(e) => {
            tracing::error!(path = %config.db_path.display(), error = %e, "failed to open activity store");
            return ExitCode::FAILURE;
        }
    };

    let engine = ProgressionEngine::new(Arc::new(store), config.engine.clone());
    match build_report(&engine, &args).await {
        Ok(report) => match serde_json::to_string_pretty(&report) {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize report");
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            tracing::error!(user_id = %args.user_id, error = %e, "failed to build progression report");
            ExitCode::FAILURE
        }
    }
}

async fn build_report(engine: &ProgressionEngine, args: &Args) -> Result<Report, EngineError> {
    let user_id = args.user_id.as_str();
    let window_days = engine.config().window_days;
    let categories = engine.config().skill_categories.clone();

    let (recommendation, auto_applied) = if args.apply {
        let outcome = engine.check_and_auto_adjust(user_id).await?;
        (outcome.recommendation, outcome.adjustment)
    } else {
        let tier = engine.current_tier(user_id).await?;
        let metrics = engine.compute_metrics(user_id, window_days).await;
        (engine.evaluate_progression(tier, &metrics), None)
    };

    Ok(Report {
        user_id: user_id.to_string(),
        current_tier: engine.current_tier(user_id).await?,
        settings: engine.load_settings(user_id).await,
        metrics: recommendation.metrics_snapshot.clone(),
        recommendation,
        auto_applied,
        decay_alerts: engine.analyze_decay(user_id, &categories).await,
        recertification: engine.recertification_status(user_id, &categories).await?,
        recent_adjustments: engine.recent_adjustments(user_id, RECENT_ADJUSTMENT_LIMIT).await?,
    })
}
