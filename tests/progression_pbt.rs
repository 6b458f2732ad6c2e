//! Property-based tests for the pure progression core
//!
//! Invariants covered:
//! - Settings derivation is deterministic and tightens with tier rank
//! - Recommendations stay within bounds and only move one tier at a time
//! - Decay alerts are monotone in the recent score
//! - Trend classification never looks past the ten newest attempts

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

use progression_engine::progression::decay::{evaluate_category, CategorySamples, DECAY_RECERT_THRESHOLD};
use progression_engine::progression::trend::classify_trend;
use progression_engine::progression::{derive_settings, evaluate_progression, MasteryTier, PerformanceMetrics, RecommendationKind};
use progression_engine::store::records::DrillAttempt;

// ============================================================================
// Generators
// ============================================================================

fn arb_rate() -> impl Strategy<Value = f64> {
    (0u64..=1000u64).prop_map(|v| v as f64 / 1000.0)
}

fn arb_tier() -> impl Strategy<Value = MasteryTier> {
    prop::sample::select(MasteryTier::ALL.to_vec())
}

fn arb_metrics() -> impl Strategy<Value = PerformanceMetrics> {
    (
        (arb_rate(), arb_rate(), arb_rate(), arb_rate()),
        (0u64..=400u64).prop_map(|v| v as f64 / 100.0),
        (0u32..=10, 0u32..=20, 0u32..=30),
    )
        .prop_map(
            |((quiz, lab, drill, failure), ef, (weak, resets, streak))| PerformanceMetrics {
                quiz_success_rate: quiz,
                lab_completion_rate: lab,
                drill_success_rate: drill,
                failure_rate: failure,
                avg_easiness_factor: ef,
                weak_topic_count: weak,
                reset_token_usage: resets,
                study_streak: streak,
                ..Default::default()
            },
        )
}

fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 11, 5, 12, 0, 0).unwrap()
}

fn arb_attempts() -> impl Strategy<Value = Vec<DrillAttempt>> {
    prop::collection::vec((0u64..=100u64, 30u64..=900u64), 0..25).prop_map(|raw| {
        raw.into_iter()
            .enumerate()
            .map(|(i, (score, time))| DrillAttempt {
                timestamp: fixed_now() - Duration::days(i as i64),
                activity_id: Some("drill".to_string()),
                passed: score >= 70,
                time_secs: time as f64,
                score: score as f64,
                hints_used: 0,
            })
            .collect()
    })
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn settings_are_deterministic(tier in arb_tier()) {
        prop_assert_eq!(derive_settings(tier), derive_settings(tier));
    }

    #[test]
    fn settings_tighten_with_rank(a in arb_tier(), b in arb_tier()) {
        prop_assume!(a < b);
        let lower = derive_settings(a);
        let higher = derive_settings(b);
        prop_assert!(higher.quiz_time_multiplier < lower.quiz_time_multiplier);
        prop_assert!(higher.quiz_passing_score > lower.quiz_passing_score);
        prop_assert!(higher.drill_time_target_secs < lower.drill_time_target_secs);
        prop_assert!(higher.stress_intensity > lower.stress_intensity);
        prop_assert!(higher.lab_guidance.support_level() < lower.lab_guidance.support_level());
    }

    #[test]
    fn recommendation_is_bounded_and_adjacent(tier in arb_tier(), metrics in arb_metrics()) {
        let rec = evaluate_progression(tier, &metrics);
        prop_assert!((0.0..=1.0).contains(&rec.confidence));
        prop_assert!(!rec.reasoning.is_empty());
        prop_assert_eq!(rec.current_tier, tier);
        prop_assert!((rec.suggested_tier.rank() - tier.rank()).abs() <= 1);
        match rec.kind {
            RecommendationKind::Increase => {
                prop_assert_eq!(Some(rec.suggested_tier), tier.next());
            }
            RecommendationKind::Decrease => {
                prop_assert_eq!(Some(rec.suggested_tier), tier.previous());
            }
            RecommendationKind::Maintain => {
                prop_assert_eq!(rec.suggested_tier, tier);
            }
        }
    }

    #[test]
    fn evaluation_is_idempotent(tier in arb_tier(), metrics in arb_metrics()) {
        prop_assert_eq!(evaluate_progression(tier, &metrics), evaluate_progression(tier, &metrics));
    }

    #[test]
    fn lower_recent_score_never_clears_an_alert(
        historical in 1u64..=100u64,
        recent in 0u64..=100u64,
        drop in 0u64..=100u64,
    ) {
        let samples = |r: f64| CategorySamples {
            category: "scripting".to_string(),
            recent: vec![r],
            historical: vec![historical as f64],
            last_practiced_at: Some(fixed_now()),
        };
        let higher = evaluate_category(&samples(recent as f64));
        let lower = evaluate_category(&samples(recent.saturating_sub(drop) as f64));

        if let Some(alert) = higher {
            let lowered = lower.expect("lower recent score keeps the alert");
            prop_assert!(lowered.decay_percentage >= alert.decay_percentage);
            prop_assert!(lowered.requires_recertification || !alert.requires_recertification);
            prop_assert_eq!(
                alert.requires_recertification,
                alert.decay_percentage > DECAY_RECERT_THRESHOLD
            );
        }
    }

    #[test]
    fn trend_ignores_attempts_past_ten(attempts in arb_attempts()) {
        let full = classify_trend(&attempts, fixed_now());
        let truncated = classify_trend(&attempts[..attempts.len().min(10)], fixed_now());
        prop_assert_eq!(full, truncated);
    }
}
