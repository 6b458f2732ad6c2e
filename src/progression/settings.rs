use super::types::{
    DrillComplexity, LabGuidance, MasteryTier, TierSettings, ValidationStrictness,
};

pub const ELITE_LAB_TIME_LIMIT_SECS: u32 = 3600;

pub fn derive_settings(tier: MasteryTier) -> TierSettings {
    match tier {
        MasteryTier::Novice => TierSettings {
            tier,
            quiz_time_multiplier: 1.5,
            quiz_hints_available: true,
            quiz_passing_score: 70,
            lab_guidance: LabGuidance::Full,
            lab_time_limit_secs: None,
            lab_validation_strictness: ValidationStrictness::Lenient,
            drill_time_target_secs: 600,
            drill_complexity: DrillComplexity::Basic,
            simultaneous_failures: 1,
            review_interval_multiplier: 0.8,
            new_items_per_day: 5,
            stress_intensity: 1,
            multitasking_required: false,
        },
        MasteryTier::Intermediate => TierSettings {
            tier,
            quiz_time_multiplier: 1.2,
            quiz_hints_available: true,
            quiz_passing_score: 75,
            lab_guidance: LabGuidance::Partial,
            lab_time_limit_secs: None,
            lab_validation_strictness: ValidationStrictness::Normal,
            drill_time_target_secs: 480,
            drill_complexity: DrillComplexity::Intermediate,
            simultaneous_failures: 1,
            review_interval_multiplier: 1.0,
            new_items_per_day: 8,
            stress_intensity: 2,
            multitasking_required: false,
        },
        MasteryTier::Advanced => TierSettings {
            tier,
            quiz_time_multiplier: 1.0,
            quiz_hints_available: false,
            quiz_passing_score: 80,
            lab_guidance: LabGuidance::Minimal,
            lab_time_limit_secs: None,
            lab_validation_strictness: ValidationStrictness::Normal,
            drill_time_target_secs: 360,
            drill_complexity: DrillComplexity::Advanced,
            simultaneous_failures: 2,
            review_interval_multiplier: 1.0,
            new_items_per_day: 12,
            stress_intensity: 3,
            multitasking_required: true,
        },
        MasteryTier::Elite => TierSettings {
            tier,
            quiz_time_multiplier: 0.8,
            quiz_hints_available: false,
            quiz_passing_score: 85,
            lab_guidance: LabGuidance::None,
            lab_time_limit_secs: Some(ELITE_LAB_TIME_LIMIT_SECS),
            lab_validation_strictness: ValidationStrictness::Strict,
            drill_time_target_secs: 300,
            drill_complexity: DrillComplexity::Expert,
            simultaneous_failures: 3,
            review_interval_multiplier: 1.2,
            new_items_per_day: 15,
            stress_intensity: 4,
            multitasking_required: true,
        },
    }
}
