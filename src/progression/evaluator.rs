use super::criteria::{
    demotion_criteria, evaluate_gate, promotion_criteria, CriterionOutcome, GateKind,
};
use super::types::{MasteryTier, PerformanceMetrics, Recommendation, RecommendationKind};

/// Relative margin a promotion criterion must clear to count toward confidence.
pub const PROMOTION_SAFETY_MARGIN: f64 = 0.10;
pub const DEMOTION_BASE_CONFIDENCE: f64 = 0.5;
pub const MAINTAIN_CONFIDENCE: f64 = 0.5;
pub const DEFAULT_AUTO_APPLY_CONFIDENCE: f64 = 0.7;

const MAINTAIN_HINT_LIMIT: usize = 2;

pub fn evaluate_progression(current: MasteryTier, metrics: &PerformanceMetrics) -> Recommendation {
    if let Some(target) = current.next() {
        let gate = evaluate_gate(promotion_criteria(target), metrics, GateKind::Conjunctive);
        if gate.passed {
            let total = gate.outcomes.len() as f64;
            let clearing = gate
                .outcomes
                .iter()
                .filter(|o| o.clears_margin(PROMOTION_SAFETY_MARGIN))
                .count() as f64;
            let reasoning = gate.outcomes.iter().map(promotion_evidence).collect();

            return Recommendation {
                kind: RecommendationKind::Increase,
                confidence: (clearing / total).clamp(0.0, 1.0),
                reasoning,
                current_tier: current,
                suggested_tier: target,
                metrics_snapshot: metrics.clone(),
            };
        }
    }

    if let Some(target) = current.previous() {
        let gate = evaluate_gate(demotion_criteria(current), metrics, GateKind::Disjunctive);
        if gate.passed {
            let mut breached: Vec<&CriterionOutcome> = gate.holding().collect();
            breached.sort_by(|a, b| b.relative_margin.total_cmp(&a.relative_margin));

            let worst = breached.first().map(|o| o.relative_margin).unwrap_or(0.0);
            let reasoning = breached.iter().map(|o| demotion_evidence(o, current)).collect();

            return Recommendation {
                kind: RecommendationKind::Decrease,
                confidence: (DEMOTION_BASE_CONFIDENCE + worst).clamp(0.0, 1.0),
                reasoning,
                current_tier: current,
                suggested_tier: target,
                metrics_snapshot: metrics.clone(),
            };
        }
    }

    Recommendation {
        kind: RecommendationKind::Maintain,
        confidence: MAINTAIN_CONFIDENCE,
        reasoning: maintain_reasoning(current, metrics),
        current_tier: current,
        suggested_tier: current,
        metrics_snapshot: metrics.clone(),
    }
}

/// Auto-apply gate owned by callers: only confident tier changes go through
/// without confirmation.
pub fn should_auto_apply(recommendation: &Recommendation, min_confidence: f64) -> bool {
    recommendation.is_change() && recommendation.confidence > min_confidence
}

fn promotion_evidence(outcome: &CriterionOutcome) -> String {
    let verb = if outcome.relative_margin > 0.0 {
        "exceeds"
    } else {
        "meets"
    };
    format!(
        "{} {} {} {} requirement",
        outcome.label(),
        outcome.formatted_value(),
        verb,
        outcome.formatted_threshold()
    )
}

fn demotion_evidence(outcome: &CriterionOutcome, current: MasteryTier) -> String {
    let direction = if outcome.value > outcome.criterion.threshold {
        "above"
    } else {
        "below"
    };
    format!(
        "{} {} is {} the {} {} limit",
        outcome.label(),
        outcome.formatted_value(),
        direction,
        current.as_str(),
        outcome.formatted_threshold()
    )
}

fn maintain_reasoning(current: MasteryTier, metrics: &PerformanceMetrics) -> Vec<String> {
    let mut candidates: Vec<(f64, String)> = Vec::new();

    if let Some(target) = current.next() {
        let gate = evaluate_gate(promotion_criteria(target), metrics, GateKind::Conjunctive);
        for outcome in gate.failing() {
            candidates.push((
                outcome.relative_margin.abs(),
                format!(
                    "{} {} is short of the {} {} requirement",
                    outcome.label(),
                    outcome.formatted_value(),
                    target.as_str(),
                    outcome.formatted_threshold()
                ),
            ));
        }
    }

    if current.previous().is_some() {
        let gate = evaluate_gate(demotion_criteria(current), metrics, GateKind::Disjunctive);
        for outcome in gate.failing() {
            candidates.push((
                outcome.relative_margin.abs(),
                format!(
                    "{} {} is within {} of the {} demotion limit",
                    outcome.label(),
                    outcome.formatted_value(),
                    outcome.criterion.metric.format((outcome.value - outcome.criterion.threshold).abs()),
                    outcome.formatted_threshold()
                ),
            ));
        }
    }

    candidates.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut reasoning = vec![format!("Performing steadily at the {} tier", current.as_str())];
    reasoning.extend(
        candidates
            .into_iter()
            .take(MAINTAIN_HINT_LIMIT)
            .map(|(_, line)| line),
    );
    reasoning
}
