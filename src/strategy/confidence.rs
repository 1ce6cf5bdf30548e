//! Deterministic point-based confidence scoring.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::types::{
    ConfidenceBreakdown, ConfidenceTier, Outcome, RiskFactor, SharpIndicator, ValueTier,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceConfig {
    pub base_score: f64,
    /// Cap on the +1-per-type sharp bonus.
    pub max_sharp_bonus: f64,
    /// |simulated - analytical| below this earns the model stability bonus.
    pub model_stability_threshold: f64,
    pub model_stability_bonus: f64,
    /// A swing at least this large inside the window voids market stability.
    pub large_move_threshold: f64,
    pub recent_window_minutes: i64,
    pub market_stability_bonus: f64,
    /// Floor on the total risk penalty (as a positive number).
    pub max_risk_penalty: f64,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            base_score: 5.0,
            max_sharp_bonus: 3.0,
            model_stability_threshold: 0.02,
            model_stability_bonus: 2.0,
            large_move_threshold: 1.0,
            recent_window_minutes: 120,
            market_stability_bonus: 2.0,
            max_risk_penalty: 2.0,
        }
    }
}

/// Everything the scorer looks at for one outcome.
#[derive(Debug, Clone)]
pub struct ConfidenceInput<'a> {
    pub side: Outcome,
    pub tier: ValueTier,
    pub indicators: &'a [SharpIndicator],
    /// None when no simulated estimate exists to cross-check against.
    pub model_divergence: Option<f64>,
    pub largest_recent_move: Option<f64>,
    pub risk_factors: &'a [RiskFactor],
}

pub struct ConfidenceScorer {
    config: ConfidenceConfig,
}

impl ConfidenceScorer {
    pub fn new(config: ConfidenceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConfidenceConfig {
        &self.config
    }

    pub fn score(&self, input: &ConfidenceInput<'_>) -> ConfidenceBreakdown {
        let cfg = &self.config;
        let mut explanation = vec![format!("Base {}", cfg.base_score)];

        let sharp_kinds: BTreeSet<String> = input
            .indicators
            .iter()
            .filter(|i| i.side == input.side)
            .map(|i| i.kind.to_string())
            .collect();
        let sharp_bonus = (sharp_kinds.len() as f64).min(cfg.max_sharp_bonus);
        if sharp_bonus > 0.0 {
            explanation.push(format!(
                "+{sharp_bonus} sharp action ({})",
                sharp_kinds.into_iter().collect::<Vec<_>>().join(", ")
            ));
        }

        let edge_tier_bonus = match input.tier {
            ValueTier::Excellent => 3.0,
            ValueTier::Good => 2.0,
            ValueTier::Fair => 1.0,
            ValueTier::Marginal | ValueTier::None => 0.0,
        };
        if edge_tier_bonus > 0.0 {
            explanation.push(format!("+{edge_tier_bonus} {} edge", input.tier));
        }

        let model_stability_bonus = match input.model_divergence {
            Some(d) if d < cfg.model_stability_threshold => {
                explanation.push(format!(
                    "+{} model stability ({:.1}% divergence)",
                    cfg.model_stability_bonus,
                    d * 100.0
                ));
                cfg.model_stability_bonus
            }
            _ => 0.0,
        };

        let market_stability_bonus = match input.largest_recent_move {
            Some(m) if m >= cfg.large_move_threshold => 0.0,
            Some(m) => {
                explanation.push(format!(
                    "+{} market stability ({m:.1} max recent move)",
                    cfg.market_stability_bonus
                ));
                cfg.market_stability_bonus
            }
            None => {
                explanation.push(format!(
                    "+{} market stability (no line history)",
                    cfg.market_stability_bonus
                ));
                cfg.market_stability_bonus
            }
        };

        // Every listed factor adds its penalty; the explanation names each kind once.
        let penalty: f64 = input.risk_factors.iter().map(|f| f.kind.penalty()).sum();
        let mut named = Vec::new();
        for factor in input.risk_factors {
            let kind = factor.kind.to_string();
            if !named.contains(&kind) {
                named.push(kind);
            }
        }
        let risk_penalty = -penalty.min(cfg.max_risk_penalty);
        if risk_penalty < 0.0 {
            explanation.push(format!("{risk_penalty:.1} risk ({})", named.join(", ")));
        }

        let raw_score = cfg.base_score
            + sharp_bonus
            + edge_tier_bonus
            + model_stability_bonus
            + market_stability_bonus
            + risk_penalty;
        // Half points go to the even neighbour: 8.5 scores 8, 9.5 scores 10.
        let score = raw_score.round_ties_even().clamp(1.0, 10.0) as u8;

        ConfidenceBreakdown {
            base: cfg.base_score,
            sharp_bonus,
            edge_tier_bonus,
            model_stability_bonus,
            market_stability_bonus,
            risk_penalty,
            raw_score,
            score,
            tier: ConfidenceTier::from_score(score),
            explanation,
        }
    }
}
