//! Blends analytical and simulated estimates into one probability set.

use serde::{Deserialize, Serialize};

use crate::types::{EstimateSource, Outcome, OutcomeProbability, ProbabilityEstimate};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlendConfig {
    pub analytical_weight: f64,
    pub simulated_weight: f64,
}

impl Default for BlendConfig {
    fn default() -> Self {
        Self {
            analytical_weight: 0.5,
            simulated_weight: 0.5,
        }
    }
}

pub struct EnsembleBlender {
    analytical_weight: f64,
    simulated_weight: f64,
}

impl EnsembleBlender {
    /// Weights are normalized to sum to 1.
    pub fn new(config: &BlendConfig) -> Self {
        let sum = config.analytical_weight + config.simulated_weight;
        let (a, s) = if sum > 0.0 {
            (config.analytical_weight / sum, config.simulated_weight / sum)
        } else {
            (1.0, 0.0)
        };
        Self {
            analytical_weight: a,
            simulated_weight: s,
        }
    }

    /// Weighted average per outcome, renormalized. Without a simulated
    /// estimate the analytical one passes through.
    pub fn blend(
        &self,
        analytical: &ProbabilityEstimate,
        simulated: Option<&ProbabilityEstimate>,
    ) -> ProbabilityEstimate {
        let outcomes = analytical
            .outcomes
            .iter()
            .map(|a| {
                let sim = simulated.and_then(|s| s.outcomes.iter().find(|o| o.outcome == a.outcome));
                match sim {
                    Some(s) => OutcomeProbability {
                        outcome: a.outcome,
                        probability: self.analytical_weight * a.probability
                            + self.simulated_weight * s.probability,
                        variance: self.simulated_weight.powi(2) * s.variance,
                    },
                    None => OutcomeProbability {
                        outcome: a.outcome,
                        probability: a.probability,
                        variance: 0.0,
                    },
                }
            })
            .collect();

        let mut blended = ProbabilityEstimate {
            market: analytical.market,
            source: EstimateSource::Ensemble,
            outcomes,
        };
        blended.normalize();
        blended
    }
}

/// |simulated - analytical| for one outcome. None when either side has
/// no probability for it, so nothing was cross-checked.
pub fn divergence(
    analytical: &ProbabilityEstimate,
    simulated: Option<&ProbabilityEstimate>,
    outcome: Outcome,
) -> Option<f64> {
    let a = analytical.probability_of(outcome)?;
    let s = simulated?.probability_of(outcome)?;
    Some((s - a).abs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MarketKind;

    fn make_estimate(source: EstimateSource, home: f64, variance: f64) -> ProbabilityEstimate {
        ProbabilityEstimate {
            market: MarketKind::Moneyline,
            source,
            outcomes: vec![
                OutcomeProbability { outcome: Outcome::Home, probability: home, variance },
                OutcomeProbability { outcome: Outcome::Away, probability: 1.0 - home, variance },
            ],
        }
    }

    #[test]
    fn test_equal_weights_average() {
        let blender = EnsembleBlender::new(&BlendConfig::default());
        let a = make_estimate(EstimateSource::Analytical, 0.60, 0.0);
        let s = make_estimate(EstimateSource::Simulated, 0.56, 0.0001);
        let b = blender.blend(&a, Some(&s));
        assert_eq!(b.source, EstimateSource::Ensemble);
        assert!((b.probability_of(Outcome::Home).unwrap() - 0.58).abs() < 1e-12);
        assert!((b.total() - 1.0).abs() < 1e-12);
        assert!((b.outcomes[0].variance - 0.25 * 0.0001).abs() < 1e-15);
    }

    #[test]
    fn test_weights_are_normalized() {
        let blender = EnsembleBlender::new(&BlendConfig {
            analytical_weight: 3.0,
            simulated_weight: 1.0,
        });
        let a = make_estimate(EstimateSource::Analytical, 0.60, 0.0);
        let s = make_estimate(EstimateSource::Simulated, 0.40, 0.0);
        let b = blender.blend(&a, Some(&s));
        assert!((b.probability_of(Outcome::Home).unwrap() - 0.55).abs() < 1e-12);
    }

    #[test]
    fn test_missing_simulation_passes_analytical_through() {
        let blender = EnsembleBlender::new(&BlendConfig::default());
        let a = make_estimate(EstimateSource::Analytical, 0.62, 0.0);
        let b = blender.blend(&a, None);
        assert!((b.probability_of(Outcome::Home).unwrap() - 0.62).abs() < 1e-12);
    }

    #[test]
    fn test_divergence() {
        let a = make_estimate(EstimateSource::Analytical, 0.60, 0.0);
        let s = make_estimate(EstimateSource::Simulated, 0.57, 0.0);
        assert!((divergence(&a, Some(&s), Outcome::Home).unwrap() - 0.03).abs() < 1e-12);
        assert_eq!(divergence(&a, None, Outcome::Home), None);
        assert_eq!(divergence(&a, Some(&s), Outcome::Draw), None);
    }
}
