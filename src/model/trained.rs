//! Distributions shaped from externally trained expected scores.

use std::collections::HashMap;
use tracing::warn;

use super::analytical::{MARGIN_STD, TOTAL_STD};
use super::{Imputer, ModelCapability, ModelConfig, ModelFit, ProbabilityModel};
use crate::model::distribution::{ScoreDistribution, TieRule};
use crate::types::{Event, MatchupStats, ScorePrediction, Sport};

pub struct TrainedModel {
    config: ModelConfig,
    predictions: HashMap<String, ScorePrediction>,
}

impl TrainedModel {
    /// Index predictions by event id. Unusable predictions are dropped so
    /// those events fall back to the analytical model.
    pub fn new(config: ModelConfig, predictions: &[ScorePrediction]) -> Self {
        let predictions = predictions
            .iter()
            .filter(|p| {
                p.home_score.is_finite()
                    && p.away_score.is_finite()
                    && p.home_score > 0.0
                    && p.away_score > 0.0
            })
            .map(|p| (p.event_id.clone(), p.clone()))
            .collect();
        Self {
            config,
            predictions,
        }
    }

    /// Poisson sports price on a grid capped at `max_score`; an expected
    /// score at or past the cap is not a usable prediction.
    fn plausible(&self, prediction: &ScorePrediction, sport: Sport) -> bool {
        let cap = f64::from(match sport {
            Sport::Baseball => self.config.baseball_max_runs,
            Sport::Soccer => self.config.soccer_max_goals,
            Sport::Basketball => return true,
        });
        prediction.home_score < cap && prediction.away_score < cap
    }
}

impl ProbabilityModel for TrainedModel {
    fn name(&self) -> &str {
        "trained"
    }

    fn capability(&self) -> ModelCapability {
        ModelCapability::Trained
    }

    fn supports(&self, event: &Event) -> bool {
        match self.predictions.get(&event.id) {
            Some(p) if self.plausible(p, event.sport) => true,
            Some(p) => {
                warn!(
                    event_id = %event.id,
                    home_score = p.home_score,
                    away_score = p.away_score,
                    "Trained prediction outside the scoring grid, using analytical model"
                );
                false
            }
            None => false,
        }
    }

    fn fit(&self, event: &Event) -> ModelFit {
        let mut imputer = Imputer::default();
        let Some(prediction) = self.predictions.get(&event.id) else {
            // Callers check supports() first; an even game is the neutral shape.
            return ModelFit {
                model: self.name().to_string(),
                distribution: ScoreDistribution::Normal {
                    margin_mean: 0.0,
                    margin_std: MARGIN_STD,
                    total_mean: 0.0,
                    total_std: TOTAL_STD,
                },
                data_quality: Vec::new(),
            };
        };

        let (home, away) = (prediction.home_score, prediction.away_score);
        let distribution = match event.sport {
            Sport::Baseball => ScoreDistribution::DoublePoisson {
                home_rate: home,
                away_rate: away,
                max_score: self.config.baseball_max_runs,
                tie_rule: TieRule::ExtraInnings {
                    home_share: self.config.extra_innings_home_share,
                },
            },
            Sport::Soccer => ScoreDistribution::DoublePoisson {
                home_rate: home,
                away_rate: away,
                max_score: self.config.soccer_max_goals,
                tie_rule: TieRule::Draw,
            },
            Sport::Basketball => {
                let stats = match &event.stats {
                    Some(MatchupStats::Basketball(s)) => Some(s),
                    _ => None,
                };
                let margin_std = imputer.rate(
                    prediction.margin_std.or(stats.and_then(|s| s.margin_std)),
                    "margin_std",
                    None,
                    MARGIN_STD,
                );
                let total_std =
                    imputer.rate(stats.and_then(|s| s.total_std), "total_std", None, TOTAL_STD);
                ScoreDistribution::Normal {
                    margin_mean: home - away,
                    margin_std,
                    total_mean: home + away,
                    total_std,
                }
            }
        };

        ModelFit {
            model: prediction
                .model
                .clone()
                .unwrap_or_else(|| self.name().to_string()),
            distribution,
            data_quality: imputer.flags,
        }
    }
}
