//! Probability models.
//!
//! A `ProbabilityModel` turns an event into a `ScoreDistribution`, which
//! then prices every quoted market. Two variants exist:
//! - `AnalyticalModel`: sport-specific rate models built from matchup stats
//! - `TrainedModel`: expected scores supplied by an external trained model
//!
//! `ModelSelector` picks the trained model whenever it can serve an event.

pub mod analytical;
pub mod distribution;
pub mod trained;

pub use analytical::AnalyticalModel;
pub use distribution::{ScoreDistribution, TieRule};
pub use trained::TrainedModel;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{DataQualityFlag, Event, ImputationReason, Outcome, ScorePrediction};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Share of extra-inning games won by the home side.
    pub extra_innings_home_share: f64,
    pub baseball_max_runs: u32,
    pub soccer_max_goals: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            extra_innings_home_share: 0.52,
            baseball_max_runs: 20,
            soccer_max_goals: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelCapability {
    Trained,
    Analytical,
}

impl fmt::Display for ModelCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelCapability::Trained => write!(f, "trained"),
            ModelCapability::Analytical => write!(f, "analytical"),
        }
    }
}

/// A fitted distribution plus every league-average substitution made.
#[derive(Debug, Clone)]
pub struct ModelFit {
    pub model: String,
    pub distribution: ScoreDistribution,
    pub data_quality: Vec<DataQualityFlag>,
}

pub trait ProbabilityModel: Send + Sync {
    fn name(&self) -> &str;

    fn capability(&self) -> ModelCapability;

    /// Whether this model can price the event.
    fn supports(&self, event: &Event) -> bool;

    fn fit(&self, event: &Event) -> ModelFit;
}

/// Chooses between the trained and analytical variants per event.
pub struct ModelSelector {
    analytical: AnalyticalModel,
    trained: Option<TrainedModel>,
}

impl ModelSelector {
    pub fn new(config: &ModelConfig, predictions: &[ScorePrediction]) -> Self {
        let trained = if predictions.is_empty() {
            None
        } else {
            Some(TrainedModel::new(config.clone(), predictions))
        };
        Self {
            analytical: AnalyticalModel::new(config.clone()),
            trained,
        }
    }

    pub fn select(&self, event: &Event) -> &dyn ProbabilityModel {
        match &self.trained {
            Some(trained) if trained.supports(event) => trained,
            _ => &self.analytical,
        }
    }
}

/// Replaces missing or non-positive inputs with league averages and records
/// each substitution.
#[derive(Debug, Default)]
pub(crate) struct Imputer {
    pub flags: Vec<DataQualityFlag>,
}

impl Imputer {
    /// A strictly positive rate.
    pub fn rate(&mut self, value: Option<f64>, field: &str, side: Option<Outcome>, default: f64) -> f64 {
        match value {
            Some(v) if v.is_finite() && v > 0.0 => v,
            Some(_) => self.substitute(field, side, default, ImputationReason::NonPositive),
            None => self.substitute(field, side, default, ImputationReason::Missing),
        }
    }

    /// Any finite value (zero and negatives allowed).
    pub fn value(&mut self, value: Option<f64>, field: &str, side: Option<Outcome>, default: f64) -> f64 {
        match value {
            Some(v) if v.is_finite() => v,
            _ => self.substitute(field, side, default, ImputationReason::Missing),
        }
    }

    fn substitute(
        &mut self,
        field: &str,
        side: Option<Outcome>,
        default: f64,
        reason: ImputationReason,
    ) -> f64 {
        self.flags.push(DataQualityFlag {
            field: field.to_string(),
            side,
            substituted: default,
            reason,
        });
        default
    }
}
