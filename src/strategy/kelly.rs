//! Expected value and Kelly criterion stake sizing.
//!
//! Computes fractional-Kelly stakes with a confidence boost, a per-bet cap,
//! and stake rounding down to a fixed unit so the cap always holds after
//! rounding.

use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{decimal_to_american, EvResult, Odds};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KellyConfig {
    /// Fractional Kelly multiplier (0.25 = quarter-Kelly).
    pub multiplier: f64,
    /// Maximum stake as a fraction of bankroll.
    pub max_bet_fraction: f64,
    /// Confidence score at which the stake boost applies.
    pub high_confidence_threshold: u8,
    pub high_confidence_multiplier: f64,
    /// Stakes are rounded down to a multiple of this amount.
    pub stake_unit: Decimal,
}

impl Default for KellyConfig {
    fn default() -> Self {
        Self {
            multiplier: 0.25,                // Quarter-Kelly
            max_bet_fraction: 0.05,          // 5% of bankroll per bet
            high_confidence_threshold: 9,
            high_confidence_multiplier: 2.0, // Doubled at 9+
            stake_unit: dec!(1),             // Whole dollars
        }
    }
}

// ---------------------------------------------------------------------------
// Formulas
// ---------------------------------------------------------------------------

/// EV per unit staked, as a percentage: (p·d − 1)·100.
pub fn expected_value_percent(probability: f64, decimal_odds: f64) -> f64 {
    (probability * decimal_odds - 1.0) * 100.0
}

/// Full Kelly fraction f* = (p·b − q) / b with b = d − 1. Zero when the
/// bet has no edge or the odds are degenerate.
pub fn kelly_fraction(probability: f64, decimal_odds: f64) -> f64 {
    let b = decimal_odds - 1.0;
    if !b.is_finite() || b <= 0.0 {
        return 0.0;
    }
    let kelly = (probability * b - (1.0 - probability)) / b;
    if kelly.is_finite() && kelly > 0.0 {
        kelly
    } else {
        0.0
    }
}

/// Round down to a multiple of `unit`.
pub fn floor_to_unit(amount: Decimal, unit: Decimal) -> Decimal {
    if unit <= Decimal::ZERO || amount <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (amount / unit).floor() * unit
}

// ---------------------------------------------------------------------------
// Kelly calculator
// ---------------------------------------------------------------------------

pub struct KellyCalculator {
    config: KellyConfig,
}

impl KellyCalculator {
    pub fn new(config: KellyConfig) -> Self {
        Self { config }
    }

    /// Access the Kelly configuration.
    pub fn config(&self) -> &KellyConfig {
        &self.config
    }

    /// EV and stake for one bet. `confidence` enables the high-confidence
    /// boost; pass `None` to size without it.
    pub fn evaluate(
        &self,
        probability: f64,
        decimal_odds: f64,
        confidence: Option<u8>,
        bankroll: Decimal,
    ) -> EvResult {
        let ev_percent = expected_value_percent(probability, decimal_odds);
        let kelly = kelly_fraction(probability, decimal_odds);

        let boost = match confidence {
            Some(c) if c >= self.config.high_confidence_threshold => {
                self.config.high_confidence_multiplier
            }
            _ => 1.0,
        };
        let stake_fraction = (kelly * self.config.multiplier * boost)
            .min(self.config.max_bet_fraction)
            .max(0.0);

        let raw_stake = bankroll * Decimal::from_f64(stake_fraction).unwrap_or_default();
        let recommended_stake = floor_to_unit(raw_stake, self.config.stake_unit);
        let ev_dollars = (recommended_stake
            * Decimal::from_f64(ev_percent / 100.0).unwrap_or_default())
        .round_dp(2);

        debug!(
            p = format!("{:.3}", probability),
            odds = format!("{:.3}", decimal_odds),
            ev = format!("{:+.2}%", ev_percent),
            raw_kelly = format!("{:.2}%", kelly * 100.0),
            fraction = format!("{:.2}%", stake_fraction * 100.0),
            stake = format!("${}", recommended_stake),
            "Bet sized"
        );

        EvResult {
            ev_percent,
            ev_dollars,
            kelly_fraction: kelly,
            stake_fraction,
            recommended_stake,
        }
    }

    /// Combined EV of an accumulator: probabilities and decimal odds
    /// multiply across legs.
    pub fn evaluate_parlay(
        &self,
        legs: &[ParlayLeg],
        bankroll: Decimal,
    ) -> Result<ParlayResult, ParlayError> {
        if legs.len() < 2 {
            return Err(ParlayError::TooFewLegs(legs.len()));
        }
        let mut probability = 1.0;
        let mut odds = 1.0;
        for (index, leg) in legs.iter().enumerate() {
            if !(0.0..=1.0).contains(&leg.probability) {
                return Err(ParlayError::InvalidProbability {
                    index,
                    probability: leg.probability,
                });
            }
            let decimal = leg.odds.decimal().ok_or(ParlayError::DegenerateOdds { index })?;
            probability *= leg.probability;
            odds *= decimal;
        }

        Ok(ParlayResult {
            legs: legs.len(),
            combined_probability: probability,
            combined_decimal_odds: odds,
            combined_american_odds: decimal_to_american(odds),
            ev: self.evaluate(probability, odds, None, bankroll),
        })
    }
}

// ---------------------------------------------------------------------------
// Parlays
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParlayLeg {
    #[serde(default)]
    pub label: Option<String>,
    pub probability: f64,
    pub odds: Odds,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParlayResult {
    pub legs: usize,
    pub combined_probability: f64,
    pub combined_decimal_odds: f64,
    pub combined_american_odds: Option<i32>,
    pub ev: EvResult,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParlayError {
    #[error("a parlay needs at least two legs (got {0})")]
    TooFewLegs(usize),

    #[error("leg {index}: probability {probability} is outside [0, 1]")]
    InvalidProbability { index: usize, probability: f64 },

    #[error("leg {index}: odds are not usable")]
    DegenerateOdds { index: usize },
}
