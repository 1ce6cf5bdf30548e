//! Fair value and edge detection.
//!
//! Strips the bookmaker margin from a market's quoted prices and compares
//! the resulting no-vig probabilities to the model's estimate.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{
    decimal_to_american, EdgeResult, MarketQuote, Outcome, ProbabilityEstimate, ValueTier,
};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Edge% boundaries for the value tiers. Anything positive below
/// `fair_threshold` is Marginal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeConfig {
    pub excellent_threshold: f64,
    pub good_threshold: f64,
    pub fair_threshold: f64,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            excellent_threshold: 10.0,
            good_threshold: 6.0,
            fair_threshold: 3.0,
        }
    }
}

impl EdgeConfig {
    pub fn tier_for(&self, edge_percent: f64) -> ValueTier {
        if edge_percent >= self.excellent_threshold {
            ValueTier::Excellent
        } else if edge_percent >= self.good_threshold {
            ValueTier::Good
        } else if edge_percent >= self.fair_threshold {
            ValueTier::Fair
        } else if edge_percent > 0.0 {
            ValueTier::Marginal
        } else {
            ValueTier::None
        }
    }
}

// ---------------------------------------------------------------------------
// Pricing helpers
// ---------------------------------------------------------------------------

/// Fair decimal odds for a probability. `None` at p = 0.
pub fn fair_decimal_odds(probability: f64) -> Option<f64> {
    if probability > 0.0 && probability.is_finite() {
        Some(1.0 / probability)
    } else {
        None
    }
}

/// Signed edge percentage of the model over the market.
pub fn edge_percent(model_probability: f64, implied_probability: f64) -> f64 {
    (model_probability / implied_probability - 1.0) * 100.0
}

/// A usable quoted outcome with its implied probability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImpliedPrice {
    pub outcome: Outcome,
    pub decimal_odds: f64,
    pub implied_probability: f64,
}

/// No-vig implied probabilities for a quote.
///
/// The margin is removed only when every outcome in `full_set` carries
/// usable odds and the raw probabilities overshoot 1; otherwise each outcome
/// keeps its raw 1/odds. Degenerate prices are dropped.
pub fn implied_probabilities(quote: &MarketQuote, full_set: &[Outcome]) -> Vec<ImpliedPrice> {
    let usable: Vec<(Outcome, f64)> = quote
        .prices
        .iter()
        .filter_map(|p| p.odds.decimal().map(|d| (p.outcome, d)))
        .collect();

    let complete = full_set.len() >= 2
        && full_set
            .iter()
            .all(|o| usable.iter().any(|(u, _)| u == o));
    let overround: f64 = usable.iter().map(|(_, d)| 1.0 / d).sum();
    let divisor = if complete && overround > 1.0 {
        overround
    } else {
        1.0
    };

    usable
        .into_iter()
        .map(|(outcome, decimal_odds)| ImpliedPrice {
            outcome,
            decimal_odds,
            implied_probability: (1.0 / decimal_odds) / divisor,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Edge calculator
// ---------------------------------------------------------------------------

pub struct EdgeCalculator {
    config: EdgeConfig,
}

impl EdgeCalculator {
    pub fn new(config: EdgeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EdgeConfig {
        &self.config
    }

    /// Edge for one outcome given its model probability and no-vig price.
    pub fn edge_for(&self, model_probability: f64, price: &ImpliedPrice) -> EdgeResult {
        let edge = edge_percent(model_probability, price.implied_probability);
        let fair_decimal = fair_decimal_odds(model_probability);
        EdgeResult {
            outcome: price.outcome,
            model_probability,
            implied_probability: price.implied_probability,
            market_decimal_odds: price.decimal_odds,
            market_american_odds: decimal_to_american(price.decimal_odds),
            fair_decimal_odds: fair_decimal,
            fair_american_odds: fair_decimal.and_then(decimal_to_american),
            edge_percent: edge,
            tier: self.config.tier_for(edge),
        }
    }

    /// Edge for every usably priced outcome of a quote. Outcomes the
    /// estimate does not cover are skipped.
    pub fn evaluate_market(
        &self,
        quote: &MarketQuote,
        estimate: &ProbabilityEstimate,
    ) -> Vec<EdgeResult> {
        let full_set: Vec<Outcome> = estimate.outcomes.iter().map(|o| o.outcome).collect();
        implied_probabilities(quote, &full_set)
            .iter()
            .filter_map(|price| {
                let model = estimate.probability_of(price.outcome)?;
                let result = self.edge_for(model, price);
                debug!(
                    market = %quote.kind,
                    outcome = %price.outcome,
                    edge = format!("{:+.2}%", result.edge_percent),
                    tier = %result.tier,
                    "Edge computed"
                );
                Some(result)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EstimateSource, MarketKind, Odds, OutcomePrice, OutcomeProbability};

    fn make_quote(prices: &[(Outcome, Odds)]) -> MarketQuote {
        MarketQuote {
            kind: MarketKind::Moneyline,
            book: None,
            prices: prices
                .iter()
                .map(|(outcome, odds)| OutcomePrice { outcome: *outcome, odds: *odds })
                .collect(),
        }
    }

    fn make_estimate(home: f64) -> ProbabilityEstimate {
        ProbabilityEstimate {
            market: MarketKind::Moneyline,
            source: EstimateSource::Ensemble,
            outcomes: vec![
                OutcomeProbability { outcome: Outcome::Home, probability: home, variance: 0.0 },
                OutcomeProbability { outcome: Outcome::Away, probability: 1.0 - home, variance: 0.0 },
            ],
        }
    }

    #[test]
    fn test_no_vig_removes_margin() {
        let quote = make_quote(&[
            (Outcome::Home, Odds::American(-110)),
            (Outcome::Away, Odds::American(-110)),
        ]);
        let implied = implied_probabilities(&quote, &[Outcome::Home, Outcome::Away]);
        assert_eq!(implied.len(), 2);
        for p in &implied {
            assert!((p.implied_probability - 0.5).abs() < 1e-12);
        }
    }

    #[test]
    fn test_single_outcome_uses_raw_implied() {
        // 1/1.91 = 0.5236; a 0.58 model edge is +10.78%.
        let quote = make_quote(&[(Outcome::Home, Odds::Decimal(1.91))]);
        let calc = EdgeCalculator::new(EdgeConfig::default());
        let edges = calc.evaluate_market(&quote, &make_estimate(0.58));
        assert_eq!(edges.len(), 1);
        let edge = &edges[0];
        assert!((edge.implied_probability - 1.0 / 1.91).abs() < 1e-12);
        assert!((edge.edge_percent - 10.78).abs() < 0.01);
        assert_eq!(edge.tier, ValueTier::Excellent);
    }

    #[test]
    fn test_under_round_book_keeps_raw() {
        let quote = make_quote(&[
            (Outcome::Home, Odds::Decimal(2.1)),
            (Outcome::Away, Odds::Decimal(2.1)),
        ]);
        let implied = implied_probabilities(&quote, &[Outcome::Home, Outcome::Away]);
        assert!((implied[0].implied_probability - 1.0 / 2.1).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_odds_produce_no_edge() {
        let quote = make_quote(&[
            (Outcome::Home, Odds::Decimal(1.0)),
            (Outcome::Away, Odds::American(-110)),
        ]);
        let calc = EdgeCalculator::new(EdgeConfig::default());
        let edges = calc.evaluate_market(&quote, &make_estimate(0.5));
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].outcome, Outcome::Away);
    }

    #[test]
    fn test_edge_sign_follows_model_vs_market() {
        let quote = make_quote(&[
            (Outcome::Home, Odds::Decimal(1.8)),
            (Outcome::Away, Odds::Decimal(2.1)),
        ]);
        let calc = EdgeCalculator::new(EdgeConfig::default());
        for home in [0.3, 0.5, 0.7] {
            for edge in calc.evaluate_market(&quote, &make_estimate(home)) {
                let sign = (edge.model_probability - edge.implied_probability).signum();
                assert_eq!(edge.edge_percent.signum(), sign);
            }
        }
    }

    #[test]
    fn test_tier_boundaries() {
        let cfg = EdgeConfig::default();
        assert_eq!(cfg.tier_for(10.0), ValueTier::Excellent);
        assert_eq!(cfg.tier_for(6.0), ValueTier::Good);
        assert_eq!(cfg.tier_for(3.0), ValueTier::Fair);
        assert_eq!(cfg.tier_for(0.01), ValueTier::Marginal);
        assert_eq!(cfg.tier_for(0.0), ValueTier::None);
        assert_eq!(cfg.tier_for(-4.0), ValueTier::None);
    }

    #[test]
    fn test_fair_odds() {
        let calc = EdgeCalculator::new(EdgeConfig::default());
        let price = ImpliedPrice {
            outcome: Outcome::Home,
            decimal_odds: 2.2,
            implied_probability: 1.0 / 2.2,
        };
        let edge = calc.edge_for(0.5, &price);
        assert_eq!(edge.fair_decimal_odds, Some(2.0));
        assert_eq!(edge.fair_american_odds, Some(100));
        assert_eq!(edge.market_american_odds, Some(120));

        let zero = calc.edge_for(0.0, &price);
        assert_eq!(zero.fair_decimal_odds, None);
        assert_eq!(zero.edge_percent, -100.0);
    }
}
