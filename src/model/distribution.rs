//! Final-score distributions and the market pricing derived from them.
//!
//! Both the analytical estimator and the Monte Carlo validator work off the
//! same `ScoreDistribution`, so a market settles identically whether it is
//! integrated over the score grid or sampled.

use rand::Rng;

use crate::types::{EstimateSource, MarketKind, Outcome, OutcomeProbability, ProbabilityEstimate};

const LINE_EPSILON: f64 = 1e-9;
/// A marginal whose largest cell is below about 1e-150 gets rescaled.
const MIN_LOG_PEAK: f64 = -345.0;

/// How a level regulation score resolves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TieRule {
    /// Play continues; the home side wins with `home_share` and the winner
    /// finishes one run ahead.
    ExtraInnings { home_share: f64 },
    /// A draw is a priced result.
    Draw,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScoreDistribution {
    /// Independent Poisson scores per side, integrated over 0..=max_score.
    DoublePoisson {
        home_rate: f64,
        away_rate: f64,
        max_score: u32,
        tie_rule: TieRule,
    },
    /// Margin (home minus away) and total as independent normals.
    Normal {
        margin_mean: f64,
        margin_std: f64,
        total_mean: f64,
        total_std: f64,
    },
}

/// One simulated final score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameSample {
    pub home: f64,
    pub away: f64,
}

impl ScoreDistribution {
    /// Outcomes this distribution prices for a market.
    pub fn outcomes(&self, market: &MarketKind) -> &'static [Outcome] {
        match (self, market) {
            (_, MarketKind::Total { .. }) => &[Outcome::Over, Outcome::Under],
            (
                ScoreDistribution::DoublePoisson {
                    tie_rule: TieRule::Draw,
                    ..
                },
                MarketKind::Moneyline,
            ) => &[Outcome::Home, Outcome::Draw, Outcome::Away],
            _ => &[Outcome::Home, Outcome::Away],
        }
    }

    /// Closed-form (or grid-integrated) probabilities for one market.
    pub fn estimate(&self, market: &MarketKind) -> ProbabilityEstimate {
        let outcomes = self.outcomes(market);
        let probabilities = match self {
            ScoreDistribution::DoublePoisson { .. } => self.grid_probabilities(market, outcomes),
            ScoreDistribution::Normal {
                margin_mean,
                margin_std,
                total_mean,
                total_std,
            } => {
                let first = match market {
                    MarketKind::Moneyline => normal_sf(-margin_mean / margin_std),
                    MarketKind::Spread { home_line } => {
                        normal_sf(-(margin_mean + home_line) / margin_std)
                    }
                    MarketKind::Total { line } => normal_sf((line - total_mean) / total_std),
                };
                vec![first, 1.0 - first]
            }
        };

        let mut estimate = ProbabilityEstimate {
            market: *market,
            source: EstimateSource::Analytical,
            outcomes: outcomes
                .iter()
                .zip(probabilities)
                .map(|(&outcome, probability)| OutcomeProbability {
                    outcome,
                    probability,
                    variance: 0.0,
                })
                .collect(),
        };
        estimate.normalize();
        estimate
    }

    fn grid_probabilities(&self, market: &MarketKind, outcomes: &[Outcome]) -> Vec<f64> {
        let mut mass = vec![0.0; outcomes.len()];
        for (home, away, p) in self.final_score_cells() {
            if let Some(outcome) = settle(home, away, market) {
                if let Some(idx) = outcomes.iter().position(|o| *o == outcome) {
                    mass[idx] += p;
                }
            }
        }
        // Push mass and mass beyond the grid are dropped; normalize() rescales.
        // A grid where every cell pushes prices every outcome at zero.
        mass
    }

    /// (home, away, probability) for every final score on the grid, with
    /// level scores resolved by the tie rule.
    fn final_score_cells(&self) -> Vec<(f64, f64, f64)> {
        let ScoreDistribution::DoublePoisson {
            home_rate,
            away_rate,
            max_score,
            tie_rule,
        } = *self
        else {
            return Vec::new();
        };

        let home_pmf = poisson_pmf(home_rate, max_score);
        let away_pmf = poisson_pmf(away_rate, max_score);
        let mut cells = Vec::with_capacity(home_pmf.len() * away_pmf.len() + away_pmf.len());
        for (h, ph) in home_pmf.iter().enumerate() {
            for (a, pa) in away_pmf.iter().enumerate() {
                let p = ph * pa;
                let (h, a) = (h as f64, a as f64);
                match tie_rule {
                    TieRule::ExtraInnings { home_share } if h == a => {
                        cells.push((h + 1.0, a, p * home_share));
                        cells.push((h, a + 1.0, p * (1.0 - home_share)));
                    }
                    _ => cells.push((h, a, p)),
                }
            }
        }
        cells
    }

    /// Draw one final score.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> GameSample {
        match *self {
            ScoreDistribution::DoublePoisson {
                home_rate,
                away_rate,
                tie_rule,
                ..
            } => {
                let mut home = sample_poisson(rng, home_rate) as f64;
                let mut away = sample_poisson(rng, away_rate) as f64;
                if home == away {
                    if let TieRule::ExtraInnings { home_share } = tie_rule {
                        if rng.gen::<f64>() < home_share {
                            home += 1.0;
                        } else {
                            away += 1.0;
                        }
                    }
                }
                GameSample { home, away }
            }
            ScoreDistribution::Normal {
                margin_mean,
                margin_std,
                total_mean,
                total_std,
            } => {
                let margin = margin_mean + margin_std * sample_standard_normal(rng);
                let total = total_mean + total_std * sample_standard_normal(rng);
                GameSample {
                    home: (total + margin) / 2.0,
                    away: (total - margin) / 2.0,
                }
            }
        }
    }
}

/// Settle a market against a final score. `None` is a push.
pub fn settle(home: f64, away: f64, market: &MarketKind) -> Option<Outcome> {
    let signed = |x: f64, above: Outcome, below: Outcome| {
        if x > LINE_EPSILON {
            Some(above)
        } else if x < -LINE_EPSILON {
            Some(below)
        } else {
            None
        }
    };
    match market {
        MarketKind::Moneyline => {
            signed(home - away, Outcome::Home, Outcome::Away).or(Some(Outcome::Draw))
        }
        MarketKind::Spread { home_line } => {
            signed(home - away + home_line, Outcome::Home, Outcome::Away)
        }
        MarketKind::Total { line } => signed(home + away - line, Outcome::Over, Outcome::Under),
    }
}

// ---------------------------------------------------------------------------
// Numerics
// ---------------------------------------------------------------------------

/// Poisson pmf for k = 0..=max, accumulated in log space. When the rate
/// sits so far above `max` that the grid holds almost no mass, the shape is
/// rescaled so its largest cell is 1. Only relative mass matters to pricing,
/// and the product of two marginals then stays representable.
pub fn poisson_pmf(rate: f64, max: u32) -> Vec<f64> {
    let ln_rate = rate.ln();
    let mut logs = Vec::with_capacity(max as usize + 1);
    let mut log_p = -rate;
    logs.push(log_p);
    for k in 1..=max {
        log_p += ln_rate - (k as f64).ln();
        logs.push(log_p);
    }

    let peak = logs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let shift = if peak < MIN_LOG_PEAK { peak } else { 0.0 };
    logs.iter().map(|l| (l - shift).exp()).collect()
}

/// Complementary error function (Chebyshev fit, relative error < 1.2e-7).
fn erfc(x: f64) -> f64 {
    let z = x.abs();
    let t = 1.0 / (1.0 + 0.5 * z);
    let poly = -z * z - 1.265_512_23
        + t * (1.000_023_68
            + t * (0.374_091_96
                + t * (0.096_784_18
                    + t * (-0.186_288_06
                        + t * (0.278_868_07
                            + t * (-1.135_203_98
                                + t * (1.488_515_87 + t * (-0.822_152_23 + t * 0.170_872_77))))))));
    let r = t * poly.exp();
    if x >= 0.0 {
        r
    } else {
        2.0 - r
    }
}

/// Standard normal CDF.
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / std::f64::consts::SQRT_2)
}

/// Standard normal survival function, 1 - CDF.
pub fn normal_sf(x: f64) -> f64 {
    0.5 * erfc(x / std::f64::consts::SQRT_2)
}

/// Knuth's multiplication method; normal approximation above rate 30.
pub fn sample_poisson<R: Rng + ?Sized>(rng: &mut R, rate: f64) -> u32 {
    if rate <= 0.0 {
        return 0;
    }
    if rate > 30.0 {
        let x = rate + rate.sqrt() * sample_standard_normal(rng);
        return x.round().max(0.0) as u32;
    }
    let limit = (-rate).exp();
    let mut k = 0;
    let mut p = 1.0;
    loop {
        p *= rng.gen::<f64>();
        if p <= limit {
            return k;
        }
        k += 1;
    }
}

/// Box-Muller transform.
pub fn sample_standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    // gen() is in [0, 1); shift to (0, 1] so ln() stays finite.
    let u1 = 1.0 - rng.gen::<f64>();
    let u2 = rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}
