//! Monte Carlo cross-check of the analytical probabilities.
//!
//! Every event draws from its own `StdRng`, seeded from the run seed and a
//! stable hash of the event id, so results do not depend on scheduling order
//! or thread count.

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use crate::model::distribution::{settle, ScoreDistribution};
use crate::types::{EstimateSource, MarketKind, OutcomeProbability, ProbabilityEstimate};

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// 64-bit FNV-1a.
pub fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET, |hash, b| {
        (hash ^ u64::from(*b)).wrapping_mul(FNV_PRIME)
    })
}

/// Per-event seed derived from the run seed and the event id.
pub fn event_seed(run_seed: u64, event_id: &str) -> u64 {
    let mut bytes = run_seed.to_le_bytes().to_vec();
    bytes.extend_from_slice(event_id.as_bytes());
    fnv1a(&bytes)
}

#[derive(Debug, Clone)]
pub struct MonteCarloValidator {
    iterations: u32,
    run_seed: u64,
}

impl MonteCarloValidator {
    pub fn new(iterations: u32, run_seed: u64) -> Self {
        Self {
            iterations,
            run_seed,
        }
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Simulate the event and return one empirical estimate per market, in
    /// market order. A market whose every sample pushed yields `None`.
    pub fn validate(
        &self,
        event_id: &str,
        distribution: &ScoreDistribution,
        markets: &[MarketKind],
    ) -> Vec<Option<ProbabilityEstimate>> {
        let mut rng = StdRng::seed_from_u64(event_seed(self.run_seed, event_id));
        let outcome_sets: Vec<_> = markets.iter().map(|m| distribution.outcomes(m)).collect();
        let mut counts: Vec<Vec<u32>> = outcome_sets.iter().map(|o| vec![0; o.len()]).collect();

        for _ in 0..self.iterations {
            let game = distribution.sample(&mut rng);
            for (idx, market) in markets.iter().enumerate() {
                if let Some(outcome) = settle(game.home, game.away, market) {
                    if let Some(pos) = outcome_sets[idx].iter().position(|o| *o == outcome) {
                        counts[idx][pos] += 1;
                    }
                }
            }
        }

        markets
            .iter()
            .zip(outcome_sets)
            .zip(counts)
            .map(|((market, outcomes), counts)| {
                let settled: u32 = counts.iter().sum();
                if settled == 0 {
                    debug!(event_id, market = %market, "All simulated results pushed");
                    return None;
                }
                let n = f64::from(settled);
                Some(ProbabilityEstimate {
                    market: *market,
                    source: EstimateSource::Simulated,
                    outcomes: outcomes
                        .iter()
                        .zip(counts)
                        .map(|(&outcome, count)| {
                            let p = f64::from(count) / n;
                            OutcomeProbability {
                                outcome,
                                probability: p,
                                variance: p * (1.0 - p) / n,
                            }
                        })
                        .collect(),
                })
            })
            .collect()
    }
}
