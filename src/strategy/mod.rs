//! Strategy engine: per-event evaluation and portfolio selection.
//!
//! Each event flows through model → simulation → blend → edge → sharp →
//! confidence → Kelly to become one `Candidate`. Qualified candidates are
//! then admitted greedily through the risk manager.

pub mod confidence;
pub mod edge;
pub mod ensemble;
pub mod kelly;
pub mod risk;
pub mod sharp;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::model::ModelSelector;
use crate::simulation::MonteCarloValidator;
use crate::types::{
    Candidate, ConfidenceBreakdown, Disqualification, EdgeResult, Event, EvResult,
    InputDataError, LineMovement, MarketKind, Odds, OfficialPick, PublicBettingSplit,
    ScorePrediction,
};
use confidence::{ConfidenceInput, ConfidenceScorer};
use edge::EdgeCalculator;
use ensemble::{divergence, EnsembleBlender};
use kelly::KellyCalculator;
use risk::{RejectionReason, RiskManager, RiskState};
use sharp::{largest_recent_move, SharpDetector};

// ---------------------------------------------------------------------------
// Decision log
// ---------------------------------------------------------------------------

/// Record of every decision made (or skipped) during a scan, including
/// opportunities that were passed on and the reason why.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum DecisionRecord {
    /// Admitted as an official pick.
    Selected { event_id: String, stake: Decimal },
    /// Candidate built but did not meet the qualification rules.
    Disqualified {
        event_id: String,
        reasons: Vec<Disqualification>,
    },
    /// Qualified but blocked by an exposure cap or the pick limit.
    RiskRejected {
        event_id: String,
        reason: RejectionReason,
    },
    /// Input for the event was malformed.
    Skipped {
        event_id: String,
        error: InputDataError,
    },
    /// Never started because the time budget ran out.
    Unprocessed { event_id: String },
}

// ---------------------------------------------------------------------------
// Event validation
// ---------------------------------------------------------------------------

/// Reject events the engine cannot price.
pub fn validate_event(event: &Event) -> Result<(), InputDataError> {
    if event.id.trim().is_empty() {
        return Err(InputDataError::EmptyId);
    }
    if event.markets.is_empty() {
        return Err(InputDataError::NoMarkets);
    }
    if let Some(stats) = &event.stats {
        if stats.sport() != event.sport {
            return Err(InputDataError::StatsSportMismatch {
                event: event.sport,
                stats: stats.sport(),
            });
        }
    }

    for quote in &event.markets {
        let market = quote.kind.to_string();
        if quote.prices.is_empty() {
            return Err(InputDataError::EmptyMarket { market });
        }
        let valid = quote.kind.outcomes(event.sport);
        let mut seen = HashSet::new();
        for price in &quote.prices {
            if !valid.contains(&price.outcome) {
                return Err(InputDataError::InvalidOutcome {
                    sport: event.sport,
                    market,
                    outcome: price.outcome,
                });
            }
            if !seen.insert(price.outcome) {
                return Err(InputDataError::DuplicateOutcome {
                    market,
                    outcome: price.outcome,
                });
            }
        }
    }

    let usable = event
        .markets
        .iter()
        .flat_map(|q| &q.prices)
        .any(|p| p.odds.decimal().is_some());
    if !usable {
        return Err(InputDataError::NoUsableOdds);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Line history and public splits belonging to one event.
#[derive(Debug, Clone)]
pub struct EventContext<'a> {
    pub event: &'a Event,
    pub movements: Vec<&'a LineMovement>,
    pub splits: Vec<&'a PublicBettingSplit>,
}

/// One priced outcome, fully assessed.
struct Assessment {
    market: MarketKind,
    odds: Odds,
    edge: EdgeResult,
    divergence: Option<f64>,
    confidence: ConfidenceBreakdown,
    ev: EvResult,
    disqualifications: Vec<Disqualification>,
}

impl Assessment {
    /// Qualified first, then confidence, then EV.
    fn outranks(&self, other: &Assessment) -> bool {
        let by_rules = self
            .disqualifications
            .is_empty()
            .cmp(&other.disqualifications.is_empty())
            .then(self.confidence.score.cmp(&other.confidence.score))
            .then(self.ev.ev_percent.total_cmp(&other.ev.ev_percent));
        by_rules == Ordering::Greater
    }
}

/// Output of portfolio selection.
#[derive(Debug, Clone)]
pub struct Allocation {
    pub picks: Vec<OfficialPick>,
    pub state: RiskState,
    pub decisions: Vec<DecisionRecord>,
}

/// Pipelines model → simulation → blend → edge → sharp → confidence →
/// Kelly per event, then greedy risk-capped selection across events.
///
/// Built once per scan; holds no mutable state so `evaluate` can run on
/// many events in parallel.
pub struct StrategyOrchestrator {
    models: ModelSelector,
    simulator: MonteCarloValidator,
    blender: EnsembleBlender,
    edges: EdgeCalculator,
    sharp: SharpDetector,
    confidence: ConfidenceScorer,
    kelly: KellyCalculator,
    risk: RiskManager,
    bankroll: Decimal,
    min_ev: f64,
    min_confidence: u8,
}

impl StrategyOrchestrator {
    pub fn new(config: &EngineConfig, predictions: &[ScorePrediction]) -> Self {
        Self {
            models: ModelSelector::new(&config.model, predictions),
            simulator: MonteCarloValidator::new(
                config.scan.monte_carlo_iterations,
                config.scan.run_seed,
            ),
            blender: EnsembleBlender::new(&config.blend),
            edges: EdgeCalculator::new(config.edge.clone()),
            sharp: SharpDetector::new(config.sharp.clone()),
            confidence: ConfidenceScorer::new(config.confidence.clone()),
            kelly: KellyCalculator::new(config.kelly.clone()),
            risk: RiskManager::new(config.risk.clone()),
            bankroll: config.scan.bankroll,
            min_ev: config.scan.min_ev_threshold,
            min_confidence: config.scan.min_confidence_threshold,
        }
    }

    pub fn risk(&self) -> &RiskManager {
        &self.risk
    }

    fn disqualify(&self, ev: &EvResult, confidence: &ConfidenceBreakdown) -> Vec<Disqualification> {
        let mut reasons = Vec::new();
        if ev.kelly_fraction <= 0.0 {
            reasons.push(Disqualification::NonPositiveKelly);
        } else if ev.recommended_stake <= Decimal::ZERO {
            reasons.push(Disqualification::StakeBelowUnit);
        }
        if ev.ev_percent < self.min_ev {
            reasons.push(Disqualification::EvBelowThreshold {
                ev_percent: ev.ev_percent,
                threshold: self.min_ev,
            });
        }
        if confidence.score < self.min_confidence {
            reasons.push(Disqualification::ConfidenceBelowThreshold {
                score: confidence.score,
                threshold: self.min_confidence,
            });
        }
        reasons
    }

    /// Build the candidate for one event: every usably priced outcome is
    /// assessed and the best one is kept.
    pub fn evaluate(&self, ctx: &EventContext<'_>) -> Result<Candidate, InputDataError> {
        let event = ctx.event;
        validate_event(event)?;

        let model = self.models.select(event);
        let fit = model.fit(event);

        let kinds: Vec<MarketKind> = event.markets.iter().map(|q| q.kind).collect();
        let analytical: Vec<_> = kinds.iter().map(|k| fit.distribution.estimate(k)).collect();
        let simulated = self.simulator.validate(&event.id, &fit.distribution, &kinds);
        let blended: Vec<_> = analytical
            .iter()
            .zip(&simulated)
            .map(|(a, s)| self.blender.blend(a, s.as_ref()))
            .collect();

        let indicators = self.sharp.detect(&ctx.movements, &ctx.splits);
        let recent_move = largest_recent_move(
            &ctx.movements,
            self.confidence.config().recent_window_minutes,
        );

        let mut best: Option<Assessment> = None;
        for (idx, quote) in event.markets.iter().enumerate() {
            for edge in self.edges.evaluate_market(quote, &blended[idx]) {
                let Some(odds) = quote.price(edge.outcome).copied() else {
                    continue;
                };
                let model_divergence =
                    divergence(&analytical[idx], simulated[idx].as_ref(), edge.outcome);
                let confidence = self.confidence.score(&ConfidenceInput {
                    side: edge.outcome,
                    tier: edge.tier,
                    indicators: &indicators,
                    model_divergence,
                    largest_recent_move: recent_move,
                    risk_factors: &event.risk_factors,
                });
                let ev = self.kelly.evaluate(
                    edge.model_probability,
                    edge.market_decimal_odds,
                    Some(confidence.score),
                    self.bankroll,
                );
                let assessment = Assessment {
                    market: quote.kind,
                    odds,
                    disqualifications: self.disqualify(&ev, &confidence),
                    edge,
                    divergence: model_divergence,
                    confidence,
                    ev,
                };
                if best.as_ref().map_or(true, |b| assessment.outranks(b)) {
                    best = Some(assessment);
                }
            }
        }

        let best = best.ok_or(InputDataError::NoUsableOdds)?;
        let candidate = Candidate {
            event_id: event.id.clone(),
            sport: event.sport,
            matchup: event.matchup(),
            model: fit.model,
            market: best.market,
            outcome: best.edge.outcome,
            odds: best.odds,
            estimates: blended,
            model_divergence: best.divergence,
            edge: best.edge,
            sharp_indicators: indicators,
            confidence: best.confidence,
            ev: best.ev,
            data_quality: fit.data_quality,
            disqualifications: best.disqualifications,
        };

        debug!(
            event_id = %candidate.event_id,
            model = %model.capability(),
            market = %candidate.market,
            outcome = %candidate.outcome,
            edge = format!("{:+.2}%", candidate.edge.edge_percent),
            ev = format!("{:+.2}%", candidate.ev.ev_percent),
            confidence = candidate.confidence.score,
            qualified = candidate.is_qualified(),
            "Candidate evaluated"
        );
        Ok(candidate)
    }

    /// Greedy admission of qualified candidates in rank order. A candidate
    /// that breaks a cap is skipped, not retried.
    pub fn select_picks(&self, candidates: &[Candidate]) -> Allocation {
        let mut decisions = Vec::new();
        let mut qualified: Vec<&Candidate> = Vec::new();
        for c in candidates {
            if c.is_qualified() {
                qualified.push(c);
            } else {
                decisions.push(DecisionRecord::Disqualified {
                    event_id: c.event_id.clone(),
                    reasons: c.disqualifications.clone(),
                });
            }
        }
        qualified.sort_by(|a, b| RiskManager::rank(a, b));

        let mut state = RiskState::new(self.bankroll);
        for candidate in qualified {
            let stake = candidate.ev.recommended_stake;
            match self.risk.approve(candidate.sport, stake, &state) {
                Ok(()) => {
                    info!(
                        event_id = %candidate.event_id,
                        pick = %candidate.outcome,
                        market = %candidate.market,
                        stake = format!("${:.2}", stake),
                        ev = format!("{:+.2}%", candidate.ev.ev_percent),
                        confidence = candidate.confidence.score,
                        "Pick approved"
                    );
                    decisions.push(DecisionRecord::Selected {
                        event_id: candidate.event_id.clone(),
                        stake,
                    });
                    state.record(OfficialPick::from(candidate));
                }
                Err(reason) => {
                    warn!(
                        event_id = %candidate.event_id,
                        reason = %reason,
                        "Pick rejected by risk manager"
                    );
                    decisions.push(DecisionRecord::RiskRejected {
                        event_id: candidate.event_id.clone(),
                        reason,
                    });
                }
            }
        }

        info!(
            candidates = candidates.len(),
            selected = state.picks.len(),
            staked = format!("${:.2}", state.total_staked),
            "Portfolio selection complete"
        );

        Allocation {
            picks: state.picks.clone(),
            state,
            decisions,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
