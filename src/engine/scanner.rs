//! Batch scanner.
//!
//! Takes one `ScanBatch`, routes line history and public splits to their
//! events, evaluates every event in parallel under an optional wall-clock
//! budget, then hands the candidates to the risk manager and summarizes the
//! run. Nothing survives between scans.

use rayon::prelude::*;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::strategy::{DecisionRecord, EventContext, StrategyOrchestrator};
use crate::types::{
    Candidate, EngineError, InputDataError, OfficialPick, RiskAssessment, ScanBatch,
    ScanSummary,
};

/// Everything one scan produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub picks: Vec<OfficialPick>,
    pub summary: ScanSummary,
    pub decisions: Vec<DecisionRecord>,
    /// Every evaluated candidate, qualified or not.
    pub candidates: Vec<Candidate>,
}

enum EventOutcome {
    Evaluated(Box<Candidate>),
    Skipped(InputDataError),
    Unprocessed,
}

pub struct Scanner {
    config: EngineConfig,
}

impl Scanner {
    /// Validates the configuration; this is the only fatal failure.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Scan with the configured time budget.
    pub fn scan(&self, batch: &ScanBatch) -> ScanReport {
        let started = Instant::now();
        let deadline = self
            .config
            .scan
            .time_budget_ms
            .map(|ms| started + Duration::from_millis(ms));
        self.scan_until(batch, started, deadline)
    }

    /// Scan with an explicit deadline. Events not started by the deadline
    /// are reported as unprocessed.
    pub fn scan_until(
        &self,
        batch: &ScanBatch,
        started: Instant,
        deadline: Option<Instant>,
    ) -> ScanReport {
        let scan = &self.config.scan;
        info!(
            events = batch.events.len(),
            line_series = batch.line_movements.len(),
            splits = batch.public_splits.len(),
            predictions = batch.predictions.len(),
            run_seed = scan.run_seed,
            iterations = scan.monte_carlo_iterations,
            "Scan started"
        );

        let orchestrator = StrategyOrchestrator::new(&self.config, &batch.predictions);
        let movements = group_by_event(&batch.line_movements, |m| m.event_id.as_str());
        let splits = group_by_event(&batch.public_splits, |s| s.event_id.as_str());

        // First occurrence of an id wins.
        let mut seen = HashSet::new();
        let duplicate: Vec<bool> = batch
            .events
            .iter()
            .map(|e| !seen.insert(e.id.as_str()))
            .collect();

        let outcomes: Vec<EventOutcome> = batch
            .events
            .par_iter()
            .zip(duplicate.par_iter())
            .map(|(event, &is_duplicate)| {
                if is_duplicate {
                    return EventOutcome::Skipped(InputDataError::DuplicateEventId);
                }
                if deadline.is_some_and(|d| Instant::now() >= d) {
                    return EventOutcome::Unprocessed;
                }
                let ctx = EventContext {
                    event,
                    movements: movements.get(event.id.as_str()).cloned().unwrap_or_default(),
                    splits: splits.get(event.id.as_str()).cloned().unwrap_or_default(),
                };
                match orchestrator.evaluate(&ctx) {
                    Ok(candidate) => EventOutcome::Evaluated(Box::new(candidate)),
                    Err(e) => EventOutcome::Skipped(e),
                }
            })
            .collect();

        let mut candidates = Vec::new();
        let mut decisions = Vec::new();
        let mut skipped = 0;
        let mut unprocessed = 0;
        for (event, outcome) in batch.events.iter().zip(outcomes) {
            match outcome {
                EventOutcome::Evaluated(candidate) => candidates.push(*candidate),
                EventOutcome::Skipped(error) => {
                    warn!(event_id = %event.id, error = %error, "Event skipped");
                    skipped += 1;
                    decisions.push(DecisionRecord::Skipped {
                        event_id: event.id.clone(),
                        error,
                    });
                }
                EventOutcome::Unprocessed => {
                    unprocessed += 1;
                    decisions.push(DecisionRecord::Unprocessed {
                        event_id: event.id.clone(),
                    });
                }
            }
        }
        if unprocessed > 0 {
            warn!(
                unprocessed,
                budget_ms = ?scan.time_budget_ms,
                "Time budget exhausted, allocating partial results"
            );
        }

        let allocation = orchestrator.select_picks(&candidates);
        decisions.extend(allocation.decisions);
        let risk = orchestrator.risk();
        let outlook = Outlook::of(&allocation.picks, allocation.state.total_staked);
        let risk_percentage = allocation.state.risk_percentage();

        let summary = ScanSummary {
            total_candidates: candidates.len(),
            qualified_candidates: candidates.iter().filter(|c| c.is_qualified()).count(),
            skipped_events: skipped,
            unprocessed_events: unprocessed,
            timed_out: unprocessed > 0,
            picks: allocation.picks.len(),
            bankroll: allocation.state.bankroll,
            total_staked: allocation.state.total_staked,
            risk_percentage,
            risk_assessment: RiskAssessment::from_risk_percentage(risk_percentage),
            expected_profit: outlook.expected_profit,
            roi_percent: outlook.roi_percent,
            break_even_probability: outlook.break_even_probability,
            remaining_capacity: risk.remaining_capacity(&allocation.state),
            avg_edge_percent: mean(allocation.picks.iter().map(|p| p.edge_percent)),
            avg_confidence: mean(allocation.picks.iter().map(|p| f64::from(p.confidence))),
            sharp_flag_distribution: flag_distribution(&allocation.picks),
            execution_time_ms: started.elapsed().as_millis() as u64,
            run_seed: scan.run_seed,
        };

        info!(
            candidates = summary.total_candidates,
            qualified = summary.qualified_candidates,
            skipped = summary.skipped_events,
            picks = summary.picks,
            staked = format!("${:.2}", summary.total_staked),
            risk = format!("{:.1}%", summary.risk_percentage),
            risk_assessment = %summary.risk_assessment,
            expected_profit = format!("${:.2}", summary.expected_profit),
            roi = format!("{:.1}%", summary.roi_percent),
            elapsed_ms = summary.execution_time_ms,
            "Scan complete"
        );
        for pick in &allocation.picks {
            debug!(pick = %pick, "Official pick");
        }

        ScanReport {
            picks: allocation.picks,
            summary,
            decisions,
            candidates,
        }
    }
}

/// Validate the configuration and run one scan.
pub fn run_scan(config: EngineConfig, batch: &ScanBatch) -> Result<ScanReport, EngineError> {
    Ok(Scanner::new(config)?.scan(batch))
}

fn group_by_event<'a, T>(
    items: &'a [T],
    key: impl Fn(&'a T) -> &'a str,
) -> HashMap<&'a str, Vec<&'a T>> {
    let mut grouped: HashMap<&str, Vec<&T>> = HashMap::new();
    for item in items {
        grouped.entry(key(item)).or_default().push(item);
    }
    grouped
}

/// Expected return of the admitted slate.
struct Outlook {
    expected_profit: Decimal,
    roi_percent: f64,
    break_even_probability: f64,
}

impl Outlook {
    fn of(picks: &[OfficialPick], staked: Decimal) -> Self {
        let expected_profit: Decimal = picks.iter().map(|p| p.ev_dollars).sum();
        if staked <= Decimal::ZERO {
            return Self {
                expected_profit,
                roi_percent: 0.0,
                break_even_probability: 1.0,
            };
        }
        let roi_percent = (expected_profit / staked * Decimal::ONE_HUNDRED)
            .to_f64()
            .unwrap_or(0.0);
        let break_even_probability = if expected_profit > Decimal::ZERO {
            (staked / (staked + expected_profit)).to_f64().unwrap_or(1.0)
        } else {
            1.0
        };
        Self {
            expected_profit,
            roi_percent,
            break_even_probability,
        }
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

fn flag_distribution(picks: &[OfficialPick]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for flag in picks.iter().flat_map(|p| &p.sharp_flags) {
        *counts.entry(flag.clone()).or_insert(0) += 1;
    }
    counts
}
