//! Risk manager.
//!
//! Enforces the daily exposure cap, the per-sport exposure cap and an
//! optional pick limit while picks are admitted greedily. All running totals
//! live in an explicit `RiskState` scoped to one scan.

use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use crate::types::{Candidate, OfficialPick, RemainingCapacity, Sport};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Total stake across all picks, as % of bankroll.
    pub daily_exposure_cap_pct: Decimal,
    /// Total stake within one sport, as % of bankroll.
    pub sport_exposure_cap_pct: Decimal,
    pub max_picks: Option<usize>,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            daily_exposure_cap_pct: dec!(15),
            sport_exposure_cap_pct: dec!(40),
            max_picks: None,
        }
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Running exposure for one scan. Never persisted.
#[derive(Debug, Clone)]
pub struct RiskState {
    pub bankroll: Decimal,
    pub total_staked: Decimal,
    pub per_sport: BTreeMap<Sport, Decimal>,
    pub picks: Vec<OfficialPick>,
}

impl RiskState {
    pub fn new(bankroll: Decimal) -> Self {
        Self {
            bankroll,
            total_staked: Decimal::ZERO,
            per_sport: BTreeMap::new(),
            picks: Vec::new(),
        }
    }

    pub fn sport_staked(&self, sport: Sport) -> Decimal {
        self.per_sport.get(&sport).copied().unwrap_or_default()
    }

    pub fn record(&mut self, pick: OfficialPick) {
        self.total_staked += pick.recommended_stake;
        *self.per_sport.entry(pick.sport).or_default() += pick.recommended_stake;
        self.picks.push(pick);
    }

    /// Total stake as a percentage of bankroll.
    pub fn risk_percentage(&self) -> f64 {
        if self.bankroll <= Decimal::ZERO {
            return 0.0;
        }
        (self.total_staked / self.bankroll * dec!(100))
            .to_f64()
            .unwrap_or(0.0)
    }
}

// ---------------------------------------------------------------------------
// Rejections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectionReason {
    DailyCapExceeded {
        stake: Decimal,
        remaining: Decimal,
    },
    SportCapExceeded {
        sport: Sport,
        stake: Decimal,
        remaining: Decimal,
    },
    MaxPicksReached {
        limit: usize,
    },
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionReason::DailyCapExceeded { stake, remaining } => write!(
                f,
                "stake ${stake:.2} exceeds remaining daily capacity ${remaining:.2}"
            ),
            RejectionReason::SportCapExceeded {
                sport,
                stake,
                remaining,
            } => write!(
                f,
                "stake ${stake:.2} exceeds remaining {sport} capacity ${remaining:.2}"
            ),
            RejectionReason::MaxPicksReached { limit } => {
                write!(f, "pick limit of {limit} reached")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Risk manager
// ---------------------------------------------------------------------------

pub struct RiskManager {
    config: RiskConfig,
}

impl RiskManager {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    pub fn daily_cap(&self, bankroll: Decimal) -> Decimal {
        bankroll * self.config.daily_exposure_cap_pct / dec!(100)
    }

    pub fn sport_cap(&self, bankroll: Decimal) -> Decimal {
        bankroll * self.config.sport_exposure_cap_pct / dec!(100)
    }

    /// Admission order: confidence desc, EV desc, event id asc.
    pub fn rank(a: &Candidate, b: &Candidate) -> Ordering {
        b.confidence
            .score
            .cmp(&a.confidence.score)
            .then_with(|| b.ev.ev_percent.total_cmp(&a.ev.ev_percent))
            .then_with(|| a.event_id.cmp(&b.event_id))
    }

    /// Check a stake against every cap given the exposure so far.
    pub fn approve(
        &self,
        sport: Sport,
        stake: Decimal,
        state: &RiskState,
    ) -> Result<(), RejectionReason> {
        if let Some(limit) = self.config.max_picks {
            if state.picks.len() >= limit {
                return Err(RejectionReason::MaxPicksReached { limit });
            }
        }

        let daily_remaining = self.daily_cap(state.bankroll) - state.total_staked;
        if stake > daily_remaining {
            return Err(RejectionReason::DailyCapExceeded {
                stake,
                remaining: daily_remaining.max(Decimal::ZERO),
            });
        }

        let sport_remaining = self.sport_cap(state.bankroll) - state.sport_staked(sport);
        if stake > sport_remaining {
            return Err(RejectionReason::SportCapExceeded {
                sport,
                stake,
                remaining: sport_remaining.max(Decimal::ZERO),
            });
        }

        Ok(())
    }

    /// Unused capacity under the daily cap and each sport cap.
    pub fn remaining_capacity(&self, state: &RiskState) -> RemainingCapacity {
        let sport_cap = self.sport_cap(state.bankroll);
        RemainingCapacity {
            daily: (self.daily_cap(state.bankroll) - state.total_staked).max(Decimal::ZERO),
            per_sport: Sport::ALL
                .iter()
                .map(|s| (*s, (sport_cap - state.sport_staked(*s)).max(Decimal::ZERO)))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ConfidenceTier, MarketKind, Outcome};
    use std::collections::BTreeSet;

    fn make_pick(event_id: &str, sport: Sport, stake: Decimal) -> OfficialPick {
        OfficialPick {
            event_id: event_id.to_string(),
            sport,
            matchup: "A @ B".to_string(),
            market: MarketKind::Moneyline,
            outcome: Outcome::Home,
            decimal_odds: 2.0,
            american_odds: Some(100),
            edge_percent: 8.0,
            ev_percent: 8.0,
            ev_dollars: Decimal::ZERO,
            confidence: 8,
            confidence_tier: ConfidenceTier::High,
            recommended_stake: stake,
            sharp_flags: BTreeSet::new(),
            data_quality: Vec::new(),
            rationale: String::new(),
        }
    }

    #[test]
    fn test_daily_cap_admits_three_of_five() {
        // $2500 bankroll: daily cap $375, five $100 requests.
        let risk = RiskManager::new(RiskConfig::default());
        let mut state = RiskState::new(dec!(2500));
        let mut rejected = 0;
        for i in 0..5 {
            let sport = Sport::ALL[i % 3];
            match risk.approve(sport, dec!(100), &state) {
                Ok(()) => state.record(make_pick(&format!("e{i}"), sport, dec!(100))),
                Err(RejectionReason::DailyCapExceeded { remaining, .. }) => {
                    assert_eq!(remaining, dec!(75));
                    rejected += 1;
                }
                Err(other) => panic!("unexpected rejection {other}"),
            }
        }
        assert_eq!(state.picks.len(), 3);
        assert_eq!(state.total_staked, dec!(300));
        assert_eq!(rejected, 2);
        assert_eq!(risk.remaining_capacity(&state).daily, dec!(75));
    }

    #[test]
    fn test_sport_cap() {
        let risk = RiskManager::new(RiskConfig {
            daily_exposure_cap_pct: dec!(100),
            sport_exposure_cap_pct: dec!(10),
            max_picks: None,
        });
        let mut state = RiskState::new(dec!(1000));
        state.record(make_pick("e1", Sport::Soccer, dec!(80)));
        let err = risk.approve(Sport::Soccer, dec!(30), &state).unwrap_err();
        assert!(matches!(err, RejectionReason::SportCapExceeded { sport: Sport::Soccer, .. }));
        assert!(risk.approve(Sport::Baseball, dec!(30), &state).is_ok());

        let remaining = risk.remaining_capacity(&state);
        assert_eq!(remaining.per_sport[&Sport::Soccer], dec!(20));
        assert_eq!(remaining.per_sport[&Sport::Basketball], dec!(100));
    }

    #[test]
    fn test_stake_exactly_at_cap_is_admitted() {
        let risk = RiskManager::new(RiskConfig::default());
        let state = RiskState::new(dec!(1000));
        assert!(risk.approve(Sport::Baseball, dec!(150), &state).is_ok());
        assert!(risk.approve(Sport::Baseball, dec!(150.01), &state).is_err());
    }

    #[test]
    fn test_max_picks() {
        let risk = RiskManager::new(RiskConfig {
            max_picks: Some(1),
            ..RiskConfig::default()
        });
        let mut state = RiskState::new(dec!(10000));
        state.record(make_pick("e1", Sport::Baseball, dec!(10)));
        assert_eq!(
            risk.approve(Sport::Soccer, dec!(10), &state),
            Err(RejectionReason::MaxPicksReached { limit: 1 })
        );
    }

    #[test]
    fn test_risk_percentage() {
        let mut state = RiskState::new(dec!(2000));
        state.record(make_pick("e1", Sport::Baseball, dec!(150)));
        assert!((state.risk_percentage() - 7.5).abs() < 1e-12);
    }
}
