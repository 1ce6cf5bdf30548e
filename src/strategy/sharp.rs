//! Sharp-action detection from line history and public betting splits.
//!
//! Four rules, evaluated independently:
//! - RLM: the line moves toward the side the public is not betting
//! - Steam: fast same-direction moves across several books
//! - SharpMoney: handle share well above ticket share on one side
//! - Consensus: same-direction net movement at several books
//!
//! Line values are converted to a "favor" scale for the tracked outcome
//! (implied-probability points for prices, points for spreads and totals),
//! so a positive move always means the market moved toward that outcome.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::types::{
    LineMovement, LineUnit, Odds, Outcome, PublicBettingSplit, SharpIndicator, SharpKind,
};

const MOVE_EPSILON: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SharpConfig {
    /// Minimum average net move for RLM.
    pub rlm_min_move: f64,
    /// Bet share that makes a side the public side.
    pub public_majority_pct: f64,
    pub steam_min_move: f64,
    pub steam_window_minutes: i64,
    pub steam_min_books: usize,
    /// Money% minus bet% on one side.
    pub sharp_money_gap_pct: f64,
    pub consensus_min_books: usize,
}

impl Default for SharpConfig {
    fn default() -> Self {
        Self {
            rlm_min_move: 0.5,
            public_majority_pct: 55.0,
            steam_min_move: 0.5,
            steam_window_minutes: 15,
            steam_min_books: 3,
            sharp_money_gap_pct: 10.0,
            consensus_min_books: 3,
        }
    }
}

// ---------------------------------------------------------------------------
// Line paths
// ---------------------------------------------------------------------------

/// Favor of the tracked outcome at a given line value.
fn favor(unit: LineUnit, outcome: Outcome, value: f64) -> Option<f64> {
    if !value.is_finite() {
        return None;
    }
    match unit {
        LineUnit::American => Odds::American(value.round() as i32)
            .decimal()
            .map(|d| 100.0 / d),
        LineUnit::Decimal => Odds::Decimal(value).decimal().map(|d| 100.0 / d),
        // A higher total favors the over; a lower spread favors that side.
        LineUnit::Points if outcome == Outcome::Over => Some(value),
        LineUnit::Points => Some(-value),
    }
}

/// Per-book favor values in time order, books in name order.
fn book_paths(series: &LineMovement) -> BTreeMap<&str, Vec<(DateTime<Utc>, f64)>> {
    let mut paths: BTreeMap<&str, Vec<(DateTime<Utc>, f64)>> = BTreeMap::new();
    for tick in &series.ticks {
        if let Some(f) = favor(series.unit, series.outcome, tick.value) {
            paths
                .entry(tick.book.as_str())
                .or_default()
                .push((tick.timestamp, f));
        }
    }
    for path in paths.values_mut() {
        path.sort_by_key(|(t, _)| *t);
    }
    paths
}

/// First-to-last move per book (books with at least two ticks).
fn net_moves(series: &LineMovement) -> Vec<(&str, f64)> {
    book_paths(series)
        .into_iter()
        .filter_map(|(book, path)| match (path.first(), path.last()) {
            (Some(first), Some(last)) if path.len() >= 2 => Some((book, last.1 - first.1)),
            _ => None,
        })
        .collect()
}

/// The side a move of this sign favors.
fn side_for(series: &LineMovement, direction: f64) -> Option<Outcome> {
    if direction > 0.0 {
        Some(series.outcome)
    } else {
        series.outcome.opposite()
    }
}

/// Whether two outcomes belong to the same market family.
fn same_family(a: Outcome, b: Outcome) -> bool {
    let totals = |o: Outcome| matches!(o, Outcome::Over | Outcome::Under);
    totals(a) == totals(b)
}

/// 1 at the threshold, 2 at 1.5x, 3 at 2x.
fn strength_tier(magnitude: f64, threshold: f64) -> u8 {
    if magnitude >= threshold * 2.0 {
        3
    } else if magnitude >= threshold * 1.5 {
        2
    } else {
        1
    }
}

/// Largest line swing inside the trailing window of each series, measured
/// from the latest tick. `None` when there is no usable history.
pub fn largest_recent_move(movements: &[&LineMovement], window_minutes: i64) -> Option<f64> {
    let window = Duration::minutes(window_minutes);
    let mut largest: Option<f64> = None;
    for series in movements {
        let paths = book_paths(series);
        let Some(latest) = paths.values().flatten().map(|(t, _)| *t).max() else {
            continue;
        };
        let cutoff = latest - window;
        for path in paths.values() {
            let recent: Vec<f64> = path
                .iter()
                .filter(|(t, _)| *t >= cutoff)
                .map(|(_, f)| *f)
                .collect();
            let swing = match (
                recent.iter().cloned().reduce(f64::max),
                recent.iter().cloned().reduce(f64::min),
            ) {
                (Some(hi), Some(lo)) => hi - lo,
                _ => continue,
            };
            largest = Some(largest.map_or(swing, |l| l.max(swing)));
        }
    }
    largest
}

// ---------------------------------------------------------------------------
// Detector
// ---------------------------------------------------------------------------

pub struct SharpDetector {
    config: SharpConfig,
}

impl SharpDetector {
    pub fn new(config: SharpConfig) -> Self {
        Self { config }
    }

    /// Every indicator raised for one event. One indicator per (type, side),
    /// keeping the strongest.
    pub fn detect(
        &self,
        movements: &[&LineMovement],
        splits: &[&PublicBettingSplit],
    ) -> Vec<SharpIndicator> {
        let mut found = Vec::new();
        for series in movements {
            found.extend(self.reverse_line_movement(series, splits));
            found.extend(self.steam(series));
            found.extend(self.consensus(series));
        }
        found.extend(self.sharp_money(splits));

        let mut best: BTreeMap<(SharpKind, Outcome), SharpIndicator> = BTreeMap::new();
        for indicator in found {
            let key = (indicator.kind, indicator.side);
            match best.get(&key) {
                Some(existing) if existing.strength >= indicator.strength => {}
                _ => {
                    best.insert(key, indicator);
                }
            }
        }
        let indicators: Vec<SharpIndicator> = best.into_values().collect();
        for i in &indicators {
            debug!(kind = %i.kind, side = %i.side, strength = i.strength, "Sharp indicator");
        }
        indicators
    }

    fn reverse_line_movement(
        &self,
        series: &LineMovement,
        splits: &[&PublicBettingSplit],
    ) -> Option<SharpIndicator> {
        let nets = net_moves(series);
        if nets.is_empty() {
            return None;
        }
        let avg = nets.iter().map(|(_, m)| m).sum::<f64>() / nets.len() as f64;
        if avg.abs() < self.config.rlm_min_move {
            return None;
        }
        let side = side_for(series, avg)?;

        let public = splits
            .iter()
            .filter(|s| {
                s.outcome != side
                    && same_family(s.outcome, side)
                    && s.bet_pct >= self.config.public_majority_pct
            })
            .max_by(|a, b| a.bet_pct.total_cmp(&b.bet_pct))?;

        Some(SharpIndicator {
            kind: SharpKind::Rlm,
            strength: strength_tier(avg.abs(), self.config.rlm_min_move),
            side,
            description: format!(
                "Line moved {:.1} toward {side} while {:.0}% of bets are on {}",
                avg.abs(),
                public.bet_pct,
                public.outcome
            ),
        })
    }

    fn steam(&self, series: &LineMovement) -> Option<SharpIndicator> {
        let mut moves: Vec<(DateTime<Utc>, &str, f64)> = Vec::new();
        for (book, path) in book_paths(series) {
            for pair in path.windows(2) {
                let delta = pair[1].1 - pair[0].1;
                if delta.abs() > MOVE_EPSILON {
                    moves.push((pair[1].0, book, delta));
                }
            }
        }
        moves.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(b.1)));

        let window = Duration::minutes(self.config.steam_window_minutes);
        let mut best: Option<(f64, usize, f64)> = None; // (total, books, direction)
        for (i, (start, _, first)) in moves.iter().enumerate() {
            let direction = first.signum();
            let end = *start + window;
            let mut total = 0.0;
            let mut books = BTreeSet::new();
            for (_, book, delta) in moves[i..].iter().take_while(|(t, _, _)| *t <= end) {
                if delta.signum() == direction {
                    total += delta.abs();
                    books.insert(*book);
                }
            }
            if books.len() >= self.config.steam_min_books
                && total >= self.config.steam_min_move
                && best.map_or(true, |(b, _, _)| total > b)
            {
                best = Some((total, books.len(), direction));
            }
        }

        let (total, books, direction) = best?;
        let side = side_for(series, direction)?;
        Some(SharpIndicator {
            kind: SharpKind::Steam,
            strength: strength_tier(total, self.config.steam_min_move),
            side,
            description: format!(
                "{books} books moved {total:.1} toward {side} within {} minutes",
                self.config.steam_window_minutes
            ),
        })
    }

    fn consensus(&self, series: &LineMovement) -> Option<SharpIndicator> {
        let nets = net_moves(series);
        let toward = nets.iter().filter(|(_, m)| *m > MOVE_EPSILON).count();
        let away = nets.iter().filter(|(_, m)| *m < -MOVE_EPSILON).count();
        let min = self.config.consensus_min_books;
        let (count, direction) = if toward >= min && toward >= away {
            (toward, 1.0)
        } else if away >= min {
            (away, -1.0)
        } else {
            return None;
        };
        let side = side_for(series, direction)?;
        Some(SharpIndicator {
            kind: SharpKind::Consensus,
            strength: if count >= min + 2 { 2 } else { 1 },
            side,
            description: format!("{count} of {} books moved toward {side}", nets.len()),
        })
    }

    fn sharp_money(&self, splits: &[&PublicBettingSplit]) -> Vec<SharpIndicator> {
        let threshold = self.config.sharp_money_gap_pct;
        splits
            .iter()
            .filter(|s| s.split_gap() >= threshold)
            .map(|s| {
                let gap = s.split_gap();
                SharpIndicator {
                    kind: SharpKind::SharpMoney,
                    strength: if gap >= threshold + 10.0 {
                        3
                    } else if gap >= threshold + 5.0 {
                        2
                    } else {
                        1
                    },
                    side: s.outcome,
                    description: format!(
                        "{:.0}% of money on {} from {:.0}% of bets",
                        s.money_pct, s.outcome, s.bet_pct
                    ),
                }
            })
            .collect()
    }
}
