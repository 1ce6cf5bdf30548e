//! Worked scenarios: missing data, sharp action, isolation between scans.

use chrono::{Duration, Utc};
use rust_decimal_macros::dec;
use std::thread;

use crate::common::{make_baseball_event, make_config};
use sharpline::engine::run_scan;
use sharpline::types::{
    BaseballTeamStats, LineMovement, LineTick, LineUnit, MatchupStats, Outcome,
    PublicBettingSplit, RiskFactor, RiskFactorKind, ScanBatch, SharpKind,
};

fn make_series(event_id: &str, ticks: &[(i64, &str, f64)]) -> LineMovement {
    let now = Utc::now();
    LineMovement {
        event_id: event_id.to_string(),
        outcome: Outcome::Home,
        unit: LineUnit::American,
        ticks: ticks
            .iter()
            .map(|(minutes_ago, book, value)| LineTick {
                timestamp: now - Duration::minutes(*minutes_ago),
                book: book.to_string(),
                value: *value,
            })
            .collect(),
    }
}

fn single(event: sharpline::types::Event) -> ScanBatch {
    ScanBatch {
        events: vec![event],
        ..ScanBatch::default()
    }
}

#[test]
fn test_missing_team_stats_are_imputed_and_flagged() {
    let mut event = make_baseball_event("mlb-missing", 2.6, 1.5);
    if let Some(MatchupStats::Baseball(stats)) = event.stats.as_mut() {
        stats.away = BaseballTeamStats::default();
    }
    let report = run_scan(make_config(), &single(event)).unwrap();
    let candidate = &report.candidates[0];

    assert_eq!(candidate.data_quality.len(), 3);
    assert!(candidate
        .data_quality
        .iter()
        .all(|f| f.side == Some(Outcome::Away)));
    let rendered: Vec<String> = candidate.data_quality.iter().map(|f| f.to_string()).collect();
    assert!(rendered
        .iter()
        .any(|s| s == "AWAY starter_era missing, league average 4.00 used"));

    // League-average inputs still leave a stronger home side, not a coin flip.
    let home = candidate.estimates[0].probability_of(Outcome::Home).unwrap();
    assert!(home > 0.5);
}

#[test]
fn test_no_market_history_means_no_indicators() {
    let report = run_scan(make_config(), &single(make_baseball_event("mlb-quiet", 2.6, 1.5))).unwrap();
    let candidate = &report.candidates[0];
    assert!(candidate.sharp_indicators.is_empty());
    assert!(candidate.sharp_flags().is_empty());
    assert_eq!(candidate.confidence.sharp_bonus, 0.0);
    assert_eq!(candidate.confidence.market_stability_bonus, 2.0);
    assert!(candidate.is_qualified());
}

#[test]
fn test_reverse_line_movement_against_public() {
    let event = make_baseball_event("mlb-rlm", 2.6, 1.5);
    let batch = ScanBatch {
        events: vec![event],
        line_movements: vec![make_series("mlb-rlm", &[(600, "pinnacle", -110.0), (240, "pinnacle", -130.0)])],
        public_splits: vec![PublicBettingSplit {
            event_id: "mlb-rlm".to_string(),
            outcome: Outcome::Away,
            bet_pct: 70.0,
            money_pct: 60.0,
        }],
        ..ScanBatch::default()
    };
    let report = run_scan(make_config(), &batch).unwrap();
    let candidate = &report.candidates[0];

    let rlm = candidate
        .sharp_indicators
        .iter()
        .find(|i| i.kind == SharpKind::Rlm)
        .unwrap();
    assert_eq!(rlm.side, Outcome::Home);
    assert_eq!(candidate.outcome, Outcome::Home);
    assert!(candidate.sharp_flags().contains("RLM"));
}

#[test]
fn test_history_for_other_events_is_ignored() {
    let batch = ScanBatch {
        events: vec![make_baseball_event("mlb-a", 2.6, 1.5)],
        line_movements: vec![make_series("mlb-other", &[(600, "a", -110.0), (240, "a", -130.0)])],
        ..ScanBatch::default()
    };
    let report = run_scan(make_config(), &batch).unwrap();
    assert!(report.candidates[0].sharp_indicators.is_empty());
}

#[test]
fn test_steam_across_books() {
    let batch = ScanBatch {
        events: vec![make_baseball_event("mlb-steam", 2.6, 1.5)],
        line_movements: vec![make_series(
            "mlb-steam",
            &[
                (30, "book-a", -110.0),
                (25, "book-a", -120.0),
                (30, "book-b", -110.0),
                (23, "book-b", -120.0),
                (30, "book-c", -110.0),
                (21, "book-c", -120.0),
            ],
        )],
        ..ScanBatch::default()
    };
    let report = run_scan(make_config(), &batch).unwrap();
    let candidate = &report.candidates[0];

    let kinds: Vec<SharpKind> = candidate
        .sharp_indicators
        .iter()
        .filter(|i| i.side == Outcome::Home)
        .map(|i| i.kind)
        .collect();
    assert!(kinds.contains(&SharpKind::Steam));
    assert!(kinds.contains(&SharpKind::Consensus));
    // A recent two-point swing voids market stability.
    assert_eq!(candidate.confidence.market_stability_bonus, 0.0);
    assert_eq!(candidate.confidence.sharp_bonus, 2.0);
}

#[test]
fn test_risk_factors_lower_confidence() {
    let mut event = make_baseball_event("mlb-risky", 2.6, 1.5);
    event.risk_factors = vec![
        RiskFactor {
            kind: RiskFactorKind::Weather,
            description: "Rain expected".to_string(),
        },
        RiskFactor {
            kind: RiskFactorKind::Injury,
            description: "Cleanup hitter questionable".to_string(),
        },
    ];
    let report = run_scan(make_config(), &single(event)).unwrap();
    let confidence = &report.candidates[0].confidence;
    assert!((confidence.risk_penalty + 1.2).abs() < 1e-9);
    assert!(confidence.explanation.iter().any(|line| line.contains("weather")));
}

#[test]
fn test_concurrent_scans_do_not_share_exposure() {
    let handles: Vec<_> = [dec!(10000), dec!(20000)]
        .into_iter()
        .map(|bankroll| {
            thread::spawn(move || {
                let mut config = make_config();
                config.scan.bankroll = bankroll;
                let batch = single(make_baseball_event("mlb-a", 2.6, 1.5));
                run_scan(config, &batch).unwrap()
            })
        })
        .collect();
    let reports: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    // Both size to the 5% per-bet cap of their own bankroll.
    assert_eq!(reports[0].summary.total_staked, dec!(500));
    assert_eq!(reports[1].summary.total_staked, dec!(1000));
    assert!((reports[0].summary.risk_percentage - 5.0).abs() < 1e-9);
    assert!((reports[1].summary.risk_percentage - 5.0).abs() < 1e-9);
}
