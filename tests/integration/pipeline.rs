//! Full scans over hand-built batches.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::time::Instant;

use crate::common::{make_baseball_event, make_config, make_moneyline};
use sharpline::engine::{run_scan, Scanner};
use sharpline::strategy::risk::RejectionReason;
use sharpline::strategy::DecisionRecord;
use sharpline::types::{
    InputDataError, MatchupStats, Odds, Outcome, RiskAssessment, ScanBatch, ScorePrediction,
    SoccerMatchup, SoccerTeamStats, Sport,
};

#[test]
fn test_sample_batch_scans() {
    let raw = std::fs::read_to_string("data/sample_scan.json").unwrap();
    let batch: ScanBatch = serde_json::from_str(&raw).unwrap();
    let report = run_scan(make_config(), &batch).unwrap();

    assert_eq!(report.summary.total_candidates, 3);
    assert_eq!(report.summary.skipped_events, 0);
    assert!(!report.summary.timed_out);
    let nba = report
        .candidates
        .iter()
        .find(|c| c.event_id == "nba-uta-den-20260415")
        .unwrap();
    assert_eq!(nba.model, "gbm-2026.03");
    for pick in &report.picks {
        assert!(pick.ev_percent >= 6.0);
        assert!(pick.confidence >= 8);
        assert!(pick.recommended_stake > dec!(0));
    }
}

#[test]
fn test_daily_cap_limits_admitted_picks() {
    // Five identical mispriced games. Each sizes to the 5% cap ($500), and
    // the 15% daily cap fits three of them.
    let batch = ScanBatch {
        events: (0..5)
            .map(|i| make_baseball_event(&format!("mlb-{i}"), 2.6, 1.5))
            .collect(),
        ..ScanBatch::default()
    };
    let report = run_scan(make_config(), &batch).unwrap();

    assert_eq!(report.summary.qualified_candidates, 5);
    assert_eq!(report.picks.len(), 3);
    assert_eq!(report.summary.total_staked, dec!(1500));
    assert!((report.summary.risk_percentage - 15.0).abs() < 1e-9);
    assert_eq!(report.summary.remaining_capacity.daily, dec!(0));

    // 15% sits at the top of the moderate band.
    assert_eq!(report.summary.risk_assessment, RiskAssessment::Moderate);
    let expected: Decimal = report.picks.iter().map(|p| p.ev_dollars).sum();
    assert!(expected > dec!(0));
    assert_eq!(report.summary.expected_profit, expected);
    let profit = expected.to_f64().unwrap();
    assert!((report.summary.roi_percent - profit / 1500.0 * 100.0).abs() < 1e-6);
    assert!((report.summary.break_even_probability - 1500.0 / (1500.0 + profit)).abs() < 1e-6);
    assert!(report.summary.break_even_probability < 1.0);

    // Confidence ties, so admission follows EV.
    assert!(report.picks.iter().all(|p| p.confidence == report.picks[0].confidence));
    assert!(report
        .picks
        .windows(2)
        .all(|w| w[0].ev_percent >= w[1].ev_percent));
    let rejected: Vec<_> = report
        .decisions
        .iter()
        .filter_map(|d| match d {
            DecisionRecord::RiskRejected { event_id, reason } => Some((event_id, reason)),
            _ => None,
        })
        .collect();
    assert_eq!(rejected.len(), 2);
    assert!(rejected
        .iter()
        .all(|(_, r)| matches!(r, RejectionReason::DailyCapExceeded { .. })));
}

#[test]
fn test_same_seed_same_report() {
    let batch = ScanBatch {
        events: vec![
            make_baseball_event("mlb-a", 2.2, 1.7),
            make_baseball_event("mlb-b", 2.6, 1.5),
        ],
        ..ScanBatch::default()
    };
    let first = run_scan(make_config(), &batch).unwrap();
    let second = run_scan(make_config(), &batch).unwrap();

    assert_eq!(first.candidates.len(), second.candidates.len());
    for (a, b) in first.candidates.iter().zip(&second.candidates) {
        assert_eq!(a.event_id, b.event_id);
        assert_eq!(a.outcome, b.outcome);
        assert_eq!(a.edge.model_probability, b.edge.model_probability);
        assert_eq!(a.confidence.score, b.confidence.score);
        assert_eq!(a.ev.recommended_stake, b.ev.recommended_stake);
    }
    assert!(!first.picks.is_empty());
    assert_eq!(first.picks.len(), second.picks.len());
    for (a, b) in first.picks.iter().zip(&second.picks) {
        assert_eq!(a.event_id, b.event_id);
        assert_eq!(a.market, b.market);
        assert_eq!(a.outcome, b.outcome);
        assert_eq!(a.decimal_odds, b.decimal_odds);
        assert_eq!(a.ev_percent, b.ev_percent);
        assert_eq!(a.confidence, b.confidence);
        assert_eq!(a.recommended_stake, b.recommended_stake);
        assert_eq!(a.rationale, b.rationale);
    }
    assert_eq!(first.summary.total_staked, second.summary.total_staked);
    assert_eq!(first.summary.expected_profit, second.summary.expected_profit);
    assert_eq!(first.summary.run_seed, 42);
}

#[test]
fn test_bad_events_are_skipped_not_fatal() {
    let mut draw_in_baseball = make_baseball_event("mlb-draw", 2.6, 1.5);
    draw_in_baseball.markets[0] = make_moneyline(&[
        (Outcome::Home, Odds::Decimal(2.6)),
        (Outcome::Draw, Odds::Decimal(9.0)),
    ]);
    let mut mismatched = make_baseball_event("mlb-soccer-stats", 2.6, 1.5);
    mismatched.stats = Some(MatchupStats::Soccer(SoccerMatchup::default()));
    let mut unpriced = make_baseball_event("mlb-empty", 2.6, 1.5);
    unpriced.markets[0].prices.clear();

    let batch = ScanBatch {
        events: vec![
            draw_in_baseball,
            make_baseball_event("mlb-good", 2.6, 1.5),
            mismatched,
            unpriced,
        ],
        ..ScanBatch::default()
    };
    let report = run_scan(make_config(), &batch).unwrap();

    assert_eq!(report.summary.total_candidates, 1);
    assert_eq!(report.summary.skipped_events, 3);
    assert_eq!(report.candidates[0].event_id, "mlb-good");
    let errors: Vec<_> = report
        .decisions
        .iter()
        .filter_map(|d| match d {
            DecisionRecord::Skipped { error, .. } => Some(error.clone()),
            _ => None,
        })
        .collect();
    assert!(matches!(errors[0], InputDataError::InvalidOutcome { outcome: Outcome::Draw, .. }));
    assert_eq!(
        errors[1],
        InputDataError::StatsSportMismatch {
            event: Sport::Baseball,
            stats: Sport::Soccer
        }
    );
    assert!(matches!(errors[2], InputDataError::EmptyMarket { .. }));
}

#[test]
fn test_invalid_config_aborts_scan() {
    let mut config = make_config();
    config.scan.bankroll = dec!(0);
    let err = run_scan(config, &ScanBatch::default()).unwrap_err();
    assert!(err.to_string().contains("scan.bankroll"));
}

#[test]
fn test_time_budget_reports_partial_results() {
    let batch = ScanBatch {
        events: vec![make_baseball_event("mlb-a", 2.6, 1.5)],
        ..ScanBatch::default()
    };
    let scanner = Scanner::new(make_config()).unwrap();
    let started = Instant::now();
    let report = scanner.scan_until(&batch, started, Some(started));

    assert!(report.summary.timed_out);
    assert_eq!(report.summary.unprocessed_events, 1);
    assert!(matches!(
        report.decisions[0],
        DecisionRecord::Unprocessed { ref event_id } if event_id == "mlb-a"
    ));
}

#[test]
fn test_soccer_three_way_market() {
    let mut event = make_baseball_event("epl-a", 2.0, 2.0);
    event.sport = Sport::Soccer;
    event.stats = Some(MatchupStats::Soccer(SoccerMatchup {
        home: SoccerTeamStats {
            xg_for: Some(1.8),
            xg_against: Some(1.0),
        },
        away: SoccerTeamStats {
            xg_for: Some(1.2),
            xg_against: Some(1.4),
        },
        home_advantage: None,
    }));
    event.markets = vec![make_moneyline(&[
        (Outcome::Home, Odds::Decimal(2.1)),
        (Outcome::Draw, Odds::Decimal(3.4)),
        (Outcome::Away, Odds::Decimal(3.6)),
    ])];

    let report = run_scan(
        make_config(),
        &ScanBatch {
            events: vec![event],
            ..ScanBatch::default()
        },
    )
    .unwrap();
    let candidate = &report.candidates[0];
    let estimate = &candidate.estimates[0];
    assert_eq!(estimate.outcomes.len(), 3);
    assert!((estimate.total() - 1.0).abs() < 1e-6);
    assert!(estimate.probability_of(Outcome::Draw).unwrap() > 0.15);
}

#[test]
fn test_trained_prediction_takes_precedence() {
    let batch = ScanBatch {
        events: vec![make_baseball_event("mlb-a", 2.0, 2.0)],
        predictions: vec![ScorePrediction {
            event_id: "mlb-a".to_string(),
            home_score: 3.0,
            away_score: 6.0,
            margin_std: None,
            model: Some("poisson-glm".to_string()),
        }],
        ..ScanBatch::default()
    };
    let report = run_scan(make_config(), &batch).unwrap();
    let candidate = &report.candidates[0];
    assert_eq!(candidate.model, "poisson-glm");
    // The prediction flips the favourite to the away side.
    assert_eq!(candidate.outcome, Outcome::Away);
    assert!(candidate.data_quality.is_empty());
}
