//! Shared builders for integration tests.

use chrono::{Duration, Utc};
use sharpline::config::EngineConfig;
use sharpline::types::{
    BaseballMatchup, BaseballTeamStats, Event, MarketKind, MarketQuote, MatchupStats, Odds,
    Outcome, OutcomePrice, Sport,
};

pub fn make_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.scan.monte_carlo_iterations = 2_000;
    config
}

pub fn make_moneyline(prices: &[(Outcome, Odds)]) -> MarketQuote {
    MarketQuote {
        kind: MarketKind::Moneyline,
        book: None,
        prices: prices
            .iter()
            .map(|(outcome, odds)| OutcomePrice {
                outcome: *outcome,
                odds: *odds,
            })
            .collect(),
    }
}

/// Boston (home) is the clearly stronger side on these stats.
pub fn make_baseball_event(id: &str, home: f64, away: f64) -> Event {
    Event {
        id: id.to_string(),
        sport: Sport::Baseball,
        home: "Boston".to_string(),
        away: "New York".to_string(),
        start_time: Utc::now() + Duration::hours(6),
        markets: vec![make_moneyline(&[
            (Outcome::Home, Odds::Decimal(home)),
            (Outcome::Away, Odds::Decimal(away)),
        ])],
        stats: Some(MatchupStats::Baseball(BaseballMatchup {
            home: BaseballTeamStats {
                runs_per_game: Some(4.8),
                starter_era: Some(3.6),
                rest_days: Some(1),
            },
            away: BaseballTeamStats {
                runs_per_game: Some(4.4),
                starter_era: Some(4.3),
                rest_days: Some(1),
            },
            park_factor: Some(1.02),
        })),
        risk_factors: Vec::new(),
    }
}
