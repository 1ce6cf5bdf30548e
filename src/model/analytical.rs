//! Sport-specific analytical rate models.

use super::{Imputer, ModelCapability, ModelConfig, ModelFit, ProbabilityModel};
use crate::model::distribution::{ScoreDistribution, TieRule};
use crate::types::{
    BaseballMatchup, BasketballMatchup, Event, MatchupStats, Outcome, SoccerMatchup, Sport,
};

// League averages used when a stat is missing or unusable.
pub const LEAGUE_RUNS_PER_GAME: f64 = 4.5;
pub const LEAGUE_ERA: f64 = 4.0;
pub const NEUTRAL_PARK: f64 = 1.0;
pub const DEFAULT_REST_DAYS: f64 = 1.0;
pub const RESTED_BOOST: f64 = 1.05;

pub const LEAGUE_RATING: f64 = 114.0;
pub const LEAGUE_PACE: f64 = 99.0;
pub const HOME_COURT_POINTS: f64 = 2.5;
pub const MARGIN_STD: f64 = 12.0;
pub const TOTAL_STD: f64 = 18.0;

pub const LEAGUE_XG: f64 = 1.35;
pub const SOCCER_HOME_ADVANTAGE: f64 = 1.10;

pub struct AnalyticalModel {
    config: ModelConfig,
}

impl AnalyticalModel {
    pub fn new(config: ModelConfig) -> Self {
        Self { config }
    }

    fn baseball(&self, stats: &BaseballMatchup, imp: &mut Imputer) -> ScoreDistribution {
        let home = Some(Outcome::Home);
        let away = Some(Outcome::Away);

        let home_rpg = imp.rate(stats.home.runs_per_game, "runs_per_game", home, LEAGUE_RUNS_PER_GAME);
        let away_rpg = imp.rate(stats.away.runs_per_game, "runs_per_game", away, LEAGUE_RUNS_PER_GAME);
        let home_era = imp.rate(stats.home.starter_era, "starter_era", home, LEAGUE_ERA);
        let away_era = imp.rate(stats.away.starter_era, "starter_era", away, LEAGUE_ERA);
        let park = imp.rate(stats.park_factor, "park_factor", None, NEUTRAL_PARK);
        let home_rest = imp.value(stats.home.rest_days.map(f64::from), "rest_days", home, DEFAULT_REST_DAYS);
        let away_rest = imp.value(stats.away.rest_days.map(f64::from), "rest_days", away, DEFAULT_REST_DAYS);

        let rest = |days: f64| if days >= 2.0 { RESTED_BOOST } else { 1.0 };

        ScoreDistribution::DoublePoisson {
            home_rate: home_rpg * (away_era / LEAGUE_ERA) * park * rest(home_rest),
            away_rate: away_rpg * (home_era / LEAGUE_ERA) * rest(away_rest),
            max_score: self.config.baseball_max_runs,
            tie_rule: TieRule::ExtraInnings {
                home_share: self.config.extra_innings_home_share,
            },
        }
    }

    fn basketball(&self, stats: &BasketballMatchup, imp: &mut Imputer) -> ScoreDistribution {
        let home = Some(Outcome::Home);
        let away = Some(Outcome::Away);

        let home_ortg = imp.rate(stats.home.offensive_rating, "offensive_rating", home, LEAGUE_RATING);
        let home_drtg = imp.rate(stats.home.defensive_rating, "defensive_rating", home, LEAGUE_RATING);
        let away_ortg = imp.rate(stats.away.offensive_rating, "offensive_rating", away, LEAGUE_RATING);
        let away_drtg = imp.rate(stats.away.defensive_rating, "defensive_rating", away, LEAGUE_RATING);
        let home_pace = imp.rate(stats.home.pace, "pace", home, LEAGUE_PACE);
        let away_pace = imp.rate(stats.away.pace, "pace", away, LEAGUE_PACE);
        let home_court = imp.value(stats.home_court_points, "home_court_points", None, HOME_COURT_POINTS);
        let margin_std = imp.rate(stats.margin_std, "margin_std", None, MARGIN_STD);
        let total_std = imp.rate(stats.total_std, "total_std", None, TOTAL_STD);

        let possessions = (home_pace + away_pace) / 2.0;
        let home_points = possessions * (home_ortg + away_drtg) / 200.0;
        let away_points = possessions * (away_ortg + home_drtg) / 200.0;

        ScoreDistribution::Normal {
            margin_mean: home_points - away_points + home_court,
            margin_std,
            total_mean: home_points + away_points,
            total_std,
        }
    }

    fn soccer(&self, stats: &SoccerMatchup, imp: &mut Imputer) -> ScoreDistribution {
        let home = Some(Outcome::Home);
        let away = Some(Outcome::Away);

        let home_for = imp.rate(stats.home.xg_for, "xg_for", home, LEAGUE_XG);
        let home_against = imp.rate(stats.home.xg_against, "xg_against", home, LEAGUE_XG);
        let away_for = imp.rate(stats.away.xg_for, "xg_for", away, LEAGUE_XG);
        let away_against = imp.rate(stats.away.xg_against, "xg_against", away, LEAGUE_XG);
        let advantage = imp.rate(stats.home_advantage, "home_advantage", None, SOCCER_HOME_ADVANTAGE);

        ScoreDistribution::DoublePoisson {
            home_rate: home_for * away_against / LEAGUE_XG * advantage,
            away_rate: away_for * home_against / LEAGUE_XG / advantage,
            max_score: self.config.soccer_max_goals,
            tie_rule: TieRule::Draw,
        }
    }
}

impl ProbabilityModel for AnalyticalModel {
    fn name(&self) -> &str {
        "analytical"
    }

    fn capability(&self) -> ModelCapability {
        ModelCapability::Analytical
    }

    fn supports(&self, _event: &Event) -> bool {
        true
    }

    fn fit(&self, event: &Event) -> ModelFit {
        let mut imputer = Imputer::default();
        let distribution = match (event.sport, &event.stats) {
            (Sport::Baseball, Some(MatchupStats::Baseball(s))) => self.baseball(s, &mut imputer),
            (Sport::Baseball, _) => self.baseball(&BaseballMatchup::default(), &mut imputer),
            (Sport::Basketball, Some(MatchupStats::Basketball(s))) => {
                self.basketball(s, &mut imputer)
            }
            (Sport::Basketball, _) => {
                self.basketball(&BasketballMatchup::default(), &mut imputer)
            }
            (Sport::Soccer, Some(MatchupStats::Soccer(s))) => self.soccer(s, &mut imputer),
            (Sport::Soccer, _) => self.soccer(&SoccerMatchup::default(), &mut imputer),
        };

        ModelFit {
            model: self.name().to_string(),
            distribution,
            data_quality: imputer.flags,
        }
    }
}
