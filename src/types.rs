//! Shared types for the SHARPLINE engine.
//!
//! These types form the data model used across all modules: the scan
//! input (events, quotes, line history, public splits), the intermediate
//! per-event products (estimates, edges, sharp flags, confidence, EV), and
//! the scan output (official picks and summary).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Sport tag. Selects the probability model shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sport {
    Baseball,
    Basketball,
    Soccer,
}

impl Sport {
    /// All supported sports (useful for iteration).
    pub const ALL: &'static [Sport] = &[Sport::Baseball, Sport::Basketball, Sport::Soccer];

    /// Whether a regulation draw is a priced outcome.
    pub fn allows_draw(&self) -> bool {
        matches!(self, Sport::Soccer)
    }
}

impl fmt::Display for Sport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sport::Baseball => write!(f, "Baseball"),
            Sport::Basketball => write!(f, "Basketball"),
            Sport::Soccer => write!(f, "Soccer"),
        }
    }
}

/// Attempt to parse a string into a Sport (case-insensitive, league aliases).
impl std::str::FromStr for Sport {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "baseball" | "mlb" => Ok(Sport::Baseball),
            "basketball" | "nba" | "ncaab" => Ok(Sport::Basketball),
            "soccer" | "football" | "epl" | "mls" => Ok(Sport::Soccer),
            _ => Err(anyhow::anyhow!("Unknown sport: {s}")),
        }
    }
}

/// A priced result of one market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Home,
    Away,
    Draw,
    Over,
    Under,
}

impl Outcome {
    /// The opposing side in a two-way market. Draw has none.
    pub fn opposite(&self) -> Option<Self> {
        match self {
            Outcome::Home => Some(Outcome::Away),
            Outcome::Away => Some(Outcome::Home),
            Outcome::Over => Some(Outcome::Under),
            Outcome::Under => Some(Outcome::Over),
            Outcome::Draw => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Home => write!(f, "HOME"),
            Outcome::Away => write!(f, "AWAY"),
            Outcome::Draw => write!(f, "DRAW"),
            Outcome::Over => write!(f, "OVER"),
            Outcome::Under => write!(f, "UNDER"),
        }
    }
}

/// Market type. Lines are quoted from the home side for spreads.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MarketKind {
    Moneyline,
    Spread { home_line: f64 },
    Total { line: f64 },
}

impl MarketKind {
    /// Outcomes that may be quoted in this market for a given sport.
    pub fn outcomes(&self, sport: Sport) -> &'static [Outcome] {
        match self {
            MarketKind::Moneyline if sport.allows_draw() => {
                &[Outcome::Home, Outcome::Draw, Outcome::Away]
            }
            MarketKind::Moneyline | MarketKind::Spread { .. } => &[Outcome::Home, Outcome::Away],
            MarketKind::Total { .. } => &[Outcome::Over, Outcome::Under],
        }
    }
}

impl fmt::Display for MarketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketKind::Moneyline => write!(f, "Moneyline"),
            MarketKind::Spread { home_line } => write!(f, "Spread (home {home_line:+})"),
            MarketKind::Total { line } => write!(f, "Total {line}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Odds
// ---------------------------------------------------------------------------

/// Quoted price, either decimal (`{"decimal": 1.91}`) or American
/// (`{"american": -110}`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Odds {
    Decimal(f64),
    American(i32),
}

impl Odds {
    /// Decimal odds, or `None` when the quote is degenerate (≤ 1.0,
    /// non-finite, or American inside (-100, 100)).
    pub fn decimal(&self) -> Option<f64> {
        match *self {
            Odds::Decimal(d) if d.is_finite() && d > 1.0 => Some(d),
            Odds::Decimal(_) => None,
            Odds::American(a) => american_to_decimal(a),
        }
    }

    /// American odds, or `None` when the quote is degenerate.
    pub fn american(&self) -> Option<i32> {
        match *self {
            Odds::American(a) if a >= 100 || a <= -100 => Some(a),
            Odds::American(_) => None,
            Odds::Decimal(d) => decimal_to_american(d),
        }
    }
}

impl fmt::Display for Odds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Odds::Decimal(d) => write!(f, "{d:.2}"),
            Odds::American(a) => write!(f, "{a:+}"),
        }
    }
}

/// Convert American odds to decimal odds.
pub fn american_to_decimal(american: i32) -> Option<f64> {
    if american >= 100 {
        Some(1.0 + american as f64 / 100.0)
    } else if american <= -100 {
        Some(1.0 + 100.0 / (american as f64).abs())
    } else {
        None
    }
}

/// Convert decimal odds to (rounded) American odds.
pub fn decimal_to_american(decimal: f64) -> Option<i32> {
    if !decimal.is_finite() || decimal <= 1.0 {
        return None;
    }
    if decimal >= 2.0 {
        Some(((decimal - 1.0) * 100.0).round() as i32)
    } else {
        Some((-100.0 / (decimal - 1.0)).round() as i32)
    }
}

// ---------------------------------------------------------------------------
// Event input
// ---------------------------------------------------------------------------

/// One quoted price for one outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomePrice {
    pub outcome: Outcome,
    pub odds: Odds,
}

/// A market quotation: every priced outcome of one market at one book.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketQuote {
    pub kind: MarketKind,
    #[serde(default)]
    pub book: Option<String>,
    pub prices: Vec<OutcomePrice>,
}

impl MarketQuote {
    /// Price for an outcome, if quoted.
    pub fn price(&self, outcome: Outcome) -> Option<&Odds> {
        self.prices
            .iter()
            .find(|p| p.outcome == outcome)
            .map(|p| &p.odds)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BaseballTeamStats {
    pub runs_per_game: Option<f64>,
    pub starter_era: Option<f64>,
    pub rest_days: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BaseballMatchup {
    #[serde(default)]
    pub home: BaseballTeamStats,
    #[serde(default)]
    pub away: BaseballTeamStats,
    #[serde(default)]
    pub park_factor: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BasketballTeamStats {
    pub offensive_rating: Option<f64>,
    pub defensive_rating: Option<f64>,
    pub pace: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BasketballMatchup {
    #[serde(default)]
    pub home: BasketballTeamStats,
    #[serde(default)]
    pub away: BasketballTeamStats,
    #[serde(default)]
    pub home_court_points: Option<f64>,
    #[serde(default)]
    pub margin_std: Option<f64>,
    #[serde(default)]
    pub total_std: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SoccerTeamStats {
    pub xg_for: Option<f64>,
    pub xg_against: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SoccerMatchup {
    #[serde(default)]
    pub home: SoccerTeamStats,
    #[serde(default)]
    pub away: SoccerTeamStats,
    #[serde(default)]
    pub home_advantage: Option<f64>,
}

/// Sport-specific rate statistics for both participants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "sport", rename_all = "lowercase")]
pub enum MatchupStats {
    Baseball(BaseballMatchup),
    Basketball(BasketballMatchup),
    Soccer(SoccerMatchup),
}

impl MatchupStats {
    pub fn sport(&self) -> Sport {
        match self {
            MatchupStats::Baseball(_) => Sport::Baseball,
            MatchupStats::Basketball(_) => Sport::Basketball,
            MatchupStats::Soccer(_) => Sport::Soccer,
        }
    }
}

/// Caller-supplied volatility factor that lowers confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFactorKind {
    Weather,
    Injury,
    Lineup,
    Variance,
    ThinMarket,
}

impl RiskFactorKind {
    /// Confidence points removed by this factor.
    pub fn penalty(&self) -> f64 {
        match self {
            RiskFactorKind::Weather => 0.5,
            RiskFactorKind::Injury => 0.7,
            RiskFactorKind::Lineup => 0.4,
            RiskFactorKind::Variance => 0.3,
            RiskFactorKind::ThinMarket => 0.6,
        }
    }
}

impl fmt::Display for RiskFactorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskFactorKind::Weather => write!(f, "weather"),
            RiskFactorKind::Injury => write!(f, "injury"),
            RiskFactorKind::Lineup => write!(f, "lineup"),
            RiskFactorKind::Variance => write!(f, "variance"),
            RiskFactorKind::ThinMarket => write!(f, "thin market"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskFactor {
    pub kind: RiskFactorKind,
    #[serde(default)]
    pub description: String,
}

/// A scheduled game with its market quotations. Immutable once ingested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub sport: Sport,
    pub home: String,
    pub away: String,
    pub start_time: DateTime<Utc>,
    pub markets: Vec<MarketQuote>,
    #[serde(default)]
    pub stats: Option<MatchupStats>,
    #[serde(default)]
    pub risk_factors: Vec<RiskFactor>,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({}, {} markets)",
            self.id,
            self.matchup(),
            self.sport,
            self.markets.len(),
        )
    }
}

impl Event {
    /// "Away @ Home" label.
    pub fn matchup(&self) -> String {
        format!("{} @ {}", self.away, self.home)
    }

    /// Helper to build a test/sample event with sensible defaults.
    #[cfg(test)]
    pub fn sample() -> Self {
        Event {
            id: "mlb-nyy-bos".to_string(),
            sport: Sport::Baseball,
            home: "Boston".to_string(),
            away: "New York".to_string(),
            start_time: Utc::now() + chrono::Duration::hours(6),
            markets: vec![MarketQuote {
                kind: MarketKind::Moneyline,
                book: Some("pinnacle".to_string()),
                prices: vec![
                    OutcomePrice { outcome: Outcome::Home, odds: Odds::American(-110) },
                    OutcomePrice { outcome: Outcome::Away, odds: Odds::American(-110) },
                ],
            }],
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
}

// ---------------------------------------------------------------------------
// Market history input
// ---------------------------------------------------------------------------

/// Unit of a tracked line value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineUnit {
    American,
    Decimal,
    Points,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineTick {
    pub timestamp: DateTime<Utc>,
    pub book: String,
    pub value: f64,
}

/// History of one outcome's line across books, ordered by time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineMovement {
    pub event_id: String,
    pub outcome: Outcome,
    pub unit: LineUnit,
    pub ticks: Vec<LineTick>,
}

/// Share of tickets and handle on one side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicBettingSplit {
    pub event_id: String,
    pub outcome: Outcome,
    pub bet_pct: f64,
    pub money_pct: f64,
}

impl PublicBettingSplit {
    /// Money percentage minus bet percentage.
    pub fn split_gap(&self) -> f64 {
        self.money_pct - self.bet_pct
    }
}

/// Expected scores produced by an externally trained model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScorePrediction {
    pub event_id: String,
    pub home_score: f64,
    pub away_score: f64,
    #[serde(default)]
    pub margin_std: Option<f64>,
    #[serde(default)]
    pub model: Option<String>,
}

/// Everything the engine needs for one scan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanBatch {
    pub events: Vec<Event>,
    #[serde(default)]
    pub line_movements: Vec<LineMovement>,
    #[serde(default)]
    pub public_splits: Vec<PublicBettingSplit>,
    #[serde(default)]
    pub predictions: Vec<ScorePrediction>,
}

// ---------------------------------------------------------------------------
// Probability estimates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimateSource {
    Analytical,
    Simulated,
    Ensemble,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeProbability {
    pub outcome: Outcome,
    pub probability: f64,
    pub variance: f64,
}

/// Probability of every outcome of one market. Outcomes sum to 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbabilityEstimate {
    pub market: MarketKind,
    pub source: EstimateSource,
    pub outcomes: Vec<OutcomeProbability>,
}

impl ProbabilityEstimate {
    pub fn probability_of(&self, outcome: Outcome) -> Option<f64> {
        self.outcomes
            .iter()
            .find(|o| o.outcome == outcome)
            .map(|o| o.probability)
    }

    pub fn total(&self) -> f64 {
        self.outcomes.iter().map(|o| o.probability).sum()
    }

    /// Rescale so the outcome set sums to 1 (no-op on an empty/zero set).
    pub fn normalize(&mut self) {
        let total = self.total();
        if total > 0.0 && total.is_finite() {
            for o in &mut self.outcomes {
                o.probability /= total;
            }
        }
    }
}

/// Why a stat input was replaced by its league average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImputationReason {
    Missing,
    NonPositive,
}

/// Marks a league-average substitution on the candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataQualityFlag {
    pub field: String,
    pub side: Option<Outcome>,
    pub substituted: f64,
    pub reason: ImputationReason,
}

impl fmt::Display for DataQualityFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self.reason {
            ImputationReason::Missing => "missing",
            ImputationReason::NonPositive => "non-positive",
        };
        match self.side {
            Some(side) => write!(
                f,
                "{side} {} {reason}, league average {:.2} used",
                self.field, self.substituted
            ),
            None => write!(
                f,
                "{} {reason}, league average {:.2} used",
                self.field, self.substituted
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Sharp indicators
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SharpKind {
    #[serde(rename = "RLM")]
    Rlm,
    Steam,
    SharpMoney,
    Consensus,
}

impl fmt::Display for SharpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SharpKind::Rlm => write!(f, "RLM"),
            SharpKind::Steam => write!(f, "Steam"),
            SharpKind::SharpMoney => write!(f, "SharpMoney"),
            SharpKind::Consensus => write!(f, "Consensus"),
        }
    }
}

/// A detected sign of professional action on one side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharpIndicator {
    pub kind: SharpKind,
    /// 1 (weak) to 3 (strong).
    pub strength: u8,
    pub side: Outcome,
    pub description: String,
}

impl fmt::Display for SharpIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} on {} (strength {}): {}",
            self.kind, self.side, self.strength, self.description
        )
    }
}

// ---------------------------------------------------------------------------
// Edge, confidence, EV
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ValueTier {
    Excellent,
    Good,
    Fair,
    Marginal,
    None,
}

impl fmt::Display for ValueTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueTier::Excellent => write!(f, "Excellent"),
            ValueTier::Good => write!(f, "Good"),
            ValueTier::Fair => write!(f, "Fair"),
            ValueTier::Marginal => write!(f, "Marginal"),
            ValueTier::None => write!(f, "None"),
        }
    }
}

/// Model fair value against the no-vig market price for one outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeResult {
    pub outcome: Outcome,
    pub model_probability: f64,
    /// No-vig implied probability.
    pub implied_probability: f64,
    pub market_decimal_odds: f64,
    pub market_american_odds: Option<i32>,
    pub fair_decimal_odds: Option<f64>,
    pub fair_american_odds: Option<i32>,
    /// Signed: positive means the model rates the outcome above the market.
    pub edge_percent: f64,
    pub tier: ValueTier,
}

impl fmt::Display for EdgeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} model={:.1}% market={:.1}% edge={:+.2}% ({})",
            self.outcome,
            self.model_probability * 100.0,
            self.implied_probability * 100.0,
            self.edge_percent,
            self.tier,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceTier {
    Exceptional,
    High,
    Good,
    Fair,
    Average,
    BelowAverage,
    Low,
    VeryLow,
    Minimal,
}

impl ConfidenceTier {
    pub fn from_score(score: u8) -> Self {
        match score {
            9.. => ConfidenceTier::Exceptional,
            8 => ConfidenceTier::High,
            7 => ConfidenceTier::Good,
            6 => ConfidenceTier::Fair,
            5 => ConfidenceTier::Average,
            4 => ConfidenceTier::BelowAverage,
            3 => ConfidenceTier::Low,
            2 => ConfidenceTier::VeryLow,
            _ => ConfidenceTier::Minimal,
        }
    }
}

impl fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfidenceTier::Exceptional => write!(f, "Exceptional"),
            ConfidenceTier::High => write!(f, "High"),
            ConfidenceTier::Good => write!(f, "Good"),
            ConfidenceTier::Fair => write!(f, "Fair"),
            ConfidenceTier::Average => write!(f, "Average"),
            ConfidenceTier::BelowAverage => write!(f, "Below Average"),
            ConfidenceTier::Low => write!(f, "Low"),
            ConfidenceTier::VeryLow => write!(f, "Very Low"),
            ConfidenceTier::Minimal => write!(f, "Minimal"),
        }
    }
}

/// Point-by-point confidence derivation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceBreakdown {
    pub base: f64,
    pub sharp_bonus: f64,
    pub edge_tier_bonus: f64,
    pub model_stability_bonus: f64,
    pub market_stability_bonus: f64,
    /// Zero or negative.
    pub risk_penalty: f64,
    pub raw_score: f64,
    /// Final score in 1..=10.
    pub score: u8,
    pub tier: ConfidenceTier,
    /// Ordered human-readable list of contributing components.
    pub explanation: Vec<String>,
}

impl fmt::Display for ConfidenceBreakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Confidence {}/10 ({}): {}",
            self.score,
            self.tier,
            self.explanation.join(", ")
        )
    }
}

/// Expected value and sizing for one outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvResult {
    pub ev_percent: f64,
    pub ev_dollars: Decimal,
    /// Raw (full) Kelly fraction, zero when non-positive.
    pub kelly_fraction: f64,
    /// Fraction of bankroll actually staked after multiplier, boost, cap.
    pub stake_fraction: f64,
    pub recommended_stake: Decimal,
}

impl fmt::Display for EvResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ev={:+.2}% (${:.2}) kelly={:.2}% stake={:.2}% (${:.2})",
            self.ev_percent,
            self.ev_dollars,
            self.kelly_fraction * 100.0,
            self.stake_fraction * 100.0,
            self.recommended_stake,
        )
    }
}

// ---------------------------------------------------------------------------
// Candidate & output
// ---------------------------------------------------------------------------

/// Why a candidate did not qualify.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Disqualification {
    NonPositiveKelly,
    EvBelowThreshold { ev_percent: f64, threshold: f64 },
    ConfidenceBelowThreshold { score: u8, threshold: u8 },
    StakeBelowUnit,
}

impl fmt::Display for Disqualification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Disqualification::NonPositiveKelly => write!(f, "non-positive Kelly fraction"),
            Disqualification::EvBelowThreshold { ev_percent, threshold } => {
                write!(f, "EV {ev_percent:.2}% below {threshold:.2}%")
            }
            Disqualification::ConfidenceBelowThreshold { score, threshold } => {
                write!(f, "confidence {score} below {threshold}")
            }
            Disqualification::StakeBelowUnit => write!(f, "stake rounds to zero"),
        }
    }
}

/// One event's best outcome with everything the engine derived for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub event_id: String,
    pub sport: Sport,
    pub matchup: String,
    /// Name of the probability model that priced the event.
    pub model: String,
    pub market: MarketKind,
    pub outcome: Outcome,
    pub odds: Odds,
    /// Blended estimate for every quoted market.
    pub estimates: Vec<ProbabilityEstimate>,
    /// |simulated - analytical| for the chosen outcome; None without a simulation.
    pub model_divergence: Option<f64>,
    pub edge: EdgeResult,
    pub sharp_indicators: Vec<SharpIndicator>,
    pub confidence: ConfidenceBreakdown,
    pub ev: EvResult,
    pub data_quality: Vec<DataQualityFlag>,
    pub disqualifications: Vec<Disqualification>,
}

impl Candidate {
    pub fn is_qualified(&self) -> bool {
        self.disqualifications.is_empty()
    }

    /// Sharp indicator types backing the chosen side.
    pub fn sharp_flags(&self) -> BTreeSet<String> {
        self.sharp_indicators
            .iter()
            .filter(|i| i.side == self.outcome)
            .map(|i| i.kind.to_string())
            .collect()
    }

    /// One-line reasoning summary for the pick.
    pub fn rationale(&self) -> String {
        let mut parts = vec![format!(
            "{} {:.1}% edge",
            self.edge.tier, self.edge.edge_percent
        )];
        let flags = self.sharp_flags();
        if !flags.is_empty() {
            parts.push(format!(
                "Sharp signals: {}",
                flags.into_iter().collect::<Vec<_>>().join(", ")
            ));
        }
        if self.confidence.score >= 8 {
            parts.push("High confidence setup".to_string());
        }
        parts.push(format!(
            "Model {:.0}% vs Market {:.0}%",
            self.edge.model_probability * 100.0,
            self.edge.implied_probability * 100.0
        ));
        if !self.data_quality.is_empty() {
            parts.push(format!("{} imputed inputs", self.data_quality.len()));
        }
        parts.join(" | ")
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {} {} @ {} | edge={:+.1}% ev={:+.1}% conf={} stake=${:.2}",
            self.event_id,
            self.matchup,
            self.market,
            self.outcome,
            self.odds,
            self.edge.edge_percent,
            self.ev.ev_percent,
            self.confidence.score,
            self.ev.recommended_stake,
        )
    }
}

/// Final recommendation handed to the web/CLI layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfficialPick {
    pub event_id: String,
    pub sport: Sport,
    pub matchup: String,
    pub market: MarketKind,
    pub outcome: Outcome,
    pub decimal_odds: f64,
    pub american_odds: Option<i32>,
    pub edge_percent: f64,
    pub ev_percent: f64,
    pub ev_dollars: Decimal,
    pub confidence: u8,
    pub confidence_tier: ConfidenceTier,
    pub recommended_stake: Decimal,
    pub sharp_flags: BTreeSet<String>,
    pub data_quality: Vec<String>,
    pub rationale: String,
}

impl From<&Candidate> for OfficialPick {
    fn from(c: &Candidate) -> Self {
        OfficialPick {
            event_id: c.event_id.clone(),
            sport: c.sport,
            matchup: c.matchup.clone(),
            market: c.market,
            outcome: c.outcome,
            decimal_odds: c.edge.market_decimal_odds,
            american_odds: c.edge.market_american_odds,
            edge_percent: c.edge.edge_percent,
            ev_percent: c.ev.ev_percent,
            ev_dollars: c.ev.ev_dollars,
            confidence: c.confidence.score,
            confidence_tier: c.confidence.tier,
            recommended_stake: c.ev.recommended_stake,
            sharp_flags: c.sharp_flags(),
            data_quality: c.data_quality.iter().map(|d| d.to_string()).collect(),
            rationale: c.rationale(),
        }
    }
}

impl fmt::Display for OfficialPick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} @ {:.2} | edge={:+.1}% ev={:+.1}% | conf={}/10 | ${:.2}",
            self.matchup,
            self.market,
            self.outcome,
            self.decimal_odds,
            self.edge_percent,
            self.ev_percent,
            self.confidence,
            self.recommended_stake,
        )
    }
}

/// Portfolio risk level from the share of bankroll staked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskAssessment {
    Conservative,
    Moderate,
    High,
}

impl RiskAssessment {
    /// Up to 8% is conservative, up to 15% moderate.
    pub fn from_risk_percentage(pct: f64) -> Self {
        if pct > 15.0 {
            RiskAssessment::High
        } else if pct > 8.0 {
            RiskAssessment::Moderate
        } else {
            RiskAssessment::Conservative
        }
    }
}

impl fmt::Display for RiskAssessment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskAssessment::Conservative => write!(f, "Conservative"),
            RiskAssessment::Moderate => write!(f, "Moderate"),
            RiskAssessment::High => write!(f, "High"),
        }
    }
}

/// Unused stake capacity after allocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemainingCapacity {
    pub daily: Decimal,
    pub per_sport: BTreeMap<Sport, Decimal>,
}

/// Aggregate figures for one scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSummary {
    pub total_candidates: usize,
    pub qualified_candidates: usize,
    pub skipped_events: usize,
    /// Events never started because the time budget ran out.
    pub unprocessed_events: usize,
    pub timed_out: bool,
    pub picks: usize,
    pub bankroll: Decimal,
    pub total_staked: Decimal,
    /// total_staked as a percentage of bankroll.
    pub risk_percentage: f64,
    pub risk_assessment: RiskAssessment,
    /// Sum of the picks' expected dollar value.
    pub expected_profit: Decimal,
    /// expected_profit over total_staked, in percent. 0 when nothing is staked.
    pub roi_percent: f64,
    /// Win rate at which the slate only breaks even: staked / (staked + profit).
    /// 1.0 when there is no expected profit.
    pub break_even_probability: f64,
    pub remaining_capacity: RemainingCapacity,
    pub avg_edge_percent: f64,
    pub avg_confidence: f64,
    pub sharp_flag_distribution: BTreeMap<String, usize>,
    pub execution_time_ms: u64,
    pub run_seed: u64,
}

impl fmt::Display for ScanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "candidates={} qualified={} skipped={} picks={} staked=${:.2} ({:.1}% of bankroll, {}) ev=${:.2} roi={:.1}% in {}ms{}",
            self.total_candidates,
            self.qualified_candidates,
            self.skipped_events,
            self.picks,
            self.total_staked,
            self.risk_percentage,
            self.risk_assessment,
            self.expected_profit,
            self.roi_percent,
            self.execution_time_ms,
            if self.timed_out { " [partial: time budget exhausted]" } else { "" },
        )
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Fatal engine errors. Only configuration problems abort a scan.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Malformed input for a single event. The event is skipped.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "error", rename_all = "snake_case")]
pub enum InputDataError {
    #[error("event id is empty")]
    EmptyId,

    #[error("duplicate event id")]
    DuplicateEventId,

    #[error("event has no market quotations")]
    NoMarkets,

    #[error("{market} market has no prices")]
    EmptyMarket { market: String },

    #[error("{outcome} is not a valid outcome for a {sport} {market} market")]
    InvalidOutcome {
        sport: Sport,
        market: String,
        outcome: Outcome,
    },

    #[error("{outcome} is priced twice in the {market} market")]
    DuplicateOutcome { market: String, outcome: Outcome },

    #[error("stats are for {stats} but the event is {event}")]
    StatsSportMismatch { event: Sport, stats: Sport },

    #[error("no outcome carries usable odds")]
    NoUsableOdds,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sport_from_str_aliases() {
        assert_eq!("MLB".parse::<Sport>().unwrap(), Sport::Baseball);
        assert_eq!("nba".parse::<Sport>().unwrap(), Sport::Basketball);
        assert_eq!("epl".parse::<Sport>().unwrap(), Sport::Soccer);
        assert!("curling".parse::<Sport>().is_err());
    }

    #[test]
    fn test_outcome_opposite() {
        assert_eq!(Outcome::Home.opposite(), Some(Outcome::Away));
        assert_eq!(Outcome::Under.opposite(), Some(Outcome::Over));
        assert_eq!(Outcome::Draw.opposite(), None);
    }

    #[test]
    fn test_market_outcomes_by_sport() {
        assert_eq!(MarketKind::Moneyline.outcomes(Sport::Soccer).len(), 3);
        assert_eq!(MarketKind::Moneyline.outcomes(Sport::Baseball).len(), 2);
        assert_eq!(
            MarketKind::Total { line: 8.5 }.outcomes(Sport::Baseball),
            &[Outcome::Over, Outcome::Under]
        );
    }

    #[test]
    fn test_american_to_decimal() {
        assert!((american_to_decimal(-110).unwrap() - 1.909_090_9).abs() < 1e-6);
        assert!((american_to_decimal(150).unwrap() - 2.5).abs() < 1e-12);
        assert!(american_to_decimal(50).is_none());
        assert!(american_to_decimal(0).is_none());
    }

    #[test]
    fn test_decimal_to_american() {
        assert_eq!(decimal_to_american(2.5), Some(150));
        assert_eq!(decimal_to_american(1.5), Some(-200));
        assert_eq!(decimal_to_american(1.0), None);
        assert_eq!(decimal_to_american(f64::NAN), None);
    }

    #[test]
    fn test_odds_degenerate() {
        assert!(Odds::Decimal(1.0).decimal().is_none());
        assert!(Odds::Decimal(0.0).decimal().is_none());
        assert!(Odds::American(0).decimal().is_none());
        assert_eq!(Odds::Decimal(1.91).decimal(), Some(1.91));
    }

    #[test]
    fn test_odds_json_shape() {
        let dec: Odds = serde_json::from_str(r#"{"decimal": 1.91}"#).unwrap();
        assert_eq!(dec, Odds::Decimal(1.91));
        let us: Odds = serde_json::from_str(r#"{"american": -110}"#).unwrap();
        assert_eq!(us, Odds::American(-110));
    }

    #[test]
    fn test_market_kind_json_shape() {
        let kind: MarketKind =
            serde_json::from_str(r#"{"type": "spread", "home_line": -1.5}"#).unwrap();
        assert_eq!(kind, MarketKind::Spread { home_line: -1.5 });
        let ml: MarketKind = serde_json::from_str(r#"{"type": "moneyline"}"#).unwrap();
        assert_eq!(ml, MarketKind::Moneyline);
    }

    #[test]
    fn test_matchup_stats_tagged_by_sport() {
        let json = r#"{"sport": "soccer", "home": {"xg_for": 1.8}}"#;
        let stats: MatchupStats = serde_json::from_str(json).unwrap();
        assert_eq!(stats.sport(), Sport::Soccer);
        match stats {
            MatchupStats::Soccer(s) => {
                assert_eq!(s.home.xg_for, Some(1.8));
                assert!(s.away.xg_for.is_none());
            }
            _ => panic!("expected soccer stats"),
        }
    }

    #[test]
    fn test_estimate_normalize() {
        let mut est = ProbabilityEstimate {
            market: MarketKind::Moneyline,
            source: EstimateSource::Ensemble,
            outcomes: vec![
                OutcomeProbability { outcome: Outcome::Home, probability: 0.6, variance: 0.0 },
                OutcomeProbability { outcome: Outcome::Away, probability: 0.6, variance: 0.0 },
            ],
        };
        est.normalize();
        assert!((est.total() - 1.0).abs() < 1e-12);
        assert_eq!(est.probability_of(Outcome::Home), Some(0.5));
        assert_eq!(est.probability_of(Outcome::Draw), None);
    }

    #[test]
    fn test_confidence_tier_from_score() {
        assert_eq!(ConfidenceTier::from_score(10), ConfidenceTier::Exceptional);
        assert_eq!(ConfidenceTier::from_score(8), ConfidenceTier::High);
        assert_eq!(ConfidenceTier::from_score(1), ConfidenceTier::Minimal);
        assert_eq!(ConfidenceTier::BelowAverage.to_string(), "Below Average");
    }

    #[test]
    fn test_risk_assessment_boundaries() {
        assert_eq!(RiskAssessment::from_risk_percentage(0.0), RiskAssessment::Conservative);
        assert_eq!(RiskAssessment::from_risk_percentage(8.0), RiskAssessment::Conservative);
        assert_eq!(RiskAssessment::from_risk_percentage(8.1), RiskAssessment::Moderate);
        assert_eq!(RiskAssessment::from_risk_percentage(15.0), RiskAssessment::Moderate);
        assert_eq!(RiskAssessment::from_risk_percentage(15.01), RiskAssessment::High);
        assert_eq!(RiskAssessment::High.to_string(), "High");
    }

    #[test]
    fn test_sharp_kind_serializes_rlm() {
        assert_eq!(serde_json::to_string(&SharpKind::Rlm).unwrap(), "\"RLM\"");
        assert_eq!(SharpKind::SharpMoney.to_string(), "SharpMoney");
    }

    #[test]
    fn test_data_quality_flag_display() {
        let flag = DataQualityFlag {
            field: "starter_era".into(),
            side: Some(Outcome::Away),
            substituted: 4.0,
            reason: ImputationReason::Missing,
        };
        assert_eq!(
            flag.to_string(),
            "AWAY starter_era missing, league average 4.00 used"
        );
    }

    #[test]
    fn test_event_sample_roundtrip() {
        let event = Event::sample();
        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, event.id);
        assert_eq!(back.markets.len(), 1);
        assert_eq!(back.matchup(), "New York @ Boston");
    }

    #[test]
    fn test_input_error_display() {
        let err = InputDataError::InvalidOutcome {
            sport: Sport::Baseball,
            market: "Moneyline".into(),
            outcome: Outcome::Draw,
        };
        assert_eq!(
            err.to_string(),
            "DRAW is not a valid outcome for a Baseball Moneyline market"
        );
    }
}
