//! Configuration loading from TOML.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs. Every
//! field has a default, so an empty file (or no file at all) yields the
//! canonical engine settings. Sections owned by a strategy module are
//! defined next to that module and composed here.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::model::ModelConfig;
use crate::strategy::confidence::ConfidenceConfig;
use crate::strategy::edge::EdgeConfig;
use crate::strategy::ensemble::BlendConfig;
use crate::strategy::kelly::KellyConfig;
use crate::strategy::risk::RiskConfig;
use crate::strategy::sharp::SharpConfig;
use crate::types::EngineError;

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(flatten)]
    pub engine: EngineConfig,
    pub server: ServerConfig,
}

/// Everything a scan needs. Immutable for the lifetime of the scan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub scan: ScanSettings,
    pub model: ModelConfig,
    pub blend: BlendConfig,
    pub edge: EdgeConfig,
    pub sharp: SharpConfig,
    pub confidence: ConfidenceConfig,
    pub kelly: KellyConfig,
    pub risk: RiskConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    pub bankroll: Decimal,
    /// Minimum EV% for a candidate to qualify.
    pub min_ev_threshold: f64,
    /// Minimum confidence score (1-10) for a candidate to qualify.
    pub min_confidence_threshold: u8,
    pub monte_carlo_iterations: u32,
    pub run_seed: u64,
    /// Wall-clock budget for one scan. `None` means unbounded.
    pub time_budget_ms: Option<u64>,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            bankroll: dec!(10000),
            min_ev_threshold: 6.0,
            min_confidence_threshold: 8,
            monte_carlo_iterations: 5_000,
            run_seed: 42,
            time_budget_ms: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Load the file when it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            tracing::info!(path = %path.display(), "No config file found, using defaults");
            Ok(Self::default())
        }
    }
}

fn check(ok: bool, message: impl FnOnce() -> String) -> Result<(), EngineError> {
    if ok {
        Ok(())
    } else {
        Err(EngineError::Configuration(message()))
    }
}

fn in_unit_interval(value: f64) -> bool {
    value.is_finite() && value > 0.0 && value <= 1.0
}

impl EngineConfig {
    /// Reject settings the engine cannot run with. The first problem found
    /// is reported with the offending key.
    pub fn validate(&self) -> Result<(), EngineError> {
        let s = &self.scan;
        check(s.bankroll > Decimal::ZERO, || {
            format!("scan.bankroll must be positive (got {})", s.bankroll)
        })?;
        check(s.min_ev_threshold.is_finite(), || {
            "scan.min_ev_threshold must be a finite number".to_string()
        })?;
        check((1..=10).contains(&s.min_confidence_threshold), || {
            format!(
                "scan.min_confidence_threshold must be between 1 and 10 (got {})",
                s.min_confidence_threshold
            )
        })?;
        check(s.monte_carlo_iterations > 0, || {
            "scan.monte_carlo_iterations must be at least 1".to_string()
        })?;
        check(s.time_budget_ms != Some(0), || {
            "scan.time_budget_ms must be positive when set".to_string()
        })?;

        let m = &self.model;
        check(
            m.extra_innings_home_share.is_finite() && (0.0..=1.0).contains(&m.extra_innings_home_share),
            || {
                format!(
                    "model.extra_innings_home_share must be within [0, 1] (got {})",
                    m.extra_innings_home_share
                )
            },
        )?;
        check(m.baseball_max_runs > 0 && m.soccer_max_goals > 0, || {
            "model score grids must extend past zero".to_string()
        })?;

        let b = &self.blend;
        check(
            b.analytical_weight.is_finite()
                && b.simulated_weight.is_finite()
                && b.analytical_weight >= 0.0
                && b.simulated_weight >= 0.0
                && b.analytical_weight + b.simulated_weight > 0.0,
            || {
                format!(
                    "blend weights must be non-negative with a positive sum (got {} / {})",
                    b.analytical_weight, b.simulated_weight
                )
            },
        )?;

        let e = &self.edge;
        check(
            e.fair_threshold >= 0.0
                && e.good_threshold >= e.fair_threshold
                && e.excellent_threshold >= e.good_threshold
                && e.excellent_threshold.is_finite(),
            || {
                format!(
                    "edge tiers must satisfy 0 <= fair <= good <= excellent (got {} / {} / {})",
                    e.fair_threshold, e.good_threshold, e.excellent_threshold
                )
            },
        )?;

        let k = &self.kelly;
        check(in_unit_interval(k.multiplier), || {
            format!("kelly.multiplier must be within (0, 1] (got {})", k.multiplier)
        })?;
        check(in_unit_interval(k.max_bet_fraction), || {
            format!(
                "kelly.max_bet_fraction must be within (0, 1] (got {})",
                k.max_bet_fraction
            )
        })?;
        check(
            k.high_confidence_multiplier.is_finite() && k.high_confidence_multiplier > 0.0,
            || "kelly.high_confidence_multiplier must be positive".to_string(),
        )?;
        check(k.stake_unit > Decimal::ZERO, || {
            format!("kelly.stake_unit must be positive (got {})", k.stake_unit)
        })?;

        let r = &self.risk;
        for (key, pct) in [
            ("risk.daily_exposure_cap_pct", r.daily_exposure_cap_pct),
            ("risk.sport_exposure_cap_pct", r.sport_exposure_cap_pct),
        ] {
            check(pct > Decimal::ZERO && pct <= dec!(100), || {
                format!("{key} must be within (0, 100] (got {pct})")
            })?;
        }
        check(r.max_picks != Some(0), || {
            "risk.max_picks must be at least 1 when set".to_string()
        })?;

        let sh = &self.sharp;
        check(
            sh.public_majority_pct > 50.0 && sh.public_majority_pct <= 100.0,
            || {
                format!(
                    "sharp.public_majority_pct must be within (50, 100] (got {})",
                    sh.public_majority_pct
                )
            },
        )?;
        for (key, value) in [
            ("sharp.rlm_min_move", sh.rlm_min_move),
            ("sharp.steam_min_move", sh.steam_min_move),
            ("sharp.sharp_money_gap_pct", sh.sharp_money_gap_pct),
        ] {
            check(value.is_finite() && value > 0.0, || {
                format!("{key} must be positive (got {value})")
            })?;
        }
        check(sh.steam_window_minutes > 0, || {
            "sharp.steam_window_minutes must be positive".to_string()
        })?;
        check(sh.steam_min_books > 0 && sh.consensus_min_books > 0, || {
            "sharp book-count thresholds must be at least 1".to_string()
        })?;

        let c = &self.confidence;
        check(
            c.model_stability_threshold.is_finite() && c.model_stability_threshold > 0.0,
            || "confidence.model_stability_threshold must be positive".to_string(),
        )?;
        check(
            c.large_move_threshold.is_finite() && c.large_move_threshold > 0.0,
            || "confidence.large_move_threshold must be positive".to_string(),
        )?;
        check(c.recent_window_minutes > 0, || {
            "confidence.recent_window_minutes must be positive".to_string()
        })?;

        Ok(())
    }
}
