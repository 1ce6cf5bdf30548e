//! SHARPLINE: sports betting decision engine.
//!
//! Entry point. Loads configuration, initialises structured logging, and
//! either runs one scan over a JSON batch file or serves the HTTP API.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use sharpline::api;
use sharpline::config::AppConfig;
use sharpline::engine::Scanner;
use sharpline::types::ScanBatch;

const BANNER: &str = r#"
     _                      _ _
 ___| |__   __ _ _ __ _ __ | (_)_ __   ___
/ __| '_ \ / _` | '__| '_ \| | | '_ \ / _ \
\__ \ | | | (_| | |  | |_) | | | | | |  __/
|___/_| |_|\__,_|_|  | .__/|_|_|_| |_|\___|
                     |_|
  Betting decision engine v0.1.0
"#;

#[derive(Debug, Parser)]
#[command(name = "sharpline", version, about = "Sports betting decision engine")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run one scan over a JSON batch and print the report.
    Scan {
        /// Batch file (events, line movements, public splits, predictions).
        #[arg(long)]
        input: PathBuf,
        /// Override the run seed.
        #[arg(long)]
        seed: Option<u64>,
        /// Override the bankroll.
        #[arg(long)]
        bankroll: Option<Decimal>,
        /// Wall-clock budget in milliseconds.
        #[arg(long)]
        budget_ms: Option<u64>,
        /// Write the JSON report here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Serve the HTTP API.
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cli = Cli::parse();
    init_logging();

    let mut cfg = AppConfig::load_or_default(&cli.config)?;

    match cli.command {
        Command::Scan {
            input,
            seed,
            bankroll,
            budget_ms,
            output,
        } => {
            if let Some(seed) = seed {
                cfg.engine.scan.run_seed = seed;
            }
            if let Some(bankroll) = bankroll {
                cfg.engine.scan.bankroll = bankroll;
            }
            if budget_ms.is_some() {
                cfg.engine.scan.time_budget_ms = budget_ms;
            }
            run_scan_command(cfg, &input, output.as_deref())
        }
        Command::Serve { port } => {
            if let Some(port) = port {
                cfg.server.port = port;
            }
            eprintln!("{BANNER}");
            info!(
                host = %cfg.server.host,
                port = cfg.server.port,
                bankroll = format!("${:.2}", cfg.engine.scan.bankroll),
                "SHARPLINE starting up"
            );
            api::serve(cfg).await
        }
    }
}

fn run_scan_command(cfg: AppConfig, input: &Path, output: Option<&Path>) -> Result<()> {
    let raw = fs::read_to_string(input)
        .with_context(|| format!("Failed to read batch file: {}", input.display()))?;
    let batch: ScanBatch = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse batch file: {}", input.display()))?;

    let scanner = Scanner::new(cfg.engine)?;
    let report = scanner.scan(&batch);

    if report.summary.timed_out {
        warn!(
            unprocessed = report.summary.unprocessed_events,
            "Scan hit its time budget"
        );
    }
    for pick in &report.picks {
        info!(pick = %pick, "Pick");
    }
    info!(summary = %report.summary, "Scan finished");

    let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
    match output {
        Some(path) => {
            fs::write(path, json)
                .with_context(|| format!("Failed to write report: {}", path.display()))?;
            info!(path = %path.display(), "Report written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

/// Initialise the tracing subscriber. Logs go to stderr so the scan report
/// on stdout stays machine readable.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("sharpline=info"));

    let json_logging = std::env::var("SHARPLINE_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    }
}
