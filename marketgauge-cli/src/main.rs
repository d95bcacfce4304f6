//! MarketGauge CLI: composite score, trading date, and report commands.
//!
//! Commands:
//! - `score` computes the composite for a date (default: last trading date)
//! - `trading-date` prints the last completed trading date
//! - `report` prints the persisted market report
//!
//! Logs go to stderr; stdout carries only results.

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use marketgauge_core::calendar::parse_date;
use marketgauge_core::data::live_sources;
use marketgauge_core::{Aggregator, JsonFileReport, ScoreConfig, TradingCalendar};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "marketgauge",
    about = "MarketGauge: composite market score from sentiment, trend, volatility and valuation"
)]
struct Cli {
    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the composite score for a trading date.
    Score {
        /// Date to score (YYYY-MM-DD). Defaults to the last completed trading date.
        #[arg(long)]
        date: Option<String>,

        /// Path to a TOML config file. Defaults are used when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print the score rounded to the nearest integer.
        #[arg(long, default_value_t = false)]
        rounded: bool,
    },
    /// Print the last completed trading date.
    TradingDate {
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the persisted market report.
    Report {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Commands::Score { date, config, rounded } => {
            if let Err(e) = run_score(date.as_deref(), config.as_deref(), rounded) {
                error!(error = %format!("{e:#}"), "no composite score published");
                eprintln!("Error: {e:#}");
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::TradingDate { config } => run_trading_date(config.as_deref()),
        Commands::Report { config } => run_report(config.as_deref()),
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn load_config(path: Option<&Path>) -> Result<ScoreConfig> {
    match path {
        Some(path) => ScoreConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(ScoreConfig::default()),
    }
}

fn resolve_date(calendar: &TradingCalendar, raw: Option<&str>) -> Result<NaiveDate> {
    let now = Utc::now();
    match raw {
        Some(raw) => {
            let date = parse_date(raw)?;
            calendar.validate(date, now)?;
            Ok(date)
        }
        None => Ok(calendar.last_trading_date(now)),
    }
}

fn run_score(date: Option<&str>, config_path: Option<&Path>, rounded: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let calendar = TradingCalendar::from_config(&config.market)?;
    let date = resolve_date(&calendar, date)?;

    let sources = live_sources(&config).context("building data sources")?;
    let report = Arc::new(JsonFileReport::open(&config.report.path));
    let mut aggregator = Aggregator::standard(&config, sources, report);

    info!(%date, "calculating composite score");
    let score = aggregator.calculate(date)?;

    if rounded {
        println!("{date}: {}", score.round_ties_even() as i64);
    } else {
        println!("{date}: {score:.2}");
    }
    Ok(())
}

fn run_trading_date(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let calendar = TradingCalendar::from_config(&config.market)?;
    println!("{}", calendar.last_trading_date(Utc::now()));
    Ok(())
}

fn run_report(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let report = JsonFileReport::open(&config.report.path);
    let all = report.all();
    if all.is_empty() {
        println!("No market report at {}", report.path().display());
        return Ok(());
    }
    println!("{}", serde_json::to_string_pretty(&all)?);
    Ok(())
}
