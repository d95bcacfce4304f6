//! Scoring configuration loaded from TOML.
//!
//! Built once by the caller and passed by reference into the weight resolver
//! and the indicator constructors. Every section has defaults, so an empty
//! file yields a usable configuration apart from the weights.

use crate::data::fear_greed;
use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Upper bound on any `history_days` lookback, about a century.
pub const MAX_HISTORY_DAYS: u32 = 36_500;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreConfig {
    /// Raw `[weights]` table. Interpreted by `WeightResolver::from_toml`, so a
    /// malformed table is a scoring-time configuration failure, not a load error.
    #[serde(default)]
    pub weights: Option<toml::Value>,
    #[serde(default)]
    pub indicators: IndicatorsConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub market: MarketConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndicatorsConfig {
    #[serde(default)]
    pub spx: TrendConfig,
    #[serde(default)]
    pub vix: VolatilityConfig,
    #[serde(default)]
    pub fear_greed: SentimentConfig,
    #[serde(default)]
    pub shiller: ValuationConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    pub symbol: String,
    pub sma_period: usize,
    pub lower_ratio: f64,
    pub upper_ratio: f64,
    /// Calendar days of closes requested from the price source.
    pub history_days: u32,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            symbol: "^SPX".into(),
            sma_period: 200,
            lower_ratio: -0.10,
            upper_ratio: 0.10,
            history_days: 450,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolatilityConfig {
    pub symbol: String,
    pub min: f64,
    pub max: f64,
    pub history_days: u32,
}

impl Default for VolatilityConfig {
    fn default() -> Self {
        Self {
            symbol: "^VIX".into(),
            min: 9.0,
            max: 80.0,
            history_days: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentConfig {
    pub url: String,
    pub cache_path: PathBuf,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            url: fear_greed::DEFAULT_URL.into(),
            cache_path: PathBuf::from("data/feargreed.json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValuationConfig {
    pub symbol: String,
    pub earnings_window: usize,
    pub stats_window: usize,
    /// Standard deviations at or below this make the score a flat 1.0.
    pub flat_std: f64,
    /// Hide the requested date's own month from the windows, as if the
    /// dataset were only published after each month closes.
    pub point_in_time: bool,
    pub dataset_path: PathBuf,
    /// CSV export of the dataset's "Data" sheet. Spreadsheet workbooks are
    /// not parsed, so the URL must end in `.csv`.
    pub dataset_url: Option<String>,
    pub date_column: usize,
    pub earnings_column: usize,
    pub cape_column: usize,
    pub history_days: u32,
}

impl Default for ValuationConfig {
    fn default() -> Self {
        Self {
            symbol: "^SPX".into(),
            earnings_window: 120,
            stats_window: 360,
            flat_std: 0.1,
            point_in_time: false,
            dataset_path: PathBuf::from("data/ie_data.csv"),
            dataset_url: None,
            date_column: 0,
            earnings_column: 10,
            cape_column: 12,
            history_days: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub path: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/market_report.json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    /// IANA zone of the reference exchange.
    pub timezone: String,
    /// Regular-session close, `HH:MM` local time.
    pub close: String,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            timezone: "America/New_York".into(),
            close: "16:00".into(),
        }
    }
}

impl MarketConfig {
    pub fn tz(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| ConfigError::Invalid(format!("market.timezone: {e}")))
    }

    pub fn close_time(&self) -> Result<NaiveTime, ConfigError> {
        NaiveTime::parse_from_str(&self.close, "%H:%M")
            .map_err(|e| ConfigError::Invalid(format!("market.close '{}': {e}", self.close)))
    }
}

impl ScoreConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let spx = &self.indicators.spx;
        if spx.sma_period == 0 {
            return Err(ConfigError::Invalid("indicators.spx.sma_period must be >= 1".into()));
        }
        if !(spx.lower_ratio < spx.upper_ratio) {
            return Err(ConfigError::Invalid(format!(
                "indicators.spx: lower_ratio ({}) must be below upper_ratio ({})",
                spx.lower_ratio, spx.upper_ratio
            )));
        }

        let vix = &self.indicators.vix;
        if !(vix.min < vix.max) {
            return Err(ConfigError::Invalid(format!(
                "indicators.vix: min ({}) must be below max ({})",
                vix.min, vix.max
            )));
        }

        let shiller = &self.indicators.shiller;
        if shiller.earnings_window < 2 || shiller.stats_window < 2 {
            return Err(ConfigError::Invalid(
                "indicators.shiller: earnings_window and stats_window must be >= 2".into(),
            ));
        }

        if let Some(url) = &shiller.dataset_url {
            let path = url.split(['?', '#']).next().unwrap_or(url);
            if !path.to_ascii_lowercase().ends_with(".csv") {
                return Err(ConfigError::Invalid(format!(
                    "indicators.shiller.dataset_url must point to a CSV export, got '{url}'"
                )));
            }
        }

        for (section, days) in [
            ("spx", self.indicators.spx.history_days),
            ("vix", self.indicators.vix.history_days),
            ("shiller", shiller.history_days),
        ] {
            if days > MAX_HISTORY_DAYS {
                return Err(ConfigError::Invalid(format!(
                    "indicators.{section}.history_days ({days}) exceeds {MAX_HISTORY_DAYS}"
                )));
            }
        }

        self.market.tz()?;
        self.market.close_time()?;
        Ok(())
    }
}
