//! Valuation: today's price/earnings against its long-run CAPE distribution.
//!
//! From the monthly dataset, the months up to and including the requested
//! date's month are used (strictly earlier months with `point_in_time`):
//! - `earnings_average`: mean of the last `earnings_window` real earnings;
//! - `cape_mean`, `cape_std`: mean and sample standard deviation of the last
//!   `stats_window` CAPE values.
//!
//! `daily_ratio = last_close / earnings_average`, scored with a one-sided
//! z-score decay: full credit at or below the mean, zero at four standard
//! deviations above it. A distribution flatter than `flat_std` scores 1.0.

use super::{report, Indicator, RawSignal, VALUATION_ID};
use crate::cache::DateSlot;
use crate::config::ValuationConfig;
use crate::data::{CloseSource, ValuationSample, ValuationSource};
use crate::error::ScoreError;
use crate::report::ReportSink;
use crate::stats::{mean, round2, sample_std};
use chrono::{Datelike, NaiveDate};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValuationReading {
    pub earnings_average: f64,
    pub cape_mean: f64,
    pub cape_std: f64,
    pub last_close: f64,
    pub daily_ratio: f64,
}

/// One-sided z-score decay into `[0, 1]`.
pub fn valuation_score(daily_ratio: f64, mean: f64, std: f64, flat_std: f64) -> f64 {
    if std <= flat_std {
        return 1.0;
    }
    let z = (daily_ratio - mean) / std;
    (100.0 - z.max(0.0) * 25.0).clamp(0.0, 100.0) / 100.0
}

pub struct ValuationIndicator {
    identity: String,
    earnings_window: usize,
    stats_window: usize,
    flat_std: f64,
    point_in_time: bool,
    dataset: Box<dyn ValuationSource>,
    closes: Box<dyn CloseSource>,
    sink: Arc<dyn ReportSink>,
    raw: DateSlot<ValuationReading>,
    normalized: DateSlot<f64>,
}

impl ValuationIndicator {
    pub fn new(
        config: &ValuationConfig,
        dataset: Box<dyn ValuationSource>,
        closes: Box<dyn CloseSource>,
        sink: Arc<dyn ReportSink>,
    ) -> Self {
        assert!(config.earnings_window >= 1, "earnings window must be >= 1");
        assert!(config.stats_window >= 2, "stats window must be >= 2");
        Self {
            identity: VALUATION_ID.to_string(),
            earnings_window: config.earnings_window,
            stats_window: config.stats_window,
            flat_std: config.flat_std,
            point_in_time: config.point_in_time,
            dataset,
            closes,
            sink,
            raw: DateSlot::new(),
            normalized: DateSlot::new(),
        }
    }

    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = identity.into();
        self
    }

    /// Last `window` values of a column, or `InsufficientHistory`.
    fn tail(&self, values: Vec<f64>, window: usize) -> Result<Vec<f64>, ScoreError> {
        if values.len() < window {
            return Err(ScoreError::InsufficientHistory {
                identity: self.identity.clone(),
                available: values.len(),
                required: window,
            });
        }
        Ok(values[values.len() - window..].to_vec())
    }
}

/// Samples visible on `date`: through its month, or only months that closed
/// before it when `point_in_time` is set.
fn visible_on(samples: Vec<ValuationSample>, date: NaiveDate, point_in_time: bool) -> Vec<ValuationSample> {
    let month_start = date.with_day(1).unwrap_or(date);
    samples
        .into_iter()
        .filter(|s| if point_in_time { s.month < month_start } else { s.month <= date })
        .collect()
}

impl RawSignal for ValuationIndicator {
    type Raw = ValuationReading;

    fn fetch(&mut self, date: NaiveDate) -> Result<Option<ValuationReading>, ScoreError> {
        if let Some(reading) = self.raw.get(date) {
            debug!(identity = %self.identity, %date, "raw cache hit");
            return Ok(Some(*reading));
        }

        let samples = match self.dataset.samples(date) {
            Ok(samples) => visible_on(samples, date, self.point_in_time),
            Err(e) => {
                warn!(identity = %self.identity, %date, error = %e, "valuation dataset unavailable");
                return Ok(None);
            }
        };

        let earnings = self.tail(
            samples.iter().filter_map(|s| s.real_earnings).collect(),
            self.earnings_window,
        )?;
        let capes = self.tail(samples.iter().filter_map(|s| s.cape).collect(), self.stats_window)?;

        let last_close = match self.closes.closes(date) {
            Ok(closes) => closes.into_iter().rev().find(|c| c.is_finite()),
            Err(e) => {
                warn!(identity = %self.identity, %date, error = %e, "index close fetch failed");
                return Ok(None);
            }
        };
        let Some(last_close) = last_close else {
            warn!(identity = %self.identity, %date, "no index close available");
            return Ok(None);
        };

        let (Some(earnings_average), Some(cape_mean), Some(cape_std)) =
            (mean(&earnings), mean(&capes), sample_std(&capes))
        else {
            return Ok(None);
        };
        if earnings_average <= 0.0 {
            warn!(identity = %self.identity, %date, earnings_average, "non-positive earnings average");
            return Ok(None);
        }

        let reading = ValuationReading {
            earnings_average,
            cape_mean,
            cape_std,
            last_close,
            daily_ratio: last_close / earnings_average,
        };
        report(
            self.sink.as_ref(),
            &self.identity,
            date,
            [
                ("earnings_average", json!(round2(reading.earnings_average))),
                ("cape_mean", json!(round2(reading.cape_mean))),
                ("cape_std", json!(round2(reading.cape_std))),
                ("last_close", json!(round2(reading.last_close))),
                ("daily_ratio", json!(round2(reading.daily_ratio))),
            ],
        );
        Ok(Some(*self.raw.store(date, reading)))
    }
}

impl Indicator for ValuationIndicator {
    fn identity(&self) -> &str {
        &self.identity
    }

    fn normalize(&mut self, date: NaiveDate) -> Result<Option<f64>, ScoreError> {
        if let Some(value) = self.normalized.get(date) {
            return Ok(Some(*value));
        }
        let Some(r) = self.fetch(date)? else {
            return Ok(None);
        };

        let normalized = valuation_score(r.daily_ratio, r.cape_mean, r.cape_std, self.flat_std);
        report(
            self.sink.as_ref(),
            &self.identity,
            date,
            [("normalized_value", json!(round2(normalized)))],
        );
        Ok(Some(*self.normalized.store(date, normalized)))
    }
}
