//! Trend: distance of the index from its simple moving average.
//!
//! `ratio = (last_close - sma) / sma`, mapped piecewise against the configured
//! thresholds: at or below `lower` scores 1.0, at or above `upper` scores 0.0,
//! linear in between. Fewer closes than the SMA period is a hard failure.

use super::{report, Indicator, RawSignal, TREND_ID};
use crate::cache::DateSlot;
use crate::config::TrendConfig;
use crate::data::CloseSource;
use crate::error::ScoreError;
use crate::report::ReportSink;
use crate::stats::{round2, trailing_sma};
use chrono::NaiveDate;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendReading {
    pub sma: f64,
    pub last_close: f64,
    pub ratio: f64,
}

/// Piecewise-linear trend score. Requires `lower < upper`.
pub fn trend_score(ratio: f64, lower: f64, upper: f64) -> f64 {
    if ratio <= lower {
        1.0
    } else if ratio >= upper {
        0.0
    } else {
        (upper - ratio) / (upper - lower)
    }
}

pub struct TrendIndicator {
    identity: String,
    sma_period: usize,
    lower: f64,
    upper: f64,
    source: Box<dyn CloseSource>,
    sink: Arc<dyn ReportSink>,
    raw: DateSlot<TrendReading>,
    normalized: DateSlot<f64>,
}

impl TrendIndicator {
    pub fn new(config: &TrendConfig, source: Box<dyn CloseSource>, sink: Arc<dyn ReportSink>) -> Self {
        assert!(config.sma_period >= 1, "SMA period must be >= 1");
        assert!(
            config.lower_ratio < config.upper_ratio,
            "lower_ratio must be below upper_ratio"
        );
        Self {
            identity: TREND_ID.to_string(),
            sma_period: config.sma_period,
            lower: config.lower_ratio,
            upper: config.upper_ratio,
            source,
            sink,
            raw: DateSlot::new(),
            normalized: DateSlot::new(),
        }
    }

    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = identity.into();
        self
    }

    pub fn sma_period(&self) -> usize {
        self.sma_period
    }
}

impl RawSignal for TrendIndicator {
    type Raw = TrendReading;

    fn fetch(&mut self, date: NaiveDate) -> Result<Option<TrendReading>, ScoreError> {
        if let Some(reading) = self.raw.get(date) {
            debug!(identity = %self.identity, %date, "raw cache hit");
            return Ok(Some(*reading));
        }

        let closes: Vec<f64> = match self.source.closes(date) {
            Ok(closes) => closes.into_iter().filter(|c| c.is_finite()).collect(),
            Err(e) => {
                warn!(identity = %self.identity, %date, error = %e, "close history fetch failed");
                return Ok(None);
            }
        };

        let (Some(sma), Some(&last_close)) = (trailing_sma(&closes, self.sma_period), closes.last()) else {
            return Err(ScoreError::InsufficientHistory {
                identity: self.identity.clone(),
                available: closes.len(),
                required: self.sma_period,
            });
        };

        if sma <= 0.0 {
            warn!(identity = %self.identity, %date, sma, "non-positive moving average");
            return Ok(None);
        }

        let reading = TrendReading {
            sma,
            last_close,
            ratio: (last_close - sma) / sma,
        };
        report(
            self.sink.as_ref(),
            &self.identity,
            date,
            [
                ("sma_period", json!(self.sma_period)),
                ("sma_value", json!(round2(reading.sma))),
                ("last_close", json!(round2(reading.last_close))),
                ("ratio", json!(round2(reading.ratio))),
            ],
        );
        Ok(Some(*self.raw.store(date, reading)))
    }
}

impl Indicator for TrendIndicator {
    fn identity(&self) -> &str {
        &self.identity
    }

    fn normalize(&mut self, date: NaiveDate) -> Result<Option<f64>, ScoreError> {
        if let Some(value) = self.normalized.get(date) {
            return Ok(Some(*value));
        }
        let Some(reading) = self.fetch(date)? else {
            return Ok(None);
        };

        let normalized = trend_score(reading.ratio, self.lower, self.upper);
        report(
            self.sink.as_ref(),
            &self.identity,
            date,
            [("normalized_value", json!(round2(normalized)))],
        );
        Ok(Some(*self.normalized.store(date, normalized)))
    }
}
