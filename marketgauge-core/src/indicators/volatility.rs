//! Volatility: latest close of the volatility index rescaled into `[0, 1]`.

use super::{report, Indicator, RawSignal, VOLATILITY_ID};
use crate::cache::DateSlot;
use crate::config::VolatilityConfig;
use crate::data::CloseSource;
use crate::error::ScoreError;
use crate::report::ReportSink;
use crate::stats::round2;
use chrono::NaiveDate;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

/// Clamped linear rescale, rounded to two decimals inside the band.
pub fn volatility_score(value: f64, min: f64, max: f64) -> f64 {
    if value <= min {
        0.0
    } else if value >= max {
        1.0
    } else {
        round2((value - min) / (max - min))
    }
}

pub struct VolatilityIndicator {
    identity: String,
    min: f64,
    max: f64,
    source: Box<dyn CloseSource>,
    sink: Arc<dyn ReportSink>,
    raw: DateSlot<f64>,
    normalized: DateSlot<f64>,
}

impl VolatilityIndicator {
    pub fn new(config: &VolatilityConfig, source: Box<dyn CloseSource>, sink: Arc<dyn ReportSink>) -> Self {
        assert!(config.min < config.max, "volatility min must be below max");
        Self {
            identity: VOLATILITY_ID.to_string(),
            min: config.min,
            max: config.max,
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
}

impl RawSignal for VolatilityIndicator {
    type Raw = f64;

    fn fetch(&mut self, date: NaiveDate) -> Result<Option<f64>, ScoreError> {
        if let Some(value) = self.raw.get(date) {
            debug!(identity = %self.identity, %date, "raw cache hit");
            return Ok(Some(*value));
        }

        let last = match self.source.closes(date) {
            Ok(closes) => closes.into_iter().rev().find(|c| c.is_finite()),
            Err(e) => {
                warn!(identity = %self.identity, %date, error = %e, "volatility fetch failed");
                return Ok(None);
            }
        };
        let Some(value) = last else {
            warn!(identity = %self.identity, %date, "no volatility close available");
            return Ok(None);
        };

        report(
            self.sink.as_ref(),
            &self.identity,
            date,
            [("raw_value", json!(round2(value)))],
        );
        Ok(Some(*self.raw.store(date, value)))
    }
}

impl Indicator for VolatilityIndicator {
    fn identity(&self) -> &str {
        &self.identity
    }

    fn normalize(&mut self, date: NaiveDate) -> Result<Option<f64>, ScoreError> {
        if let Some(value) = self.normalized.get(date) {
            return Ok(Some(*value));
        }
        let Some(value) = self.fetch(date)? else {
            return Ok(None);
        };

        let normalized = volatility_score(value, self.min, self.max);
        report(
            self.sink.as_ref(),
            &self.identity,
            date,
            [("normalized_value", json!(normalized))],
        );
        Ok(Some(*self.normalized.store(date, normalized)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DataError;
    use crate::indicators::test_support::d;
    use crate::report::MemoryReport;

    fn indicator(closes: Vec<f64>) -> VolatilityIndicator {
        let source = Box::new(move |_: NaiveDate| -> Result<Vec<f64>, DataError> { Ok(closes.clone()) });
        VolatilityIndicator::new(&VolatilityConfig::default(), source, Arc::new(MemoryReport::new()))
    }

    #[test]
    fn clamps_at_bounds() {
        assert_eq!(volatility_score(9.0, 9.0, 80.0), 0.0);
        assert_eq!(volatility_score(5.0, 9.0, 80.0), 0.0);
        assert_eq!(volatility_score(80.0, 9.0, 80.0), 1.0);
        assert_eq!(volatility_score(95.0, 9.0, 80.0), 1.0);
    }

    #[test]
    fn linear_inside_band() {
        // (16.1 - 9) / 71 = 0.1
        assert_eq!(volatility_score(16.1, 9.0, 80.0), 0.1);
        assert_eq!(volatility_score(44.5, 9.0, 80.0), 0.5);
    }

    #[test]
    fn uses_latest_finite_close() {
        let mut ind = indicator(vec![14.0, 16.1, f64::NAN]);
        assert_eq!(ind.fetch(d(2025, 12, 15)).unwrap(), Some(16.1));
        assert_eq!(ind.normalize(d(2025, 12, 15)).unwrap(), Some(0.1));
    }

    #[test]
    fn empty_history_is_no_value() {
        let mut ind = indicator(vec![]);
        assert_eq!(ind.normalize(d(2025, 12, 15)).unwrap(), None);
    }

    #[test]
    fn source_error_is_no_value() {
        let source = Box::new(|_: NaiveDate| -> Result<Vec<f64>, DataError> {
            Err(DataError::RateLimited { retry_after_secs: 60 })
        });
        let mut ind = VolatilityIndicator::new(&VolatilityConfig::default(), source, Arc::new(MemoryReport::new()));
        assert_eq!(ind.score(d(2025, 12, 15)).unwrap(), None);
    }
}
