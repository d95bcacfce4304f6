//! Sentiment: Fear & Greed index, inverted.
//!
//! The index runs from 0 (extreme fear) to 100 (extreme greed). Fear is read
//! as opportunity, so the contribution is `(100 - round(value)) / 100`.

use super::{report, Indicator, RawSignal, SENTIMENT_ID};
use crate::cache::DateSlot;
use crate::data::{SentimentReading, SentimentSource};
use crate::error::ScoreError;
use crate::report::ReportSink;
use crate::stats::round2;
use chrono::NaiveDate;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct SentimentIndicator {
    identity: String,
    source: Box<dyn SentimentSource>,
    sink: Arc<dyn ReportSink>,
    raw: DateSlot<SentimentReading>,
    normalized: DateSlot<f64>,
}

impl SentimentIndicator {
    pub fn new(source: Box<dyn SentimentSource>, sink: Arc<dyn ReportSink>) -> Self {
        Self {
            identity: SENTIMENT_ID.to_string(),
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

/// Inverted linear map of an index value in `[0, 100]`.
pub fn sentiment_score(value: f64) -> f64 {
    (100.0 - value.round_ties_even()) / 100.0
}

impl RawSignal for SentimentIndicator {
    type Raw = SentimentReading;

    fn fetch(&mut self, date: NaiveDate) -> Result<Option<SentimentReading>, ScoreError> {
        if let Some(reading) = self.raw.get(date) {
            debug!(identity = %self.identity, %date, "raw cache hit");
            return Ok(Some(reading.clone()));
        }

        let reading = match self.source.reading(date) {
            Ok(reading) => reading,
            Err(e) => {
                warn!(identity = %self.identity, %date, error = %e, "sentiment fetch failed");
                return Ok(None);
            }
        };

        if !(0.0..=100.0).contains(&reading.value) {
            warn!(identity = %self.identity, %date, value = reading.value, "sentiment value outside [0, 100]");
            return Ok(None);
        }

        report(
            self.sink.as_ref(),
            &self.identity,
            date,
            [
                ("raw_value", json!(round2(reading.value))),
                ("raw_description", json!(reading.rating)),
            ],
        );
        Ok(Some(self.raw.store(date, reading).clone()))
    }
}

impl Indicator for SentimentIndicator {
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

        let normalized = sentiment_score(reading.value);
        report(
            self.sink.as_ref(),
            &self.identity,
            date,
            [("normalized_value", json!(round2(normalized)))],
        );
        Ok(Some(*self.normalized.store(date, normalized)))
    }
}
