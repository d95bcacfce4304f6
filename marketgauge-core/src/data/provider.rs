//! Data-source traits and structured error types.
//!
//! Each indicator pulls its raw signal through one of the small traits below.
//! Every trait has a blanket implementation for plain closures taking the
//! requested date, so tests swap in stubs without touching the network.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raw daily OHLCV bar from a price provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    pub adj_close: f64,
}

/// Structured error types for data acquisition.
///
/// These never reach the aggregator: indicators log them and report "no value".
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("value {value} outside the source range [{min}, {max}]")]
    ValueOutOfRange { value: f64, min: f64, max: f64 },

    #[error("no data for {date}: available range is {first} to {last}")]
    DateOutOfRange {
        date: NaiveDate,
        first: NaiveDate,
        last: NaiveDate,
    },

    #[error("no record for {date}")]
    NoRecord { date: NaiveDate },

    #[error("dataset error: {0}")]
    Dataset(String),

    #[error("data error: {0}")]
    Other(String),
}

/// One reading of a sentiment index: the value and its qualitative label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentReading {
    pub value: f64,
    pub rating: String,
}

impl SentimentReading {
    pub fn new(value: f64, rating: impl Into<String>) -> Self {
        Self {
            value,
            rating: rating.into(),
        }
    }
}

/// One monthly row of the valuation dataset.
///
/// Either column may be blank in the source (the latest months usually lack
/// earnings), so both are optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationSample {
    /// First day of the sample's month.
    pub month: NaiveDate,
    pub real_earnings: Option<f64>,
    pub cape: Option<f64>,
}

/// Source of sentiment readings keyed by date.
pub trait SentimentSource {
    fn reading(&self, date: NaiveDate) -> Result<SentimentReading, DataError>;
}

/// Source of daily closes for one instrument.
pub trait CloseSource {
    /// Closes up to and including `date`, oldest first.
    fn closes(&self, date: NaiveDate) -> Result<Vec<f64>, DataError>;
}

/// Source of the monthly valuation dataset.
pub trait ValuationSource {
    /// All samples known as of `date`, oldest first.
    fn samples(&self, date: NaiveDate) -> Result<Vec<ValuationSample>, DataError>;
}

impl<F> SentimentSource for F
where
    F: Fn(NaiveDate) -> Result<SentimentReading, DataError>,
{
    fn reading(&self, date: NaiveDate) -> Result<SentimentReading, DataError> {
        self(date)
    }
}

impl<F> CloseSource for F
where
    F: Fn(NaiveDate) -> Result<Vec<f64>, DataError>,
{
    fn closes(&self, date: NaiveDate) -> Result<Vec<f64>, DataError> {
        self(date)
    }
}

impl<F> ValuationSource for F
where
    F: Fn(NaiveDate) -> Result<Vec<ValuationSample>, DataError>,
{
    fn samples(&self, date: NaiveDate) -> Result<Vec<ValuationSample>, DataError> {
        self(date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_are_sources() {
        let source = |_date: NaiveDate| -> Result<Vec<f64>, DataError> { Ok(vec![1.0, 2.0]) };
        let date = NaiveDate::from_ymd_opt(2025, 12, 15).unwrap();
        assert_eq!(source.closes(date).unwrap(), vec![1.0, 2.0]);
    }

    #[test]
    fn date_out_of_range_message() {
        let err = DataError::DateOutOfRange {
            date: NaiveDate::from_ymd_opt(2030, 1, 2).unwrap(),
            first: NaiveDate::from_ymd_opt(2020, 1, 2).unwrap(),
            last: NaiveDate::from_ymd_opt(2025, 12, 15).unwrap(),
        };
        assert_eq!(
            err.to_string(),
            "no data for 2030-01-02: available range is 2020-01-02 to 2025-12-15"
        );
    }
}
