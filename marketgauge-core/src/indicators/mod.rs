//! The indicator contract and its four variants.
//!
//! Each indicator pulls one raw signal for a date from an injected source,
//! maps it into a normalized contribution in `[0, 1]`, and caches both per
//! date in single-slot caches. Data-source failures are logged and become
//! `Ok(None)`; only structural problems (not enough history for a moving
//! window) come back as `Err`.

pub mod sentiment;
pub mod trend;
pub mod valuation;
pub mod volatility;

pub use sentiment::{sentiment_score, SentimentIndicator};
pub use trend::{trend_score, TrendIndicator, TrendReading};
pub use valuation::{valuation_score, ValuationIndicator, ValuationReading};
pub use volatility::{volatility_score, VolatilityIndicator};

use crate::error::ScoreError;
use crate::report::{Fields, ReportSink};
use chrono::NaiveDate;
use serde_json::Value;

pub const SENTIMENT_ID: &str = "fear_greed";
pub const TREND_ID: &str = "spx";
pub const VOLATILITY_ID: &str = "vix";
pub const VALUATION_ID: &str = "shiller";

/// Scoring side of an indicator, as seen by the aggregator.
///
/// `normalize` returns `Ok(None)` when its inputs are unavailable; this is
/// the only way a data failure reaches the aggregator.
pub trait Indicator {
    /// Stable name used for weight lookup and reporting.
    fn identity(&self) -> &str;

    fn normalize(&mut self, date: NaiveDate) -> Result<Option<f64>, ScoreError>;

    /// Contribution used by the aggregator. Overrides must stay in `[0, 1]`.
    fn score(&mut self, date: NaiveDate) -> Result<Option<f64>, ScoreError> {
        self.normalize(date)
    }
}

/// Raw side of an indicator: the measurement behind the normalized value.
pub trait RawSignal {
    type Raw;

    /// Raw measurement for `date`, fetched at most once per date.
    fn fetch(&mut self, date: NaiveDate) -> Result<Option<Self::Raw>, ScoreError>;
}

/// Send `(name, value)` pairs to the sink as one indicator entry.
pub(crate) fn report<I>(sink: &dyn ReportSink, identity: &str, date: NaiveDate, fields: I)
where
    I: IntoIterator<Item = (&'static str, Value)>,
{
    let fields: Fields = fields
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect();
    sink.record_indicator(identity, date, fields);
}
