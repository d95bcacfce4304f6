//! Data acquisition: source traits, HTTP providers, dataset files.

pub mod circuit_breaker;
pub mod dataset;
pub mod fear_greed;
pub mod live;
pub mod provider;
pub mod valuation;
pub mod yahoo;

pub use circuit_breaker::CircuitBreaker;
pub use dataset::DatasetStore;
pub use fear_greed::{CnnFearGreed, FearGreedHistory, FearGreedRecord};
pub use live::{live_sources, StandardSources};
pub use provider::{
    CloseSource, DataError, RawBar, SentimentReading, SentimentSource, ValuationSample, ValuationSource,
};
pub use valuation::{ShillerColumns, ShillerCsv};
pub use yahoo::{YahooCloses, YahooProvider};
