//! MarketGauge Core: composite market score from independently sourced indicators.
//!
//! - Indicator contract and the four standard variants (sentiment, trend,
//!   volatility, valuation), each with single-slot per-date caches
//! - Weight resolution with distinct "missing" and "unreadable" outcomes
//! - Aggregator that validates weights, combines contributions, and caches the
//!   composite per date
//! - Collaborators: data sources, report sinks, trading calendar, configuration

pub mod aggregator;
pub mod cache;
pub mod calendar;
pub mod config;
pub mod data;
pub mod error;
pub mod indicators;
pub mod report;
pub mod stats;
pub mod weights;

pub use aggregator::Aggregator;
pub use cache::DateSlot;
pub use calendar::{DateError, TradingCalendar};
pub use config::{ConfigError, ScoreConfig};
pub use error::ScoreError;
pub use indicators::{Indicator, RawSignal};
pub use report::{JsonFileReport, MemoryReport, NullReport, ReportError, ReportSink};
pub use weights::{ResolvedWeight, WeightResolver};
