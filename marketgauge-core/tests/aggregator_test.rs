//! Aggregator behavior over the real indicator variants with stubbed sources.
//!
//! Covers weight validation order, failure propagation, composite math,
//! per-date caching, and what reaches the report sink.

use chrono::NaiveDate;
use marketgauge_core::config::{ScoreConfig, TrendConfig, ValuationConfig, VolatilityConfig};
use marketgauge_core::data::{
    CloseSource, DataError, SentimentReading, SentimentSource, StandardSources, ValuationSample, ValuationSource,
};
use marketgauge_core::indicators::{
    Indicator, SentimentIndicator, TrendIndicator, VolatilityIndicator, SENTIMENT_ID, TREND_ID, VALUATION_ID,
    VOLATILITY_ID,
};
use marketgauge_core::{Aggregator, MemoryReport, NullReport, ReportSink, ScoreError, WeightResolver};
use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 12, day).unwrap()
}

// ── Stub sources ─────────────────────────────────────────────────────

fn sentiment(value: f64) -> Box<dyn SentimentSource> {
    Box::new(move |_: NaiveDate| -> Result<SentimentReading, DataError> {
        Ok(SentimentReading::new(value, "neutral"))
    })
}

/// Sentiment source whose value depends on the date, counting calls.
fn counting_sentiment(calls: Rc<Cell<u32>>) -> Box<dyn SentimentSource> {
    Box::new(move |date: NaiveDate| -> Result<SentimentReading, DataError> {
        calls.set(calls.get() + 1);
        let value = if date == d(15) { 70.0 } else { 20.0 };
        Ok(SentimentReading::new(value, "x"))
    })
}

fn closes(values: Vec<f64>) -> Box<dyn CloseSource> {
    Box::new(move |_: NaiveDate| -> Result<Vec<f64>, DataError> { Ok(values.clone()) })
}

fn counting_closes(calls: Rc<Cell<u32>>, values: Vec<f64>) -> Box<dyn CloseSource> {
    Box::new(move |_: NaiveDate| -> Result<Vec<f64>, DataError> {
        calls.set(calls.get() + 1);
        Ok(values.clone())
    })
}

fn failing_closes() -> Box<dyn CloseSource> {
    Box::new(|_: NaiveDate| -> Result<Vec<f64>, DataError> {
        Err(DataError::NetworkUnreachable("offline".into()))
    })
}

/// 400 months of flat valuation history: earnings 100, CAPE alternating 20/30.
fn valuation_history() -> Box<dyn ValuationSource> {
    Box::new(|_: NaiveDate| -> Result<Vec<ValuationSample>, DataError> {
        Ok((0..400)
            .map(|i| ValuationSample {
                month: NaiveDate::from_ymd_opt(1990 + i / 12, (i % 12) as u32 + 1, 1).unwrap(),
                real_earnings: Some(100.0),
                cape: Some(if i % 2 == 0 { 20.0 } else { 30.0 }),
            })
            .collect())
    })
}

fn trend(closes_src: Box<dyn CloseSource>, sink: Arc<dyn ReportSink>) -> Box<dyn Indicator> {
    let cfg = TrendConfig {
        sma_period: 4,
        ..TrendConfig::default()
    };
    Box::new(TrendIndicator::new(&cfg, closes_src, sink))
}

fn fear_greed(source: Box<dyn SentimentSource>, sink: Arc<dyn ReportSink>) -> Box<dyn Indicator> {
    Box::new(SentimentIndicator::new(source, sink))
}

fn volatility(closes_src: Box<dyn CloseSource>, sink: Arc<dyn ReportSink>) -> Box<dyn Indicator> {
    Box::new(VolatilityIndicator::new(&VolatilityConfig::default(), closes_src, sink))
}

fn equal_weights(ids: &[&str]) -> WeightResolver {
    let w = 1.0 / ids.len() as f64;
    WeightResolver::new(ids.iter().map(|id| (id.to_string(), w)))
}

// ── Weight validation ────────────────────────────────────────────────

#[test]
fn weight_sum_below_one_is_rejected() {
    let mut agg = Aggregator::new(
        vec![fear_greed(sentiment(50.0), Arc::new(NullReport))],
        WeightResolver::new([(SENTIMENT_ID, 0.5)]),
        Arc::new(NullReport),
    );
    assert_eq!(agg.calculate(d(15)), Err(ScoreError::WeightSumInvalid { total: 0.5 }));
}

#[test]
fn zero_weight_is_rejected_before_any_fetch() {
    let calls = Rc::new(Cell::new(0));
    let mut agg = Aggregator::new(
        vec![
            fear_greed(counting_sentiment(calls.clone()), Arc::new(NullReport)),
            volatility(closes(vec![20.0]), Arc::new(NullReport)),
        ],
        WeightResolver::new([(SENTIMENT_ID, 1.0), (VOLATILITY_ID, 0.0)]),
        Arc::new(NullReport),
    );
    assert_eq!(
        agg.calculate(d(15)),
        Err(ScoreError::InvalidWeight {
            identity: VOLATILITY_ID.into(),
            weight: 0.0
        })
    );
    assert_eq!(calls.get(), 0);
}

#[test]
fn missing_weight_is_distinct_from_invalid_weight() {
    let mut agg = Aggregator::new(
        vec![volatility(closes(vec![20.0]), Arc::new(NullReport))],
        WeightResolver::new([("something_else", 1.0)]),
        Arc::new(NullReport),
    );
    assert_eq!(
        agg.calculate(d(15)),
        Err(ScoreError::ConfigurationMissing {
            identity: VOLATILITY_ID.into()
        })
    );
}

#[test]
fn unreadable_weights_are_a_configuration_failure() {
    let mut agg = Aggregator::new(
        vec![volatility(closes(vec![20.0]), Arc::new(NullReport))],
        WeightResolver::from_toml(ScoreConfig::from_toml("weights = \"locked\"").unwrap().weights.as_ref()),
        Arc::new(NullReport),
    );
    match agg.calculate(d(15)) {
        Err(ScoreError::ConfigurationFailure { identity, reason }) => {
            assert_eq!(identity, VOLATILITY_ID);
            assert_eq!(reason, "[weights] must be a table, found string");
        }
        other => panic!("expected ConfigurationFailure, got {other:?}"),
    }
}

// ── Failure propagation ──────────────────────────────────────────────

#[test]
fn fetch_failure_surfaces_as_missing_score() {
    let mut agg = Aggregator::new(
        vec![
            fear_greed(sentiment(50.0), Arc::new(NullReport)),
            volatility(failing_closes(), Arc::new(NullReport)),
        ],
        equal_weights(&[SENTIMENT_ID, VOLATILITY_ID]),
        Arc::new(NullReport),
    );
    assert_eq!(
        agg.calculate(d(15)),
        Err(ScoreError::MissingScore {
            identity: VOLATILITY_ID.into()
        })
    );
}

#[test]
fn short_history_surfaces_verbatim() {
    let mut agg = Aggregator::new(
        vec![trend(closes(vec![100.0, 101.0]), Arc::new(NullReport))],
        WeightResolver::new([(TREND_ID, 1.0)]),
        Arc::new(NullReport),
    );
    assert_eq!(
        agg.calculate(d(15)),
        Err(ScoreError::InsufficientHistory {
            identity: TREND_ID.into(),
            available: 2,
            required: 4
        })
    );
}

/// An indicator whose score override leaves `[0, 1]`.
struct Overshoot;

impl Indicator for Overshoot {
    fn identity(&self) -> &str {
        "overshoot"
    }

    fn normalize(&mut self, _date: NaiveDate) -> Result<Option<f64>, ScoreError> {
        Ok(Some(1.5))
    }
}

#[test]
fn out_of_range_score_is_rejected() {
    let mut agg = Aggregator::new(
        vec![Box::new(Overshoot) as Box<dyn Indicator>],
        WeightResolver::new([("overshoot", 1.0)]),
        Arc::new(NullReport),
    );
    assert_eq!(
        agg.calculate(d(15)),
        Err(ScoreError::ScoreOutOfRange {
            identity: "overshoot".into(),
            score: 1.5
        })
    );
}

// ── Composite math ───────────────────────────────────────────────────

#[test]
fn composite_of_real_indicators() {
    let sink = Arc::new(MemoryReport::new());
    let mut agg = Aggregator::new(
        vec![
            // sma 100, last 100 → ratio 0 → 0.5
            trend(closes(vec![100.0, 100.0, 100.0, 100.0]), sink.clone()),
            // raw 70 → 0.3
            fear_greed(sentiment(70.0), sink.clone()),
            // 44.5 → 0.5
            volatility(closes(vec![44.5]), sink.clone()),
            // far below the CAPE mean → 1.0
            Box::new(marketgauge_core::indicators::ValuationIndicator::new(
                &ValuationConfig::default(),
                valuation_history(),
                closes(vec![1000.0]),
                sink.clone(),
            )),
        ],
        equal_weights(&[TREND_ID, SENTIMENT_ID, VOLATILITY_ID, VALUATION_ID]),
        sink.clone(),
    );

    let score = agg.calculate(d(15)).unwrap();
    // (50 + 30 + 50 + 100) / 4
    assert!((score - 57.5).abs() < 1e-9, "{score}");
    assert_eq!(sink.composite(), Some((score, d(15))));
    assert_eq!(
        sink.identities(),
        vec![SENTIMENT_ID, VALUATION_ID, TREND_ID, VOLATILITY_ID]
    );
    let (_, shiller) = sink.indicator(VALUATION_ID).unwrap();
    assert_eq!(shiller["daily_ratio"], serde_json::json!(10.0));
    assert_eq!(shiller["normalized_value"], serde_json::json!(1.0));
}

// ── Caching ──────────────────────────────────────────────────────────

#[test]
fn same_date_is_a_cache_hit_new_date_refetches() {
    let sentiment_calls = Rc::new(Cell::new(0));
    let vix_calls = Rc::new(Cell::new(0));
    let mut agg = Aggregator::new(
        vec![
            fear_greed(counting_sentiment(sentiment_calls.clone()), Arc::new(NullReport)),
            volatility(counting_closes(vix_calls.clone(), vec![44.5]), Arc::new(NullReport)),
        ],
        equal_weights(&[SENTIMENT_ID, VOLATILITY_ID]),
        Arc::new(NullReport),
    );

    let first = agg.calculate(d(15)).unwrap();
    let again = agg.calculate(d(15)).unwrap();
    assert_eq!(first, again);
    assert_eq!(sentiment_calls.get(), 1);
    assert_eq!(vix_calls.get(), 1);

    let other = agg.calculate(d(16)).unwrap();
    assert_eq!(sentiment_calls.get(), 2);
    assert_eq!(vix_calls.get(), 2);
    assert_ne!(first, other);
    // (30 + 50) / 2 then (80 + 50) / 2
    assert!((first - 40.0).abs() < 1e-9);
    assert!((other - 65.0).abs() < 1e-9);
    assert_eq!(agg.cached_score(), Some((d(16), other)));
}

#[test]
fn failed_calculation_is_not_cached() {
    let calls = Rc::new(Cell::new(0));
    let mut agg = Aggregator::new(
        vec![volatility(counting_closes(calls.clone(), vec![]), Arc::new(NullReport))],
        WeightResolver::new([(VOLATILITY_ID, 1.0)]),
        Arc::new(NullReport),
    );
    assert!(agg.calculate(d(15)).is_err());
    assert!(agg.calculate(d(15)).is_err());
    assert_eq!(calls.get(), 2);
    assert!(agg.cached_score().is_none());
}

// ── Factory ──────────────────────────────────────────────────────────

#[test]
fn standard_factory_wires_four_indicators() {
    let config = ScoreConfig::from_toml(
        r#"
        [weights]
        spx = 0.25
        fear_greed = 0.25
        vix = 0.25
        shiller = 0.25

        [indicators.spx]
        sma_period = 4
        "#,
    )
    .unwrap();
    let sources = StandardSources {
        sentiment: sentiment(70.0),
        trend: closes(vec![100.0; 4]),
        volatility: closes(vec![44.5]),
        valuation: valuation_history(),
        valuation_closes: closes(vec![1000.0]),
    };
    let mut agg = Aggregator::standard(&config, sources, Arc::new(NullReport));
    assert_eq!(agg.identities(), vec![TREND_ID, SENTIMENT_ID, VOLATILITY_ID, VALUATION_ID]);
    let score = agg.calculate(d(15)).unwrap();
    assert!((score - 57.5).abs() < 1e-9);
}

#[test]
fn standard_factory_without_weights_reports_missing() {
    let config = ScoreConfig::from_toml("").unwrap();
    let sources = StandardSources {
        sentiment: sentiment(70.0),
        trend: closes(vec![100.0; 200]),
        volatility: closes(vec![44.5]),
        valuation: valuation_history(),
        valuation_closes: closes(vec![1000.0]),
    };
    let mut agg = Aggregator::standard(&config, sources, Arc::new(NullReport));
    assert_eq!(
        agg.calculate(d(15)),
        Err(ScoreError::ConfigurationMissing {
            identity: TREND_ID.into()
        })
    );
}
