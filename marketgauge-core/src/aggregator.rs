//! Composite score: weighted combination of the indicators' contributions.
//!
//! For a date not already cached, every indicator's weight is resolved and
//! validated first; then each indicator is scored in construction order and
//! its contribution `score * 100 * weight` accumulated. Any failure aborts the
//! whole computation. There is no partial composite.

use crate::cache::DateSlot;
use crate::config::ScoreConfig;
use crate::data::StandardSources;
use crate::error::ScoreError;
use crate::indicators::{
    Indicator, SentimentIndicator, TrendIndicator, ValuationIndicator, VolatilityIndicator,
};
use crate::report::ReportSink;
use crate::weights::WeightResolver;
use chrono::NaiveDate;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

pub struct Aggregator {
    indicators: Vec<Box<dyn Indicator>>,
    weights: WeightResolver,
    sink: Arc<dyn ReportSink>,
    cache: DateSlot<f64>,
}

impl Aggregator {
    /// Panics if two indicators share an identity.
    pub fn new(indicators: Vec<Box<dyn Indicator>>, weights: WeightResolver, sink: Arc<dyn ReportSink>) -> Self {
        let mut seen = HashSet::new();
        for indicator in &indicators {
            assert!(
                seen.insert(indicator.identity().to_string()),
                "duplicate indicator identity '{}'",
                indicator.identity()
            );
        }
        Self {
            indicators,
            weights,
            sink,
            cache: DateSlot::new(),
        }
    }

    /// The four standard indicators, weighted from `config.weights`.
    pub fn standard(config: &ScoreConfig, sources: StandardSources, sink: Arc<dyn ReportSink>) -> Self {
        let ind = &config.indicators;
        let indicators: Vec<Box<dyn Indicator>> = vec![
            Box::new(TrendIndicator::new(&ind.spx, sources.trend, Arc::clone(&sink))),
            Box::new(SentimentIndicator::new(sources.sentiment, Arc::clone(&sink))),
            Box::new(VolatilityIndicator::new(&ind.vix, sources.volatility, Arc::clone(&sink))),
            Box::new(ValuationIndicator::new(
                &ind.shiller,
                sources.valuation,
                sources.valuation_closes,
                Arc::clone(&sink),
            )),
        ];
        Self::new(indicators, WeightResolver::from_toml(config.weights.as_ref()), sink)
    }

    pub fn identities(&self) -> Vec<&str> {
        self.indicators.iter().map(|i| i.identity()).collect()
    }

    /// Last computed composite and its date.
    pub fn cached_score(&self) -> Option<(NaiveDate, f64)> {
        self.cache.latest().map(|(date, score)| (date, *score))
    }

    /// Composite score in `[0, 100]` for `date`.
    pub fn calculate(&mut self, date: NaiveDate) -> Result<f64, ScoreError> {
        if let Some(score) = self.cache.get(date) {
            debug!(%date, score, "composite cache hit");
            return Ok(*score);
        }

        let weights = self
            .indicators
            .iter()
            .map(|indicator| self.weights.weight(indicator.identity()))
            .collect::<Result<Vec<f64>, ScoreError>>()?;

        let mut total_weight = 0.0;
        let mut composite = 0.0;
        for (indicator, &weight) in self.indicators.iter_mut().zip(&weights) {
            total_weight += weight;

            let score = indicator.score(date)?.ok_or_else(|| ScoreError::MissingScore {
                identity: indicator.identity().to_string(),
            })?;
            if !(0.0..=1.0).contains(&score) {
                return Err(ScoreError::ScoreOutOfRange {
                    identity: indicator.identity().to_string(),
                    score,
                });
            }

            debug!(identity = indicator.identity(), score, weight, "indicator scored");
            composite += (score * 100.0) * weight;
        }

        // Exact comparison: weights are authored to sum to one, no renormalization.
        if total_weight != 1.0 {
            return Err(ScoreError::WeightSumInvalid { total: total_weight });
        }
        let result = composite / total_weight;

        self.cache.store(date, result);
        self.sink.record_composite(result, date);
        info!(%date, score = result, "composite score calculated");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{MemoryReport, NullReport};

    /// Indicator returning a fixed result.
    struct Fixed {
        id: &'static str,
        result: Result<Option<f64>, ScoreError>,
    }

    impl Indicator for Fixed {
        fn identity(&self) -> &str {
            self.id
        }

        fn normalize(&mut self, _date: NaiveDate) -> Result<Option<f64>, ScoreError> {
            self.result.clone()
        }
    }

    fn boxed(id: &'static str, result: Result<Option<f64>, ScoreError>) -> Box<dyn Indicator> {
        Box::new(Fixed { id, result })
    }

    fn fixed(id: &'static str, score: f64) -> Box<dyn Indicator> {
        boxed(id, Ok(Some(score)))
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 12, 15).unwrap()
    }

    #[test]
    fn single_indicator_composite() {
        let mut agg = Aggregator::new(
            vec![fixed("x", 0.8)],
            WeightResolver::new([("x", 1.0)]),
            Arc::new(NullReport),
        );
        assert_eq!(agg.calculate(date()).unwrap(), 80.0);
    }

    #[test]
    fn weighted_mean_of_four() {
        let sink = Arc::new(MemoryReport::new());
        let mut agg = Aggregator::new(
            vec![fixed("a", 1.0), fixed("b", 0.5), fixed("c", 0.0), fixed("d", 0.3)],
            WeightResolver::new([("a", 0.25), ("b", 0.25), ("c", 0.25), ("d", 0.25)]),
            sink.clone(),
        );
        let score = agg.calculate(date()).unwrap();
        assert!((score - 45.0).abs() < 1e-9);
        assert_eq!(sink.composite(), Some((score, date())));
        assert_eq!(agg.cached_score(), Some((date(), score)));
    }

    #[test]
    fn missing_score_fails() {
        let mut agg = Aggregator::new(
            vec![boxed("x", Ok(None))],
            WeightResolver::new([("x", 1.0)]),
            Arc::new(NullReport),
        );
        assert_eq!(
            agg.calculate(date()),
            Err(ScoreError::MissingScore { identity: "x".into() })
        );
        assert!(agg.cached_score().is_none());
    }

    #[test]
    fn indicator_error_propagates() {
        let err = ScoreError::InsufficientHistory {
            identity: "x".into(),
            available: 10,
            required: 200,
        };
        let mut agg = Aggregator::new(
            vec![boxed("x", Err(err.clone()))],
            WeightResolver::new([("x", 1.0)]),
            Arc::new(NullReport),
        );
        assert_eq!(agg.calculate(date()), Err(err));
    }

    #[test]
    fn identities_in_order() {
        let agg = Aggregator::new(
            vec![fixed("b", 0.1), fixed("a", 0.2)],
            WeightResolver::new([("a", 0.5), ("b", 0.5)]),
            Arc::new(NullReport),
        );
        assert_eq!(agg.identities(), vec!["b", "a"]);
    }

    #[test]
    #[should_panic(expected = "duplicate indicator identity 'x'")]
    fn duplicate_identity_panics() {
        Aggregator::new(
            vec![fixed("x", 0.1), fixed("x", 0.2)],
            WeightResolver::new([("x", 1.0)]),
            Arc::new(NullReport),
        );
    }
}
