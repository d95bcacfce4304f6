//! Property tests for normalization and composite bounds.
//!
//! 1. Every normalization maps its input into [0, 1]
//! 2. Trend and valuation scores are monotone in their input
//! 3. Any composite over in-range scores with unit weights lies in [0, 100]

use chrono::NaiveDate;
use marketgauge_core::indicators::{
    sentiment_score, trend_score, valuation_score, volatility_score, Indicator,
};
use marketgauge_core::{Aggregator, NullReport, ScoreError, WeightResolver};
use proptest::prelude::*;
use std::sync::Arc;

struct Constant {
    id: String,
    score: f64,
}

impl Indicator for Constant {
    fn identity(&self) -> &str {
        &self.id
    }

    fn normalize(&mut self, _date: NaiveDate) -> Result<Option<f64>, ScoreError> {
        Ok(Some(self.score))
    }
}

fn unit(x: f64) -> bool {
    (0.0..=1.0).contains(&x)
}

proptest! {
    #[test]
    fn sentiment_in_unit_interval(value in 0.0..=100.0_f64) {
        prop_assert!(unit(sentiment_score(value)));
    }

    #[test]
    fn trend_in_unit_interval(
        ratio in -1.0..1.0_f64,
        lower in -0.5..-0.01_f64,
        upper in 0.01..0.5_f64,
    ) {
        prop_assert!(unit(trend_score(ratio, lower, upper)));
    }

    #[test]
    fn trend_is_non_increasing(a in -0.3..0.3_f64, b in -0.3..0.3_f64) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(trend_score(lo, -0.1, 0.1) >= trend_score(hi, -0.1, 0.1));
    }

    #[test]
    fn volatility_in_unit_interval(value in 0.0..150.0_f64) {
        prop_assert!(unit(volatility_score(value, 9.0, 80.0)));
    }

    #[test]
    fn valuation_in_unit_interval(
        ratio in 0.0..100.0_f64,
        mean in 5.0..50.0_f64,
        std in 0.0..20.0_f64,
    ) {
        prop_assert!(unit(valuation_score(ratio, mean, std, 0.1)));
    }

    #[test]
    fn valuation_is_non_increasing(a in 0.0..100.0_f64, b in 0.0..100.0_f64) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(valuation_score(lo, 25.0, 5.0, 0.1) >= valuation_score(hi, 25.0, 5.0, 0.1));
    }

    #[test]
    fn composite_in_bounds(scores in prop::collection::vec(0.0..=1.0_f64, 4)) {
        // Quarters sum to exactly 1.0.
        let weight = 0.25;
        let indicators: Vec<Box<dyn Indicator>> = scores
            .iter()
            .enumerate()
            .map(|(i, &score)| Box::new(Constant { id: format!("i{i}"), score }) as Box<dyn Indicator>)
            .collect();
        let weights = WeightResolver::new((0..scores.len()).map(|i| (format!("i{i}"), weight)));
        let mut agg = Aggregator::new(indicators, weights, Arc::new(NullReport));

        let date = NaiveDate::from_ymd_opt(2025, 12, 15).unwrap();
        let composite = agg.calculate(date).unwrap();
        prop_assert!((0.0..=100.0).contains(&composite), "composite {}", composite);
    }
}
