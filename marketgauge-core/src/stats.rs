//! Small numeric helpers shared by the indicators.

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1 denominator); `None` below two values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

/// Simple moving average of the last `period` values.
///
/// `None` when fewer than `period` values are available.
pub fn trailing_sma(values: &[f64], period: usize) -> Option<f64> {
    assert!(period >= 1, "SMA period must be >= 1");
    if values.len() < period {
        return None;
    }
    mean(&values[values.len() - period..])
}

/// Round to two decimals, ties to even.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_of_values() {
        assert_eq!(mean(&[1.0, 2.0, 3.0, 4.0]), Some(2.5));
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn sample_std_uses_n_minus_one() {
        let std = sample_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((std - 2.138_089_935_299_395).abs() < 1e-12);
        assert_eq!(sample_std(&[1.0]), None);
    }

    #[test]
    fn sma_uses_trailing_window() {
        let closes = [10.0, 11.0, 12.0, 13.0, 14.0];
        assert_eq!(trailing_sma(&closes, 3), Some(13.0));
        assert_eq!(trailing_sma(&closes, 5), Some(12.0));
        assert_eq!(trailing_sma(&closes, 6), None);
    }

    #[test]
    #[should_panic(expected = "SMA period must be >= 1")]
    fn sma_zero_period_panics() {
        trailing_sma(&[1.0], 0);
    }

    #[test]
    fn rounds_to_cents() {
        assert_eq!(round2(0.123), 0.12);
        assert_eq!(round2(0.456), 0.46);
        assert_eq!(round2(1.0), 1.0);
    }
}
