//! Scoring error taxonomy.
//!
//! Everything here propagates uncaught to the caller of
//! `Aggregator::calculate`. Data-source failures never appear in this enum:
//! they are absorbed at the indicator boundary and become "no value"
//! (see `data::DataError`).

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoreError {
    #[error("missing weight for indicator '{identity}'")]
    ConfigurationMissing { identity: String },

    #[error("weights could not be loaded from configuration while resolving '{identity}': {reason}")]
    ConfigurationFailure { identity: String, reason: String },

    #[error("weight for '{identity}' must be greater than zero (got {weight})")]
    InvalidWeight { identity: String, weight: f64 },

    #[error("weights in use sum to {total}, expected exactly 1.0")]
    WeightSumInvalid { total: f64 },

    #[error("indicator '{identity}' returned no score")]
    MissingScore { identity: String },

    #[error("score out of range for '{identity}': {score}")]
    ScoreOutOfRange { identity: String, score: f64 },

    #[error("insufficient history for '{identity}': only {available}/{required} samples available")]
    InsufficientHistory {
        identity: String,
        available: usize,
        required: usize,
    },
}

impl ScoreError {
    /// Identity of the indicator the error is attributed to, if any.
    pub fn identity(&self) -> Option<&str> {
        match self {
            ScoreError::ConfigurationMissing { identity }
            | ScoreError::ConfigurationFailure { identity, .. }
            | ScoreError::InvalidWeight { identity, .. }
            | ScoreError::MissingScore { identity }
            | ScoreError::ScoreOutOfRange { identity, .. }
            | ScoreError::InsufficientHistory { identity, .. } => Some(identity),
            ScoreError::WeightSumInvalid { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_indicator() {
        let err = ScoreError::InvalidWeight {
            identity: "vix".into(),
            weight: 0.0,
        };
        assert_eq!(
            err.to_string(),
            "weight for 'vix' must be greater than zero (got 0)"
        );
        assert_eq!(err.identity(), Some("vix"));
    }

    #[test]
    fn weight_sum_has_no_identity() {
        let err = ScoreError::WeightSumInvalid { total: 0.5 };
        assert_eq!(err.identity(), None);
        assert!(err.to_string().contains("0.5"));
    }
}
