//! Identity → weight lookup.
//!
//! Resolution never fails: a missing entry and an unreadable weight table
//! come back as distinct `ResolvedWeight` variants so the aggregator can
//! raise the matching error.

use crate::error::ScoreError;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedWeight {
    Configured(f64),
    /// No entry for the identity.
    NotFound,
    /// The weight configuration itself could not be read.
    Unavailable(String),
}

#[derive(Debug, Clone)]
pub struct WeightResolver {
    table: Result<HashMap<String, toml::Value>, String>,
}

impl WeightResolver {
    pub fn new<I, K>(weights: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        let table = weights
            .into_iter()
            .map(|(k, w)| (k.into(), toml::Value::Float(w)))
            .collect();
        Self { table: Ok(table) }
    }

    /// Build from the raw `[weights]` value of the configuration. An absent
    /// section means every identity is unconfigured.
    pub fn from_toml(weights: Option<&toml::Value>) -> Self {
        let table = match weights {
            None => Ok(HashMap::new()),
            Some(toml::Value::Table(table)) => Ok(table
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()),
            Some(other) => Err(format!("[weights] must be a table, found {}", other.type_str())),
        };
        Self { table }
    }

    pub fn resolve(&self, identity: &str) -> ResolvedWeight {
        let table = match &self.table {
            Ok(table) => table,
            Err(reason) => return ResolvedWeight::Unavailable(reason.clone()),
        };
        match table.get(identity) {
            None => ResolvedWeight::NotFound,
            Some(toml::Value::Float(w)) => ResolvedWeight::Configured(*w),
            Some(toml::Value::Integer(w)) => ResolvedWeight::Configured(*w as f64),
            Some(other) => ResolvedWeight::Unavailable(format!(
                "weight for '{identity}' is a {}, expected a number",
                other.type_str()
            )),
        }
    }

    /// Resolve and validate a weight: configured and strictly positive.
    pub fn weight(&self, identity: &str) -> Result<f64, ScoreError> {
        match self.resolve(identity) {
            ResolvedWeight::NotFound => Err(ScoreError::ConfigurationMissing {
                identity: identity.to_string(),
            }),
            ResolvedWeight::Unavailable(reason) => Err(ScoreError::ConfigurationFailure {
                identity: identity.to_string(),
                reason,
            }),
            // NaN fails this check too.
            ResolvedWeight::Configured(weight) if !(weight > 0.0) => Err(ScoreError::InvalidWeight {
                identity: identity.to_string(),
                weight,
            }),
            ResolvedWeight::Configured(weight) => Ok(weight),
        }
    }
}
