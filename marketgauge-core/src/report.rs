//! Report sinks: where indicators and the aggregator publish their results.
//!
//! The scoring core calls a sink synchronously and never looks at the outcome.
//! Persistent sinks log their own failures.

use chrono::{Local, NaiveDate};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::{debug, warn};

/// Key under which the composite score is stored in the market report.
pub const COMPOSITE_KEY: &str = "score_calculator";

pub type Fields = Map<String, Value>;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("report I/O on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("report serialization: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub trait ReportSink: Send + Sync {
    /// Merge `fields` into the entry of `identity`, stamped with `date`.
    fn record_indicator(&self, identity: &str, date: NaiveDate, fields: Fields);

    fn record_composite(&self, value: f64, date: NaiveDate);
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReport;

impl ReportSink for NullReport {
    fn record_indicator(&self, _identity: &str, _date: NaiveDate, _fields: Fields) {}
    fn record_composite(&self, _value: f64, _date: NaiveDate) {}
}

/// In-memory sink for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryReport {
    indicators: Mutex<BTreeMap<String, (NaiveDate, Fields)>>,
    composite: Mutex<Option<(f64, NaiveDate)>>,
}

impl MemoryReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merged fields and last date recorded for `identity`.
    pub fn indicator(&self, identity: &str) -> Option<(NaiveDate, Fields)> {
        lock(&self.indicators).get(identity).cloned()
    }

    pub fn identities(&self) -> Vec<String> {
        lock(&self.indicators).keys().cloned().collect()
    }

    pub fn composite(&self) -> Option<(f64, NaiveDate)> {
        *lock(&self.composite)
    }
}

impl ReportSink for MemoryReport {
    fn record_indicator(&self, identity: &str, date: NaiveDate, fields: Fields) {
        let mut indicators = lock(&self.indicators);
        let entry = indicators
            .entry(identity.to_string())
            .or_insert_with(|| (date, Fields::new()));
        entry.0 = date;
        entry.1.extend(fields);
    }

    fn record_composite(&self, value: f64, date: NaiveDate) {
        *lock(&self.composite) = Some((value, date));
    }
}

/// The persistent market report: one JSON object keyed by identity.
///
/// ```json
/// {
///   "spx": { "calc_date": "2025-12-15", "timestamp": "...", "sma_value": 6301.2, ... },
///   "score_calculator": { "value": 57, "date": "2025-12-15" }
/// }
/// ```
#[derive(Debug)]
pub struct JsonFileReport {
    path: PathBuf,
    data: Mutex<Fields>,
}

impl JsonFileReport {
    /// Open the report at `path`. A missing file starts empty; a corrupt one
    /// starts empty with a warning and is overwritten on the next save.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<Value>(&content) {
                Ok(Value::Object(map)) => map,
                Ok(_) | Err(_) => {
                    warn!(path = %path.display(), "market report is corrupt, starting empty");
                    Fields::new()
                }
            },
            Err(_) => Fields::new(),
        };
        Self {
            path,
            data: Mutex::new(data),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        lock(&self.data).get(key).cloned()
    }

    pub fn all(&self) -> Fields {
        lock(&self.data).clone()
    }

    pub fn try_record_indicator(&self, identity: &str, date: NaiveDate, fields: Fields) -> Result<(), ReportError> {
        let mut data = lock(&self.data);
        let entry = data
            .entry(identity.to_string())
            .or_insert_with(|| Value::Object(Fields::new()));
        if !entry.is_object() {
            *entry = Value::Object(Fields::new());
        }
        if let Value::Object(entry) = entry {
            entry.insert("calc_date".into(), Value::String(date.to_string()));
            entry.insert(
                "timestamp".into(),
                Value::String(Local::now().naive_local().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()),
            );
            entry.extend(fields);
        }
        self.save(&data)
    }

    /// Store the composite rounded to the nearest integer (ties to even).
    pub fn try_record_composite(&self, value: f64, date: NaiveDate) -> Result<(), ReportError> {
        let mut data = lock(&self.data);
        let mut entry = Fields::new();
        entry.insert("value".into(), Value::from(value.round_ties_even() as i64));
        entry.insert("date".into(), Value::String(date.to_string()));
        data.insert(COMPOSITE_KEY.into(), Value::Object(entry));
        self.save(&data)
    }

    pub fn clear(&self) -> Result<(), ReportError> {
        let mut data = lock(&self.data);
        data.clear();
        self.save(&data)
    }

    /// Whether `identity` was calculated no more than `max_age_days` before `today`.
    pub fn is_up_to_date(&self, identity: &str, max_age_days: i64, today: NaiveDate) -> bool {
        lock(&self.data)
            .get(identity)
            .and_then(|entry| entry.get("calc_date"))
            .and_then(Value::as_str)
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
            .is_some_and(|calc| (today - calc).num_days() <= max_age_days)
    }

    fn save(&self, data: &Fields) -> Result<(), ReportError> {
        let io_err = |source| ReportError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(data)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            io_err(e)
        })?;
        debug!(path = %self.path.display(), "market report saved");
        Ok(())
    }
}

impl ReportSink for JsonFileReport {
    fn record_indicator(&self, identity: &str, date: NaiveDate, fields: Fields) {
        if let Err(e) = self.try_record_indicator(identity, date, fields) {
            warn!(identity, error = %e, "failed to record indicator in market report");
        }
    }

    fn record_composite(&self, value: f64, date: NaiveDate) {
        if let Err(e) = self.try_record_composite(value, date) {
            warn!(error = %e, "failed to record composite in market report");
        }
    }
}
