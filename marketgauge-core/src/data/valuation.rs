//! Shiller valuation dataset (CSV export of the "Data" sheet).
//!
//! Rows are located by column index, not by header: the sheet carries several
//! banner rows above the real header, and every row whose date column is not a
//! `YYYY.MM` month is skipped. Shiller writes October as `YYYY.1`, so a
//! single-digit fraction is read as tenths.

use super::dataset::DatasetStore;
use super::provider::{DataError, ValuationSample, ValuationSource};
use chrono::NaiveDate;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Column positions in the exported sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShillerColumns {
    pub date: usize,
    pub real_earnings: usize,
    pub cape: usize,
}

impl Default for ShillerColumns {
    fn default() -> Self {
        Self {
            date: 0,
            real_earnings: 10,
            cape: 12,
        }
    }
}

/// Parse a Shiller month stamp (`1871.01`, `2025.1`, `2025.10`) into the
/// first day of that month.
pub fn parse_month(raw: &str) -> Option<NaiveDate> {
    let (year, frac) = raw.trim().split_once('.')?;
    let year: i32 = year.parse().ok()?;
    let month: u32 = match frac.len() {
        1 => frac.parse::<u32>().ok()? * 10,
        2 => frac.parse().ok()?,
        _ => return None,
    };
    NaiveDate::from_ymd_opt(year, month, 1)
}

fn parse_value(raw: Option<&str>) -> Option<f64> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Read every dated row from a CSV reader, oldest first.
pub fn read_samples<R: Read>(reader: R, columns: ShillerColumns) -> Result<Vec<ValuationSample>, DataError> {
    let mut csv = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut samples = Vec::new();
    for record in csv.records() {
        let record = record.map_err(|e| DataError::Dataset(format!("csv: {e}")))?;
        let Some(month) = record.get(columns.date).and_then(parse_month) else {
            continue;
        };
        samples.push(ValuationSample {
            month,
            real_earnings: parse_value(record.get(columns.real_earnings)),
            cape: parse_value(record.get(columns.cape)),
        });
    }

    if samples.is_empty() {
        return Err(DataError::Dataset("no dated rows in valuation dataset".into()));
    }
    samples.sort_by_key(|s| s.month);
    Ok(samples)
}

pub fn read_samples_from_path(path: &Path, columns: ShillerColumns) -> Result<Vec<ValuationSample>, DataError> {
    let file = std::fs::File::open(path)
        .map_err(|e| DataError::Dataset(format!("open {}: {e}", path.display())))?;
    read_samples(file, columns)
}

/// `ValuationSource` over a local CSV, optionally refreshed from a
/// `DatasetStore` before each read.
pub struct ShillerCsv {
    path: PathBuf,
    store: Option<DatasetStore>,
    columns: ShillerColumns,
}

impl ShillerCsv {
    pub fn new(path: impl Into<PathBuf>, columns: ShillerColumns) -> Self {
        Self {
            path: path.into(),
            store: None,
            columns,
        }
    }

    pub fn with_store(mut self, store: DatasetStore) -> Self {
        self.store = Some(store);
        self
    }
}

impl ValuationSource for ShillerCsv {
    fn samples(&self, date: NaiveDate) -> Result<Vec<ValuationSample>, DataError> {
        let path = match &self.store {
            Some(store) => match store.refresh(date) {
                Ok(path) => path,
                Err(e) if self.path.exists() => {
                    warn!(error = %e, path = %self.path.display(), "dataset refresh failed, reading configured file");
                    self.path.clone()
                }
                Err(e) => return Err(e),
            },
            None => self.path.clone(),
        };
        read_samples_from_path(&path, self.columns)
    }
}
