//! CNN Fear & Greed history.
//!
//! The graphdata endpoint returns the full daily history as
//! `{"fear_and_greed_historical": {"data": [{"x": ms, "y": value, "rating": ".."}]}}`.
//! It is transformed into dated records and cached as JSON; the cache is
//! reused while its modification date is today and serves as the fallback
//! when a download fails.

use super::provider::{DataError, SentimentReading, SentimentSource};
use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_URL: &str = "https://production.dataviz.cnn.io/index/fearandgreed/graphdata";

#[derive(Debug, Deserialize)]
struct GraphData {
    fear_and_greed_historical: Historical,
}

#[derive(Debug, Deserialize)]
struct Historical {
    data: Vec<GraphPoint>,
}

#[derive(Debug, Deserialize)]
struct GraphPoint {
    x: f64,
    y: f64,
    #[serde(default)]
    rating: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FearGreedRecord {
    pub date: NaiveDate,
    pub value: f64,
    pub rating: String,
}

/// Daily Fear & Greed records, oldest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FearGreedHistory {
    pub records: Vec<FearGreedRecord>,
}

impl FearGreedHistory {
    /// Parse the raw graphdata payload.
    pub fn from_graphdata(body: &str) -> Result<Self, DataError> {
        let raw: GraphData = serde_json::from_str(body).map_err(|e| {
            DataError::ResponseFormatChanged(format!("unsupported Fear & Greed payload: {e}"))
        })?;

        let mut records = raw
            .fear_and_greed_historical
            .data
            .into_iter()
            .map(|point| {
                let date = DateTime::from_timestamp_millis(point.x as i64)
                    .map(|dt| dt.date_naive())
                    .ok_or_else(|| {
                        DataError::ResponseFormatChanged(format!("invalid timestamp: {}", point.x))
                    })?;
                Ok(FearGreedRecord {
                    date,
                    value: point.y,
                    rating: point.rating,
                })
            })
            .collect::<Result<Vec<_>, DataError>>()?;

        records.sort_by_key(|r| r.date);
        Ok(Self { records })
    }

    /// Record for exactly `date`.
    pub fn lookup(&self, date: NaiveDate) -> Result<&FearGreedRecord, DataError> {
        let (Some(first), Some(last)) = (self.records.first(), self.records.last()) else {
            return Err(DataError::Dataset("Fear & Greed history is empty".into()));
        };

        if date < first.date || date > last.date {
            return Err(DataError::DateOutOfRange {
                date,
                first: first.date,
                last: last.date,
            });
        }

        self.records
            .binary_search_by_key(&date, |r| r.date)
            .map(|i| &self.records[i])
            .map_err(|_| DataError::NoRecord { date })
    }
}

/// `SentimentSource` backed by the CNN endpoint and a JSON file cache.
pub struct CnnFearGreed {
    client: reqwest::blocking::Client,
    url: String,
    cache_path: PathBuf,
}

impl CnnFearGreed {
    pub fn new(url: impl Into<String>, cache_path: impl Into<PathBuf>) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: url.into(),
            cache_path: cache_path.into(),
        })
    }

    /// Current history: today's cache if present, otherwise a fresh download,
    /// otherwise any older cache.
    pub fn history(&self) -> Result<FearGreedHistory, DataError> {
        if cache_is_from_today(&self.cache_path) {
            if let Ok(history) = read_cache(&self.cache_path) {
                return Ok(history);
            }
        }

        match self.download() {
            Ok(history) => {
                if let Err(e) = write_cache(&self.cache_path, &history) {
                    warn!(path = %self.cache_path.display(), error = %e, "could not write Fear & Greed cache");
                }
                Ok(history)
            }
            Err(e) => {
                warn!(error = %e, "Fear & Greed download failed, falling back to cache");
                read_cache(&self.cache_path).map_err(|_| e)
            }
        }
    }

    fn download(&self) -> Result<FearGreedHistory, DataError> {
        info!(url = %self.url, "downloading Fear & Greed history");
        let resp = self
            .client
            .get(&self.url)
            .header("Accept", "application/json")
            .header("Referer", "https://money.cnn.com/data/fear-and-greed/")
            .header("Origin", "https://money.cnn.com")
            .send()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(DataError::RateLimited {
                retry_after_secs: 60,
            });
        }
        if !status.is_success() {
            return Err(DataError::Other(format!("HTTP {status} from Fear & Greed endpoint")));
        }

        let body = resp
            .text()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;
        FearGreedHistory::from_graphdata(&body)
    }
}

impl SentimentSource for CnnFearGreed {
    fn reading(&self, date: NaiveDate) -> Result<SentimentReading, DataError> {
        let history = self.history()?;
        let record = history.lookup(date)?;
        Ok(SentimentReading::new(record.value, record.rating.clone()))
    }
}

fn cache_is_from_today(path: &Path) -> bool {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .map(|modified| DateTime::<Local>::from(modified).date_naive() == Local::now().date_naive())
        .unwrap_or(false)
}

fn read_cache(path: &Path) -> Result<FearGreedHistory, DataError> {
    let content = fs::read_to_string(path)
        .map_err(|e| DataError::Dataset(format!("read {}: {e}", path.display())))?;
    let history: FearGreedHistory = serde_json::from_str(&content)
        .map_err(|e| DataError::Dataset(format!("corrupt cache {}: {e}", path.display())))?;
    if history.records.is_empty() {
        return Err(DataError::Dataset(format!("empty cache {}", path.display())));
    }
    Ok(history)
}

fn write_cache(path: &Path, history: &FearGreedHistory) -> Result<(), DataError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| DataError::Dataset(format!("create {}: {e}", parent.display())))?;
    }
    let json = serde_json::to_string(history)
        .map_err(|e| DataError::Dataset(format!("serialize cache: {e}")))?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).map_err(|e| DataError::Dataset(format!("write cache: {e}")))?;
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        DataError::Dataset(format!("atomic rename failed: {e}"))
    })
}
