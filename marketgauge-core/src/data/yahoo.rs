//! Yahoo Finance chart API: daily bars and the `CloseSource` adapter used by
//! the trend, volatility and valuation indicators.
//!
//! The endpoint is unofficial and changes format without notice; parse
//! failures surface as `DataError::ResponseFormatChanged`.

use super::circuit_breaker::CircuitBreaker;
use super::provider::{CloseSource, DataError, RawBar};
use chrono::{Duration as Days, NaiveDate};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjCloseData>>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<u64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    adjclose: Vec<Option<f64>>,
}

pub struct YahooProvider {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
    max_retries: u32,
    base_delay: Duration,
}

impl YahooProvider {
    pub fn new(circuit_breaker: Arc<CircuitBreaker>) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            circuit_breaker,
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        })
    }

    fn chart_url(symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
        let start_ts = start.and_time(chrono::NaiveTime::MIN).and_utc().timestamp();
        let end_ts = end.and_time(chrono::NaiveTime::MIN).and_utc().timestamp() + 86_399;
        format!(
            "https://query2.finance.yahoo.com/v8/finance/chart/{symbol}\
             ?period1={start_ts}&period2={end_ts}&interval=1d\
             &includeAdjustedClose=true"
        )
    }

    fn parse_response(symbol: &str, resp: ChartResponse) -> Result<Vec<RawBar>, DataError> {
        let result = resp.chart.result.ok_or_else(|| match resp.chart.error {
            Some(err) if err.code == "Not Found" => DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            },
            Some(err) => {
                DataError::ResponseFormatChanged(format!("{}: {}", err.code, err.description))
            }
            None => DataError::ResponseFormatChanged("empty result with no error".into()),
        })?;

        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("result array is empty".into()))?;

        let timestamps = data
            .timestamp
            .ok_or_else(|| DataError::ResponseFormatChanged("no timestamps".into()))?;

        let quote = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("no quote data".into()))?;

        let adj_closes = data
            .indicators
            .adjclose
            .and_then(|v| v.into_iter().next())
            .map(|a| a.adjclose);

        let mut bars = Vec::with_capacity(timestamps.len());
        for (i, &ts) in timestamps.iter().enumerate() {
            let date = chrono::DateTime::from_timestamp(ts, 0)
                .map(|dt| dt.naive_utc().date())
                .ok_or_else(|| {
                    DataError::ResponseFormatChanged(format!("invalid timestamp: {ts}"))
                })?;

            let close = quote.close.get(i).copied().flatten();
            // Holidays come back as all-null rows.
            let Some(close) = close else { continue };

            bars.push(RawBar {
                date,
                open: quote.open.get(i).copied().flatten().unwrap_or(f64::NAN),
                high: quote.high.get(i).copied().flatten().unwrap_or(f64::NAN),
                low: quote.low.get(i).copied().flatten().unwrap_or(f64::NAN),
                close,
                volume: quote.volume.get(i).copied().flatten().unwrap_or(0),
                adj_close: adj_closes
                    .as_ref()
                    .and_then(|v| v.get(i).copied().flatten())
                    .unwrap_or(close),
            });
        }

        if bars.is_empty() {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }

        Ok(bars)
    }

    /// Daily bars for `symbol` between `start` and `end` inclusive, oldest first.
    pub fn daily_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawBar>, DataError> {
        let url = Self::chart_url(symbol, start, end);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                std::thread::sleep(self.base_delay * 2u32.pow(attempt - 1));
            }

            if !self.circuit_breaker.is_allowed() {
                return Err(DataError::CircuitBreakerTripped);
            }

            debug!(symbol, attempt, %start, %end, "requesting daily bars");
            let resp = match self.client.get(&url).send() {
                Ok(resp) => resp,
                Err(e) if e.is_connect() || e.is_timeout() => {
                    last_error = Some(DataError::NetworkUnreachable(e.to_string()));
                    continue;
                }
                Err(e) => return Err(DataError::NetworkUnreachable(e.to_string())),
            };

            let status = resp.status();
            if status == reqwest::StatusCode::FORBIDDEN {
                self.circuit_breaker.trip();
                return Err(DataError::CircuitBreakerTripped);
            }

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                self.circuit_breaker.record_failure();
                let retry_after = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                last_error = Some(DataError::RateLimited {
                    retry_after_secs: retry_after,
                });
                continue;
            }

            if !status.is_success() {
                self.circuit_breaker.record_failure();
                last_error = Some(DataError::Other(format!("HTTP {status} for {symbol}")));
                continue;
            }

            let chart: ChartResponse = resp.json().map_err(|e| {
                DataError::ResponseFormatChanged(format!(
                    "failed to parse response for {symbol}: {e}"
                ))
            })?;

            let mut bars = Self::parse_response(symbol, chart)?;
            self.circuit_breaker.record_success();
            bars.sort_by_key(|b| b.date);
            return Ok(bars);
        }

        Err(last_error.unwrap_or_else(|| DataError::Other("max retries exceeded".into())))
    }
}

/// `CloseSource` for one symbol: the closes of the last `lookback_days`
/// calendar days ending at the requested date.
pub struct YahooCloses {
    provider: Arc<YahooProvider>,
    symbol: String,
    lookback_days: i64,
}

impl YahooCloses {
    pub fn new(provider: Arc<YahooProvider>, symbol: impl Into<String>, lookback_days: u32) -> Self {
        Self {
            provider,
            symbol: symbol.into(),
            lookback_days: i64::from(lookback_days.max(1)),
        }
    }
}

impl CloseSource for YahooCloses {
    fn closes(&self, date: NaiveDate) -> Result<Vec<f64>, DataError> {
        let start = date
            .checked_sub_signed(Days::days(self.lookback_days))
            .ok_or_else(|| DataError::Other(format!("lookback of {} days before {date} is out of range", self.lookback_days)))?;
        let bars = self.provider.daily_bars(&self.symbol, start, date)?;
        Ok(closes_through(&bars, date))
    }
}

/// Finite closes of the bars dated on or before `date`.
pub fn closes_through(bars: &[RawBar], date: NaiveDate) -> Vec<f64> {
    bars.iter()
        .filter(|b| b.date <= date && b.close.is_finite())
        .map(|b| b.close)
        .collect()
}
