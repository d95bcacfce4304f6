//! Production wiring of the four standard indicators' data sources.

use super::circuit_breaker::CircuitBreaker;
use super::dataset::DatasetStore;
use super::fear_greed::CnnFearGreed;
use super::provider::{CloseSource, DataError, SentimentSource, ValuationSource};
use super::valuation::{ShillerColumns, ShillerCsv};
use super::yahoo::{YahooCloses, YahooProvider};
use crate::config::ScoreConfig;
use std::path::Path;
use std::sync::Arc;

/// Data sources for the standard indicator set.
pub struct StandardSources {
    pub sentiment: Box<dyn SentimentSource>,
    pub trend: Box<dyn CloseSource>,
    pub volatility: Box<dyn CloseSource>,
    pub valuation: Box<dyn ValuationSource>,
    /// Index closes for the valuation daily ratio.
    pub valuation_closes: Box<dyn CloseSource>,
}

/// Sources backed by Yahoo Finance, CNN and the Shiller dataset. All price
/// requests share one provider and circuit breaker.
pub fn live_sources(config: &ScoreConfig) -> Result<StandardSources, DataError> {
    let ind = &config.indicators;
    let yahoo = Arc::new(YahooProvider::new(Arc::new(CircuitBreaker::default_provider()))?);

    let sentiment = CnnFearGreed::new(ind.fear_greed.url.clone(), ind.fear_greed.cache_path.clone())?;

    let shiller = &ind.shiller;
    let columns = ShillerColumns {
        date: shiller.date_column,
        real_earnings: shiller.earnings_column,
        cape: shiller.cape_column,
    };
    let mut valuation = ShillerCsv::new(shiller.dataset_path.clone(), columns);
    if let Some(url) = &shiller.dataset_url {
        let dir = shiller
            .dataset_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let file_name = shiller
            .dataset_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| DataError::Dataset(format!("invalid dataset path {}", shiller.dataset_path.display())))?;
        valuation = valuation.with_store(DatasetStore::new(dir, file_name, url.clone())?);
    }

    Ok(StandardSources {
        sentiment: Box::new(sentiment),
        trend: Box::new(YahooCloses::new(Arc::clone(&yahoo), ind.spx.symbol.clone(), ind.spx.history_days)),
        volatility: Box::new(YahooCloses::new(Arc::clone(&yahoo), ind.vix.symbol.clone(), ind.vix.history_days)),
        valuation: Box::new(valuation),
        valuation_closes: Box::new(YahooCloses::new(yahoo, shiller.symbol.clone(), shiller.history_days)),
    })
}
