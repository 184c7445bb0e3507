//! Cache-aware acquisition of quotes and risk-free rates.
//!
//! Symbols are fetched one at a time. The first download failure aborts the
//! run; cache failures are logged and otherwise ignored.

use super::cache_manager;
use capm_data::DataError;
use capm_data::cache::{CacheStats, SqliteCache};
use capm_data::fred::FredClient;
use capm_data::yahoo::quotes::YahooQuoteProvider;
use capm_returns::{RateSeries, RateUnit, ReturnsError};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use indicatif::ProgressBar;
use polars::prelude::*;
use tracing::{debug, warn};

/// Error type for data pipeline operations.
#[derive(Debug, thiserror::Error)]
pub(crate) enum DataPipelineError {
    /// Download or cache error.
    #[error("Data fetch error: {0}")]
    Fetch(#[from] DataError),
    /// Polars DataFrame error.
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
    /// The rate frame could not be turned into a series.
    #[error("Rate series error: {0}")]
    Rates(#[from] ReturnsError),
}

/// Configuration for data fetching.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FetchConfig {
    /// Whether to use the cache.
    pub use_cache: bool,
    /// Whether to force refresh (ignore cached rows, still store new ones).
    pub force_refresh: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            use_cache: true,
            force_refresh: false,
        }
    }
}

impl FetchConfig {
    /// Whether cached rows may be read.
    pub(crate) const fn reads_cache(&self) -> bool {
        self.use_cache && !self.force_refresh
    }

    /// Open the cache if enabled, logging and skipping it when it cannot be opened.
    pub(crate) fn open_cache(&self) -> Option<SqliteCache> {
        if !self.use_cache {
            return None;
        }
        match cache_manager::open_cache() {
            Ok(cache) => Some(cache),
            Err(e) => {
                warn!(error = %e, "cache unavailable, fetching everything");
                None
            }
        }
    }
}

/// Midnight UTC of a calendar date.
pub(crate) fn to_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Split symbols into cached quote frames and symbols still to download.
///
/// Quote windows are `[start, end)`.
pub(crate) fn cached_quotes(
    cache: Option<&SqliteCache>,
    symbols: &[String],
    start: NaiveDate,
    end: NaiveDate,
    config: FetchConfig,
) -> (Vec<DataFrame>, Vec<String>) {
    let mut cached = Vec::new();
    let mut missing = Vec::new();

    for symbol in symbols {
        if config.reads_cache()
            && let Some(cache) = cache
            && cache.has_quotes(symbol, start, end).unwrap_or(false)
            && let Ok(df) = cache.get_quotes(symbol, start, end)
        {
            debug!(symbol = %symbol, rows = df.height(), "quotes from cache");
            cached.push(df);
            continue;
        }
        missing.push(symbol.clone());
    }

    (cached, missing)
}

/// Fetch quotes for every symbol as one long frame.
///
/// Columns: symbol, date, close, adjusted_close.
pub(crate) async fn fetch_quotes(
    provider: &YahooQuoteProvider,
    cache: Option<&SqliteCache>,
    symbols: &[String],
    start: NaiveDate,
    end: NaiveDate,
    config: FetchConfig,
    progress: Option<&ProgressBar>,
) -> Result<DataFrame, DataPipelineError> {
    let (mut frames, missing) = cached_quotes(cache, symbols, start, end, config);

    if let Some(pb) = progress {
        pb.set_length(symbols.len() as u64);
        pb.set_position(frames.len() as u64);
        if missing.is_empty() {
            pb.set_message("Loading from cache...");
        } else {
            pb.set_message(format!("Fetching {} symbols...", missing.len()));
        }
    }

    for symbol in &missing {
        if let Some(pb) = progress {
            pb.set_message(format!("Fetching {}...", symbol));
        }
        let df = provider
            .fetch_quotes(symbol, to_utc(start), to_utc(end))
            .await?;

        if let Some(cache) = cache
            && let Err(e) = cache.put_quotes(&df)
        {
            warn!(symbol = %symbol, error = %e, "failed to cache quotes");
        }
        frames.push(df);

        if let Some(pb) = progress {
            pb.inc(1);
        }
    }

    if frames.is_empty() {
        return Err(DataError::MissingData {
            symbol: "batch".to_string(),
            reason: "No symbols requested".to_string(),
        }
        .into());
    }

    let lazy: Vec<LazyFrame> = frames.into_iter().map(IntoLazy::lazy).collect();
    Ok(concat(lazy, UnionArgs::default())?.collect()?)
}

/// Fetch a risk-free series over the inclusive window `[start, end]`.
pub(crate) async fn fetch_rates(
    client: &FredClient,
    cache: Option<&SqliteCache>,
    series_id: &str,
    start: NaiveDate,
    end: NaiveDate,
    unit: RateUnit,
    config: FetchConfig,
) -> Result<RateSeries, DataPipelineError> {
    if config.reads_cache()
        && let Some(cache) = cache
        && cache.has_rates(series_id, start, end).unwrap_or(false)
        && let Ok(df) = cache.get_rates(series_id, start, end)
    {
        debug!(series_id, rows = df.height(), "rates from cache");
        return Ok(RateSeries::new(df, unit)?);
    }

    let df = client.get_series(series_id, start, end).await?;
    if let Some(cache) = cache
        && let Err(e) = cache.put_rates(series_id, &df)
    {
        warn!(series_id, error = %e, "failed to cache rates");
    }

    Ok(RateSeries::new(df, unit)?)
}

/// Statistics of the default cache, if it can be opened.
pub(crate) fn cache_stats() -> Option<CacheStats> {
    cache_manager::open_cache()
        .ok()
        .and_then(|cache| cache.get_stats().ok())
}

/// Print cache location info.
pub(crate) fn print_cache_info() {
    let path = cache_manager::cache_path();
    println!("  Cache location: {}", path.display());
    if let Some(stats) = cache_stats() {
        println!(
            "  Cached data: {} quotes for {} symbols, {} rates for {} series",
            stats.total_quotes, stats.unique_symbols, stats.total_rates, stats.unique_series
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, m, d).unwrap()
    }

    fn quotes_frame(symbol: &str, dates: &[&str], closes: &[f64]) -> DataFrame {
        DataFrame::new(vec![
            Series::new("symbol".into(), vec![symbol; dates.len()]).into(),
            Series::new("date".into(), dates.to_vec()).into(),
            Series::new("close".into(), closes.to_vec()).into(),
            Series::new("adjusted_close".into(), closes.to_vec()).into(),
        ])
        .unwrap()
        .lazy()
        .with_column(col("date").cast(DataType::Date))
        .collect()
        .unwrap()
    }

    fn seeded_cache() -> SqliteCache {
        let cache = SqliteCache::in_memory().unwrap();
        cache
            .put_quotes(&quotes_frame(
                "AAPL",
                &["2021-01-04", "2021-01-05"],
                &[129.41, 131.01],
            ))
            .unwrap();
        cache
    }

    fn symbols() -> Vec<String> {
        vec!["AAPL".to_string(), "^GSPC".to_string()]
    }

    #[test]
    fn test_to_utc_is_midnight() {
        let dt = to_utc(date(1, 4));
        assert_eq!(dt.date_naive(), date(1, 4));
        assert_eq!(dt.hour(), 0);
        assert_eq!(dt.minute(), 0);
    }

    #[test]
    fn test_cached_quotes_split() {
        let cache = seeded_cache();
        let (cached, missing) = cached_quotes(
            Some(&cache),
            &symbols(),
            date(1, 4),
            date(1, 6),
            FetchConfig::default(),
        );
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].height(), 2);
        assert_eq!(missing, vec!["^GSPC"]);
    }

    #[test]
    fn test_refresh_ignores_cache() {
        let cache = seeded_cache();
        let config = FetchConfig {
            use_cache: true,
            force_refresh: true,
        };
        let (cached, missing) =
            cached_quotes(Some(&cache), &symbols(), date(1, 4), date(1, 6), config);
        assert!(cached.is_empty());
        assert_eq!(missing, symbols());
    }

    #[test]
    fn test_no_cache() {
        let (cached, missing) =
            cached_quotes(None, &symbols(), date(1, 4), date(1, 6), FetchConfig::default());
        assert!(cached.is_empty());
        assert_eq!(missing.len(), 2);
    }

    #[test]
    fn test_partial_coverage_is_refetched() {
        let cache = seeded_cache();
        let (cached, missing) = cached_quotes(
            Some(&cache),
            &symbols(),
            date(1, 1),
            date(4, 1),
            FetchConfig::default(),
        );
        assert!(cached.is_empty());
        assert_eq!(missing.len(), 2);
    }

    #[test]
    fn test_stale_tail_is_refetched() {
        let cache = SqliteCache::in_memory().unwrap();
        let dates: Vec<String> = date(1, 1)
            .iter_days()
            .take_while(|d| d.year() == 2021)
            .filter(|d| d.weekday().number_from_monday() <= 5)
            .map(|d| d.to_string())
            .collect();
        let dates: Vec<&str> = dates.iter().map(String::as_str).collect();
        cache
            .put_quotes(&quotes_frame("AAPL", &dates, &vec![130.0; dates.len()]))
            .unwrap();

        let symbols = vec!["AAPL".to_string()];
        let end_of_year = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
        let (cached, missing) = cached_quotes(
            Some(&cache),
            &symbols,
            date(1, 1),
            end_of_year,
            FetchConfig::default(),
        );
        assert_eq!(cached.len(), 1);
        assert!(missing.is_empty());

        // Six weeks past the cached rows
        let mid_february = NaiveDate::from_ymd_opt(2022, 2, 15).unwrap();
        let (cached, missing) = cached_quotes(
            Some(&cache),
            &symbols,
            date(1, 1),
            mid_february,
            FetchConfig::default(),
        );
        assert!(cached.is_empty());
        assert_eq!(missing, symbols);
    }

    #[test]
    fn test_fetch_config_flags() {
        assert!(FetchConfig::default().reads_cache());
        let disabled = FetchConfig {
            use_cache: false,
            force_refresh: false,
        };
        assert!(!disabled.reads_cache());
        assert!(disabled.open_cache().is_none());
    }
}
