//! Quote data fetching from Yahoo Finance.

use crate::error::{DataError, Result};
use chrono::{DateTime, Utc};
use polars::prelude::*;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;
use yahoo_finance_api as yahoo;

/// Default delay between consecutive requests.
const DEFAULT_RATE_LIMIT: Duration = Duration::from_millis(500);

/// Yahoo Finance quote provider with rate limiting.
pub struct YahooQuoteProvider {
    provider: yahoo::YahooConnector,
    rate_limit_delay: Duration,
}

impl std::fmt::Debug for YahooQuoteProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YahooQuoteProvider")
            .field("rate_limit_delay", &self.rate_limit_delay)
            .finish_non_exhaustive()
    }
}

impl YahooQuoteProvider {
    /// Create a new Yahoo Finance quote provider that sleeps 500 ms after each request.
    pub fn new() -> Result<Self> {
        Self::with_rate_limit(DEFAULT_RATE_LIMIT)
    }

    /// Create a new Yahoo Finance quote provider that sleeps `rate_limit_delay`
    /// after each request.
    pub fn with_rate_limit(rate_limit_delay: Duration) -> Result<Self> {
        Ok(Self {
            provider: yahoo::YahooConnector::new()?,
            rate_limit_delay,
        })
    }

    /// Fetch daily closing prices for a single symbol.
    ///
    /// The window is half-open: `start` is included, `end` is not.
    ///
    /// # Arguments
    /// * `symbol` - The ticker symbol (e.g., "AAPL" or "^GSPC")
    /// * `start` - Start of the window
    /// * `end` - End of the window
    ///
    /// # Returns
    /// A Polars DataFrame with columns: symbol, date, close, adjusted_close
    pub async fn fetch_quotes(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<DataFrame> {
        if start > end {
            return Err(DataError::InvalidDateRange {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }

        if symbol.is_empty() {
            return Err(DataError::InvalidSymbol("Empty symbol".to_string()));
        }

        let start_time = time::OffsetDateTime::from_unix_timestamp(start.timestamp())
            .map_err(|e| DataError::TimeConversion(e.to_string()))?;
        let end_time = time::OffsetDateTime::from_unix_timestamp(end.timestamp())
            .map_err(|e| DataError::TimeConversion(e.to_string()))?;

        debug!(symbol, %start, %end, "requesting quote history");
        let response = self
            .provider
            .get_quote_history(symbol, start_time, end_time)
            .await?;

        let quotes = response
            .quotes()
            .map_err(|e| DataError::YahooApi(e.to_string()))?;

        if quotes.is_empty() {
            return Err(DataError::MissingData {
                symbol: symbol.to_string(),
                reason: "No data returned from Yahoo Finance".to_string(),
            });
        }

        let timestamps: Vec<i64> = quotes.iter().map(|q| q.timestamp as i64).collect();
        let closes: Vec<f64> = quotes.iter().map(|q| q.close).collect();
        let adj_closes: Vec<f64> = quotes.iter().map(|q| q.adjclose).collect();

        let df = DataFrame::new(vec![
            Series::new("symbol".into(), vec![symbol; timestamps.len()]).into(),
            Series::new("timestamp".into(), timestamps).into(),
            Series::new("close".into(), closes).into(),
            Series::new("adjusted_close".into(), adj_closes).into(),
        ])?;

        // Yahoo stamps daily bars at the exchange open; truncating to a date is enough.
        let df = df
            .lazy()
            .with_column(
                (col("timestamp") * lit(1_000_000_000))
                    .cast(DataType::Datetime(TimeUnit::Nanoseconds, None))
                    .cast(DataType::Date)
                    .alias("date"),
            )
            .select([
                col("symbol"),
                col("date"),
                col("close"),
                col("adjusted_close"),
            ])
            .sort(["date"], SortMultipleOptions::default())
            .collect()?;

        debug!(symbol, rows = df.height(), "received quotes");

        sleep(self.rate_limit_delay).await;

        Ok(df)
    }

    /// Fetch closing prices for multiple symbols, one request at a time.
    ///
    /// The first failing symbol aborts the batch and its error is returned.
    ///
    /// # Returns
    /// A long Polars DataFrame with all symbols stacked
    pub async fn fetch_quotes_batch(
        &self,
        symbols: &[String],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<DataFrame> {
        if symbols.is_empty() {
            return Err(DataError::InvalidSymbol("Empty symbol list".to_string()));
        }

        let mut dfs = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            let df = self.fetch_quotes(symbol, start, end).await?;
            dfs.push(df.lazy());
        }

        let combined = concat(dfs, UnionArgs::default())?.collect()?;

        Ok(combined)
    }
}
