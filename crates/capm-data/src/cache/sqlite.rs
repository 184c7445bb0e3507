//! SQLite caching layer for quotes and rate observations.

use crate::error::{DataError, Result};
use chrono::{NaiveDate, Utc};
use polars::prelude::*;
use rusqlite::{Connection, params};
use std::path::Path;

/// Share of calendar days expected to carry an observation.
///
/// Exchanges and FRED daily series both skip weekends and holidays, which
/// leaves roughly 252 of 365 days; the margin absorbs holiday clusters.
const COVERAGE_RATIO: f64 = 0.6;

/// Largest gap in calendar days tolerated between a requested window edge and
/// the nearest cached row: a weekend plus a holiday and a non-publication day.
const EDGE_TOLERANCE_DAYS: i64 = 5;

type SpanRow = (i64, Option<String>, Option<String>);

/// Row count and first/last date of the cached rows inside a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CachedSpan {
    count: i64,
    first: Option<NaiveDate>,
    last: Option<NaiveDate>,
}

impl CachedSpan {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SpanRow> {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?))
    }

    fn parse((count, first, last): SpanRow) -> Result<Self> {
        let parse = |date: Option<String>| -> Result<Option<NaiveDate>> {
            date.map(|d| {
                d.parse::<NaiveDate>()
                    .map_err(|e| DataError::Parse(format!("Invalid cached date {}: {}", d, e)))
            })
            .transpose()
        };
        Ok(Self {
            count,
            first: parse(first)?,
            last: parse(last)?,
        })
    }

    /// Whether the rows are dense enough and reach both `first_day` and
    /// `last_day` within the edge tolerance.
    fn covers(&self, first_day: NaiveDate, last_day: NaiveDate, expected_rows: i64) -> bool {
        let (Some(first), Some(last)) = (self.first, self.last) else {
            return false;
        };
        self.count > 0
            && self.count >= expected_rows
            && (first - first_day).num_days() <= EDGE_TOLERANCE_DAYS
            && (last_day - last).num_days() <= EDGE_TOLERANCE_DAYS
    }
}

/// SQLite cache for market data.
#[derive(Debug)]
pub struct SqliteCache {
    conn: Connection,
}

impl SqliteCache {
    /// Create a new SQLite cache.
    ///
    /// # Arguments
    /// * `path` - Path to the SQLite database file
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let cache = Self { conn };
        cache.initialize_schema()?;
        Ok(cache)
    }

    /// Create an in-memory cache (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let cache = Self { conn };
        cache.initialize_schema()?;
        Ok(cache)
    }

    fn initialize_schema(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS quotes (
                symbol TEXT NOT NULL,
                date TEXT NOT NULL,
                close REAL NOT NULL,
                adjusted_close REAL NOT NULL,
                cached_at TEXT NOT NULL,
                PRIMARY KEY (symbol, date)
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_quotes_symbol_date ON quotes(symbol, date)",
            [],
        )?;

        // NULL values are FRED's missing observations and are kept so that a
        // cached window is indistinguishable from a fresh download.
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS rate_observations (
                series_id TEXT NOT NULL,
                date TEXT NOT NULL,
                value REAL,
                cached_at TEXT NOT NULL,
                PRIMARY KEY (series_id, date)
            )",
            [],
        )?;

        Ok(())
    }

    fn expected_rows(start: NaiveDate, end: NaiveDate) -> i64 {
        let days = (end - start).num_days().max(0);
        (days as f64 * COVERAGE_RATIO) as i64
    }

    /// Check if quotes are cached for a symbol over `[start, end)`.
    ///
    /// The cached rows must be dense enough and must start and finish within
    /// a few days of the window edges, so a window cached by an earlier,
    /// shorter run is a miss.
    pub fn has_quotes(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<bool> {
        let row = self.conn.query_row(
            "SELECT COUNT(*), MIN(date), MAX(date) FROM quotes
             WHERE symbol = ?1 AND date >= ?2 AND date < ?3",
            params![symbol, start.to_string(), end.to_string()],
            CachedSpan::from_row,
        )?;

        let last_day = end.pred_opt().unwrap_or(end);
        Ok(CachedSpan::parse(row)?.covers(start, last_day, Self::expected_rows(start, end)))
    }

    /// Get cached quotes for a symbol within `[start, end)`.
    ///
    /// Returns a frame with columns: symbol, date, close, adjusted_close
    pub fn get_quotes(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<DataFrame> {
        let mut stmt = self.conn.prepare(
            "SELECT symbol, date, close, adjusted_close
             FROM quotes
             WHERE symbol = ?1 AND date >= ?2 AND date < ?3
             ORDER BY date ASC",
        )?;

        let mut symbols = Vec::new();
        let mut dates = Vec::new();
        let mut closes = Vec::new();
        let mut adj_closes = Vec::new();

        let rows = stmt.query_map(params![symbol, start.to_string(), end.to_string()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, f64>(3)?,
            ))
        })?;

        for row in rows {
            let (sym, date, close, adj_close) = row?;
            symbols.push(sym);
            dates.push(date);
            closes.push(close);
            adj_closes.push(adj_close);
        }

        if dates.is_empty() {
            return Err(DataError::MissingData {
                symbol: symbol.to_string(),
                reason: "No cached data found".to_string(),
            });
        }

        let df = DataFrame::new(vec![
            Series::new("symbol".into(), symbols).into(),
            Series::new("date".into(), dates).into(),
            Series::new("close".into(), closes).into(),
            Series::new("adjusted_close".into(), adj_closes).into(),
        ])?;

        let df = df
            .lazy()
            .with_column(col("date").cast(DataType::Date))
            .collect()?;

        Ok(df)
    }

    /// Store quotes in the cache.
    ///
    /// Expects the columns produced by the Yahoo provider: symbol, date, close, adjusted_close.
    pub fn put_quotes(&self, df: &DataFrame) -> Result<()> {
        let cached_at = Utc::now().to_rfc3339();

        let symbols = df.column("symbol")?.str()?;
        let dates = df.column("date")?.cast(&DataType::String)?;
        let dates = dates.str()?;
        let closes = df.column("close")?.f64()?;
        let adj_closes = df.column("adjusted_close")?.f64()?;

        let tx = self.conn.unchecked_transaction()?;

        for i in 0..df.height() {
            let symbol = symbols
                .get(i)
                .ok_or_else(|| DataError::Parse("Missing symbol".to_string()))?;
            let date = dates
                .get(i)
                .ok_or_else(|| DataError::Parse("Missing date".to_string()))?;
            let close = closes
                .get(i)
                .ok_or_else(|| DataError::Parse("Missing close".to_string()))?;
            let adj_close = adj_closes
                .get(i)
                .ok_or_else(|| DataError::Parse("Missing adjusted_close".to_string()))?;

            tx.execute(
                "INSERT OR REPLACE INTO quotes
                 (symbol, date, close, adjusted_close, cached_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![symbol, date, close, adj_close, cached_at],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Check if observations of a series are cached over `[start, end]`,
    /// with the same density and edge checks as [`Self::has_quotes`].
    pub fn has_rates(&self, series_id: &str, start: NaiveDate, end: NaiveDate) -> Result<bool> {
        let row = self.conn.query_row(
            "SELECT COUNT(*), MIN(date), MAX(date) FROM rate_observations
             WHERE series_id = ?1 AND date >= ?2 AND date <= ?3",
            params![series_id, start.to_string(), end.to_string()],
            CachedSpan::from_row,
        )?;

        Ok(CachedSpan::parse(row)?.covers(start, end, Self::expected_rows(start, end)))
    }

    /// Get cached observations of a series within `[start, end]`.
    ///
    /// Returns a frame with columns: date, rate
    pub fn get_rates(&self, series_id: &str, start: NaiveDate, end: NaiveDate) -> Result<DataFrame> {
        let mut stmt = self.conn.prepare(
            "SELECT date, value
             FROM rate_observations
             WHERE series_id = ?1 AND date >= ?2 AND date <= ?3
             ORDER BY date ASC",
        )?;

        let mut dates = Vec::new();
        let mut values = Vec::new();

        let rows = stmt.query_map(
            params![series_id, start.to_string(), end.to_string()],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, Option<f64>>(1)?)),
        )?;

        for row in rows {
            let (date, value) = row?;
            dates.push(date);
            values.push(value);
        }

        if dates.is_empty() {
            return Err(DataError::MissingData {
                symbol: series_id.to_string(),
                reason: "No cached data found".to_string(),
            });
        }

        let df = DataFrame::new(vec![
            Series::new("date".into(), dates).into(),
            Series::new("rate".into(), values).into(),
        ])?;

        let df = df
            .lazy()
            .with_column(col("date").cast(DataType::Date))
            .collect()?;

        Ok(df)
    }

    /// Store observations of a series.
    ///
    /// Expects the columns produced by the FRED client: date, rate.
    pub fn put_rates(&self, series_id: &str, df: &DataFrame) -> Result<()> {
        let cached_at = Utc::now().to_rfc3339();

        let dates = df.column("date")?.cast(&DataType::String)?;
        let dates = dates.str()?;
        let values = df.column("rate")?.f64()?;

        let tx = self.conn.unchecked_transaction()?;

        for i in 0..df.height() {
            let date = dates
                .get(i)
                .ok_or_else(|| DataError::Parse("Missing date".to_string()))?;

            tx.execute(
                "INSERT OR REPLACE INTO rate_observations
                 (series_id, date, value, cached_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![series_id, date, values.get(i), cached_at],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Clear all cached data.
    pub fn clear_all(&self) -> Result<()> {
        self.conn.execute("DELETE FROM quotes", [])?;
        self.conn.execute("DELETE FROM rate_observations", [])?;
        Ok(())
    }

    /// Clear cached quotes for a specific symbol.
    pub fn clear_symbol(&self, symbol: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM quotes WHERE symbol = ?1", params![symbol])?;
        Ok(())
    }

    /// Clear cached observations for a specific series.
    pub fn clear_series(&self, series_id: &str) -> Result<()> {
        self.conn.execute(
            "DELETE FROM rate_observations WHERE series_id = ?1",
            params![series_id],
        )?;
        Ok(())
    }

    /// Get cache statistics.
    pub fn get_stats(&self) -> Result<CacheStats> {
        let quotes_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM quotes", [], |row| row.get(0))?;

        let symbols_count: i64 =
            self.conn
                .query_row("SELECT COUNT(DISTINCT symbol) FROM quotes", [], |row| {
                    row.get(0)
                })?;

        let rates_count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM rate_observations", [], |row| {
                    row.get(0)
                })?;

        let series_count: i64 = self.conn.query_row(
            "SELECT COUNT(DISTINCT series_id) FROM rate_observations",
            [],
            |row| row.get(0),
        )?;

        Ok(CacheStats {
            total_quotes: quotes_count as usize,
            unique_symbols: symbols_count as usize,
            total_rates: rates_count as usize,
            unique_series: series_count as usize,
        })
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Total number of quote records
    pub total_quotes: usize,
    /// Number of unique symbols
    pub unique_symbols: usize,
    /// Total number of rate observations
    pub total_rates: usize,
    /// Number of unique rate series
    pub unique_series: usize,
}
