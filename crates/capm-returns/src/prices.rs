//! Closing price tables.

use crate::error::{ReturnsError, Result};
use crate::table::{DATE, DateTable, build_frame, date_column, dates_of, validate};
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// Which quote column feeds the price table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceField {
    /// Raw closing price
    #[default]
    Close,
    /// Closing price adjusted for splits and dividends
    AdjustedClose,
}

impl PriceField {
    /// Column name in a quotes frame.
    pub const fn column(&self) -> &'static str {
        match self {
            Self::Close => "close",
            Self::AdjustedClose => "adjusted_close",
        }
    }
}

/// Closing prices, dates × symbols.
#[derive(Debug, Clone)]
pub struct PriceTable {
    frame: DataFrame,
}

impl PriceTable {
    /// Wrap a wide frame (`date` plus one `f64` column per symbol).
    pub fn new(frame: DataFrame) -> Result<Self> {
        validate(&frame)?;
        Ok(Self { frame })
    }

    /// Build a table from dates and per-symbol price columns.
    pub fn from_columns<S: AsRef<str>>(
        dates: &[NaiveDate],
        columns: &[(S, Vec<Option<f64>>)],
    ) -> Result<Self> {
        Ok(Self {
            frame: build_frame(dates, columns)?,
        })
    }

    /// Pivot a long quotes frame (`symbol`, `date`, price columns) into a table.
    ///
    /// The date index is the union of all quote dates; a symbol without a
    /// quote on some date gets a null cell there. Columns follow the order of
    /// `symbols` and keep the raw ticker as their name.
    ///
    /// # Errors
    /// `MissingColumn` if a requested symbol has no quotes at all.
    pub fn from_quotes(quotes: &DataFrame, symbols: &[String], field: PriceField) -> Result<Self> {
        let mut seen = HashSet::new();
        if let Some(dup) = symbols.iter().find(|s| !seen.insert(s.as_str())) {
            return Err(ReturnsError::InvalidParameter(format!(
                "symbol {} requested twice",
                dup
            )));
        }

        let mut dates = dates_of(quotes)?;
        dates.sort_unstable();
        dates.dedup();

        let mut table = DataFrame::new(vec![date_column(&dates)?])?.lazy();

        for symbol in symbols {
            let prices = quotes
                .clone()
                .lazy()
                .filter(col("symbol").eq(lit(symbol.as_str())))
                .select([
                    col(DATE),
                    col(field.column())
                        .cast(DataType::Float64)
                        .alias(symbol.as_str()),
                ])
                .collect()?;

            if prices.height() == 0 {
                return Err(ReturnsError::MissingColumn(symbol.clone()));
            }

            table = table.join(
                prices.lazy(),
                [col(DATE)],
                [col(DATE)],
                JoinArgs::new(JoinType::Left),
            );
        }

        let frame = table
            .sort([DATE], SortMultipleOptions::default())
            .collect()?;

        Self::new(frame)
    }

    /// Drop every date on which any symbol is null or NaN.
    pub fn drop_missing(&self) -> Result<Self> {
        let symbols = self.symbols();
        let keep = symbols.iter().fold(lit(true), |acc, symbol| {
            acc.and(col(symbol.as_str()).is_not_null())
                .and(col(symbol.as_str()).is_not_nan())
        });

        let frame = self.frame.clone().lazy().filter(keep).collect()?;
        debug!(
            before = self.height(),
            after = frame.height(),
            "dropped rows with missing prices"
        );

        Ok(Self { frame })
    }

    /// Rename a symbol column.
    pub fn rename_symbol(&self, from: &str, to: &str) -> Result<Self> {
        if !self.contains(from) {
            return Err(ReturnsError::MissingColumn(from.to_string()));
        }
        if from == to {
            return Ok(self.clone());
        }
        if to == DATE || self.contains(to) {
            return Err(ReturnsError::InvalidParameter(format!(
                "cannot rename {} to existing column {}",
                from, to
            )));
        }

        let exprs: Vec<Expr> = self
            .frame
            .get_column_names()
            .into_iter()
            .map(|name| {
                if name.as_str() == from {
                    col(name.as_str()).alias(to)
                } else {
                    col(name.as_str())
                }
            })
            .collect();

        let frame = self.frame.clone().lazy().select(exprs).collect()?;
        Ok(Self { frame })
    }

    /// Consume the table, returning the underlying frame.
    pub fn into_frame(self) -> DataFrame {
        self.frame
    }
}

impl DateTable for PriceTable {
    fn frame(&self) -> &DataFrame {
        &self.frame
    }
}
