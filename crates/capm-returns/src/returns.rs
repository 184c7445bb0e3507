//! Simple percentage returns.

use crate::error::{ReturnsError, Result};
use crate::prices::PriceTable;
use crate::table::{DateTable, validate};
use polars::prelude::*;
use tracing::debug;

/// Simple returns, dates × symbols.
///
/// One row shorter than the price table it was computed from: the first
/// date has no prior observation.
#[derive(Debug, Clone)]
pub struct ReturnTable {
    frame: DataFrame,
}

impl ReturnTable {
    /// Wrap a wide frame of returns.
    pub fn new(frame: DataFrame) -> Result<Self> {
        validate(&frame)?;
        Ok(Self { frame })
    }

    /// Compute `(p[t] - p[t-1]) / p[t-1]` for every symbol and drop the first row.
    ///
    /// Rows where any return is null or NaN are dropped as well, so a price
    /// table with no missing values yields exactly one row fewer.
    ///
    /// # Errors
    /// - `InsufficientData` with fewer than two dates
    /// - `InvalidPrice` if any present price is zero or negative
    pub fn from_prices(prices: &PriceTable) -> Result<Self> {
        if prices.height() < 2 {
            return Err(ReturnsError::InsufficientData(format!(
                "need at least two prices to compute a return, got {}",
                prices.height()
            )));
        }

        let dates = prices.dates()?;
        let symbols = prices.symbols();
        for symbol in &symbols {
            let values = prices.column_values(symbol)?;
            if let Some((i, value)) = values
                .iter()
                .enumerate()
                .find_map(|(i, v)| v.filter(|x| *x <= 0.0).map(|x| (i, x)))
            {
                return Err(ReturnsError::InvalidPrice {
                    symbol: symbol.clone(),
                    date: dates[i],
                    value,
                });
            }
        }

        let exprs: Vec<Expr> = symbols
            .iter()
            .map(|symbol| {
                let previous = col(symbol.as_str()).shift(lit(1));
                ((col(symbol.as_str()) - previous.clone()) / previous).alias(symbol.as_str())
            })
            .collect();
        let complete = symbols
            .iter()
            .map(|symbol| {
                col(symbol.as_str())
                    .is_not_null()
                    .and(col(symbol.as_str()).is_not_nan())
            })
            .reduce(Expr::and)
            .unwrap_or_else(|| lit(true));

        let frame = prices
            .frame()
            .clone()
            .lazy()
            .with_columns(exprs)
            .slice(1, IdxSize::MAX)
            .filter(complete)
            .collect()?;

        let dropped = prices.height() - 1 - frame.height();
        if dropped > 0 {
            debug!(dropped, "dropped incomplete return rows");
        }

        Ok(Self { frame })
    }

    /// Consume the table, returning the underlying frame.
    pub fn into_frame(self) -> DataFrame {
        self.frame
    }
}

impl DateTable for ReturnTable {
    fn frame(&self) -> &DataFrame {
        &self.frame
    }
}

impl TryFrom<&PriceTable> for ReturnTable {
    type Error = ReturnsError;

    fn try_from(prices: &PriceTable) -> Result<Self> {
        Self::from_prices(prices)
    }
}
