//! Shared behaviour of date-indexed tables.
//!
//! Every table wraps a polars frame whose first column, `date`, is a polars
//! `Date` column in strictly ascending order. The remaining columns are
//! `Float64`, one per symbol.

use crate::error::{ReturnsError, Result};
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;

/// Name of the date index column.
pub const DATE: &str = "date";

/// Days between 0001-01-01 (day 1 of the common era) and 1970-01-01.
const UNIX_EPOCH_FROM_CE: i32 = 719_163;

/// A frame indexed by trading date with one `f64` column per symbol.
pub trait DateTable {
    /// Underlying polars frame.
    fn frame(&self) -> &DataFrame;

    /// Number of dates.
    fn height(&self) -> usize {
        self.frame().height()
    }

    /// Whether the table has no rows.
    fn is_empty(&self) -> bool {
        self.height() == 0
    }

    /// Symbol columns in frame order.
    fn symbols(&self) -> Vec<String> {
        self.frame()
            .get_column_names()
            .into_iter()
            .filter(|name| name.as_str() != DATE)
            .map(|name| name.to_string())
            .collect()
    }

    /// Whether a symbol column exists.
    fn contains(&self, symbol: &str) -> bool {
        symbol != DATE && self.frame().column(symbol).is_ok()
    }

    /// The date index.
    fn dates(&self) -> Result<Vec<NaiveDate>> {
        dates_of(self.frame())
    }

    /// Values of a symbol column, nulls preserved.
    fn column_values(&self, symbol: &str) -> Result<Vec<Option<f64>>> {
        if symbol == DATE {
            return Err(ReturnsError::MissingColumn(symbol.to_string()));
        }
        let column = self
            .frame()
            .column(symbol)
            .map_err(|_| ReturnsError::MissingColumn(symbol.to_string()))?;
        Ok(column.f64()?.into_iter().collect())
    }

    /// Values of a symbol column, failing on any null or NaN.
    fn values(&self, symbol: &str) -> Result<Vec<f64>> {
        let values = self.column_values(symbol)?;
        let missing = values
            .iter()
            .filter(|v| v.is_none_or(|x| x.is_nan()))
            .count();
        if missing > 0 {
            return Err(ReturnsError::MissingValues {
                symbol: symbol.to_string(),
                count: missing,
            });
        }
        Ok(values.into_iter().flatten().collect())
    }
}

/// Convert a calendar date to polars' physical `Date` representation.
pub(crate) fn to_epoch_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_FROM_CE
}

/// Build a polars `Date` column from calendar dates.
pub(crate) fn date_column(dates: &[NaiveDate]) -> Result<Column> {
    let days: Vec<i32> = dates.iter().copied().map(to_epoch_days).collect();
    Ok(Series::new(DATE.into(), days)
        .cast(&DataType::Date)?
        .into())
}

/// Read the `date` column of a frame as calendar dates.
pub(crate) fn dates_of(df: &DataFrame) -> Result<Vec<NaiveDate>> {
    let days = df
        .column(DATE)
        .map_err(|_| ReturnsError::MissingColumn(DATE.to_string()))?
        .cast(&DataType::Int32)?;

    days.i32()?
        .into_iter()
        .map(|day| {
            day.and_then(|d| NaiveDate::from_num_days_from_ce_opt(d + UNIX_EPOCH_FROM_CE))
                .ok_or_else(|| ReturnsError::InvalidTable("null or out-of-range date".to_string()))
        })
        .collect()
}

/// Check the invariants shared by every date-indexed frame: a `Date` index
/// in strictly ascending order and `Float64` value columns.
pub(crate) fn validate(df: &DataFrame) -> Result<()> {
    let date = df
        .column(DATE)
        .map_err(|_| ReturnsError::MissingColumn(DATE.to_string()))?;
    if date.dtype() != &DataType::Date {
        return Err(ReturnsError::InvalidTable(format!(
            "date column has type {}, expected Date",
            date.dtype()
        )));
    }

    for column in df.get_columns() {
        if column.name().as_str() != DATE && column.dtype() != &DataType::Float64 {
            return Err(ReturnsError::InvalidTable(format!(
                "column {} has type {}, expected f64",
                column.name(),
                column.dtype()
            )));
        }
    }

    let dates = dates_of(df)?;
    if let Some(pair) = dates.windows(2).find(|pair| pair[0] >= pair[1]) {
        return Err(ReturnsError::InvalidTable(format!(
            "dates must be strictly ascending: {} is followed by {}",
            pair[0], pair[1]
        )));
    }

    Ok(())
}

/// Assemble a frame from dates and named value columns, then validate it.
pub(crate) fn build_frame<S: AsRef<str>>(
    dates: &[NaiveDate],
    columns: &[(S, Vec<Option<f64>>)],
) -> Result<DataFrame> {
    let mut cols = Vec::with_capacity(columns.len() + 1);
    cols.push(date_column(dates)?);
    for (name, values) in columns {
        let name = name.as_ref();
        if name == DATE {
            return Err(ReturnsError::InvalidTable(
                "a value column cannot be named date".to_string(),
            ));
        }
        if values.len() != dates.len() {
            return Err(ReturnsError::InvalidTable(format!(
                "column {} has {} value(s) for {} date(s)",
                name,
                values.len(),
                dates.len()
            )));
        }
        cols.push(Series::new(name.into(), values.clone()).into());
    }

    let df = DataFrame::new(cols)?;
    validate(&df)?;
    Ok(df)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_epoch_days() {
        assert_eq!(to_epoch_days(date(1970, 1, 1)), 0);
        assert_eq!(to_epoch_days(date(1970, 1, 2)), 1);
        assert_eq!(to_epoch_days(date(1969, 12, 31)), -1);
    }

    #[test]
    fn test_date_column_round_trip() {
        let dates = vec![date(2021, 1, 4), date(2021, 1, 5), date(2021, 3, 31)];
        let df = DataFrame::new(vec![date_column(&dates).unwrap()]).unwrap();
        assert_eq!(df.column(DATE).unwrap().dtype(), &DataType::Date);
        assert_eq!(dates_of(&df).unwrap(), dates);
    }

    #[test]
    fn test_build_frame_rejects_unsorted_dates() {
        let dates = vec![date(2021, 1, 5), date(2021, 1, 4)];
        let result = build_frame(&dates, &[("AAPL", vec![Some(1.0), Some(2.0)])]);
        assert!(matches!(result, Err(ReturnsError::InvalidTable(_))));
    }

    #[test]
    fn test_build_frame_rejects_duplicate_dates() {
        let dates = vec![date(2021, 1, 4), date(2021, 1, 4)];
        let result = build_frame(&dates, &[("AAPL", vec![Some(1.0), Some(2.0)])]);
        assert!(matches!(result, Err(ReturnsError::InvalidTable(_))));
    }

    #[test]
    fn test_build_frame_rejects_length_mismatch() {
        let dates = vec![date(2021, 1, 4), date(2021, 1, 5)];
        let result = build_frame(&dates, &[("AAPL", vec![Some(1.0)])]);
        assert!(matches!(result, Err(ReturnsError::InvalidTable(_))));
    }

    #[test]
    fn test_build_frame_rejects_date_named_column() {
        let dates = vec![date(2021, 1, 4)];
        let result = build_frame(&dates, &[("date", vec![Some(1.0)])]);
        assert!(matches!(result, Err(ReturnsError::InvalidTable(_))));
    }

    #[test]
    fn test_validate_rejects_non_float_column() {
        let df = DataFrame::new(vec![
            date_column(&[date(2021, 1, 4)]).unwrap(),
            Series::new("volume".into(), vec![100i64]).into(),
        ])
        .unwrap();
        assert!(matches!(validate(&df), Err(ReturnsError::InvalidTable(_))));
    }
}
