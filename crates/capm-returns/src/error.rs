//! Error types for table construction and transformation.

use chrono::NaiveDate;
use thiserror::Error;

/// Result type for table operations.
pub type Result<T> = std::result::Result<T, ReturnsError>;

/// Errors that can occur while building or transforming tables.
#[derive(Debug, Error)]
pub enum ReturnsError {
    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// Frame does not satisfy a table invariant
    #[error("Invalid table: {0}")]
    InvalidTable(String),

    /// Requested column does not exist
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// Column contains missing values where none are allowed
    #[error("Column {symbol} has {count} missing value(s); drop missing rows first")]
    MissingValues {
        /// Offending column
        symbol: String,
        /// Number of null or NaN cells
        count: usize,
    },

    /// Price that cannot produce a return
    #[error("Non-positive price {value} for {symbol} on {date}")]
    InvalidPrice {
        /// Offending column
        symbol: String,
        /// Date of the observation
        date: NaiveDate,
        /// Observed price
        value: f64,
    },

    /// Two tables that must share a date index do not
    #[error(
        "Date mismatch: {left_rows} row(s) vs {right_rows} row(s), first difference at {first_difference:?}"
    )]
    DateMismatch {
        /// Rows in the left-hand table
        left_rows: usize,
        /// Rows in the right-hand table
        right_rows: usize,
        /// First date present in one table and not the other
        first_difference: Option<NaiveDate>,
    },

    /// Not enough rows for the requested operation
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Invalid parameter value
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}
