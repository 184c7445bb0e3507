//! Descriptive statistics and correlations over date-indexed tables.
//!
//! Missing cells (null or NaN) are skipped, column by column for summary
//! statistics and pair by pair for correlations.

use crate::error::Result;
use crate::table::DateTable;
use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Summary statistics of one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryStatistics {
    /// Column name
    pub symbol: String,
    /// Non-missing observations
    pub count: usize,
    /// Arithmetic mean
    pub mean: f64,
    /// Sample standard deviation (n - 1 denominator)
    pub std: f64,
    /// Smallest value
    pub min: f64,
    /// First quartile
    pub q25: f64,
    /// Median
    pub median: f64,
    /// Third quartile
    pub q75: f64,
    /// Largest value
    pub max: f64,
}

impl SummaryStatistics {
    /// Compute statistics over the present values of a column.
    pub fn from_values(symbol: impl Into<String>, values: &[Option<f64>]) -> Self {
        let present: Vec<f64> = values
            .iter()
            .flatten()
            .copied()
            .filter(|v| !v.is_nan())
            .collect();
        let count = present.len();
        let ca = Float64Chunked::from_vec("values".into(), present);

        let std = if count < 2 {
            f64::NAN
        } else {
            ca.std(1).unwrap_or(f64::NAN)
        };

        Self {
            symbol: symbol.into(),
            count,
            mean: ca.mean().unwrap_or(f64::NAN),
            std,
            min: ca.min().unwrap_or(f64::NAN),
            q25: linear_quantile(&ca, 0.25),
            median: linear_quantile(&ca, 0.5),
            q75: linear_quantile(&ca, 0.75),
            max: ca.max().unwrap_or(f64::NAN),
        }
    }
}

fn linear_quantile(ca: &Float64Chunked, q: f64) -> f64 {
    ca.quantile(q.clamp(0.0, 1.0), QuantileMethod::Linear)
        .ok()
        .flatten()
        .unwrap_or(f64::NAN)
}

/// Linearly interpolated quantile of `values`, `NaN` when empty.
pub fn quantile(values: &[f64], q: f64) -> f64 {
    linear_quantile(&Float64Chunked::from_slice("values".into(), values), q)
}

/// Summary statistics for every symbol of a table, in column order.
pub fn describe<T: DateTable>(table: &T) -> Result<Vec<SummaryStatistics>> {
    table
        .symbols()
        .into_iter()
        .map(|symbol| {
            let values = table.column_values(&symbol)?;
            Ok(SummaryStatistics::from_values(symbol, &values))
        })
        .collect()
}

/// Symmetric matrix of pairwise Pearson correlations.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    /// Row and column labels
    pub symbols: Vec<String>,
    /// Correlation coefficients, `NaN` where undefined
    pub values: Array2<f64>,
}

impl CorrelationMatrix {
    /// Correlation between two symbols.
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.symbols.iter().position(|s| s == a)?;
        let j = self.symbols.iter().position(|s| s == b)?;
        Some(self.values[[i, j]])
    }
}

/// Pearson correlation over the positions where both series are present.
pub fn pearson(x: &[Option<f64>], y: &[Option<f64>]) -> f64 {
    let (a, b): (Vec<f64>, Vec<f64>) = x
        .iter()
        .zip(y)
        .filter_map(|(a, b)| match (a, b) {
            (Some(a), Some(b)) if !a.is_nan() && !b.is_nan() => Some((*a, *b)),
            _ => None,
        })
        .unzip();

    if a.len() < 2 {
        return f64::NAN;
    }

    let a = Float64Chunked::from_vec("x".into(), a);
    let b = Float64Chunked::from_vec("y".into(), b);
    match (a.std(0), b.std(0)) {
        (Some(sa), Some(sb)) if sa > 0.0 && sb > 0.0 => cov::pearson_corr(&a, &b)
            .map_or(f64::NAN, |r| r.clamp(-1.0, 1.0)),
        _ => f64::NAN,
    }
}

/// Pairwise correlation matrix of every symbol of a table.
pub fn correlation_matrix<T: DateTable>(table: &T) -> Result<CorrelationMatrix> {
    let symbols = table.symbols();
    let columns = symbols
        .iter()
        .map(|s| table.column_values(s))
        .collect::<Result<Vec<_>>>()?;

    let n = symbols.len();
    let mut values = Array2::from_elem((n, n), f64::NAN);
    for i in 0..n {
        for j in i..n {
            let r = pearson(&columns[i], &columns[j]);
            values[[i, j]] = r;
            values[[j, i]] = r;
        }
    }

    Ok(CorrelationMatrix { symbols, values })
}
