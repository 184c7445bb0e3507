//! Excess returns over the risk-free rate.

use crate::error::{ReturnsError, Result};
use crate::returns::ReturnTable;
use crate::risk_free::{DailyRiskFree, RISK_FREE};
use crate::table::{DATE, DateTable, validate};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// How to reconcile the date index of returns with the risk-free series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentPolicy {
    /// Keep only dates present in both; unmatched dates are dropped
    #[default]
    Intersect,
    /// Require identical date indexes
    Strict,
}

/// Returns minus the daily risk-free rate of the same date.
#[derive(Debug, Clone)]
pub struct ExcessReturnTable {
    frame: DataFrame,
}

impl ExcessReturnTable {
    /// Wrap a wide frame of excess returns.
    pub fn new(frame: DataFrame) -> Result<Self> {
        validate(&frame)?;
        Ok(Self { frame })
    }

    /// Subtract `risk_free[d]` from every symbol's return on date `d`.
    ///
    /// # Errors
    /// - `DateMismatch` under [`AlignmentPolicy::Strict`] when the indexes differ
    /// - `InsufficientData` when no date is shared
    pub fn compute(
        returns: &ReturnTable,
        risk_free: &DailyRiskFree,
        policy: AlignmentPolicy,
    ) -> Result<Self> {
        let symbols = returns.symbols();
        if symbols.iter().any(|s| s == RISK_FREE) {
            return Err(ReturnsError::InvalidTable(format!(
                "symbol column cannot be named {}",
                RISK_FREE
            )));
        }

        let return_dates = returns.dates()?;
        let rate_dates = risk_free.dates()?;

        if return_dates != rate_dates {
            let first_difference = return_dates
                .iter()
                .zip(&rate_dates)
                .find(|(a, b)| a != b)
                .map(|(a, b)| *a.min(b))
                .or_else(|| {
                    let shared = return_dates.len().min(rate_dates.len());
                    return_dates
                        .get(shared)
                        .or_else(|| rate_dates.get(shared))
                        .copied()
                });

            match policy {
                AlignmentPolicy::Strict => {
                    return Err(ReturnsError::DateMismatch {
                        left_rows: return_dates.len(),
                        right_rows: rate_dates.len(),
                        first_difference,
                    });
                }
                AlignmentPolicy::Intersect => {
                    warn!(
                        returns = return_dates.len(),
                        risk_free = rate_dates.len(),
                        ?first_difference,
                        "return and risk-free dates differ; keeping shared dates only"
                    );
                }
            }
        }

        let mut exprs: Vec<Expr> = Vec::with_capacity(symbols.len() + 1);
        exprs.push(col(DATE));
        exprs.extend(
            symbols
                .iter()
                .map(|s| (col(s.as_str()) - col(RISK_FREE)).alias(s.as_str())),
        );

        let frame = returns
            .frame()
            .clone()
            .lazy()
            .join(
                risk_free.frame().clone().lazy(),
                [col(DATE)],
                [col(DATE)],
                JoinArgs::new(JoinType::Inner),
            )
            .select(exprs)
            .sort([DATE], SortMultipleOptions::default())
            .collect()?;

        if frame.height() == 0 {
            return Err(ReturnsError::InsufficientData(
                "returns and risk-free series share no dates".to_string(),
            ));
        }

        debug!(rows = frame.height(), symbols = symbols.len(), "computed excess returns");

        Ok(Self { frame })
    }

    /// Consume the table, returning the underlying frame.
    pub fn into_frame(self) -> DataFrame {
        self.frame
    }
}

impl DateTable for ExcessReturnTable {
    fn frame(&self) -> &DataFrame {
        &self.frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prices::PriceTable;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 1, d).unwrap()
    }

    fn returns() -> ReturnTable {
        let prices = PriceTable::from_columns(
            &[date(4), date(5), date(6)],
            &[
                ("AAPL", vec![Some(100.0), Some(102.0), Some(101.0)]),
                ("GSPC", vec![Some(3700.0), Some(3726.0), Some(3748.0)]),
            ],
        )
        .unwrap();
        ReturnTable::from_prices(&prices).unwrap()
    }

    #[test]
    fn test_worked_example() {
        let rf = DailyRiskFree::from_values(&[date(5), date(6)], &[0.0001, 0.0001]).unwrap();
        let excess = ExcessReturnTable::compute(&returns(), &rf, AlignmentPolicy::Strict).unwrap();

        let aapl = excess.values("AAPL").unwrap();
        assert_relative_eq!(aapl[0], 0.0199, epsilon = 1e-12);
        assert_relative_eq!(aapl[1], -1.0 / 102.0 - 0.0001, epsilon = 1e-12);
    }

    #[test]
    fn test_excess_is_exact_difference() {
        let returns = returns();
        let rf_values = [0.000_012_5, 0.000_009_8];
        let rf = DailyRiskFree::from_values(&[date(5), date(6)], &rf_values).unwrap();
        let excess = ExcessReturnTable::compute(&returns, &rf, AlignmentPolicy::Strict).unwrap();

        for symbol in returns.symbols() {
            let r = returns.values(&symbol).unwrap();
            let e = excess.values(&symbol).unwrap();
            for i in 0..r.len() {
                assert_eq!(e[i].to_bits(), (r[i] - rf_values[i]).to_bits());
            }
        }
    }

    #[test]
    fn test_strict_rejects_misaligned_dates() {
        let rf = DailyRiskFree::from_values(&[date(5), date(6), date(7)], &[0.0; 3]).unwrap();
        let result = ExcessReturnTable::compute(&returns(), &rf, AlignmentPolicy::Strict);

        match result {
            Err(ReturnsError::DateMismatch {
                left_rows,
                right_rows,
                first_difference,
            }) => {
                assert_eq!(left_rows, 2);
                assert_eq!(right_rows, 3);
                assert_eq!(first_difference, Some(date(7)));
            }
            other => panic!("expected DateMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_intersect_drops_unmatched_dates() {
        // Rate window runs one day past the returns and misses 5 January.
        let rf = DailyRiskFree::from_values(&[date(6), date(7)], &[0.0001, 0.0002]).unwrap();
        let excess =
            ExcessReturnTable::compute(&returns(), &rf, AlignmentPolicy::Intersect).unwrap();

        assert_eq!(excess.dates().unwrap(), vec![date(6)]);
        assert_eq!(excess.symbols(), vec!["AAPL", "GSPC"]);
    }

    #[test]
    fn test_no_shared_dates() {
        let rf = DailyRiskFree::from_values(&[date(20)], &[0.0001]).unwrap();
        assert!(matches!(
            ExcessReturnTable::compute(&returns(), &rf, AlignmentPolicy::Intersect),
            Err(ReturnsError::InsufficientData(_))
        ));
    }
}
