//! Risk-free rate series and their daily equivalents.

use crate::error::{ReturnsError, Result};
use crate::table::{DATE, build_frame, dates_of, validate};
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Column holding the annualised rate in a [`RateSeries`].
pub const RATE: &str = "rate";

/// Column holding the daily rate in a [`DailyRiskFree`].
pub const RISK_FREE: &str = "risk_free";

/// Term of a 3-month Treasury bill, in days.
pub const THREE_MONTH_TERM_DAYS: u32 = 90;

/// How a rate series is quoted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateUnit {
    /// Percentage points (FRED yields: `0.09` means 0.09%)
    #[default]
    Percent,
    /// Decimal fraction (`0.0009` means 0.09%)
    Decimal,
}

impl RateUnit {
    /// Divisor taking a quoted value to a decimal fraction.
    pub const fn divisor(&self) -> f64 {
        match self {
            Self::Percent => 100.0,
            Self::Decimal => 1.0,
        }
    }
}

fn check_columns(frame: &DataFrame, expected: &str) -> Result<()> {
    validate(frame)?;
    let names: Vec<&str> = frame
        .get_column_names()
        .into_iter()
        .map(|n| n.as_str())
        .collect();
    if names != [DATE, expected] {
        return Err(ReturnsError::InvalidTable(format!(
            "expected columns [{}, {}], found {:?}",
            DATE, expected, names
        )));
    }
    Ok(())
}

fn values_of(frame: &DataFrame, column: &str) -> Result<Vec<Option<f64>>> {
    Ok(frame.column(column)?.f64()?.into_iter().collect())
}

/// Annualised risk-free rate observations.
#[derive(Debug, Clone)]
pub struct RateSeries {
    frame: DataFrame,
    unit: RateUnit,
}

impl RateSeries {
    /// Wrap a frame with columns `date`, `rate`.
    pub fn new(frame: DataFrame, unit: RateUnit) -> Result<Self> {
        check_columns(&frame, RATE)?;
        Ok(Self { frame, unit })
    }

    /// Build a series from dates and optional observations.
    pub fn from_observations(
        dates: &[NaiveDate],
        values: Vec<Option<f64>>,
        unit: RateUnit,
    ) -> Result<Self> {
        Ok(Self {
            frame: build_frame(dates, &[(RATE, values)])?,
            unit,
        })
    }

    /// Quote convention of the values.
    pub const fn unit(&self) -> RateUnit {
        self.unit
    }

    /// Underlying frame.
    pub const fn frame(&self) -> &DataFrame {
        &self.frame
    }

    /// Number of observations, missing ones included.
    pub fn len(&self) -> usize {
        self.frame.height()
    }

    /// Whether the series has no observations.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Observation dates.
    pub fn dates(&self) -> Result<Vec<NaiveDate>> {
        dates_of(&self.frame)
    }

    /// Observed values, nulls preserved.
    pub fn values(&self) -> Result<Vec<Option<f64>>> {
        values_of(&self.frame, RATE)
    }

    /// Keep observations within `[start, end]`.
    pub fn restrict(&self, start: NaiveDate, end: NaiveDate) -> Result<Self> {
        let dates = self.dates()?;
        let mask: BooleanChunked = dates
            .iter()
            .map(|d| *d >= start && *d <= end)
            .collect();
        Ok(Self {
            frame: self.frame.filter(&mask)?,
            unit: self.unit,
        })
    }

    /// Convert to a daily decimal rate by dividing by the instrument's term.
    ///
    /// Missing observations are dropped.
    pub fn to_daily(&self, term_days: u32) -> Result<DailyRiskFree> {
        if term_days == 0 {
            return Err(ReturnsError::InvalidParameter(
                "term must be at least one day".to_string(),
            ));
        }

        let frame = self
            .frame
            .clone()
            .lazy()
            .filter(col(RATE).is_not_null().and(col(RATE).is_not_nan()))
            .select([
                col(DATE),
                ((col(RATE) / lit(self.unit.divisor())) / lit(f64::from(term_days)))
                    .alias(RISK_FREE),
            ])
            .collect()?;

        Ok(DailyRiskFree { frame })
    }
}

/// Daily risk-free rate as a decimal fraction.
#[derive(Debug, Clone)]
pub struct DailyRiskFree {
    frame: DataFrame,
}

impl DailyRiskFree {
    /// Wrap a frame with columns `date`, `risk_free`.
    pub fn new(frame: DataFrame) -> Result<Self> {
        check_columns(&frame, RISK_FREE)?;
        Ok(Self { frame })
    }

    /// Build a series from dates and daily rates.
    pub fn from_values(dates: &[NaiveDate], values: &[f64]) -> Result<Self> {
        let values = values.iter().copied().map(Some).collect();
        Ok(Self {
            frame: build_frame(dates, &[(RISK_FREE, values)])?,
        })
    }

    /// Underlying frame.
    pub const fn frame(&self) -> &DataFrame {
        &self.frame
    }

    /// Number of days.
    pub fn len(&self) -> usize {
        self.frame.height()
    }

    /// Whether the series is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dates of the series.
    pub fn dates(&self) -> Result<Vec<NaiveDate>> {
        dates_of(&self.frame)
    }

    /// Daily rates.
    pub fn values(&self) -> Result<Vec<f64>> {
        Ok(values_of(&self.frame, RISK_FREE)?
            .into_iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect())
    }

    /// Drop the final row.
    ///
    /// A rate window that includes the end date runs one observation past the
    /// last return; trimming it makes both series the same length.
    pub fn drop_last(&self) -> Result<Self> {
        let len = self.len();
        if len == 0 {
            return Err(ReturnsError::InsufficientData(
                "cannot drop the last row of an empty series".to_string(),
            ));
        }
        Ok(Self {
            frame: self.frame.head(Some(len - 1)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, m, d).unwrap()
    }

    fn dgs3mo() -> RateSeries {
        RateSeries::from_observations(
            &[date(1, 1), date(1, 4), date(1, 5), date(4, 1)],
            vec![None, Some(0.09), Some(0.08), Some(0.02)],
            RateUnit::Percent,
        )
        .unwrap()
    }

    #[test]
    fn test_to_daily_percent() {
        let daily = dgs3mo().to_daily(THREE_MONTH_TERM_DAYS).unwrap();

        assert_eq!(daily.dates().unwrap(), vec![date(1, 4), date(1, 5), date(4, 1)]);
        let values = daily.values().unwrap();
        assert_relative_eq!(values[0], 0.09 / 100.0 / 90.0);
        assert_relative_eq!(values[1], 0.08 / 100.0 / 90.0);
    }

    #[test]
    fn test_to_daily_decimal() {
        let series = RateSeries::from_observations(
            &[date(1, 4), date(1, 5)],
            vec![Some(0.009), Some(0.018)],
            RateUnit::Decimal,
        )
        .unwrap();

        let values = series.to_daily(90).unwrap().values().unwrap();
        assert_eq!(values, vec![0.009 / 90.0, 0.018 / 90.0]);
    }

    #[test]
    fn test_to_daily_zero_term() {
        assert!(matches!(
            dgs3mo().to_daily(0),
            Err(ReturnsError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_drop_last() {
        let daily = dgs3mo().to_daily(90).unwrap();
        let trimmed = daily.drop_last().unwrap();

        assert_eq!(trimmed.len(), daily.len() - 1);
        assert_eq!(trimmed.dates().unwrap(), vec![date(1, 4), date(1, 5)]);
    }

    #[test]
    fn test_drop_last_empty() {
        let empty = DailyRiskFree::from_values(&[], &[]).unwrap();
        assert!(matches!(
            empty.drop_last(),
            Err(ReturnsError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_restrict() {
        let restricted = dgs3mo().restrict(date(1, 2), date(3, 31)).unwrap();
        assert_eq!(restricted.dates().unwrap(), vec![date(1, 4), date(1, 5)]);
        assert_eq!(restricted.unit(), RateUnit::Percent);
    }

    #[test]
    fn test_rejects_wrong_columns() {
        let frame = DailyRiskFree::from_values(&[date(1, 4)], &[0.0001])
            .unwrap()
            .frame()
            .clone();
        assert!(matches!(
            RateSeries::new(frame, RateUnit::Decimal),
            Err(ReturnsError::InvalidTable(_))
        ));
    }
}
