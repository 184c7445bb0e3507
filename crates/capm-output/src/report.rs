//! JSON report of one analysis run.

use crate::export::{CapmFitExport, fit_records};
use capm_model::CapmFit;
use capm_returns::{CorrelationMatrix, SummaryStatistics};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during report generation.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A required field was not set on the builder.
    #[error("Missing report field: {0}")]
    MissingField(&'static str),
}

/// Correlation matrix in serialisable form; undefined entries are `None`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CorrelationExport {
    /// Row and column labels.
    pub symbols: Vec<String>,

    /// Row-major coefficients.
    pub values: Vec<Vec<Option<f64>>>,
}

impl From<&CorrelationMatrix> for CorrelationExport {
    fn from(matrix: &CorrelationMatrix) -> Self {
        let values = matrix
            .values
            .rows()
            .into_iter()
            .map(|row| {
                row.iter()
                    .map(|v| if v.is_nan() { None } else { Some(*v) })
                    .collect()
            })
            .collect();

        Self {
            symbols: matrix.symbols.clone(),
            values,
        }
    }
}

/// A report of one CAPM analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Market symbol the assets were regressed on.
    pub market: String,

    /// Report generation timestamp.
    pub timestamp: DateTime<Utc>,

    /// First date of the regression sample.
    pub period_start: Option<NaiveDate>,

    /// Last date of the regression sample.
    pub period_end: Option<NaiveDate>,

    /// Number of excess-return observations.
    pub observations: usize,

    /// Settings the analysis ran with.
    pub parameters: serde_json::Value,

    /// Descriptive statistics of the cleaned prices.
    pub statistics: Vec<SummaryStatistics>,

    /// Price correlations.
    pub correlation: Option<CorrelationExport>,

    /// One record per asset.
    pub fits: Vec<CapmFitExport>,
}

impl Report {
    /// Convert report to JSON string.
    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the report as pretty JSON.
    pub fn write_to_file(&self, path: &Path) -> Result<(), ReportError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

/// Builder for creating reports.
#[derive(Debug, Default)]
pub struct ReportBuilder {
    market: Option<String>,
    period: Option<(NaiveDate, NaiveDate)>,
    observations: usize,
    parameters: Option<serde_json::Value>,
    statistics: Vec<SummaryStatistics>,
    correlation: Option<CorrelationExport>,
    fits: Vec<CapmFitExport>,
}

impl ReportBuilder {
    /// Create a new report builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the market symbol.
    pub fn market(mut self, market: impl Into<String>) -> Self {
        self.market = Some(market.into());
        self
    }

    /// Set the sample period.
    pub const fn period(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.period = Some((start, end));
        self
    }

    /// Set the number of observations.
    pub const fn observations(mut self, observations: usize) -> Self {
        self.observations = observations;
        self
    }

    /// Record the analysis settings.
    pub fn parameters(mut self, parameters: serde_json::Value) -> Self {
        self.parameters = Some(parameters);
        self
    }

    /// Attach descriptive statistics.
    pub fn statistics(mut self, statistics: Vec<SummaryStatistics>) -> Self {
        self.statistics = statistics;
        self
    }

    /// Attach a correlation matrix.
    pub fn correlation(mut self, matrix: &CorrelationMatrix) -> Self {
        self.correlation = Some(matrix.into());
        self
    }

    /// Attach the fitted regressions.
    pub fn fits(mut self, fits: &[CapmFit]) -> Self {
        self.fits = fit_records(fits);
        self
    }

    /// Build the report.
    pub fn build(self) -> Result<Report, ReportError> {
        let market = self.market.ok_or(ReportError::MissingField("market"))?;
        Ok(Report {
            market,
            timestamp: Utc::now(),
            period_start: self.period.map(|(start, _)| start),
            period_end: self.period.map(|(_, end)| end),
            observations: self.observations,
            parameters: self.parameters.unwrap_or(serde_json::Value::Null),
            statistics: self.statistics,
            correlation: self.correlation,
            fits: self.fits,
        })
    }
}
