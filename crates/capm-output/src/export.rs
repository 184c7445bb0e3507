//! Export of regression results and date-indexed tables.
//!
//! Fits are flattened to one record per asset; tables are written wide, one
//! row per date and one column per symbol, the way they are held in memory.

use capm_model::CapmFit;
use capm_returns::{DateTable, ReturnsError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during export operations.
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV serialization error.
    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Table could not be read.
    #[error("Table error: {0}")]
    Table(#[from] ReturnsError),

    /// Invalid format error.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Export format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportFormat {
    /// Comma-separated values format.
    #[default]
    Csv,

    /// Compact JSON format.
    Json,

    /// Pretty-printed JSON format.
    PrettyJson,
}

impl ExportFormat {
    /// Get the file extension for this format.
    pub const fn extension(&self) -> &str {
        match self {
            Self::Csv => "csv",
            Self::Json | Self::PrettyJson => "json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "pretty-json" | "pretty_json" | "pretty" => Ok(Self::PrettyJson),
            other => Err(ExportError::InvalidFormat(format!(
                "unknown export format '{}' (expected csv, json or pretty-json)",
                other
            ))),
        }
    }
}

/// One fitted CAPM regression, flattened for export.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CapmFitExport {
    /// Asset symbol.
    pub symbol: String,

    /// Market symbol.
    pub market: String,

    /// Intercept estimate.
    pub alpha: f64,

    /// Standard error of alpha.
    pub alpha_std_error: f64,

    /// t-statistic of alpha.
    pub alpha_t_value: f64,

    /// p-value of alpha.
    pub alpha_p_value: f64,

    /// Market slope estimate.
    pub beta: f64,

    /// Standard error of beta.
    pub beta_std_error: f64,

    /// t-statistic of beta.
    pub beta_t_value: f64,

    /// p-value of beta.
    pub beta_p_value: f64,

    /// Lower confidence bound of beta.
    pub beta_ci_lower: f64,

    /// Upper confidence bound of beta.
    pub beta_ci_upper: f64,

    /// Coefficient of determination.
    pub r_squared: f64,

    /// Adjusted R².
    pub adj_r_squared: f64,

    /// F-statistic.
    pub f_statistic: f64,

    /// p-value of the F-statistic.
    pub f_pvalue: f64,

    /// Residual standard error.
    pub residual_std_error: f64,

    /// Durbin-Watson statistic.
    pub durbin_watson: f64,

    /// Number of observations.
    pub nobs: usize,
}

impl From<&CapmFit> for CapmFitExport {
    fn from(capm: &CapmFit) -> Self {
        let nan = f64::NAN;
        let alpha = capm.fit.coefficients.first();
        let beta = capm.fit.coefficients.get(1);

        Self {
            symbol: capm.symbol.clone(),
            market: capm.market.clone(),
            alpha: capm.alpha,
            alpha_std_error: alpha.map_or(nan, |c| c.std_error),
            alpha_t_value: alpha.map_or(nan, |c| c.t_value),
            alpha_p_value: alpha.map_or(nan, |c| c.p_value),
            beta: capm.beta,
            beta_std_error: beta.map_or(nan, |c| c.std_error),
            beta_t_value: beta.map_or(nan, |c| c.t_value),
            beta_p_value: beta.map_or(nan, |c| c.p_value),
            beta_ci_lower: beta.map_or(nan, |c| c.ci_lower),
            beta_ci_upper: beta.map_or(nan, |c| c.ci_upper),
            r_squared: capm.fit.r_squared,
            adj_r_squared: capm.fit.adj_r_squared,
            f_statistic: capm.fit.f_statistic,
            f_pvalue: capm.fit.f_pvalue,
            residual_std_error: capm.fit.residual_std_error,
            durbin_watson: capm.fit.durbin_watson,
            nobs: capm.fit.nobs,
        }
    }
}

/// Flatten a list of fits.
pub fn fit_records(fits: &[CapmFit]) -> Vec<CapmFitExport> {
    fits.iter().map(CapmFitExport::from).collect()
}

/// One date of a wide table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TableRow {
    /// Row date.
    pub date: NaiveDate,

    /// Values in symbol order; `None` where missing.
    pub values: Vec<Option<f64>>,
}

/// A snapshot of a date-indexed table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TableExport {
    /// Table name, e.g. `prices` or `excess_returns`.
    pub name: String,

    /// Column symbols.
    pub symbols: Vec<String>,

    /// Rows in date order.
    pub rows: Vec<TableRow>,
}

impl TableExport {
    /// Copy the contents of a table.
    pub fn from_table<T: DateTable>(name: impl Into<String>, table: &T) -> Result<Self, ExportError> {
        let symbols = table.symbols();
        let dates = table.dates()?;
        let columns = symbols
            .iter()
            .map(|s| table.column_values(s))
            .collect::<Result<Vec<_>, _>>()?;

        let rows = dates
            .into_iter()
            .enumerate()
            .map(|(i, date)| TableRow {
                date,
                values: columns.iter().map(|c| c[i]).collect(),
            })
            .collect();

        Ok(Self {
            name: name.into(),
            symbols,
            rows,
        })
    }
}

fn into_string(wtr: csv::Writer<Vec<u8>>) -> Result<String, ExportError> {
    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    String::from_utf8(bytes).map_err(|e| ExportError::InvalidFormat(e.to_string()))
}

/// Trait for exporting data in various formats.
pub trait Exporter {
    /// Export data to a string in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError>;

    /// Export data to a file in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    fn export_to_file(&self, path: &Path, format: ExportFormat) -> Result<(), ExportError> {
        let content = self.export_to_string(format)?;
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }
}

impl Exporter for CapmFitExport {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => {
                let mut wtr = csv::Writer::from_writer(vec![]);
                wtr.serialize(self)?;
                into_string(wtr)
            }
            ExportFormat::Json => Ok(serde_json::to_string(self)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(self)?),
        }
    }
}

impl Exporter for Vec<CapmFitExport> {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => {
                let mut wtr = csv::Writer::from_writer(vec![]);
                for record in self {
                    wtr.serialize(record)?;
                }
                into_string(wtr)
            }
            ExportFormat::Json => Ok(serde_json::to_string(self)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(self)?),
        }
    }
}

impl Exporter for TableExport {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => {
                let mut wtr = csv::Writer::from_writer(vec![]);
                let mut header = vec!["date".to_string()];
                header.extend(self.symbols.iter().cloned());
                wtr.write_record(&header)?;

                for row in &self.rows {
                    let mut record = vec![row.date.to_string()];
                    record.extend(
                        row.values
                            .iter()
                            .map(|v| v.map(|x| x.to_string()).unwrap_or_default()),
                    );
                    wtr.write_record(&record)?;
                }
                into_string(wtr)
            }
            ExportFormat::Json => Ok(serde_json::to_string(self)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(self)?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capm_returns::PriceTable;
    use rstest::rstest;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 1, d).unwrap()
    }

    fn record(symbol: &str, beta: f64) -> CapmFitExport {
        CapmFitExport {
            symbol: symbol.to_string(),
            market: "GSPC".to_string(),
            alpha: 0.0012,
            alpha_std_error: 0.0008,
            alpha_t_value: 1.5,
            alpha_p_value: 0.14,
            beta,
            beta_std_error: 0.1,
            beta_t_value: beta / 0.1,
            beta_p_value: 0.0,
            beta_ci_lower: beta - 0.2,
            beta_ci_upper: beta + 0.2,
            r_squared: 0.62,
            adj_r_squared: 0.61,
            f_statistic: 144.0,
            f_pvalue: 0.0,
            residual_std_error: 0.011,
            durbin_watson: 2.05,
            nobs: 60,
        }
    }

    #[rstest]
    #[case("csv", ExportFormat::Csv)]
    #[case("JSON", ExportFormat::Json)]
    #[case("pretty-json", ExportFormat::PrettyJson)]
    fn test_format_from_str(#[case] input: &str, #[case] expected: ExportFormat) {
        assert_eq!(input.parse::<ExportFormat>().unwrap(), expected);
    }

    #[test]
    fn test_format_from_str_invalid() {
        assert!(matches!(
            "xlsx".parse::<ExportFormat>(),
            Err(ExportError::InvalidFormat(_))
        ));
        assert_eq!(ExportFormat::PrettyJson.extension(), "json");
    }

    #[test]
    fn test_fit_export_csv() {
        let csv = record("AAPL", 1.21).export_to_string(ExportFormat::Csv).unwrap();
        let mut lines = csv.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("symbol,market,alpha,"));
        assert!(header.ends_with(",nobs"));
        assert!(lines.next().unwrap().starts_with("AAPL,GSPC,0.0012,"));
    }

    #[test]
    fn test_multiple_fits_csv() {
        let records = vec![record("AAPL", 1.21), record("INTC", 0.74)];
        let csv = records.export_to_string(ExportFormat::Csv).unwrap();
        assert_eq!(csv.lines().count(), 3);
        assert!(csv.contains("INTC,GSPC"));
    }

    #[test]
    fn test_fit_export_json() {
        let json = record("MSFT", 1.05).export_to_string(ExportFormat::Json).unwrap();
        let parsed: CapmFitExport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.symbol, "MSFT");
        assert_eq!(parsed.nobs, 60);
        assert!((parsed.beta - 1.05).abs() < 1e-12);

        let pretty = record("MSFT", 1.05)
            .export_to_string(ExportFormat::PrettyJson)
            .unwrap();
        assert!(pretty.contains("\n  \"symbol\": \"MSFT\""));
    }

    #[test]
    fn test_table_export_csv() {
        let table = PriceTable::from_columns(
            &[date(4), date(5)],
            &[
                ("IBM", vec![Some(118.49), None]),
                ("GSPC", vec![Some(3700.65), Some(3726.86)]),
            ],
        )
        .unwrap();
        let export = TableExport::from_table("prices", &table).unwrap();

        assert_eq!(export.symbols, vec!["IBM", "GSPC"]);
        assert_eq!(export.rows[1].values, vec![None, Some(3726.86)]);

        let csv = export.export_to_string(ExportFormat::Csv).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "date,IBM,GSPC");
        assert_eq!(lines[1], "2021-01-04,118.49,3700.65");
        assert_eq!(lines[2], "2021-01-05,,3726.86");
    }

    #[test]
    fn test_table_export_json() {
        let table =
            PriceTable::from_columns(&[date(4)], &[("AAPL", vec![Some(129.41)])]).unwrap();
        let json = TableExport::from_table("prices", &table)
            .unwrap()
            .export_to_string(ExportFormat::Json)
            .unwrap();
        assert_eq!(
            json,
            r#"{"name":"prices","symbols":["AAPL"],"rows":[{"date":"2021-01-04","values":[129.41]}]}"#
        );
    }
}
