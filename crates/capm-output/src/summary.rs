//! Terminal and Markdown rendering of analysis results.

use crate::export::{CapmFitExport, fit_records};
use capm_model::CapmFit;
use capm_returns::{CorrelationMatrix, SummaryStatistics};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

const WIDTH: usize = 96;

/// Significance marker for a p-value.
///
/// `***` below 0.001, `**` below 0.01, `*` below 0.05, `.` below 0.1.
pub fn significance(p_value: f64) -> &'static str {
    match p_value {
        p if p < 0.001 => "***",
        p if p < 0.01 => "**",
        p if p < 0.05 => "*",
        p if p < 0.1 => ".",
        _ => "",
    }
}

/// Fitted alphas and betas of one analysis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CapmSummary {
    /// Market symbol the assets were regressed on.
    pub market: String,

    /// First date of the excess-return sample.
    pub period_start: Option<NaiveDate>,

    /// Last date of the excess-return sample.
    pub period_end: Option<NaiveDate>,

    /// One record per asset.
    pub fits: Vec<CapmFitExport>,
}

impl CapmSummary {
    /// Summarise a set of fits against `market`.
    pub fn new(market: impl Into<String>, fits: &[CapmFit]) -> Self {
        Self {
            market: market.into(),
            period_start: None,
            period_end: None,
            fits: fit_records(fits),
        }
    }

    /// Record the sample period.
    pub const fn with_period(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.period_start = Some(start);
        self.period_end = Some(end);
        self
    }

    fn period(&self) -> Option<String> {
        match (self.period_start, self.period_end) {
            (Some(start), Some(end)) => Some(format!("{} to {}", start, end)),
            _ => None,
        }
    }

    /// Format as ASCII table for terminal display.
    pub fn to_ascii_table(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("\nCAPM Regressions vs {}\n", self.market));
        if let Some(period) = self.period() {
            output.push_str(&format!("Period: {}\n", period));
        }
        output.push_str(&"=".repeat(WIDTH));
        output.push('\n');

        output.push_str(&format!(
            "{:<10} {:>11} {:>9} {:>10} {:>9} {:>19} {:>8} {:>8} {:>6}\n",
            "Symbol", "Alpha", "p(α)", "Beta", "p(β)", "95% CI (β)", "R²", "DW", "N"
        ));
        output.push_str(&"-".repeat(WIDTH));
        output.push('\n');

        for fit in &self.fits {
            let ci = format!("[{:.3}, {:.3}]", fit.beta_ci_lower, fit.beta_ci_upper);
            output.push_str(&format!(
                "{:<10} {:>11.6} {:>9.4} {:>7.4}{:<3} {:>9.4} {:>19} {:>8.4} {:>8.3} {:>6}\n",
                fit.symbol,
                fit.alpha,
                fit.alpha_p_value,
                fit.beta,
                significance(fit.beta_p_value),
                fit.beta_p_value,
                ci,
                fit.r_squared,
                fit.durbin_watson,
                fit.nobs
            ));
        }

        output.push_str(&"=".repeat(WIDTH));
        output.push('\n');
        output.push_str("Signif. codes: 0 '***' 0.001 '**' 0.01 '*' 0.05 '.' 0.1\n");

        output
    }

    /// Format as Markdown for documentation.
    pub fn to_markdown(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("# CAPM Regressions vs {}\n\n", self.market));
        if let Some(period) = self.period() {
            output.push_str(&format!("**Period:** {}\n\n", period));
        }

        output.push_str("| Symbol | Alpha | Alpha SE | Beta | Beta SE | Beta p | R² | Adj. R² | N |\n");
        output.push_str("|--------|-------|----------|------|---------|--------|----|---------|---|\n");
        for fit in &self.fits {
            output.push_str(&format!(
                "| {} | {:.6} | {:.6} | {:.4}{} | {:.4} | {:.4} | {:.4} | {:.4} | {} |\n",
                fit.symbol,
                fit.alpha,
                fit.alpha_std_error,
                fit.beta,
                significance(fit.beta_p_value),
                fit.beta_std_error,
                fit.beta_p_value,
                fit.r_squared,
                fit.adj_r_squared,
                fit.nobs
            ));
        }

        output
    }
}

impl fmt::Display for CapmSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "CAPM vs {}", self.market)?;
        for fit in &self.fits {
            writeln!(
                f,
                "  {}: alpha {:.6}, beta {:.4} (R² {:.3})",
                fit.symbol, fit.alpha, fit.beta, fit.r_squared
            )?;
        }
        Ok(())
    }
}

/// Descriptive statistics as an ASCII table, one row per symbol.
pub fn statistics_table(title: &str, statistics: &[SummaryStatistics]) -> String {
    let mut output = String::new();

    output.push_str(&format!("\n{}\n", title));
    output.push_str(&"=".repeat(WIDTH));
    output.push('\n');
    output.push_str(&format!(
        "{:<10} {:>6} {:>11} {:>11} {:>11} {:>11} {:>11} {:>11} {:>11}\n",
        "Symbol", "Count", "Mean", "Std", "Min", "25%", "50%", "75%", "Max"
    ));
    output.push_str(&"-".repeat(WIDTH));
    output.push('\n');

    for s in statistics {
        output.push_str(&format!(
            "{:<10} {:>6} {:>11.4} {:>11.4} {:>11.4} {:>11.4} {:>11.4} {:>11.4} {:>11.4}\n",
            s.symbol, s.count, s.mean, s.std, s.min, s.q25, s.median, s.q75, s.max
        ));
    }

    output.push_str(&"=".repeat(WIDTH));
    output.push('\n');
    output
}

/// Correlation matrix as an ASCII table.
pub fn correlation_table(title: &str, matrix: &CorrelationMatrix) -> String {
    let mut output = String::new();
    let width = 10 + 9 * matrix.symbols.len();

    output.push_str(&format!("\n{}\n", title));
    output.push_str(&"=".repeat(width));
    output.push('\n');

    output.push_str(&format!("{:<10}", ""));
    for symbol in &matrix.symbols {
        output.push_str(&format!(" {:>8}", symbol));
    }
    output.push('\n');
    output.push_str(&"-".repeat(width));
    output.push('\n');

    for (i, row_symbol) in matrix.symbols.iter().enumerate() {
        output.push_str(&format!("{:<10}", row_symbol));
        for j in 0..matrix.symbols.len() {
            let value = matrix.values[[i, j]];
            if value.is_nan() {
                output.push_str(&format!(" {:>8}", "-"));
            } else {
                output.push_str(&format!(" {:>8.4}", value));
            }
        }
        output.push('\n');
    }

    output.push_str(&"=".repeat(width));
    output.push('\n');
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use capm_returns::{PriceTable, correlation_matrix};
    use rstest::rstest;

    fn matrix() -> CorrelationMatrix {
        let dates: Vec<NaiveDate> = (4..8)
            .map(|d| NaiveDate::from_ymd_opt(2021, 1, d).unwrap())
            .collect();
        let table = PriceTable::from_columns(
            &dates,
            &[
                ("AAPL", vec![Some(129.4), Some(131.0), Some(126.6), Some(130.9)]),
                ("FLAT", vec![Some(1.0), Some(1.0), Some(1.0), Some(1.0)]),
            ],
        )
        .unwrap();
        correlation_matrix(&table).unwrap()
    }

    fn summary() -> CapmSummary {
        let record = |symbol: &str, beta: f64, p: f64| CapmFitExport {
            symbol: symbol.to_string(),
            market: "GSPC".to_string(),
            alpha: 0.0009,
            alpha_std_error: 0.0011,
            alpha_t_value: 0.82,
            alpha_p_value: 0.41,
            beta,
            beta_std_error: 0.12,
            beta_t_value: beta / 0.12,
            beta_p_value: p,
            beta_ci_lower: beta - 0.24,
            beta_ci_upper: beta + 0.24,
            r_squared: 0.55,
            adj_r_squared: 0.54,
            f_statistic: 70.0,
            f_pvalue: p,
            residual_std_error: 0.012,
            durbin_watson: 2.1,
            nobs: 61,
        };
        CapmSummary {
            market: "GSPC".to_string(),
            period_start: None,
            period_end: None,
            fits: vec![record("AAPL", 1.18, 1e-9), record("IBM", 0.21, 0.08)],
        }
        .with_period(
            NaiveDate::from_ymd_opt(2021, 1, 5).unwrap(),
            NaiveDate::from_ymd_opt(2021, 3, 31).unwrap(),
        )
    }

    #[rstest]
    #[case(0.0001, "***")]
    #[case(0.005, "**")]
    #[case(0.03, "*")]
    #[case(0.07, ".")]
    #[case(0.5, "")]
    #[case(f64::NAN, "")]
    fn test_significance(#[case] p: f64, #[case] expected: &str) {
        assert_eq!(significance(p), expected);
    }

    #[test]
    fn test_summary_ascii_table() {
        let table = summary().to_ascii_table();
        assert!(table.contains("CAPM Regressions vs GSPC"));
        assert!(table.contains("Period: 2021-01-05 to 2021-03-31"));
        assert!(table.contains("AAPL"));
        assert!(table.contains("1.1800***"));
        assert!(table.contains("0.2100."));
        assert!(table.contains("[0.940, 1.420]"));
    }

    #[test]
    fn test_summary_markdown() {
        let md = summary().to_markdown();
        assert!(md.starts_with("# CAPM Regressions vs GSPC"));
        assert!(md.contains("| Symbol | Alpha |"));
        assert!(md.contains("| IBM | 0.000900 |"));
        assert_eq!(md.lines().filter(|l| l.starts_with("| ")).count(), 3);
    }

    #[test]
    fn test_summary_display() {
        let text = summary().to_string();
        assert!(text.starts_with("CAPM vs GSPC"));
        assert!(text.contains("IBM: alpha 0.000900, beta 0.2100"));
    }

    #[test]
    fn test_statistics_table() {
        let stats = vec![SummaryStatistics::from_values(
            "MSFT",
            &[Some(217.69), Some(217.9), Some(212.25)],
        )];
        let table = statistics_table("Prices", &stats);
        assert!(table.contains("Prices"));
        assert!(table.contains("MSFT"));
        assert!(table.contains("212.2500"));
    }

    #[test]
    fn test_correlation_table_marks_undefined() {
        let table = correlation_table("Correlation", &matrix());
        let rows: Vec<&str> = table.lines().filter(|l| l.starts_with("AAPL")).collect();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].contains("1.0000"));
        assert!(rows[0].trim_end().ends_with('-'));
    }
}
