//! Analysis settings.
//!
//! Every field has a default, so a JSON file only needs the fields it
//! changes:
//! ```json
//! { "symbols": ["NVDA", "AMD"], "start": "2022-01-01", "end": "2022-12-31" }
//! ```

use crate::error::{CapmError, Result};
use crate::universe::{DEFAULT_ASSETS, DEFAULT_MARKET, SymbolSet};
use capm_returns::{AlignmentPolicy, PriceField, RateUnit, THREE_MONTH_TERM_DAYS};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// FRED series of the 3-month Treasury bill secondary market rate.
pub const DEFAULT_RISK_FREE_SERIES: &str = "DGS3MO";

/// Settings of one CAPM analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Asset tickers
    pub symbols: Vec<String>,

    /// Market index ticker
    pub market: String,

    /// First date of the price window (inclusive)
    pub start: NaiveDate,

    /// Last date of the window; prices stop the day before, rates include it
    pub end: NaiveDate,

    /// FRED series used as the risk-free rate
    pub risk_free_series: String,

    /// How the risk-free series is quoted
    pub rate_unit: RateUnit,

    /// Term of the risk-free instrument in days
    pub term_days: u32,

    /// Which quote column to use as the price
    pub price_field: PriceField,

    /// How to reconcile return and risk-free dates
    pub alignment: AlignmentPolicy,

    /// Coverage of reported confidence intervals
    pub confidence_level: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            symbols: DEFAULT_ASSETS.iter().map(|s| s.to_string()).collect(),
            market: DEFAULT_MARKET.to_string(),
            start: NaiveDate::from_ymd_opt(2021, 1, 1).unwrap_or_default(),
            end: NaiveDate::from_ymd_opt(2021, 4, 1).unwrap_or_default(),
            risk_free_series: DEFAULT_RISK_FREE_SERIES.to_string(),
            rate_unit: RateUnit::Percent,
            term_days: THREE_MONTH_TERM_DAYS,
            price_field: PriceField::Close,
            alignment: AlignmentPolicy::Intersect,
            confidence_level: 0.95,
        }
    }
}

impl AnalysisConfig {
    /// Parse a JSON configuration and validate it.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file and validate it.
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Check the settings for consistency.
    ///
    /// # Errors
    /// `Config` for an empty or inverted window, a zero term, an empty
    /// series id, a confidence level outside `(0, 1)` or an unusable symbol set.
    pub fn validate(&self) -> Result<()> {
        if self.start >= self.end {
            return Err(CapmError::Config(format!(
                "start {} must be before end {}",
                self.start, self.end
            )));
        }
        if self.term_days == 0 {
            return Err(CapmError::Config("term_days must be positive".to_string()));
        }
        if self.risk_free_series.trim().is_empty() {
            return Err(CapmError::Config("risk_free_series is empty".to_string()));
        }
        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(CapmError::Config(format!(
                "confidence_level must be in (0, 1), got {}",
                self.confidence_level
            )));
        }
        self.universe().map(|_| ())
    }

    /// Assets and market as a [`SymbolSet`].
    pub fn universe(&self) -> Result<SymbolSet> {
        SymbolSet::new(&self.symbols, &self.market)
    }
}
