//! CAPM alpha and beta per asset.
//!
//! Each asset's excess return is regressed on the market's excess return:
//! ```text
//! r_i - r_f = α_i + β_i (r_m - r_f) + ε_i
//! ```

use crate::error::{ModelError, Result};
use crate::ols::{INTERCEPT, Ols, OlsConfig, OlsFit};
use capm_returns::{DateTable, ExcessReturnTable};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Alpha and beta of one asset against the market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapmFit {
    /// Asset column
    pub symbol: String,
    /// Market column the asset was regressed on
    pub market: String,
    /// Intercept
    pub alpha: f64,
    /// Slope on the market excess return
    pub beta: f64,
    /// Full regression output
    pub fit: OlsFit,
}

impl CapmFit {
    fn from_ols(symbol: &str, market: &str, fit: OlsFit) -> Result<Self> {
        let alpha = fit
            .coefficient(INTERCEPT)
            .map(|c| c.estimate)
            .ok_or_else(|| ModelError::InvalidParameter("fit has no intercept".to_string()))?;
        let beta = fit
            .coefficient(market)
            .map(|c| c.estimate)
            .ok_or_else(|| ModelError::MissingMarket(market.to_string()))?;

        Ok(Self {
            symbol: symbol.to_string(),
            market: market.to_string(),
            alpha,
            beta,
            fit,
        })
    }
}

/// Fits the single-factor market model to every asset of a table
#[derive(Debug, Clone)]
pub struct CapmEstimator {
    market: String,
    confidence_level: f64,
}

impl CapmEstimator {
    /// Create an estimator regressing on the given market column
    pub fn new(market: impl Into<String>) -> Self {
        Self {
            market: market.into(),
            confidence_level: OlsConfig::default().confidence_level,
        }
    }

    /// Set the coverage of the reported confidence intervals
    pub const fn with_confidence_level(mut self, level: f64) -> Self {
        self.confidence_level = level;
        self
    }

    /// Market column name
    pub fn market(&self) -> &str {
        &self.market
    }

    fn ols(&self) -> Ols {
        Ols::new(OlsConfig {
            add_intercept: true,
            confidence_level: self.confidence_level,
            ..Default::default()
        })
        .with_names([self.market.as_str()])
    }

    fn market_design(&self, excess: &ExcessReturnTable) -> Result<Array2<f64>> {
        if !excess.contains(&self.market) {
            return Err(ModelError::MissingMarket(self.market.clone()));
        }
        let market = excess.values(&self.market)?;
        let n = market.len();
        Array2::from_shape_vec((n, 1), market).map_err(|e| {
            ModelError::InvalidParameter(format!("cannot shape market column: {}", e))
        })
    }

    /// Fit one asset.
    ///
    /// # Errors
    /// - `MissingMarket` if the market column is absent
    /// - any [`Ols::fit`] error, e.g. `Singular` for a constant market series
    pub fn fit_asset(&self, excess: &ExcessReturnTable, symbol: &str) -> Result<CapmFit> {
        let x = self.market_design(excess)?;
        self.fit_with_design(excess, symbol, &x)
    }

    fn fit_with_design(
        &self,
        excess: &ExcessReturnTable,
        symbol: &str,
        x: &Array2<f64>,
    ) -> Result<CapmFit> {
        let y = Array1::from(excess.values(symbol)?);
        let fit = self.ols().fit(&y, x)?;
        let capm = CapmFit::from_ols(symbol, &self.market, fit)?;

        debug!(
            symbol,
            alpha = capm.alpha,
            beta = capm.beta,
            r_squared = capm.fit.r_squared,
            "fitted CAPM regression"
        );
        Ok(capm)
    }

    /// Fit every non-market column, in column order.
    pub fn fit(&self, excess: &ExcessReturnTable) -> Result<Vec<CapmFit>> {
        let x = self.market_design(excess)?;
        let assets: Vec<String> = excess
            .symbols()
            .into_iter()
            .filter(|s| *s != self.market)
            .collect();

        let fits = assets
            .iter()
            .map(|symbol| self.fit_with_design(excess, symbol, &x))
            .collect::<Result<Vec<_>>>()?;

        info!(
            assets = fits.len(),
            market = %self.market,
            observations = excess.height(),
            "CAPM regressions complete"
        );
        Ok(fits)
    }
}

/// Regress every non-market column of `excess` on `market`.
pub fn fit_capm(excess: &ExcessReturnTable, market: &str) -> Result<Vec<CapmFit>> {
    CapmEstimator::new(market).fit(excess)
}
