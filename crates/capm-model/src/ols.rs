//! Ordinary least squares regression with standard fit diagnostics.
//!
//! The normal equations are solved through a Cholesky factorisation of
//! `XᵀX`. The same factor gives `(XᵀX)⁻¹`, from which the classical
//! (non-robust) coefficient covariance `σ²(XᵀX)⁻¹` follows.
//!
//! Diagnostics follow the usual textbook definitions:
//! ```text
//! R²       = 1 - SSR / TSS            (TSS centred when an intercept is fitted)
//! adj. R²  = 1 - (n - k_c) / (n - k) · (1 - R²)
//! F        = ((TSS - SSR) / df_model) / (SSR / df_resid)
//! log L    = -n/2 · (ln 2π + ln(SSR / n) + 1)
//! AIC      = -2 log L + 2k
//! BIC      = -2 log L + k ln n
//! DW       = Σ (e_t - e_{t-1})² / SSR
//! ```

use crate::error::{ModelError, Result};
use nalgebra::{Cholesky, DMatrix, DVector, Dyn};
use ndarray::{Array1, Array2, s};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, FisherSnedecor, StudentsT};
use tracing::debug;

/// Name given to the intercept coefficient.
pub const INTERCEPT: &str = "const";

/// OLS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OlsConfig {
    /// Prepend a column of ones to the regressors (default: true)
    pub add_intercept: bool,

    /// Coverage of the reported confidence intervals (default: 0.95)
    pub confidence_level: f64,

    /// Smallest admissible Cholesky pivot relative to the column's own
    /// sum of squares (default: 1e-10)
    pub rank_tolerance: f64,
}

impl Default for OlsConfig {
    fn default() -> Self {
        Self {
            add_intercept: true,
            confidence_level: 0.95,
            rank_tolerance: 1e-10,
        }
    }
}

/// One estimated coefficient with its inference statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coefficient {
    /// Regressor name
    pub name: String,
    /// Point estimate
    pub estimate: f64,
    /// Standard error
    pub std_error: f64,
    /// t-statistic against zero
    pub t_value: f64,
    /// Two-sided p-value
    pub p_value: f64,
    /// Lower confidence bound
    pub ci_lower: f64,
    /// Upper confidence bound
    pub ci_upper: f64,
}

/// Result of an OLS fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OlsFit {
    /// Coefficients, intercept first when fitted
    pub coefficients: Vec<Coefficient>,
    /// Number of observations
    pub nobs: usize,
    /// Model degrees of freedom (parameters excluding the intercept)
    pub df_model: usize,
    /// Residual degrees of freedom
    pub df_resid: usize,
    /// Coefficient of determination
    pub r_squared: f64,
    /// R² adjusted for the number of parameters
    pub adj_r_squared: f64,
    /// F-statistic of the joint test that all slopes are zero
    pub f_statistic: f64,
    /// p-value of the F-statistic
    pub f_pvalue: f64,
    /// Sum of squared residuals
    pub ssr: f64,
    /// Residual standard error, `sqrt(SSR / df_resid)`
    pub residual_std_error: f64,
    /// Gaussian log-likelihood
    pub log_likelihood: f64,
    /// Akaike information criterion
    pub aic: f64,
    /// Bayesian information criterion
    pub bic: f64,
    /// Durbin-Watson statistic of the residuals
    pub durbin_watson: f64,
    /// Coverage of the confidence intervals
    pub confidence_level: f64,
    /// Residuals in observation order
    #[serde(skip_serializing, default)]
    pub residuals: Vec<f64>,
}

impl OlsFit {
    /// Look up a coefficient by name.
    pub fn coefficient(&self, name: &str) -> Option<&Coefficient> {
        self.coefficients.iter().find(|c| c.name == name)
    }

    /// Point estimates in regressor order.
    pub fn params(&self) -> Vec<f64> {
        self.coefficients.iter().map(|c| c.estimate).collect()
    }
}

/// Ordinary least squares estimator
#[derive(Debug, Clone, Default)]
pub struct Ols {
    config: OlsConfig,
    names: Option<Vec<String>>,
}

impl Ols {
    /// Create an estimator with the given configuration
    pub const fn new(config: OlsConfig) -> Self {
        Self {
            config,
            names: None,
        }
    }

    /// Name the regressor columns; unnamed columns are `x1`, `x2`, ...
    pub fn with_names<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Configuration in use
    pub const fn config(&self) -> &OlsConfig {
        &self.config
    }

    /// Regress `y` on the columns of `x`.
    ///
    /// # Arguments
    /// * `y` - Dependent variable, one value per observation
    /// * `x` - Regressors, one row per observation and one column per variable
    ///
    /// # Errors
    /// - `DimensionMismatch` if `x` and `y` disagree on the number of rows,
    ///   or the names disagree with the number of columns
    /// - `NonFinite` if any input is NaN or infinite
    /// - `InsufficientData` with fewer than `k + 1` observations
    /// - `Singular` if the design matrix is rank deficient
    pub fn fit(&self, y: &Array1<f64>, x: &Array2<f64>) -> Result<OlsFit> {
        let level = self.config.confidence_level;
        if !(level > 0.0 && level < 1.0) {
            return Err(ModelError::InvalidParameter(format!(
                "confidence level must be in (0, 1), got {}",
                level
            )));
        }

        let n = y.len();
        if x.nrows() != n {
            return Err(ModelError::DimensionMismatch {
                expected: n,
                actual: x.nrows(),
            });
        }
        if let Some(names) = &self.names
            && names.len() != x.ncols()
        {
            return Err(ModelError::DimensionMismatch {
                expected: x.ncols(),
                actual: names.len(),
            });
        }
        if y.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::NonFinite("dependent variable".to_string()));
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::NonFinite("regressors".to_string()));
        }

        let k_const = usize::from(self.config.add_intercept);
        let design = if self.config.add_intercept {
            let mut design = Array2::<f64>::ones((n, x.ncols() + 1));
            design.slice_mut(s![.., 1..]).assign(x);
            design
        } else {
            x.to_owned()
        };

        let k = design.ncols();
        if k == 0 {
            return Err(ModelError::InvalidParameter(
                "regression needs at least one regressor".to_string(),
            ));
        }
        if n < k + 1 {
            return Err(ModelError::InsufficientData {
                required: k + 1,
                actual: n,
            });
        }

        let xtx = design.t().dot(&design);
        let xty = design.t().dot(y);
        let factor = cholesky(
            DMatrix::from_fn(k, k, |i, j| xtx[[i, j]]),
            self.config.rank_tolerance,
        )?;
        let beta: Array1<f64> = factor
            .solve(&DVector::from_iterator(k, xty.iter().copied()))
            .iter()
            .copied()
            .collect();
        let xtx_inv = factor.inverse();

        let residuals = y - &design.dot(&beta);
        let ssr = residuals.dot(&residuals);
        let df_resid = n - k;
        let df_model = k - k_const;
        let sigma2 = ssr / df_resid as f64;

        let tss = if self.config.add_intercept {
            let mean = y.sum() / n as f64;
            y.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
        } else {
            y.dot(y)
        };
        let r_squared = if tss > 0.0 { 1.0 - ssr / tss } else { f64::NAN };
        let adj_r_squared =
            1.0 - (n - k_const) as f64 / df_resid as f64 * (1.0 - r_squared);

        let t_dist = StudentsT::new(0.0, 1.0, df_resid as f64)
            .map_err(|e| ModelError::Distribution(e.to_string()))?;
        let t_critical = t_dist.inverse_cdf(1.0 - (1.0 - level) / 2.0);

        let coefficients = beta
            .iter()
            .enumerate()
            .map(|(j, &estimate)| {
                let std_error = (sigma2 * xtx_inv[(j, j)]).sqrt();
                let t_value = estimate / std_error;
                Coefficient {
                    name: self.coefficient_name(j, k_const),
                    estimate,
                    std_error,
                    t_value,
                    p_value: two_sided_p_value(&t_dist, t_value),
                    ci_lower: estimate - t_critical * std_error,
                    ci_upper: estimate + t_critical * std_error,
                }
            })
            .collect();

        let (f_statistic, f_pvalue) = if df_model > 0 {
            let f = ((tss - ssr) / df_model as f64) / sigma2;
            let f_dist = FisherSnedecor::new(df_model as f64, df_resid as f64)
                .map_err(|e| ModelError::Distribution(e.to_string()))?;
            let p = if f.is_nan() {
                f64::NAN
            } else if f.is_infinite() {
                0.0
            } else {
                f_dist.sf(f)
            };
            (f, p)
        } else {
            (f64::NAN, f64::NAN)
        };

        let nobs = n as f64;
        let log_likelihood =
            -nobs / 2.0 * ((2.0 * std::f64::consts::PI).ln() + (ssr / nobs).ln() + 1.0);
        let aic = -2.0 * log_likelihood + 2.0 * k as f64;
        let bic = -2.0 * log_likelihood + k as f64 * nobs.ln();

        let durbin_watson = residuals
            .windows(2)
            .into_iter()
            .map(|w| (w[1] - w[0]).powi(2))
            .sum::<f64>()
            / ssr;

        debug!(nobs = n, k, r_squared, "fitted OLS regression");

        Ok(OlsFit {
            coefficients,
            nobs: n,
            df_model,
            df_resid,
            r_squared,
            adj_r_squared,
            f_statistic,
            f_pvalue,
            ssr,
            residual_std_error: sigma2.sqrt(),
            log_likelihood,
            aic,
            bic,
            durbin_watson,
            confidence_level: level,
            residuals: residuals.to_vec(),
        })
    }

    fn coefficient_name(&self, j: usize, k_const: usize) -> String {
        if j < k_const {
            return INTERCEPT.to_string();
        }
        let column = j - k_const;
        self.names
            .as_ref()
            .and_then(|names| names.get(column).cloned())
            .unwrap_or_else(|| format!("x{}", column + 1))
    }
}

fn two_sided_p_value(dist: &StudentsT, t: f64) -> f64 {
    if t.is_nan() {
        f64::NAN
    } else if t.is_infinite() {
        0.0
    } else {
        2.0 * dist.sf(t.abs())
    }
}

/// Cholesky factorisation of the normal equations `XᵀX`.
///
/// A squared diagonal of the factor that falls below `tolerance` times the
/// column's diagonal entry means the column is (numerically) a combination
/// of earlier columns.
fn cholesky(a: DMatrix<f64>, tolerance: f64) -> Result<Cholesky<f64, Dyn>> {
    let diagonal = a.diagonal();
    let factor = a.cholesky().ok_or_else(|| {
        ModelError::Singular("normal equations are not positive definite".to_string())
    })?;

    let l = factor.l_dirty();
    for (j, &scale) in diagonal.iter().enumerate() {
        let pivot = l[(j, j)] * l[(j, j)];
        if !(scale > 0.0 && pivot > tolerance * scale) {
            return Err(ModelError::Singular(format!(
                "column {} is collinear with earlier columns (pivot {:e})",
                j, pivot
            )));
        }
    }

    Ok(factor)
}
