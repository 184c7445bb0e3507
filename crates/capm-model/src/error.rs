//! Error types for regression.

use capm_returns::ReturnsError;
use thiserror::Error;

/// Result type for model estimation.
pub type Result<T> = std::result::Result<T, ModelError>;

/// Errors that can occur while fitting a regression.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Not enough observations for the number of parameters
    #[error("Insufficient data: need at least {required} observations, got {actual}")]
    InsufficientData {
        /// Required number of observations
        required: usize,
        /// Actual number of observations
        actual: usize,
    },

    /// Design matrix does not have full column rank
    #[error("Singular design matrix: {0}")]
    Singular(String),

    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension
        actual: usize,
    },

    /// Input contains NaN or infinity
    #[error("Non-finite value in {0}")]
    NonFinite(String),

    /// Market column not present in the excess-return table
    #[error("Market symbol not found: {0}")]
    MissingMarket(String),

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Distribution could not be constructed
    #[error("Distribution error: {0}")]
    Distribution(String),

    /// Error reading the input table
    #[error(transparent)]
    Returns(#[from] ReturnsError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ModelError::InsufficientData {
            required: 3,
            actual: 2,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient data: need at least 3 observations, got 2"
        );

        let err = ModelError::MissingMarket("GSPC".to_string());
        assert_eq!(err.to_string(), "Market symbol not found: GSPC");
    }

    #[test]
    fn test_from_returns_error() {
        let err: ModelError = ReturnsError::MissingColumn("IBM".to_string()).into();
        assert!(matches!(err, ModelError::Returns(_)));
        assert_eq!(err.to_string(), "Missing column: IBM");
    }
}
