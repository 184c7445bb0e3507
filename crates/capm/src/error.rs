//! Errors surfaced by the analysis pipeline.

use capm_data::DataError;
use capm_model::ModelError;
use capm_returns::ReturnsError;
use thiserror::Error;

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, CapmError>;

/// Errors from any stage of an analysis.
#[derive(Debug, Error)]
pub enum CapmError {
    /// Invalid analysis configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Reading a configuration file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file is not valid JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Acquisition failed
    #[error(transparent)]
    Data(#[from] DataError),

    /// Cleaning or transformation failed
    #[error(transparent)]
    Returns(#[from] ReturnsError),

    /// Regression failed
    #[error(transparent)]
    Model(#[from] ModelError),
}
