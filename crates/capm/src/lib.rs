#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod pipeline;
pub mod universe;

// Re-export main types from sub-crates
pub use capm_data as data;
pub use capm_model as model;
pub use capm_output as output;
pub use capm_returns as returns;

pub use config::{AnalysisConfig, DEFAULT_RISK_FREE_SERIES};
pub use error::{CapmError, Result};
pub use pipeline::{CapmAnalysis, Pipeline};
pub use universe::{DEFAULT_ASSETS, DEFAULT_MARKET, SymbolSet, Universe};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
