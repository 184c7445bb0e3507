#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod capm;
pub mod error;
pub mod ols;

pub use capm::{CapmEstimator, CapmFit, fit_capm};
pub use error::{ModelError, Result};
pub use ols::{Coefficient, INTERCEPT, Ols, OlsConfig, OlsFit};
