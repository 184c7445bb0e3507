//! Federal Reserve Economic Data (FRED) integration.
//!
//! Provides the risk-free rate side of the pipeline:
//! - Daily series observations (e.g., `DGS3MO`, the 3-month Treasury yield)
//! - Series search, to discover candidate risk-free series
//!
//! FRED requires an API key, read from `FRED_API_KEY` by [`FredClient::from_env`].
//!
//! # Example
//!
//! ```no_run
//! use capm_data::fred::FredClient;
//! use chrono::NaiveDate;
//!
//! # async fn example() -> capm_data::Result<()> {
//! let client = FredClient::from_env()?;
//! let start = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
//! let end = NaiveDate::from_ymd_opt(2021, 4, 1).unwrap();
//! let rates = client.get_series("DGS3MO", start, end).await?;
//! println!("{} observations", rates.height());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod series;

pub use client::{FRED_API_KEY_VAR, FredClient};
pub use series::{
    RateObservation, SeriesInfo, observations_to_frame, parse_observations, parse_search,
};
