//! FRED response payloads and their conversion to frames.

use crate::error::{DataError, Result};
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// FRED marks missing observations (e.g. bank holidays) with a lone dot.
const MISSING_VALUE: &str = ".";

/// A single dated observation of a FRED series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateObservation {
    /// Observation date
    pub date: NaiveDate,
    /// Observed value, `None` when FRED reports it as missing
    pub value: Option<f64>,
}

/// Metadata for a series returned by the FRED search endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesInfo {
    /// Series identifier (e.g., "DGS3MO")
    pub id: String,
    /// Human readable title
    pub title: String,
    /// Observation frequency (e.g., "Daily")
    #[serde(default)]
    pub frequency: String,
    /// Units (e.g., "Percent")
    #[serde(default)]
    pub units: String,
    /// FRED popularity score
    #[serde(default)]
    pub popularity: i64,
    /// First available observation
    #[serde(default)]
    pub observation_start: String,
    /// Last available observation
    #[serde(default)]
    pub observation_end: String,
}

#[derive(Debug, Deserialize)]
struct RawObservation {
    date: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct ObservationsResponse {
    observations: Vec<RawObservation>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    seriess: Vec<SeriesInfo>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error_message: String,
}

/// Parse the body of a `series/observations` response.
pub fn parse_observations(body: &str) -> Result<Vec<RateObservation>> {
    let response: ObservationsResponse = serde_json::from_str(body)?;

    response
        .observations
        .into_iter()
        .map(|raw| {
            let date = NaiveDate::parse_from_str(&raw.date, "%Y-%m-%d")
                .map_err(|e| DataError::Parse(format!("Invalid date {}: {}", raw.date, e)))?;
            let value = if raw.value.trim() == MISSING_VALUE {
                None
            } else {
                Some(raw.value.trim().parse::<f64>().map_err(|e| {
                    DataError::Parse(format!("Invalid value {} on {}: {}", raw.value, date, e))
                })?)
            };
            Ok(RateObservation { date, value })
        })
        .collect()
}

/// Parse the body of a `series/search` response.
pub fn parse_search(body: &str) -> Result<Vec<SeriesInfo>> {
    let response: SearchResponse = serde_json::from_str(body)?;
    Ok(response.seriess)
}

/// Convert observations into a frame with columns: date, rate.
///
/// Rows are sorted by date; missing values stay as nulls.
pub fn observations_to_frame(observations: &[RateObservation]) -> Result<DataFrame> {
    let dates: Vec<String> = observations.iter().map(|o| o.date.to_string()).collect();
    let values: Vec<Option<f64>> = observations.iter().map(|o| o.value).collect();

    let df = DataFrame::new(vec![
        Series::new("date".into(), dates).into(),
        Series::new("rate".into(), values).into(),
    ])?;

    let df = df
        .lazy()
        .with_column(col("date").cast(DataType::Date))
        .sort(["date"], SortMultipleOptions::default())
        .collect()?;

    Ok(df)
}
