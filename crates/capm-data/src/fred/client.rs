//! Federal Reserve Economic Data (FRED) API client with rate limiting.

use super::series::{
    ErrorResponse, RateObservation, SeriesInfo, observations_to_frame, parse_observations,
    parse_search,
};
use crate::error::{DataError, Result};
use chrono::NaiveDate;
use polars::prelude::DataFrame;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};
use tracing::debug;

/// FRED API base URL
const FRED_BASE_URL: &str = "https://api.stlouisfed.org/fred";

/// Environment variable holding the FRED API key
pub const FRED_API_KEY_VAR: &str = "FRED_API_KEY";

/// FRED allows 120 requests per minute
const DEFAULT_RATE_LIMIT: Duration = Duration::from_millis(500);

/// Rate limiter keeping a minimum interval between requests
struct RateLimiter {
    last_request: Instant,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval: Duration) -> Self {
        Self {
            last_request: Instant::now() - min_interval,
            min_interval,
        }
    }

    async fn wait(&mut self) {
        let elapsed = self.last_request.elapsed();
        if elapsed < self.min_interval {
            sleep(self.min_interval - elapsed).await;
        }
        self.last_request = Instant::now();
    }
}

/// FRED API client
pub struct FredClient {
    client: reqwest::Client,
    api_key: String,
    rate_limiter: Arc<Mutex<RateLimiter>>,
    base_url: String,
}

impl FredClient {
    /// Create a new FRED client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_rate_limit(api_key, DEFAULT_RATE_LIMIT)
    }

    /// Create a new FRED client reading the key from `FRED_API_KEY`.
    ///
    /// # Errors
    /// Returns `DataError::MissingApiKey` if the variable is unset or empty.
    pub fn from_env() -> Result<Self> {
        match std::env::var(FRED_API_KEY_VAR) {
            Ok(key) if !key.trim().is_empty() => Self::new(key.trim()),
            _ => Err(DataError::MissingApiKey {
                variable: FRED_API_KEY_VAR.to_string(),
            }),
        }
    }

    /// Create a new FRED client with a custom minimum interval between requests.
    pub fn with_rate_limit(api_key: impl Into<String>, min_interval: Duration) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(DataError::MissingApiKey {
                variable: FRED_API_KEY_VAR.to_string(),
            });
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(DataError::Network)?;

        Ok(Self {
            client,
            api_key,
            rate_limiter: Arc::new(Mutex::new(RateLimiter::new(min_interval))),
            base_url: FRED_BASE_URL.to_string(),
        })
    }

    /// Point the client at a different API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Fetch observations of a series within an inclusive date window.
    ///
    /// # Arguments
    /// * `series_id` - FRED series identifier (e.g., "DGS3MO")
    /// * `start` - First date to include
    /// * `end` - Last date to include
    pub async fn get_observations(
        &self,
        series_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RateObservation>> {
        if series_id.is_empty() {
            return Err(DataError::InvalidSymbol("Empty series id".to_string()));
        }
        if start > end {
            return Err(DataError::InvalidDateRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }

        let start = start.to_string();
        let end = end.to_string();
        let body = self
            .get(
                "series/observations",
                &[
                    ("series_id", series_id),
                    ("observation_start", &start),
                    ("observation_end", &end),
                ],
            )
            .await?;

        let observations = parse_observations(&body)?;
        debug!(series_id, count = observations.len(), "received observations");

        if observations.is_empty() {
            return Err(DataError::MissingData {
                symbol: series_id.to_string(),
                reason: format!("No observations between {} and {}", start, end),
            });
        }

        Ok(observations)
    }

    /// Fetch a series as a frame with columns: date, rate.
    pub async fn get_series(
        &self,
        series_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DataFrame> {
        let observations = self.get_observations(series_id, start, end).await?;
        observations_to_frame(&observations)
    }

    /// Full-text search over FRED series, most popular first.
    pub async fn search(&self, text: &str, limit: usize) -> Result<Vec<SeriesInfo>> {
        if text.trim().is_empty() {
            return Err(DataError::FredApi("Empty search text".to_string()));
        }

        let limit = limit.clamp(1, 1000).to_string();
        let body = self
            .get(
                "series/search",
                &[
                    ("search_text", text),
                    ("limit", &limit),
                    ("order_by", "popularity"),
                    ("sort_order", "desc"),
                ],
            )
            .await?;

        parse_search(&body)
    }

    async fn get(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<String> {
        self.rate_limiter.lock().await.wait().await;

        let url = format!("{}/{}", self.base_url, endpoint);
        debug!(%url, "FRED request");

        let response = self
            .client
            .get(&url)
            .query(params)
            .query(&[("api_key", self.api_key.as_str()), ("file_type", "json")])
            .send()
            .await
            .map_err(DataError::Network)?;

        let status = response.status();
        let body = response.text().await.map_err(DataError::Network)?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error_message)
                .unwrap_or(body);
            return Err(DataError::FredApi(format!(
                "{} failed: HTTP {}: {}",
                endpoint, status, message
            )));
        }

        Ok(body)
    }
}

impl std::fmt::Debug for FredClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FredClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}
