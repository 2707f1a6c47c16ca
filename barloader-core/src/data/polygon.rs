//! Polygon-style aggregates provider.
//!
//! Fetches split-adjusted daily OHLCV aggregates from the v2 aggregates
//! endpoint. One request per ticker: no pagination and no retries, so a
//! result set larger than `limit` is truncated by the provider.

use super::provider::{Aggregate, DataError, MarketDataProvider};
use crate::domain::DateRange;
use log::debug;
use serde::Deserialize;
use reqwest::Url;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.polygon.io";

/// Provider-side record cap per request.
pub const DEFAULT_LIMIT: u32 = 50_000;

/// Aggregates endpoint response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AggsResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    results_count: Option<u64>,
    #[serde(default)]
    results: Option<Vec<Aggregate>>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Polygon aggregates provider.
pub struct PolygonProvider {
    client: reqwest::blocking::Client,
    base_url: Url,
    api_key: String,
    limit: u32,
}

impl PolygonProvider {
    pub fn new(api_key: impl Into<String>) -> Result<Self, DataError> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("barloader/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        let base_url = base_url.into();
        let base_url = Url::parse(&base_url)
            .map_err(|e| DataError::Other(format!("invalid base URL {base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(DataError::Other(format!("invalid base URL {base_url}")));
        }

        Ok(Self {
            client,
            base_url,
            api_key: api_key.into(),
            limit: DEFAULT_LIMIT,
        })
    }

    /// Override the per-request record cap.
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Aggregates URL without the API key. The symbol is a single
    /// percent-encoded path segment.
    fn aggs_url(&self, symbol: &str, range: DateRange) -> Url {
        let start = range.start().to_string();
        let end = range.end().to_string();
        let mut url = self.base_url.clone();
        // cannot-be-a-base URLs are rejected in with_base_url
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend([
                "v2",
                "aggs",
                "ticker",
                symbol,
                "range",
                "1",
                "day",
                start.as_str(),
                end.as_str(),
            ]);
        }
        url
    }

    /// Parse the response body into aggregates.
    fn parse_response(symbol: &str, resp: AggsResponse) -> Result<Vec<Aggregate>, DataError> {
        match resp.status.as_deref() {
            Some("ERROR") | Some("NOT_AUTHORIZED") | Some("NOT_FOUND") => {
                let message = resp
                    .error
                    .or(resp.message)
                    .unwrap_or_else(|| "no error message".into());
                return Err(DataError::Provider {
                    symbol: symbol.to_string(),
                    message,
                });
            }
            _ => {}
        }

        let results = resp.results.unwrap_or_default();
        if let Some(count) = resp.results_count {
            if count != results.len() as u64 {
                debug!(
                    "{symbol}: resultsCount {count} but {} results in body",
                    results.len()
                );
            }
        }
        Ok(results)
    }
}

impl MarketDataProvider for PolygonProvider {
    fn name(&self) -> &str {
        "polygon"
    }

    fn fetch_daily(&self, symbol: &str, range: DateRange) -> Result<Vec<Aggregate>, DataError> {
        let url = self.aggs_url(symbol, range);
        let limit = self.limit.to_string();
        debug!("fetch_daily | url: {url}?adjusted=true&sort=asc&limit={limit}&apiKey=***");

        let resp = self
            .client
            .get(url)
            .query(&[
                ("adjusted", "true"),
                ("sort", "asc"),
                ("limit", limit.as_str()),
                ("apiKey", self.api_key.as_str()),
            ])
            .send()
            .map_err(|e| {
                // reqwest errors embed the URL; strip it so the key never leaks
                DataError::NetworkUnreachable(e.without_url().to_string())
            })?;

        let status = resp.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = resp
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(DataError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(DataError::AuthenticationRequired(format!(
                "provider rejected API key (HTTP {})",
                status.as_u16()
            )));
        }

        if !status.is_success() {
            return Err(DataError::Http {
                status: status.as_u16(),
                symbol: symbol.to_string(),
            });
        }

        let body: AggsResponse = resp.json().map_err(|e| {
            DataError::ResponseFormatChanged(format!(
                "failed to parse response for {symbol}: {}",
                e.without_url()
            ))
        })?;

        Self::parse_response(symbol, body)
    }
}
