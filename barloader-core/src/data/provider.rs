//! Market-data provider trait, wire records and structured error types.
//!
//! The MarketDataProvider trait abstracts over the aggregates endpoint so the
//! ingestor can be driven by a scripted provider in tests.

use crate::domain::{Bar, DateRange};
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One daily aggregate as returned by the provider.
///
/// `t` is the start of the bucket in epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    pub t: i64,
    pub o: f64,
    pub h: f64,
    pub l: f64,
    pub c: f64,
    pub v: f64,
    /// Volume-weighted average price. Not persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vw: Option<f64>,
    /// Number of trades in the bucket. Not persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<u64>,
}

impl Aggregate {
    /// Normalize into a bar row: epoch-millis truncated to seconds, then to
    /// the UTC calendar date. OHLCV is copied verbatim.
    pub fn to_bar(&self, symbol: &str) -> Result<Bar, DataError> {
        let secs = self.t.div_euclid(1000);
        let timestamp = DateTime::from_timestamp(secs, 0)
            .map(|dt| dt.date_naive())
            .ok_or_else(|| DataError::InvalidTimestamp {
                symbol: symbol.to_string(),
                millis: self.t,
            })?;

        Ok(Bar {
            timestamp,
            symbol: symbol.to_string(),
            open: self.o,
            high: self.h,
            low: self.l,
            close: self.c,
            volume: self.v,
        })
    }
}

/// Transform a whole response; any bad timestamp fails the ticker.
pub fn aggregates_to_bars(symbol: &str, aggregates: &[Aggregate]) -> Result<Vec<Bar>, DataError> {
    aggregates.iter().map(|a| a.to_bar(symbol)).collect()
}

/// Structured error types for fetch, transform and persistence.
///
/// Every variant is recoverable at the ticker level: the ingestor records it
/// and moves on to the next ticker.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("HTTP {status} for {symbol}")]
    Http { status: u16, symbol: String },

    #[error("provider error for {symbol}: {message}")]
    Provider { symbol: String, message: String },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("invalid timestamp {millis}ms for {symbol}")]
    InvalidTimestamp { symbol: String, millis: i64 },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("data error: {0}")]
    Other(String),
}

impl From<diesel::result::Error> for DataError {
    fn from(err: diesel::result::Error) -> Self {
        DataError::Storage(err.to_string())
    }
}

impl From<diesel::ConnectionError> for DataError {
    fn from(err: diesel::ConnectionError) -> Self {
        DataError::Storage(format!("connect: {err}"))
    }
}

/// Trait for daily aggregate providers.
pub trait MarketDataProvider {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch split-adjusted daily aggregates for a symbol over an inclusive
    /// date range. Results past the provider's record cap are dropped
    /// silently; zero aggregates is not an error.
    fn fetch_daily(&self, symbol: &str, range: DateRange) -> Result<Vec<Aggregate>, DataError>;
}
