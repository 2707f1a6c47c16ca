//! Ticker symbols and the static ticker list file.
//!
//! The list file is plain text with symbols separated by arbitrary
//! whitespace (newlines, spaces, tabs). File order is the ingestion order;
//! duplicates are kept as written.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TickerError {
    #[error("read ticker list {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("ticker list is empty")]
    Empty,
}

/// A short text symbol such as `SPY`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ticker(String);

impl Ticker {
    /// Returns `None` for an empty or whitespace-only symbol.
    pub fn new(symbol: impl Into<String>) -> Option<Self> {
        let symbol = symbol.into();
        let trimmed = symbol.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered, non-empty list of tickers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickerList {
    tickers: Vec<Ticker>,
}

impl TickerList {
    /// Load a ticker list from a whitespace-delimited text file.
    pub fn from_file(path: &Path) -> Result<Self, TickerError> {
        let content = std::fs::read_to_string(path).map_err(|source| TickerError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse a ticker list from text.
    pub fn parse(content: &str) -> Result<Self, TickerError> {
        let tickers: Vec<Ticker> = content.split_whitespace().filter_map(Ticker::new).collect();
        Self::from_tickers(tickers)
    }

    pub fn from_tickers(tickers: Vec<Ticker>) -> Result<Self, TickerError> {
        if tickers.is_empty() {
            return Err(TickerError::Empty);
        }
        Ok(Self { tickers })
    }

    pub fn as_slice(&self) -> &[Ticker] {
        &self.tickers
    }

    pub fn len(&self) -> usize {
        self.tickers.len()
    }

    /// Always false; an empty list cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }
}
