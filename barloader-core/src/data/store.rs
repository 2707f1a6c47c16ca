//! Bar store trait and the in-memory store.
//!
//! The store is append-only: rows are added, never updated or removed.
//! Nothing here deduplicates by (symbol, date); appending the same bars
//! twice stores them twice.

use super::provider::DataError;
use crate::domain::Bar;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-symbol row count and date coverage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolStats {
    pub symbol: String,
    pub rows: u64,
    pub first: Option<NaiveDate>,
    pub last: Option<NaiveDate>,
}

/// Append-only persistence for bars.
pub trait BarStore {
    /// Append all bars as one operation and return the number of rows
    /// written. An empty slice is a no-op.
    fn append(&mut self, bars: &[Bar]) -> Result<usize, DataError>;

    /// Row counts and date ranges grouped by symbol, ordered by symbol.
    fn symbol_stats(&mut self) -> Result<Vec<SymbolStats>, DataError>;
}

/// Bars kept in a `Vec`, in append order.
#[derive(Debug, Default)]
pub struct MemoryBarStore {
    rows: Vec<Bar>,
}

impl MemoryBarStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[Bar] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl BarStore for MemoryBarStore {
    fn append(&mut self, bars: &[Bar]) -> Result<usize, DataError> {
        self.rows.extend_from_slice(bars);
        Ok(bars.len())
    }

    fn symbol_stats(&mut self) -> Result<Vec<SymbolStats>, DataError> {
        let mut by_symbol: BTreeMap<&str, SymbolStats> = BTreeMap::new();
        for bar in &self.rows {
            let entry = by_symbol
                .entry(bar.symbol.as_str())
                .or_insert_with(|| SymbolStats {
                    symbol: bar.symbol.clone(),
                    rows: 0,
                    first: None,
                    last: None,
                });
            entry.rows += 1;
            entry.first = Some(entry.first.map_or(bar.timestamp, |d| d.min(bar.timestamp)));
            entry.last = Some(entry.last.map_or(bar.timestamp, |d| d.max(bar.timestamp)));
        }
        Ok(by_symbol.into_values().collect())
    }
}
