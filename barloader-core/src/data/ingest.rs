//! Ingest orchestrator — fetch, normalize and append one ticker at a time.
//!
//! Tickers are processed strictly in list order. A failure for one ticker is
//! recorded in the summary and never stops the batch. Between consecutive
//! tickers the pacer is asked for one fixed pause.

use super::provider::{aggregates_to_bars, DataError, MarketDataProvider};
use super::store::BarStore;
use crate::domain::{DateRange, Ticker};
use log::{info, warn};
use std::time::Duration;

/// Default pause between tickers (five requests per minute).
pub const DEFAULT_DELAY: Duration = Duration::from_millis(12_500);

/// Performs the inter-ticker pause.
pub trait Pacer {
    fn pause(&self, delay: Duration);
}

/// Sleeps the current thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadPacer;

impl Pacer for ThreadPacer {
    fn pause(&self, delay: Duration) {
        std::thread::sleep(delay);
    }
}

/// Progress callbacks for a batch.
pub trait IngestProgress {
    /// Called before fetching a ticker.
    fn on_start(&self, symbol: &str, index: usize, total: usize);

    /// Called when a ticker's fetch-and-append cycle finishes.
    fn on_complete(
        &self,
        symbol: &str,
        index: usize,
        total: usize,
        result: &Result<usize, DataError>,
    );

    /// Called once after the last ticker.
    fn on_batch_complete(&self, summary: &IngestSummary);
}

/// Prints one progress line per ticker to stdout.
pub struct StdoutProgress;

impl IngestProgress for StdoutProgress {
    fn on_start(&self, symbol: &str, index: usize, total: usize) {
        println!("[{}/{}] Fetching {symbol}...", index + 1, total);
    }

    fn on_complete(
        &self,
        symbol: &str,
        _index: usize,
        _total: usize,
        result: &Result<usize, DataError>,
    ) {
        match result {
            Ok(rows) => println!("  OK: {symbol} ({rows} rows)"),
            Err(e) => println!("  FAIL: {symbol}: {e}"),
        }
    }

    fn on_batch_complete(&self, summary: &IngestSummary) {
        println!(
            "\nIngest complete: {}/{} succeeded, {} failed, {} rows appended",
            summary.succeeded, summary.total, summary.failed, summary.rows_appended
        );
    }
}

/// Reports progress through the `log` facade.
pub struct LogProgress;

impl IngestProgress for LogProgress {
    fn on_start(&self, symbol: &str, index: usize, total: usize) {
        info!("[{}/{}] fetching {symbol}", index + 1, total);
    }

    fn on_complete(
        &self,
        symbol: &str,
        _index: usize,
        _total: usize,
        result: &Result<usize, DataError>,
    ) {
        match result {
            Ok(rows) => info!("{symbol}: appended {rows} rows"),
            Err(e) => warn!("{symbol}: {e}"),
        }
    }

    fn on_batch_complete(&self, summary: &IngestSummary) {
        info!(
            "ingest complete: {}/{} succeeded, {} failed, {} rows appended",
            summary.succeeded, summary.total, summary.failed, summary.rows_appended
        );
    }
}

/// Outcome of one ticker's fetch-and-append cycle.
#[derive(Debug)]
pub struct TickerOutcome {
    pub symbol: String,
    /// Rows appended, or the error that stopped this ticker.
    pub result: Result<usize, DataError>,
}

/// Summary of a batch ingest.
#[derive(Debug, Default)]
pub struct IngestSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub rows_appended: usize,
    pub outcomes: Vec<TickerOutcome>,
}

impl IngestSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }

    /// Failed tickers with their errors, in list order.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &DataError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.symbol.as_str(), e)))
    }
}

/// Ingest every ticker in order.
///
/// Each ticker gets exactly one fetch and at most one append. `delay` is
/// paused N-1 times for N tickers.
pub fn ingest_tickers(
    provider: &dyn MarketDataProvider,
    store: &mut dyn BarStore,
    tickers: &[Ticker],
    range: DateRange,
    pacer: &dyn Pacer,
    delay: Duration,
    progress: &dyn IngestProgress,
) -> IngestSummary {
    let total = tickers.len();
    let mut summary = IngestSummary {
        total,
        ..Default::default()
    };

    for (i, ticker) in tickers.iter().enumerate() {
        if i > 0 {
            pacer.pause(delay);
        }

        let symbol = ticker.as_str();
        progress.on_start(symbol, i, total);

        let result = ingest_single(provider, store, symbol, range);
        progress.on_complete(symbol, i, total, &result);

        match &result {
            Ok(rows) => {
                summary.succeeded += 1;
                summary.rows_appended += rows;
            }
            Err(_) => summary.failed += 1,
        }
        summary.outcomes.push(TickerOutcome {
            symbol: symbol.to_string(),
            result,
        });
    }

    progress.on_batch_complete(&summary);
    summary
}

/// One ticker: fetch → normalize → append.
fn ingest_single(
    provider: &dyn MarketDataProvider,
    store: &mut dyn BarStore,
    symbol: &str,
    range: DateRange,
) -> Result<usize, DataError> {
    let aggregates = provider.fetch_daily(symbol, range)?;
    let bars = aggregates_to_bars(symbol, &aggregates)?;
    if bars.is_empty() {
        return Ok(0);
    }
    store.append(&bars)
}
