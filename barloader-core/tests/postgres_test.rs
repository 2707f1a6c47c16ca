//! Postgres bar store against a live database.
//!
//! These tests drop and recreate `daily_prices`, so they read a dedicated
//! `TEST_DATABASE_URL` and are ignored by default:
//!
//! ```text
//! TEST_DATABASE_URL=postgres://localhost/barloader_test cargo test -- --ignored
//! ```

use barloader_core::data::{
    ingest_tickers, Aggregate, BarStore, DataError, LogProgress, MarketDataProvider, Pacer,
    PgBarStore,
};
use barloader_core::domain::{Bar, DateRange, Ticker};
use chrono::{Days, NaiveDate};
use diesel::connection::SimpleConnection;
use diesel::pg::PgConnection;
use diesel::Connection;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

const TEST_DATABASE_URL_ENV: &str = "TEST_DATABASE_URL";

// Tests share one table.
static DB_LOCK: Mutex<()> = Mutex::new(());

struct TestDb {
    url: String,
    _guard: MutexGuard<'static, ()>,
}

/// Lock the table and drop it, leaving a database with no schema.
fn empty_database() -> Option<TestDb> {
    let Ok(url) = std::env::var(TEST_DATABASE_URL_ENV) else {
        eprintln!("{TEST_DATABASE_URL_ENV} not set; skipping");
        return None;
    };
    let guard = DB_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let mut conn = PgConnection::establish(&url).unwrap();
    conn.batch_execute("DROP TABLE IF EXISTS daily_prices").unwrap();
    Some(TestDb { url, _guard: guard })
}

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn bars(symbol: &str, n: usize) -> Vec<Bar> {
    (0..n)
        .map(|i| Bar {
            timestamp: d(2000, 1, 3) + Days::new(i as u64),
            symbol: symbol.to_string(),
            open: 100.0 + i as f64 * 0.01,
            high: 101.25,
            low: 99.5,
            close: 100.75,
            volume: 1_000_000.0,
        })
        .collect()
}

struct OneBarProvider;

impl MarketDataProvider for OneBarProvider {
    fn name(&self) -> &str {
        "one-bar"
    }

    fn fetch_daily(&self, _symbol: &str, _range: DateRange) -> Result<Vec<Aggregate>, DataError> {
        Ok(vec![Aggregate {
            t: 1_704_171_600_000,
            o: 1.0,
            h: 2.0,
            l: 0.5,
            c: 1.5,
            v: 10.0,
            vw: None,
            n: None,
        }])
    }
}

struct NoPause;

impl Pacer for NoPause {
    fn pause(&self, _delay: Duration) {}
}

#[test]
#[ignore]
fn open_creates_table_on_fresh_database() {
    let Some(db) = empty_database() else { return };

    let mut store = PgBarStore::open(&db.url).unwrap();
    let tickers = vec![Ticker::new("AAA").unwrap(), Ticker::new("BBB").unwrap()];
    let range = DateRange::new(d(2024, 1, 1), d(2024, 1, 31)).unwrap();

    let summary = ingest_tickers(
        &OneBarProvider,
        &mut store,
        &tickers,
        range,
        &NoPause,
        Duration::ZERO,
        &LogProgress,
    );

    assert!(summary.all_succeeded(), "{:?}", summary.outcomes);
    assert_eq!(summary.rows_appended, 2);
}

#[test]
#[ignore]
fn open_is_idempotent_and_keeps_rows() {
    let Some(db) = empty_database() else { return };

    let mut store = PgBarStore::open(&db.url).unwrap();
    store.append(&bars("AAA", 3)).unwrap();
    drop(store);

    let mut store = PgBarStore::open(&db.url).unwrap();
    store.init_schema().unwrap();
    assert_eq!(store.symbol_stats().unwrap()[0].rows, 3);
}

#[test]
#[ignore]
fn append_spans_multiple_insert_chunks() {
    let Some(db) = empty_database() else { return };
    let mut store = PgBarStore::open(&db.url).unwrap();

    let big = bars("BIG", 12_001);
    assert_eq!(store.append(&big).unwrap(), 12_001);

    let stats = store.symbol_stats().unwrap();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].rows, 12_001);
    assert_eq!(stats[0].first, Some(big[0].timestamp));
    assert_eq!(stats[0].last, Some(big[12_000].timestamp));
}

#[test]
#[ignore]
fn empty_append_writes_nothing() {
    let Some(db) = empty_database() else { return };
    let mut store = PgBarStore::open(&db.url).unwrap();

    assert_eq!(store.append(&[]).unwrap(), 0);
    assert!(store.symbol_stats().unwrap().is_empty());
}

#[test]
#[ignore]
fn second_append_duplicates_rows() {
    let Some(db) = empty_database() else { return };
    let mut store = PgBarStore::open(&db.url).unwrap();

    let rows = bars("SPY", 5);
    store.append(&rows).unwrap();
    store.append(&rows).unwrap();

    let stats = store.symbol_stats().unwrap();
    assert_eq!(stats[0].rows, 10);
    assert_eq!(stats[0].first, Some(rows[0].timestamp));
}

#[test]
#[ignore]
fn failed_append_leaves_no_rows_for_the_ticker() {
    let Some(db) = empty_database() else { return };
    let mut store = PgBarStore::open(&db.url).unwrap();

    // the bad row sits in the second insert chunk
    let mut rows = bars("BAD", 6_000);
    rows[5_500].close = f64::NAN;
    assert!(matches!(store.append(&rows), Err(DataError::Storage(_))));

    store.append(&bars("OK", 1)).unwrap();
    let stats = store.symbol_stats().unwrap();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].symbol, "OK");
}

#[test]
#[ignore]
fn stats_are_grouped_and_ordered_by_symbol() {
    let Some(db) = empty_database() else { return };
    let mut store = PgBarStore::open(&db.url).unwrap();

    store.append(&bars("MSFT", 2)).unwrap();
    store.append(&bars("AAPL", 4)).unwrap();
    store.append(&bars("IWM", 1)).unwrap();

    let stats = store.symbol_stats().unwrap();
    let summary: Vec<(&str, u64)> = stats.iter().map(|s| (s.symbol.as_str(), s.rows)).collect();
    assert_eq!(summary, vec![("AAPL", 4), ("IWM", 1), ("MSFT", 2)]);
    assert_eq!(stats[0].first, Some(d(2000, 1, 3)));
    assert_eq!(stats[0].last, Some(d(2000, 1, 6)));
}
