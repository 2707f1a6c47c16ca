//! Postgres bar store backed by diesel.
//!
//! Table `daily_prices` holds one row per fetched bar. The surrogate `id`
//! only satisfies the ORM; there is no uniqueness on (symbol, timestamp),
//! so re-ingesting a range stores duplicate rows.

use super::provider::DataError;
use super::store::{BarStore, SymbolStats};
use crate::domain::Bar;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use diesel::connection::SimpleConnection;
use diesel::dsl::{count_star, max, min};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use log::debug;

diesel::table! {
    daily_prices (id) {
        id -> Int8,
        timestamp -> Date,
        symbol -> Varchar,
        open -> Numeric,
        high -> Numeric,
        low -> Numeric,
        close -> Numeric,
        volume -> Numeric,
    }
}

/// Idempotent DDL for the bar table.
pub const CREATE_SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS daily_prices (
    id BIGSERIAL PRIMARY KEY,
    "timestamp" DATE NOT NULL,
    symbol VARCHAR NOT NULL,
    open NUMERIC NOT NULL,
    high NUMERIC NOT NULL,
    low NUMERIC NOT NULL,
    close NUMERIC NOT NULL,
    volume NUMERIC NOT NULL
);
CREATE INDEX IF NOT EXISTS daily_prices_symbol_timestamp_idx
    ON daily_prices (symbol, "timestamp");
"#;

/// Rows per INSERT statement. 7 bind parameters per row keeps each
/// statement under the Postgres limit of 65535 parameters.
const INSERT_CHUNK: usize = 5_000;

#[derive(Debug, Insertable)]
#[diesel(table_name = daily_prices)]
struct NewDailyPrice<'a> {
    timestamp: NaiveDate,
    symbol: &'a str,
    open: BigDecimal,
    high: BigDecimal,
    low: BigDecimal,
    close: BigDecimal,
    volume: BigDecimal,
}

impl<'a> NewDailyPrice<'a> {
    fn from_bar(bar: &'a Bar) -> Result<Self, DataError> {
        Ok(Self {
            timestamp: bar.timestamp,
            symbol: &bar.symbol,
            open: to_numeric(bar, "open", bar.open)?,
            high: to_numeric(bar, "high", bar.high)?,
            low: to_numeric(bar, "low", bar.low)?,
            close: to_numeric(bar, "close", bar.close)?,
            volume: to_numeric(bar, "volume", bar.volume)?,
        })
    }
}

/// Convert through the shortest round-trip decimal text so the stored
/// value reads exactly as the provider sent it.
fn to_numeric(bar: &Bar, column: &str, value: f64) -> Result<BigDecimal, DataError> {
    if !value.is_finite() {
        return Err(DataError::Storage(format!(
            "{} {}: non-finite {column} ({value})",
            bar.symbol, bar.timestamp
        )));
    }
    value.to_string().parse::<BigDecimal>().map_err(|e| {
        DataError::Storage(format!(
            "{} {}: {column} {value} is not a decimal: {e}",
            bar.symbol, bar.timestamp
        ))
    })
}

/// Bar store on a single Postgres connection.
pub struct PgBarStore {
    conn: PgConnection,
}

impl PgBarStore {
    pub fn connect(database_url: &str) -> Result<Self, DataError> {
        let conn = PgConnection::establish(database_url)?;
        Ok(Self { conn })
    }

    /// Connect and make sure the table exists, so a fresh database can be
    /// ingested into without a separate `init-db`.
    pub fn open(database_url: &str) -> Result<Self, DataError> {
        let mut store = Self::connect(database_url)?;
        store.init_schema()?;
        Ok(store)
    }

    /// Create the table and index if they do not exist yet.
    pub fn init_schema(&mut self) -> Result<(), DataError> {
        self.conn.batch_execute(CREATE_SCHEMA_SQL)?;
        Ok(())
    }
}

impl BarStore for PgBarStore {
    fn append(&mut self, bars: &[Bar]) -> Result<usize, DataError> {
        if bars.is_empty() {
            return Ok(0);
        }

        let rows = bars
            .iter()
            .map(NewDailyPrice::from_bar)
            .collect::<Result<Vec<_>, _>>()?;

        // One transaction per ticker: either every bar lands or none does.
        let written = self.conn.transaction::<usize, diesel::result::Error, _>(|conn| {
            let mut written = 0;
            for chunk in rows.chunks(INSERT_CHUNK) {
                written += diesel::insert_into(daily_prices::table)
                    .values(chunk)
                    .execute(conn)?;
            }
            Ok(written)
        })?;

        debug!("append | {written} rows into daily_prices");
        Ok(written)
    }

    fn symbol_stats(&mut self) -> Result<Vec<SymbolStats>, DataError> {
        let rows: Vec<(String, i64, Option<NaiveDate>, Option<NaiveDate>)> = daily_prices::table
            .group_by(daily_prices::symbol)
            .select((
                daily_prices::symbol,
                count_star(),
                min(daily_prices::timestamp),
                max(daily_prices::timestamp),
            ))
            .order_by(daily_prices::symbol)
            .load(&mut self.conn)?;

        Ok(rows
            .into_iter()
            .map(|(symbol, rows, first, last)| SymbolStats {
                symbol,
                rows: rows.max(0) as u64,
                first,
                last,
            })
            .collect())
    }
}
