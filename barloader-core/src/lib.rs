//! barloader core — daily bar ingestion from an aggregates API into Postgres.
//!
//! - Domain types (tickers, bars, date ranges)
//! - Provider trait and the Polygon-style aggregates client
//! - Append-only bar stores (Postgres via diesel, in-memory)
//! - Sequential, paced batch ingestion with a typed per-ticker summary
//! - Configuration from TOML and the process environment

pub mod config;
pub mod data;
pub mod domain;
