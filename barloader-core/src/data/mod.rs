//! Data ingestion: provider client, bar stores, batch orchestration.

pub mod ingest;
pub mod polygon;
pub mod postgres;
pub mod provider;
pub mod store;

pub use ingest::{
    ingest_tickers, IngestProgress, IngestSummary, LogProgress, Pacer, StdoutProgress,
    ThreadPacer, TickerOutcome, DEFAULT_DELAY,
};
pub use polygon::PolygonProvider;
pub use postgres::PgBarStore;
pub use provider::{Aggregate, DataError, MarketDataProvider};
pub use store::{BarStore, MemoryBarStore, SymbolStats};
