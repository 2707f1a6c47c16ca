//! Domain types: tickers, bars, date ranges.

pub mod bar;
pub mod range;
pub mod ticker;

pub use bar::Bar;
pub use range::{DateRange, InvalidRange};
pub use ticker::{Ticker, TickerError, TickerList};
