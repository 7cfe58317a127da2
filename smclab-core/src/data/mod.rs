//! Market data acquisition.
//!
//! The analysis never fetches data itself; callers pick a provider and hand the
//! resulting `Series` to the engine.

pub mod binance;
pub mod provider;
pub mod synthetic;

pub use binance::BinanceProvider;
pub use provider::{DataError, DataSource, MarketDataProvider, RetryPolicy};
pub use synthetic::SyntheticProvider;
