//! Bar acquisition: provider trait, Binance implementation, retry wrapper.

pub mod binance;
pub mod provider;
pub mod retry;

pub use binance::{parse_klines, BinanceConfig, BinanceProvider};
pub use provider::{BarProvider, BarRequest, DataError, DEFAULT_LIMIT};
pub use retry::{fetch_with_retry, RetryPolicy};
