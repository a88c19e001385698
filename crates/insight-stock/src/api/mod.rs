//! Market data providers

pub mod yahoo;

pub use yahoo::YahooFinanceProvider;

use crate::data::{DateRange, OhlcvSeries};
use crate::error::Result;
use async_trait::async_trait;

/// Source of daily OHLCV history
///
/// An unknown ticker or a range with no trading days yields an empty series,
/// not an error. Errors are reserved for the provider itself failing.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Fetch daily bars for `ticker` within `range`
    async fn fetch_history(&self, ticker: &str, range: DateRange) -> Result<OhlcvSeries>;
}
