//! Caching layer for market data to reduce provider calls

use crate::api::MarketDataProvider;
use crate::data::{DateRange, OhlcvSeries};
use crate::error::Result;
use async_trait::async_trait;
use cached::{Cached, TimedCache};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Cache key for a history request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct HistoryKey {
    ticker: String,
    range: DateRange,
}

/// Wraps a provider and keeps its series for a fixed lifespan
///
/// Only successful fetches are cached, empty series included, so repeated
/// runs over the same range within the lifespan do not hit the network.
pub struct CachedProvider<P> {
    inner: P,
    cache: Arc<Mutex<TimedCache<HistoryKey, OhlcvSeries>>>,
}

impl<P: MarketDataProvider> CachedProvider<P> {
    pub fn new(inner: P, ttl: Duration) -> Self {
        Self {
            inner,
            cache: Arc::new(Mutex::new(TimedCache::with_lifespan(ttl))),
        }
    }

    /// Number of live entries
    pub async fn cached_entries(&self) -> usize {
        self.cache.lock().await.cache_size()
    }
}

#[async_trait]
impl<P: MarketDataProvider> MarketDataProvider for CachedProvider<P> {
    async fn fetch_history(&self, ticker: &str, range: DateRange) -> Result<OhlcvSeries> {
        let key = HistoryKey {
            ticker: ticker.to_string(),
            range,
        };

        if let Some(series) = self.cache.lock().await.cache_get(&key).cloned() {
            tracing::debug!(ticker, "Cache hit for history");
            return Ok(series);
        }

        tracing::debug!(ticker, "Cache miss for history");
        let series = self.inner.fetch_history(ticker, range).await?;
        let _ = self.cache.lock().await.cache_set(key, series.clone());
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockMarketDataProvider;
    use crate::data::OhlcvBar;
    use crate::error::StockError;
    use chrono::NaiveDate;
    use tokio_test::{assert_err, assert_ok};

    fn range() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        )
        .unwrap()
    }

    fn series(ticker: &str) -> OhlcvSeries {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        OhlcvSeries::new(ticker, vec![OhlcvBar::new(date, 10.0, 11.0, 9.0, 10.5, 100)])
    }

    #[tokio::test]
    async fn test_second_fetch_served_from_cache() {
        let mut mock = MockMarketDataProvider::new();
        mock.expect_fetch_history()
            .times(1)
            .returning(|ticker, _| Ok(series(ticker)));

        let provider = CachedProvider::new(mock, Duration::from_secs(60));
        let first = assert_ok!(provider.fetch_history("AAPL", range()).await);
        let second = assert_ok!(provider.fetch_history("AAPL", range()).await);

        assert_eq!(first, second);
        assert_eq!(provider.cached_entries().await, 1);
    }

    #[tokio::test]
    async fn test_distinct_tickers_cached_separately() {
        let mut mock = MockMarketDataProvider::new();
        mock.expect_fetch_history()
            .times(2)
            .returning(|ticker, _| Ok(series(ticker)));

        let provider = CachedProvider::new(mock, Duration::from_secs(60));
        let aapl = provider.fetch_history("AAPL", range()).await.unwrap();
        let msft = provider.fetch_history("MSFT", range()).await.unwrap();

        assert_eq!(aapl.ticker(), "AAPL");
        assert_eq!(msft.ticker(), "MSFT");
        assert_eq!(provider.cached_entries().await, 2);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let mut mock = MockMarketDataProvider::new();
        mock.expect_fetch_history()
            .times(2)
            .returning(|_, _| Err(StockError::Provider("HTTP 503".into())));

        let provider = CachedProvider::new(mock, Duration::from_secs(60));
        assert_err!(provider.fetch_history("AAPL", range()).await);
        assert_err!(provider.fetch_history("AAPL", range()).await);
        assert_eq!(provider.cached_entries().await, 0);
    }
}
