//! Yahoo Finance history provider

use super::MarketDataProvider;
use crate::data::{DateRange, OhlcvBar, OhlcvSeries};
use crate::error::{Result, StockError};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::{debug, instrument};
use yahoo_finance_api as yahoo;

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Requests per minute used by [`YahooFinanceProvider::default`]
pub const DEFAULT_REQUESTS_PER_MINUTE: u32 = 60;

/// Daily history from Yahoo Finance, rate limited per provider instance
#[derive(Clone)]
pub struct YahooFinanceProvider {
    rate_limiter: SharedRateLimiter,
}

impl YahooFinanceProvider {
    pub fn new(requests_per_minute: u32) -> Self {
        let per_minute = NonZeroU32::new(requests_per_minute).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_minute(per_minute)));
        Self { rate_limiter }
    }
}

impl Default for YahooFinanceProvider {
    fn default() -> Self {
        Self::new(DEFAULT_REQUESTS_PER_MINUTE)
    }
}

fn provider_error(err: impl std::fmt::Display) -> StockError {
    StockError::Provider(err.to_string())
}

fn to_offset_datetime(date: NaiveDate) -> Result<OffsetDateTime> {
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| provider_error(format!("invalid date {date}")))?;
    OffsetDateTime::from_unix_timestamp(midnight.and_utc().timestamp())
        .map_err(|e| provider_error(format!("invalid timestamp for {date}: {e}")))
}

fn quote_date(timestamp: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(timestamp, 0).map(|dt| dt.date_naive())
}

/// Map a Yahoo failure to an outcome: "no data" is an empty series, the rest
/// are provider errors
fn classify(ticker: &str, err: yahoo::YahooError) -> Result<OhlcvSeries> {
    match err {
        yahoo::YahooError::NoResult | yahoo::YahooError::NoQuotes => {
            debug!(error = %err, "Yahoo returned no data");
            Ok(OhlcvSeries::empty(ticker))
        }
        other => Err(provider_error(other)),
    }
}

#[async_trait]
impl MarketDataProvider for YahooFinanceProvider {
    #[instrument(skip(self, range), fields(start = %range.start(), end = %range.end()))]
    async fn fetch_history(&self, ticker: &str, range: DateRange) -> Result<OhlcvSeries> {
        self.rate_limiter.until_ready().await;

        let connector = yahoo::YahooConnector::new().map_err(provider_error)?;
        let start = to_offset_datetime(range.start())?;
        let end = to_offset_datetime(range.end())?;

        let response = match connector.get_quote_history(ticker, start, end).await {
            Ok(response) => response,
            Err(e) => return classify(ticker, e),
        };

        let quotes = match response.quotes() {
            Ok(quotes) => quotes,
            Err(e) => return classify(ticker, e),
        };

        let bars: Vec<OhlcvBar> = quotes
            .iter()
            .filter_map(|q| {
                let date = quote_date(i64::try_from(q.timestamp).ok()?)?;
                range
                    .contains(date)
                    .then(|| OhlcvBar::new(date, q.open, q.high, q.low, q.close, q.volume))
            })
            .collect();

        debug!(quotes = quotes.len(), bars = bars.len(), "Fetched history");
        Ok(OhlcvSeries::new(ticker, bars))
    }
}
