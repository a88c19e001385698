//! Daily OHLCV series and the date range they cover

use crate::error::{Result, StockError};
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// One trading day of price and volume data
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OhlcvBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl OhlcvBar {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: u64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Prices are finite and the high/low envelope contains open and close
    pub fn is_valid(&self) -> bool {
        let prices = [self.open, self.high, self.low, self.close];
        prices.iter().all(|p| p.is_finite())
            && self.high >= self.open.max(self.close).max(self.low)
            && self.low <= self.open.min(self.close)
    }
}

/// Date-ordered daily bars for one ticker
///
/// Construction normalizes provider output: invalid bars are dropped, bars
/// are sorted by date, and for a repeated date the last bar wins. Dates are
/// therefore strictly increasing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcvSeries {
    ticker: String,
    bars: Vec<OhlcvBar>,
}

impl OhlcvSeries {
    pub fn new(ticker: impl Into<String>, bars: Vec<OhlcvBar>) -> Self {
        let ticker = ticker.into();
        let total = bars.len();

        let mut bars: Vec<OhlcvBar> = bars.into_iter().filter(OhlcvBar::is_valid).collect();
        let dropped = total - bars.len();
        if dropped > 0 {
            tracing::debug!(ticker = %ticker, dropped, "Dropped invalid bars");
        }

        // Stable sort keeps provider order within a date, so the last one wins below
        bars.sort_by_key(|bar| bar.date);
        let mut normalized: Vec<OhlcvBar> = Vec::with_capacity(bars.len());
        for bar in bars {
            match normalized.last_mut() {
                Some(last) if last.date == bar.date => *last = bar,
                _ => normalized.push(bar),
            }
        }

        Self {
            ticker,
            bars: normalized,
        }
    }

    /// A series with no bars
    pub fn empty(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            bars: Vec::new(),
        }
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn bars(&self) -> &[OhlcvBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.bars.iter().map(|b| b.date).collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn volumes(&self) -> Vec<u64> {
        self.bars.iter().map(|b| b.volume).collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|b| b.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }

    pub fn last_close(&self) -> Option<f64> {
        self.bars.last().map(|b| b.close)
    }
}

/// Calendar range for a history request, end date exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start >= end {
            return Err(StockError::ConfigError(format!(
                "start date {start} must be before end date {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// The `days` calendar days ending at `end`
    pub fn trailing_days(end: NaiveDate, days: u64) -> Result<Self> {
        let start = end
            .checked_sub_days(Days::new(days))
            .ok_or_else(|| StockError::ConfigError(format!("cannot go back {days} days from {end}")))?;
        Self::new(start, end)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn bar(d: u32, close: f64) -> OhlcvBar {
        OhlcvBar::new(day(d), close, close + 1.0, close - 1.0, close, 1_000)
    }

    #[test]
    fn test_series_sorted_and_deduplicated() {
        let mut replacement = bar(5, 12.0);
        replacement.volume = 7;
        let series = OhlcvSeries::new("AAPL", vec![bar(6, 13.0), bar(5, 10.0), bar(4, 9.0), replacement]);

        assert_eq!(series.len(), 3);
        assert_eq!(series.dates(), vec![day(4), day(5), day(6)]);
        assert_eq!(series.closes(), vec![9.0, 12.0, 13.0]);
        assert_eq!(series.bars()[1].volume, 7);
        assert!(series.dates().windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_series_drops_invalid_bars() {
        let inverted = OhlcvBar::new(day(2), 10.0, 9.0, 11.0, 10.0, 100);
        let nan = OhlcvBar::new(day(3), f64::NAN, 11.0, 9.0, 10.0, 100);
        let series = OhlcvSeries::new("MSFT", vec![bar(1, 10.0), inverted, nan]);

        assert_eq!(series.len(), 1);
        assert_eq!(series.first_date(), Some(day(1)));
        assert_eq!(series.last_close(), Some(10.0));
    }

    #[test]
    fn test_empty_series() {
        let series = OhlcvSeries::empty("BADTICKER");
        assert!(series.is_empty());
        assert_eq!(series.ticker(), "BADTICKER");
        assert_eq!(series.last_date(), None);
    }

    #[test]
    fn test_date_range_validation() {
        assert!(DateRange::new(day(1), day(2)).is_ok());
        assert!(DateRange::new(day(2), day(2)).is_err());
        assert!(DateRange::new(day(3), day(2)).is_err());
    }

    #[test]
    fn test_trailing_range_is_end_exclusive() {
        let range = DateRange::trailing_days(day(31), 30).unwrap();
        assert_eq!(range.start(), day(1));
        assert!(range.contains(day(1)));
        assert!(range.contains(day(30)));
        assert!(!range.contains(day(31)));
    }
}
