//! Immutable snapshot of one data fetch

use crate::data::{DateRange, OhlcvSeries};
use crate::indicators::Indicator;

/// Series and indicator selection for one run
///
/// Built once per fetch and shared read-only; a new fetch produces a new
/// context instead of editing this one.
#[derive(Debug, Clone)]
pub struct RunContext {
    range: DateRange,
    indicators: Vec<Indicator>,
    series: Vec<OhlcvSeries>,
}

impl RunContext {
    /// Series keep the given order; a repeated ticker keeps its first series
    pub fn new(range: DateRange, indicators: Vec<Indicator>, series: Vec<OhlcvSeries>) -> Self {
        let mut unique: Vec<OhlcvSeries> = Vec::with_capacity(series.len());
        for s in series {
            if !unique.iter().any(|u| u.ticker() == s.ticker()) {
                unique.push(s);
            }
        }

        Self {
            range,
            indicators,
            series: unique,
        }
    }

    pub fn range(&self) -> DateRange {
        self.range
    }

    pub fn indicators(&self) -> &[Indicator] {
        &self.indicators
    }

    pub fn series(&self) -> &[OhlcvSeries] {
        &self.series
    }

    pub fn get(&self, ticker: &str) -> Option<&OhlcvSeries> {
        self.series.iter().find(|s| s.ticker() == ticker)
    }

    pub fn tickers(&self) -> Vec<&str> {
        self.series.iter().map(OhlcvSeries::ticker).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}
