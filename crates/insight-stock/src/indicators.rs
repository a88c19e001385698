//! Technical indicator engine
//!
//! Every indicator is a pure function of an [`OhlcvSeries`] and returns new
//! series aligned 1:1 with its dates. Points without enough history are
//! `None` rather than zero or NaN.

use crate::data::OhlcvSeries;
use crate::error::{Result, StockError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ta::Next;
use ta::indicators::SimpleMovingAverage;

/// Window length shared by the moving-average family
pub const WINDOW: usize = 20;

/// Band width of the Bollinger envelope in standard deviations
pub const BOLLINGER_K: f64 = 2.0;

/// Indicators a user can overlay on the chart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Indicator {
    Sma20,
    Ema20,
    BollingerBands20,
    Vwap,
}

impl Indicator {
    pub const ALL: [Indicator; 4] = [
        Indicator::Sma20,
        Indicator::Ema20,
        Indicator::BollingerBands20,
        Indicator::Vwap,
    ];

    /// Canonical identifier
    pub fn id(&self) -> &'static str {
        match self {
            Indicator::Sma20 => "SMA20",
            Indicator::Ema20 => "EMA20",
            Indicator::BollingerBands20 => "BollingerBands20",
            Indicator::Vwap => "VWAP",
        }
    }

    /// Human-readable name used in prompts
    pub fn label(&self) -> &'static str {
        match self {
            Indicator::Sma20 => "20-Day SMA",
            Indicator::Ema20 => "20-Day EMA",
            Indicator::BollingerBands20 => "20-Day Bollinger Bands",
            Indicator::Vwap => "VWAP",
        }
    }

    /// Names of the series this indicator produces, in drawing order
    pub fn trace_names(&self) -> &'static [&'static str] {
        match self {
            Indicator::Sma20 => &["SMA (20)"],
            Indicator::Ema20 => &["EMA (20)"],
            Indicator::BollingerBands20 => &["BB Upper", "BB Lower"],
            Indicator::Vwap => &["VWAP"],
        }
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Indicator {
    type Err = StockError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "sma" | "sma20" | "20daysma" => Ok(Indicator::Sma20),
            "ema" | "ema20" | "20dayema" => Ok(Indicator::Ema20),
            "bb" | "bollinger" | "bollingerbands" | "bollingerbands20" | "20daybollingerbands" => {
                Ok(Indicator::BollingerBands20)
            }
            "vwap" => Ok(Indicator::Vwap),
            _ => Err(StockError::ConfigError(format!("unknown indicator '{s}'"))),
        }
    }
}

/// Parse a comma-separated indicator list, collapsing duplicates
pub fn parse_indicators(input: &str) -> Result<Vec<Indicator>> {
    let mut selected = Vec::new();
    for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let indicator: Indicator = part.parse()?;
        if !selected.contains(&indicator) {
            selected.push(indicator);
        }
    }
    Ok(selected)
}

/// Named derived series aligned with the source dates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSeries {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

impl IndicatorSeries {
    pub fn new(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of points that carry a value
    pub fn defined_count(&self) -> usize {
        self.values.iter().flatten().count()
    }
}

/// Indicator outputs keyed by trace name, in selection order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorSet {
    series: Vec<IndicatorSeries>,
}

impl IndicatorSet {
    pub fn get(&self, name: &str) -> Option<&IndicatorSeries> {
        self.series.iter().find(|s| s.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &IndicatorSeries> {
        self.series.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.series.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// Compute the selected indicators for a series
pub fn compute(series: &OhlcvSeries, selection: &[Indicator]) -> Result<IndicatorSet> {
    let closes = series.closes();
    let mut set = IndicatorSet::default();
    let mut seen = Vec::with_capacity(selection.len());

    for indicator in selection {
        if seen.contains(indicator) {
            continue;
        }
        seen.push(*indicator);

        match indicator {
            Indicator::Sma20 => {
                set.series.push(IndicatorSeries::new("SMA (20)", sma(&closes, WINDOW)?));
            }
            Indicator::Ema20 => {
                set.series.push(IndicatorSeries::new("EMA (20)", ema_adjusted(&closes, WINDOW)?));
            }
            Indicator::BollingerBands20 => {
                let (upper, lower) = bollinger(&closes, WINDOW, BOLLINGER_K)?;
                set.series.push(IndicatorSeries::new("BB Upper", upper));
                set.series.push(IndicatorSeries::new("BB Lower", lower));
            }
            Indicator::Vwap => {
                set.series.push(IndicatorSeries::new("VWAP", vwap(&closes, &series.volumes())?));
            }
        }
    }

    tracing::debug!(
        ticker = series.ticker(),
        rows = series.len(),
        outputs = set.len(),
        "Computed indicators"
    );
    Ok(set)
}

fn check_period(period: usize) -> Result<()> {
    if period == 0 {
        return Err(StockError::Indicator("period must be positive".into()));
    }
    Ok(())
}

/// Simple moving average; the first `period - 1` points are undefined
pub fn sma(values: &[f64], period: usize) -> Result<Vec<Option<f64>>> {
    check_period(period)?;
    let mut indicator =
        SimpleMovingAverage::new(period).map_err(|e| StockError::Indicator(format!("{e:?}")))?;

    Ok(values
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let avg = indicator.next(v);
            (i + 1 >= period).then_some(avg)
        })
        .collect())
}

/// Exponential moving average with adjusted weights
///
/// `EMA_t = Σ (1-α)^i·x_{t-i} / Σ (1-α)^i` with `α = 2 / (span + 1)`. Values
/// are reported once `span` observations are available.
pub fn ema_adjusted(values: &[f64], span: usize) -> Result<Vec<Option<f64>>> {
    check_period(span)?;
    let decay = 1.0 - 2.0 / (span as f64 + 1.0);

    let mut numerator = 0.0;
    let mut denominator = 0.0;
    Ok(values
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            numerator = v + decay * numerator;
            denominator = 1.0 + decay * denominator;
            (i + 1 >= span).then_some(numerator / denominator)
        })
        .collect())
}

/// Trailing sample standard deviation (n - 1 denominator)
pub fn rolling_std(values: &[f64], period: usize) -> Result<Vec<Option<f64>>> {
    check_period(period)?;
    if period < 2 {
        return Err(StockError::Indicator(
            "sample standard deviation needs a period of at least 2".into(),
        ));
    }

    let mut out = vec![None; values.len()];
    for (end, slot) in out.iter_mut().enumerate().skip(period - 1) {
        let window = &values[end + 1 - period..=end];
        let mean = window.iter().sum::<f64>() / period as f64;
        let squares: f64 = window.iter().map(|v| (v - mean).powi(2)).sum();
        *slot = Some((squares / (period - 1) as f64).sqrt());
    }
    Ok(out)
}

/// Bollinger envelope `SMA ± k·σ`, returned as (upper, lower)
pub fn bollinger(
    values: &[f64],
    period: usize,
    k: f64,
) -> Result<(Vec<Option<f64>>, Vec<Option<f64>>)> {
    let middle = sma(values, period)?;
    let std = rolling_std(values, period)?;

    let band = |sign: f64| -> Vec<Option<f64>> {
        middle
            .iter()
            .zip(&std)
            .map(|(m, s)| Some((*m)? + sign * k * (*s)?))
            .collect()
    };
    Ok((band(1.0), band(-1.0)))
}

/// Cumulative volume-weighted average price from the first bar
///
/// Undefined wherever cumulative volume is still zero.
pub fn vwap(closes: &[f64], volumes: &[u64]) -> Result<Vec<Option<f64>>> {
    if closes.len() != volumes.len() {
        return Err(StockError::Indicator(format!(
            "price and volume lengths differ ({} vs {})",
            closes.len(),
            volumes.len()
        )));
    }

    let mut price_volume = 0.0;
    let mut volume: u128 = 0;
    Ok(closes
        .iter()
        .zip(volumes)
        .map(|(&close, &vol)| {
            price_volume += close * vol as f64;
            volume += u128::from(vol);
            (volume > 0).then(|| price_volume / volume as f64)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::OhlcvBar;
    use chrono::{Days, NaiveDate};

    const EPS: f64 = 1e-9;

    fn series_from(closes: &[f64], volumes: &[u64]) -> OhlcvSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars = closes
            .iter()
            .zip(volumes)
            .enumerate()
            .map(|(i, (&c, &v))| {
                let date = start.checked_add_days(Days::new(i as u64)).unwrap();
                OhlcvBar::new(date, c, c + 1.0, c - 1.0, c, v)
            })
            .collect();
        OhlcvSeries::new("TEST", bars)
    }

    fn assert_close(actual: Option<f64>, expected: f64) {
        let actual = actual.expect("value should be defined");
        assert!(
            (actual - expected).abs() < EPS,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_short_series_is_entirely_undefined() {
        let closes: Vec<f64> = (1..=19).map(f64::from).collect();
        let series = series_from(&closes, &[100; 19]);
        let set = compute(&series, &[Indicator::Sma20, Indicator::Ema20, Indicator::BollingerBands20])
            .unwrap();

        assert_eq!(set.names(), vec!["SMA (20)", "EMA (20)", "BB Upper", "BB Lower"]);
        for output in set.iter() {
            assert_eq!(output.len(), 19);
            assert_eq!(output.defined_count(), 0, "{} should be undefined", output.name);
        }
    }

    #[test]
    fn test_warm_up_window() {
        let closes: Vec<f64> = (1..=25).map(f64::from).collect();
        let sma = sma(&closes, WINDOW).unwrap();

        assert!(sma[..19].iter().all(Option::is_none));
        // mean of 1..=20
        assert_close(sma[19], 10.5);
        // mean of 6..=25
        assert_close(sma[24], 15.5);
    }

    #[test]
    fn test_constant_close_collapses_bands() {
        let closes = vec![50.0; 30];
        let series = series_from(&closes, &[1_000; 30]);
        let set = compute(&series, &Indicator::ALL).unwrap();

        for name in ["SMA (20)", "EMA (20)", "BB Upper", "BB Lower", "VWAP"] {
            let output = set.get(name).unwrap();
            for value in &output.values[19..] {
                assert_close(*value, 50.0);
            }
        }
    }

    #[test]
    fn test_ema_adjusted_weights() {
        let closes: Vec<f64> = (1..=20).map(f64::from).collect();
        let ema = ema_adjusted(&closes, WINDOW).unwrap();

        let decay: f64 = 1.0 - 2.0 / 21.0;
        let (num, den) = closes
            .iter()
            .rev()
            .enumerate()
            .fold((0.0, 0.0), |(n, d), (i, x)| {
                let w = decay.powi(i as i32);
                (n + w * x, d + w)
            });

        assert!(ema[..19].iter().all(Option::is_none));
        assert_close(ema[19], num / den);
    }

    #[test]
    fn test_ema_with_span_one_tracks_input() {
        let closes = [3.0, 7.0, 5.0];
        let ema = ema_adjusted(&closes, 1).unwrap();
        assert_eq!(ema, vec![Some(3.0), Some(7.0), Some(5.0)]);
    }

    #[test]
    fn test_bollinger_uses_sample_std() {
        // window [1, 2, 3]: mean 2, sample variance 1
        let (upper, lower) = bollinger(&[1.0, 2.0, 3.0], 3, 2.0).unwrap();
        assert_eq!(upper[..2], [None, None]);
        assert_close(upper[2], 4.0);
        assert_close(lower[2], 0.0);
    }

    #[test]
    fn test_vwap_golden_fixture() {
        let closes = [10.0, 11.0, 12.0, 11.5, 13.0];
        let volumes = [100, 200, 0, 300, 400];
        let series = series_from(&closes, &volumes);
        let set = compute(&series, &[Indicator::Vwap]).unwrap();
        let vwap = &set.get("VWAP").unwrap().values;

        assert_close(vwap[0], 10.0);
        assert_close(vwap[1], (1000.0 + 2200.0) / 300.0);
        // zero volume day leaves the running ratio unchanged
        assert_close(vwap[2], (1000.0 + 2200.0) / 300.0);
        // 1000 + 2200 + 0 + 3450 + 5200 = 11850 over 1000 shares
        assert_close(vwap[4], 11.85);
    }

    #[test]
    fn test_vwap_undefined_while_volume_is_zero() {
        let vwap = vwap(&[10.0, 11.0, 12.0], &[0, 0, 50]).unwrap();
        assert_eq!(vwap[0], None);
        assert_eq!(vwap[1], None);
        assert_close(vwap[2], 12.0);
    }

    #[test]
    fn test_compute_does_not_mutate_input() {
        let closes: Vec<f64> = (1..=30).map(f64::from).collect();
        let series = series_from(&closes, &[10; 30]);
        let before = series.clone();

        let set = compute(&series, &[Indicator::Vwap, Indicator::Sma20]).unwrap();
        assert_eq!(series, before);
        assert_eq!(set.names(), vec!["VWAP", "SMA (20)"]);
    }

    #[test]
    fn test_duplicate_selection_collapsed() {
        let series = series_from(&[1.0, 2.0], &[1, 1]);
        let set = compute(&series, &[Indicator::Vwap, Indicator::Vwap]).unwrap();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_indicator_labels() {
        for label in ["SMA20", "sma", "20-Day SMA"] {
            assert_eq!(label.parse::<Indicator>().unwrap(), Indicator::Sma20);
        }
        for label in ["EMA20", "20-Day EMA"] {
            assert_eq!(label.parse::<Indicator>().unwrap(), Indicator::Ema20);
        }
        for label in ["BollingerBands20", "bb", "20-Day Bollinger Bands"] {
            assert_eq!(label.parse::<Indicator>().unwrap(), Indicator::BollingerBands20);
        }
        assert_eq!("vwap".parse::<Indicator>().unwrap(), Indicator::Vwap);
        assert!("RSI".parse::<Indicator>().is_err());
    }

    #[test]
    fn test_parse_indicators_list() {
        let parsed = parse_indicators("vwap, SMA20,, sma ,bb").unwrap();
        assert_eq!(
            parsed,
            vec![Indicator::Vwap, Indicator::Sma20, Indicator::BollingerBands20]
        );
        assert!(parse_indicators("").unwrap().is_empty());
        assert!(parse_indicators("SMA20,MACD").is_err());
    }
}
