//! Candlestick chart composition and PNG rendering

use crate::data::{OhlcvBar, OhlcvSeries};
use crate::error::{Result, StockError};
use crate::indicators::{Indicator, IndicatorSet};
use plotters::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default raster size
pub const DEFAULT_SIZE: (u32, u32) = (1280, 720);

const MARGIN: u32 = 16;
const GAIN: RGBColor = RGBColor(38, 166, 154);
const LOSS: RGBColor = RGBColor(239, 83, 80);

/// Named colour of an overlay line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaletteColor {
    pub name: &'static str,
    pub rgb: (u8, u8, u8),
}

impl PaletteColor {
    const fn new(name: &'static str, r: u8, g: u8, b: u8) -> Self {
        Self {
            name,
            rgb: (r, g, b),
        }
    }

    fn to_rgb(self) -> RGBColor {
        RGBColor(self.rgb.0, self.rgb.1, self.rgb.2)
    }
}

/// Fixed colour for a trace name
pub fn trace_color(name: &str) -> PaletteColor {
    match name {
        "SMA (20)" => PaletteColor::new("blue", 31, 119, 180),
        "EMA (20)" => PaletteColor::new("orange", 255, 127, 14),
        "BB Upper" => PaletteColor::new("purple", 148, 103, 189),
        "BB Lower" => PaletteColor::new("pink", 227, 119, 194),
        "VWAP" => PaletteColor::new("olive", 188, 189, 34),
        _ => PaletteColor::new("black", 0, 0, 0),
    }
}

/// A line drawn over the candles
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayTrace {
    pub name: String,
    pub color: PaletteColor,
    pub values: Vec<Option<f64>>,
}

impl OverlayTrace {
    /// Runs of consecutive defined points as (index, value) pairs
    ///
    /// Undefined points end a run; nothing is interpolated across them.
    pub fn segments(&self) -> Vec<Vec<(f64, f64)>> {
        let mut segments = Vec::new();
        let mut current = Vec::new();
        for (i, value) in self.values.iter().enumerate() {
            match value {
                Some(v) => current.push((i as f64, *v)),
                None if !current.is_empty() => segments.push(std::mem::take(&mut current)),
                None => {}
            }
        }
        if !current.is_empty() {
            segments.push(current);
        }
        segments
    }
}

/// Candlestick trace plus ordered overlays for one ticker
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    ticker: String,
    candles: Vec<OhlcvBar>,
    overlays: Vec<OverlayTrace>,
    range_slider_visible: bool,
}

impl ChartSpec {
    /// Compose the chart from a series and its indicator outputs
    ///
    /// Only outputs of `selection` are drawn, in selection order; names the
    /// set does not contain are skipped.
    pub fn build(series: &OhlcvSeries, indicators: &IndicatorSet, selection: &[Indicator]) -> Self {
        let mut overlays: Vec<OverlayTrace> = Vec::new();
        for indicator in selection {
            for name in indicator.trace_names() {
                if overlays.iter().any(|o| o.name == *name) {
                    continue;
                }
                if let Some(output) = indicators.get(name) {
                    overlays.push(OverlayTrace {
                        name: output.name.clone(),
                        color: trace_color(&output.name),
                        values: output.values.clone(),
                    });
                }
            }
        }

        Self {
            ticker: series.ticker().to_string(),
            candles: series.bars().to_vec(),
            overlays,
            range_slider_visible: false,
        }
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn candles(&self) -> &[OhlcvBar] {
        &self.candles
    }

    pub fn overlays(&self) -> &[OverlayTrace] {
        &self.overlays
    }

    pub fn overlay_names(&self) -> Vec<String> {
        self.overlays.iter().map(|o| o.name.clone()).collect()
    }

    pub fn range_slider_visible(&self) -> bool {
        self.range_slider_visible
    }

    /// Legend lines describing how to read the image
    pub fn legend(&self) -> Vec<String> {
        let mut lines = vec![
            "green candles: close above open".to_string(),
            "red candles: close below open".to_string(),
        ];
        lines.extend(
            self.overlays
                .iter()
                .map(|o| format!("{} line: {}", o.color.name, o.name)),
        );
        lines
    }

    /// Price axis bounds covering candles and overlays, padded 2%
    fn price_bounds(&self) -> Option<(f64, f64)> {
        let overlay_values = self.overlays.iter().flat_map(|o| o.values.iter().flatten().copied());
        let lows = self.candles.iter().map(|b| b.low).chain(overlay_values.clone());
        let highs = self.candles.iter().map(|b| b.high).chain(overlay_values);

        let min = lows.fold(f64::INFINITY, f64::min);
        let max = highs.fold(f64::NEG_INFINITY, f64::max);
        if !min.is_finite() || !max.is_finite() {
            return None;
        }

        let pad = if max > min { (max - min) * 0.02 } else { 1.0 };
        Some((min - pad, max + pad))
    }
}

fn chart_error(err: impl std::fmt::Display) -> StockError {
    StockError::Chart(err.to_string())
}

/// Renders a [`ChartSpec`] to PNG bytes
#[derive(Debug, Clone)]
pub struct ChartRenderer {
    width: u32,
    height: u32,
    temp_dir: Option<PathBuf>,
}

impl Default for ChartRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_SIZE.0, DEFAULT_SIZE.1)
    }
}

impl ChartRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            temp_dir: None,
        }
    }

    /// Directory for the intermediate file, the system temp dir by default
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Render the chart and return the encoded PNG
    ///
    /// The image is written to a temporary file that is deleted when this
    /// returns, whether rendering succeeded or not.
    pub fn render_png(&self, spec: &ChartSpec) -> Result<Vec<u8>> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("chart-").suffix(".png");
        let file = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };

        self.draw(file.path(), spec)?;
        let bytes = std::fs::read(file.path())?;
        debug!(ticker = spec.ticker(), bytes = bytes.len(), "Rendered chart");
        Ok(bytes)
    }

    fn draw(&self, path: &Path, spec: &ChartSpec) -> Result<()> {
        if spec.candles.is_empty() {
            return Err(StockError::Chart(format!(
                "no price data to draw for {}",
                spec.ticker
            )));
        }
        let (y_min, y_max) = spec
            .price_bounds()
            .ok_or_else(|| StockError::Chart("price range is not finite".into()))?;

        let root = BitMapBackend::new(path, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE).map_err(chart_error)?;

        let count = spec.candles.len();
        let mut chart = ChartBuilder::on(&root)
            .margin(MARGIN)
            .build_cartesian_2d(-0.5..count as f64 - 0.5, y_min..y_max)
            .map_err(chart_error)?;

        let plot_width = self.width.saturating_sub(2 * MARGIN) as f64;
        let candle_width = (plot_width / count as f64 * 0.7).clamp(1.0, 15.0) as u32;

        chart
            .draw_series(spec.candles.iter().enumerate().map(|(i, bar)| {
                CandleStick::new(
                    i as f64,
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close,
                    GAIN.filled(),
                    LOSS.filled(),
                    candle_width,
                )
            }))
            .map_err(chart_error)?;

        for overlay in &spec.overlays {
            let style = overlay.color.to_rgb().stroke_width(2);
            for segment in overlay.segments() {
                chart
                    .draw_series(LineSeries::new(segment, style))
                    .map_err(chart_error)?;
            }
        }

        root.present().map_err(chart_error)?;
        Ok(())
    }
}
