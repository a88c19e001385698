//! Technical chart analysis
//!
//! This crate turns daily price history into annotated candlestick charts and
//! asks a vision-capable model to read them. It includes:
//!
//! - Market data from Yahoo Finance behind the [`MarketDataProvider`] seam,
//!   with a TTL cache
//! - An indicator engine: SMA(20), adjusted EMA(20), Bollinger Bands(20, 2σ)
//!   and cumulative VWAP
//! - A chart builder rendering candles and overlays to PNG
//! - An analysis client that sends the chart with a prompt to an agent and
//!   parses its reply as a structured recommendation or free text
//! - A [`Dashboard`] pipeline that isolates failures per ticker
//!
//! # Example
//!
//! ```rust,ignore
//! use insight_stock::{Dashboard, DashboardConfig, Secrets};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = DashboardConfig::from_env()?;
//!     let secrets = Secrets::from_env(config.enable_search)?;
//!     let dashboard = Dashboard::from_config(&config, &secrets)?;
//!
//!     let report = dashboard
//!         .run(&config.tickers, config.range()?, config.indicators.clone())
//!         .await;
//!     println!("{}", report.summary_table());
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod api;
pub mod cache;
pub mod chart;
pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod indicators;
pub mod prompts;

pub use analysis::{
    Action, AnalysisAgent, AnalysisClient, AnalysisResult, AnalysisStage, LlmAnalysisAgent,
    Recommendation, ResponseMode,
};
pub use api::{MarketDataProvider, YahooFinanceProvider};
pub use cache::CachedProvider;
pub use chart::{ChartRenderer, ChartSpec};
pub use config::{DashboardConfig, Secrets, parse_tickers};
pub use data::{DateRange, OhlcvBar, OhlcvSeries};
pub use engine::{Dashboard, RunContext, RunReport, TickerReport};
pub use error::{Result, StockError};
pub use indicators::{Indicator, IndicatorSeries, IndicatorSet};
