//! Chart insight CLI
//!
//! Fetches daily history for a list of tickers, renders candlestick charts
//! with indicator overlays, and prints the model's reading of each chart.
//!
//! # Usage
//!
//! ```bash
//! export GOOGLE_API_KEY="..."
//! export TAVILY_API_KEY="..."   # unless --no-search
//!
//! cargo run --bin chart-insight -- --tickers aapl,msft --indicators sma20,bb,vwap
//! ```

use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use insight_stock::indicators::parse_indicators;
use insight_stock::{Dashboard, DashboardConfig, ResponseMode, Secrets};
use insight_utils::{LogFormat, init_tracing};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(
    name = "chart-insight",
    version,
    about = "Candlestick charts with indicator overlays, read by a vision model"
)]
struct Cli {
    /// Comma-separated ticker symbols
    #[arg(short, long)]
    tickers: Option<String>,

    /// First day of history (YYYY-MM-DD)
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Day after the last day of history (YYYY-MM-DD)
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Comma-separated overlays: SMA20, EMA20, BollingerBands20, VWAP
    #[arg(short, long)]
    indicators: Option<String>,

    /// Reply format: structured or free-text
    #[arg(short, long)]
    mode: Option<ResponseMode>,

    #[arg(long)]
    model: Option<String>,

    /// OpenAI-compatible API base URL
    #[arg(long)]
    api_base: Option<String>,

    /// Per-ticker limit for the model call
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Tickers analysed at once
    #[arg(long)]
    concurrency: Option<usize>,

    /// Do not offer the web search tool
    #[arg(long)]
    no_search: bool,

    /// Write each chart as <TICKER>.png into this directory
    #[arg(long)]
    save_charts: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn config(&self) -> anyhow::Result<DashboardConfig> {
        let mut builder = DashboardConfig::builder();
        if let Some(tickers) = &self.tickers {
            builder = builder.tickers(tickers);
        }
        if let Some(start) = self.start {
            builder = builder.start(start);
        }
        if let Some(end) = self.end {
            builder = builder.end(end);
        }
        if let Some(indicators) = &self.indicators {
            builder = builder.indicators(parse_indicators(indicators)?);
        }
        if let Some(mode) = self.mode {
            builder = builder.response_mode(mode);
        }
        if let Some(model) = &self.model {
            builder = builder.model(model);
        }
        if let Some(api_base) = &self.api_base {
            builder = builder.api_base(api_base);
        }
        if let Some(secs) = self.timeout_secs {
            builder = builder.request_timeout(Duration::from_secs(secs));
        }
        if let Some(n) = self.concurrency {
            builder = builder.max_concurrency(n);
        }
        if self.no_search {
            builder = builder.enable_search(false);
        }

        Ok(builder.build_on(DashboardConfig::from_env()?)?)
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = cli.config()?;
    let secrets = Secrets::from_env(config.enable_search)?;
    tracing::debug!(?config, "Loaded configuration");

    let dashboard = Dashboard::from_config(&config, &secrets)?;
    let report = dashboard
        .run(&config.tickers, config.range()?, config.indicators.clone())
        .await;

    for warning in &report.warnings {
        eprintln!("warning: {warning}");
    }

    if let Some(dir) = &cli.save_charts {
        let written = report
            .save_charts(dir)
            .with_context(|| format!("saving charts to {}", dir.display()))?;
        for path in written {
            eprintln!("saved {}", path.display());
        }
    }

    if report.tickers.is_empty() {
        eprintln!("No data was fetched for any ticker.");
        return Ok(ExitCode::FAILURE);
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Overall Summary\n{}\n", report.summary_table());
        print!("{}", report.render_details());
    }
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing("warn,insight_stock=info", LogFormat::from_env());

    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}
