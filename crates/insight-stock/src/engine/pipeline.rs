//! Fetch-then-analyse pipeline over a ticker list

use super::context::RunContext;
use super::report::{RunReport, TickerReport};
use crate::analysis::{AgentSettings, AnalysisClient, LlmAnalysisAgent};
use crate::api::{MarketDataProvider, YahooFinanceProvider};
use crate::cache::CachedProvider;
use crate::chart::ChartRenderer;
use crate::config::{DashboardConfig, SEARCH_KEY_VAR, Secrets};
use crate::data::{DateRange, OhlcvSeries};
use crate::error::{Result, StockError};
use crate::indicators::Indicator;
use crate::prompts::PromptTemplates;
use futures::stream::{self, StreamExt};
use insight_llm::providers::{ChatCompletionsConfig, ChatCompletionsProvider};
use insight_tools::{TavilyConfig, TavilySearchTool, ToolRegistry};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Result of the data-fetch step
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub context: Arc<RunContext>,
    /// One message per ticker that was left out
    pub warnings: Vec<String>,
}

/// Ties a market data provider to an analysis client
pub struct Dashboard {
    provider: Arc<dyn MarketDataProvider>,
    client: Arc<AnalysisClient>,
    max_concurrency: usize,
}

impl Dashboard {
    pub fn new(provider: Arc<dyn MarketDataProvider>, client: Arc<AnalysisClient>) -> Self {
        Self {
            provider,
            client,
            max_concurrency: 1,
        }
    }

    /// Wire the production stack: cached Yahoo data, chat-completions model,
    /// and the web search tool when enabled
    pub fn from_config(config: &DashboardConfig, secrets: &Secrets) -> Result<Self> {
        config.validate()?;

        let llm = ChatCompletionsProvider::new(
            ChatCompletionsConfig::new(secrets.model_api_key.clone())
                .with_api_base(config.api_base.clone())
                .with_timeout(config.request_timeout.as_secs().max(1)),
        )?;

        let mut tools = ToolRegistry::new();
        if config.enable_search {
            let key = secrets.search_api_key.clone().ok_or_else(|| {
                StockError::ConfigError(format!("web search is enabled but {SEARCH_KEY_VAR} is not set"))
            })?;
            let search = TavilySearchTool::new(TavilyConfig::new(key))
                .map_err(|e| StockError::ConfigError(e.to_string()))?;
            tools.register(Arc::new(search));
        }

        let prompts = Arc::new(PromptTemplates::new()?);
        let system_prompt = prompts.system_prompt(config.response_mode, config.enable_search)?;
        let settings = AgentSettings {
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            max_tool_iterations: config.max_tool_iterations,
        };
        let agent = LlmAnalysisAgent::new(Arc::new(llm), tools, settings, system_prompt);

        let client = AnalysisClient::new(
            Arc::new(agent),
            prompts,
            ChartRenderer::new(config.chart_width, config.chart_height),
            config.response_mode,
            config.request_timeout,
        );
        let provider = CachedProvider::new(
            YahooFinanceProvider::new(config.yahoo_requests_per_minute),
            config.data_cache_ttl,
        );

        info!(
            model = %config.model,
            mode = %config.response_mode,
            search = config.enable_search,
            concurrency = config.max_concurrency,
            "Dashboard ready"
        );
        Ok(Self::new(Arc::new(provider), Arc::new(client)).with_max_concurrency(config.max_concurrency))
    }

    /// Number of tickers analysed at once; results keep input order regardless
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Fetch every ticker into a fresh context
    ///
    /// Tickers with no rows or a failing provider are excluded with a
    /// warning; the rest of the list is unaffected.
    #[instrument(skip_all, fields(tickers = tickers.len(), start = %range.start(), end = %range.end()))]
    pub async fn fetch(&self, tickers: &[String], range: DateRange, indicators: Vec<Indicator>) -> FetchOutcome {
        let mut series = Vec::with_capacity(tickers.len());
        let mut warnings = Vec::new();

        for ticker in tickers {
            match self.fetch_one(ticker, range).await {
                Ok(s) => {
                    info!(ticker = %ticker, rows = s.len(), "Fetched series");
                    series.push(s);
                }
                Err(e) => {
                    warn!(ticker = %ticker, error = %e, "Skipping ticker");
                    warnings.push(e.to_string());
                }
            }
        }

        FetchOutcome {
            context: Arc::new(RunContext::new(range, indicators, series)),
            warnings,
        }
    }

    async fn fetch_one(&self, ticker: &str, range: DateRange) -> Result<OhlcvSeries> {
        let series = self
            .provider
            .fetch_history(ticker, range)
            .await
            .map_err(|e| StockError::DataUnavailable {
                symbol: ticker.to_string(),
                reason: e.to_string(),
            })?;

        if series.is_empty() {
            return Err(StockError::DataUnavailable {
                symbol: ticker.to_string(),
                reason: "no rows in the selected range".to_string(),
            });
        }
        Ok(series)
    }

    /// Analyse every series in the context, in context order
    #[instrument(skip_all, fields(tickers = context.series().len(), start = %context.range().start(), end = %context.range().end()))]
    pub async fn analyze(&self, context: &RunContext) -> Vec<TickerReport> {
        let indicators = context.indicators();
        stream::iter(context.series())
            .map(|series| self.client.analyze(series, indicators))
            .buffered(self.max_concurrency)
            .collect()
            .await
    }

    /// Fetch then analyse
    pub async fn run(&self, tickers: &[String], range: DateRange, indicators: Vec<Indicator>) -> RunReport {
        let FetchOutcome { context, warnings } = self.fetch(tickers, range, indicators).await;
        let tickers = self.analyze(&context).await;
        info!(
            analysed = tickers.len(),
            skipped = warnings.len(),
            errors = tickers.iter().filter(|t| t.result.is_error()).count(),
            "Run complete"
        );
        RunReport { warnings, tickers }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{AgentReply, AnalysisAgent, ResponseMode};
    use crate::api::MockMarketDataProvider;
    use crate::chart::ChartRenderer;
    use crate::data::OhlcvBar;
    use crate::prompts::PromptTemplates;
    use async_trait::async_trait;
    use chrono::{Days, NaiveDate};
    use std::time::Duration;

    /// Holds, except for tickers listed in `failing`
    struct ScriptedAgent {
        failing: Vec<&'static str>,
    }

    #[async_trait]
    impl AnalysisAgent for ScriptedAgent {
        async fn run(&self, prompt: &str, _image: &[u8]) -> Result<AgentReply> {
            if let Some(ticker) = self.failing.iter().find(|t| prompt.contains(&format!(" {t} "))) {
                return Err(StockError::Transport(format!("upstream error for {ticker}")));
            }
            Ok(AgentReply {
                content: r#"{"action": "Hold", "justification": "Flat"}"#.to_string(),
            })
        }
    }

    fn range() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        )
        .unwrap()
    }

    fn series(ticker: &str) -> OhlcvSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let bars = (0..25)
            .map(|i| {
                let date = start.checked_add_days(Days::new(i)).unwrap();
                let close = 100.0 + i as f64;
                OhlcvBar::new(date, close, close + 2.0, close - 2.0, close + 0.5, 1_000)
            })
            .collect();
        OhlcvSeries::new(ticker, bars)
    }

    fn provider() -> MockMarketDataProvider {
        let mut mock = MockMarketDataProvider::new();
        mock.expect_fetch_history().returning(|ticker, _| match ticker {
            "BADTICKER" => Ok(OhlcvSeries::empty(ticker)),
            "DOWN" => Err(StockError::Provider("HTTP 503".into())),
            _ => Ok(series(ticker)),
        });
        mock
    }

    fn dashboard(failing: Vec<&'static str>, concurrency: usize) -> Dashboard {
        let client = AnalysisClient::new(
            Arc::new(ScriptedAgent { failing }),
            Arc::new(PromptTemplates::new().unwrap()),
            ChartRenderer::new(320, 200),
            ResponseMode::Structured,
            Duration::from_secs(5),
        );
        Dashboard::new(Arc::new(provider()), Arc::new(client)).with_max_concurrency(concurrency)
    }

    fn tickers(list: &[&str]) -> Vec<String> {
        list.iter().map(|t| (*t).to_string()).collect()
    }

    #[tokio::test]
    async fn test_bad_ticker_yields_one_warning_and_one_result() {
        let report = dashboard(vec![], 1)
            .run(&tickers(&["AAPL", "BADTICKER"]), range(), vec![Indicator::Sma20])
            .await;

        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("BADTICKER"));
        assert_eq!(report.tickers.len(), 1);
        assert_eq!(report.tickers[0].ticker, "AAPL");
        assert!(!report.tickers[0].result.is_error());
    }

    #[tokio::test]
    async fn test_provider_failure_is_a_warning() {
        let outcome = dashboard(vec![], 1)
            .fetch(&tickers(&["DOWN", "MSFT"]), range(), vec![])
            .await;

        assert_eq!(outcome.context.tickers(), vec!["MSFT"]);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("HTTP 503"));
    }

    #[tokio::test]
    async fn test_failing_ticker_is_isolated() {
        let report = dashboard(vec!["MSFT"], 1)
            .run(&tickers(&["AAPL", "MSFT", "GOOG"]), range(), vec![Indicator::Ema20])
            .await;

        let labels: Vec<&str> = report.tickers.iter().map(|t| t.result.summary_label()).collect();
        assert_eq!(labels, vec!["Hold", "Error", "Hold"]);
        assert!(report.tickers[1].result.detail().contains("upstream error for MSFT"));
        assert!(report.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_analysis_keeps_input_order() {
        let names = ["GOOG", "AAPL", "MSFT", "AMZN", "NVDA"];
        let report = dashboard(vec![], 3)
            .run(&tickers(&names), range(), Indicator::ALL.to_vec())
            .await;

        let order: Vec<&str> = report.tickers.iter().map(|t| t.ticker.as_str()).collect();
        assert_eq!(order, names);
        assert!(report.tickers.iter().all(|t| t.overlays.len() == 5));
    }

    #[test]
    fn test_from_config_requires_search_key() {
        let config = DashboardConfig::default();
        let secrets = Secrets {
            model_api_key: "key".into(),
            search_api_key: None,
        };
        let err = Dashboard::from_config(&config, &secrets).err().unwrap();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("TAVILY_API_KEY"));
    }

    #[test]
    fn test_from_config_without_search() {
        let config = DashboardConfig::builder().enable_search(false).build().unwrap();
        let secrets = Secrets {
            model_api_key: "key".into(),
            search_api_key: None,
        };
        assert!(Dashboard::from_config(&config, &secrets).is_ok());

        let blank = Secrets {
            model_api_key: "  ".into(),
            search_api_key: None,
        };
        assert!(Dashboard::from_config(&config, &blank).err().unwrap().is_fatal());
    }

    #[tokio::test]
    async fn test_each_fetch_builds_a_new_context() {
        let dashboard = dashboard(vec![], 1);
        let first = dashboard.fetch(&tickers(&["AAPL"]), range(), vec![Indicator::Sma20]).await;
        let second = dashboard.fetch(&tickers(&["MSFT"]), range(), vec![Indicator::Vwap]).await;

        assert_eq!(first.context.tickers(), vec!["AAPL"]);
        assert_eq!(first.context.indicators(), &[Indicator::Sma20]);
        assert_eq!(second.context.tickers(), vec!["MSFT"]);
        assert!(!Arc::ptr_eq(&first.context, &second.context));
    }
}
