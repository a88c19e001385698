//! Configuration for dashboard runs

use crate::analysis::ResponseMode;
use crate::chart::DEFAULT_SIZE;
use crate::data::DateRange;
use crate::error::{Result, StockError};
use crate::indicators::{Indicator, parse_indicators};
use chrono::{NaiveDate, Utc};
use insight_llm::providers::chat_completions::DEFAULT_API_BASE;
use insight_utils::{Secret, env_parse, env_string, require_env};
use std::time::Duration;

/// Default tickers when none are configured
pub const DEFAULT_TICKERS: &str = "AAPL,MSFT,GOOG";

/// Default vision model, served through Gemini's OpenAI-compatible endpoint
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Days of history fetched when no start date is given
pub const DEFAULT_LOOKBACK_DAYS: u64 = 365;

/// Environment variables holding the model API key, first match wins
pub const MODEL_KEY_VARS: [&str; 2] = ["GOOGLE_API_KEY", "OPENAI_API_KEY"];

/// Environment variable holding the search API key
pub const SEARCH_KEY_VAR: &str = "TAVILY_API_KEY";

/// Split a comma-separated ticker list
///
/// Entries are trimmed and upper-cased; empty entries and repeats are dropped.
pub fn parse_tickers(input: &str) -> Vec<String> {
    let mut tickers: Vec<String> = Vec::new();
    for ticker in input.split(',').map(|t| t.trim().to_uppercase()) {
        if !ticker.is_empty() && !tickers.contains(&ticker) {
            tickers.push(ticker);
        }
    }
    tickers
}

/// Everything a run needs apart from credentials
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub tickers: Vec<String>,
    pub start: NaiveDate,
    /// Exclusive
    pub end: NaiveDate,
    pub indicators: Vec<Indicator>,
    pub response_mode: ResponseMode,

    pub model: String,
    pub api_base: String,
    /// Upper bound on one ticker's agent call, tool rounds included
    pub request_timeout: Duration,
    pub max_concurrency: usize,
    pub enable_search: bool,
    pub max_tool_iterations: usize,
    pub max_tokens: usize,
    pub temperature: f32,

    pub chart_width: u32,
    pub chart_height: u32,

    /// How long fetched series are reused
    pub data_cache_ttl: Duration,
    pub yahoo_requests_per_minute: u32,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        let end = Utc::now().date_naive();
        let start = end
            .checked_sub_days(chrono::Days::new(DEFAULT_LOOKBACK_DAYS))
            .unwrap_or(NaiveDate::MIN);

        Self {
            tickers: parse_tickers(DEFAULT_TICKERS),
            start,
            end,
            indicators: vec![Indicator::Sma20],
            response_mode: ResponseMode::Structured,
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            request_timeout: Duration::from_secs(120),
            max_concurrency: 1,
            enable_search: true,
            max_tool_iterations: 5,
            max_tokens: 2048,
            temperature: 0.2,
            chart_width: DEFAULT_SIZE.0,
            chart_height: DEFAULT_SIZE.1,
            data_cache_ttl: Duration::from_secs(900),
            yahoo_requests_per_minute: 60,
        }
    }
}

impl DashboardConfig {
    pub fn builder() -> DashboardConfigBuilder {
        DashboardConfigBuilder::default()
    }

    /// Defaults overlaid with `INSIGHT_*` environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(tickers) = env_string("INSIGHT_TICKERS") {
            config.tickers = parse_tickers(&tickers);
        }
        if let Some(indicators) = env_string("INSIGHT_INDICATORS") {
            config.indicators = parse_indicators(&indicators)?;
        }
        if let Some(mode) = env_parse::<ResponseMode>("INSIGHT_RESPONSE_MODE")? {
            config.response_mode = mode;
        }
        if let Some(model) = env_string("INSIGHT_MODEL") {
            config.model = model;
        }
        if let Some(api_base) = env_string("INSIGHT_API_BASE") {
            config.api_base = api_base;
        }
        if let Some(secs) = env_parse::<u64>("INSIGHT_TIMEOUT_SECS")? {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(n) = env_parse::<usize>("INSIGHT_CONCURRENCY")? {
            config.max_concurrency = n;
        }
        if let Some(enabled) = env_parse::<bool>("INSIGHT_ENABLE_SEARCH")? {
            config.enable_search = enabled;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn range(&self) -> Result<DateRange> {
        DateRange::new(self.start, self.end)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tickers.is_empty() {
            return Err(StockError::ConfigError("at least one ticker is required".into()));
        }
        self.range()?;
        if self.model.trim().is_empty() {
            return Err(StockError::ConfigError("model must not be empty".into()));
        }
        if self.request_timeout.is_zero() {
            return Err(StockError::ConfigError("request_timeout must be positive".into()));
        }
        if self.max_concurrency == 0 {
            return Err(StockError::ConfigError("max_concurrency must be greater than 0".into()));
        }
        if self.max_tokens == 0 {
            return Err(StockError::ConfigError("max_tokens must be greater than 0".into()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(StockError::ConfigError(format!(
                "temperature {} is outside 0.0..=2.0",
                self.temperature
            )));
        }
        if self.chart_width < 200 || self.chart_height < 150 {
            return Err(StockError::ConfigError(format!(
                "chart size {}x{} is below the 200x150 minimum",
                self.chart_width, self.chart_height
            )));
        }
        Ok(())
    }
}

/// Builder for [`DashboardConfig`]
#[derive(Debug, Default)]
pub struct DashboardConfigBuilder {
    tickers: Option<Vec<String>>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    indicators: Option<Vec<Indicator>>,
    response_mode: Option<ResponseMode>,
    model: Option<String>,
    api_base: Option<String>,
    request_timeout: Option<Duration>,
    max_concurrency: Option<usize>,
    enable_search: Option<bool>,
    max_tool_iterations: Option<usize>,
    max_tokens: Option<usize>,
    temperature: Option<f32>,
    chart_size: Option<(u32, u32)>,
    data_cache_ttl: Option<Duration>,
}

impl DashboardConfigBuilder {
    /// Comma-separated tickers, normalized by [`parse_tickers`]
    pub fn tickers(mut self, tickers: &str) -> Self {
        self.tickers = Some(parse_tickers(tickers));
        self
    }

    pub fn start(mut self, start: NaiveDate) -> Self {
        self.start = Some(start);
        self
    }

    pub fn end(mut self, end: NaiveDate) -> Self {
        self.end = Some(end);
        self
    }

    pub fn indicators(mut self, indicators: Vec<Indicator>) -> Self {
        self.indicators = Some(indicators);
        self
    }

    pub fn response_mode(mut self, mode: ResponseMode) -> Self {
        self.response_mode = Some(mode);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = Some(api_base.into());
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = Some(n);
        self
    }

    pub fn enable_search(mut self, enabled: bool) -> Self {
        self.enable_search = Some(enabled);
        self
    }

    pub fn max_tool_iterations(mut self, n: usize) -> Self {
        self.max_tool_iterations = Some(n);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.max_tokens = Some(n);
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn chart_size(mut self, width: u32, height: u32) -> Self {
        self.chart_size = Some((width, height));
        self
    }

    pub fn data_cache_ttl(mut self, ttl: Duration) -> Self {
        self.data_cache_ttl = Some(ttl);
        self
    }

    /// Fill unset fields from `base` and validate
    pub fn build_on(self, base: DashboardConfig) -> Result<DashboardConfig> {
        let (chart_width, chart_height) = self
            .chart_size
            .unwrap_or((base.chart_width, base.chart_height));

        let config = DashboardConfig {
            tickers: self.tickers.unwrap_or(base.tickers),
            start: self.start.unwrap_or(base.start),
            end: self.end.unwrap_or(base.end),
            indicators: self.indicators.unwrap_or(base.indicators),
            response_mode: self.response_mode.unwrap_or(base.response_mode),
            model: self.model.unwrap_or(base.model),
            api_base: self.api_base.unwrap_or(base.api_base),
            request_timeout: self.request_timeout.unwrap_or(base.request_timeout),
            max_concurrency: self.max_concurrency.unwrap_or(base.max_concurrency),
            enable_search: self.enable_search.unwrap_or(base.enable_search),
            max_tool_iterations: self.max_tool_iterations.unwrap_or(base.max_tool_iterations),
            max_tokens: self.max_tokens.unwrap_or(base.max_tokens),
            temperature: self.temperature.unwrap_or(base.temperature),
            chart_width,
            chart_height,
            data_cache_ttl: self.data_cache_ttl.unwrap_or(base.data_cache_ttl),
            yahoo_requests_per_minute: base.yahoo_requests_per_minute,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn build(self) -> Result<DashboardConfig> {
        self.build_on(DashboardConfig::default())
    }
}

/// Credentials read from the environment
///
/// Kept apart from [`DashboardConfig`] so configuration can be logged freely.
#[derive(Debug, Clone)]
pub struct Secrets {
    pub model_api_key: Secret,
    pub search_api_key: Option<Secret>,
}

impl Secrets {
    /// Read keys, failing when a required one is absent
    pub fn from_env(search_required: bool) -> Result<Self> {
        let model_api_key = require_env(&MODEL_KEY_VARS)?;
        let search_api_key = if search_required {
            Some(require_env(&[SEARCH_KEY_VAR])?)
        } else {
            env_string(SEARCH_KEY_VAR).map(Secret::from)
        };

        Ok(Self {
            model_api_key,
            search_api_key,
        })
    }
}
