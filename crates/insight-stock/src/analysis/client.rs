//! Per-ticker analysis: chart, prompt, agent call, result

use super::agent::AnalysisAgent;
use super::result::{AnalysisResult, Recommendation, ResponseMode};
use crate::chart::{ChartRenderer, ChartSpec};
use crate::data::OhlcvSeries;
use crate::engine::TickerReport;
use crate::error::{Result, StockError};
use crate::indicators::{Indicator, compute};
use crate::prompts::PromptTemplates;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Progress of one ticker's analysis
///
/// ```text
/// Idle -> ChartBuilt -> RequestSent -> ResultParsed -> Displayed
///                                   \-> ParseFailed -> ErrorResult -> Displayed
/// ```
/// Chart, prompt, and transport failures jump straight to `ErrorResult`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStage {
    Idle,
    ChartBuilt,
    RequestSent,
    ResultParsed,
    ParseFailed,
    ErrorResult,
    Displayed,
}

impl fmt::Display for AnalysisStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AnalysisStage::Idle => "idle",
            AnalysisStage::ChartBuilt => "chart_built",
            AnalysisStage::RequestSent => "request_sent",
            AnalysisStage::ResultParsed => "result_parsed",
            AnalysisStage::ParseFailed => "parse_failed",
            AnalysisStage::ErrorResult => "error_result",
            AnalysisStage::Displayed => "displayed",
        };
        f.write_str(name)
    }
}

/// What is sent to the agent for one ticker
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    ticker: String,
    chart_image: Vec<u8>,
    prompt: String,
}

impl AnalysisRequest {
    pub fn new(ticker: impl Into<String>, chart_image: Vec<u8>, prompt: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            chart_image,
            prompt: prompt.into(),
        }
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn chart_image(&self) -> &[u8] {
        &self.chart_image
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }
}

/// Stage history for one ticker
struct Progress {
    ticker: String,
    stages: Vec<AnalysisStage>,
}

impl Progress {
    fn new(ticker: &str) -> Self {
        Self {
            ticker: ticker.to_string(),
            stages: vec![AnalysisStage::Idle],
        }
    }

    fn enter(&mut self, stage: AnalysisStage) {
        debug!(ticker = %self.ticker, %stage, "Analysis stage");
        self.stages.push(stage);
    }

    fn finish(
        mut self,
        result: AnalysisResult,
        overlays: Vec<String>,
        chart_png: Option<Vec<u8>>,
    ) -> TickerReport {
        self.enter(AnalysisStage::Displayed);
        TickerReport {
            ticker: self.ticker,
            stages: self.stages,
            result,
            overlays,
            chart_png,
        }
    }

    fn fail(mut self, err: &StockError, overlays: Vec<String>, chart_png: Option<Vec<u8>>) -> TickerReport {
        warn!(ticker = %self.ticker, error = %err, "Analysis failed");
        self.enter(AnalysisStage::ErrorResult);
        self.finish(AnalysisResult::error(err.to_string()), overlays, chart_png)
    }
}

/// Drives chart rendering and the agent call for each ticker
pub struct AnalysisClient {
    agent: Arc<dyn AnalysisAgent>,
    prompts: Arc<PromptTemplates>,
    renderer: ChartRenderer,
    mode: ResponseMode,
    request_timeout: Duration,
}

impl AnalysisClient {
    pub fn new(
        agent: Arc<dyn AnalysisAgent>,
        prompts: Arc<PromptTemplates>,
        renderer: ChartRenderer,
        mode: ResponseMode,
        request_timeout: Duration,
    ) -> Self {
        Self {
            agent,
            prompts,
            renderer,
            mode,
            request_timeout,
        }
    }

    pub fn mode(&self) -> ResponseMode {
        self.mode
    }

    /// Analyse one ticker
    ///
    /// Never fails: every error becomes an error result in the report, so
    /// one ticker cannot abort the others.
    #[instrument(skip_all, fields(ticker = series.ticker(), mode = %self.mode))]
    pub async fn analyze(&self, series: &OhlcvSeries, selection: &[Indicator]) -> TickerReport {
        let mut progress = Progress::new(series.ticker());

        let (spec, png) = match self.build_chart(series, selection).await {
            Ok(chart) => chart,
            Err(e) => return progress.fail(&e, Vec::new(), None),
        };
        let overlays = spec.overlay_names();
        progress.enter(AnalysisStage::ChartBuilt);

        let prompt = match self.prompts.ticker_prompt(&spec, self.mode) {
            Ok(prompt) => prompt,
            Err(e) => return progress.fail(&e, overlays, Some(png)),
        };
        let request = AnalysisRequest::new(series.ticker(), png, prompt);

        progress.enter(AnalysisStage::RequestSent);
        let content = match self.send(&request).await {
            Ok(content) => content,
            Err(e) => return progress.fail(&e, overlays, Some(request.chart_image)),
        };

        let result = match self.mode {
            ResponseMode::Structured => {
                let parsed = Recommendation::parse(&content);
                match &parsed {
                    Ok(_) => progress.enter(AnalysisStage::ResultParsed),
                    Err(e) => {
                        warn!(error = %e, reply_length = content.len(), "Could not parse structured reply");
                        progress.enter(AnalysisStage::ParseFailed);
                        progress.enter(AnalysisStage::ErrorResult);
                    }
                }
                AnalysisResult::from_structured_reply(parsed)
            }
            ResponseMode::FreeText => {
                progress.enter(AnalysisStage::ResultParsed);
                AnalysisResult::free_text(content)
            }
        };

        info!(recommendation = result.summary_label(), "Analysis complete");
        progress.finish(result, overlays, Some(request.chart_image))
    }

    /// Compute overlays and render the chart off the async runtime
    async fn build_chart(&self, series: &OhlcvSeries, selection: &[Indicator]) -> Result<(ChartSpec, Vec<u8>)> {
        let indicators = compute(series, selection)?;
        let spec = ChartSpec::build(series, &indicators, selection);

        let renderer = self.renderer.clone();
        let render_spec = spec.clone();
        let png = tokio::task::spawn_blocking(move || renderer.render_png(&render_spec))
            .await
            .map_err(|e| StockError::Chart(format!("render task failed: {e}")))??;
        Ok((spec, png))
    }

    async fn send(&self, request: &AnalysisRequest) -> Result<String> {
        let call = self.agent.run(request.prompt(), request.chart_image());
        match tokio::time::timeout(self.request_timeout, call).await {
            Ok(reply) => Ok(reply?.content),
            Err(_) => Err(StockError::Timeout(self.request_timeout)),
        }
    }
}
