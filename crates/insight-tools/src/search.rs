//! Tavily web search tool

use crate::{Result, Tool, ToolError};
use async_trait::async_trait;
use insight_utils::Secret;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, instrument};

const DEFAULT_ENDPOINT: &str = "https://api.tavily.com";
const MAX_RESULTS_CAP: usize = 10;

/// Configuration for [`TavilySearchTool`]
#[derive(Debug, Clone)]
pub struct TavilyConfig {
    pub api_key: Secret,
    pub endpoint: String,
    pub max_results: usize,
    pub timeout: Duration,
}

impl TavilyConfig {
    pub fn new(api_key: impl Into<Secret>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            max_results: 5,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results.clamp(1, MAX_RESULTS_CAP);
        self
    }
}

/// Lets the analyst validate chart readings against current news and data
pub struct TavilySearchTool {
    client: Client,
    config: TavilyConfig,
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    query: String,
    #[serde(default)]
    max_results: Option<usize>,
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    max_results: usize,
    search_depth: &'static str,
    include_answer: bool,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SearchHit {
    title: String,
    url: String,
    #[serde(default)]
    content: String,
}

impl TavilySearchTool {
    pub fn new(config: TavilyConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    #[instrument(skip(self))]
    async fn search(&self, query: &str, max_results: usize) -> Result<Value> {
        let body = SearchRequest {
            query,
            max_results,
            search_depth: "basic",
            include_answer: true,
        };

        let response = self
            .client
            .post(format!("{}/search", self.config.endpoint))
            .bearer_auth(self.config.api_key.expose())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::Upstream {
                service: "Tavily",
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let parsed: SearchResponse = response.json().await?;
        debug!(hits = parsed.results.len(), "Web search completed");

        Ok(json!({
            "query": query,
            "answer": parsed.answer,
            "results": parsed.results,
        }))
    }
}

#[async_trait]
impl Tool for TavilySearchTool {
    async fn execute(&self, params: Value) -> Result<Value> {
        let params: SearchParams = serde_json::from_value(params)
            .map_err(|e| ToolError::InvalidParameters(e.to_string()))?;

        let query = params.query.trim();
        if query.is_empty() {
            return Err(ToolError::InvalidParameters(
                "query must not be empty".to_string(),
            ));
        }

        let max_results = params
            .max_results
            .unwrap_or(self.config.max_results)
            .clamp(1, MAX_RESULTS_CAP);
        self.search(query, max_results).await
    }

    fn name(&self) -> &'static str {
        "web_search"
    }

    fn description(&self) -> &'static str {
        "Search the web for recent news, earnings, and financial data about a company or \
         market. Use it to validate key facts before giving a recommendation."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search query, e.g. 'AAPL latest earnings guidance'"
                },
                "max_results": {
                    "type": "integer",
                    "description": "Number of results to return (1-10)",
                    "default": 5
                }
            },
            "required": ["query"]
        })
    }
}
