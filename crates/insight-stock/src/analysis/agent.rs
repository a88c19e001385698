//! Vision agent that reads a chart and answers with an analysis

use crate::error::{Result, StockError};
use async_trait::async_trait;
use insight_llm::{CompletionRequest, ImageSource, LLMProvider, Message, StopReason, ToolDefinition};
use insight_tools::ToolRegistry;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Final text produced by an agent run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentReply {
    pub content: String,
}

/// Anything that can turn a prompt plus chart image into a reply
#[async_trait]
pub trait AnalysisAgent: Send + Sync {
    async fn run(&self, prompt: &str, image: &[u8]) -> Result<AgentReply>;
}

/// Model parameters for [`LlmAnalysisAgent`]
#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub model: String,
    pub max_tokens: usize,
    pub temperature: f32,
    /// Model turns that may request tools before a final answer is forced
    pub max_tool_iterations: usize,
}

impl AgentSettings {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            max_tokens: 2048,
            temperature: 0.2,
            max_tool_iterations: 5,
        }
    }
}

/// Agent backed by an [`LLMProvider`] with an optional tool set
pub struct LlmAnalysisAgent {
    provider: Arc<dyn LLMProvider>,
    tools: ToolRegistry,
    settings: AgentSettings,
    system_prompt: String,
}

impl LlmAnalysisAgent {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        tools: ToolRegistry,
        settings: AgentSettings,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            tools,
            settings,
            system_prompt: system_prompt.into(),
        }
    }

    fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|tool| ToolDefinition::new(tool.name(), tool.description(), tool.input_schema()))
            .collect()
    }

    /// Run every tool call in `message`, one result message per call
    async fn execute_tools(&self, message: &Message) -> Vec<Message> {
        let mut results = Vec::new();
        for call in message.tool_calls() {
            let input_preview: String = call.input.to_string().chars().take(200).collect();
            info!(tool_name = call.name, tool_id = call.id, input_preview = %input_preview, "Executing tool");

            match self.tools.execute(call.name, call.input.clone()).await {
                Ok(output) => {
                    let text = output.to_string();
                    debug!(tool_name = call.name, result_length = text.len(), "Tool succeeded");
                    results.push(Message::tool_result(call.id, text));
                }
                Err(e) => {
                    warn!(tool_name = call.name, error = %e, "Tool failed");
                    results.push(Message::tool_error(call.id, format!("Error: {e}")));
                }
            }
        }
        results
    }
}

#[async_trait]
impl AnalysisAgent for LlmAnalysisAgent {
    #[instrument(skip_all, fields(model = %self.settings.model, image_bytes = image.len()))]
    async fn run(&self, prompt: &str, image: &[u8]) -> Result<AgentReply> {
        let tools = self.tool_definitions();
        let mut conversation = vec![Message::user_with_image(prompt, ImageSource::png(image))];

        for round in 0..=self.settings.max_tool_iterations {
            // The last round withholds tools so the model has to answer
            let offer_tools = round < self.settings.max_tool_iterations && !tools.is_empty();
            let mut builder = CompletionRequest::builder(&self.settings.model)
                .messages(conversation.clone())
                .system(self.system_prompt.clone())
                .max_tokens(self.settings.max_tokens)
                .temperature(self.settings.temperature);
            if offer_tools {
                builder = builder.tools(tools.clone());
            }

            let response = self.provider.complete(builder.build()).await?;
            info!(
                round,
                stop_reason = ?response.stop_reason,
                input_tokens = response.usage.input_tokens,
                output_tokens = response.usage.output_tokens,
                "Model responded"
            );

            match response.stop_reason {
                StopReason::ToolUse if offer_tools => {
                    let results = self.execute_tools(&response.message).await;
                    conversation.push(response.message);
                    conversation.extend(results);
                }
                StopReason::ToolUse => {
                    return Err(StockError::Transport(
                        "model kept requesting tools after the tool budget was spent".into(),
                    ));
                }
                StopReason::EndTurn | StopReason::MaxTokens => {
                    if response.stop_reason == StopReason::MaxTokens {
                        warn!("Reply truncated at the token limit");
                    }
                    let content = response.message.text().unwrap_or_default();
                    return Ok(AgentReply { content });
                }
            }
        }

        Err(StockError::Transport(format!(
            "no answer after {} tool rounds",
            self.settings.max_tool_iterations
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insight_llm::{CompletionResponse, ContentBlock, MessageContent, Role, TokenUsage};
    use insight_tools::Tool;
    use serde_json::{Value, json};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned responses and records every request
    struct ScriptedProvider {
        responses: Mutex<VecDeque<CompletionResponse>>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedProvider {
        fn new(responses: Vec<CompletionResponse>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<CompletionRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LLMProvider for ScriptedProvider {
        async fn complete(&self, request: CompletionRequest) -> insight_llm::Result<CompletionResponse> {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| insight_llm::LLMError::UnexpectedResponse("script exhausted".into()))
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    struct EchoSearch;

    #[async_trait]
    impl Tool for EchoSearch {
        async fn execute(&self, params: Value) -> insight_tools::Result<Value> {
            Ok(json!({ "answer": format!("results for {}", params["query"]) }))
        }

        fn name(&self) -> &str {
            "web_search"
        }

        fn description(&self) -> &str {
            "Search the web"
        }

        fn input_schema(&self) -> Value {
            json!({ "type": "object", "properties": { "query": { "type": "string" } } })
        }
    }

    fn text_response(text: &str) -> CompletionResponse {
        CompletionResponse {
            message: Message::assistant(text),
            stop_reason: StopReason::EndTurn,
            usage: TokenUsage::default(),
        }
    }

    fn tool_response(query: &str) -> CompletionResponse {
        CompletionResponse {
            message: Message {
                role: Role::Assistant,
                content: Some(MessageContent::Blocks(vec![ContentBlock::ToolUse {
                    id: "call_1".into(),
                    name: "web_search".into(),
                    input: json!({ "query": query }),
                }])),
            },
            stop_reason: StopReason::ToolUse,
            usage: TokenUsage::default(),
        }
    }

    fn agent(provider: Arc<ScriptedProvider>, max_tool_iterations: usize) -> LlmAnalysisAgent {
        let mut settings = AgentSettings::new("gemini-2.0-flash");
        settings.max_tool_iterations = max_tool_iterations;
        let tools = ToolRegistry::new().with_tool(Arc::new(EchoSearch));
        LlmAnalysisAgent::new(provider, tools, settings, "You are an analyst.")
    }

    #[tokio::test]
    async fn test_single_turn_sends_image() {
        let provider = ScriptedProvider::new(vec![text_response(r#"{"action":"Hold"}"#)]);
        let reply = agent(provider.clone(), 3).run("Analyze AAPL", &[1, 2, 3]).await.unwrap();

        assert_eq!(reply.content, r#"{"action":"Hold"}"#);
        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].system.as_deref(), Some("You are an analyst."));
        assert_eq!(requests[0].tools.as_ref().map(Vec::len), Some(1));

        let Some(MessageContent::Blocks(blocks)) = &requests[0].messages[0].content else {
            panic!("expected a block message");
        };
        assert!(matches!(&blocks[0], ContentBlock::Text { text } if text == "Analyze AAPL"));
        assert!(matches!(&blocks[1], ContentBlock::Image { .. }));
    }

    #[tokio::test]
    async fn test_tool_round_trip() {
        let provider = ScriptedProvider::new(vec![tool_response("AAPL earnings"), text_response("Buy")]);
        let reply = agent(provider.clone(), 3).run("Analyze AAPL", &[0]).await.unwrap();

        assert_eq!(reply.content, "Buy");
        let requests = provider.requests();
        assert_eq!(requests.len(), 2);
        // image prompt, assistant tool call, tool result
        assert_eq!(requests[1].messages.len(), 3);
        let Some(MessageContent::Blocks(blocks)) = &requests[1].messages[2].content else {
            panic!("expected a tool result block");
        };
        assert!(matches!(
            &blocks[0],
            ContentBlock::ToolResult { tool_use_id, content, .. }
                if tool_use_id == "call_1" && content.contains("AAPL earnings")
        ));
    }

    #[tokio::test]
    async fn test_last_round_withholds_tools() {
        let provider = ScriptedProvider::new(vec![tool_response("news"), text_response("Sell")]);
        let reply = agent(provider.clone(), 1).run("Analyze MSFT", &[0]).await.unwrap();

        assert_eq!(reply.content, "Sell");
        let requests = provider.requests();
        assert!(requests[0].tools.is_some());
        assert!(requests[1].tools.is_none());
    }

    #[tokio::test]
    async fn test_tool_request_without_budget_fails() {
        let provider = ScriptedProvider::new(vec![tool_response("news")]);
        let err = agent(provider, 0).run("Analyze MSFT", &[0]).await.unwrap_err();
        assert!(matches!(err, StockError::Transport(_)));
    }

    #[tokio::test]
    async fn test_provider_error_maps_to_transport() {
        let provider = ScriptedProvider::new(Vec::new());
        let err = agent(provider, 1).run("Analyze GOOG", &[0]).await.unwrap_err();
        assert!(matches!(err, StockError::Transport(msg) if msg.contains("script exhausted")));
    }
}
