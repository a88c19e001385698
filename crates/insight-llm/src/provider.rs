//! LLM provider trait definition

use crate::{CompletionRequest, CompletionResponse, Result};
use async_trait::async_trait;

/// A chat model that can answer a [`CompletionRequest`]
///
/// Providers are constructed once at startup and shared behind an `Arc`.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate one completion for the given conversation
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Provider name used in logs (e.g. "openai-compatible")
    fn name(&self) -> &str;
}
