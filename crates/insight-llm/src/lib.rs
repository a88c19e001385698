//! LLM provider abstraction layer for chart-insight
//!
//! This crate provides provider-agnostic types for talking to a vision-capable
//! language model:
//!
//! - Message types with text, image and tool blocks
//! - Completion request/response types
//! - Tool definitions for function calling
//! - The [`LLMProvider`] trait
//! - An OpenAI-compatible chat-completions provider (behind the `openai` feature),
//!   which also serves Gemini through its OpenAI-compatible endpoint

pub mod completion;
pub mod error;
pub mod messages;
pub mod provider;
pub mod tools;

#[cfg(feature = "openai")]
pub mod providers;

pub use completion::{CompletionRequest, CompletionResponse, StopReason, TokenUsage};
pub use error::{LLMError, Result};
pub use messages::{ContentBlock, ImageSource, Message, MessageContent, Role};
pub use provider::LLMProvider;
pub use tools::ToolDefinition;
