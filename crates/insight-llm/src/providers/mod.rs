//! Concrete LLM provider implementations

pub mod chat_completions;

pub use chat_completions::{ChatCompletionsConfig, ChatCompletionsProvider};
