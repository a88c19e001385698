//! Tools that the analysis model can call
//!
//! A [`Tool`] is a named async function with a JSON-schema input. Tools are
//! collected into a [`ToolRegistry`] at startup and handed to the agent loop.
//! The only tool shipped here is [`TavilySearchTool`], the web search the
//! analyst uses to check recent news and financial data.

pub mod error;
pub mod registry;
pub mod search;
pub mod tool;

pub use error::{Result, ToolError};
pub use registry::ToolRegistry;
pub use search::{TavilyConfig, TavilySearchTool};
pub use tool::Tool;
