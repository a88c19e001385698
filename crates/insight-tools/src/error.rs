//! Error types for tool execution

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ToolError>;

#[derive(Debug, Error)]
pub enum ToolError {
    /// Input did not match the tool's schema
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// No tool registered under this name
    #[error("Tool not found: {0}")]
    NotFound(String),

    /// The remote service answered with an error
    #[error("{service} returned HTTP {status}: {body}")]
    Upstream {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
