//! Error types for chart analysis

use insight_llm::LLMError;
use insight_utils::EnvError;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by the data, chart, and analysis stages
///
/// Inside a run these are converted per ticker into a warning or an error
/// result; only [`StockError::ConfigError`] is meant to stop the process.
#[derive(Debug, Error)]
pub enum StockError {
    /// Provider returned nothing for the ticker
    #[error("Data not available for {symbol}: {reason}")]
    DataUnavailable { symbol: String, reason: String },

    /// Market data provider failed
    #[error("Market data error: {0}")]
    Provider(String),

    #[error("Technical indicator error: {0}")]
    Indicator(String),

    /// Chart could not be rendered
    #[error("Chart rendering error: {0}")]
    Chart(String),

    /// Analysis agent call failed
    #[error("Analysis request failed: {0}")]
    Transport(String),

    /// Analysis agent did not answer in time
    #[error("Analysis request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Prompt template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for chart analysis operations
pub type Result<T> = std::result::Result<T, StockError>;

impl From<LLMError> for StockError {
    fn from(err: LLMError) -> Self {
        match err {
            LLMError::Timeout(after) => StockError::Timeout(after),
            LLMError::ConfigurationError(msg) => StockError::ConfigError(msg),
            other => StockError::Transport(other.to_string()),
        }
    }
}

impl From<EnvError> for StockError {
    fn from(err: EnvError) -> Self {
        StockError::ConfigError(err.to_string())
    }
}

impl StockError {
    /// Whether the error must abort the process rather than a single ticker
    pub fn is_fatal(&self) -> bool {
        matches!(self, StockError::ConfigError(_))
    }
}
