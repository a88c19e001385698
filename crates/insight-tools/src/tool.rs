//! Tool trait definition

use crate::Result;
use async_trait::async_trait;
use serde_json::Value;

/// A function the model can call during analysis
#[async_trait]
pub trait Tool: Send + Sync {
    /// Run the tool with JSON input matching [`Tool::input_schema`]
    async fn execute(&self, params: Value) -> Result<Value>;

    /// Unique name, as the model will refer to it
    fn name(&self) -> &str;

    /// Tells the model when the tool is useful
    fn description(&self) -> &str;

    /// JSON schema of the input object
    fn input_schema(&self) -> Value;
}
