//! Chart analysis through a vision-capable agent

pub mod agent;
pub mod client;
pub mod result;

pub use agent::{AgentReply, AgentSettings, AnalysisAgent, LlmAnalysisAgent};
pub use client::{AnalysisClient, AnalysisRequest, AnalysisStage};
pub use result::{
    Action, AnalysisResult, NO_JUSTIFICATION, PARSE_FALLBACK, ParseError, Recommendation, ResponseMode,
};
