//! Analysis outcomes and reply parsing

use crate::error::StockError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Justification used when a structured reply cannot be parsed
pub const PARSE_FALLBACK: &str = "Could not parse AI response.";

/// Shown when a structured reply omits its justification
pub const NO_JUSTIFICATION: &str = "No justification provided.";

/// Recommended position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Action {
    StrongBuy,
    Buy,
    Hold,
    Sell,
    StrongSell,
    /// The analysis could not be produced
    Error,
}

impl Action {
    pub fn label(&self) -> &'static str {
        match self {
            Action::StrongBuy => "Strong Buy",
            Action::Buy => "Buy",
            Action::Hold => "Hold",
            Action::Sell => "Sell",
            Action::StrongSell => "Strong Sell",
            Action::Error => "Error",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Action {
    type Err = ParseError;

    /// Case-insensitive; spaces, underscores and hyphens are ignored
    fn from_str(s: &str) -> Result<Self, ParseError> {
        let key: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .collect::<String>()
            .to_ascii_lowercase();

        match key.as_str() {
            "strongbuy" => Ok(Action::StrongBuy),
            "buy" => Ok(Action::Buy),
            "hold" => Ok(Action::Hold),
            "sell" => Ok(Action::Sell),
            "strongsell" => Ok(Action::StrongSell),
            "error" => Ok(Action::Error),
            _ => Err(ParseError::UnknownAction(s.to_string())),
        }
    }
}

impl TryFrom<String> for Action {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, ParseError> {
        value.parse()
    }
}

impl From<Action> for String {
    fn from(action: Action) -> Self {
        action.label().to_string()
    }
}

/// Why a structured reply was rejected
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("reply is empty")]
    Empty,

    #[error("reply is not a valid recommendation object: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown action '{0}'")]
    UnknownAction(String),
}

/// A parsed structured reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub action: Action,
    #[serde(default)]
    pub justification: String,
}

impl Recommendation {
    pub fn new(action: Action, justification: impl Into<String>) -> Self {
        Self {
            action,
            justification: justification.into(),
        }
    }

    /// Parse a JSON object reply, tolerating a surrounding code fence
    pub fn parse(content: &str) -> Result<Self, ParseError> {
        let body = strip_code_fence(content);
        if body.is_empty() {
            return Err(ParseError::Empty);
        }
        Ok(serde_json::from_str(body)?)
    }

    /// Justification text, with a placeholder when the model left it empty
    pub fn justification_or_default(&self) -> &str {
        if self.justification.trim().is_empty() {
            NO_JUSTIFICATION
        } else {
            &self.justification
        }
    }
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    // An info string only ends at a newline; a one-line fence may still say "json"
    let body = match rest.split_once('\n') {
        Some((info, body)) if !info.contains('{') => body,
        _ => {
            let rest = rest.trim_start();
            rest.strip_prefix("json").unwrap_or(rest)
        }
    };
    body.trim()
}

/// How the agent is asked to answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseMode {
    /// A JSON object with `action` and `justification`
    #[default]
    Structured,
    /// Markdown prose shown verbatim
    FreeText,
}

impl fmt::Display for ResponseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseMode::Structured => f.write_str("structured"),
            ResponseMode::FreeText => f.write_str("free-text"),
        }
    }
}

impl FromStr for ResponseMode {
    type Err = StockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "structured" | "json" => Ok(ResponseMode::Structured),
            "free-text" | "freetext" | "free_text" | "text" | "markdown" => Ok(ResponseMode::FreeText),
            other => Err(StockError::ConfigError(format!(
                "unknown response mode '{other}' (expected structured or free-text)"
            ))),
        }
    }
}

/// Outcome of analysing one ticker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum AnalysisResult {
    Structured(Recommendation),
    FreeText { markdown: String },
}

impl AnalysisResult {
    /// Result reporting that an analysis step failed
    pub fn error(justification: impl Into<String>) -> Self {
        AnalysisResult::Structured(Recommendation::new(Action::Error, justification))
    }

    /// The fixed result for an unparseable structured reply
    pub fn parse_fallback() -> Self {
        Self::error(PARSE_FALLBACK)
    }

    /// Result for a parsed structured reply; any [`ParseError`] becomes
    /// [`AnalysisResult::parse_fallback`]
    pub fn from_structured_reply(parsed: Result<Recommendation, ParseError>) -> Self {
        parsed.map_or_else(|_| Self::parse_fallback(), AnalysisResult::Structured)
    }

    pub fn free_text(markdown: impl Into<String>) -> Self {
        AnalysisResult::FreeText {
            markdown: markdown.into(),
        }
    }

    pub fn action(&self) -> Option<Action> {
        match self {
            AnalysisResult::Structured(r) => Some(r.action),
            AnalysisResult::FreeText { .. } => None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.action() == Some(Action::Error)
    }

    /// Value for the summary table's recommendation column
    pub fn summary_label(&self) -> &str {
        self.action().map_or("N/A", |a| a.label())
    }

    /// Detail text shown under the chart
    pub fn detail(&self) -> &str {
        match self {
            AnalysisResult::Structured(r) => r.justification_or_default(),
            AnalysisResult::FreeText { markdown } => markdown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_reply() {
        let parsed = Recommendation::parse(r#"{"action": "Buy", "justification": "Uptrend"}"#);
        let result = AnalysisResult::from_structured_reply(parsed);
        assert_eq!(
            result,
            AnalysisResult::Structured(Recommendation::new(Action::Buy, "Uptrend"))
        );
    }

    #[test]
    fn test_serialized_recommendation_parses_back() {
        let rec = Recommendation::new(Action::Sell, "Lower lows under the 20-day SMA");
        let json = serde_json::to_string(&rec).unwrap();
        assert_eq!(Recommendation::parse(&json).unwrap(), rec);
    }

    #[test]
    fn test_parse_fenced_reply() {
        let reply = "```json\n{\"action\": \"strong_sell\", \"justification\": \"Breakdown\"}\n```";
        let rec = Recommendation::parse(reply).unwrap();
        assert_eq!(rec.action, Action::StrongSell);
        assert_eq!(rec.justification, "Breakdown");

        for reply in [
            "```json {\"action\": \"Buy\", \"justification\": \"x\"}```",
            "```{\"action\": \"Buy\", \"justification\": \"x\"}```",
            "```\n{\"action\": \"Buy\", \"justification\": \"x\"}\n```",
            "```{\"action\": \"Buy\",\n\"justification\": \"x\"}\n```",
        ] {
            let rec = Recommendation::parse(reply).unwrap();
            assert_eq!(rec, Recommendation::new(Action::Buy, "x"), "reply {reply:?}");
        }
    }

    #[test]
    fn test_unparseable_reply_falls_back() {
        for reply in ["", "I think you should buy.", r#"{"action": "Moon"}"#, "{\"action\": \"Buy\""] {
            let result = AnalysisResult::from_structured_reply(Recommendation::parse(reply));
            assert_eq!(
                result,
                AnalysisResult::Structured(Recommendation::new(Action::Error, PARSE_FALLBACK)),
                "reply {reply:?}"
            );
        }
    }

    #[test]
    fn test_missing_justification() {
        let rec = Recommendation::parse(r#"{"action": "Hold"}"#).unwrap();
        assert_eq!(rec.justification_or_default(), NO_JUSTIFICATION);
        assert_eq!(AnalysisResult::Structured(rec).detail(), NO_JUSTIFICATION);
    }

    #[test]
    fn test_action_spellings() {
        for s in ["Strong Buy", "StrongBuy", "strong_buy", "STRONG-BUY"] {
            assert_eq!(s.parse::<Action>().unwrap(), Action::StrongBuy);
        }
        assert!("Accumulate".parse::<Action>().is_err());
    }

    #[test]
    fn test_action_serializes_as_label() {
        let json = serde_json::to_string(&Recommendation::new(Action::StrongSell, "x")).unwrap();
        assert_eq!(json, r#"{"action":"Strong Sell","justification":"x"}"#);
    }

    #[test]
    fn test_free_text_summary() {
        let result = AnalysisResult::free_text("## Outlook\nSideways.");
        assert_eq!(result.summary_label(), "N/A");
        assert_eq!(result.detail(), "## Outlook\nSideways.");
        assert!(!result.is_error());
    }

    #[test]
    fn test_response_mode_parse() {
        assert_eq!("structured".parse::<ResponseMode>().unwrap(), ResponseMode::Structured);
        assert_eq!("Free-Text".parse::<ResponseMode>().unwrap(), ResponseMode::FreeText);
        assert!("yaml".parse::<ResponseMode>().is_err());
    }
}
