//! Message types for LLM communication
//!
//! Messages carry either plain text or a list of content blocks. Blocks cover
//! the multi-modal case (a prompt plus a chart image) and the tool-use round
//! trip (assistant asks for a tool, user answers with its result).

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// Where an image comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImageSource {
    /// Remote image
    Url { url: String },
    /// Inline image, already base64-encoded
    Base64 { media_type: String, data: String },
}

impl ImageSource {
    /// Encode raw PNG bytes for transport
    pub fn png(bytes: &[u8]) -> Self {
        Self::Base64 {
            media_type: "image/png".to_string(),
            data: STANDARD.encode(bytes),
        }
    }

    /// Render as a URL, using a `data:` URL for inline images
    pub fn to_url(&self) -> String {
        match self {
            Self::Url { url } => url.clone(),
            Self::Base64 { media_type, data } => format!("data:{media_type};base64,{data}"),
        }
    }
}

/// Content block in a message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },

    Image {
        source: ImageSource,
    },

    /// Tool call requested by the assistant
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },

    /// Result of a tool call, sent back as a user turn
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
    },
}

/// Message content: either simple text or structured blocks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

/// A message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<MessageContent>,
}

/// Borrowed view of a tool call inside an assistant message
#[derive(Debug, Clone, Copy)]
pub struct ToolCall<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub input: &'a Value,
}

impl Message {
    fn with_text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(MessageContent::Text(text.into())),
        }
    }

    /// Create a user message with text
    pub fn user(text: impl Into<String>) -> Self {
        Self::with_text(Role::User, text)
    }

    /// Create an assistant message with text
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::with_text(Role::Assistant, text)
    }

    /// Create a user message holding a prompt followed by one image
    pub fn user_with_image(text: impl Into<String>, image: ImageSource) -> Self {
        Self {
            role: Role::User,
            content: Some(MessageContent::Blocks(vec![
                ContentBlock::Text { text: text.into() },
                ContentBlock::Image { source: image },
            ])),
        }
    }

    /// Create a user message answering a tool call
    pub fn tool_result(tool_use_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::tool_block(tool_use_id.into(), content.into(), None)
    }

    /// Create a user message reporting a failed tool call
    pub fn tool_error(tool_use_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self::tool_block(tool_use_id.into(), error.into(), Some(true))
    }

    fn tool_block(tool_use_id: String, content: String, is_error: Option<bool>) -> Self {
        Self {
            role: Role::User,
            content: Some(MessageContent::Blocks(vec![ContentBlock::ToolResult {
                tool_use_id,
                content,
                is_error,
            }])),
        }
    }

    /// All text in the message, blocks joined with newlines
    pub fn text(&self) -> Option<String> {
        match &self.content {
            Some(MessageContent::Text(s)) => Some(s.clone()),
            Some(MessageContent::Blocks(blocks)) => {
                let parts: Vec<&str> = blocks
                    .iter()
                    .filter_map(|b| match b {
                        ContentBlock::Text { text } => Some(text.as_str()),
                        _ => None,
                    })
                    .collect();
                if parts.is_empty() {
                    None
                } else {
                    Some(parts.join("\n"))
                }
            }
            None => None,
        }
    }

    /// Tool calls requested in this message
    pub fn tool_calls(&self) -> Vec<ToolCall<'_>> {
        match &self.content {
            Some(MessageContent::Blocks(blocks)) => blocks
                .iter()
                .filter_map(|b| match b {
                    ContentBlock::ToolUse { id, name, input } => Some(ToolCall { id, name, input }),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_png_is_base64_data_url() {
        let source = ImageSource::png(&[0x89, b'P', b'N', b'G']);
        assert_eq!(source.to_url(), "data:image/png;base64,iVBORw==");
    }

    #[test]
    fn test_user_with_image() {
        let msg = Message::user_with_image("look", ImageSource::png(b"x"));
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.text().as_deref(), Some("look"));
        assert!(msg.tool_calls().is_empty());
    }

    #[test]
    fn test_text_joins_blocks() {
        let msg = Message {
            role: Role::Assistant,
            content: Some(MessageContent::Blocks(vec![
                ContentBlock::Text { text: "a".into() },
                ContentBlock::ToolUse {
                    id: "call_1".into(),
                    name: "web_search".into(),
                    input: json!({"query": "AAPL"}),
                },
                ContentBlock::Text { text: "b".into() },
            ])),
        };
        assert_eq!(msg.text().as_deref(), Some("a\nb"));

        let calls = msg.tool_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "web_search");
        assert_eq!(calls[0].input["query"], "AAPL");
    }

    #[test]
    fn test_tool_error_flag() {
        let msg = Message::tool_error("call_1", "boom");
        match msg.content {
            Some(MessageContent::Blocks(blocks)) => match &blocks[0] {
                ContentBlock::ToolResult { is_error, .. } => assert_eq!(*is_error, Some(true)),
                other => panic!("unexpected block {other:?}"),
            },
            other => panic!("unexpected content {other:?}"),
        }
    }
}
