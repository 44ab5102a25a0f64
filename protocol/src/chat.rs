//! `/v1/chat/completions` request, response and streaming-chunk shapes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::common::{StreamOptions, StringOrArray, Usage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub name: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            name: None,
        }
    }
}

/// The only request shape the gateway accepts on its single POST endpoint.
///
/// Non-streaming requests (`stream` absent or `false`) are rejected by the
/// HTTP layer before this type is even fully used — `stream` must be `true`.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub stream: bool,
    pub stream_options: Option<StreamOptions>,
    pub frequency_penalty: Option<f32>,
    pub presence_penalty: Option<f32>,
    /// Anything else the caller sent; forwarded upstream unchanged.
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl ChatCompletionRequest {
    /// The text of the latest `user` message, or empty if there is none.
    pub fn latest_user_message(&self) -> &str {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or("")
    }

    /// Replace all leading `system` messages with a single one at index 0,
    /// preserving the relative order of every other message.
    pub fn with_unified_system_message(mut self, content: String) -> Self {
        self.messages.retain(|m| m.role != Role::System);
        self.messages.insert(0, ChatMessage::system(content));
        self
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatChoice {
    pub index: u32,
    pub message: ChatMessage,
    pub finish_reason: Option<String>,
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatCompletionResponse {
    pub id: String,
    pub object: String,
    pub created: u64,
    pub model: String,
    pub choices: Vec<ChatChoice>,
    pub usage: Option<Usage>,
}

/// A single streamed delta — mirrors a subset of `ChatMessage`'s fields,
/// all optional since a delta may carry only a role, only content, or
/// neither (heartbeat/finish chunk).
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ChatChoiceDelta {
    pub role: Option<Role>,
    pub content: Option<String>,
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatChoiceStream {
    pub index: u32,
    pub delta: ChatChoiceDelta,
    pub finish_reason: Option<String>,
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatCompletionChunk {
    pub id: String,
    pub object: String,
    pub created: u64,
    pub model: String,
    pub choices: Vec<ChatChoiceStream>,
    pub usage: Option<Usage>,
}

impl ChatCompletionChunk {
    /// Build a synthetic content-delta chunk — used by the reasoning
    /// pipeline to emit progress before any upstream token exists.
    pub fn content_delta(id: &str, model: &str, created: u64, content: impl Into<String>) -> Self {
        Self {
            id: id.to_string(),
            object: "chat.completion.chunk".to_string(),
            created,
            model: model.to_string(),
            choices: vec![ChatChoiceStream {
                index: 0,
                delta: ChatChoiceDelta {
                    role: None,
                    content: Some(content.into()),
                },
                finish_reason: None,
            }],
            usage: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unified_system_message_replaces_all_leading_system_messages() {
        let req = ChatCompletionRequest {
            model: "gpt-test".into(),
            messages: vec![
                ChatMessage::system("old-a"),
                ChatMessage::system("old-b"),
                ChatMessage {
                    role: Role::User,
                    content: "hello".into(),
                    name: None,
                },
            ],
            temperature: None,
            top_p: None,
            max_tokens: None,
            stream: true,
            stream_options: None,
            frequency_penalty: None,
            presence_penalty: None,
            other: Map::new(),
        };

        let augmented = req.with_unified_system_message("tool context".into());
        assert_eq!(augmented.messages.len(), 2);
        assert_eq!(augmented.messages[0].role, Role::System);
        assert_eq!(augmented.messages[0].content, "tool context");
        assert_eq!(augmented.messages[1].content, "hello");
    }

    #[test]
    fn latest_user_message_skips_trailing_non_user_messages() {
        let req = ChatCompletionRequest {
            model: "m".into(),
            messages: vec![
                ChatMessage {
                    role: Role::User,
                    content: "first".into(),
                    name: None,
                },
                ChatMessage {
                    role: Role::Assistant,
                    content: "reply".into(),
                    name: None,
                },
                ChatMessage {
                    role: Role::User,
                    content: "second".into(),
                    name: None,
                },
            ],
            temperature: None,
            top_p: None,
            max_tokens: None,
            stream: true,
            stream_options: None,
            frequency_penalty: None,
            presence_penalty: None,
            other: Map::new(),
        };
        assert_eq!(req.latest_user_message(), "second");
    }
}
