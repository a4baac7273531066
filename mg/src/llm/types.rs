//! Chat-completion request and reply types

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    /// Create a system message
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: text.into(),
        }
    }

    /// Create a user message
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: text.into(),
        }
    }
}

/// Body sent to the chat-completion endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f64,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub stream: bool,
}

/// Fixed generation parameters applied to every request
#[derive(Debug, Clone, PartialEq)]
pub struct ChatSettings {
    pub system_prompt: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub stream: bool,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            system_prompt: "You are a senior Databricks PySpark engineer.".to_string(),
            max_tokens: 4000,
            temperature: 0.05,
            stream: false,
        }
    }
}

impl ChatSettings {
    /// Build the request for a single prompt
    pub fn request(&self, prompt: &str, model_name: &str) -> ChatRequest {
        debug!(%model_name, prompt_len = prompt.len(), "ChatSettings::request: called");
        ChatRequest {
            model: model_name.to_string(),
            messages: vec![ChatMessage::system(&self.system_prompt), ChatMessage::user(prompt)],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            stream: self.stream,
        }
    }
}

/// A raw reply from the endpoint, before any content is trusted
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    /// A fully buffered JSON body
    Body(Value),
    /// Incremental chunks, in arrival order
    Chunks(Vec<ReplyChunk>),
    /// A body that was neither JSON nor an event stream
    Opaque(String),
}

/// One incremental delivery of a streamed reply
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyChunk {
    /// A chunk that decoded as JSON
    Record(Value),
    /// A chunk kept as received
    Raw(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let request = ChatSettings::default().request("Generate it", "databricks-claude-sonnet-4-5");
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(body["model"], "databricks-claude-sonnet-4-5");
        assert_eq!(body["max_tokens"], 4000);
        assert_eq!(body["temperature"], 0.05);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "Generate it");
        assert!(body.get("stream").is_none());
    }

    #[test]
    fn test_stream_flag_serialized_when_set() {
        let settings = ChatSettings {
            stream: true,
            ..ChatSettings::default()
        };
        let body = serde_json::to_value(settings.request("p", "m")).unwrap();
        assert_eq!(body["stream"], true);
    }
}
