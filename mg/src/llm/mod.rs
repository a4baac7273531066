//! Model client module
//!
//! Sends generation prompts to a hosted chat-completion endpoint and turns
//! whatever shape the reply takes into plain text.

mod client;
mod error;
mod normalize;
mod openai;
mod types;

#[cfg(test)]
pub use client::mock;
pub use client::{ChatEndpoint, ModelClient};
pub use error::LlmError;
pub use normalize::{ResponseShape, UNRESOLVED_STREAM_MARKERS, is_unresolved_handle, normalize};
pub use openai::{HttpChatEndpoint, parse_sse_line};
pub use types::{ChatMessage, ChatRequest, ChatSettings, ModelReply, ReplyChunk, Role};

use crate::config::ResolvedLlmConfig;

impl From<&ResolvedLlmConfig> for ChatSettings {
    fn from(config: &ResolvedLlmConfig) -> Self {
        Self {
            system_prompt: config.system_prompt.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            stream: config.stream,
        }
    }
}

/// Build a model client talking HTTP to the configured endpoint
pub fn create_client(config: &ResolvedLlmConfig) -> Result<ModelClient, LlmError> {
    tracing::debug!(model = %config.model, "create_client: called");
    let endpoint = HttpChatEndpoint::from_config(config)?;
    Ok(ModelClient::new(std::sync::Arc::new(endpoint), ChatSettings::from(config)))
}
