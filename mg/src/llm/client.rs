//! Model client
//!
//! [`ChatEndpoint`] is the transport seam; [`ModelClient`] adds the
//! credential check, the caller timeout and response normalization on top.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::{ChatRequest, ChatSettings, LlmError, ModelReply, normalize};

/// A chat-completion endpoint
///
/// Implementations must be stateless between calls so that concurrent
/// generations never share mutable state.
#[async_trait]
pub trait ChatEndpoint: Send + Sync {
    /// Send one request and return the reply in whatever shape it arrived
    async fn send(&self, request: &ChatRequest, token: &str) -> Result<ModelReply, LlmError>;
}

/// Sends prompts to a [`ChatEndpoint`] and returns plain text
///
/// No retries are performed: a failed or unusable reply surfaces as an error
/// and the caller decides whether to invoke again.
#[derive(Clone)]
pub struct ModelClient {
    endpoint: Arc<dyn ChatEndpoint>,
    settings: ChatSettings,
    timeout: Option<Duration>,
}

impl ModelClient {
    pub fn new(endpoint: Arc<dyn ChatEndpoint>, settings: ChatSettings) -> Self {
        debug!(?settings, "ModelClient::new: called");
        Self {
            endpoint,
            settings,
            timeout: None,
        }
    }

    /// Bound every call by `timeout`; expiry aborts the in-flight request
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        debug!(?timeout, "ModelClient::with_timeout: called");
        self.timeout = timeout;
        self
    }

    pub fn settings(&self) -> &ChatSettings {
        &self.settings
    }

    /// Send `prompt` to `model_name` and extract the reply text
    pub async fn invoke(&self, prompt: &str, token: &str, model_name: &str) -> Result<String, LlmError> {
        debug!(%model_name, prompt_len = prompt.len(), "ModelClient::invoke: called");
        if token.trim().is_empty() {
            debug!("ModelClient::invoke: empty token");
            return Err(LlmError::CredentialMissing);
        }

        let request = self.settings.request(prompt, model_name);
        let reply = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, self.endpoint.send(&request, token)).await {
                Ok(result) => result?,
                Err(_) => {
                    warn!(?limit, "ModelClient::invoke: timed out");
                    return Err(LlmError::Timeout(limit));
                }
            },
            None => self.endpoint.send(&request, token).await?,
        };

        let text = normalize(&reply)?;
        info!("Model {} returned {} chars", model_name, text.chars().count());
        Ok(text)
    }
}
