//! LLM error types

use std::time::Duration;
use thiserror::Error;

use super::ResponseShape;

/// Errors that can occur during a model invocation
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("No credential available for the model endpoint")]
    CredentialMissing,

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Could not extract text from model reply (shape: {shape})")]
    Extraction { shape: ResponseShape },
}

impl LlmError {
    /// Check if the call itself failed (as opposed to its reply being unusable)
    pub fn is_invocation_failure(&self) -> bool {
        match self {
            LlmError::ApiError { .. } | LlmError::Network(_) | LlmError::Timeout(_) => true,
            LlmError::CredentialMissing | LlmError::Extraction { .. } => false,
        }
    }

    /// The reply shape observed when extraction failed
    pub fn shape(&self) -> Option<ResponseShape> {
        match self {
            LlmError::Extraction { shape } => Some(*shape),
            _ => None,
        }
    }
}
