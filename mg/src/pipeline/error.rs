//! Generation error types

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Stage, StepTrace};
use crate::llm::LlmError;
use crate::mapping::MappingError;
use crate::prompts::PromptError;
use crate::sanitize::SanitizeError;
use crate::storage::StorageError;

/// Anything that can stop a generation
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Sanitize(#[from] SanitizeError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Failure categories reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NoMappingRows,
    CredentialMissing,
    ModelInvocation,
    ResponseExtraction,
    ResponseTooShort,
    PromptTemplate,
    Storage,
}

impl GenerateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Mapping(MappingError::NoMappingRows) => ErrorKind::NoMappingRows,
            Self::Mapping(_) => ErrorKind::Validation,
            Self::Prompt(_) => ErrorKind::PromptTemplate,
            Self::Llm(LlmError::CredentialMissing) => ErrorKind::CredentialMissing,
            Self::Llm(LlmError::Extraction { .. }) => ErrorKind::ResponseExtraction,
            Self::Llm(_) => ErrorKind::ModelInvocation,
            Self::Sanitize(SanitizeError::TooShort { .. }) => ErrorKind::ResponseTooShort,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }
}

/// A failed generation with the trace recorded up to the failing stage
#[derive(Debug, Error)]
#[error("{stage} failed: {error}")]
pub struct GenerationFailure {
    pub stage: Stage,
    #[source]
    pub error: GenerateError,
    pub steps: StepTrace,
}

impl GenerationFailure {
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }
}
