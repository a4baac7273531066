//! Prompt error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading or rendering a prompt
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("Failed to read prompt template {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to render prompt: {0}")]
    Render(#[from] handlebars::RenderError),

    #[error("Failed to serialize mappings: {0}")]
    Json(#[from] serde_json::Error),
}
