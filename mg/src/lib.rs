//! mapgen - PySpark pipeline generation from mapping tables
//!
//! Reads a source-to-target mapping CSV, groups it into per-source pipeline
//! descriptors, asks a hosted chat model to write a PySpark script, and
//! cleans the reply into runnable code.
//!
//! # Modules
//!
//! - [`mapping`] - CSV parsing and pipeline descriptors
//! - [`prompts`] - Pattern templates and prompt composition
//! - [`llm`] - Model client, transport and reply normalization
//! - [`sanitize`] - Markdown fence removal and length check
//! - [`storage`] - Object storage for mapping tables and outputs
//! - [`pipeline`] - Request validation and the staged orchestrator
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod llm;
pub mod mapping;
pub mod pipeline;
pub mod prompts;
pub mod sanitize;
pub mod storage;

pub use config::{Config, GenerationConfig, LlmConfig, ResolvedLlmConfig};
pub use llm::{ChatEndpoint, HttpChatEndpoint, LlmError, ModelClient, ResponseShape, create_client};
pub use mapping::{MappingError, MappingRow, ParseOptions, PipelineDescriptor};
pub use pipeline::{
    ErrorKind, GenerateError, GenerateResponse, GenerationFailure, GenerationOutcome, GenerationRequest,
    Orchestrator, SourceType, Stage, StepStatus, StepTrace,
};
pub use prompts::{PatternKind, PromptComposer, PromptLoader};
pub use sanitize::{SanitizeError, Sanitizer};
pub use storage::{LocalStorage, ObjectStorage, StorageError};
