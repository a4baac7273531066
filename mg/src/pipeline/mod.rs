//! Generation pipeline
//!
//! Validates a request, resolves its mapping table, and drives
//! parse -> group -> compose -> invoke -> sanitize while keeping a step trace.

mod error;
mod orchestrator;
mod request;
mod steps;

pub use error::{ErrorKind, GenerateError, GenerationFailure};
pub use orchestrator::{GenerateResponse, GeneratedArtifact, GenerationOutcome, Orchestrator};
pub use request::{GenerationRequest, SourceType};
pub use steps::{Stage, Step, StepStatus, StepTrace};
