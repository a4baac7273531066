//! Prompt Template System
//!
//! Renders the generation prompt from pipeline descriptors.
//!
//! Template loading chain:
//! 1. `{prompts-dir}/{pattern}.pmt` (user override)
//! 2. Embedded fallback in code
//!
//! The envelope around the instructions and the mapping payload is a
//! Handlebars template rendered in strict mode without escaping.

mod composer;
pub mod embedded;
mod error;
mod loader;
mod pattern;

pub use composer::{PromptComposer, compose};
pub use error::PromptError;
pub use loader::PromptLoader;
pub use pattern::PatternKind;
