//! Prompt composition
//!
//! Renders the generation prompt from a descriptor set and a pattern. The
//! output is a pure function of its inputs: the payload is serialized from
//! structs (fixed field order) and nothing time- or randomness-dependent is
//! rendered.

use handlebars::Handlebars;
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use super::{PatternKind, PromptError, PromptLoader, embedded};
use crate::mapping::PipelineDescriptor;

/// Fixed note attached to every payload
const PAYLOAD_NOTE: &str = "Generate a single Python file that iterates over each pipeline mapping and runs the ETL \
                            for each mapping. The file should be parameterized and idempotent.";

/// The structured payload appended to the instructions
#[derive(Debug, Serialize)]
struct MappingDocument<'a> {
    pipelines: &'a [PipelineDescriptor],
    note: &'static str,
}

/// Composes generation prompts
pub struct PromptComposer {
    hbs: Handlebars<'static>,
    loader: PromptLoader,
}

impl PromptComposer {
    pub fn new(loader: PromptLoader) -> Self {
        debug!(?loader, "PromptComposer::new: called");
        let mut hbs = Handlebars::new();
        hbs.set_strict_mode(true);
        hbs.register_escape_fn(handlebars::no_escape);
        Self { hbs, loader }
    }

    /// Render the full prompt
    ///
    /// `template_override` replaces the pattern's baseline instructions
    /// verbatim; the mapping payload and closing instruction are unchanged.
    pub fn compose(
        &self,
        descriptors: &[PipelineDescriptor],
        pattern: PatternKind,
        template_override: Option<&str>,
    ) -> Result<String, PromptError> {
        debug!(
            descriptor_count = descriptors.len(),
            %pattern,
            has_override = template_override.is_some(),
            "PromptComposer::compose: called"
        );
        let instructions = match template_override {
            Some(text) => text.to_string(),
            None => self.loader.load_template(pattern)?,
        };

        let document = MappingDocument {
            pipelines: descriptors,
            note: PAYLOAD_NOTE,
        };
        let mappings = serde_json::to_string_pretty(&document)?;

        let prompt = self.hbs.render_template(
            embedded::ENVELOPE.trim_end(),
            &json!({ "instructions": instructions, "mappings": mappings }),
        )?;
        debug!(prompt_len = prompt.len(), "PromptComposer::compose: rendered");
        Ok(prompt)
    }
}

impl Default for PromptComposer {
    fn default() -> Self {
        Self::new(PromptLoader::embedded_only())
    }
}

/// Compose a prompt using the embedded templates
pub fn compose(
    descriptors: &[PipelineDescriptor],
    pattern: PatternKind,
    template_override: Option<&str>,
) -> Result<String, PromptError> {
    PromptComposer::default().compose(descriptors, pattern, template_override)
}
