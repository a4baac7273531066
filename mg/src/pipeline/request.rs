//! Generation requests

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Where the mapping table comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// Read from object storage (falls back to inline text when given)
    Volume,
    /// Carried in the request itself
    Inline,
}

impl SourceType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Volume => "volume",
            Self::Inline => "inline",
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One request to generate a script
///
/// Fields are kept as received; the orchestrator's validating stage decides
/// whether they are usable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// `volume` or `inline`
    pub source_type: String,

    /// Mapping table text
    #[serde(default)]
    pub csv_text: Option<String>,

    /// Storage path of the mapping table
    #[serde(default)]
    pub csv_path: Option<String>,

    /// Where the caller intends to put the generated script
    pub output_ref: String,

    /// `pyspark`, `merge`, `scd2` or `default`; empty means the configured default
    #[serde(default)]
    pub pattern: String,

    /// Replaces the pattern's baseline instructions verbatim
    #[serde(default)]
    pub template_override: Option<String>,

    /// Bound on the model call
    #[serde(skip)]
    pub timeout: Option<Duration>,
}

impl GenerationRequest {
    /// A request carrying the mapping table inline
    pub fn inline(csv_text: impl Into<String>, output_ref: impl Into<String>) -> Self {
        debug!("GenerationRequest::inline: called");
        Self {
            source_type: SourceType::Inline.name().to_string(),
            csv_text: Some(csv_text.into()),
            output_ref: output_ref.into(),
            ..Self::default()
        }
    }

    /// A request reading the mapping table from storage
    pub fn volume(csv_path: impl Into<String>, output_ref: impl Into<String>) -> Self {
        debug!("GenerationRequest::volume: called");
        Self {
            source_type: SourceType::Volume.name().to_string(),
            csv_path: Some(csv_path.into()),
            output_ref: output_ref.into(),
            ..Self::default()
        }
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }

    pub fn with_template_override(mut self, template: impl Into<String>) -> Self {
        self.template_override = Some(template.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
