//! Prompt Loader
//!
//! Resolves a pattern's baseline instructions from a user override directory
//! or falls back to the embedded defaults.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::{PatternKind, PromptError, embedded};

/// Loads baseline instruction templates
#[derive(Debug, Clone, Default)]
pub struct PromptLoader {
    /// User override directory holding `{pattern}.pmt` files
    user_dir: Option<PathBuf>,
}

impl PromptLoader {
    /// Create a loader that checks `prompts_dir` before the embedded templates
    ///
    /// A directory that does not exist is ignored.
    pub fn new(prompts_dir: Option<&Path>) -> Self {
        debug!(?prompts_dir, "PromptLoader::new: called");
        let user_dir = prompts_dir.filter(|dir| dir.is_dir()).map(Path::to_path_buf);
        if user_dir.is_some() {
            debug!("PromptLoader::new: user override directory found");
        } else {
            debug!("PromptLoader::new: no user override directory");
        }
        Self { user_dir }
    }

    /// Create a loader that only uses embedded prompts
    pub fn embedded_only() -> Self {
        debug!("PromptLoader::embedded_only: called");
        Self { user_dir: None }
    }

    /// Load the baseline template for a pattern
    ///
    /// Checks in order:
    /// 1. User override: `{prompts_dir}/{pattern}.pmt`
    /// 2. Embedded fallback
    pub fn load_template(&self, pattern: PatternKind) -> Result<String, PromptError> {
        debug!(%pattern, "PromptLoader::load_template: called");
        if let Some(ref user_dir) = self.user_dir {
            let path = user_dir.join(format!("{}.pmt", pattern.name()));
            if path.is_file() {
                info!("Using prompt override {}", path.display());
                let content =
                    std::fs::read_to_string(&path).map_err(|source| PromptError::Read { path, source })?;
                return Ok(content.trim_end().to_string());
            }
            debug!(?path, "PromptLoader::load_template: not found in user override");
        }

        debug!(%pattern, "PromptLoader::load_template: using embedded");
        Ok(embedded::get_embedded(pattern).trim_end().to_string())
    }
}
