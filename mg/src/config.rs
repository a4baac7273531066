//! mapgen configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::prompts::PatternKind;

/// Main mapgen configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// Model endpoint configuration
    pub llm: LlmConfig,

    /// Generation pipeline settings
    pub generation: GenerationConfig,
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .mapgen.yml
        let local_config = PathBuf::from(".mapgen.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/mapgen/mapgen.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("mapgen").join("mapgen.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is set up
    ///
    /// Errors are swallowed; the full load reports them once logging works.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let path = config_path.cloned().or_else(|| {
            let local = PathBuf::from(".mapgen.yml");
            local.exists().then_some(local)
        })?;
        Self::load_from_file(path).ok()?.log_level
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Model endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Serving endpoint model name
    pub model: String,

    /// Serving endpoints base URL; empty means derive it from `host-env`
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Environment variable holding the workspace host
    #[serde(rename = "host-env")]
    pub host_env: String,

    /// Environment variable holding the access token
    #[serde(rename = "token-env")]
    pub token_env: String,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f64,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Ask the endpoint for a streamed reply
    pub stream: bool,

    /// System message sent before the prompt
    #[serde(rename = "system-prompt")]
    pub system_prompt: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "databricks-claude-sonnet-4-5".to_string(),
            base_url: String::new(),
            host_env: "DATABRICKS_HOST".to_string(),
            token_env: "DATABRICKS_TOKEN".to_string(),
            max_tokens: 4000,
            temperature: 0.05,
            timeout_ms: 300_000,
            stream: false,
            system_prompt: "You are a senior Databricks PySpark engineer.".to_string(),
        }
    }
}

impl LlmConfig {
    /// Resolve the endpoint base URL once, reading `host-env` if needed
    pub fn resolve(&self) -> Result<ResolvedLlmConfig> {
        let base_url = if self.base_url.trim().is_empty() {
            let host = std::env::var(&self.host_env)
                .map_err(|_| eyre::eyre!("No base-url configured and {} is not set", self.host_env))?;
            serving_endpoints_url(&host)
        } else {
            self.base_url.trim().trim_end_matches('/').to_string()
        };

        if base_url.is_empty() {
            return Err(eyre::eyre!("Model endpoint base URL is empty"));
        }

        Ok(self.resolved_with(base_url))
    }

    /// Resolve against an explicit base URL
    pub fn resolved_with(&self, base_url: impl Into<String>) -> ResolvedLlmConfig {
        ResolvedLlmConfig {
            model: self.model.clone(),
            base_url: base_url.into(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            timeout_ms: self.timeout_ms,
            stream: self.stream,
            system_prompt: self.system_prompt.clone(),
        }
    }

    /// Read the access token from `token-env`
    pub fn token_from_env(&self) -> Option<String> {
        std::env::var(&self.token_env).ok().filter(|t| !t.trim().is_empty())
    }
}

/// Build the serving-endpoints URL from a workspace host
///
/// Adds `https://` when no scheme is present and drops trailing slashes.
pub fn serving_endpoints_url(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.is_empty() {
        return String::new();
    }
    let host = if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    };
    format!("{}/serving-endpoints", host)
}

/// Model configuration with every ambient value settled
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLlmConfig {
    pub model: String,
    pub base_url: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub timeout_ms: u64,
    pub stream: bool,
    pub system_prompt: String,
}

/// Generation pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Minimum characters of sanitized output
    #[serde(rename = "min-response-len")]
    pub min_response_len: usize,

    /// Fail on short mapping rows instead of skipping them
    #[serde(rename = "strict-rows")]
    pub strict_rows: bool,

    /// Pattern used when the request names none
    #[serde(rename = "default-pattern")]
    pub default_pattern: PatternKind,

    /// Directory with `{pattern}.pmt` template overrides
    #[serde(rename = "prompts-dir")]
    pub prompts_dir: Option<PathBuf>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            min_response_len: crate::sanitize::DEFAULT_MIN_LEN,
            strict_rows: false,
            default_pattern: PatternKind::Pyspark,
            prompts_dir: None,
        }
    }
}
