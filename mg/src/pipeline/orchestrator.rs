//! Generation orchestrator
//!
//! Runs `Validating -> Preparing -> Generating`, recording one step per stage.
//! The first failing stage ends the run; later stages never appear in the
//! trace.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{GenerateError, GenerationFailure, GenerationRequest, SourceType, Stage, StepTrace};
use crate::config::Config;
use crate::llm::ModelClient;
use crate::mapping::{self, ParseOptions};
use crate::prompts::{PatternKind, PromptComposer, PromptLoader};
use crate::sanitize::Sanitizer;
use crate::storage::ObjectStorage;

/// The generated script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedArtifact {
    pub code: String,
    pub success: bool,
}

/// A successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutcome {
    pub artifact: GeneratedArtifact,
    pub steps: StepTrace,
}

/// Wire form of a run's result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub code: String,
    pub steps: StepTrace,
    pub success: bool,
}

impl From<GenerationOutcome> for GenerateResponse {
    fn from(outcome: GenerationOutcome) -> Self {
        Self {
            code: outcome.artifact.code,
            steps: outcome.steps,
            success: outcome.artifact.success,
        }
    }
}

impl From<&GenerationFailure> for GenerateResponse {
    fn from(failure: &GenerationFailure) -> Self {
        Self {
            code: String::new(),
            steps: failure.steps.clone(),
            success: false,
        }
    }
}

/// Where the mapping table will come from, once validated
#[derive(Debug, Clone, PartialEq, Eq)]
enum CsvSource {
    Inline(String),
    Stored(String),
}

/// A request that passed validation
#[derive(Debug, Clone)]
struct ValidatedRequest {
    source: CsvSource,
    pattern: PatternKind,
}

/// Sequences parsing, prompt composition, the model call and sanitizing
///
/// Holds no per-request state; one instance can serve concurrent requests.
pub struct Orchestrator {
    client: ModelClient,
    storage: Arc<dyn ObjectStorage>,
    composer: PromptComposer,
    sanitizer: Sanitizer,
    parse_options: ParseOptions,
    default_pattern: PatternKind,
    model_name: String,
}

impl Orchestrator {
    pub fn new(client: ModelClient, storage: Arc<dyn ObjectStorage>, model_name: impl Into<String>) -> Self {
        let model_name = model_name.into();
        debug!(%model_name, "Orchestrator::new: called");
        Self {
            client,
            storage,
            composer: PromptComposer::default(),
            sanitizer: Sanitizer::default(),
            parse_options: ParseOptions::default(),
            default_pattern: PatternKind::Pyspark,
            model_name,
        }
    }

    /// Build an orchestrator with the generation settings from `config`
    pub fn from_config(config: &Config, client: ModelClient, storage: Arc<dyn ObjectStorage>) -> Self {
        debug!("Orchestrator::from_config: called");
        let generation = &config.generation;
        Self::new(client, storage, config.llm.model.clone())
            .with_composer(PromptComposer::new(PromptLoader::new(generation.prompts_dir.as_deref())))
            .with_sanitizer(Sanitizer::new(generation.min_response_len))
            .with_parse_options(ParseOptions {
                strict: generation.strict_rows,
            })
            .with_default_pattern(generation.default_pattern)
    }

    pub fn with_composer(mut self, composer: PromptComposer) -> Self {
        self.composer = composer;
        self
    }

    pub fn with_sanitizer(mut self, sanitizer: Sanitizer) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    pub fn with_parse_options(mut self, options: ParseOptions) -> Self {
        self.parse_options = options;
        self
    }

    pub fn with_default_pattern(mut self, pattern: PatternKind) -> Self {
        self.default_pattern = pattern;
        self
    }

    /// Run the full pipeline for one request
    pub async fn generate(
        &self,
        request: &GenerationRequest,
        token: &str,
    ) -> Result<GenerationOutcome, GenerationFailure> {
        debug!(source_type = %request.source_type, pattern = %request.pattern, "Orchestrator::generate: called");
        let mut steps = StepTrace::new();

        steps.begin(Stage::Validating);
        let validated = match self.validate(request) {
            Ok(validated) => {
                steps.complete("Input validated successfully");
                validated
            }
            Err(e) => return Err(Self::halt(steps, Stage::Validating, e)),
        };

        steps.begin(Stage::Preparing);
        let csv_text = match self.prepare(&validated.source).await {
            Ok((text, message)) => {
                steps.complete(message);
                text
            }
            Err(e) => return Err(Self::halt(steps, Stage::Preparing, e)),
        };

        steps.begin(Stage::Generating);
        let code = match self.run_chain(&csv_text, &validated, request, token).await {
            Ok(code) => {
                steps.complete(format!("Generated {} characters of code", code.chars().count()));
                code
            }
            Err(e) => return Err(Self::halt(steps, Stage::Generating, e)),
        };

        info!("Generation complete ({} chars)", code.len());
        Ok(GenerationOutcome {
            artifact: GeneratedArtifact { code, success: true },
            steps,
        })
    }

    fn halt(mut steps: StepTrace, stage: Stage, error: GenerateError) -> GenerationFailure {
        warn!(%stage, %error, "Orchestrator: stage failed");
        steps.fail(error.to_string());
        GenerationFailure { stage, error, steps }
    }

    fn validate(&self, request: &GenerationRequest) -> Result<ValidatedRequest, GenerateError> {
        debug!("Orchestrator::validate: called");
        let source_type = match request.source_type.trim().to_ascii_lowercase().as_str() {
            "volume" => SourceType::Volume,
            "inline" => SourceType::Inline,
            "jira" => {
                return Err(GenerateError::Validation(
                    "JIRA integration is not yet implemented; use 'volume' or 'inline'".to_string(),
                ));
            }
            other => {
                return Err(GenerateError::Validation(format!(
                    "Unsupported source type '{}'; expected 'volume' or 'inline'",
                    other
                )));
            }
        };

        let pattern = if request.pattern.trim().is_empty() {
            self.default_pattern
        } else {
            PatternKind::parse(&request.pattern).ok_or_else(|| {
                let supported: Vec<_> = PatternKind::ALL.iter().map(|p| p.name()).collect();
                GenerateError::Validation(format!(
                    "Unsupported pattern '{}'; supported: {}",
                    request.pattern,
                    supported.join(", ")
                ))
            })?
        };

        if request.output_ref.trim().is_empty() {
            return Err(GenerateError::Validation("output_ref is required".to_string()));
        }

        let csv_text = request.csv_text.as_deref().filter(|t| !t.trim().is_empty());
        let csv_path = request.csv_path.as_deref().map(str::trim).filter(|p| !p.is_empty());
        let source = match (source_type, csv_text, csv_path) {
            (_, Some(text), _) => CsvSource::Inline(text.to_string()),
            (SourceType::Volume, None, Some(path)) => CsvSource::Stored(path.to_string()),
            (SourceType::Inline, None, _) => {
                return Err(GenerateError::Validation(
                    "csv_text is required for an inline source".to_string(),
                ));
            }
            (SourceType::Volume, None, None) => {
                return Err(GenerateError::Validation(
                    "Either csv_text or csv_path must be provided".to_string(),
                ));
            }
        };

        debug!(%source_type, %pattern, "Orchestrator::validate: ok");
        Ok(ValidatedRequest { source, pattern })
    }

    /// Confirm the mapping table is available; returns it with a step message
    async fn prepare(&self, source: &CsvSource) -> Result<(String, String), GenerateError> {
        match source {
            CsvSource::Inline(text) => {
                debug!(len = text.len(), "Orchestrator::prepare: inline CSV");
                Ok((text.clone(), format!("Using CSV content from request ({} bytes)", text.len())))
            }
            CsvSource::Stored(path) => {
                debug!(%path, "Orchestrator::prepare: reading from storage");
                let text = self.storage.read(path).await?;
                let message = format!("Read mapping from {} ({} bytes)", path, text.len());
                Ok((text, message))
            }
        }
    }

    async fn run_chain(
        &self,
        csv_text: &str,
        validated: &ValidatedRequest,
        request: &GenerationRequest,
        token: &str,
    ) -> Result<String, GenerateError> {
        let rows = mapping::parse_with(csv_text, self.parse_options)?;
        let descriptors = mapping::build(rows)?;
        info!(
            "Composing {} prompt for {} pipeline(s)",
            validated.pattern,
            descriptors.len()
        );

        let prompt = self
            .composer
            .compose(&descriptors, validated.pattern, request.template_override.as_deref())?;

        let client = match request.timeout {
            Some(limit) => self.client.clone().with_timeout(Some(limit)),
            None => self.client.clone(),
        };
        let raw = client.invoke(&prompt, token, &self.model_name).await?;

        Ok(self.sanitizer.sanitize(&raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::mock::MockEndpoint;
    use crate::llm::{ChatSettings, LlmError, ModelReply, ResponseShape};
    use crate::pipeline::{ErrorKind, StepStatus};
    use crate::storage::LocalStorage;
    use serde_json::json;
    use std::time::Duration;
    use tempfile::TempDir;

    const CSV: &str = "Source_Table,Source_Column,Target_Table,Target_Column,Transformation\n\
                       cat.sch.tbl1,a,cat.sch.out1,A,a*2\n\
                       cat.sch.tbl1,b,cat.sch.out1,B,\n";

    const SCRIPT: &str = "from pyspark.sql import functions as F\n\ndef read_source(path):\n    return spark.read.load(path)";

    fn message(content: &str) -> Result<ModelReply, LlmError> {
        Ok(ModelReply::Body(json!({ "choices": [{ "message": { "content": content } }] })))
    }

    fn orchestrator(endpoint: Arc<MockEndpoint>) -> Orchestrator {
        let client = ModelClient::new(endpoint, ChatSettings::default());
        Orchestrator::new(client, Arc::new(LocalStorage::default()), "test-model")
    }

    fn statuses(steps: &StepTrace) -> Vec<StepStatus> {
        steps.iter().map(|s| s.status).collect()
    }

    #[tokio::test]
    async fn test_inline_success() {
        let endpoint = Arc::new(MockEndpoint::new(vec![message(&format!("```python\n{SCRIPT}\n```"))]));
        let outcome = orchestrator(endpoint.clone())
            .generate(&GenerationRequest::inline(CSV, "out.py"), "tok")
            .await
            .unwrap();

        assert_eq!(outcome.artifact.code, SCRIPT);
        assert!(outcome.artifact.success);
        assert_eq!(
            statuses(&outcome.steps),
            vec![StepStatus::Completed, StepStatus::Completed, StepStatus::Completed]
        );
        let last = outcome.steps.last().unwrap();
        assert_eq!(
            last.message.as_deref(),
            Some(format!("Generated {} characters of code", SCRIPT.len()).as_str())
        );

        let requests = endpoint.requests();
        assert_eq!(requests[0].model, "test-model");
        assert!(requests[0].messages[1].content.contains("\"pipeline_id\": \"cat_sch_tbl1\""));
    }

    #[tokio::test]
    async fn test_generated_length_counts_characters() {
        let script = "# Café → Müller pipeline\nfrom pyspark.sql import functions as F\n";
        let endpoint = Arc::new(MockEndpoint::new(vec![message(script)]));
        let outcome = orchestrator(endpoint)
            .generate(&GenerationRequest::inline(CSV, "out.py"), "tok")
            .await
            .unwrap();

        let expected = script.trim().chars().count();
        assert!(expected < script.trim().len());
        assert_eq!(
            outcome.steps.last().unwrap().message.as_deref(),
            Some(format!("Generated {} characters of code", expected).as_str())
        );
    }

    #[tokio::test]
    async fn test_unsupported_source_halts_at_validation() {
        let endpoint = Arc::new(MockEndpoint::new(vec![message(SCRIPT)]));
        let mut request = GenerationRequest::inline(CSV, "out.py");
        request.source_type = "jira".to_string();

        let failure = orchestrator(endpoint.clone()).generate(&request, "tok").await.unwrap_err();

        assert_eq!(failure.stage, Stage::Validating);
        assert_eq!(failure.kind(), ErrorKind::Validation);
        assert_eq!(failure.steps.len(), 1);
        assert_eq!(failure.steps.steps()[0].status, StepStatus::Error);
        assert!(failure.steps.steps()[0].message.as_deref().unwrap().contains("JIRA"));
        assert_eq!(endpoint.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_pattern_rejected() {
        let endpoint = Arc::new(MockEndpoint::new(vec![]));
        let request = GenerationRequest::inline(CSV, "out.py").with_pattern("snowflake");

        let failure = orchestrator(endpoint).generate(&request, "tok").await.unwrap_err();
        assert_eq!(failure.stage, Stage::Validating);
        assert!(failure.to_string().contains("snowflake"));
    }

    #[tokio::test]
    async fn test_missing_fields_rejected() {
        let endpoint = Arc::new(MockEndpoint::new(vec![]));
        let orch = orchestrator(endpoint.clone());

        let no_output = GenerationRequest::inline(CSV, " ");
        let mut no_source = GenerationRequest::volume("", "out.py");
        no_source.csv_path = None;
        let mut inline_with_path_only = GenerationRequest::volume("/Volumes/a.csv", "out.py");
        inline_with_path_only.source_type = "inline".to_string();

        for request in [no_output, no_source, inline_with_path_only] {
            let failure = orch.generate(&request, "tok").await.unwrap_err();
            assert_eq!(failure.stage, Stage::Validating, "{:?}", request);
            assert_eq!(failure.steps.len(), 1);
        }
        assert_eq!(endpoint.call_count(), 0);
    }

    #[tokio::test]
    async fn test_volume_source_reads_storage() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("Volumes/cat/sch/in")).unwrap();
        std::fs::write(dir.path().join("Volumes/cat/sch/in/map.csv"), CSV).unwrap();

        let endpoint = Arc::new(MockEndpoint::new(vec![message(SCRIPT)]));
        let client = ModelClient::new(endpoint, ChatSettings::default());
        let storage = Arc::new(LocalStorage::new(Some(dir.path().to_path_buf())));
        let orch = Orchestrator::new(client, storage, "m");

        let outcome = orch
            .generate(&GenerationRequest::volume("/Volumes/cat/sch/in/map.csv", "out.py"), "tok")
            .await
            .unwrap();

        assert_eq!(outcome.artifact.code, SCRIPT);
        assert!(
            outcome.steps.steps()[1]
                .message
                .as_deref()
                .unwrap()
                .starts_with("Read mapping from /Volumes/cat/sch/in/map.csv")
        );
    }

    #[tokio::test]
    async fn test_missing_stored_csv_fails_preparing() {
        let endpoint = Arc::new(MockEndpoint::new(vec![]));
        let failure = orchestrator(endpoint.clone())
            .generate(&GenerationRequest::volume("/nonexistent/mapgen/map.csv", "out.py"), "tok")
            .await
            .unwrap_err();

        assert_eq!(failure.stage, Stage::Preparing);
        assert_eq!(failure.kind(), ErrorKind::Storage);
        assert_eq!(statuses(&failure.steps), vec![StepStatus::Completed, StepStatus::Error]);
        assert_eq!(endpoint.call_count(), 0);
    }

    #[tokio::test]
    async fn test_no_rows_fails_before_network() {
        let endpoint = Arc::new(MockEndpoint::new(vec![message(SCRIPT)]));
        let csv = "Source_Table,Source_Column,Target_Table,Target_Column,Transformation\n,a,t,A,\n";

        let failure = orchestrator(endpoint.clone())
            .generate(&GenerationRequest::inline(csv, "out.py"), "tok")
            .await
            .unwrap_err();

        assert_eq!(failure.stage, Stage::Generating);
        assert_eq!(failure.kind(), ErrorKind::NoMappingRows);
        assert_eq!(endpoint.call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_columns_fail_generating() {
        let endpoint = Arc::new(MockEndpoint::new(vec![]));
        let failure = orchestrator(endpoint)
            .generate(&GenerationRequest::inline("a,b,c\n1,2,3\n", "out.py"), "tok")
            .await
            .unwrap_err();

        assert_eq!(failure.stage, Stage::Generating);
        assert_eq!(failure.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_empty_token_is_credential_missing() {
        let endpoint = Arc::new(MockEndpoint::new(vec![message(SCRIPT)]));
        let failure = orchestrator(endpoint.clone())
            .generate(&GenerationRequest::inline(CSV, "out.py"), "")
            .await
            .unwrap_err();

        assert_eq!(failure.kind(), ErrorKind::CredentialMissing);
        assert_eq!(endpoint.call_count(), 0);
    }

    #[tokio::test]
    async fn test_short_reply_fails_sanitize() {
        let endpoint = Arc::new(MockEndpoint::new(vec![message("```python\nprint(1)\n```")]));
        let failure = orchestrator(endpoint)
            .generate(&GenerationRequest::inline(CSV, "out.py"), "tok")
            .await
            .unwrap_err();

        assert_eq!(failure.kind(), ErrorKind::ResponseTooShort);
        assert_eq!(
            statuses(&failure.steps),
            vec![StepStatus::Completed, StepStatus::Completed, StepStatus::Error]
        );
        assert!(GenerateResponse::from(&failure).code.is_empty());
    }

    #[tokio::test]
    async fn test_unresolved_handle_fails_extraction() {
        let endpoint = Arc::new(MockEndpoint::new(vec![Ok(ModelReply::Opaque(
            "<openai.Stream object at 0x7f00>".to_string(),
        ))]));
        let failure = orchestrator(endpoint)
            .generate(&GenerationRequest::inline(CSV, "out.py"), "tok")
            .await
            .unwrap_err();

        assert_eq!(failure.kind(), ErrorKind::ResponseExtraction);
        assert!(matches!(
            failure.error,
            GenerateError::Llm(LlmError::Extraction {
                shape: ResponseShape::UnresolvedHandle
            })
        ));
    }

    #[tokio::test]
    async fn test_request_timeout_is_model_invocation() {
        let endpoint = Arc::new(MockEndpoint::new(vec![message(SCRIPT)]).with_delay(Duration::from_secs(5)));
        let request = GenerationRequest::inline(CSV, "out.py").with_timeout(Duration::from_millis(20));

        let failure = orchestrator(endpoint).generate(&request, "tok").await.unwrap_err();
        assert_eq!(failure.kind(), ErrorKind::ModelInvocation);
    }

    #[tokio::test]
    async fn test_template_override_and_default_pattern() {
        let endpoint = Arc::new(MockEndpoint::new(vec![message(SCRIPT), message(SCRIPT)]));
        let orch = orchestrator(endpoint.clone()).with_default_pattern(PatternKind::Scd2);

        orch.generate(&GenerationRequest::inline(CSV, "out.py"), "tok").await.unwrap();
        orch.generate(
            &GenerationRequest::inline(CSV, "out.py").with_template_override("Use dbt."),
            "tok",
        )
        .await
        .unwrap();

        let requests = endpoint.requests();
        assert!(requests[0].messages[1].content.contains("Slowly Changing Dimension"));
        assert!(requests[1].messages[1].content.starts_with("Use dbt.\n\nMappings:"));
    }

    #[tokio::test]
    async fn test_response_wire_form() {
        let endpoint = Arc::new(MockEndpoint::new(vec![message(SCRIPT)]));
        let outcome = orchestrator(endpoint)
            .generate(&GenerationRequest::inline(CSV, "out.py"), "tok")
            .await
            .unwrap();

        let json = serde_json::to_value(GenerateResponse::from(outcome)).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["code"], SCRIPT);
        assert_eq!(json["steps"].as_array().unwrap().len(), 3);
        assert_eq!(json["steps"][2]["status"], "completed");
    }
}
