//! mapgen - PySpark pipeline generator
//!
//! CLI entry point: turns a mapping CSV into a generated PySpark script.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{debug, info};

use mapgen::cli::{Cli, Command, CsvInput, OutputFormat, get_log_path};
use mapgen::config::Config;
use mapgen::llm::create_client;
use mapgen::mapping;
use mapgen::pipeline::{GenerateResponse, GenerationRequest, Orchestrator, StepStatus, StepTrace};
use mapgen::prompts::{PatternKind, PromptComposer, PromptLoader};
use mapgen::storage::{LocalStorage, ObjectStorage};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Log level comes from the config file before the full load
    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!("mapgen loaded config: model={}", config.llm.model);

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Generate {
            input,
            output,
            pattern,
            prompt_file,
            token,
            timeout_secs,
            storage_root,
            write,
            format,
        } => {
            let opts = GenerateOpts {
                input,
                output,
                pattern,
                prompt_file,
                token,
                timeout: timeout_secs.map(Duration::from_secs),
                storage_root,
                write,
                format,
            };
            cmd_generate(&config, opts).await
        }
        Command::Prompt {
            csv_file,
            pattern,
            prompt_file,
        } => cmd_prompt(&config, &csv_file, pattern.as_deref(), prompt_file.as_deref()),
        Command::Patterns => cmd_patterns(&config),
    }
}

struct GenerateOpts {
    input: CsvInput,
    output: String,
    pattern: Option<String>,
    prompt_file: Option<PathBuf>,
    token: Option<String>,
    timeout: Option<Duration>,
    storage_root: Option<PathBuf>,
    write: bool,
    format: OutputFormat,
}

fn read_prompt_file(path: Option<&Path>) -> Result<Option<String>> {
    path.map(|p| fs::read_to_string(p).context(format!("Failed to read prompt file {}", p.display())))
        .transpose()
}

async fn cmd_generate(config: &Config, opts: GenerateOpts) -> Result<()> {
    debug!(output = %opts.output, write = opts.write, "cmd_generate: called");

    let resolved = config.llm.resolve().context("Failed to resolve model endpoint")?;
    let client = create_client(&resolved)?;
    let storage: Arc<dyn ObjectStorage> = Arc::new(LocalStorage::new(opts.storage_root.clone()));
    let orchestrator = Orchestrator::from_config(config, client, storage.clone());

    let mut request = match (&opts.input.csv_file, &opts.input.csv_path) {
        (Some(file), _) => {
            let text = fs::read_to_string(file).context(format!("Failed to read {}", file.display()))?;
            GenerationRequest::inline(text, opts.output.as_str())
        }
        (None, Some(path)) => GenerationRequest::volume(path.as_str(), opts.output.as_str()),
        (None, None) => eyre::bail!("Either --csv-file or --csv-path is required"),
    };
    if let Some(pattern) = &opts.pattern {
        request = request.with_pattern(pattern.as_str());
    }
    if let Some(template) = read_prompt_file(opts.prompt_file.as_deref())? {
        request = request.with_template_override(template);
    }
    if let Some(timeout) = opts.timeout {
        request = request.with_timeout(timeout);
    }

    // Missing token is reported by the pipeline so the trace shows where it stopped
    let token = opts.token.clone().or_else(|| config.llm.token_from_env()).unwrap_or_default();

    match orchestrator.generate(&request, &token).await {
        Ok(outcome) => {
            let code = outcome.artifact.code.clone();
            let written = if opts.write {
                storage
                    .write(&opts.output, &code)
                    .await
                    .context(format!("Failed to write {}", opts.output))?
            } else {
                false
            };

            match opts.format {
                OutputFormat::Json => {
                    let response = GenerateResponse::from(outcome);
                    println!("{}", serde_json::to_string_pretty(&response)?);
                }
                OutputFormat::Text => {
                    print_steps(&outcome.steps);
                    if written {
                        println!("{} Wrote {} chars to {}", "✓".green(), code.len(), opts.output.cyan());
                    } else {
                        println!();
                        println!("{}", code);
                    }
                }
            }
            Ok(())
        }
        Err(failure) => {
            match opts.format {
                OutputFormat::Json => {
                    let mut response = serde_json::to_value(GenerateResponse::from(&failure))?;
                    response["error"] = serde_json::Value::String(failure.error.to_string());
                    response["kind"] = serde_json::to_value(failure.kind())?;
                    println!("{}", serde_json::to_string_pretty(&response)?);
                }
                OutputFormat::Text => print_steps(&failure.steps),
            }
            Err(eyre::eyre!(failure))
        }
    }
}

fn print_steps(steps: &StepTrace) {
    for step in steps {
        let marker = match step.status {
            StepStatus::Completed => "✓".green(),
            StepStatus::Error => "✗".red(),
            StepStatus::Pending | StepStatus::InProgress => "…".yellow(),
        };
        match &step.message {
            Some(message) => println!("{} {}: {}", marker, step.name.bold(), message),
            None => println!("{} {}", marker, step.name.bold()),
        }
    }
}

fn cmd_prompt(config: &Config, csv_file: &Path, pattern: Option<&str>, prompt_file: Option<&Path>) -> Result<()> {
    debug!(csv_file = %csv_file.display(), ?pattern, "cmd_prompt: called");

    let pattern = match pattern {
        Some(name) => PatternKind::parse(name).ok_or_else(|| eyre::eyre!("Unknown pattern: {}", name))?,
        None => config.generation.default_pattern,
    };
    let text = fs::read_to_string(csv_file).context(format!("Failed to read {}", csv_file.display()))?;
    let override_text = read_prompt_file(prompt_file)?;

    let options = mapping::ParseOptions {
        strict: config.generation.strict_rows,
    };
    let descriptors = mapping::build(mapping::parse_with(&text, options)?)?;
    let composer = PromptComposer::new(PromptLoader::new(config.generation.prompts_dir.as_deref()));
    let prompt = composer.compose(&descriptors, pattern, override_text.as_deref())?;

    println!("{}", prompt);
    Ok(())
}

fn cmd_patterns(config: &Config) -> Result<()> {
    debug!("cmd_patterns: called");
    for pattern in PatternKind::ALL {
        let marker = if pattern == config.generation.default_pattern {
            " (default)".dimmed().to_string()
        } else {
            String::new()
        };
        println!("{:<10} {}{}", pattern.name().cyan(), pattern.description(), marker);
    }
    Ok(())
}
