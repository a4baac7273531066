//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

/// mapgen - generate PySpark pipelines from mapping tables
#[derive(Parser)]
#[command(
    name = "mg",
    about = "Generate Databricks PySpark pipeline code from a source-to-target mapping CSV",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Where the mapping table comes from
#[derive(Debug, Clone, clap::Args)]
#[group(required = true, multiple = false)]
pub struct CsvInput {
    /// Local CSV file, sent inline
    #[arg(long = "csv-file", value_name = "FILE")]
    pub csv_file: Option<PathBuf>,

    /// Storage path of the CSV, read through the storage root
    #[arg(long = "csv-path", value_name = "PATH")]
    pub csv_path: Option<String>,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate a PySpark script with the configured model
    Generate {
        #[command(flatten)]
        input: CsvInput,

        /// Where the generated script goes
        #[arg(short, long, value_name = "PATH")]
        output: String,

        /// Generation pattern (pyspark, merge, scd2, default)
        #[arg(short, long)]
        pattern: Option<String>,

        /// File whose contents replace the pattern instructions
        #[arg(long = "prompt-file", value_name = "FILE")]
        prompt_file: Option<PathBuf>,

        /// Access token (defaults to the configured token env var)
        #[arg(long)]
        token: Option<String>,

        /// Abort the model call after this many seconds
        #[arg(long = "timeout-secs")]
        timeout_secs: Option<u64>,

        /// Directory that storage paths resolve against
        #[arg(long = "storage-root", value_name = "DIR")]
        storage_root: Option<PathBuf>,

        /// Write the script to the output path instead of printing it
        #[arg(short, long)]
        write: bool,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Print the prompt that would be sent, without calling the model
    Prompt {
        /// Local CSV file
        #[arg(value_name = "FILE")]
        csv_file: PathBuf,

        /// Generation pattern (pyspark, merge, scd2, default)
        #[arg(short, long)]
        pattern: Option<String>,

        /// File whose contents replace the pattern instructions
        #[arg(long = "prompt-file", value_name = "FILE")]
        prompt_file: Option<PathBuf>,
    },

    /// List generation patterns
    Patterns,
}

/// Output format for command results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "OutputFormat::from_str: called");
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => {
                debug!(%s, "OutputFormat::from_str: unknown format");
                Err(format!("Unknown format: {}. Use: text or json", s))
            }
        }
    }
}

/// Location of the log file written by `mg`
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mapgen")
        .join("logs")
        .join("mapgen.log")
}
