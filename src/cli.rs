//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::{CommandFactory, Parser};
use std::path::{Path, PathBuf};

/// Corrsight - automated exploratory analysis for CSV datasets
///
/// Finds the two most correlated numeric column pairs, asks a reasoning
/// service to interpret them, renders scatter charts, and writes a
/// README report next to the dataset.
///
/// Examples:
///   corrsight sales.csv
///   corrsight sales.csv --model gpt-4o --retries 5
///   corrsight sales.csv --output-dir reports
///   corrsight sales.csv --dry-run
///   corrsight --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the dataset file (delimited text)
    #[arg(value_name = "DATASET")]
    pub dataset: Option<PathBuf>,

    /// Extra positionals; any present turns the run into a usage print
    #[arg(hide = true)]
    pub extra: Vec<PathBuf>,

    /// Model identifier for the reasoning service
    #[arg(short, long, env = "CORRSIGHT_MODEL")]
    pub model: Option<String>,

    /// Chat-completions endpoint URL
    #[arg(long, value_name = "URL", env = "CORRSIGHT_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Bearer token for the reasoning service
    #[arg(long, value_name = "TOKEN", env = "CORRSIGHT_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// Attempts per service request (including the first)
    #[arg(long, value_name = "COUNT")]
    pub retries: Option<u32>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Directory for charts and the report
    ///
    /// Defaults to the directory containing the dataset.
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Skip the README narrative request
    #[arg(long)]
    pub no_narrative: bool,

    /// Path to configuration file
    ///
    /// If not specified, looks for .corrsight.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Dry run: rank column pairs without calling the service or writing files
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .corrsight.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The dataset to analyze, when exactly one positional was given.
    pub fn dataset_path(&self) -> Option<&Path> {
        if self.extra.is_empty() {
            self.dataset.as_deref()
        } else {
            None
        }
    }

    /// Usage text printed when the positional count is wrong.
    pub fn usage() -> String {
        format!(
            "Usage: corrsight <dataset.csv>\n\n{}",
            Self::command().render_help()
        )
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(ref endpoint) = self.endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err("Endpoint URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if self.retries == Some(0) {
            return Err("Retries must be at least 1".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(dataset) = self.dataset_path() {
            if !dataset.is_file() {
                return Err(format!("Dataset file does not exist: {}", dataset.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level from the flags and the config file's `verbose`.
    pub fn log_level(&self, config_verbose: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || config_verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
