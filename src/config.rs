//! Configuration file handling.
//!
//! This module handles loading `.corrsight.toml` files and merging them
//! with command-line arguments. Components receive the resulting structs
//! at construction and never read the environment themselves.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = ".corrsight.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Reasoning service settings.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Chart settings.
    #[serde(default)]
    pub charts: ChartConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Directory for charts and the report directory.
    /// Defaults to the dataset's own directory.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

/// What to do when a service request exhausts its retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Continue and write the report without the failed section.
    #[default]
    Degrade,
    /// Fail the run.
    Abort,
}

/// Reasoning service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Chat-completions endpoint URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,

    /// Bearer credential. Usually supplied via `CORRSIGHT_API_TOKEN`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Attempts per request, including the first.
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Sampling temperature; omitted from requests when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(default)]
    pub on_failure: FailurePolicy,

    /// Also request a README narrative after the correlation judgment.
    #[serde(default = "default_true")]
    pub request_narrative: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            api_token: None,
            timeout_seconds: default_timeout(),
            retries: default_retries(),
            temperature: None,
            on_failure: FailurePolicy::default(),
            request_narrative: true,
        }
    }
}

fn default_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_timeout() -> u64 {
    120
}

fn default_retries() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

/// Chart settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartConfig {
    /// Image width in pixels.
    #[serde(default = "default_width")]
    pub width: u32,

    /// Image height in pixels.
    #[serde(default = "default_height")]
    pub height: u32,

    /// Scatter point radius in pixels.
    #[serde(default = "default_point_radius")]
    pub point_radius: i32,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            point_radius: default_point_radius(),
        }
    }
}

fn default_width() -> u32 {
    900
}

fn default_height() -> u32 {
    600
}

fn default_point_radius() -> i32 {
    3
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Include the column statistics table.
    #[serde(default = "default_true")]
    pub include_statistics: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            include_statistics: true,
        }
    }
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, and only
    /// when they were actually provided.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref model) = args.model {
            self.service.model = model.clone();
        }
        if let Some(ref endpoint) = args.endpoint {
            self.service.endpoint = endpoint.clone();
        }
        if let Some(ref token) = args.api_token {
            self.service.api_token = Some(token.clone());
        }
        if let Some(retries) = args.retries {
            self.service.retries = retries;
        }
        if let Some(timeout) = args.timeout {
            self.service.timeout_seconds = timeout;
        }
        if args.no_narrative {
            self.service.request_narrative = false;
        }
        if let Some(ref dir) = args.output_dir {
            self.general.output_dir = Some(dir.clone());
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
