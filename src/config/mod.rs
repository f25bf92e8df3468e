//! Configuration management for docferry.
//!
//! Settings are typed, named fields populated once at startup and passed by
//! value into the core; no part of the pipeline reads ambient global
//! configuration. Sources, highest precedence first:
//! 1. Command-line arguments
//! 2. Configuration file (TOML)
//! 3. Default values

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::codec::RecordFormat;
use crate::error::{ConfigError, Result};
use crate::import::action::ActionKind;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Store connectivity.
    #[serde(default)]
    pub store: StoreConfig,

    /// Export run settings.
    #[serde(default)]
    pub export: ExportConfig,

    /// Import run settings.
    #[serde(default)]
    pub import: ImportConfig,

    /// Failure-tolerance policy shared by the per-split gate and the
    /// run-level classification.
    #[serde(default)]
    pub job: JobPolicy,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Store connectivity contract: node URLs, a bucket/namespace and a
/// credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store node URLs.
    #[serde(default)]
    pub urls: Vec<String>,

    /// Bucket/namespace name.
    #[serde(default)]
    pub bucket: String,

    /// Collection within the bucket.
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Credential user name.
    #[serde(default)]
    pub username: Option<String>,

    /// Credential secret.
    #[serde(default)]
    pub password: Option<String>,

    /// Connection establishment timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

/// Export run settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Name of the index/view to traverse.
    #[serde(default)]
    pub view: String,

    /// Key filters to traverse, in order. Empty means one unfiltered
    /// traversal.
    #[serde(default)]
    pub key_filters: Vec<String>,

    /// Documents per page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Output directory; empty writes to the current working directory.
    #[serde(default)]
    pub output_dir: String,

    /// Page file base name.
    #[serde(default = "default_base_name")]
    pub base_name: String,

    /// Replace existing page files instead of failing.
    #[serde(default)]
    pub overwrite: bool,

    /// Include document payloads, not just keys.
    #[serde(default = "default_true")]
    pub include_docs: bool,

    /// Record delimiters.
    #[serde(default)]
    pub format: RecordFormat,
}

/// Import run settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Input split files, each processed as one task.
    #[serde(default)]
    pub inputs: Vec<PathBuf>,

    /// Mutation applied for every record of the run.
    #[serde(default = "default_action")]
    pub action: ActionKind,

    /// Optional expiry in seconds applied to stored documents.
    #[serde(default)]
    pub expiry: Option<u32>,

    /// Maximum store operations in flight at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Per-operation timeout in seconds.
    #[serde(default = "default_op_timeout")]
    pub op_timeout_secs: u64,

    /// Record delimiters.
    #[serde(default)]
    pub format: RecordFormat,
}

/// Failure-tolerance thresholds, passed explicitly to the gate and the
/// run-level classification rather than read from shared mutable state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct JobPolicy {
    /// Maximum percentage of failed operations (or splits) still counted
    /// as success.
    #[serde(default = "default_max_failure_percent")]
    pub max_failure_percent: u32,

    /// Hard cap on failed splits before the run aborts.
    #[serde(default = "default_max_tracker_failures")]
    pub max_tracker_failures: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace).
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// Enable timestamps in logs.
    #[serde(default)]
    pub timestamps: bool,
}

/// Log level options.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

fn default_collection() -> String {
    "documents".to_string()
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_page_size() -> usize {
    1000
}

fn default_base_name() -> String {
    "part".to_string()
}

fn default_true() -> bool {
    true
}

fn default_action() -> ActionKind {
    ActionKind::Set
}

fn default_concurrency() -> usize {
    16
}

fn default_op_timeout() -> u64 {
    30
}

fn default_max_failure_percent() -> u32 {
    5
}

fn default_max_tracker_failures() -> u32 {
    20
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            urls: Vec::new(),
            bucket: String::new(),
            collection: default_collection(),
            username: None,
            password: None,
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            view: String::new(),
            key_filters: Vec::new(),
            page_size: default_page_size(),
            output_dir: String::new(),
            base_name: default_base_name(),
            overwrite: false,
            include_docs: true,
            format: RecordFormat::default(),
        }
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            action: default_action(),
            expiry: None,
            concurrency: default_concurrency(),
            op_timeout_secs: default_op_timeout(),
            format: RecordFormat::default(),
        }
    }
}

impl Default for JobPolicy {
    fn default() -> Self {
        Self {
            max_failure_percent: default_max_failure_percent(),
            max_tracker_failures: default_max_tracker_failures(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            timestamps: false,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, or defaults when no path is
    /// given.
    pub fn load_from_file(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let contents = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound(path.display().to_string()))?;
        let config: Config =
            toml::from_str(&contents).map_err(|e| ConfigError::InvalidFormat(e.to_string()))?;
        Ok(config)
    }

    /// Validate field values that cannot be expressed in the type system.
    pub fn validate(&self) -> Result<()> {
        if self.export.page_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "export.page_size".to_string(),
                value: "0".to_string(),
            }
            .into());
        }
        if self.import.concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                field: "import.concurrency".to_string(),
                value: "0".to_string(),
            }
            .into());
        }
        if self.job.max_failure_percent > 100 {
            return Err(ConfigError::InvalidValue {
                field: "job.max_failure_percent".to_string(),
                value: self.job.max_failure_percent.to_string(),
            }
            .into());
        }
        for (name, format) in [("export", &self.export.format), ("import", &self.import.format)] {
            if format.field_delimiter.is_empty() || format.row_delimiter.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: format!("{name}.format"),
                    value: "empty delimiter".to_string(),
                }
                .into());
            }
            if format.field_delimiter == format.row_delimiter {
                return Err(ConfigError::InvalidValue {
                    field: format!("{name}.format"),
                    value: "field and row delimiters are equal".to_string(),
                }
                .into());
            }
        }
        Ok(())
    }
}
