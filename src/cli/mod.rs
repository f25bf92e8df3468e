//! Command-line interface for docferry.
//!
//! This module handles:
//! - Command-line argument parsing using clap
//! - Configuration loading and CLI-over-file merging
//! - Argument validation (a validation failure exits with code 1)

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Config;
use crate::error::{ConfigError, Result};
use crate::import::action::ActionKind;

fn parse_action(s: &str) -> std::result::Result<ActionKind, String> {
    s.parse()
}

/// Turn the escape spellings `\t` and `\n` into the real characters so
/// delimiters can be passed on a command line.
fn parse_delimiter(s: &str) -> String {
    s.replace("\\t", "\t").replace("\\n", "\n")
}

/// Bulk document mover between a clustered document store and a filesystem
#[derive(Parser, Debug)]
#[command(
    name = "docferry",
    version,
    about = "Bulk document export/import for a clustered document store",
    long_about = "Moves documents in bulk between a clustered document store and a\n\
filesystem: export streams a store-side index into sequential page files,\n\
import pushes page files back into the store as bulk asynchronous writes."
)]
pub struct CliArgs {
    /// Configuration file path
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Store node URLs, comma separated
    #[arg(short = 'u', long, value_name = "URLS", value_delimiter = ',')]
    pub urls: Vec<String>,

    /// Bucket/namespace name
    #[arg(short = 'b', long, value_name = "NAME")]
    pub bucket: Option<String>,

    /// Collection within the bucket
    #[arg(long, value_name = "NAME")]
    pub collection: Option<String>,

    /// Credential user name
    #[arg(long, value_name = "USERNAME")]
    pub username: Option<String>,

    /// Credential secret
    #[arg(short = 'p', long, value_name = "PASSWORD")]
    pub password: Option<String>,

    /// Verbose mode (detailed logging)
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Very verbose mode (debug logging)
    #[arg(long = "vv")]
    pub very_verbose: bool,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands for docferry
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export documents from a store index into sequential page files
    Export {
        /// Index/view name to traverse
        #[arg(long, value_name = "NAME")]
        view: Option<String>,

        /// Key filters, comma separated; omitted means one unfiltered
        /// traversal
        #[arg(short = 'k', long = "keys", value_name = "KEYS", value_delimiter = ',')]
        key_filters: Vec<String>,

        /// Documents per page
        #[arg(long, value_name = "N")]
        page_size: Option<usize>,

        /// Output directory (current directory when omitted)
        #[arg(short = 'o', long, value_name = "DIR")]
        output: Option<String>,

        /// Page file base name
        #[arg(long, value_name = "NAME")]
        base_name: Option<String>,

        /// Replace existing page files instead of failing
        #[arg(long)]
        overwrite: bool,

        /// Export keys only, without document payloads
        #[arg(long)]
        keys_only: bool,

        /// Delimiter between key and document (\t and \n are understood)
        #[arg(long, value_name = "DELIM")]
        field_delimiter: Option<String>,

        /// Delimiter between records
        #[arg(long, value_name = "DELIM")]
        row_delimiter: Option<String>,
    },

    /// Import page files back into the store as bulk writes
    Import {
        /// Input split files, each processed as one task
        #[arg(value_name = "FILE")]
        inputs: Vec<PathBuf>,

        /// Mutation applied for every record (set, add, delete, remove)
        #[arg(short = 'a', long, value_name = "ACTION", value_parser = parse_action)]
        action: Option<ActionKind>,

        /// Expiry in seconds applied to stored documents
        #[arg(long, value_name = "SECONDS")]
        expiry: Option<u32>,

        /// Maximum store operations in flight at once
        #[arg(long, value_name = "N")]
        concurrency: Option<usize>,

        /// Per-operation timeout in seconds
        #[arg(long, value_name = "SECONDS")]
        op_timeout: Option<u64>,

        /// Maximum percentage of failed operations still counted as success
        #[arg(long, value_name = "PERCENT")]
        max_failure_percent: Option<u32>,

        /// Delimiter between key and document (\t and \n are understood)
        #[arg(long, value_name = "DELIM")]
        field_delimiter: Option<String>,

        /// Delimiter between records
        #[arg(long, value_name = "DELIM")]
        row_delimiter: Option<String>,
    },
}

/// CLI interface handler
pub struct CliInterface {
    /// Parsed command-line arguments
    args: CliArgs,

    /// Effective configuration after merging
    config: Config,
}

impl CliInterface {
    /// Parse the process arguments and build the effective configuration.
    ///
    /// Help and version requests exit 0 here; a malformed command line
    /// exits 1, matching the validation exit code.
    pub fn new() -> Result<Self> {
        let args = CliArgs::try_parse().unwrap_or_else(|e| {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        });
        Self::from_args(args)
    }

    /// Build the interface from already-parsed arguments.
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let mut config = Config::load_from_file(args.config_file.as_deref())?;
        Self::apply_overrides(&mut config, &args);

        let interface = Self { args, config };
        interface.validate()?;
        Ok(interface)
    }

    pub fn args(&self) -> &CliArgs {
        &self.args
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn command(&self) -> &Commands {
        &self.args.command
    }

    /// Merge command-line arguments over the loaded configuration.
    fn apply_overrides(config: &mut Config, args: &CliArgs) {
        if !args.urls.is_empty() {
            config.store.urls = args.urls.clone();
        }
        if let Some(bucket) = &args.bucket {
            config.store.bucket = bucket.clone();
        }
        if let Some(collection) = &args.collection {
            config.store.collection = collection.clone();
        }
        if let Some(username) = &args.username {
            config.store.username = Some(username.clone());
        }
        if let Some(password) = &args.password {
            config.store.password = Some(password.clone());
        }

        match &args.command {
            Commands::Export {
                view,
                key_filters,
                page_size,
                output,
                base_name,
                overwrite,
                keys_only,
                field_delimiter,
                row_delimiter,
            } => {
                if let Some(view) = view {
                    config.export.view = view.clone();
                }
                if !key_filters.is_empty() {
                    config.export.key_filters = key_filters.clone();
                }
                if let Some(page_size) = page_size {
                    config.export.page_size = *page_size;
                }
                if let Some(output) = output {
                    config.export.output_dir = output.clone();
                }
                if let Some(base_name) = base_name {
                    config.export.base_name = base_name.clone();
                }
                if *overwrite {
                    config.export.overwrite = true;
                }
                if *keys_only {
                    config.export.include_docs = false;
                }
                if let Some(delim) = field_delimiter {
                    config.export.format.field_delimiter = parse_delimiter(delim);
                }
                if let Some(delim) = row_delimiter {
                    config.export.format.row_delimiter = parse_delimiter(delim);
                }
            }
            Commands::Import {
                inputs,
                action,
                expiry,
                concurrency,
                op_timeout,
                max_failure_percent,
                field_delimiter,
                row_delimiter,
            } => {
                if !inputs.is_empty() {
                    config.import.inputs = inputs.clone();
                }
                if let Some(action) = action {
                    config.import.action = *action;
                }
                if expiry.is_some() {
                    config.import.expiry = *expiry;
                }
                if let Some(concurrency) = concurrency {
                    config.import.concurrency = *concurrency;
                }
                if let Some(op_timeout) = op_timeout {
                    config.import.op_timeout_secs = *op_timeout;
                }
                if let Some(percent) = max_failure_percent {
                    config.job.max_failure_percent = *percent;
                }
                if let Some(delim) = field_delimiter {
                    config.import.format.field_delimiter = parse_delimiter(delim);
                }
                if let Some(delim) = row_delimiter {
                    config.import.format.row_delimiter = parse_delimiter(delim);
                }
            }
        }
    }

    /// Check required arguments and field values.
    fn validate(&self) -> Result<()> {
        if self.config.store.urls.is_empty() {
            return Err(ConfigError::MissingField("store.urls".to_string()).into());
        }
        if self.config.store.bucket.is_empty() {
            return Err(ConfigError::MissingField("store.bucket".to_string()).into());
        }
        if self.config.store.password.is_none() {
            return Err(ConfigError::MissingField("store.password".to_string()).into());
        }

        match &self.args.command {
            Commands::Export { .. } => {
                if self.config.export.view.is_empty() {
                    return Err(ConfigError::MissingField("export.view".to_string()).into());
                }
            }
            Commands::Import { .. } => {
                if self.config.import.inputs.is_empty() {
                    return Err(ConfigError::MissingField("import.inputs".to_string()).into());
                }
            }
        }

        self.config.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args(extra: &[&str]) -> Vec<String> {
        let mut argv = vec![
            "docferry".to_string(),
            "-u".to_string(),
            "node1:27017,node2:27017".to_string(),
            "-b".to_string(),
            "events".to_string(),
            "-p".to_string(),
            "secret".to_string(),
        ];
        argv.extend(extra.iter().map(|s| s.to_string()));
        argv
    }

    #[test]
    fn test_export_args_merge_into_config() {
        let argv = base_args(&[
            "export",
            "--view",
            "by_region",
            "--keys",
            "eu,us",
            "--page-size",
            "250",
            "-o",
            "/tmp/out",
        ]);
        let args = CliArgs::try_parse_from(argv).unwrap();
        let cli = CliInterface::from_args(args).unwrap();

        assert_eq!(cli.config().store.urls.len(), 2);
        assert_eq!(cli.config().export.view, "by_region");
        assert_eq!(cli.config().export.key_filters, vec!["eu", "us"]);
        assert_eq!(cli.config().export.page_size, 250);
        assert_eq!(cli.config().export.output_dir, "/tmp/out");
    }

    #[test]
    fn test_import_args_merge_into_config() {
        let argv = base_args(&[
            "import",
            "part-00000",
            "part-00001",
            "-a",
            "add",
            "--concurrency",
            "8",
            "--max-failure-percent",
            "10",
        ]);
        let args = CliArgs::try_parse_from(argv).unwrap();
        let cli = CliInterface::from_args(args).unwrap();

        assert_eq!(cli.config().import.inputs.len(), 2);
        assert_eq!(cli.config().import.action, ActionKind::Add);
        assert_eq!(cli.config().import.concurrency, 8);
        assert_eq!(cli.config().job.max_failure_percent, 10);
    }

    #[test]
    fn test_missing_urls_fails_validation() {
        let argv = vec![
            "docferry",
            "-b",
            "events",
            "-p",
            "secret",
            "export",
            "--view",
            "v",
        ];
        let args = CliArgs::try_parse_from(argv).unwrap();
        assert!(CliInterface::from_args(args).is_err());
    }

    #[test]
    fn test_missing_credential_fails_validation() {
        let argv = vec![
            "docferry",
            "-u",
            "node1:27017",
            "-b",
            "events",
            "export",
            "--view",
            "v",
        ];
        let args = CliArgs::try_parse_from(argv).unwrap();
        assert!(CliInterface::from_args(args).is_err());
    }

    #[test]
    fn test_export_requires_view() {
        let argv = base_args(&["export"]);
        let args = CliArgs::try_parse_from(argv).unwrap();
        assert!(CliInterface::from_args(args).is_err());
    }

    #[test]
    fn test_import_requires_inputs() {
        let argv = base_args(&["import"]);
        let args = CliArgs::try_parse_from(argv).unwrap();
        assert!(CliInterface::from_args(args).is_err());
    }

    #[test]
    fn test_unknown_action_is_a_parse_error() {
        let argv = base_args(&["import", "f", "-a", "upsert"]);
        assert!(CliArgs::try_parse_from(argv).is_err());
    }

    #[test]
    fn test_delimiter_escapes() {
        assert_eq!(parse_delimiter("\\t"), "\t");
        assert_eq!(parse_delimiter("\\n"), "\n");
        assert_eq!(parse_delimiter("|"), "|");
    }

    #[test]
    fn test_delimiter_override() {
        let argv = base_args(&["export", "--view", "v", "--field-delimiter", "|"]);
        let args = CliArgs::try_parse_from(argv).unwrap();
        let cli = CliInterface::from_args(args).unwrap();
        assert_eq!(cli.config().export.format.field_delimiter, "|");
    }
}
