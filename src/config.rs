//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.healthcheck.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".healthcheck.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Aggregation settings.
    #[serde(default)]
    pub aggregation: AggregationConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Number of rollups run at once by `recompute`.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            concurrency: default_concurrency(),
        }
    }
}

fn default_concurrency() -> usize {
    4
}

/// SQLite settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path of the database file.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    /// How long a writer waits on a locked database, in milliseconds.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            busy_timeout_ms: default_busy_timeout(),
        }
    }
}

impl DatabaseConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

fn default_database_path() -> PathBuf {
    PathBuf::from("healthcheck.db")
}

fn default_busy_timeout() -> u64 {
    crate::store::DEFAULT_BUSY_TIMEOUT.as_millis() as u64
}

/// Rollup behaviour.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregationConfig {
    /// Delete summaries whose source votes are gone instead of keeping the
    /// last computed values.
    #[serde(default)]
    pub prune_empty_summaries: bool,
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Default output format.
    #[serde(default)]
    pub format: crate::cli::OutputFormat,

    /// Show the trend against the previous session for every summary.
    #[serde(default = "default_true")]
    pub include_trends: bool,

    /// Include the participation section.
    #[serde(default = "default_true")]
    pub include_participation: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: crate::cli::OutputFormat::default(),
            include_trends: true,
            include_participation: true,
        }
    }
}

fn default_true() -> bool {
    true
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
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// Only values given explicitly on the command line override.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref database) = args.database {
            self.database.path = database.clone();
        }

        if args.verbose {
            self.general.verbose = true;
        }

        match &args.command {
            crate::cli::Command::Recompute {
                concurrency: Some(concurrency),
                ..
            } => {
                self.general.concurrency = *concurrency;
            }
            crate::cli::Command::Report {
                format: Some(format),
                ..
            } => {
                self.report.format = *format;
            }
            _ => {}
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Args, Command, OutputFormat};

    fn make_args(command: Command) -> Args {
        Args {
            config: None,
            database: None,
            verbose: false,
            quiet: false,
            command,
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.database.path, PathBuf::from("healthcheck.db"));
        assert_eq!(config.database.busy_timeout_ms, 5000);
        assert_eq!(config.general.concurrency, 4);
        assert!(!config.aggregation.prune_empty_summaries);
        assert!(config.report.include_trends);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
verbose = true

[database]
path = "data/health.db"
busy_timeout_ms = 250

[aggregation]
prune_empty_summaries = true

[report]
format = "json"
include_participation = false
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert!(config.general.verbose);
        assert_eq!(config.general.concurrency, 4);
        assert_eq!(config.database.path, PathBuf::from("data/health.db"));
        assert_eq!(config.database.busy_timeout(), Duration::from_millis(250));
        assert!(config.aggregation.prune_empty_summaries);
        assert_eq!(config.report.format, OutputFormat::Json);
        assert!(config.report.include_trends);
        assert!(!config.report.include_participation);
    }

    #[test]
    fn test_merge_only_overrides_explicit_args() {
        let mut config: Config = toml::from_str("[database]\npath = \"file.db\"").unwrap();
        config.merge_with_args(&make_args(Command::Seed));
        assert_eq!(config.database.path, PathBuf::from("file.db"));

        let mut args = make_args(Command::Recompute {
            session: None,
            concurrency: Some(8),
        });
        args.database = Some(PathBuf::from("cli.db"));
        args.verbose = true;
        config.merge_with_args(&args);

        assert_eq!(config.database.path, PathBuf::from("cli.db"));
        assert_eq!(config.general.concurrency, 8);
        assert!(config.general.verbose);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[database]"));
        assert!(toml_str.contains("[aggregation]"));
        assert!(toml_str.contains("[report]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.database.busy_timeout_ms, 5000);
    }
}
