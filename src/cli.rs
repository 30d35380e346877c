//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::{ProgressNote, TrafficLight};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// healthcheck - team health check survey engine
///
/// Collects traffic-light votes on health cards and rolls them up into
/// team and department summaries with trends and participation figures.
///
/// Examples:
///   healthcheck init-config
///   healthcheck seed
///   healthcheck vote --user backend-engineer1 --card 1 --value amber --progress same
///   healthcheck recompute --session 3
///   healthcheck report --format json --output report.json --fail-on red
///   healthcheck participation --team 2
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to configuration file
    ///
    /// If not specified, looks for .healthcheck.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// SQLite database file
    ///
    /// Overrides `database.path` from the configuration file.
    #[arg(long, value_name = "FILE", env = "HEALTHCHECK_DB", global = true)]
    pub database: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Generate a default .healthcheck.toml configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Load a deterministic sample organisation, sessions and votes
    Seed,

    /// Record (or replace) a vote and refresh the affected summaries
    Vote {
        /// Username of the voter
        #[arg(long, value_name = "NAME")]
        user: String,

        /// Session id; defaults to the latest active session
        #[arg(long, value_name = "ID")]
        session: Option<i64>,

        /// Card id
        #[arg(long, value_name = "ID")]
        card: i64,

        /// Traffic-light value
        #[arg(long, value_name = "LIGHT")]
        value: TrafficLight,

        /// Progress compared to the last session
        #[arg(long, value_name = "NOTE")]
        progress: ProgressNote,

        /// Free-text comment
        #[arg(long)]
        comment: Option<String>,
    },

    /// Recompute every team and department summary of a session
    Recompute {
        /// Session id; defaults to the latest active session
        #[arg(long, value_name = "ID")]
        session: Option<i64>,

        /// Number of rollups run at once
        #[arg(long, value_name = "NUM")]
        concurrency: Option<usize>,
    },

    /// Render team and department summaries for a session
    Report {
        /// Session id; defaults to the latest active session
        #[arg(long, value_name = "ID")]
        session: Option<i64>,

        /// Output format (markdown, json)
        #[arg(long, value_name = "FORMAT")]
        format: Option<OutputFormat>,

        /// Write the report to a file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Fail if any team summary is at or below this level
        ///
        /// Useful for CI pipelines. Exit code 2 when threshold is hit.
        /// Values: amber, red
        #[arg(long, value_name = "LEVEL")]
        fail_on: Option<FailOnLevel>,
    },

    /// Show the participation rate for a session
    Participation {
        /// Session id; defaults to the latest active session
        #[arg(long, value_name = "ID")]
        session: Option<i64>,

        /// Limit to one team
        #[arg(long, value_name = "ID", conflicts_with = "department")]
        team: Option<i64>,

        /// Limit to one department
        #[arg(long, value_name = "ID")]
        department: Option<i64>,
    },
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

/// Level for --fail-on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum FailOnLevel {
    Amber,
    Red,
}

impl FailOnLevel {
    pub fn threshold(self) -> TrafficLight {
        match self {
            FailOnLevel::Amber => TrafficLight::Amber,
            FailOnLevel::Red => TrafficLight::Red,
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        match &self.command {
            Command::Vote { user, card, .. } => {
                if user.trim().is_empty() {
                    return Err("Username must not be empty".to_string());
                }
                if *card <= 0 {
                    return Err("Card id must be positive".to_string());
                }
            }
            Command::Recompute {
                concurrency: Some(0),
                ..
            } => {
                return Err("Concurrency must be at least 1".to_string());
            }
            _ => {}
        }

        if let Some(session) = self.session_arg() {
            if session <= 0 {
                return Err("Session id must be positive".to_string());
            }
        }

        Ok(())
    }

    /// The explicit `--session` of the subcommand, if it takes one.
    pub fn session_arg(&self) -> Option<i64> {
        match &self.command {
            Command::Vote { session, .. }
            | Command::Recompute { session, .. }
            | Command::Report { session, .. }
            | Command::Participation { session, .. } => *session,
            Command::InitConfig { .. } | Command::Seed => None,
        }
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `config_verbose` is the `[general] verbose` setting; `--quiet` wins
    /// over it.
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

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("healthcheck").chain(args.iter().copied()))
    }

    #[test]
    fn test_parse_vote() {
        let args = parse(&[
            "vote", "--user", "alice", "--card", "3", "--value", "amber", "--progress", "worse",
        ])
        .unwrap();

        match args.command {
            Command::Vote {
                user,
                session,
                card,
                value,
                progress,
                comment,
            } => {
                assert_eq!(user, "alice");
                assert_eq!(session, None);
                assert_eq!(card, 3);
                assert_eq!(value, TrafficLight::Amber);
                assert_eq!(progress, ProgressNote::Worse);
                assert!(comment.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_unknown_light() {
        assert!(parse(&[
            "vote", "--user", "a", "--card", "1", "--value", "blue", "--progress", "same",
        ])
        .is_err());
        assert!(parse(&["report", "--fail-on", "green"]).is_err());
    }

    #[test]
    fn test_participation_scope_conflict() {
        assert!(parse(&["participation", "--team", "1", "--department", "2"]).is_err());
        assert!(parse(&["participation", "--department", "2"]).is_ok());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let args = parse(&["--verbose", "--quiet", "seed"]).unwrap();
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_bad_ids() {
        assert!(parse(&["report", "--session", "0"]).unwrap().validate().is_err());
        assert!(parse(&["recompute", "--concurrency", "0"])
            .unwrap()
            .validate()
            .is_err());
        assert!(parse(&["recompute", "--session", "4"]).unwrap().validate().is_ok());
    }

    #[test]
    fn test_log_level() {
        let mut args = parse(&["seed"]).unwrap();
        assert_eq!(args.log_level(false), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(false), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(false), tracing::Level::ERROR);
    }

    #[test]
    fn test_config_verbose_raises_log_level() {
        let mut args = parse(&["seed"]).unwrap();
        assert_eq!(args.log_level(true), tracing::Level::DEBUG);

        args.quiet = true;
        assert_eq!(args.log_level(true), tracing::Level::ERROR);
    }

    #[test]
    fn test_fail_on_threshold() {
        assert_eq!(FailOnLevel::Amber.threshold(), TrafficLight::Amber);
        assert!(TrafficLight::Red.at_or_below(FailOnLevel::Amber.threshold()));
        assert!(!TrafficLight::Amber.at_or_below(FailOnLevel::Red.threshold()));
    }
}
