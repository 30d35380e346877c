//! healthcheck - team health check survey engine
//!
//! Records traffic-light votes and rolls them up into team and department
//! summaries stored in SQLite.
//!
//! Exit codes:
//!   0 - Success (no summary at or below threshold, or no --fail-on set)
//!   1 - Runtime error (config, database, unknown session, etc.)
//!   2 - A team summary is at or below the --fail-on threshold

use anyhow::{anyhow, Context, Result};
use healthcheck::analysis::recompute::{recompute_session_parallel, RecomputeOptions};
use healthcheck::analysis::{self, AggregationOptions};
use healthcheck::cli::{Args, Command};
use healthcheck::config::{Config, DEFAULT_CONFIG_FILE};
use healthcheck::models::{DepartmentId, Session, SessionId, TeamId};
use healthcheck::report::{self, ReportOptions};
use healthcheck::store::{Database, Population};
use healthcheck::voting::{submit_vote, Ballot};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle init-config early (no logging needed)
    if let Command::InitConfig { force } = args.command {
        return handle_init_config(force);
    }

    // Load configuration before logging so `[general] verbose` applies
    let config = match load_config(&args) {
        Ok(mut config) => {
            config.merge_with_args(&args);
            config
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    init_logging(&args, &config);

    info!("healthcheck v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args, config).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Command failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle init-config: generate a default .healthcheck.toml.
fn handle_init_config(force: bool) -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() && !force {
        eprintln!(
            "⚠️  {} already exists. Pass --force to overwrite it.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to change the database path, pruning and report options.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args, config: &Config) {
    let level = args.log_level(config.general.verbose);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Dispatch the subcommand. Returns the process exit code.
async fn run(args: Args, config: Config) -> Result<i32> {
    let db = Database::open(&config.database.path).with_context(|| {
        format!(
            "Failed to open database: {}",
            config.database.path.display()
        )
    })?;
    db.set_busy_timeout(config.database.busy_timeout())?;
    let aggregation = AggregationOptions::from(&config.aggregation);

    match &args.command {
        Command::InitConfig { .. } => Ok(0),
        Command::Seed => handle_seed(&db, aggregation),
        Command::Vote {
            user,
            session,
            card,
            value,
            progress,
            comment,
        } => {
            let session = resolve_session(&db, *session)?;
            let user = db
                .get_user_by_username(user)
                .with_context(|| format!("Unknown user '{}'", user))?;
            let ballot = Ballot {
                user: user.id,
                card: (*card).into(),
                session: session.id,
                value: *value,
                progress_note: *progress,
                comment: comment.as_deref(),
            };
            let receipt = submit_vote(&db, aggregation, &ballot)?;

            println!(
                "🗳️  Recorded {} {} vote for {} in '{}'",
                receipt.vote.value.emoji(),
                receipt.vote.value,
                user.username,
                session.name
            );
            if let Some(summary) = receipt.team_summary {
                println!(
                    "   Team summary: {} {} ({:.1}% green, {:.1}% amber, {:.1}% red)",
                    summary.average_vote.emoji(),
                    summary.average_vote,
                    summary.green_pct,
                    summary.amber_pct,
                    summary.red_pct
                );
            }
            if let Some(summary) = receipt.department_summary {
                println!(
                    "   Department summary: {} {}",
                    summary.average_vote.emoji(),
                    summary.average_vote
                );
            }
            Ok(0)
        }
        Command::Recompute { session, .. } => {
            let session = resolve_session(&db, *session)?;
            drop(db);
            handle_recompute(&config, &args, &session, aggregation).await
        }
        Command::Report {
            session,
            output,
            fail_on,
            ..
        } => {
            let session = resolve_session(&db, *session)?;
            let report = report::build_session_report(
                &db,
                session.id,
                ReportOptions::from(&config.report),
            )?;

            match output {
                Some(path) => {
                    report::write_report(&report, config.report.format, path)?;
                    println!("✅ Report saved to: {}", path.display());
                }
                None => println!("{}", report::render(&report, config.report.format)?),
            }

            // Check --fail-on threshold
            if let Some(level) = fail_on {
                if report.breaches(level.threshold()) {
                    eprintln!(
                        "\n⛔ Team summaries at or below {} found. Failing (exit code 2).",
                        level.threshold()
                    );
                    return Ok(2);
                }
            }
            Ok(0)
        }
        Command::Participation {
            session,
            team,
            department,
        } => {
            let session = resolve_session(&db, *session)?;
            let population = match (team, department) {
                (Some(team), _) => Population::Team(TeamId(*team)),
                (None, Some(department)) => Population::Department(DepartmentId(*department)),
                (None, None) => Population::All,
            };
            match population {
                Population::Team(id) => {
                    db.get_team(id)?;
                }
                Population::Department(id) => {
                    db.get_department(id)?;
                }
                Population::All => {}
            }

            let rate = analysis::participation_rate(&db, session.id, population)?;
            let complete = analysis::is_session_complete(&db, session.id)?;
            println!("📊 Participation in '{}': {:.1}%", session.name, rate);
            println!("   Session complete: {}", if complete { "yes" } else { "no" });
            Ok(0)
        }
    }
}

fn handle_seed(db: &Database, aggregation: AggregationOptions) -> Result<i32> {
    let today = chrono::Local::now().date_naive();
    println!("🌱 Seeding sample data...");

    let summary = healthcheck::seed::seed_sample_data(db, today, aggregation)?;

    println!(
        "✅ Created {} departments, {} teams, {} users, {} cards, {} sessions and {} votes.",
        summary.departments,
        summary.teams,
        summary.users,
        summary.cards,
        summary.sessions,
        summary.votes
    );
    println!("   Summaries written: {}", summary.rollups.written);
    Ok(0)
}

async fn handle_recompute(
    config: &Config,
    args: &Args,
    session: &Session,
    aggregation: AggregationOptions,
) -> Result<i32> {
    let start_time = Instant::now();
    println!("🔄 Recomputing summaries for '{}'...", session.name);

    let progress = if args.quiet {
        None
    } else {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
                .map_err(|e| anyhow!("Invalid progress template: {}", e))?
                .progress_chars("#>-"),
        );
        Some(pb)
    };

    let options = RecomputeOptions {
        database: config.database.path.clone(),
        aggregation,
        busy_timeout: config.database.busy_timeout(),
        concurrency: config.general.concurrency,
    };
    let stats = recompute_session_parallel(&options, session.id, progress.as_ref()).await?;

    println!("\n📊 Recompute Summary:");
    println!("   Written: {}", stats.written);
    println!("   Pruned: {}", stats.pruned);
    println!("   Unchanged: {}", stats.unchanged);
    println!("   Duration: {:.1}s", start_time.elapsed().as_secs_f64());
    Ok(0)
}

/// Use the explicit session, or fall back to the latest active one.
fn resolve_session(db: &Database, explicit: Option<i64>) -> Result<Session> {
    match explicit {
        Some(id) => Ok(db.get_session(SessionId(id))?),
        None => {
            let session = db
                .latest_active_session()?
                .ok_or_else(|| anyhow!("No active session found; pass --session"))?;
            debug!("Using latest active session #{} '{}'", session.id, session.name);
            Ok(session)
        }
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        return Config::load(config_path);
    }

    // Try default location. Logging is not up yet, so warn on stderr.
    match Config::load_default() {
        Ok(Some(config)) => Ok(config),
        Ok(None) => Ok(Config::default()),
        Err(e) => {
            eprintln!("⚠️  Failed to load config, using defaults: {:#}", e);
            Ok(Config::default())
        }
    }
}
