//! Parallel recompute of every summary in a session.
//!
//! Keys are independent, so each (team, card) rollup runs on its own blocking
//! task with its own connection to the database file. SQLite serialises the
//! writes; the busy timeout decides how long a task waits for the lock.
//! Department rollups start only after every team rollup has finished.

use crate::analysis::aggregator::{AggregationOptions, Aggregator, RecomputeStats, RollupChange};
use crate::error::Result;
use crate::models::*;
use crate::store::Database;
use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// How a parallel recompute reaches the database.
#[derive(Debug, Clone)]
pub struct RecomputeOptions {
    pub database: PathBuf,
    pub aggregation: AggregationOptions,
    pub busy_timeout: Duration,
    pub concurrency: usize,
}

#[derive(Debug, Clone, Copy)]
enum Key {
    Team(TeamId, CardId),
    Department(DepartmentId, CardId),
}

fn run_key(options: &RecomputeOptions, session: SessionId, key: Key) -> Result<RecomputeStats> {
    let db = Database::open(&options.database)?;
    db.set_busy_timeout(options.busy_timeout)?;
    let aggregator = Aggregator::new(&db, options.aggregation);

    let mut stats = RecomputeStats::default();
    match key {
        Key::Team(team, card) => {
            let update = aggregator.update_team_summary(team, session, card)?;
            stats.record(&update.change);
        }
        Key::Department(department, card) => {
            let change: RollupChange<DepartmentSummary> =
                aggregator.update_department_summary(department, session, card)?;
            stats.record(&change);
        }
    }
    Ok(stats)
}

async fn run_phase(
    options: &RecomputeOptions,
    session: SessionId,
    keys: Vec<Key>,
    progress: Option<&ProgressBar>,
) -> Result<RecomputeStats> {
    let tasks = keys.into_iter().map(|key| {
        let options = options.clone();
        tokio::task::spawn_blocking(move || run_key(&options, session, key))
    });

    let mut results = stream::iter(tasks).buffer_unordered(options.concurrency.max(1));
    let mut stats = RecomputeStats::default();
    while let Some(joined) = results.next().await {
        stats.merge(joined??);
        if let Some(pb) = progress {
            pb.inc(1);
        }
    }
    Ok(stats)
}

/// Recompute all team summaries, then all department summaries, for
/// `session`. The first failing rollup aborts the run; rollups already
/// committed stay committed.
pub async fn recompute_session_parallel(
    options: &RecomputeOptions,
    session: SessionId,
    progress: Option<&ProgressBar>,
) -> Result<RecomputeStats> {
    let (team_keys, department_keys) = plan(&options.database, session)?;
    let total = team_keys.len() + department_keys.len();
    debug!(
        "Recompute plan for session {}: {} team keys, {} department keys",
        session,
        team_keys.len(),
        department_keys.len()
    );

    if let Some(pb) = progress {
        pb.set_length(total as u64);
    }

    let mut stats = run_phase(options, session, team_keys, progress).await?;
    stats.merge(run_phase(options, session, department_keys, progress).await?);

    if let Some(pb) = progress {
        pb.finish_with_message("Recompute complete");
    }
    info!(
        "Recomputed {} keys for session {} ({} written, {} pruned, {} unchanged)",
        total, session, stats.written, stats.pruned, stats.unchanged
    );

    Ok(stats)
}

fn plan(path: &Path, session: SessionId) -> Result<(Vec<Key>, Vec<Key>)> {
    let db = Database::open(path)?;
    // Fail early on an unknown session instead of in every task.
    db.get_session(session)?;

    let cards = db.list_cards(false)?;
    let team_keys = db
        .list_teams()?
        .iter()
        .flat_map(|team| cards.iter().map(move |card| Key::Team(team.id, card.id)))
        .collect();
    let department_keys = db
        .list_departments()?
        .iter()
        .flat_map(|dept| cards.iter().map(move |card| Key::Department(dept.id, card.id)))
        .collect();

    Ok((team_keys, department_keys))
}
