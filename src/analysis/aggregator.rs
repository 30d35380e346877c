//! Vote aggregation and summary statistics.
//!
//! Team summaries are a full recount of the current votes of a team's
//! members for one (session, card). Department summaries are the unweighted
//! mean of their teams' summaries for the same key: a two-person team and a
//! twenty-person team contribute equally.

use crate::analysis::classifier::{classify, majority_progress, overall_health};
use crate::error::Result;
use crate::models::*;
use crate::store::Database;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Behaviour switches for the rollups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationOptions {
    /// Delete a summary when its source set becomes empty instead of
    /// leaving the last computed row in place.
    pub prune_empty_summaries: bool,
}

impl From<&crate::config::AggregationConfig> for AggregationOptions {
    fn from(config: &crate::config::AggregationConfig) -> Self {
        Self {
            prune_empty_summaries: config.prune_empty_summaries,
        }
    }
}

/// A computed rollup, not yet keyed to a team or department.
#[derive(Debug, Clone, PartialEq)]
pub struct Rollup {
    pub distribution: Distribution,
    pub average_vote: TrafficLight,
    pub progress_summary: ProgressNote,
}

/// Roll individual votes up. `None` for an empty set.
pub fn summarize_votes(votes: &[Vote]) -> Option<Rollup> {
    if votes.is_empty() {
        return None;
    }

    let count = |light: TrafficLight| votes.iter().filter(|v| v.value == light).count();
    let distribution = Distribution::from_counts(
        count(TrafficLight::Green),
        count(TrafficLight::Amber),
        count(TrafficLight::Red),
    );

    Some(Rollup {
        average_vote: classify(distribution.green, distribution.amber, distribution.red),
        progress_summary: majority_progress(votes.iter().map(|v| v.progress_note)),
        distribution,
    })
}

/// Roll team summaries up into a department view. `None` for an empty set.
pub fn summarize_team_summaries(summaries: &[TeamSummary]) -> Option<Rollup> {
    if summaries.is_empty() {
        return None;
    }

    let n = summaries.len() as f64;
    let mean = |pick: fn(&TeamSummary) -> f64| summaries.iter().map(pick).sum::<f64>() / n;
    let distribution = Distribution {
        green: mean(|s| s.green_pct),
        amber: mean(|s| s.amber_pct),
        red: mean(|s| s.red_pct),
    };

    Some(Rollup {
        average_vote: classify(distribution.green, distribution.amber, distribution.red),
        progress_summary: majority_progress(summaries.iter().map(|s| s.progress_summary)),
        distribution,
    })
}

/// What a single rollup did to its stored summary.
#[derive(Debug, Clone, PartialEq)]
pub enum RollupChange<T> {
    /// The summary was inserted or replaced.
    Written(T),
    /// The source set was empty and the stale summary was deleted.
    Pruned,
    /// The source set was empty; nothing was written.
    Unchanged,
}

impl<T> RollupChange<T> {
    pub fn summary(&self) -> Option<&T> {
        match self {
            RollupChange::Written(summary) => Some(summary),
            _ => None,
        }
    }

    pub fn is_unchanged(&self) -> bool {
        matches!(self, RollupChange::Unchanged)
    }
}

/// Outcome of a team rollup, naming the department that must follow.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamUpdate {
    pub change: RollupChange<TeamSummary>,
    pub department: Option<DepartmentId>,
}

impl TeamUpdate {
    /// The department whose summary is now out of date, if any.
    pub fn affected_department(&self) -> Option<DepartmentId> {
        if self.change.is_unchanged() {
            None
        } else {
            self.department
        }
    }
}

/// Outcome of the two-step cascade run after a vote write.
#[derive(Debug, Clone, PartialEq)]
pub struct VoteRollup {
    pub team: RollupChange<TeamSummary>,
    pub department: Option<RollupChange<DepartmentSummary>>,
}

/// Tally of what a batch recompute did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RecomputeStats {
    pub written: usize,
    pub pruned: usize,
    pub unchanged: usize,
}

impl RecomputeStats {
    pub fn record<T>(&mut self, change: &RollupChange<T>) {
        match change {
            RollupChange::Written(_) => self.written += 1,
            RollupChange::Pruned => self.pruned += 1,
            RollupChange::Unchanged => self.unchanged += 1,
        }
    }

    pub fn merge(&mut self, other: RecomputeStats) {
        self.written += other.written;
        self.pruned += other.pruned;
        self.unchanged += other.unchanged;
    }
}

/// Recomputes summaries against a [`Database`].
///
/// Each rollup is one immediate transaction scoped to its key. Nothing here
/// decides which session is current; callers always pass it in.
pub struct Aggregator<'a> {
    db: &'a Database,
    options: AggregationOptions,
}

impl<'a> Aggregator<'a> {
    pub fn new(db: &'a Database, options: AggregationOptions) -> Self {
        Self { db, options }
    }

    /// Recompute the summary for (team, session, card) from all current
    /// votes of the team's members.
    ///
    /// Does not touch the department summary; the returned
    /// [`TeamUpdate::affected_department`] says which one needs refreshing.
    pub fn update_team_summary(
        &self,
        team: TeamId,
        session: SessionId,
        card: CardId,
    ) -> Result<TeamUpdate> {
        let options = self.options;
        self.db.with_transaction(|tx| {
            let department = tx.get_team(team)?.department;
            let votes = tx.team_votes(team, session, card)?;

            let change = match summarize_votes(&votes) {
                Some(rollup) => {
                    let summary = TeamSummary {
                        team,
                        session,
                        card,
                        average_vote: rollup.average_vote,
                        progress_summary: rollup.progress_summary,
                        green_pct: rollup.distribution.green,
                        amber_pct: rollup.distribution.amber,
                        red_pct: rollup.distribution.red,
                    };
                    tx.upsert_team_summary(&summary)?;
                    debug!(
                        "Team {} session {} card {}: {} from {} votes",
                        team,
                        session,
                        card,
                        summary.average_vote,
                        votes.len()
                    );
                    RollupChange::Written(summary)
                }
                None if options.prune_empty_summaries => {
                    if tx.delete_team_summary(team, session, card)? {
                        info!("Pruned empty team summary {}/{}/{}", team, session, card);
                        RollupChange::Pruned
                    } else {
                        RollupChange::Unchanged
                    }
                }
                None => RollupChange::Unchanged,
            };

            Ok(TeamUpdate { change, department })
        })
    }

    /// Recompute the summary for (department, session, card) from its teams'
    /// summaries.
    pub fn update_department_summary(
        &self,
        department: DepartmentId,
        session: SessionId,
        card: CardId,
    ) -> Result<RollupChange<DepartmentSummary>> {
        let options = self.options;
        self.db.with_transaction(|tx| {
            let team_summaries = tx.department_team_summaries(department, session, card)?;

            let change = match summarize_team_summaries(&team_summaries) {
                Some(rollup) => {
                    let summary = DepartmentSummary {
                        department,
                        session,
                        card,
                        average_vote: rollup.average_vote,
                        progress_summary: rollup.progress_summary,
                        green_pct: rollup.distribution.green,
                        amber_pct: rollup.distribution.amber,
                        red_pct: rollup.distribution.red,
                    };
                    tx.upsert_department_summary(&summary)?;
                    debug!(
                        "Department {} session {} card {}: {} from {} teams",
                        department,
                        session,
                        card,
                        summary.average_vote,
                        team_summaries.len()
                    );
                    RollupChange::Written(summary)
                }
                None if options.prune_empty_summaries => {
                    if tx.delete_department_summary(department, session, card)? {
                        info!(
                            "Pruned empty department summary {}/{}/{}",
                            department, session, card
                        );
                        RollupChange::Pruned
                    } else {
                        RollupChange::Unchanged
                    }
                }
                None => RollupChange::Unchanged,
            };

            Ok(change)
        })
    }

    /// Entry point for the vote-write path: team rollup, then the owning
    /// department's rollup when the team summary changed.
    ///
    /// Safe to call repeatedly with the same inputs.
    pub fn on_vote_written(
        &self,
        team: TeamId,
        session: SessionId,
        card: CardId,
    ) -> Result<VoteRollup> {
        let update = self.update_team_summary(team, session, card)?;
        let department = match update.affected_department() {
            Some(department) => Some(self.update_department_summary(department, session, card)?),
            None => None,
        };

        Ok(VoteRollup {
            team: update.change,
            department,
        })
    }

    /// Recompute every team summary and then every department summary for
    /// `session`, one card at a time.
    pub fn recompute_session(&self, session: SessionId) -> Result<RecomputeStats> {
        let cards = self.db.list_cards(false)?;
        let mut stats = RecomputeStats::default();

        for team in self.db.list_teams()? {
            for card in &cards {
                stats.record(&self.update_team_summary(team.id, session, card.id)?.change);
            }
        }
        for department in self.db.list_departments()? {
            for card in &cards {
                stats.record(&self.update_department_summary(department.id, session, card.id)?);
            }
        }

        info!(
            "Recomputed session {}: {} written, {} pruned, {} unchanged",
            session, stats.written, stats.pruned, stats.unchanged
        );
        Ok(stats)
    }
}

/// Percentage split of every vote on `card`, optionally within one session.
pub fn card_vote_distribution(
    db: &Database,
    card: CardId,
    session: Option<SessionId>,
) -> Result<Distribution> {
    let votes = db.card_votes(card, session)?;
    let count = |light: TrafficLight| votes.iter().filter(|v| v.value == light).count();
    Ok(Distribution::from_counts(
        count(TrafficLight::Green),
        count(TrafficLight::Amber),
        count(TrafficLight::Red),
    ))
}

/// Overall health of a team across all cards of `session`.
pub fn team_health(db: &Database, team: TeamId, session: SessionId) -> Result<Option<TrafficLight>> {
    let summaries = db.team_summaries_in_session(team, session)?;
    Ok(overall_health(summaries.iter().map(|s| s.average_vote)))
}

/// Overall health of a department across all cards of `session`.
pub fn department_health(
    db: &Database,
    department: DepartmentId,
    session: SessionId,
) -> Result<Option<TrafficLight>> {
    let summaries = db.department_summaries_in_session(department, session)?;
    Ok(overall_health(summaries.iter().map(|s| s.average_vote)))
}

/// The `n` summaries with the largest red share, then amber share.
/// Summaries with no red or amber votes are left out.
pub fn cards_needing_attention(summaries: &[TeamSummary], n: usize) -> Vec<&TeamSummary> {
    let mut concerning: Vec<_> = summaries
        .iter()
        .filter(|s| s.red_pct > 0.0 || s.amber_pct > 0.0)
        .collect();

    concerning.sort_by(|a, b| {
        b.red_pct
            .partial_cmp(&a.red_pct)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                b.amber_pct
                    .partial_cmp(&a.amber_pct)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    });
    concerning.truncate(n);

    concerning
}
