//! Session reports.
//!
//! A [`SessionReport`] is a read-only snapshot of the stored summaries for
//! one session, decorated with trends and participation. The generator turns
//! it into Markdown or JSON.

pub mod generator;

pub use generator::{generate_json_report, generate_markdown_report, render, write_report};

use crate::analysis::{self, calculate_trend, cards_needing_attention};
use crate::error::Result;
use crate::models::*;
use crate::store::{Database, Population};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

/// Number of rows in the "needs attention" table.
const ATTENTION_ROWS: usize = 5;

/// What to include in a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    pub include_trends: bool,
    pub include_participation: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            include_trends: true,
            include_participation: true,
        }
    }
}

impl From<&crate::config::ReportConfig> for ReportOptions {
    fn from(config: &crate::config::ReportConfig) -> Self {
        Self {
            include_trends: config.include_trends,
            include_participation: config.include_participation,
        }
    }
}

/// Metadata about the report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    pub session: Session,
    pub generated_at: DateTime<Utc>,
    /// Share of all users who voted, when participation is included.
    pub participation_pct: Option<f64>,
    pub session_complete: bool,
    pub teams_reported: usize,
    pub departments_reported: usize,
}

/// One card's summary within a team or department.
#[derive(Debug, Clone, Serialize)]
pub struct CardRow {
    pub card_id: CardId,
    pub card: String,
    pub average_vote: TrafficLight,
    pub progress_summary: ProgressNote,
    pub distribution: Distribution,
    pub trend: Option<Trend>,
}

/// A team or department with its per-card rows.
#[derive(Debug, Clone, Serialize)]
pub struct EntityReport {
    pub id: i64,
    pub name: String,
    pub health: Option<TrafficLight>,
    pub participation_pct: Option<f64>,
    pub cards: Vec<CardRow>,
}

/// A (team, card) pair with a large red or amber share.
#[derive(Debug, Clone, Serialize)]
pub struct AttentionRow {
    pub team: String,
    pub card: String,
    pub average_vote: TrafficLight,
    pub red_pct: f64,
    pub amber_pct: f64,
}

/// The complete session report.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub metadata: ReportMetadata,
    pub teams: Vec<EntityReport>,
    pub departments: Vec<EntityReport>,
    pub needs_attention: Vec<AttentionRow>,
}

impl SessionReport {
    /// True when any team card sits at or below `threshold`.
    pub fn breaches(&self, threshold: TrafficLight) -> bool {
        self.teams
            .iter()
            .flat_map(|team| &team.cards)
            .any(|row| row.average_vote.at_or_below(threshold))
    }
}

/// Build the report for `session` from stored summaries. Teams and
/// departments without any summary in the session are left out.
pub fn build_session_report(
    db: &Database,
    session: SessionId,
    options: ReportOptions,
) -> Result<SessionReport> {
    let session = db.get_session(session)?;
    let card_names: HashMap<CardId, String> = db
        .list_cards(false)?
        .into_iter()
        .map(|card| (card.id, card.name))
        .collect();
    let card_name = |id: CardId| card_names.get(&id).cloned().unwrap_or_else(|| id.to_string());

    let mut teams = Vec::new();
    let mut team_summaries = Vec::new();
    let mut team_names = HashMap::new();
    for team in db.list_teams()? {
        let summaries = db.team_summaries_in_session(team.id, session.id)?;
        if summaries.is_empty() {
            continue;
        }

        let mut cards = Vec::with_capacity(summaries.len());
        for summary in &summaries {
            cards.push(CardRow {
                card_id: summary.card,
                card: card_name(summary.card),
                average_vote: summary.average_vote,
                progress_summary: summary.progress_summary,
                distribution: summary.distribution(),
                trend: trend_if(options, db, summary)?,
            });
        }

        teams.push(EntityReport {
            id: team.id.0,
            name: team.name.clone(),
            health: analysis::overall_health(summaries.iter().map(|s| s.average_vote)),
            participation_pct: participation_if(options, db, session.id, Population::Team(team.id))?,
            cards,
        });
        team_names.insert(team.id, team.name);
        team_summaries.extend(summaries);
    }

    let mut departments = Vec::new();
    for department in db.list_departments()? {
        let summaries = db.department_summaries_in_session(department.id, session.id)?;
        if summaries.is_empty() {
            continue;
        }

        let mut cards = Vec::with_capacity(summaries.len());
        for summary in &summaries {
            cards.push(CardRow {
                card_id: summary.card,
                card: card_name(summary.card),
                average_vote: summary.average_vote,
                progress_summary: summary.progress_summary,
                distribution: summary.distribution(),
                trend: trend_if(options, db, summary)?,
            });
        }

        departments.push(EntityReport {
            id: department.id.0,
            name: department.name,
            health: analysis::overall_health(summaries.iter().map(|s| s.average_vote)),
            participation_pct: participation_if(
                options,
                db,
                session.id,
                Population::Department(department.id),
            )?,
            cards,
        });
    }

    let needs_attention = cards_needing_attention(&team_summaries, ATTENTION_ROWS)
        .into_iter()
        .map(|s| AttentionRow {
            team: team_names.get(&s.team).cloned().unwrap_or_else(|| s.team.to_string()),
            card: card_name(s.card),
            average_vote: s.average_vote,
            red_pct: s.red_pct,
            amber_pct: s.amber_pct,
        })
        .collect();

    let metadata = ReportMetadata {
        participation_pct: participation_if(options, db, session.id, Population::All)?,
        session_complete: analysis::is_session_complete(db, session.id)?,
        generated_at: Utc::now(),
        teams_reported: teams.len(),
        departments_reported: departments.len(),
        session,
    };
    debug!(
        "Built report for session {}: {} teams, {} departments",
        metadata.session.id, metadata.teams_reported, metadata.departments_reported
    );

    Ok(SessionReport {
        metadata,
        teams,
        departments,
        needs_attention,
    })
}

fn trend_if<T: analysis::Trended>(
    options: ReportOptions,
    db: &Database,
    summary: &T,
) -> Result<Option<Trend>> {
    if options.include_trends {
        calculate_trend(db, summary)
    } else {
        Ok(None)
    }
}

fn participation_if(
    options: ReportOptions,
    db: &Database,
    session: SessionId,
    population: Population,
) -> Result<Option<f64>> {
    if options.include_participation {
        analysis::participation_rate(db, session, population).map(Some)
    } else {
        Ok(None)
    }
}
