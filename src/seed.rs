//! Sample data.
//!
//! Builds a small organisation with a few months of voting history. The
//! output depends only on the anchor date, so two seeds from the same date
//! produce identical databases.

use crate::analysis::{AggregationOptions, Aggregator, RecomputeStats};
use crate::error::{HealthCheckError, Result};
use crate::models::*;
use crate::store::Database;
use chrono::{Datelike, Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info};

const DEPARTMENTS: [&str; 5] = [
    "Engineering",
    "Product",
    "Marketing",
    "Customer Support",
    "Finance",
];

const CARDS: [(&str, &str); 10] = [
    ("Team Collaboration", "How well does the team collaborate and communicate?"),
    ("Technical Quality", "How is the quality of our technical solutions and code?"),
    ("Project Management", "How well are our projects planned and executed?"),
    ("Learning & Growth", "Are we continuously learning and improving our skills?"),
    ("Customer Focus", "How well do we understand and address customer needs?"),
    ("Code Review Process", "How effective is our code review process?"),
    ("DevOps Practices", "How well are we implementing DevOps practices?"),
    ("Documentation", "How complete and useful is our documentation?"),
    ("Work-Life Balance", "How is the team's work-life balance?"),
    ("Innovation", "How well do we foster and implement innovation?"),
];

/// Closed sessions created before the current one, 30 days apart.
const PAST_SESSIONS: i64 = 3;

/// Share of possible votes that is cast.
const VOTE_RATE: f64 = 0.7;

const COMMENT_RATE: f64 = 0.5;

const NOTES: [ProgressNote; 3] = [ProgressNote::Better, ProgressNote::Same, ProgressNote::Worse];

/// What a seed run created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub departments: usize,
    pub teams: usize,
    pub users: usize,
    pub cards: usize,
    pub sessions: usize,
    pub votes: usize,
    pub rollups: RecomputeStats,
}

fn slug(name: &str) -> String {
    name.to_lowercase().replace(' ', "")
}

/// Populate an empty database and compute every summary.
///
/// Refuses to run when departments already exist.
pub fn seed_sample_data(
    db: &Database,
    today: NaiveDate,
    options: AggregationOptions,
) -> Result<SeedSummary> {
    if !db.list_departments()?.is_empty() {
        return Err(HealthCheckError::InvalidInput(
            "database already contains data; seed into an empty database".to_string(),
        ));
    }

    let mut rng = StdRng::seed_from_u64(today.num_days_from_ce() as u64);
    let mut summary = db.with_transaction(|tx| populate(tx, today, &mut rng))?;
    info!(
        "Seeded {} departments, {} teams, {} users, {} votes",
        summary.departments, summary.teams, summary.users, summary.votes
    );

    let aggregator = Aggregator::new(db, options);
    for session in db.list_sessions()? {
        summary.rollups.merge(aggregator.recompute_session(session.id)?);
    }

    Ok(summary)
}

fn populate(db: &Database, today: NaiveDate, rng: &mut StdRng) -> Result<SeedSummary> {
    let mut summary = SeedSummary::default();

    let mut cards = Vec::with_capacity(CARDS.len());
    for (order, (name, description)) in CARDS.iter().enumerate() {
        cards.push(db.insert_card(name, description, order as u32 + 1, true)?);
    }
    summary.cards = cards.len();

    let mut sessions = Vec::new();
    for months_ago in (1..=PAST_SESSIONS).rev() {
        let date = today - Duration::days(months_ago * 30);
        sessions.push(db.insert_session(
            &format!("Monthly Health Check {}", date.format("%B %Y")),
            date,
            &format!("Monthly health check session for {}", date.format("%B %Y")),
            false,
        )?);
    }
    sessions.push(db.insert_session(
        &format!("Monthly Health Check {}", today.format("%B %Y")),
        today,
        &format!("Current monthly health check session for {}", today.format("%B %Y")),
        true,
    )?);
    summary.sessions = sessions.len();

    db.insert_user("admin", Role::Admin, None, None)?;
    db.insert_user("seniormanager", Role::SeniorManager, None, None)?;
    summary.users += 2;

    let mut team_index = 0u64;
    for (d, name) in DEPARTMENTS.iter().enumerate() {
        let department = db.insert_department(
            name,
            Some(&format!(
                "{} department responsible for {} activities.",
                name,
                name.to_lowercase()
            )),
        )?;
        db.insert_user(
            &format!("deptleader_{}", slug(name)),
            Role::DepartmentLeader,
            Some(department.id),
            None,
        )?;
        summary.departments += 1;
        summary.users += 1;

        let team_count = 2 + d % 2;
        for t in 1..=team_count {
            team_index += 1;
            let team_name = format!("{} Team {}", name, t);
            let team = db.insert_team(
                &team_name,
                Some(&format!("Team {} in the {} department.", t, name)),
                Some(department.id),
            )?;
            summary.teams += 1;

            db.insert_user(
                &format!("teamleader_{}", slug(&team_name)),
                Role::TeamLeader,
                Some(department.id),
                Some(team.id),
            )?;
            summary.users += 1;

            let engineers = 3 + (team_index % 3);
            for e in 1..=engineers {
                let engineer = db.insert_user(
                    &format!("engineer_{}_{}", slug(&team_name), e),
                    Role::Engineer,
                    Some(department.id),
                    Some(team.id),
                )?;
                summary.users += 1;
                summary.votes += cast_votes(db, rng, &engineer, &sessions, &cards)?;
            }
            debug!("Seeded team '{}' with {} engineers", team_name, engineers);
        }
    }

    Ok(summary)
}

fn cast_votes(
    db: &Database,
    rng: &mut StdRng,
    engineer: &User,
    sessions: &[Session],
    cards: &[Card],
) -> Result<usize> {
    let mut cast = 0;
    for session in sessions {
        for card in cards {
            if !rng.gen_bool(VOTE_RATE) {
                continue;
            }

            let value = TrafficLight::ALL[rng.gen_range(0..TrafficLight::ALL.len())];
            let note = NOTES[rng.gen_range(0..NOTES.len())];
            let comment = rng
                .gen_bool(COMMENT_RATE)
                .then(|| format!("Automated sample comment for {}", card.name));

            db.upsert_vote(engineer.id, card.id, session.id, value, note, comment.as_deref())?;
            cast += 1;
        }
    }
    Ok(cast)
}
