//! The vote-write path.

use crate::analysis::{AggregationOptions, Aggregator, VoteRollup};
use crate::error::{HealthCheckError, Result};
use crate::models::*;
use crate::store::Database;
use serde::Serialize;
use tracing::{info, warn};

/// A vote to record.
#[derive(Debug, Clone)]
pub struct Ballot<'a> {
    pub user: UserId,
    pub card: CardId,
    pub session: SessionId,
    pub value: TrafficLight,
    pub progress_note: ProgressNote,
    pub comment: Option<&'a str>,
}

/// What a submitted vote changed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoteReceipt {
    pub vote: Vote,
    /// Team summary now stored for the vote's key, if the voter has a team.
    pub team_summary: Option<TeamSummary>,
    /// Department summary now stored for the vote's key, if it was refreshed.
    pub department_summary: Option<DepartmentSummary>,
}

/// Record `ballot`, replacing any earlier vote on the same key, then refresh
/// the voter's team summary and its department.
///
/// The vote is committed before aggregation runs. If aggregation fails the
/// vote stays and the error is returned; re-running the rollup repairs the
/// summaries.
pub fn submit_vote(
    db: &Database,
    options: AggregationOptions,
    ballot: &Ballot<'_>,
) -> Result<VoteReceipt> {
    let user = db.get_user(ballot.user)?;
    let card = db.get_card(ballot.card)?;
    let session = db.get_session(ballot.session)?;

    if !card.active {
        return Err(HealthCheckError::InvalidInput(format!(
            "card '{}' is not active",
            card.name
        )));
    }
    if !session.is_active {
        warn!("Recording vote in inactive session '{}'", session.name);
    }

    let vote = db.upsert_vote(
        user.id,
        card.id,
        session.id,
        ballot.value,
        ballot.progress_note,
        ballot.comment,
    )?;
    info!(
        "{} voted {} ({}) on '{}' in '{}'",
        user.username, vote.value, vote.progress_note, card.name, session.name
    );

    let Some(team) = user.team else {
        return Ok(VoteReceipt {
            vote,
            team_summary: None,
            department_summary: None,
        });
    };

    let VoteRollup { team: change, department } =
        Aggregator::new(db, options).on_vote_written(team, session.id, card.id)?;

    Ok(VoteReceipt {
        vote,
        team_summary: change.summary().cloned(),
        department_summary: department.and_then(|d| d.summary().cloned()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_utils::*;

    fn ballot(user: &User, fx: &Fixture, session: &Session, value: TrafficLight) -> Ballot<'static> {
        Ballot {
            user: user.id,
            card: fx.card.id,
            session: session.id,
            value,
            progress_note: ProgressNote::Same,
            comment: None,
        }
    }

    #[test]
    fn test_submit_vote_refreshes_summaries() {
        let fx = Fixture::new();
        let session = fx.session("S1", "2024-01-01");
        let user = &fx.members(&fx.team, 1)[0];

        let receipt = submit_vote(
            &fx.db,
            AggregationOptions::default(),
            &ballot(user, &fx, &session, TrafficLight::Amber),
        )
        .unwrap();

        assert_eq!(receipt.vote.value, TrafficLight::Amber);
        assert_eq!(receipt.team_summary.unwrap().amber_pct, 100.0);
        assert_eq!(
            receipt.department_summary.unwrap().average_vote,
            TrafficLight::Amber
        );
    }

    #[test]
    fn test_revote_keeps_one_row() {
        let fx = Fixture::new();
        let session = fx.session("S1", "2024-01-01");
        let user = &fx.members(&fx.team, 1)[0];
        let options = AggregationOptions::default();

        submit_vote(&fx.db, options, &ballot(user, &fx, &session, TrafficLight::Green)).unwrap();
        let receipt =
            submit_vote(&fx.db, options, &ballot(user, &fx, &session, TrafficLight::Red)).unwrap();

        assert_eq!(fx.db.count_votes(user.id, fx.card.id, session.id).unwrap(), 1);
        assert_eq!(receipt.team_summary.unwrap().average_vote, TrafficLight::Red);
    }

    #[test]
    fn test_user_without_team_writes_vote_only() {
        let fx = Fixture::new();
        let session = fx.session("S1", "2024-01-01");
        let manager = fx
            .db
            .insert_user("manager", Role::SeniorManager, None, None)
            .unwrap();

        let receipt = submit_vote(
            &fx.db,
            AggregationOptions::default(),
            &ballot(&manager, &fx, &session, TrafficLight::Green),
        )
        .unwrap();

        assert!(receipt.team_summary.is_none());
        assert!(receipt.department_summary.is_none());
        assert!(fx.db.has_voted_in_session(manager.id, session.id).unwrap());
    }

    #[test]
    fn test_inactive_card_is_rejected() {
        let fx = Fixture::new();
        let session = fx.session("S1", "2024-01-01");
        let user = &fx.members(&fx.team, 1)[0];
        let retired = fx.db.insert_card("Retired", "", 9, false).unwrap();

        let mut b = ballot(user, &fx, &session, TrafficLight::Green);
        b.card = retired.id;
        let err = submit_vote(&fx.db, AggregationOptions::default(), &b).unwrap_err();

        assert!(matches!(err, HealthCheckError::InvalidInput(_)));
        assert!(!fx.db.has_voted_in_session(user.id, session.id).unwrap());
    }

    #[test]
    fn test_unknown_user_is_not_found() {
        let fx = Fixture::new();
        let session = fx.session("S1", "2024-01-01");
        let ghost = User {
            id: UserId(999),
            username: "ghost".to_string(),
            role: Role::Engineer,
            department: None,
            team: None,
        };

        let err = submit_vote(
            &fx.db,
            AggregationOptions::default(),
            &ballot(&ghost, &fx, &session, TrafficLight::Green),
        )
        .unwrap_err();
        assert!(err.is_not_found());
    }
}
