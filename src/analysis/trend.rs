//! Session-over-session trends.
//!
//! "Previous" always means the newest session dated strictly before the
//! current one that holds a row for the same entity and card. Sessions in
//! between with nothing recorded are skipped.

use crate::analysis::classifier::classify_trend;
use crate::error::Result;
use crate::models::*;
use crate::store::Database;
use chrono::NaiveDate;

/// Something with a level in one session that can be compared against its
/// own earlier occurrence.
pub trait Trended: Sized {
    fn level(&self) -> TrafficLight;

    fn session(&self) -> SessionId;

    /// Newest occurrence for the same entity and card dated before `before`.
    fn find_previous(&self, db: &Database, before: NaiveDate) -> Result<Option<Self>>;
}

impl Trended for TeamSummary {
    fn level(&self) -> TrafficLight {
        self.average_vote
    }

    fn session(&self) -> SessionId {
        self.session
    }

    fn find_previous(&self, db: &Database, before: NaiveDate) -> Result<Option<Self>> {
        find_previous_team_summary(db, self.team, self.card, before)
    }
}

impl Trended for DepartmentSummary {
    fn level(&self) -> TrafficLight {
        self.average_vote
    }

    fn session(&self) -> SessionId {
        self.session
    }

    fn find_previous(&self, db: &Database, before: NaiveDate) -> Result<Option<Self>> {
        find_previous_department_summary(db, self.department, self.card, before)
    }
}

impl Trended for Vote {
    fn level(&self) -> TrafficLight {
        self.value
    }

    fn session(&self) -> SessionId {
        self.session
    }

    fn find_previous(&self, db: &Database, before: NaiveDate) -> Result<Option<Self>> {
        find_previous_vote(db, self.user, self.card, before)
    }
}

pub fn find_previous_team_summary(
    db: &Database,
    team: TeamId,
    card: CardId,
    before: NaiveDate,
) -> Result<Option<TeamSummary>> {
    db.previous_team_summary(team, card, before)
}

pub fn find_previous_department_summary(
    db: &Database,
    department: DepartmentId,
    card: CardId,
    before: NaiveDate,
) -> Result<Option<DepartmentSummary>> {
    db.previous_department_summary(department, card, before)
}

pub fn find_previous_vote(
    db: &Database,
    user: UserId,
    card: CardId,
    before: NaiveDate,
) -> Result<Option<Vote>> {
    db.previous_vote(user, card, before)
}

fn previous_of<T: Trended>(db: &Database, item: &T) -> Result<Option<T>> {
    let session = db.get_session(item.session())?;
    item.find_previous(db, session.date)
}

/// Trend of a summary against its previous occurrence. `None` when there is
/// nothing earlier to compare with.
pub fn calculate_trend<T: Trended>(db: &Database, item: &T) -> Result<Option<Trend>> {
    let previous = previous_of(db, item)?;
    Ok(classify_trend(item.level(), previous.map(|p| p.level())))
}

/// Trend of a single user's vote on a card.
pub fn vote_trend(db: &Database, vote: &Vote) -> Result<Option<Trend>> {
    calculate_trend(db, vote)
}

/// Whether `vote` scores strictly higher than the same user's previous vote
/// on the same card. `None` without a previous vote.
pub fn has_improved(db: &Database, vote: &Vote) -> Result<Option<bool>> {
    let previous = previous_of(db, vote)?;
    Ok(previous.map(|p| vote.value.score() > p.value.score()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::aggregator::{AggregationOptions, Aggregator};
    use crate::store::test_utils::*;
    use ProgressNote::*;
    use TrafficLight::*;

    #[test]
    fn test_trend_without_history_is_none() {
        let fx = Fixture::new();
        let session = fx.session("S1", "2024-01-01");
        for user in fx.members(&fx.team, 2) {
            fx.vote(&user, &session, Green, Same);
        }
        let rollup = Aggregator::new(&fx.db, AggregationOptions::default())
            .on_vote_written(fx.team.id, session.id, fx.card.id)
            .unwrap();

        let summary = rollup.team.summary().unwrap();
        assert_eq!(calculate_trend(&fx.db, summary).unwrap(), None);
    }

    #[test]
    fn test_declining_then_stable_team_trend() {
        let fx = Fixture::new();
        let aggregator = Aggregator::new(&fx.db, AggregationOptions::default());
        let members = fx.members(&fx.team, 3);
        let s1 = fx.session("S1", "2024-01-01");
        let s2 = fx.session("S2", "2024-02-01");
        let s3 = fx.session("S3", "2024-03-01");

        for (user, value) in members.iter().zip([Green, Green, Amber]) {
            fx.vote(user, &s1, value, Better);
        }
        for session in [&s2, &s3] {
            for (user, value) in members.iter().zip([Red, Red, Amber]) {
                fx.vote(user, session, value, Worse);
            }
        }
        for session in [&s1, &s2, &s3] {
            aggregator.on_vote_written(fx.team.id, session.id, fx.card.id).unwrap();
        }

        let second = fx.db.get_team_summary(fx.team.id, s2.id, fx.card.id).unwrap().unwrap();
        assert_eq!(calculate_trend(&fx.db, &second).unwrap(), Some(Trend::Declining));

        let third = fx.db.get_team_summary(fx.team.id, s3.id, fx.card.id).unwrap().unwrap();
        assert_eq!(calculate_trend(&fx.db, &third).unwrap(), Some(Trend::Stable));

        let dept = fx
            .db
            .get_department_summary(fx.department.id, s2.id, fx.card.id)
            .unwrap()
            .unwrap();
        assert_eq!(calculate_trend(&fx.db, &dept).unwrap(), Some(Trend::Declining));
    }

    #[test]
    fn test_previous_skips_sessions_without_summary() {
        let fx = Fixture::new();
        let aggregator = Aggregator::new(&fx.db, AggregationOptions::default());
        let user = &fx.members(&fx.team, 1)[0];
        let s1 = fx.session("S1", "2024-01-01");
        let _quiet = fx.session("S2", "2024-02-01");
        let s3 = fx.session("S3", "2024-03-01");

        fx.vote(user, &s1, Red, Worse);
        fx.vote(user, &s3, Green, Better);
        aggregator.on_vote_written(fx.team.id, s1.id, fx.card.id).unwrap();
        aggregator.on_vote_written(fx.team.id, s3.id, fx.card.id).unwrap();

        let previous = find_previous_team_summary(&fx.db, fx.team.id, fx.card.id, s3.date)
            .unwrap()
            .unwrap();
        assert_eq!(previous.session, s1.id);

        let current = fx.db.get_team_summary(fx.team.id, s3.id, fx.card.id).unwrap().unwrap();
        assert_eq!(calculate_trend(&fx.db, &current).unwrap(), Some(Trend::Improving));
    }

    #[test]
    fn test_vote_level_trend_and_improvement() {
        let fx = Fixture::new();
        let user = &fx.members(&fx.team, 1)[0];
        let s1 = fx.session("S1", "2024-01-01");
        let s2 = fx.session("S2", "2024-02-01");
        let s3 = fx.session("S3", "2024-03-01");

        fx.vote(user, &s1, Amber, Same);
        fx.vote(user, &s2, Green, Better);
        fx.vote(user, &s3, Green, Same);

        let first = fx.db.get_vote(user.id, fx.card.id, s1.id).unwrap().unwrap();
        let second = fx.db.get_vote(user.id, fx.card.id, s2.id).unwrap().unwrap();
        let third = fx.db.get_vote(user.id, fx.card.id, s3.id).unwrap().unwrap();

        assert_eq!(has_improved(&fx.db, &first).unwrap(), None);
        assert_eq!(has_improved(&fx.db, &second).unwrap(), Some(true));
        assert_eq!(has_improved(&fx.db, &third).unwrap(), Some(false));
        assert_eq!(vote_trend(&fx.db, &second).unwrap(), Some(Trend::Improving));
        assert_eq!(vote_trend(&fx.db, &third).unwrap(), Some(Trend::Stable));
    }
}
