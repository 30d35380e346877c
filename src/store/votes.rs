//! Individual votes.

use super::codec::*;
use super::Database;
use crate::error::{HealthCheckError, Result};
use crate::models::*;
use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension};

impl Database {
    /// Insert or overwrite the vote keyed by (user, card, session).
    ///
    /// A user holds at most one vote per card per session; re-voting replaces
    /// value, progress note and comment in place.
    pub fn upsert_vote(
        &self,
        user: UserId,
        card: CardId,
        session: SessionId,
        value: TrafficLight,
        progress_note: ProgressNote,
        comment: Option<&str>,
    ) -> Result<Vote> {
        self.conn.execute(
            "INSERT INTO votes (user_id, card_id, session_id, value, progress_note, comment)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (user_id, card_id, session_id) DO UPDATE SET
                value = excluded.value,
                progress_note = excluded.progress_note,
                comment = excluded.comment,
                updated_at = datetime('now')",
            params![user, card, session, value, progress_note, comment],
        )?;

        self.get_vote(user, card, session)?
            .ok_or_else(|| HealthCheckError::not_found("vote", format!("{}/{}/{}", user, card, session)))
    }

    pub fn get_vote(&self, user: UserId, card: CardId, session: SessionId) -> Result<Option<Vote>> {
        Ok(self
            .conn
            .query_row(
                "SELECT * FROM votes WHERE user_id = ?1 AND card_id = ?2 AND session_id = ?3",
                params![user, card, session],
                vote_from_row,
            )
            .optional()?)
    }

    /// Number of vote rows for one (user, card, session) key.
    pub fn count_votes(&self, user: UserId, card: CardId, session: SessionId) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM votes WHERE user_id = ?1 AND card_id = ?2 AND session_id = ?3",
            params![user, card, session],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Current votes cast on `card` in `session` by members of `team`.
    pub fn team_votes(&self, team: TeamId, session: SessionId, card: CardId) -> Result<Vec<Vote>> {
        let mut stmt = self.conn.prepare(
            "SELECT v.* FROM votes v
             JOIN users u ON u.id = v.user_id
             WHERE u.team_id = ?1 AND v.session_id = ?2 AND v.card_id = ?3
             ORDER BY v.id",
        )?;
        let rows = stmt.query_map(params![team, session, card], vote_from_row)?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    /// Every vote on `card`, optionally limited to one session.
    pub fn card_votes(&self, card: CardId, session: Option<SessionId>) -> Result<Vec<Vote>> {
        let mut stmt = self.conn.prepare(
            "SELECT * FROM votes
             WHERE card_id = ?1 AND (?2 IS NULL OR session_id = ?2)
             ORDER BY id",
        )?;
        let rows = stmt.query_map(params![card, session], vote_from_row)?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    /// Number of distinct cards `user` voted on in `session`.
    pub fn user_vote_count(&self, user: UserId, session: SessionId) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(DISTINCT card_id) FROM votes WHERE user_id = ?1 AND session_id = ?2",
            params![user, session],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Votes `user` cast in the active cards of `session`.
    pub fn user_active_card_votes(&self, user: UserId, session: SessionId) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM votes v
             JOIN cards c ON c.id = v.card_id
             WHERE v.user_id = ?1 AND v.session_id = ?2 AND c.active = 1",
            params![user, session],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    pub fn has_voted_in_session(&self, user: UserId, session: SessionId) -> Result<bool> {
        Ok(self.user_vote_count(user, session)? > 0)
    }

    /// Distinct voters in `session`, regardless of role or team.
    pub fn count_distinct_voters(&self, session: SessionId) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(DISTINCT user_id) FROM votes WHERE session_id = ?1",
            [session],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// The same user's vote on the same card in the newest session dated
    /// strictly before `before`.
    pub fn previous_vote(&self, user: UserId, card: CardId, before: NaiveDate) -> Result<Option<Vote>> {
        Ok(self
            .conn
            .query_row(
                "SELECT v.* FROM votes v
                 JOIN sessions s ON s.id = v.session_id
                 WHERE v.user_id = ?1 AND v.card_id = ?2 AND s.date < ?3
                 ORDER BY s.date DESC, s.id DESC
                 LIMIT 1",
                params![user, card, before],
                vote_from_row,
            )
            .optional()?)
    }
}
