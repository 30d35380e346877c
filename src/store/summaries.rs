//! Derived team and department summaries.

use super::codec::*;
use super::Database;
use crate::error::Result;
use crate::models::*;
use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension};

impl Database {
    /// Insert or replace the summary keyed by (team, session, card).
    pub fn upsert_team_summary(&self, summary: &TeamSummary) -> Result<()> {
        self.conn.execute(
            "INSERT INTO team_summaries
                (team_id, session_id, card_id, average_vote, progress_summary,
                 green_percentage, amber_percentage, red_percentage)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT (team_id, session_id, card_id) DO UPDATE SET
                average_vote = excluded.average_vote,
                progress_summary = excluded.progress_summary,
                green_percentage = excluded.green_percentage,
                amber_percentage = excluded.amber_percentage,
                red_percentage = excluded.red_percentage,
                updated_at = datetime('now')",
            params![
                summary.team,
                summary.session,
                summary.card,
                summary.average_vote,
                summary.progress_summary,
                summary.green_pct,
                summary.amber_pct,
                summary.red_pct,
            ],
        )?;
        Ok(())
    }

    /// Returns true if a row was removed.
    pub fn delete_team_summary(&self, team: TeamId, session: SessionId, card: CardId) -> Result<bool> {
        let removed = self.conn.execute(
            "DELETE FROM team_summaries WHERE team_id = ?1 AND session_id = ?2 AND card_id = ?3",
            params![team, session, card],
        )?;
        Ok(removed > 0)
    }

    pub fn get_team_summary(
        &self,
        team: TeamId,
        session: SessionId,
        card: CardId,
    ) -> Result<Option<TeamSummary>> {
        Ok(self
            .conn
            .query_row(
                "SELECT * FROM team_summaries WHERE team_id = ?1 AND session_id = ?2 AND card_id = ?3",
                params![team, session, card],
                team_summary_from_row,
            )
            .optional()?)
    }

    /// All of a team's summaries in one session, in card display order.
    pub fn team_summaries_in_session(&self, team: TeamId, session: SessionId) -> Result<Vec<TeamSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT ts.* FROM team_summaries ts
             JOIN cards c ON c.id = ts.card_id
             WHERE ts.team_id = ?1 AND ts.session_id = ?2
             ORDER BY c.display_order, c.id",
        )?;
        let rows = stmt.query_map(params![team, session], team_summary_from_row)?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    /// Summaries of every team in `department` for one (session, card).
    pub fn department_team_summaries(
        &self,
        department: DepartmentId,
        session: SessionId,
        card: CardId,
    ) -> Result<Vec<TeamSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT ts.* FROM team_summaries ts
             JOIN teams t ON t.id = ts.team_id
             WHERE t.department_id = ?1 AND ts.session_id = ?2 AND ts.card_id = ?3
             ORDER BY ts.team_id",
        )?;
        let rows = stmt.query_map(params![department, session, card], team_summary_from_row)?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    /// The team's summary for `card` in the newest session dated strictly
    /// before `before`. Sessions without a summary are skipped.
    pub fn previous_team_summary(
        &self,
        team: TeamId,
        card: CardId,
        before: NaiveDate,
    ) -> Result<Option<TeamSummary>> {
        Ok(self
            .conn
            .query_row(
                "SELECT ts.* FROM team_summaries ts
                 JOIN sessions s ON s.id = ts.session_id
                 WHERE ts.team_id = ?1 AND ts.card_id = ?2 AND s.date < ?3
                 ORDER BY s.date DESC, s.id DESC
                 LIMIT 1",
                params![team, card, before],
                team_summary_from_row,
            )
            .optional()?)
    }

    /// Insert or replace the summary keyed by (department, session, card).
    pub fn upsert_department_summary(&self, summary: &DepartmentSummary) -> Result<()> {
        self.conn.execute(
            "INSERT INTO department_summaries
                (department_id, session_id, card_id, average_vote, progress_summary,
                 green_percentage, amber_percentage, red_percentage)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT (department_id, session_id, card_id) DO UPDATE SET
                average_vote = excluded.average_vote,
                progress_summary = excluded.progress_summary,
                green_percentage = excluded.green_percentage,
                amber_percentage = excluded.amber_percentage,
                red_percentage = excluded.red_percentage,
                updated_at = datetime('now')",
            params![
                summary.department,
                summary.session,
                summary.card,
                summary.average_vote,
                summary.progress_summary,
                summary.green_pct,
                summary.amber_pct,
                summary.red_pct,
            ],
        )?;
        Ok(())
    }

    pub fn delete_department_summary(
        &self,
        department: DepartmentId,
        session: SessionId,
        card: CardId,
    ) -> Result<bool> {
        let removed = self.conn.execute(
            "DELETE FROM department_summaries
             WHERE department_id = ?1 AND session_id = ?2 AND card_id = ?3",
            params![department, session, card],
        )?;
        Ok(removed > 0)
    }

    pub fn get_department_summary(
        &self,
        department: DepartmentId,
        session: SessionId,
        card: CardId,
    ) -> Result<Option<DepartmentSummary>> {
        Ok(self
            .conn
            .query_row(
                "SELECT * FROM department_summaries
                 WHERE department_id = ?1 AND session_id = ?2 AND card_id = ?3",
                params![department, session, card],
                department_summary_from_row,
            )
            .optional()?)
    }

    pub fn department_summaries_in_session(
        &self,
        department: DepartmentId,
        session: SessionId,
    ) -> Result<Vec<DepartmentSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT ds.* FROM department_summaries ds
             JOIN cards c ON c.id = ds.card_id
             WHERE ds.department_id = ?1 AND ds.session_id = ?2
             ORDER BY c.display_order, c.id",
        )?;
        let rows = stmt.query_map(params![department, session], department_summary_from_row)?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    pub fn previous_department_summary(
        &self,
        department: DepartmentId,
        card: CardId,
        before: NaiveDate,
    ) -> Result<Option<DepartmentSummary>> {
        Ok(self
            .conn
            .query_row(
                "SELECT ds.* FROM department_summaries ds
                 JOIN sessions s ON s.id = ds.session_id
                 WHERE ds.department_id = ?1 AND ds.card_id = ?2 AND s.date < ?3
                 ORDER BY s.date DESC, s.id DESC
                 LIMIT 1",
                params![department, card, before],
                department_summary_from_row,
            )
            .optional()?)
    }
}
