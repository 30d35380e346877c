//! Conversions between domain types and SQLite values.

use crate::models::*;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::Row;

macro_rules! sql_id {
    ($($name:ty),* $(,)?) => {
        $(
            impl ToSql for $name {
                fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                    Ok(ToSqlOutput::from(self.0))
                }
            }

            impl FromSql for $name {
                fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                    i64::column_result(value).map(Self)
                }
            }
        )*
    };
}

sql_id!(DepartmentId, TeamId, UserId, SessionId, CardId, VoteId);

macro_rules! sql_text_enum {
    ($($name:ty),* $(,)?) => {
        $(
            impl ToSql for $name {
                fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                    Ok(ToSqlOutput::from(self.as_str()))
                }
            }

            impl FromSql for $name {
                fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                    value
                        .as_str()?
                        .parse()
                        .map_err(|e: String| FromSqlError::Other(e.into()))
                }
            }
        )*
    };
}

sql_text_enum!(TrafficLight, ProgressNote, Role);

pub(super) fn department_from_row(row: &Row<'_>) -> rusqlite::Result<Department> {
    Ok(Department {
        id: row.get("id")?,
        name: row.get("name")?,
        description: row.get("description")?,
    })
}

pub(super) fn team_from_row(row: &Row<'_>) -> rusqlite::Result<Team> {
    Ok(Team {
        id: row.get("id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        department: row.get("department_id")?,
    })
}

pub(super) fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get("id")?,
        username: row.get("username")?,
        role: row.get("role")?,
        department: row.get("department_id")?,
        team: row.get("team_id")?,
    })
}

pub(super) fn session_from_row(row: &Row<'_>) -> rusqlite::Result<Session> {
    Ok(Session {
        id: row.get("id")?,
        name: row.get("name")?,
        date: row.get("date")?,
        description: row.get("description")?,
        is_active: row.get("is_active")?,
    })
}

pub(super) fn card_from_row(row: &Row<'_>) -> rusqlite::Result<Card> {
    Ok(Card {
        id: row.get("id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        order: row.get("display_order")?,
        active: row.get("active")?,
    })
}

pub(super) fn vote_from_row(row: &Row<'_>) -> rusqlite::Result<Vote> {
    Ok(Vote {
        id: row.get("id")?,
        user: row.get("user_id")?,
        card: row.get("card_id")?,
        session: row.get("session_id")?,
        value: row.get("value")?,
        progress_note: row.get("progress_note")?,
        comment: row.get("comment")?,
    })
}

pub(super) fn team_summary_from_row(row: &Row<'_>) -> rusqlite::Result<TeamSummary> {
    Ok(TeamSummary {
        team: row.get("team_id")?,
        session: row.get("session_id")?,
        card: row.get("card_id")?,
        average_vote: row.get("average_vote")?,
        progress_summary: row.get("progress_summary")?,
        green_pct: row.get("green_percentage")?,
        amber_pct: row.get("amber_percentage")?,
        red_pct: row.get("red_percentage")?,
    })
}

pub(super) fn department_summary_from_row(row: &Row<'_>) -> rusqlite::Result<DepartmentSummary> {
    Ok(DepartmentSummary {
        department: row.get("department_id")?,
        session: row.get("session_id")?,
        card: row.get("card_id")?,
        average_vote: row.get("average_vote")?,
        progress_summary: row.get("progress_summary")?,
        green_pct: row.get("green_percentage")?,
        amber_pct: row.get("amber_percentage")?,
        red_pct: row.get("red_percentage")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_unknown_enum_text_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        let result: rusqlite::Result<TrafficLight> =
            conn.query_row("SELECT 'purple'", [], |row| row.get(0));
        assert!(result.is_err());

        let ok: TrafficLight = conn.query_row("SELECT 'amber'", [], |row| row.get(0)).unwrap();
        assert_eq!(ok, TrafficLight::Amber);
    }
}
