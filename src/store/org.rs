//! Organisation hierarchy, sessions and cards.

use super::codec::*;
use super::Database;
use crate::error::{HealthCheckError, Result};
use crate::models::*;
use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension};

/// Which users count towards a participation figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Population {
    All,
    Team(TeamId),
    Department(DepartmentId),
}

impl Population {
    /// SQL predicate over a `users` row aliased `u`, with the scope id bound
    /// as the last parameter when present.
    fn user_predicate(&self) -> &'static str {
        match self {
            Population::All => "1 = 1",
            Population::Team(_) => "u.team_id = ?2",
            Population::Department(_) => "u.department_id = ?2",
        }
    }

    fn scope_id(&self) -> Option<i64> {
        match self {
            Population::All => None,
            Population::Team(id) => Some(id.0),
            Population::Department(id) => Some(id.0),
        }
    }
}

impl Database {
    pub fn insert_department(&self, name: &str, description: Option<&str>) -> Result<Department> {
        self.conn.execute(
            "INSERT INTO departments (name, description) VALUES (?1, ?2)",
            params![name, description],
        )?;
        self.get_department(DepartmentId(self.conn.last_insert_rowid()))
    }

    pub fn insert_team(
        &self,
        name: &str,
        description: Option<&str>,
        department: Option<DepartmentId>,
    ) -> Result<Team> {
        self.conn.execute(
            "INSERT INTO teams (name, description, department_id) VALUES (?1, ?2, ?3)",
            params![name, description, department],
        )?;
        self.get_team(TeamId(self.conn.last_insert_rowid()))
    }

    pub fn insert_user(
        &self,
        username: &str,
        role: Role,
        department: Option<DepartmentId>,
        team: Option<TeamId>,
    ) -> Result<User> {
        self.conn.execute(
            "INSERT INTO users (username, role, department_id, team_id) VALUES (?1, ?2, ?3, ?4)",
            params![username, role, department, team],
        )?;
        self.get_user(UserId(self.conn.last_insert_rowid()))
    }

    pub fn insert_session(
        &self,
        name: &str,
        date: NaiveDate,
        description: &str,
        is_active: bool,
    ) -> Result<Session> {
        self.conn.execute(
            "INSERT INTO sessions (name, date, description, is_active) VALUES (?1, ?2, ?3, ?4)",
            params![name, date, description, is_active],
        )?;
        self.get_session(SessionId(self.conn.last_insert_rowid()))
    }

    pub fn insert_card(&self, name: &str, description: &str, order: u32, active: bool) -> Result<Card> {
        self.conn.execute(
            "INSERT INTO cards (name, description, display_order, active) VALUES (?1, ?2, ?3, ?4)",
            params![name, description, order, active],
        )?;
        self.get_card(CardId(self.conn.last_insert_rowid()))
    }

    pub fn set_session_active(&self, session: SessionId, is_active: bool) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE sessions SET is_active = ?1 WHERE id = ?2",
            params![is_active, session],
        )?;
        if changed == 0 {
            return Err(HealthCheckError::not_found("session", session));
        }
        Ok(())
    }

    pub fn get_department(&self, id: DepartmentId) -> Result<Department> {
        self.conn
            .query_row(
                "SELECT * FROM departments WHERE id = ?1",
                [id],
                department_from_row,
            )
            .optional()?
            .ok_or_else(|| HealthCheckError::not_found("department", id))
    }

    pub fn get_team(&self, id: TeamId) -> Result<Team> {
        self.conn
            .query_row("SELECT * FROM teams WHERE id = ?1", [id], team_from_row)
            .optional()?
            .ok_or_else(|| HealthCheckError::not_found("team", id))
    }

    pub fn get_user(&self, id: UserId) -> Result<User> {
        self.conn
            .query_row("SELECT * FROM users WHERE id = ?1", [id], user_from_row)
            .optional()?
            .ok_or_else(|| HealthCheckError::not_found("user", id))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<User> {
        self.conn
            .query_row(
                "SELECT * FROM users WHERE username = ?1",
                [username],
                user_from_row,
            )
            .optional()?
            .ok_or_else(|| HealthCheckError::not_found("user", username))
    }

    pub fn get_session(&self, id: SessionId) -> Result<Session> {
        self.conn
            .query_row("SELECT * FROM sessions WHERE id = ?1", [id], session_from_row)
            .optional()?
            .ok_or_else(|| HealthCheckError::not_found("session", id))
    }

    pub fn get_card(&self, id: CardId) -> Result<Card> {
        self.conn
            .query_row("SELECT * FROM cards WHERE id = ?1", [id], card_from_row)
            .optional()?
            .ok_or_else(|| HealthCheckError::not_found("card", id))
    }

    pub fn list_departments(&self) -> Result<Vec<Department>> {
        let mut stmt = self.conn.prepare("SELECT * FROM departments ORDER BY name, id")?;
        let rows = stmt.query_map([], department_from_row)?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    pub fn list_teams(&self) -> Result<Vec<Team>> {
        let mut stmt = self.conn.prepare("SELECT * FROM teams ORDER BY name, id")?;
        let rows = stmt.query_map([], team_from_row)?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    pub fn teams_in_department(&self, department: DepartmentId) -> Result<Vec<Team>> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM teams WHERE department_id = ?1 ORDER BY name, id")?;
        let rows = stmt.query_map([department], team_from_row)?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    pub fn team_members(&self, team: TeamId) -> Result<Vec<User>> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM users WHERE team_id = ?1 ORDER BY username")?;
        let rows = stmt.query_map([team], user_from_row)?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    pub fn team_leaders(&self, team: TeamId) -> Result<Vec<User>> {
        let mut stmt = self.conn.prepare(
            "SELECT * FROM users WHERE team_id = ?1 AND role = ?2 ORDER BY username",
        )?;
        let rows = stmt.query_map(params![team, Role::TeamLeader], user_from_row)?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    /// All sessions, newest first.
    pub fn list_sessions(&self) -> Result<Vec<Session>> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM sessions ORDER BY date DESC, id DESC")?;
        let rows = stmt.query_map([], session_from_row)?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    /// The newest session flagged active, if any.
    ///
    /// Only the command-line boundary uses this; the engine always receives
    /// its session explicitly.
    pub fn latest_active_session(&self) -> Result<Option<Session>> {
        Ok(self
            .conn
            .query_row(
                "SELECT * FROM sessions WHERE is_active = 1 ORDER BY date DESC, id DESC LIMIT 1",
                [],
                session_from_row,
            )
            .optional()?)
    }

    /// Cards in display order. `active_only` hides retired cards.
    pub fn list_cards(&self, active_only: bool) -> Result<Vec<Card>> {
        let sql = if active_only {
            "SELECT * FROM cards WHERE active = 1 ORDER BY display_order, id"
        } else {
            "SELECT * FROM cards ORDER BY display_order, id"
        };
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map([], card_from_row)?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    /// Number of users in `population`.
    pub fn count_users(&self, population: Population) -> Result<usize> {
        let sql = format!(
            "SELECT COUNT(*) FROM users u WHERE {}",
            population.user_predicate().replace("?2", "?1")
        );
        let count: i64 = match population.scope_id() {
            Some(id) => self.conn.query_row(&sql, [id], |row| row.get(0))?,
            None => self.conn.query_row(&sql, [], |row| row.get(0))?,
        };
        Ok(count as usize)
    }

    /// Number of distinct users in `population` with at least one vote in
    /// `session`.
    pub fn count_participants(&self, session: SessionId, population: Population) -> Result<usize> {
        let sql = format!(
            "SELECT COUNT(DISTINCT v.user_id) FROM votes v
             JOIN users u ON u.id = v.user_id
             WHERE v.session_id = ?1 AND {}",
            population.user_predicate()
        );
        let count: i64 = match population.scope_id() {
            Some(id) => self.conn.query_row(&sql, params![session, id], |row| row.get(0))?,
            None => self.conn.query_row(&sql, [session], |row| row.get(0))?,
        };
        Ok(count as usize)
    }

    /// Number of users holding any of `roles`. Repeated roles count once.
    pub fn count_users_with_roles(&self, roles: &[Role]) -> Result<usize> {
        let mut distinct: Vec<Role> = Vec::with_capacity(roles.len());
        for role in roles {
            if !distinct.contains(role) {
                distinct.push(*role);
            }
        }
        if distinct.is_empty() {
            return Ok(0);
        }

        let placeholders = vec!["?"; distinct.len()].join(", ");
        let sql = format!("SELECT COUNT(*) FROM users WHERE role IN ({})", placeholders);
        let count: i64 = self.conn.query_row(
            &sql,
            rusqlite::params_from_iter(distinct.iter()),
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_utils::*;
    use super::*;

    #[test]
    fn test_insert_and_fetch_hierarchy() {
        let db = test_db();
        let dept = db.insert_department("Engineering", Some("Tech")).unwrap();
        let team = db.insert_team("Backend", None, Some(dept.id)).unwrap();
        let user = db
            .insert_user("engineer1", Role::Engineer, Some(dept.id), Some(team.id))
            .unwrap();

        assert_eq!(db.get_team(team.id).unwrap().department, Some(dept.id));
        assert_eq!(db.get_user_by_username("engineer1").unwrap(), user);
        assert_eq!(db.teams_in_department(dept.id).unwrap(), vec![team.clone()]);
        assert_eq!(db.team_members(team.id).unwrap().len(), 1);
        assert!(db.team_leaders(team.id).unwrap().is_empty());
    }

    #[test]
    fn test_missing_rows_are_not_found() {
        let db = test_db();
        assert!(db.get_session(SessionId(7)).unwrap_err().is_not_found());
        assert!(db.get_user_by_username("ghost").unwrap_err().is_not_found());
        assert!(db.set_session_active(SessionId(7), false).unwrap_err().is_not_found());
    }

    #[test]
    fn test_latest_active_session_ignores_inactive() {
        let db = test_db();
        assert!(db.latest_active_session().unwrap().is_none());

        let older = db.insert_session("Q2", date("2024-04-01"), "", true).unwrap();
        db.insert_session("Q3", date("2024-07-01"), "", false).unwrap();

        assert_eq!(db.latest_active_session().unwrap(), Some(older));
        assert_eq!(db.list_sessions().unwrap()[0].name, "Q3");
    }

    #[test]
    fn test_list_cards_respects_order_and_active_flag() {
        let db = test_db();
        db.insert_card("Docs", "", 2, false).unwrap();
        db.insert_card("Quality", "", 1, true).unwrap();
        db.insert_card("Pace", "", 3, true).unwrap();

        let all: Vec<_> = db.list_cards(false).unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(all, vec!["Quality", "Docs", "Pace"]);
        assert_eq!(db.list_cards(true).unwrap().len(), 2);
    }

    #[test]
    fn test_count_users_by_population_and_role() {
        let fx = Fixture::new();
        let other = fx.team("Frontend");
        fx.members(&fx.team, 2);
        fx.members(&other, 3);
        fx.db
            .insert_user("lead", Role::TeamLeader, Some(fx.department.id), Some(fx.team.id))
            .unwrap();
        fx.db.insert_user("boss", Role::SeniorManager, None, None).unwrap();

        assert_eq!(fx.db.count_users(Population::All).unwrap(), 7);
        assert_eq!(fx.db.count_users(Population::Team(fx.team.id)).unwrap(), 3);
        assert_eq!(
            fx.db.count_users(Population::Department(fx.department.id)).unwrap(),
            6
        );
        assert_eq!(fx.db.count_users_with_roles(&Role::VOTING).unwrap(), 6);
    }

    #[test]
    fn test_count_users_with_roles_ignores_repeats() {
        let fx = Fixture::new();
        fx.members(&fx.team, 2);
        fx.db
            .insert_user("lead", Role::TeamLeader, Some(fx.department.id), Some(fx.team.id))
            .unwrap();

        let repeated = [Role::Engineer, Role::Engineer, Role::TeamLeader];
        assert_eq!(fx.db.count_users_with_roles(&repeated).unwrap(), 3);
        assert_eq!(fx.db.count_users_with_roles(&[Role::Admin]).unwrap(), 0);
        assert_eq!(fx.db.count_users_with_roles(&[]).unwrap(), 0);
    }
}
