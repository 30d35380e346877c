//! SQLite-backed vote store.
//!
//! Holds the organisation hierarchy, sessions, cards, individual votes and
//! the derived team/department summaries. The aggregation engine reaches the
//! data only through the methods on [`Database`]; every rollup runs inside
//! [`Database::with_transaction`] so its read-aggregate-write sequence is
//! atomic per key.

mod codec;
mod migrations;
mod org;
mod summaries;
mod votes;

use crate::error::{HealthCheckError, Result};
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

pub use org::Population;

/// Default time a connection waits on a locked database before failing.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database file at `path` and apply the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(HealthCheckError::CreateDir)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        debug!("Opened database at {}", path.display());

        Self::init(conn)
    }

    /// Open a private in-memory database. Used by tests and dry runs.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        migrations::run_migrations(&conn).map_err(HealthCheckError::Migration)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self { conn })
    }

    /// Change how long writers wait for a competing transaction.
    pub fn set_busy_timeout(&self, timeout: Duration) -> Result<()> {
        self.conn.busy_timeout(timeout)?;
        Ok(())
    }

    /// Borrow the underlying connection for ad-hoc queries.
    pub fn conn_ref(&self) -> &Connection {
        &self.conn
    }

    /// Execute a closure within an immediate SQLite transaction.
    /// Commits on Ok, rolls back on Err or when the commit itself fails.
    ///
    /// `BEGIN IMMEDIATE` takes the write lock up front, so two rollups for
    /// the same key serialise instead of reading the same stale state.
    pub fn with_transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Self) -> Result<T>,
    {
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        match f(self) {
            Ok(val) => match self.conn.execute_batch("COMMIT") {
                Ok(()) => Ok(val),
                Err(e) => {
                    let _ = self.conn.execute_batch("ROLLBACK");
                    Err(e.into())
                }
            },
            Err(e) => {
                let _ = self.conn.execute_batch("ROLLBACK");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
pub mod test_utils {
    use super::Database;
    use crate::models::*;
    use chrono::NaiveDate;

    pub fn test_db() -> Database {
        Database::open_in_memory().expect("open in-memory database")
    }

    pub fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("valid date")
    }

    /// A small organisation: one department, one team inside it, no users.
    pub struct Fixture {
        pub db: Database,
        pub department: Department,
        pub team: Team,
        pub card: Card,
    }

    impl Fixture {
        pub fn new() -> Self {
            let db = test_db();
            let department = db
                .insert_department("Engineering", Some("Tech department"))
                .unwrap();
            let team = db
                .insert_team("Backend", None, Some(department.id))
                .unwrap();
            let card = db
                .insert_card("Code Quality", "Quality metrics", 1, true)
                .unwrap();
            Self {
                db,
                department,
                team,
                card,
            }
        }

        pub fn session(&self, name: &str, day: &str) -> Session {
            self.db.insert_session(name, date(day), "", true).unwrap()
        }

        pub fn team(&self, name: &str) -> Team {
            self.db
                .insert_team(name, None, Some(self.department.id))
                .unwrap()
        }

        /// Create `count` engineers in `team`, named after the team.
        pub fn members(&self, team: &Team, count: usize) -> Vec<User> {
            (0..count)
                .map(|i| {
                    self.db
                        .insert_user(
                            &format!("{}-{}", team.name.to_lowercase(), i),
                            Role::Engineer,
                            team.department,
                            Some(team.id),
                        )
                        .unwrap()
                })
                .collect()
        }

        pub fn vote(&self, user: &User, session: &Session, value: TrafficLight, note: ProgressNote) {
            self.db
                .upsert_vote(user.id, self.card.id, session.id, value, note, None)
                .unwrap();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_utils::*;
    use super::*;
    use crate::models::{DepartmentId, TeamId};

    #[test]
    fn test_reopen_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("health.db");

        {
            let db = Database::open(&path).unwrap();
            db.insert_department("Engineering", None).unwrap();
        }

        let db = Database::open(&path).unwrap();
        assert_eq!(db.list_departments().unwrap().len(), 1);
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let db = test_db();

        let result: Result<()> = db.with_transaction(|tx| {
            tx.insert_department("Doomed", None)?;
            Err(HealthCheckError::not_found("team", TeamId(99)))
        });

        assert!(result.is_err());
        assert!(db.list_departments().unwrap().is_empty());
    }

    #[test]
    fn test_transaction_commits_on_success() {
        let db = test_db();

        let dept = db
            .with_transaction(|tx| tx.insert_department("Kept", None))
            .unwrap();

        assert_eq!(db.get_department(dept.id).unwrap().name, "Kept");
    }

    #[test]
    fn test_failed_commit_leaves_connection_usable() {
        let db = test_db();

        let result = db.with_transaction(|tx| {
            tx.conn_ref().execute_batch("PRAGMA defer_foreign_keys = ON")?;
            tx.insert_team("Orphan", None, Some(DepartmentId(99)))
        });

        assert!(result.is_err());
        assert!(db.conn_ref().is_autocommit());
        assert!(db.list_teams().unwrap().is_empty());

        let dept = db
            .with_transaction(|tx| tx.insert_department("After", None))
            .unwrap();
        assert_eq!(db.get_department(dept.id).unwrap().name, "After");
    }
}
