//! Error types for the health check engine.

use thiserror::Error;

/// Errors surfaced by the store and the aggregation engine.
#[derive(Debug, Error)]
pub enum HealthCheckError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Schema migration failed: {0}")]
    Migration(String),

    #[error("Failed to create database directory: {0}")]
    CreateDir(std::io::Error),

    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Background task failed: {0}")]
    Task(String),
}

impl HealthCheckError {
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        HealthCheckError::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    /// Returns true when the error means a referenced row does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, HealthCheckError::NotFound { .. })
    }
}

impl From<tokio::task::JoinError> for HealthCheckError {
    fn from(err: tokio::task::JoinError) -> Self {
        HealthCheckError::Task(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, HealthCheckError>;
