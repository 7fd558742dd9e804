pub mod repository;
pub mod sqlite;

pub use repository::*;
pub use sqlite::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Migration failed at version {version}: {reason}")]
    MigrationFailed { version: i64, reason: String },

    #[error("Constraint violated: {0}")]
    ConstraintViolation(String),

    #[error("Corrupt column {column}: {reason}")]
    CorruptColumn { column: &'static str, reason: String },
}

impl DatabaseError {
    /// Classify a write error, lifting UNIQUE violations out of the generic
    /// SQLite bucket so callers can react to them.
    pub fn from_write(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, message)
                if code.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                DatabaseError::ConstraintViolation(message.clone().unwrap_or_default())
            }
            _ => DatabaseError::Sqlite(err),
        }
    }

    /// True when this is a UNIQUE violation naming `column` (`table.column`).
    pub fn violates(&self, column: &str) -> bool {
        matches!(self, DatabaseError::ConstraintViolation(msg) if msg.contains(column))
    }
}

/// Current UTC time in the fixed-width RFC 3339 form stored in every
/// `created_at` column (lexical order == chronological order).
pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
