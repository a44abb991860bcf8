//! Repository layer abstractions and SQLite implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQL details from service orchestration.
//! - Apply visibility scoping inside every query.
//!
//! # Invariants
//! - Scoped mutations that match zero rows are disambiguated into
//!   `NotFound` vs `Forbidden` by an unscoped existence probe.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::DbError;
use crate::model::resource::ValidationError;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod calendar_repo;
pub mod geography_repo;
pub mod resource_repo;
pub mod user_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error shared by every store.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    /// No row with this id exists (or the caller may not see it).
    NotFound(String),
    /// The row exists but the caller lacks write rights on it.
    Forbidden(String),
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "record not found: {id}"),
            Self::Forbidden(id) => write!(f, "record not writable by caller: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) | Self::Forbidden(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Returns whether a row with `id` exists in `table`, ignoring ownership.
pub(crate) fn row_exists(conn: &Connection, table: &str, id: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        &format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?1);"),
        [id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

/// Classifies a scoped mutation that changed nothing.
pub(crate) fn unmatched_write(conn: &Connection, table: &str, id: &str) -> RepoError {
    match row_exists(conn, table, id) {
        Ok(true) => RepoError::Forbidden(id.to_string()),
        Ok(false) => RepoError::NotFound(id.to_string()),
        Err(err) => err,
    }
}

pub(crate) fn parse_uuid(value: &str, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

pub(crate) fn parse_flag(value: i64, column: &'static str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
