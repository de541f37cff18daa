//! Storage interface for the relationship graph and its SQLite implementation.
//!
//! # Responsibility
//! - Define narrow, owner-scoped data access contracts per entity.
//! - Keep SQL and tombstone filtering inside the persistence boundary.
//!
//! # Invariants
//! - Reads return active (`deleted_at IS NULL`) rows unless a method says
//!   otherwise.
//! - Edge reads also require both endpoints and the edge type to be active,
//!   so a tombstoned person or type makes its edges invisible everywhere.
//! - Multi-row writes run inside one immediate transaction.

pub mod group_repo;
pub mod person_repo;
pub mod relationship_repo;
pub mod relationship_type_repo;
pub mod user_repo;

use crate::db::migrations::{latest_version, schema_version};
use crate::db::DbError;
use crate::model::validation::ValidationError;
use rusqlite::{Connection, ErrorCode, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error shared by every entity store.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    NotFound { entity: &'static str, id: Uuid },
    /// A uniqueness constraint rejected the write.
    Duplicate(&'static str),
    /// Persisted row cannot be converted into a model.
    InvalidData(String),
    /// Connection schema is not at the version this binary expects.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::Duplicate(entity) => write!(f, "{entity} already exists"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
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

/// SQLite-backed store implementing every repository trait in this module.
///
/// Borrowing the connection keeps the store `Copy`, so several services can
/// share one connection inside a request.
#[derive(Debug, Clone, Copy)]
pub struct SqliteRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRepository<'conn> {
    /// Wraps a connection opened through `db::open_db*`.
    ///
    /// # Errors
    /// - `RepoError::UninitializedConnection` when migrations were not applied.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        let expected_version = latest_version();
        let actual_version = schema_version(conn)?;
        if actual_version != expected_version {
            return Err(RepoError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }
        Ok(Self { conn })
    }
}

pub(crate) fn parse_uuid(value: &str, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

pub(crate) fn uuid_column(row: &Row<'_>, column: &'static str) -> RepoResult<Uuid> {
    let text: String = row.get(column)?;
    parse_uuid(&text, column)
}

pub(crate) fn optional_uuid_column(row: &Row<'_>, column: &'static str) -> RepoResult<Option<Uuid>> {
    row.get::<_, Option<String>>(column)?
        .map(|text| parse_uuid(&text, column))
        .transpose()
}

/// Maps a unique-constraint failure to `RepoError::Duplicate(entity)`.
pub(crate) fn map_unique_violation(err: rusqlite::Error, entity: &'static str) -> RepoError {
    match &err {
        rusqlite::Error::SqliteFailure(code, _)
            if code.code == ErrorCode::ConstraintViolation
                && code.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            RepoError::Duplicate(entity)
        }
        _ => err.into(),
    }
}

/// `?, ?, ?` placeholder list for `IN (...)` clauses.
pub(crate) fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}
