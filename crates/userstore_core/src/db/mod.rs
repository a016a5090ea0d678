//! SQLite storage bootstrap and schema entry points.
//!
//! # Responsibility
//! - Parse connection strings into connection options.
//! - Open and configure SQLite connections for userstore core.
//! - Ensure entity tables exist and carry every declared column.
//!
//! # Invariants
//! - Core code must not read/write application data before the entity
//!   schema has been ensured.
//! - Identifiers interpolated into SQL are validated before use.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod config;
mod open;
pub mod schema;

pub use config::{DbConfig, DbTarget};
pub use open::{connect, open_db, open_db_in_memory};
pub use schema::{auto_migrate, ensure_all, MigrationReport, TableSchema};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// Connection string could not be turned into usable options.
    InvalidConfig(String),
    /// Table, column or index name is not a plain SQL identifier.
    InvalidIdentifier(String),
    /// Existing table cannot be brought in line with the declared schema.
    SchemaConflict {
        table: &'static str,
        column: &'static str,
        reason: &'static str,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::InvalidConfig(message) => write!(f, "invalid connection string: {message}"),
            Self::InvalidIdentifier(name) => write!(f, "invalid sql identifier `{name}`"),
            Self::SchemaConflict {
                table,
                column,
                reason,
            } => write!(f, "cannot migrate column {table}.{column}: {reason}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::InvalidConfig(_) | Self::InvalidIdentifier(_) | Self::SchemaConflict { .. } => {
                None
            }
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
