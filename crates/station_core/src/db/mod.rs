//! SQLite storage bootstrap and station table lifecycle.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the station store.
//! - Create, seed and destructively recreate the station table by version.
//!
//! # Invariants
//! - Schema version is tracked via `PRAGMA user_version`.
//! - No request may touch the station table before the lifecycle step succeeds.
//! - A version bump drops every stored row; there is no migration path.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod open;
pub mod schema;
pub mod seed;

pub use open::{open_store, open_store_in_memory, StationStore};
pub use seed::{FixedSeed, NoSeed, SeedError, StationSeeder};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        requested: u32,
    },
    InvalidSchemaVersion(u32),
    InvalidTableName(String),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                requested,
            } => write!(
                f,
                "can't downgrade database from version {db_version} to {requested}"
            ),
            Self::InvalidSchemaVersion(version) => {
                write!(f, "schema version must be >= 1, got {version}")
            }
            Self::InvalidTableName(name) => write!(f, "invalid table name `{name}`"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
            Self::InvalidSchemaVersion(_) => None,
            Self::InvalidTableName(_) => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
