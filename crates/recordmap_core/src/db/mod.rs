//! SQLite connection bootstrap and storage error type.
//!
//! # Responsibility
//! - Open and configure SQLite connections used by `SqliteStorage`.
//! - Define the opaque storage failure passed through the mapping layer.
//!
//! # Invariants
//! - Storage errors are never reinterpreted or retried by callers in core.
//! - Schema creation is owned by the application, not by this crate.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod open;

pub use open::{open_db, open_db_in_memory, open_db_with, DbOptions};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// A previous holder of the connection lock panicked.
    Poisoned,
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::Poisoned => write!(f, "storage connection lock is poisoned"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::Poisoned => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
