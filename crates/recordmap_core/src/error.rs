//! Mapping-layer error taxonomy.
//!
//! # Responsibility
//! - Separate programming errors (bad arguments, malformed declarations) from
//!   storage failures.
//!
//! # Invariants
//! - "Not found" and "nothing to persist" are never errors; they are returned
//!   as `Option`/`bool`/outcome values by the manager.
//! - Storage failures are wrapped without reinterpretation.

use crate::db::DbError;
use crate::repo::registry::RegistryError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type MapResult<T> = Result<T, MapError>;

/// Error for record mapping, relationship and registry operations.
#[derive(Debug)]
pub enum MapError {
    /// Caller passed a value the operation cannot accept.
    InvalidArgument(String),
    /// Static schema/relationship metadata is structurally wrong.
    MalformedDeclaration(String),
    /// Relationship name not declared for the owning record type.
    UnknownRelation(String),
    Registry(RegistryError),
    Storage(DbError),
}

impl Display for MapError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidArgument(message) => write!(f, "invalid argument: {message}"),
            Self::MalformedDeclaration(message) => write!(f, "malformed declaration: {message}"),
            Self::UnknownRelation(name) => write!(f, "no such relation: {name}"),
            Self::Registry(err) => write!(f, "{err}"),
            Self::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl Error for MapError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Registry(err) => Some(err),
            Self::Storage(err) => Some(err),
            Self::InvalidArgument(_) | Self::MalformedDeclaration(_) | Self::UnknownRelation(_) => {
                None
            }
        }
    }
}

impl From<DbError> for MapError {
    fn from(value: DbError) -> Self {
        Self::Storage(value)
    }
}

impl From<rusqlite::Error> for MapError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Storage(DbError::Sqlite(value))
    }
}

impl From<RegistryError> for MapError {
    fn from(value: RegistryError) -> Self {
        Self::Registry(value)
    }
}
