//! Record mapping core.
//! Tracks loaded vs. pending record state, turns it into minimal writes, and
//! resolves declared relationships between record types into queries.

pub mod db;
pub mod error;
pub mod logging;
pub mod model;
pub mod query;
pub mod relation;
pub mod repo;
pub mod storage;

pub use error::{MapError, MapResult};
pub use logging::{default_log_level, init_logging, logging_status, LogSettings};
pub use model::record::{Entity, Record};
pub use model::relation::{
    BoundValue, Cardinality, Clause, ConditionNode, Join, RelationshipDeclaration, Relationships,
};
pub use model::schema::{FieldDescriptor, FieldSchema, FieldType};
pub use model::store::{FieldMap, ValueStore};
pub use model::value::Value;
pub use query::condition::{translate, TranslatedQuery};
pub use relation::resolver::{Related, RelationshipResolver};
pub use repo::manager::{CreateOutcome, Criteria, Manager, RecordSource, UpdateOutcome};
pub use repo::registry::{ManagerRegistry, RegistryError};
pub use storage::query::{SelectBuilder, SelectQuery};
pub use storage::sqlite::SqliteStorage;
pub use storage::{ColumnInfo, Row, Storage};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
