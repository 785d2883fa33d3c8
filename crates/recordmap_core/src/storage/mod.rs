//! Storage collaborator contract consumed by managers.
//!
//! # Responsibility
//! - Define the narrow statement-level interface managers depend on.
//! - Host the SQLite implementation and the query builder handle.
//!
//! # Invariants
//! - Every call is synchronous and either completes or returns `DbError`.
//! - Implementations must be shareable across threads (`Send + Sync`).

pub mod query;
pub mod sqlite;

use crate::db::DbResult;
use crate::model::store::FieldMap;
use crate::model::value::Value;
use query::SelectBuilder;

/// One fetched row keyed by column name.
pub type Row = FieldMap;

/// Column metadata reported by `Storage::describe`.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnInfo {
    pub name: String,
    pub declared_type: String,
    pub not_null: bool,
    pub primary_key: bool,
    pub default_value: Value,
}

/// Statement executor used by managers and the condition translator.
pub trait Storage: Send + Sync {
    /// Inserts one row and returns the affected row count.
    fn insert(&self, table: &str, fields: &FieldMap) -> DbResult<usize>;

    fn fetch_one(&self, sql: &str, params: &[Value]) -> DbResult<Option<Row>>;

    fn fetch_all(&self, sql: &str, params: &[Value]) -> DbResult<Vec<Row>>;

    /// Runs a write statement and returns the affected row count.
    fn execute(&self, sql: &str, params: &[Value]) -> DbResult<usize>;

    /// Identifier generated by the most recent insert.
    fn last_generated_id(&self) -> DbResult<Value>;

    /// Column metadata for `table`.
    fn describe(&self, table: &str) -> DbResult<Vec<ColumnInfo>>;

    fn build_query(&self, table: &str) -> SelectBuilder {
        SelectBuilder::new(table)
    }
}
