//! Record handle and typed entity contract.
//!
//! # Responsibility
//! - Wrap one `ValueStore` together with the manager's write bookkeeping.
//! - Define the `Entity` contract typed wrappers implement to get a manager.
//!
//! # Invariants
//! - Records are built by `Manager::fresh` and manager reads only.
//! - `flushed` is the key and exact delta of the last effective `update`;
//!   any `set`, `unset` or reset clears it.

use crate::model::relation::Relationships;
use crate::model::schema::{FieldDescriptor, FieldSchema};
use crate::model::store::{FieldMap, ValueStore};
use crate::model::value::Value;
use std::sync::Arc;

/// One in-memory record bound to a schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    store: ValueStore,
    flushed: Option<(Value, FieldMap)>,
}

impl Record {
    pub(crate) fn from_store(store: ValueStore) -> Self {
        Self {
            store,
            flushed: None,
        }
    }

    pub fn schema(&self) -> &Arc<FieldSchema> {
        self.store.schema()
    }

    pub fn table(&self) -> &str {
        self.store.schema().table()
    }

    pub fn get(&self, name: &str) -> &Value {
        self.store.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.store.set(name, value);
        self.flushed = None;
    }

    pub fn unset(&mut self, name: &str) {
        self.store.unset(name);
        self.flushed = None;
    }

    /// Current primary key value (`Null` when not yet assigned).
    pub fn primary_key_value(&self) -> &Value {
        self.store.get(self.store.schema().primary_key())
    }

    pub fn current_snapshot(&self) -> FieldMap {
        self.store.current_snapshot()
    }

    pub fn dirty_fields(&self) -> &FieldMap {
        self.store.dirty_fields()
    }

    pub fn is_dirty(&self) -> bool {
        self.store.is_dirty()
    }

    pub fn count(&self) -> usize {
        self.store.count()
    }

    pub fn store(&self) -> &ValueStore {
        &self.store
    }

    /// Folds `data` into the baseline and clears pending writes.
    pub fn reset(&mut self, data: FieldMap, clear_container: bool) {
        self.store.reset(data, clear_container);
        self.flushed = None;
    }

    /// Whether `update` already wrote `delta` to the row keyed by `key`
    /// with no write to the record since.
    pub(crate) fn is_flushed(&self, key: &Value, delta: &FieldMap) -> bool {
        self.flushed
            .as_ref()
            .is_some_and(|(flushed_key, flushed_delta)| {
                flushed_key == key && flushed_delta == delta
            })
    }

    pub(crate) fn mark_flushed(&mut self, key: Value, delta: FieldMap) {
        self.flushed = Some((key, delta));
    }
}

/// Typed record wrapper managed by a `Manager`.
///
/// Implementors expose per-field accessors over the wrapped `Record` and
/// keep `Record::get`/`Record::set` for container data.
pub trait Entity: Sized {
    /// Storage table name.
    const TABLE: &'static str;
    /// Primary key field; must be listed in `fields()`.
    const PRIMARY_KEY: &'static str = "id";

    /// Persisted fields in declaration order.
    fn fields() -> Vec<FieldDescriptor>;

    /// Named relationships to other record types.
    fn relationships() -> Relationships {
        Relationships::default()
    }

    fn from_record(record: Record) -> Self;

    fn record(&self) -> &Record;

    fn record_mut(&mut self) -> &mut Record;

    fn into_record(self) -> Record;
}
