//! Record manager: CRUD orchestration for one entity type.
//!
//! # Responsibility
//! - Turn a record's pending delta into minimal insert/update statements.
//! - Load rows into baseline-only records and fold write results back.
//! - Expose a type-erased `RecordSource` view for registry/relation lookups.
//!
//! # Invariants
//! - A manager holds no per-call mutable state; all record state lives in
//!   the record's `ValueStore`.
//! - `create` resets the record after a successful insert; `update` never
//!   does (call `refresh` for confirmed state).
//! - Primary key lookups for `update`/`delete`/`refresh` use the record's
//!   current `get(primary_key)`.
//! - "Not found" and "nothing to write" are returned as values, not errors.

use crate::error::{MapError, MapResult};
use crate::model::record::{Entity, Record};
use crate::model::relation::{Clause, ConditionNode, Relationships};
use crate::model::schema::FieldSchema;
use crate::model::store::{FieldMap, ValueStore};
use crate::model::value::Value;
use crate::query::condition::translate;
use crate::relation::resolver::RelationshipResolver;
use crate::repo::registry::ManagerRegistry;
use crate::storage::query::{quote_ident, SelectBuilder, SelectQuery, TABLE_ALIAS};
use crate::storage::{ColumnInfo, Row, Storage};
use log::{debug, info, warn};
use std::marker::PhantomData;
use std::sync::Arc;

/// Result of `Manager::create`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    /// Row inserted; the record now reflects the persisted values.
    Created,
    /// The record had no pending writes; nothing was sent to storage.
    NothingToPersist,
    /// Storage accepted the insert but reported zero affected rows.
    NoEffect,
}

/// Result of `Manager::update`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// No field needed writing; nothing was sent to storage.
    Unchanged,
    /// Update issued; carries the affected row count.
    Updated(usize),
}

/// Selection for `Manager::fetch`/`fetch_all`.
#[derive(Debug, Clone, PartialEq)]
pub enum Criteria {
    /// Caller-built query with positional parameters.
    Raw {
        query: SelectQuery,
        params: Vec<Value>,
    },
    /// Condition tree translated against the manager's table.
    Conditions(ConditionNode),
}

impl Criteria {
    pub fn raw(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self::Raw {
            query: SelectQuery::raw(sql),
            params,
        }
    }
}

impl From<ConditionNode> for Criteria {
    fn from(value: ConditionNode) -> Self {
        Self::Conditions(value)
    }
}

impl From<Clause> for Criteria {
    fn from(value: Clause) -> Self {
        Self::Conditions(value.into())
    }
}

/// Type-erased manager view used by the registry and relationship resolver.
pub trait RecordSource: Send + Sync {
    fn table(&self) -> &str;

    fn primary_key(&self) -> &str;

    /// Fresh query builder over this source's table.
    fn query_builder(&self) -> SelectBuilder;

    fn fetch_record(&self, query: &SelectQuery, params: &[Value]) -> MapResult<Option<Record>>;

    fn fetch_all_records(&self, query: &SelectQuery, params: &[Value]) -> MapResult<Vec<Record>>;
}

/// CRUD manager for entity type `E`.
pub struct Manager<E: Entity> {
    storage: Arc<dyn Storage>,
    schema: Arc<FieldSchema>,
    relationships: Relationships,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Manager<E> {
    /// Builds the manager and validates `E`'s static declarations.
    ///
    /// # Errors
    /// - `MalformedDeclaration` when the schema or a relationship declaration
    ///   of `E` is invalid.
    pub fn new(storage: Arc<dyn Storage>) -> MapResult<Self> {
        let schema = FieldSchema::new(E::TABLE, E::PRIMARY_KEY, E::fields())?;
        let relationships = E::relationships();
        relationships.validate()?;

        Ok(Self {
            storage,
            schema: Arc::new(schema),
            relationships,
            _entity: PhantomData,
        })
    }

    pub fn table(&self) -> &str {
        self.schema.table()
    }

    pub fn primary_key(&self) -> &str {
        self.schema.primary_key()
    }

    pub fn schema(&self) -> &Arc<FieldSchema> {
        &self.schema
    }

    pub fn relationships(&self) -> &Relationships {
        &self.relationships
    }

    /// Builds a new entity bound to this manager's schema.
    ///
    /// `as_modified` marks `data` as pending writes (for `create`); otherwise
    /// it is treated as already persisted.
    pub fn fresh<I, K>(&self, data: I, as_modified: bool) -> E
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        E::from_record(Record::from_store(ValueStore::new(
            Arc::clone(&self.schema),
            data,
            as_modified,
        )))
    }

    /// Builds a new entity from a JSON object.
    ///
    /// # Errors
    /// - `InvalidArgument` when `data` is not an object of scalars.
    pub fn fresh_json(&self, data: &serde_json::Value, as_modified: bool) -> MapResult<E> {
        let store = ValueStore::from_json(Arc::clone(&self.schema), data, as_modified)?;
        Ok(E::from_record(Record::from_store(store)))
    }

    /// Inserts the entity's pending writes.
    ///
    /// On success the record is reset to the persisted values, including a
    /// storage-generated primary key when none was supplied.
    pub fn create(&self, entity: &mut E) -> MapResult<CreateOutcome> {
        let record = entity.record_mut();
        self.ensure_bound(record)?;

        let dirty = record.dirty_fields().clone();
        if dirty.is_empty() {
            debug!(
                "event=record_create module=manager status=skip table={} reason=nothing_to_persist",
                self.table()
            );
            return Ok(CreateOutcome::NothingToPersist);
        }

        let affected = self.storage.insert(self.table(), &dirty)?;
        if affected == 0 {
            warn!(
                "event=record_create module=manager status=no_effect table={} fields={}",
                self.table(),
                dirty.len()
            );
            return Ok(CreateOutcome::NoEffect);
        }

        let mut persisted = dirty;
        let has_key = persisted
            .get(self.primary_key())
            .is_some_and(|value| !value.is_null());
        if !has_key {
            let generated = self.storage.last_generated_id()?;
            persisted.insert(self.primary_key().to_string(), generated);
        }

        let fields = persisted.len();
        record.reset(persisted, false);
        info!(
            "event=record_create module=manager status=ok table={} fields={} generated_key={}",
            self.table(),
            fields,
            !has_key
        );
        Ok(CreateOutcome::Created)
    }

    /// Loads one entity by primary key; `None` when no row matches.
    ///
    /// # Errors
    /// - `InvalidArgument` when `primary_key` is `Null`.
    pub fn read(&self, primary_key: impl Into<Value>) -> MapResult<Option<E>> {
        let primary_key = primary_key.into();
        let row = self.fetch_row_by_key(&primary_key)?;
        Ok(row.map(|row| self.load(row)))
    }

    /// Writes the entity's pending schema fields, excluding the primary key.
    ///
    /// The record is not reset. Repeating `update` with no `set`/`unset` in
    /// between, against the same key, is `Unchanged` and sends nothing to
    /// storage.
    pub fn update(&self, entity: &mut E) -> MapResult<UpdateOutcome> {
        let record = entity.record_mut();
        self.ensure_bound(record)?;

        let mut delta = record.dirty_fields().clone();
        delta.remove(self.primary_key());
        if delta.is_empty() {
            debug!(
                "event=record_update module=manager status=skip table={} reason=nothing_to_persist",
                self.table()
            );
            return Ok(UpdateOutcome::Unchanged);
        }

        let key = self.require_key(record.primary_key_value(), "update")?;
        if record.is_flushed(&key, &delta) {
            debug!(
                "event=record_update module=manager status=skip table={} reason=already_flushed",
                self.table()
            );
            return Ok(UpdateOutcome::Unchanged);
        }

        let assignments = delta
            .keys()
            .map(|name| format!("{} = ?", quote_ident(name)))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {} SET {assignments} WHERE {} = ?;",
            quote_ident(self.table()),
            quote_ident(self.primary_key())
        );
        let mut params: Vec<Value> = delta.values().cloned().collect();
        params.push(key.clone());

        let affected = self.storage.execute(&sql, &params)?;
        if affected > 0 {
            record.mark_flushed(key, delta);
        }
        info!(
            "event=record_update module=manager status=ok table={} fields={} affected={}",
            self.table(),
            params.len() - 1,
            affected
        );
        Ok(UpdateOutcome::Updated(affected))
    }

    /// Re-reads the entity by its current primary key.
    ///
    /// Returns `false` and leaves the record untouched when the row is gone.
    pub fn refresh(&self, entity: &mut E) -> MapResult<bool> {
        let record = entity.record_mut();
        self.ensure_bound(record)?;

        let key = self.require_key(record.primary_key_value(), "refresh")?;
        match self.fetch_row_by_key(&key)? {
            Some(row) => {
                record.reset(row, false);
                debug!(
                    "event=record_refresh module=manager status=ok table={}",
                    self.table()
                );
                Ok(true)
            }
            None => {
                debug!(
                    "event=record_refresh module=manager status=not_found table={}",
                    self.table()
                );
                Ok(false)
            }
        }
    }

    /// Deletes the entity's row; the in-memory record is left as-is.
    pub fn delete(&self, entity: &E) -> MapResult<usize> {
        let record = entity.record();
        self.ensure_bound(record)?;

        let key = self.require_key(record.primary_key_value(), "delete")?;
        let sql = format!(
            "DELETE FROM {} WHERE {} = ?;",
            quote_ident(self.table()),
            quote_ident(self.primary_key())
        );
        let affected = self.storage.execute(&sql, &[key])?;
        info!(
            "event=record_delete module=manager status=ok table={} affected={}",
            self.table(),
            affected
        );
        Ok(affected)
    }

    /// Loads the first entity matching `criteria`.
    pub fn fetch(&self, criteria: impl Into<Criteria>) -> MapResult<Option<E>> {
        let (query, params) = self.prepare(criteria.into())?;
        Ok(self.fetch_record(&query, &params)?.map(E::from_record))
    }

    /// Loads every entity matching `criteria`; empty when no rows match.
    pub fn fetch_all(&self, criteria: impl Into<Criteria>) -> MapResult<Vec<E>> {
        let (query, params) = self.prepare(criteria.into())?;
        Ok(self
            .fetch_all_records(&query, &params)?
            .into_iter()
            .map(E::from_record)
            .collect())
    }

    /// Column metadata for this manager's table, as reported by storage.
    pub fn describe(&self) -> MapResult<Vec<ColumnInfo>> {
        Ok(self.storage.describe(self.table())?)
    }

    /// Starts a relationship resolver owned by `entity`.
    pub fn relations<'a>(
        &'a self,
        entity: &'a E,
        registry: &'a ManagerRegistry,
    ) -> MapResult<RelationshipResolver<'a>> {
        RelationshipResolver::new(&self.relationships, entity.record(), registry)
    }

    fn prepare(&self, criteria: Criteria) -> MapResult<(SelectQuery, Vec<Value>)> {
        match criteria {
            Criteria::Raw { query, params } => Ok((query, params)),
            Criteria::Conditions(tree) => {
                let translated = translate(&tree, self.query_builder())?;
                let params = translated.bind(None)?;
                Ok((translated.query().clone(), params))
            }
        }
    }

    fn fetch_row_by_key(&self, key: &Value) -> MapResult<Option<Row>> {
        let key = self.require_key(key, "read")?;
        let mut builder = self.query_builder();
        builder
            .and_where(format!(
                "{TABLE_ALIAS}.{} = ?",
                quote_ident(self.primary_key())
            ))
            .limit(1);
        Ok(self.storage.fetch_one(builder.build().as_str(), &[key])?)
    }

    fn load(&self, row: Row) -> E {
        E::from_record(self.load_record(row))
    }

    fn load_record(&self, row: FieldMap) -> Record {
        Record::from_store(ValueStore::new(Arc::clone(&self.schema), row, false))
    }

    fn require_key(&self, key: &Value, operation: &str) -> MapResult<Value> {
        if key.is_null() {
            return Err(MapError::InvalidArgument(format!(
                "{operation} on `{}` needs a non-null `{}`",
                self.table(),
                self.primary_key()
            )));
        }
        Ok(key.clone())
    }

    fn ensure_bound(&self, record: &Record) -> MapResult<()> {
        if Arc::ptr_eq(record.schema(), &self.schema) || **record.schema() == *self.schema {
            return Ok(());
        }
        Err(MapError::InvalidArgument(format!(
            "record of `{}` passed to manager for `{}`",
            record.table(),
            self.table()
        )))
    }
}

impl<E: Entity> RecordSource for Manager<E> {
    fn table(&self) -> &str {
        self.schema.table()
    }

    fn primary_key(&self) -> &str {
        self.schema.primary_key()
    }

    fn query_builder(&self) -> SelectBuilder {
        self.storage.build_query(self.schema.table())
    }

    fn fetch_record(&self, query: &SelectQuery, params: &[Value]) -> MapResult<Option<Record>> {
        let row = self.storage.fetch_one(query.as_str(), params)?;
        Ok(row.map(|row| self.load_record(row)))
    }

    fn fetch_all_records(&self, query: &SelectQuery, params: &[Value]) -> MapResult<Vec<Record>> {
        let rows = self.storage.fetch_all(query.as_str(), params)?;
        Ok(rows.into_iter().map(|row| self.load_record(row)).collect())
    }
}
