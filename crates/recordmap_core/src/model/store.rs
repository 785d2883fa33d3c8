//! Layered field storage for one record.
//!
//! # Responsibility
//! - Keep the last persisted field values (`baseline`) apart from pending
//!   writes (`modified`) and from unmodeled attached data (`container`).
//! - Expose the pending delta so writes only touch changed fields.
//!
//! # Invariants
//! - `baseline` always holds every schema field (default `Value::Null`).
//! - `modified` and `baseline` only ever hold schema fields.
//! - `container` never holds a schema field.
//! - Lookup order is `modified` -> `baseline` -> `container` -> `Null`.
//! - `baseline` is only replaced wholesale, by `reset`.

use crate::error::{MapError, MapResult};
use crate::model::schema::FieldSchema;
use crate::model::value::{Value, NULL};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Field name to value mapping used for rows, snapshots and deltas.
pub type FieldMap = BTreeMap<String, Value>;

/// Three-layer value storage bound to one schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueStore {
    schema: Arc<FieldSchema>,
    baseline: FieldMap,
    modified: FieldMap,
    container: FieldMap,
}

impl ValueStore {
    /// Creates a store and classifies `initial` into schema fields and extras.
    ///
    /// Schema fields land in `modified` when `as_modified` is set (pending
    /// create), otherwise in `baseline` (already persisted).
    pub fn new<I, K>(schema: Arc<FieldSchema>, initial: I, as_modified: bool) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let baseline = defaults(&schema);
        let mut store = Self {
            schema,
            baseline,
            modified: FieldMap::new(),
            container: FieldMap::new(),
        };

        for (name, value) in initial {
            let name = name.into();
            if !store.schema.contains(&name) {
                store.container.insert(name, value);
            } else if as_modified {
                store.modified.insert(name, value);
            } else {
                store.baseline.insert(name, value);
            }
        }

        store
    }

    /// Creates a store from a JSON object.
    ///
    /// # Errors
    /// - `InvalidArgument` when `data` is not an object, or when one of its
    ///   members is an array/object instead of a scalar.
    pub fn from_json(
        schema: Arc<FieldSchema>,
        data: &serde_json::Value,
        as_modified: bool,
    ) -> MapResult<Self> {
        let object = data.as_object().ok_or_else(|| {
            MapError::InvalidArgument(format!(
                "record data for `{}` must be a JSON object",
                schema.table()
            ))
        })?;

        let mut pairs = Vec::with_capacity(object.len());
        for (name, raw) in object {
            let value = Value::from_json(raw).ok_or_else(|| {
                MapError::InvalidArgument(format!(
                    "field `{name}` on `{}` must be a scalar",
                    schema.table()
                ))
            })?;
            pairs.push((name.clone(), value));
        }

        Ok(Self::new(schema, pairs, as_modified))
    }

    pub fn schema(&self) -> &Arc<FieldSchema> {
        &self.schema
    }

    /// Returns the current value for `name`, or `Value::Null` when unknown.
    pub fn get(&self, name: &str) -> &Value {
        self.modified
            .get(name)
            .or_else(|| self.baseline.get(name))
            .or_else(|| self.container.get(name))
            .unwrap_or(&NULL)
    }

    /// Whether `name` resolves through any layer.
    pub fn contains(&self, name: &str) -> bool {
        self.schema.contains(name) || self.container.contains_key(name)
    }

    /// Writes a schema field into the pending delta, anything else into the
    /// container.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        if self.schema.contains(&name) {
            self.modified.insert(name, value);
        } else {
            self.container.insert(name, value);
        }
    }

    /// Drops a pending write, or a container entry when nothing is pending.
    pub fn unset(&mut self, name: &str) {
        if self.modified.remove(name).is_none() {
            self.container.remove(name);
        }
    }

    /// Schema fields with pending writes applied over the baseline.
    pub fn current_snapshot(&self) -> FieldMap {
        let mut snapshot = self.baseline.clone();
        for (name, value) in &self.modified {
            snapshot.insert(name.clone(), value.clone());
        }
        snapshot
    }

    /// Pending writes since the last reset.
    pub fn dirty_fields(&self) -> &FieldMap {
        &self.modified
    }

    pub fn is_dirty(&self) -> bool {
        !self.modified.is_empty()
    }

    pub fn container(&self) -> &FieldMap {
        &self.container
    }

    /// Replaces the baseline with `data` and clears pending writes.
    ///
    /// Non-schema entries of `data` replace the container when
    /// `clear_container` is set and are merged into it otherwise.
    pub fn reset(&mut self, data: FieldMap, clear_container: bool) {
        let mut baseline = defaults(&self.schema);
        let mut extras = FieldMap::new();
        for (name, value) in data {
            if self.schema.contains(&name) {
                baseline.insert(name, value);
            } else {
                extras.insert(name, value);
            }
        }

        self.baseline = baseline;
        self.modified.clear();
        if clear_container {
            self.container = extras;
        } else {
            self.container.extend(extras);
        }
    }

    /// Number of resolvable names: every schema field plus container entries.
    pub fn count(&self) -> usize {
        self.current_snapshot().len() + self.container.len()
    }
}

fn defaults(schema: &FieldSchema) -> FieldMap {
    schema
        .names()
        .map(|name| (name.to_string(), Value::Null))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{FieldMap, ValueStore};
    use crate::error::MapError;
    use crate::model::schema::FieldSchema;
    use crate::model::value::Value;
    use std::sync::Arc;

    fn user_schema() -> Arc<FieldSchema> {
        Arc::new(FieldSchema::new("users", "id", ["id", "name"]).unwrap())
    }

    #[test]
    fn classifies_initial_data_into_baseline_and_container() {
        let store = ValueStore::new(
            user_schema(),
            [("name", Value::from("a")), ("extra", Value::from(1))],
            false,
        );

        assert_eq!(store.get("name"), &Value::from("a"));
        assert_eq!(store.get("extra"), &Value::Integer(1));
        assert!(store.get("id").is_null());
        assert_eq!(store.count(), 3);
        assert!(store.dirty_fields().is_empty());
    }

    #[test]
    fn pending_data_lands_in_modified() {
        let store = ValueStore::new(user_schema(), [("name", Value::from("a"))], true);
        assert_eq!(store.dirty_fields().len(), 1);
        assert_eq!(store.get("name"), &Value::from("a"));
    }

    #[test]
    fn set_then_unset_restores_snapshot() {
        let mut store = ValueStore::new(user_schema(), [("name", Value::from("a"))], false);
        let before = store.current_snapshot();

        store.set("name", "b");
        assert_eq!(store.current_snapshot()["name"], Value::from("b"));

        store.unset("name");
        assert_eq!(store.current_snapshot(), before);
        assert!(!store.is_dirty());
    }

    #[test]
    fn non_schema_writes_go_to_container_and_stay_out_of_snapshot() {
        let mut store = ValueStore::new(user_schema(), Vec::<(String, Value)>::new(), false);
        store.set("token", "abc");

        assert_eq!(store.get("token"), &Value::from("abc"));
        assert!(!store.current_snapshot().contains_key("token"));
        assert!(store.dirty_fields().is_empty());

        store.unset("token");
        assert!(store.get("token").is_null());
        assert!(!store.contains("token"));
    }

    #[test]
    fn unset_never_touches_baseline() {
        let mut store = ValueStore::new(user_schema(), [("name", Value::from("a"))], false);
        store.unset("name");
        assert_eq!(store.get("name"), &Value::from("a"));
    }

    #[test]
    fn reset_clears_modified_and_handles_container() {
        let mut store = ValueStore::new(
            user_schema(),
            [("name", Value::from("a")), ("keep", Value::from(1))],
            true,
        );

        let mut data = FieldMap::new();
        data.insert("id".to_string(), Value::from(5));
        data.insert("name".to_string(), Value::from("a"));
        data.insert("attached".to_string(), Value::from(2));
        store.reset(data.clone(), false);

        assert!(store.dirty_fields().is_empty());
        assert_eq!(store.get("id"), &Value::Integer(5));
        assert_eq!(store.get("keep"), &Value::Integer(1));
        assert_eq!(store.get("attached"), &Value::Integer(2));

        store.set("name", "b");
        store.reset(data, true);
        assert!(store.dirty_fields().is_empty());
        assert!(store.get("keep").is_null());
        assert_eq!(store.get("attached"), &Value::Integer(2));
        assert_eq!(store.get("name"), &Value::from("a"));
    }

    #[test]
    fn reset_fills_missing_schema_fields_with_null() {
        let mut store = ValueStore::new(
            user_schema(),
            [("id", Value::from(1)), ("name", Value::from("a"))],
            false,
        );
        store.reset(FieldMap::new(), true);
        assert!(store.get("name").is_null());
        assert_eq!(store.current_snapshot().len(), 2);
    }

    #[test]
    fn from_json_rejects_non_objects() {
        let err = ValueStore::from_json(user_schema(), &serde_json::json!([1, 2]), false)
            .unwrap_err();
        assert!(matches!(err, MapError::InvalidArgument(_)));

        let err = ValueStore::from_json(
            user_schema(),
            &serde_json::json!({"name": {"nested": true}}),
            false,
        )
        .unwrap_err();
        assert!(matches!(err, MapError::InvalidArgument(_)));
    }

    #[test]
    fn from_json_classifies_members() {
        let store = ValueStore::from_json(
            user_schema(),
            &serde_json::json!({"name": "a", "extra": 1}),
            true,
        )
        .unwrap();
        assert_eq!(store.dirty_fields().len(), 1);
        assert_eq!(store.container().len(), 1);
    }
}
