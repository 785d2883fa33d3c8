#![allow(dead_code)]

use recordmap_core::db::{open_db_in_memory, DbResult};
use recordmap_core::{
    Clause, ColumnInfo, ConditionNode, Entity, FieldDescriptor, FieldMap, FieldType,
    ManagerRegistry, Record, RelationshipDeclaration, Relationships, Row, SelectBuilder,
    SqliteStorage, Storage, Value,
};
use std::sync::{Arc, Mutex};

pub const SCHEMA_SQL: &str = "
    CREATE TABLE users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT,
        email TEXT
    );
    CREATE TABLE profiles (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        bio TEXT
    );
    CREATE TABLE posts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        title TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'draft'
    );
    CREATE TABLE tags (
        id TEXT PRIMARY KEY,
        label TEXT NOT NULL
    );
";

pub struct User {
    record: Record,
}

impl User {
    pub fn id(&self) -> Option<i64> {
        self.record.get("id").as_i64()
    }

    pub fn name(&self) -> Option<&str> {
        self.record.get("name").as_str()
    }

    pub fn set_name(&mut self, name: &str) {
        self.record.set("name", name);
    }

    pub fn email(&self) -> Option<&str> {
        self.record.get("email").as_str()
    }

    pub fn set_email(&mut self, email: &str) {
        self.record.set("email", email);
    }
}

impl Entity for User {
    const TABLE: &'static str = "users";

    fn fields() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::new("id", FieldType::Integer),
            FieldDescriptor::new("name", FieldType::Text),
            FieldDescriptor::new("email", FieldType::Text),
        ]
    }

    fn relationships() -> Relationships {
        Relationships::new()
            .with(
                "profile",
                RelationshipDeclaration::one("profiles", Clause::owner_field("t.user_id", "id")),
            )
            .with(
                "posts",
                RelationshipDeclaration::many("posts", Clause::owner_field("t.user_id", "id")),
            )
            .with(
                "published_posts",
                RelationshipDeclaration::many(
                    "posts",
                    ConditionNode::all([
                        Clause::owner_field("t.user_id", "id"),
                        Clause::value("t.status", "published"),
                    ]),
                ),
            )
    }

    fn from_record(record: Record) -> Self {
        Self { record }
    }

    fn record(&self) -> &Record {
        &self.record
    }

    fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }

    fn into_record(self) -> Record {
        self.record
    }
}

pub struct Post {
    record: Record,
}

impl Post {
    pub fn title(&self) -> Option<&str> {
        self.record.get("title").as_str()
    }

    pub fn status(&self) -> Option<&str> {
        self.record.get("status").as_str()
    }
}

impl Entity for Post {
    const TABLE: &'static str = "posts";

    fn fields() -> Vec<FieldDescriptor> {
        vec!["id".into(), "user_id".into(), "title".into(), "status".into()]
    }

    fn relationships() -> Relationships {
        Relationships::new().with(
            "author",
            RelationshipDeclaration::one("users", Clause::owner_field("t.id", "user_id")),
        )
    }

    fn from_record(record: Record) -> Self {
        Self { record }
    }

    fn record(&self) -> &Record {
        &self.record
    }

    fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }

    fn into_record(self) -> Record {
        self.record
    }
}

pub struct Profile {
    record: Record,
}

impl Entity for Profile {
    const TABLE: &'static str = "profiles";

    fn fields() -> Vec<FieldDescriptor> {
        vec!["id".into(), "user_id".into(), "bio".into()]
    }

    fn from_record(record: Record) -> Self {
        Self { record }
    }

    fn record(&self) -> &Record {
        &self.record
    }

    fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }

    fn into_record(self) -> Record {
        self.record
    }
}

/// Record keyed by a caller-generated UUID stored as text.
pub struct Tag {
    record: Record,
}

impl Tag {
    pub fn label(&self) -> Option<&str> {
        self.record.get("label").as_str()
    }
}

impl Entity for Tag {
    const TABLE: &'static str = "tags";

    fn fields() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::new("id", FieldType::Text),
            FieldDescriptor::new("label", FieldType::Text),
        ]
    }

    fn from_record(record: Record) -> Self {
        Self { record }
    }

    fn record(&self) -> &Record {
        &self.record
    }

    fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }

    fn into_record(self) -> Record {
        self.record
    }
}

/// In-memory SQLite storage with the fixture tables created.
pub fn sqlite_storage() -> Arc<SqliteStorage> {
    let storage = SqliteStorage::new(open_db_in_memory().unwrap());
    storage
        .with_connection(|conn| conn.execute_batch(SCHEMA_SQL))
        .unwrap();
    Arc::new(storage)
}

pub fn registry(storage: Arc<dyn Storage>) -> ManagerRegistry {
    let mut registry = ManagerRegistry::new(storage);
    registry.register_entity::<User>("users").unwrap();
    registry.register_entity::<Post>("posts").unwrap();
    registry.register_entity::<Profile>("profiles").unwrap();
    registry
}

pub fn row(pairs: &[(&str, Value)]) -> Vec<(String, Value)> {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

/// One statement observed by `RecordingStorage`.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub kind: &'static str,
    pub sql: String,
    pub params: Vec<Value>,
}

/// Storage decorator that records every statement before delegating.
pub struct RecordingStorage {
    inner: Arc<SqliteStorage>,
    calls: Mutex<Vec<Call>>,
}

impl RecordingStorage {
    pub fn new(inner: Arc<SqliteStorage>) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_of(&self, kind: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| call.kind == kind)
            .collect()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, kind: &'static str, sql: &str, params: &[Value]) {
        self.calls.lock().unwrap().push(Call {
            kind,
            sql: sql.to_string(),
            params: params.to_vec(),
        });
    }
}

impl Storage for RecordingStorage {
    fn insert(&self, table: &str, fields: &FieldMap) -> DbResult<usize> {
        let params: Vec<Value> = fields.values().cloned().collect();
        self.record("insert", table, &params);
        self.inner.insert(table, fields)
    }

    fn fetch_one(&self, sql: &str, params: &[Value]) -> DbResult<Option<Row>> {
        self.record("fetch_one", sql, params);
        self.inner.fetch_one(sql, params)
    }

    fn fetch_all(&self, sql: &str, params: &[Value]) -> DbResult<Vec<Row>> {
        self.record("fetch_all", sql, params);
        self.inner.fetch_all(sql, params)
    }

    fn execute(&self, sql: &str, params: &[Value]) -> DbResult<usize> {
        self.record("execute", sql, params);
        self.inner.execute(sql, params)
    }

    fn last_generated_id(&self) -> DbResult<Value> {
        self.inner.last_generated_id()
    }

    fn describe(&self, table: &str) -> DbResult<Vec<ColumnInfo>> {
        self.inner.describe(table)
    }

    fn build_query(&self, table: &str) -> SelectBuilder {
        self.inner.build_query(table)
    }
}
