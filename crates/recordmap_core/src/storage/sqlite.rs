//! SQLite-backed storage collaborator.
//!
//! # Responsibility
//! - Execute manager statements over one `rusqlite::Connection`.
//! - Translate between core `Value`s and SQLite values.
//!
//! # Invariants
//! - Access to the connection is serialized by a mutex.
//! - `last_generated_id` reflects the connection's latest insert, so callers
//!   sharing one storage across threads must not interleave insert/read-id
//!   pairs.

use super::query::quote_ident;
use super::{ColumnInfo, Row, Storage};
use crate::db::{DbError, DbResult};
use crate::model::store::FieldMap;
use crate::model::value::Value;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection, Statement};
use std::sync::{Mutex, MutexGuard};

/// Storage over a single SQLite connection.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Runs `f` with exclusive access to the underlying connection.
    ///
    /// Intended for schema setup and ad-hoc statements outside the manager
    /// surface.
    pub fn with_connection<T>(
        &self,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> DbResult<T> {
        let conn = self.lock()?;
        Ok(f(&conn)?)
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DbError::Poisoned)
    }
}

impl Storage for SqliteStorage {
    fn insert(&self, table: &str, fields: &FieldMap) -> DbResult<usize> {
        let sql = insert_sql(table, fields);
        let conn = self.lock()?;
        let changed = conn.execute(&sql, params_from_iter(fields.values().map(SqlValue::from)))?;
        Ok(changed)
    }

    fn fetch_one(&self, sql: &str, params: &[Value]) -> DbResult<Option<Row>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let mut rows = query_rows(&mut stmt, params, Some(1))?;
        Ok(rows.pop())
    }

    fn fetch_all(&self, sql: &str, params: &[Value]) -> DbResult<Vec<Row>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        query_rows(&mut stmt, params, None)
    }

    fn execute(&self, sql: &str, params: &[Value]) -> DbResult<usize> {
        let conn = self.lock()?;
        let changed = conn.execute(sql, params_from_iter(params.iter().map(SqlValue::from)))?;
        Ok(changed)
    }

    fn last_generated_id(&self) -> DbResult<Value> {
        let conn = self.lock()?;
        Ok(Value::Integer(conn.last_insert_rowid()))
    }

    fn describe(&self, table: &str) -> DbResult<Vec<ColumnInfo>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({});", quote_ident(table)))?;
        let columns = stmt
            .query_map([], |row| {
                Ok(ColumnInfo {
                    name: row.get("name")?,
                    declared_type: row.get("type")?,
                    not_null: row.get::<_, i64>("notnull")? != 0,
                    primary_key: row.get::<_, i64>("pk")? != 0,
                    default_value: Value::from(row.get_ref("dflt_value")?),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(columns)
    }
}

fn insert_sql(table: &str, fields: &FieldMap) -> String {
    if fields.is_empty() {
        return format!("INSERT INTO {} DEFAULT VALUES;", quote_ident(table));
    }

    let columns = fields
        .keys()
        .map(|name| quote_ident(name))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = (1..=fields.len())
        .map(|position| format!("?{position}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {} ({columns}) VALUES ({placeholders});",
        quote_ident(table)
    )
}

fn query_rows(
    stmt: &mut Statement<'_>,
    params: &[Value],
    max_rows: Option<usize>,
) -> DbResult<Vec<Row>> {
    let names: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(str::to_string)
        .collect();
    let mut rows = stmt.query(params_from_iter(params.iter().map(SqlValue::from)))?;

    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut mapped = Row::new();
        for (position, name) in names.iter().enumerate() {
            mapped.insert(name.clone(), Value::from(row.get_ref(position)?));
        }
        out.push(mapped);
        if max_rows.is_some_and(|max| out.len() >= max) {
            break;
        }
    }

    Ok(out)
}
