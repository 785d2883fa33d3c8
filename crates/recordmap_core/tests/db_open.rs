mod common;

use common::{row, User, SCHEMA_SQL};
use recordmap_core::db::{open_db, open_db_in_memory, open_db_with, DbOptions};
use recordmap_core::{Manager, SqliteStorage, Value};
use std::sync::Arc;
use std::time::Duration;

fn foreign_keys(conn: &rusqlite::Connection) -> i64 {
    conn.query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap()
}

#[test]
fn default_options_enable_foreign_keys() {
    let conn = open_db_in_memory().unwrap();
    assert_eq!(foreign_keys(&conn), 1);
    assert_eq!(DbOptions::default().busy_timeout, Duration::from_secs(5));
}

#[test]
fn explicit_options_are_applied() {
    let dir = tempfile::tempdir().unwrap();
    let options = DbOptions {
        busy_timeout: Duration::from_millis(250),
        foreign_keys: false,
    };
    let conn = open_db_with(dir.path().join("opts.sqlite3"), options).unwrap();
    assert_eq!(foreign_keys(&conn), 0);
}

#[test]
fn file_database_persists_across_connections() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("records.sqlite3");

    {
        let storage = SqliteStorage::new(open_db(&path).unwrap());
        storage
            .with_connection(|conn| conn.execute_batch(SCHEMA_SQL))
            .unwrap();
        let users: Manager<User> = Manager::new(Arc::new(storage)).unwrap();
        let mut user = users.fresh(row(&[("name", Value::from("ada"))]), true);
        users.create(&mut user).unwrap();
    }

    let users: Manager<User> =
        Manager::new(Arc::new(SqliteStorage::new(open_db(&path).unwrap()))).unwrap();
    let user = users.read(1).unwrap().expect("row should survive reopen");
    assert_eq!(user.name(), Some("ada"));
}

