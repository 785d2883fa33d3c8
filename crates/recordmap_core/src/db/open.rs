//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections.
//! - Apply connection options before returning a usable connection.
//!
//! # Invariants
//! - Returned connections have `DbOptions` applied.

use super::DbResult;
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

/// Connection-level settings applied at open time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbOptions {
    /// How long SQLite waits on a locked database before failing.
    pub busy_timeout: Duration,
    /// Enforce `FOREIGN KEY` constraints.
    pub foreign_keys: bool,
}

impl Default for DbOptions {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_secs(5),
            foreign_keys: true,
        }
    }
}

/// Opens a SQLite database file with default options.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    open_db_with(path, DbOptions::default())
}

/// Opens a SQLite database file with explicit options.
///
/// # Side effects
/// - Emits `db_open` logging events with duration and status.
pub fn open_db_with(path: impl AsRef<Path>, options: DbOptions) -> DbResult<Connection> {
    bootstrap("file", options, || Connection::open(path))
}

/// Opens an in-memory SQLite database with default options.
pub fn open_db_in_memory() -> DbResult<Connection> {
    bootstrap("memory", DbOptions::default(), Connection::open_in_memory)
}

fn bootstrap(
    mode: &str,
    options: DbOptions,
    open: impl FnOnce() -> rusqlite::Result<Connection>,
) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode={mode}");

    let result = open().and_then(|conn| {
        configure(&conn, options)?;
        Ok(conn)
    });

    match result {
        Ok(conn) => {
            info!(
                "event=db_open module=db status=ok mode={mode} duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            );
            Err(err.into())
        }
    }
}

fn configure(conn: &Connection, options: DbOptions) -> rusqlite::Result<()> {
    let pragma = if options.foreign_keys {
        "PRAGMA foreign_keys = ON;"
    } else {
        "PRAGMA foreign_keys = OFF;"
    };
    conn.execute_batch(pragma)?;
    conn.busy_timeout(options.busy_timeout)?;
    Ok(())
}
