//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections.
//! - Configure connection pragmas required by core behavior.
//! - Ensure entity schemas before returning a usable connection when asked to.
//!
//! # Invariants
//! - Returned connections use UTF-8 encoding and the configured busy timeout.
//! - `open_db` / `open_db_in_memory` always return fully migrated connections.

use super::config::{DbConfig, DbTarget};
use super::schema::ensure_all;
use super::DbResult;
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::Instant;

/// Opens a SQLite database file and ensures the `users`/`products` schemas.
///
/// # Side effects
/// - Emits `db_open` logging events with duration and status.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    let mut config = DbConfig::file(path.as_ref());
    config.auto_migrate = true;
    connect(&config)
}

/// Opens a private in-memory database and ensures the `users`/`products` schemas.
pub fn open_db_in_memory() -> DbResult<Connection> {
    let mut config = DbConfig::memory();
    config.auto_migrate = true;
    connect(&config)
}

/// Opens the connection described by `config`.
///
/// Schemas are only ensured when `config.auto_migrate` is set; otherwise the
/// caller decides when to run `ensure_all`.
///
/// # Side effects
/// - Emits `db_open` logging events with duration and status.
pub fn connect(config: &DbConfig) -> DbResult<Connection> {
    let started_at = Instant::now();
    let mode = match config.target {
        DbTarget::File(_) => "file",
        DbTarget::Memory => "memory",
    };
    info!("event=db_open module=db status=start mode={mode}");

    let opened = match &config.target {
        DbTarget::File(path) => Connection::open(path),
        DbTarget::Memory => Connection::open_in_memory(),
    };
    let conn = match opened {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_open_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    match bootstrap_connection(&conn, config) {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok mode={mode} auto_migrate={} duration_ms={}",
                config.auto_migrate,
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_bootstrap_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn bootstrap_connection(conn: &Connection, config: &DbConfig) -> DbResult<()> {
    // Only takes effect before the first table is created.
    conn.execute_batch("PRAGMA encoding = 'UTF-8';")?;
    conn.pragma_update(None, "foreign_keys", config.foreign_keys)?;
    conn.busy_timeout(config.busy_timeout)?;
    if config.auto_migrate {
        ensure_all(conn)?;
    }
    Ok(())
}
