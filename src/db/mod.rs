// src/db/mod.rs

//! Local state database.
//!
//! All persistent host-side state lives in SQLite: the preference store
//! that `PreferenceChange` actions mutate, and the history of apply
//! runs. Snapshots and plans are deliberately not persisted here; they
//! are rebuilt fresh for every operation.

pub mod models;
pub mod schema;

use crate::error::Result;
use rusqlite::Connection;
use std::path::Path;

/// Default path for the outfit database
pub const DEFAULT_DB_PATH: &str = "/var/lib/outfit/outfit.db";

/// Initialize a database at the given path, creating parent directories
pub fn init(db_path: &str) -> Result<()> {
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let conn = Connection::open(db_path)?;
    schema::migrate(&conn)?;
    Ok(())
}

/// Open an existing (or new) database and bring its schema up to date
pub fn open(db_path: &str) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    schema::migrate(&conn)?;
    Ok(conn)
}

/// In-memory database for tests
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    schema::migrate(&conn)?;
    Ok(conn)
}

/// Run a closure inside a SQLite transaction
pub fn transaction<T, F>(conn: &mut Connection, f: F) -> Result<T>
where
    F: FnOnce(&rusqlite::Transaction) -> Result<T>,
{
    let tx = conn.transaction()?;
    let result = f(&tx)?;
    tx.commit()?;
    Ok(result)
}
