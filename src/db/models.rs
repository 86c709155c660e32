// src/db/models.rs

//! Typed access to the preference store and apply history tables.

use crate::apply::{ApplyResult, PreferenceSink};
use crate::error::{Error, Result};
use rusqlite::{params, Connection};
use std::collections::BTreeMap;

/// SQLite-backed preference store.
///
/// This is the "observed preferences" side of a diff and the store that
/// `PreferenceChange` actions mutate during a real apply.
pub struct PrefsStore<'a> {
    conn: &'a Connection,
}

impl<'a> PrefsStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// All preferences, sorted by key
    pub fn get_all(&self) -> Result<BTreeMap<String, String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, value FROM preferences ORDER BY key")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut prefs = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            prefs.insert(key, value);
        }
        Ok(prefs)
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM preferences WHERE key = ?1")?;
        let mut rows = stmt.query_map(params![key], |row| row.get::<_, String>(0))?;
        match rows.next() {
            Some(value) => Ok(Some(value?)),
            None => Ok(None),
        }
    }

    pub fn put(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO preferences (key, value, updated_at)
             VALUES (?1, ?2, CURRENT_TIMESTAMP)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = CURRENT_TIMESTAMP",
            params![key, value],
        )?;
        Ok(())
    }
}

impl PreferenceSink for PrefsStore<'_> {
    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.put(key, value)
            .map_err(|e| Error::PreferenceError(e.to_string()))
    }
}

/// One recorded apply invocation
#[derive(Debug, Clone)]
pub struct ApplyRun {
    pub id: Option<i64>,
    pub run_id: String,
    pub started_at: String,
    pub finished_at: String,
    pub dry_run: bool,
    pub succeeded: i64,
    pub failed: i64,
    pub skipped: i64,
    pub unrecoverable: i64,
    pub summary: String,
}

impl ApplyRun {
    /// Build a history row from an apply result
    pub fn from_result(result: &ApplyResult, summary: impl Into<String>) -> Self {
        Self {
            id: None,
            run_id: result.run_id.to_string(),
            started_at: result.started_at.to_rfc3339(),
            finished_at: result.finished_at.to_rfc3339(),
            dry_run: result.dry_run,
            succeeded: result.succeeded.len() as i64,
            failed: result.failed.len() as i64,
            skipped: result.skipped.len() as i64,
            unrecoverable: result.unrecoverable_count() as i64,
            summary: summary.into(),
        }
    }

    pub fn insert(&mut self, conn: &Connection) -> Result<i64> {
        conn.execute(
            "INSERT INTO apply_history
                (run_id, started_at, finished_at, dry_run,
                 succeeded, failed, skipped, unrecoverable, summary)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                self.run_id,
                self.started_at,
                self.finished_at,
                self.dry_run,
                self.succeeded,
                self.failed,
                self.skipped,
                self.unrecoverable,
                self.summary,
            ],
        )?;
        let id = conn.last_insert_rowid();
        self.id = Some(id);
        Ok(id)
    }

    /// Most recent runs first
    pub fn list_recent(conn: &Connection, limit: i64) -> Result<Vec<ApplyRun>> {
        let mut stmt = conn.prepare(
            "SELECT id, run_id, started_at, finished_at, dry_run,
                    succeeded, failed, skipped, unrecoverable, summary
             FROM apply_history
             ORDER BY id DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], |row| {
            Ok(ApplyRun {
                id: Some(row.get(0)?),
                run_id: row.get(1)?,
                started_at: row.get(2)?,
                finished_at: row.get(3)?,
                dry_run: row.get(4)?,
                succeeded: row.get(5)?,
                failed: row.get(6)?,
                skipped: row.get(7)?,
                unrecoverable: row.get(8)?,
                summary: row.get(9)?,
            })
        })?;

        let mut runs = Vec::new();
        for row in rows {
            runs.push(row?);
        }
        Ok(runs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[test]
    fn test_prefs_put_get() {
        let conn = db::open_in_memory().unwrap();
        let store = PrefsStore::new(&conn);

        assert_eq!(store.get("editor.theme").unwrap(), None);
        store.put("editor.theme", "dark").unwrap();
        assert_eq!(
            store.get("editor.theme").unwrap(),
            Some("dark".to_string())
        );

        store.put("editor.theme", "light").unwrap();
        assert_eq!(
            store.get("editor.theme").unwrap(),
            Some("light".to_string())
        );
    }

    #[test]
    fn test_prefs_get_all_sorted() {
        let conn = db::open_in_memory().unwrap();
        let store = PrefsStore::new(&conn);

        store.put("zeta", "1").unwrap();
        store.put("alpha", "2").unwrap();

        let all = store.get_all().unwrap();
        let keys: Vec<_> = all.keys().cloned().collect();
        assert_eq!(keys, vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_apply_run_insert_and_list() {
        let conn = db::open_in_memory().unwrap();

        let mut run = ApplyRun {
            id: None,
            run_id: "run-1".to_string(),
            started_at: "2026-01-01T00:00:00Z".to_string(),
            finished_at: "2026-01-01T00:00:05Z".to_string(),
            dry_run: false,
            succeeded: 3,
            failed: 1,
            skipped: 0,
            unrecoverable: 0,
            summary: "3 succeeded, 1 failed".to_string(),
        };
        run.insert(&conn).unwrap();

        let mut second = ApplyRun {
            run_id: "run-2".to_string(),
            ..run.clone()
        };
        second.id = None;
        second.insert(&conn).unwrap();

        let runs = ApplyRun::list_recent(&conn, 10).unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].run_id, "run-2");
        assert_eq!(runs[1].summary, "3 succeeded, 1 failed");
    }
}
