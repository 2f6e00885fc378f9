//! SQLite world state implementation.

use crate::state::{exhausted, page_limit, resume_key};
use crate::{Error, KeyValue, Result, ScanPage, WorldState};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;

/// SQLite-backed world state.
///
/// Several contracts may share one database file; each handle only sees
/// the keys of its own namespace.
pub struct SqliteState {
    conn: Connection,
    namespace: String,
}

impl SqliteState {
    /// Open or create a state database at the given path.
    pub fn open(path: impl AsRef<Path>, namespace: impl Into<String>) -> Result<Self> {
        let conn = Connection::open(path)?;
        let state = Self {
            conn,
            namespace: namespace.into(),
        };
        state.init_schema()?;
        Ok(state)
    }

    /// Create an in-memory state database (useful for testing).
    pub fn in_memory(namespace: impl Into<String>) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let state = Self {
            conn,
            namespace: namespace.into(),
        };
        state.init_schema()?;
        Ok(state)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS world_state (
                namespace TEXT NOT NULL,
                key TEXT NOT NULL,
                value BLOB NOT NULL,
                PRIMARY KEY (namespace, key)
            );
            "#,
        )?;
        Ok(())
    }
}

impl WorldState for SqliteState {
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM world_state WHERE namespace = ?1 AND key = ?2",
                params![self.namespace, key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn put_state(&mut self, key: &str, value: &[u8]) -> Result<()> {
        self.conn.execute(
            "INSERT INTO world_state (namespace, key, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(namespace, key) DO UPDATE SET value = excluded.value",
            params![self.namespace, key, value],
        )?;
        Ok(())
    }

    fn del_state(&mut self, key: &str) -> Result<()> {
        self.conn.execute(
            "DELETE FROM world_state WHERE namespace = ?1 AND key = ?2",
            params![self.namespace, key],
        )?;
        Ok(())
    }

    fn range_scan(
        &self,
        start: &str,
        end: &str,
        page_size: i32,
        bookmark: &str,
    ) -> Result<ScanPage<'_>> {
        let limit = page_limit(page_size)?;
        let from = resume_key(start, bookmark);
        if exhausted(from, end) {
            return Ok(ScanPage::new(std::iter::empty(), String::new()));
        }

        // One extra row tells us where the next page starts.
        let mut stmt = self.conn.prepare(
            "SELECT key, value FROM world_state
             WHERE namespace = ?1 AND key >= ?2 AND (?3 = '' OR key < ?3)
             ORDER BY key LIMIT ?4",
        )?;
        let fetch = limit as i64 + 1;
        let mut rows = stmt
            .query_map(
                params![self.namespace, from, end, fetch],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?)),
            )?
            .collect::<rusqlite::Result<Vec<KeyValue>>>()?;

        let bookmark = if rows.len() > limit {
            rows.pop().map(|(key, _)| key).unwrap_or_default()
        } else {
            String::new()
        };
        tracing::debug!(
            namespace = %self.namespace,
            from,
            returned = rows.len(),
            "range scan"
        );

        Ok(ScanPage::new(rows.into_iter().map(Ok::<KeyValue, Error>), bookmark))
    }

    fn begin(&mut self) -> Result<()> {
        if !self.conn.is_autocommit() {
            return Err(Error::Transaction("invocation already in progress".into()));
        }
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        if self.conn.is_autocommit() {
            return Err(Error::Transaction("no invocation in progress".into()));
        }
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        if self.conn.is_autocommit() {
            return Err(Error::Transaction("no invocation in progress".into()));
        }
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }
}
