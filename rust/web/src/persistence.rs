//! Snapshot storage for game state.
//!
//! The session layer only sees [`SnapshotStore`]. Every write replaces the
//! whole state for one code, so a reader always gets a complete snapshot.
//! Implementations are blocking; callers run them on
//! `tokio::task::spawn_blocking`.

use chrono::Utc;
use letterbox_engine::game::GameState;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, RwLock};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Snapshot serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Storage task failed: {0}")]
    Join(String),
    #[error("Could not prepare database location: {0}")]
    Io(#[from] std::io::Error),
    #[error("Snapshot store lock poisoned")]
    Poisoned,
}

pub trait SnapshotStore: Send + Sync + std::fmt::Debug + 'static {
    /// Insert or replace the snapshot for `state.code()`.
    fn upsert(&self, state: &GameState) -> Result<(), PersistenceError>;

    fn fetch(&self, code: &str) -> Result<Option<GameState>, PersistenceError>;

    /// Returns whether a snapshot existed.
    fn delete(&self, code: &str) -> Result<bool, PersistenceError>;
}

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS games (
    code TEXT NOT NULL PRIMARY KEY,
    state TEXT NOT NULL,
    updated_at TEXT NOT NULL
)";

#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        tracing::info!(path = %path.display(), "opened snapshot database");
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, PersistenceError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, PersistenceError> {
        conn.execute(SCHEMA, [])?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>, PersistenceError> {
        self.conn.lock().map_err(|_| PersistenceError::Poisoned)
    }
}

impl SnapshotStore for SqliteStore {
    fn upsert(&self, state: &GameState) -> Result<(), PersistenceError> {
        let json = serde_json::to_string(state)?;
        let now = Utc::now().to_rfc3339();
        self.conn()?.execute(
            "INSERT INTO games (code, state, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(code) DO UPDATE SET state = excluded.state, updated_at = excluded.updated_at",
            params![state.code(), json, now],
        )?;
        Ok(())
    }

    fn fetch(&self, code: &str) -> Result<Option<GameState>, PersistenceError> {
        let raw: Option<String> = self
            .conn()?
            .query_row(
                "SELECT state FROM games WHERE code = ?1",
                params![code],
                |row| row.get(0),
            )
            .optional()?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn delete(&self, code: &str) -> Result<bool, PersistenceError> {
        let removed = self
            .conn()?
            .execute("DELETE FROM games WHERE code = ?1", params![code])?;
        Ok(removed > 0)
    }
}

/// Keeps serialized snapshots in a map. Used by tests and by
/// [`crate::server::AppContext::new_for_tests`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshots: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.snapshots.read().map(|g| g.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SnapshotStore for MemoryStore {
    fn upsert(&self, state: &GameState) -> Result<(), PersistenceError> {
        let json = serde_json::to_string(state)?;
        self.snapshots
            .write()
            .map_err(|_| PersistenceError::Poisoned)?
            .insert(state.code().to_string(), json);
        Ok(())
    }

    fn fetch(&self, code: &str) -> Result<Option<GameState>, PersistenceError> {
        let guard = self
            .snapshots
            .read()
            .map_err(|_| PersistenceError::Poisoned)?;
        match guard.get(code) {
            Some(json) => Ok(Some(serde_json::from_str(json)?)),
            None => Ok(None),
        }
    }

    fn delete(&self, code: &str) -> Result<bool, PersistenceError> {
        Ok(self
            .snapshots
            .write()
            .map_err(|_| PersistenceError::Poisoned)?
            .remove(code)
            .is_some())
    }
}
