//! SQLite handle behind `SqliteSnapshotStore`.
//!
//! The layout version lives in `PRAGMA user_version`. A fresh file gets the
//! snapshot table and the current version; a file written by a newer layout
//! is refused instead of being read with the wrong assumptions.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::StoreError;

const SCHEMA_VERSION: i64 = 1;

const PRAGMAS: &str = "PRAGMA journal_mode = WAL; PRAGMA busy_timeout = 5000;";

const CREATE_SNAPSHOTS: &str = "
CREATE TABLE IF NOT EXISTS session_snapshots (
    id TEXT PRIMARY KEY,
    snapshot TEXT NOT NULL,
    updated_at TEXT NOT NULL
);";

/// Shared connection, used synchronously behind a parking_lot mutex.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create the database file, creating its directory if needed.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Io(format!("create dir {}: {e}", parent.display())))?;
        }
        let db = Self::prepare(Connection::open(path)?)?;
        info!(path = %path.display(), "snapshot database opened");
        Ok(db)
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        Self::prepare(Connection::open_in_memory()?)
    }

    fn prepare(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(PRAGMAS)?;
        match schema_version(&conn)? {
            0 => {
                conn.execute_batch(CREATE_SNAPSHOTS)?;
                conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
                debug!(version = SCHEMA_VERSION, "snapshot table created");
            }
            SCHEMA_VERSION => {}
            other => return Err(StoreError::UnsupportedSchema(other)),
        }
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError>,
    {
        let conn = self.conn.lock();
        f(&conn)
    }
}

fn schema_version(conn: &Connection) -> Result<i64, StoreError> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_db() -> PathBuf {
        std::env::temp_dir()
            .join(format!("hearth-db-test-{}", uuid::Uuid::now_v7()))
            .join("sessions.db")
    }

    #[test]
    fn fresh_database_gets_current_version() {
        let db = Database::in_memory().unwrap();
        let version = db.with_conn(schema_version).unwrap();
        assert_eq!(version, SCHEMA_VERSION);
        let rows: i64 = db
            .with_conn(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM session_snapshots", [], |row| row.get(0))?)
            })
            .unwrap();
        assert_eq!(rows, 0);
    }

    #[test]
    fn reopen_keeps_rows() {
        let path = temp_db();
        let db = Database::open(&path).unwrap();
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO session_snapshots (id, snapshot, updated_at) VALUES ('s', '{}', 'now')",
                [],
            )?;
            Ok(())
        })
        .unwrap();
        drop(db);

        let db = Database::open(&path).unwrap();
        let rows: i64 = db
            .with_conn(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM session_snapshots", [], |row| row.get(0))?)
            })
            .unwrap();
        assert_eq!(rows, 1);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn newer_layout_is_refused() {
        let path = temp_db();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        Connection::open(&path)
            .unwrap()
            .pragma_update(None, "user_version", 7)
            .unwrap();

        let err = Database::open(&path).err().unwrap();
        assert!(matches!(err, StoreError::UnsupportedSchema(7)));
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
