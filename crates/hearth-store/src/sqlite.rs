use chrono::Utc;
use hearth_core::ids::SessionId;
use rusqlite::OptionalExtension;
use tracing::{debug, instrument};

use crate::database::Database;
use crate::error::StoreError;
use crate::snapshot::{storage_key, SnapshotStore};

/// Snapshots as rows of the `session_snapshots` table.
pub struct SqliteSnapshotStore {
    db: Database,
}

impl SqliteSnapshotStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl SnapshotStore for SqliteSnapshotStore {
    #[instrument(skip(self, snapshot), fields(session_id = %id))]
    fn save(&self, id: &SessionId, snapshot: &serde_json::Value) -> Result<(), StoreError> {
        let key = storage_key(id)?;
        let raw = serde_json::to_string(snapshot)?;
        let now = Utc::now().to_rfc3339();
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO session_snapshots (id, snapshot, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET snapshot = excluded.snapshot,
                                               updated_at = excluded.updated_at",
                rusqlite::params![key, raw, now],
            )?;
            Ok(())
        })?;
        debug!("snapshot saved (sqlite)");
        Ok(())
    }

    #[instrument(skip(self), fields(session_id = %id))]
    fn load(&self, id: &SessionId) -> Result<Option<serde_json::Value>, StoreError> {
        let key = storage_key(id)?;
        let raw: Option<String> = self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT snapshot FROM session_snapshots WHERE id = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()
            .map_err(StoreError::from)
        })?;
        raw.map(|r| serde_json::from_str(&r).map_err(StoreError::from))
            .transpose()
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }
}
