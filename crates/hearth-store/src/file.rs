use std::io::ErrorKind;
use std::path::PathBuf;

use hearth_core::ids::SessionId;
use tracing::{debug, instrument};

use crate::error::StoreError;
use crate::snapshot::{storage_key, SnapshotStore};

/// One `session_<id>.json` file per session under a state directory.
/// The directory is created on first save. Saves go through a sibling
/// `.tmp` file renamed over the target, so a reader sees either the old
/// snapshot or the new one.
pub struct FileSnapshotStore {
    dir: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, id: &SessionId) -> Result<PathBuf, StoreError> {
        let key = storage_key(id)?;
        Ok(self.dir.join(format!("session_{key}.json")))
    }
}

impl SnapshotStore for FileSnapshotStore {
    #[instrument(skip(self, snapshot), fields(session_id = %id))]
    fn save(&self, id: &SessionId, snapshot: &serde_json::Value) -> Result<(), StoreError> {
        let path = self.path_for(id)?;
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| StoreError::Io(format!("create dir {}: {e}", self.dir.display())))?;
        let raw = serde_json::to_vec_pretty(snapshot)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, raw)
            .map_err(|e| StoreError::Io(format!("write {}: {e}", tmp.display())))?;
        std::fs::rename(&tmp, &path)
            .map_err(|e| StoreError::Io(format!("rename {}: {e}", tmp.display())))?;
        debug!(path = %path.display(), "snapshot saved");
        Ok(())
    }

    #[instrument(skip(self), fields(session_id = %id))]
    fn load(&self, id: &SessionId) -> Result<Option<serde_json::Value>, StoreError> {
        let path = self.path_for(id)?;
        let raw = match std::fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Io(format!("read {}: {e}", path.display()))),
        };
        Ok(Some(serde_json::from_slice(&raw)?))
    }

    fn backend(&self) -> &'static str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("hearth-store-test-{}", uuid::Uuid::now_v7()))
    }

    #[test]
    fn round_trip_creates_directory() {
        let dir = temp_dir().join("nested");
        let store = FileSnapshotStore::new(&dir);
        let id = SessionId::new();
        let snapshot = serde_json::json!({
            "team": {},
            "messages": [{"type": "TextMessage", "source": "user", "content": "hi"}],
            "lights": [],
            "meals": [],
        });

        store.save(&id, &snapshot).unwrap();
        assert!(dir.join(format!("session_{}.json", id)).exists());
        assert_eq!(store.load(&id).unwrap(), Some(snapshot));

        let _ = std::fs::remove_dir_all(dir.parent().unwrap());
    }

    #[test]
    fn missing_file_is_none() {
        let dir = temp_dir();
        let store = FileSnapshotStore::new(&dir);
        assert!(store.load(&SessionId::new()).unwrap().is_none());
        assert!(!dir.exists());
    }

    #[test]
    fn save_fully_overwrites() {
        let dir = temp_dir();
        let store = FileSnapshotStore::new(&dir);
        let id = SessionId::new();
        store
            .save(&id, &serde_json::json!({"messages": ["a", "b", "c"], "extra": true}))
            .unwrap();
        store.save(&id, &serde_json::json!({"messages": []})).unwrap();
        assert_eq!(
            store.load(&id).unwrap(),
            Some(serde_json::json!({"messages": []}))
        );
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn interrupted_save_keeps_previous_snapshot() {
        let dir = temp_dir();
        let store = FileSnapshotStore::new(&dir);
        let id = SessionId::new();
        let before = serde_json::json!({"messages": ["a"]});
        store.save(&id, &before).unwrap();
        assert!(!dir.join(format!("session_{id}.json.tmp")).exists());

        // A crash mid-write leaves only a partial temp file behind.
        std::fs::write(dir.join(format!("session_{id}.json.tmp")), b"{\"messa").unwrap();
        assert_eq!(store.load(&id).unwrap(), Some(before));

        let after = serde_json::json!({"messages": ["a", "b"]});
        store.save(&id, &after).unwrap();
        assert_eq!(store.load(&id).unwrap(), Some(after));
        assert!(!dir.join(format!("session_{id}.json.tmp")).exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = temp_dir();
        let store = FileSnapshotStore::new(&dir);
        let id = SessionId::new();
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(format!("session_{id}.json")), b"{not json").unwrap();
        assert!(matches!(store.load(&id), Err(StoreError::Serialization(_))));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn unsafe_id_never_touches_disk() {
        let dir = temp_dir();
        let store = FileSnapshotStore::new(&dir);
        let id = SessionId::from_raw("../escape");
        assert!(matches!(
            store.save(&id, &serde_json::json!({})),
            Err(StoreError::InvalidKey(_))
        ));
        assert!(!dir.exists());
    }
}
