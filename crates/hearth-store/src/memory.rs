use std::collections::HashMap;

use hearth_core::ids::SessionId;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::StoreError;
use crate::snapshot::{storage_key, SnapshotStore};

/// Process-local store. Contents are lost on restart.
#[derive(Default)]
pub struct MemorySnapshotStore {
    snapshots: Mutex<HashMap<String, String>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.snapshots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.lock().is_empty()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn save(&self, id: &SessionId, snapshot: &serde_json::Value) -> Result<(), StoreError> {
        let key = storage_key(id)?;
        // Stored serialized so callers never share a mutable value with the store.
        let raw = serde_json::to_string(snapshot)?;
        self.snapshots.lock().insert(key.to_string(), raw);
        debug!(session_id = %id, "snapshot saved (memory)");
        Ok(())
    }

    fn load(&self, id: &SessionId) -> Result<Option<serde_json::Value>, StoreError> {
        let key = storage_key(id)?;
        let raw = self.snapshots.lock().get(key).cloned();
        raw.map(|r| serde_json::from_str(&r).map_err(StoreError::from))
            .transpose()
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_absent_is_none() {
        let store = MemorySnapshotStore::new();
        assert!(store.load(&SessionId::new()).unwrap().is_none());
    }

    #[test]
    fn save_overwrites() {
        let store = MemorySnapshotStore::new();
        let id = SessionId::new();
        store.save(&id, &serde_json::json!({"messages": [1]})).unwrap();
        store.save(&id, &serde_json::json!({"messages": []})).unwrap();
        assert_eq!(
            store.load(&id).unwrap(),
            Some(serde_json::json!({"messages": []}))
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn sessions_are_isolated() {
        let store = MemorySnapshotStore::new();
        let a = SessionId::new();
        let b = SessionId::new();
        store.save(&a, &serde_json::json!({"who": "a"})).unwrap();
        assert!(store.load(&b).unwrap().is_none());
    }
}
