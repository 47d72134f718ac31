use hearth_core::ids::SessionId;

use crate::error::StoreError;

/// Persists one opaque JSON snapshot per session.
///
/// `save` fully overwrites whatever was stored before; concurrent saves for
/// the same id are last-write-wins. `load` of an unknown id is `Ok(None)`.
pub trait SnapshotStore: Send + Sync {
    fn save(&self, id: &SessionId, snapshot: &serde_json::Value) -> Result<(), StoreError>;

    fn load(&self, id: &SessionId) -> Result<Option<serde_json::Value>, StoreError>;

    /// Short backend name for logs.
    fn backend(&self) -> &'static str;
}

/// Rejects ids that cannot safely be used as file names or row keys.
pub(crate) fn storage_key(id: &SessionId) -> Result<&str, StoreError> {
    if id.is_key_safe() {
        Ok(id.as_str())
    } else {
        Err(StoreError::InvalidKey(id.as_str().to_string()))
    }
}
