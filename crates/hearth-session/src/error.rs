use hearth_core::errors::EngineError;
use hearth_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("invalid snapshot: {0}")]
    Snapshot(String),

    #[error("session not found: {0}")]
    NotFound(String),

    /// The engine's stream ended without a completion marker.
    #[error("exchange ended without completing")]
    IncompleteExchange,

    #[error("exchange cancelled")]
    Cancelled,
}

impl From<serde_json::Error> for SessionError {
    fn from(e: serde_json::Error) -> Self {
        SessionError::Snapshot(e.to_string())
    }
}

impl SessionError {
    /// Whether the failure is the caller's fault and should be reported as such.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::Store(StoreError::InvalidKey(_))
        )
    }
}
