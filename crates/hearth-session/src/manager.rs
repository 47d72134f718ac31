use std::sync::Arc;

use dashmap::DashMap;
use hearth_core::engine::EngineFactory;
use hearth_core::events::{ExchangeEvent, TaskResult};
use hearth_core::ids::SessionId;
use hearth_core::messages::ChatMessage;
use hearth_store::SnapshotStore;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::error::SessionError;
use crate::session::AgentSession;
use crate::snapshot::SessionSnapshot;

/// Owns the load → run → save cycle for every session.
///
/// Exchanges for the same session are serialized by a per-session lock.
/// The snapshot is written only after the exchange completes, so a failed
/// exchange leaves the stored state as it was.
pub struct SessionManager {
    store: Arc<dyn SnapshotStore>,
    engines: Arc<dyn EngineFactory>,
    locks: DashMap<SessionId, Arc<Mutex<()>>>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SnapshotStore>, engines: Arc<dyn EngineFactory>) -> Self {
        Self {
            store,
            engines,
            locks: DashMap::new(),
        }
    }

    pub fn store(&self) -> &Arc<dyn SnapshotStore> {
        &self.store
    }

    fn lock_for(&self, id: &SessionId) -> Arc<Mutex<()>> {
        self.locks
            .entry(id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Start a new conversation and persist its empty snapshot.
    #[instrument(skip(self))]
    pub async fn create_session(&self) -> Result<SessionId, SessionError> {
        let id = SessionId::new();
        let session = AgentSession::new(id.clone(), self.engines.create(&id));
        let snapshot = session.snapshot().await?;
        self.store.save(&id, &snapshot.to_json()?)?;
        info!(session_id = %id, backend = self.store.backend(), "session created");
        Ok(id)
    }

    pub fn load_snapshot(&self, id: &SessionId) -> Result<Option<SessionSnapshot>, SessionError> {
        match self.store.load(id)? {
            Some(raw) => Ok(Some(SessionSnapshot::from_json(raw)?)),
            None => Ok(None),
        }
    }

    pub fn exists(&self, id: &SessionId) -> Result<bool, SessionError> {
        Ok(self.store.load(id)?.is_some())
    }

    /// Stored transcript, for replay to newly attached clients.
    pub fn transcript(&self, id: &SessionId) -> Result<Vec<ChatMessage>, SessionError> {
        self.load_snapshot(id)?
            .map(|s| s.messages)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    async fn open(&self, id: &SessionId) -> Result<AgentSession, SessionError> {
        let engine = self.engines.create(id);
        match self.load_snapshot(id)? {
            Some(snapshot) => AgentSession::restore(id.clone(), engine, snapshot).await,
            None => Err(SessionError::NotFound(id.to_string())),
        }
    }

    /// Run one exchange against the stored session and persist the result.
    pub async fn run_exchange<F>(
        &self,
        id: &SessionId,
        content: &str,
        cancel: CancellationToken,
        on_event: F,
    ) -> Result<TaskResult, SessionError>
    where
        F: FnMut(&ExchangeEvent),
    {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        let mut session = self.open(id).await?;
        let result = match session.run(content, cancel, on_event).await {
            Ok(result) => result,
            Err(e) => {
                warn!(session_id = %id, error = %e, "exchange failed, snapshot not saved");
                return Err(e);
            }
        };

        let snapshot = session.snapshot().await?;
        self.store.save(id, &snapshot.to_json()?)?;
        debug!(session_id = %id, "snapshot saved after exchange");
        Ok(result)
    }

    /// Drop the per-session lock once nobody is using the session.
    pub fn release(&self, id: &SessionId) {
        self.locks
            .remove_if(id, |_, lock| Arc::strong_count(lock) == 1);
    }
}
