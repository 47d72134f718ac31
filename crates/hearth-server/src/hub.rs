//! Per-session connection hubs.
//!
//! Every session with at least one attached websocket has a hub: the set of
//! attached clients plus a runner task that feeds inbound frames, in arrival
//! order, through the session manager and fans the resulting events out to
//! every client. The hub and its runner go away with the last client.

use std::sync::Arc;

use dashmap::DashMap;
use hearth_core::ids::SessionId;
use hearth_core::messages::ChatMessage;
use hearth_session::{SessionError, SessionManager};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::{Client, ClientId};

const INBOUND_QUEUE: usize = 64;

/// Inbound websocket frame.
#[derive(Debug, Deserialize)]
pub struct InboundFrame {
    pub content: String,
}

pub fn error_frame(message: impl Into<String>) -> String {
    serde_json::json!({"type": "Error", "message": message.into()}).to_string()
}

pub fn message_frame(message: &ChatMessage) -> String {
    serde_json::to_string(message)
        .unwrap_or_else(|e| error_frame(format!("unserializable message: {e}")))
}

struct Inbound {
    client_id: ClientId,
    raw: String,
}

pub struct SessionHub {
    session_id: SessionId,
    clients: DashMap<ClientId, Client>,
    inbound_tx: mpsc::Sender<Inbound>,
    cancel: CancellationToken,
}

impl SessionHub {
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    pub fn client_alive(&self, id: &ClientId) -> bool {
        self.clients.get(id).is_some_and(|c| c.is_alive())
    }

    pub fn record_pong(&self, id: &ClientId) {
        if let Some(client) = self.clients.get(id) {
            client.record_pong();
        }
    }

    /// Queue a raw inbound frame for the runner.
    pub async fn submit(&self, client_id: &ClientId, raw: String) {
        let inbound = Inbound {
            client_id: client_id.clone(),
            raw,
        };
        if self.inbound_tx.send(inbound).await.is_err() {
            debug!(session_id = %self.session_id, "runner gone, inbound frame dropped");
        }
    }

    /// Best-effort, non-blocking fan-out. Closed clients are dropped.
    pub fn broadcast(&self, frame: &str) {
        let mut closed = Vec::new();
        for entry in self.clients.iter() {
            match entry.tx.try_send(frame.to_string()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!(client_id = %entry.id, "send queue full, dropping frame");
                }
                Err(TrySendError::Closed(_)) => closed.push(entry.id.clone()),
            }
        }
        for id in closed {
            self.clients.remove(&id);
            info!(session_id = %self.session_id, client_id = %id, "dropped closed client");
        }
    }

    pub fn send_to(&self, client_id: &ClientId, frame: String) -> bool {
        match self.clients.get(client_id) {
            Some(client) => client.tx.try_send(frame).is_ok(),
            None => false,
        }
    }
}

/// All live hubs, keyed by session.
pub struct HubRegistry {
    hubs: DashMap<SessionId, Arc<SessionHub>>,
    manager: Arc<SessionManager>,
    max_send_queue: usize,
}

impl HubRegistry {
    pub fn new(manager: Arc<SessionManager>, max_send_queue: usize) -> Self {
        Self {
            hubs: DashMap::new(),
            manager,
            max_send_queue,
        }
    }

    pub fn manager(&self) -> &Arc<SessionManager> {
        &self.manager
    }

    pub fn hub_count(&self) -> usize {
        self.hubs.len()
    }

    pub fn get(&self, id: &SessionId) -> Option<Arc<SessionHub>> {
        self.hubs.get(id).map(|h| Arc::clone(h.value()))
    }

    /// Attach a new client to the session's hub, creating the hub and its
    /// runner if needed. The stored transcript is queued to the new client
    /// before it sees any live frame.
    pub fn attach(
        &self,
        session_id: &SessionId,
    ) -> Result<(Arc<SessionHub>, ClientId, mpsc::Receiver<String>), SessionError> {
        let transcript = self.manager.transcript(session_id)?;

        let client_id = ClientId::new();
        let (tx, rx) = mpsc::channel(self.max_send_queue + transcript.len());
        for message in &transcript {
            let _ = tx.try_send(message_frame(message));
        }

        // Registering under the entry lock keeps `detach` from removing the
        // hub between lookup and registration.
        let entry = self
            .hubs
            .entry(session_id.clone())
            .or_insert_with(|| self.spawn_hub(session_id));
        let hub = Arc::clone(entry.value());
        hub.clients
            .insert(client_id.clone(), Client::new(client_id.clone(), tx));
        drop(entry);

        info!(
            session_id = %session_id,
            client_id = %client_id,
            replayed = transcript.len(),
            "client attached"
        );
        Ok((hub, client_id, rx))
    }

    /// Remove a client; the last one out stops the runner.
    pub fn detach(&self, hub: &Arc<SessionHub>, client_id: &ClientId) {
        hub.clients.remove(client_id);
        info!(session_id = %hub.session_id, client_id = %client_id, "client detached");

        let removed = self
            .hubs
            .remove_if(&hub.session_id, |_, h| Arc::ptr_eq(h, hub) && h.clients.is_empty());
        if removed.is_some() {
            hub.cancel.cancel();
            self.manager.release(&hub.session_id);
            info!(session_id = %hub.session_id, "last client left, hub closed");
        }
    }

    fn spawn_hub(&self, session_id: &SessionId) -> Arc<SessionHub> {
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_QUEUE);
        let hub = Arc::new(SessionHub {
            session_id: session_id.clone(),
            clients: DashMap::new(),
            inbound_tx,
            cancel: CancellationToken::new(),
        });
        tokio::spawn(run_session(
            Arc::clone(&hub),
            Arc::clone(&self.manager),
            inbound_rx,
        ));
        debug!(session_id = %session_id, "session runner started");
        hub
    }
}

/// Process inbound frames for one session, one exchange at a time.
async fn run_session(
    hub: Arc<SessionHub>,
    manager: Arc<SessionManager>,
    mut inbound_rx: mpsc::Receiver<Inbound>,
) {
    loop {
        let inbound = tokio::select! {
            _ = hub.cancel.cancelled() => break,
            msg = inbound_rx.recv() => match msg {
                Some(msg) => msg,
                None => break,
            },
        };

        let frame: InboundFrame = match serde_json::from_str(&inbound.raw) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(client_id = %inbound.client_id, error = %e, "malformed inbound frame");
                hub.send_to(
                    &inbound.client_id,
                    error_frame(format!("expected {{\"content\": string}}: {e}")),
                );
                continue;
            }
        };

        let fan_out = Arc::clone(&hub);
        let result = manager
            .run_exchange(
                &hub.session_id,
                &frame.content,
                hub.cancel.child_token(),
                move |event| fan_out.broadcast(&event.to_wire().to_string()),
            )
            .await;

        if let Err(e) = result {
            warn!(session_id = %hub.session_id, error = %e, "exchange failed");
            hub.broadcast(&error_frame(e.to_string()));
        }
    }
    debug!(session_id = %hub.session_id, "session runner stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_core::meals::DishCatalog;
    use hearth_engine::{create_default_registry, AgentRoster, CommandEngineFactory};
    use hearth_store::MemorySnapshotStore;

    fn registry() -> HubRegistry {
        let tools = Arc::new(create_default_registry(Arc::new(DishCatalog::builtin())));
        let manager = SessionManager::new(
            Arc::new(MemorySnapshotStore::new()),
            Arc::new(CommandEngineFactory::new(tools, AgentRoster::default())),
        );
        HubRegistry::new(Arc::new(manager), 32)
    }

    #[tokio::test]
    async fn attach_unknown_session_fails() {
        let hubs = registry();
        let err = hubs.attach(&SessionId::new()).err().unwrap();
        assert!(err.is_not_found());
        assert_eq!(hubs.hub_count(), 0);
    }

    #[tokio::test]
    async fn broadcast_reaches_every_client_and_drops_closed_ones() {
        let hubs = registry();
        let id = hubs.manager().create_session().await.unwrap();
        let (hub, _a, mut rx_a) = hubs.attach(&id).unwrap();
        let (_, _b, rx_b) = hubs.attach(&id).unwrap();
        assert_eq!(hub.client_count(), 2);

        drop(rx_b);
        hub.broadcast("frame");
        assert_eq!(rx_a.recv().await.unwrap(), "frame");
        assert_eq!(hub.client_count(), 1);
    }

    #[tokio::test]
    async fn exchange_frames_fan_out_and_replay() {
        let hubs = registry();
        let id = hubs.manager().create_session().await.unwrap();
        let (hub, client, mut rx) = hubs.attach(&id).unwrap();

        hub.submit(&client, r#"{"content": "get_state"}"#.into()).await;
        let mut frames = Vec::new();
        loop {
            let frame: serde_json::Value =
                serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
            let done = frame["type"] == "TaskResult";
            frames.push(frame);
            if done {
                break;
            }
        }
        assert_eq!(frames[0]["type"], "TextMessage");
        assert_eq!(frames[0]["source"], "user");
        assert_eq!(frames.len(), 7);

        let (_, _, mut late) = hubs.attach(&id).unwrap();
        let mut replayed = 0;
        while let Ok(frame) = late.try_recv() {
            assert_ne!(frame, r#"{"type":"TaskResult"}"#);
            replayed += 1;
        }
        assert_eq!(replayed, 6);
    }

    #[tokio::test]
    async fn malformed_frame_errors_only_the_sender() {
        let hubs = registry();
        let id = hubs.manager().create_session().await.unwrap();
        let (hub, a, mut rx_a) = hubs.attach(&id).unwrap();
        let (_, _b, mut rx_b) = hubs.attach(&id).unwrap();

        hub.submit(&a, "not json".into()).await;
        let frame: serde_json::Value = serde_json::from_str(&rx_a.recv().await.unwrap()).unwrap();
        assert_eq!(frame["type"], "Error");
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn last_detach_closes_hub() {
        let hubs = registry();
        let id = hubs.manager().create_session().await.unwrap();
        let (hub, a, _rx_a) = hubs.attach(&id).unwrap();
        let (_, b, _rx_b) = hubs.attach(&id).unwrap();

        hubs.detach(&hub, &a);
        assert_eq!(hubs.hub_count(), 1);
        hubs.detach(&hub, &b);
        assert_eq!(hubs.hub_count(), 0);
        assert!(hub.cancel.is_cancelled());
    }
}
