use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::hub::{HubRegistry, SessionHub};

/// Clients that have not answered a ping for this long are dropped.
const CLIENT_TIMEOUT: Duration = Duration::from_secs(90);

/// Unique client identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ClientId(pub String);

impl Default for ClientId {
    fn default() -> Self {
        Self(format!("client_{}", Uuid::now_v7()))
    }
}

impl ClientId {
    pub fn new() -> Self {
        Self::default()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A websocket connection attached to a session hub.
pub struct Client {
    pub id: ClientId,
    pub tx: mpsc::Sender<String>,
    last_pong: AtomicU64,
}

impl Client {
    pub fn new(id: ClientId, tx: mpsc::Sender<String>) -> Self {
        Self {
            id,
            tx,
            last_pong: AtomicU64::new(now_secs()),
        }
    }

    pub fn record_pong(&self) {
        self.last_pong.store(now_secs(), Ordering::Relaxed);
    }

    pub fn is_alive(&self) -> bool {
        let last = self.last_pong.load(Ordering::Relaxed);
        now_secs().saturating_sub(last) < CLIENT_TIMEOUT.as_secs()
    }
}

fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Drive one websocket: a writer forwarding hub frames plus heartbeat pings,
/// and a reader submitting inbound text to the session runner.
pub async fn handle_ws_connection(
    socket: WebSocket,
    client_id: ClientId,
    mut rx: mpsc::Receiver<String>,
    hub: Arc<SessionHub>,
    hubs: Arc<HubRegistry>,
    heartbeat: Duration,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let writer_cid = client_id.clone();
    let writer_hub = Arc::clone(&hub);
    let writer = tokio::spawn(async move {
        let mut ping_interval = tokio::time::interval(heartbeat);
        ping_interval.tick().await; // consume first immediate tick

        loop {
            tokio::select! {
                msg = rx.recv() => {
                    match msg {
                        Some(text) => {
                            if ws_tx.send(WsMessage::Text(text.into())).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                _ = ping_interval.tick() => {
                    if !writer_hub.client_alive(&writer_cid) {
                        tracing::info!(client_id = %writer_cid, "client missed heartbeat");
                        break;
                    }
                    if ws_tx.send(WsMessage::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                    tracing::trace!(client_id = %writer_cid, "sent ping");
                }
            }
        }
        let _ = ws_tx.close().await;
    });

    let reader_cid = client_id.clone();
    let reader_hub = Arc::clone(&hub);
    let reader = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_rx.next().await {
            match msg {
                WsMessage::Text(text) => {
                    reader_hub.submit(&reader_cid, text.to_string()).await;
                }
                WsMessage::Pong(_) => reader_hub.record_pong(&reader_cid),
                WsMessage::Close(_) => break,
                _ => {}
            }
        }
    });

    first_to_finish(writer, reader).await;

    hubs.detach(&hub, &client_id);
}

/// Wait for either task and abort the one still running, so a detached
/// client can no longer submit frames.
async fn first_to_finish(mut a: JoinHandle<()>, mut b: JoinHandle<()>) {
    tokio::select! {
        _ = &mut a => b.abort(),
        _ = &mut b => a.abort(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn finished_task_aborts_the_other() {
        let (alive_tx, alive_rx) = oneshot::channel::<()>();
        let done = tokio::spawn(async {});
        let stuck = tokio::spawn(async move {
            let _alive = alive_tx;
            std::future::pending::<()>().await
        });

        first_to_finish(done, stuck).await;
        // The sender is dropped only when the stuck task is torn down.
        assert!(alive_rx.await.is_err());
    }

    #[test]
    fn client_id_unique() {
        let a = ClientId::new();
        let b = ClientId::new();
        assert_ne!(a, b);
        assert!(a.0.starts_with("client_"));
    }

    #[test]
    fn client_pong_tracking() {
        let (tx, _rx) = mpsc::channel(1);
        let client = Client::new(ClientId::new(), tx);
        assert!(client.is_alive());

        client.last_pong.store(0, Ordering::Relaxed);
        assert!(!client.is_alive());

        client.record_pong();
        assert!(client.is_alive());
    }
}
