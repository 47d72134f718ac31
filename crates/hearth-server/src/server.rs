use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use hearth_session::SessionManager;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::hub::HubRegistry;

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    pub max_send_queue: usize,
    pub heartbeat: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 3000,
            max_send_queue: 256,
            heartbeat: Duration::from_secs(30),
        }
    }
}

/// Shared application state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub hubs: Arc<HubRegistry>,
    pub heartbeat: Duration,
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/sessions", post(handlers::create_session))
        .route("/api/sessions/{id}", get(handlers::session_socket))
        .route("/health", get(handlers::health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind and start serving. Returns a handle that keeps the server alive.
pub async fn start(
    config: ServerConfig,
    manager: Arc<SessionManager>,
) -> Result<ServerHandle, std::io::Error> {
    let hubs = Arc::new(HubRegistry::new(manager, config.max_send_queue));
    let state = AppState {
        hubs,
        heartbeat: config.heartbeat,
    };

    let router = build_router(state);
    let addr = format!("{}:{}", config.bind, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!(addr = %local_addr, "hearth server started");

    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!(error = %e, "server stopped");
        }
    });

    Ok(ServerHandle {
        port: local_addr.port(),
        server,
    })
}

/// Handle returned by `start()`.
pub struct ServerHandle {
    pub port: u16,
    server: tokio::task::JoinHandle<()>,
}

impl ServerHandle {
    /// Wait until the server task ends.
    pub async fn wait(self) {
        let _ = self.server.await;
    }

    pub fn abort(&self) {
        self.server.abort();
    }
}
