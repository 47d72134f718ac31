//! HTTP handlers for the session surface.

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use hearth_core::ids::SessionId;
use tracing::{error, info};

use crate::client;
use crate::server::AppState;

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({"error": message.into()}))).into_response()
}

/// `POST /api/sessions`
pub async fn create_session(State(state): State<AppState>) -> Response {
    match state.hubs.manager().create_session().await {
        Ok(id) => Json(serde_json::json!({"id": id})).into_response(),
        Err(e) => {
            error!(error = %e, "failed to create session");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// `GET /api/sessions/{id}`: websocket attach. Unknown sessions get a 404
/// before any upgrade happens.
pub async fn session_socket(
    Path(id): Path<String>,
    State(state): State<AppState>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let session_id = SessionId::from_raw(id);
    match state.hubs.manager().exists(&session_id) {
        Ok(true) => {}
        Ok(false) => {
            return error_response(StatusCode::NOT_FOUND, format!("session {session_id} not found"))
        }
        Err(e) if e.is_not_found() => {
            return error_response(StatusCode::NOT_FOUND, format!("session {session_id} not found"))
        }
        Err(e) => {
            error!(session_id = %session_id, error = %e, "session lookup failed");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
        }
    }

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return rejection.into_response(),
    };
    ws.on_upgrade(move |socket| handle_socket(socket, session_id, state))
}

async fn handle_socket(socket: WebSocket, session_id: SessionId, state: AppState) {
    let (hub, client_id, rx) = match state.hubs.attach(&session_id) {
        Ok(attached) => attached,
        Err(e) => {
            error!(session_id = %session_id, error = %e, "attach failed");
            return;
        }
    };
    info!(session_id = %session_id, client_id = %client_id, "websocket connected");

    client::handle_ws_connection(
        socket,
        client_id,
        rx,
        hub,
        state.hubs,
        state.heartbeat,
    )
    .await;
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "store": state.hubs.manager().store().backend(),
        "live_sessions": state.hubs.hub_count(),
    }))
}
