//! WebSocket change stream for rendering clients.
use crate::state::{AppState, StreamMessage};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use sager_core::StreamEvent;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

/// Handler for WebSocket connections.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(params): Query<WsQuery>,
) -> axum::response::Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, params))
        .into_response()
}

#[derive(Debug, Deserialize, Default)]
pub struct WsQuery {
    drone_id: Option<String>,
    authorized: Option<bool>,
}

impl WsQuery {
    /// Filter for drones in the connect-time snapshot.
    fn wants_drone(&self, drone_id: &str, authorized: bool) -> bool {
        self.drone_id.as_deref().map_or(true, |wanted| wanted == drone_id)
            && self.authorized.map_or(true, |wanted| wanted == authorized)
    }

    /// Filter for live frames. Fleet-wide frames (changes, session) carry no
    /// drone and always pass.
    fn wants(&self, msg: &StreamMessage) -> bool {
        if let (Some(wanted), Some(id)) = (self.drone_id.as_deref(), msg.drone_id.as_deref()) {
            if wanted != id {
                return false;
            }
        }
        self.authorized.map_or(true, |class| msg.touches_class(class))
    }
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>, params: WsQuery) {
    // Subscribe before taking the snapshot so no update falls in between.
    let mut rx = state.tx.subscribe();

    let snapshot = state.snapshot();
    let drones = snapshot
        .drones
        .iter()
        .filter(|d| params.wants_drone(&d.id, d.authorized))
        .cloned()
        .collect();
    let hello = StreamEvent::Snapshot {
        drones,
        stats: snapshot.stats_report(),
    };
    match serde_json::to_string(&hello) {
        Ok(text) => {
            if socket.send(Message::Text(text)).await.is_err() {
                return;
            }
        }
        Err(e) => {
            tracing::error!("Failed to encode stream snapshot: {}", e);
            return;
        }
    }

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Ping(payload))) => {
                        if socket.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) | None => break,
                }
            }
            event = rx.recv() => {
                match event {
                    Ok(msg) => {
                        if !params.wants(&msg) {
                            continue;
                        }
                        if socket.send(Message::Text(msg.payload.as_ref().to_owned())).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(missed)) => {
                        // Drop missed updates; the next batch carries fresh state.
                        tracing::debug!(missed, "Stream client lagging");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }
}
