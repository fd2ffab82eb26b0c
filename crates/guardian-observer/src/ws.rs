//! `WebSocket` handler for real-time telemetry streaming.
//!
//! Clients connect to `GET /ws` and receive one JSON-encoded
//! [`TelemetrySnapshot`](guardian_types::TelemetrySnapshot) per tick. Each
//! connection registers an observer with the [`BroadcastHub`] and forwards
//! the frames queued for it.
//!
//! Anything the client sends is drained and ignored.
//! A write that fails or exceeds the configured send timeout ends the
//! connection; the observer is unregistered on every exit path.
//!
//! [`BroadcastHub`]: guardian_core::hub::BroadcastHub

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use guardian_core::hub::{Frame, Observer};
use tokio::sync::mpsc;
use tracing::debug;

use crate::state::AppState;

/// Upgrade an HTTP request to a `WebSocket` connection and begin
/// streaming telemetry.
///
/// # Route
///
/// `GET /ws`
pub async fn ws_telemetry(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Register with the hub, pump frames until the client goes away, then
/// unregister.
async fn handle_ws(socket: WebSocket, state: Arc<AppState>) {
    let (observer, rx) = Observer::channel(state.settings.channel_capacity);
    let id = observer.id();
    state.hub.register(observer).await;
    debug!(observer = %id, "WebSocket client connected");

    pump(socket, rx, &state).await;

    state.hub.unregister(id).await;
    debug!(observer = %id, "WebSocket client disconnected");
}

/// Forward queued frames to the socket and drain inbound messages.
async fn pump(mut socket: WebSocket, mut rx: mpsc::Receiver<Frame>, state: &AppState) {
    let send_timeout = state.settings.send_timeout;

    loop {
        tokio::select! {
            frame = rx.recv() => {
                let Some(frame) = frame else {
                    debug!("Observer channel closed by hub");
                    return;
                };
                let msg = Message::Text(frame.to_string().into());
                match tokio::time::timeout(send_timeout, socket.send(msg)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        debug!("WebSocket send failed: {e}");
                        return;
                    }
                    Err(_) => {
                        debug!(timeout = ?send_timeout, "WebSocket send timed out");
                        return;
                    }
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => return,
                    Some(Err(e)) => {
                        debug!("WebSocket error: {e}");
                        return;
                    }
                    // Keep-alive traffic is ignored; the protocol layer
                    // answers pings on its own.
                    _ => {}
                }
            }
        }
    }
}
