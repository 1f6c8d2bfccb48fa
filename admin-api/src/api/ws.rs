//! WebSocket feed of mutation events
//!
//! Each connection registers a [`ChannelSubscriber`] with the hub and
//! receives every event envelope `{type, data, timestamp}` broadcast after
//! it connected. Client text frames are ignored unless
//! `server.echo_client_messages` is enabled, in which case the sender alone
//! gets `{type: "echo", message, timestamp}` back.

use admin_common::time;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::hub::{ChannelSubscriber, Subscriber};
use crate::AppState;

pub fn ws_routes() -> Router<AppState> {
    Router::new().route("/ws", get(ws_handler))
}

/// WebSocket upgrade handler
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (subscriber, mut outbound) = ChannelSubscriber::channel();
    let echo = state
        .config
        .server
        .echo_client_messages
        .then(|| subscriber.clone());
    let id = state.hub.subscribe(Arc::new(subscriber)).await;

    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Forward hub messages to the socket
    let send_id = id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(text) = outbound.recv().await {
            if ws_sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
        debug!(subscriber = %send_id, "Send task ended");
    });

    while let Some(frame) = ws_receiver.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                if let Some(echo) = &echo {
                    let reply = json!({
                        "type": "echo",
                        "message": text,
                        "timestamp": time::now_string(),
                    });
                    if echo.send(&reply.to_string()).is_err() {
                        break;
                    }
                } else {
                    debug!(subscriber = %id, "Ignoring client text frame");
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                warn!(subscriber = %id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    send_task.abort();
    state.hub.unsubscribe(&id).await;
    info!(subscriber = %id, "WebSocket closed");
}
