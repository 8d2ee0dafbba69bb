use axum::{
    extract::{
        Query, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bson::oid::ObjectId;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::storage::WsSender;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ClientMessage {
    #[serde(rename = "ping")]
    Ping,
    #[serde(rename = "room:subscribe")]
    Subscribe { room_id: String },
    #[serde(rename = "room:unsubscribe")]
    Unsubscribe { room_id: String },
}

pub async fn ws_upgrade(
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
    ws: WebSocketUpgrade,
) -> Response {
    // Verify JWT before accepting the WebSocket
    let user_id = match state
        .auth
        .verify_access_token(&params.token)
        .and_then(|claims| claims.user_id())
    {
        Ok(id) => id,
        Err(_) => return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response(),
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state, user_id))
}

async fn handle_socket(socket: WebSocket, state: AppState, user_id: ObjectId) {
    let connection_id = Uuid::new_v4().to_string();

    let (sender, mut receiver) = socket.split();
    let sender: WsSender = Arc::new(Mutex::new(sender));

    state
        .ws_storage
        .add(user_id, connection_id.clone(), sender.clone());
    info!(
        ?user_id,
        %connection_id,
        connections = state.ws_storage.connection_count(),
        "WebSocket connected"
    );

    reply(
        &sender,
        serde_json::json!({
            "type": "connected",
            "user_id": user_id.to_hex(),
        }),
    )
    .await;

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                handle_client_message(&state, &user_id, &connection_id, &sender, &text).await;
            }
            Ok(Message::Ping(data)) => {
                let mut guard = sender.lock().await;
                let _ = guard.send(Message::Pong(data)).await;
            }
            Ok(Message::Close(_)) => break,
            Err(e) => {
                warn!(?user_id, %connection_id, %e, "WebSocket error");
                break;
            }
            _ => {}
        }
    }

    state.ws_storage.remove(&user_id, &connection_id);
    info!(?user_id, %connection_id, "WebSocket disconnected");
}

async fn handle_client_message(
    state: &AppState,
    user_id: &ObjectId,
    connection_id: &str,
    sender: &WsSender,
    text: &str,
) {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(_) => {
            debug!(?user_id, %connection_id, "Unknown WS message");
            return;
        }
    };

    match message {
        ClientMessage::Ping => {
            reply(sender, serde_json::json!({ "type": "pong" })).await;
        }
        ClientMessage::Subscribe { room_id } => {
            let Ok(rid) = ObjectId::parse_str(&room_id) else {
                reply(sender, ws_error("Invalid room_id")).await;
                return;
            };
            if let Err(e) = state.rooms.find(rid).await {
                reply(sender, ws_error(&e.to_string())).await;
                return;
            }
            state
                .ws_storage
                .subscribe(rid, connection_id.to_string(), sender.clone());
            debug!(?user_id, %connection_id, %room_id, "Subscribed to room");
            reply(
                sender,
                serde_json::json!({ "type": "room:subscribed", "room_id": room_id }),
            )
            .await;
        }
        ClientMessage::Unsubscribe { room_id } => {
            if let Ok(rid) = ObjectId::parse_str(&room_id) {
                state.ws_storage.unsubscribe(&rid, connection_id);
                debug!(?user_id, %connection_id, %room_id, "Unsubscribed from room");
            }
        }
    }
}

fn ws_error(message: &str) -> serde_json::Value {
    serde_json::json!({ "type": "error", "message": message })
}

async fn reply(sender: &WsSender, message: serde_json::Value) {
    let text = serde_json::to_string(&message).unwrap_or_default();
    let mut guard = sender.lock().await;
    if let Err(e) = guard.send(Message::text(text)).await {
        warn!(%e, "Failed to send WS reply");
    }
}
