use axum::extract::ws::Message;
use bson::oid::ObjectId;
use futures::SinkExt;
use tracing::{debug, warn};

use super::storage::{WsSender, WsStorage};

async fn deliver(senders: Vec<WsSender>, message: &serde_json::Value) {
    let text = serde_json::to_string(message).unwrap_or_default();

    for sender in senders {
        let mut guard = sender.lock().await;
        if let Err(e) = guard.send(Message::text(text.clone())).await {
            warn!(%e, "Failed to send WS message");
        } else {
            debug!("WS message sent");
        }
    }
}

/// Broadcasts a JSON message to all connections of the specified users.
pub async fn broadcast(
    ws_storage: &WsStorage,
    user_ids: &[ObjectId],
    message: &serde_json::Value,
) {
    let senders = user_ids
        .iter()
        .flat_map(|user_id| ws_storage.get_senders(user_id))
        .collect();
    deliver(senders, message).await;
}

/// Sends a JSON message to every connection subscribed to the room.
pub async fn broadcast_room(
    ws_storage: &WsStorage,
    room_id: &ObjectId,
    message: &serde_json::Value,
) {
    deliver(ws_storage.room_senders(room_id), message).await;
}

/// Sends a JSON message to every live connection.
pub async fn broadcast_all(ws_storage: &WsStorage, message: &serde_json::Value) {
    deliver(ws_storage.all_senders(), message).await;
}
