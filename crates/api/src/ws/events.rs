//! Live-update events pushed after mutations. Delivery is best effort: a
//! failed hydration or send is logged and never fails the request.

use bson::oid::ObjectId;
use serde_json::json;
use tracing::warn;
use voxroom_db::models::{ChatMessage, Conversation, GlobalAnnouncement, Room};
use voxroom_services::dao::chat::ChatEntry;

use super::dispatcher;
use crate::routes::{
    chat::ChatMessageResponse, conversation::PrivateMessageResponse,
    gift::AnnouncementResponse, room::RoomResponse,
};
use crate::state::AppState;

pub async fn room_updated(state: &AppState, room: &Room) {
    let Some(room_id) = room.id else {
        return;
    };
    let event = json!({
        "type": "room:update",
        "data": RoomResponse::from(room),
    });
    dispatcher::broadcast_room(&state.ws_storage, &room_id, &event).await;
}

/// Hydrates freshly written messages and pushes each to the room.
pub async fn chat_messages(state: &AppState, room_id: ObjectId, messages: Vec<ChatMessage>) {
    if messages.is_empty() {
        return;
    }
    match state.chat.hydrate(messages).await {
        Ok(entries) => chat_entries(state, room_id, &entries).await,
        Err(e) => warn!(%room_id, %e, "Failed to hydrate chat event"),
    }
}

pub async fn chat_entries(state: &AppState, room_id: ObjectId, entries: &[ChatEntry]) {
    for entry in entries {
        let event = json!({
            "type": "chat:message",
            "data": ChatMessageResponse::from(entry.clone()),
        });
        dispatcher::broadcast_room(&state.ws_storage, &room_id, &event).await;
    }
}

pub async fn private_message(
    state: &AppState,
    conversation: &Conversation,
    message: &PrivateMessageResponse,
) {
    let event = json!({
        "type": "message:create",
        "data": message,
    });
    dispatcher::broadcast(&state.ws_storage, &conversation.participants, &event).await;
}

pub async fn announcement(state: &AppState, announcement: &GlobalAnnouncement) {
    let event = json!({
        "type": "announcement:create",
        "data": AnnouncementResponse::from(announcement.clone()),
    });
    dispatcher::broadcast_all(&state.ws_storage, &event).await;
}
