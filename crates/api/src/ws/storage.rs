use axum::extract::ws::{Message, WebSocket};
use bson::oid::ObjectId;
use dashmap::DashMap;
use futures::stream::SplitSink;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

pub type WsSender = Arc<Mutex<SplitSink<WebSocket, Message>>>;

/// Tracks all active WebSocket connections by user ID, plus which
/// connections are watching which room.
/// Each user can have multiple connections (multiple tabs/devices).
pub struct WsStorage {
    connections: DashMap<ObjectId, Vec<(String, WsSender)>>,
    rooms: DashMap<ObjectId, HashMap<String, WsSender>>,
}

impl WsStorage {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            rooms: DashMap::new(),
        }
    }

    pub fn add(&self, user_id: ObjectId, connection_id: String, sender: WsSender) {
        self.connections
            .entry(user_id)
            .or_default()
            .push((connection_id, sender));
    }

    /// Drops the connection and every room subscription it held.
    pub fn remove(&self, user_id: &ObjectId, connection_id: &str) {
        if let Some(mut senders) = self.connections.get_mut(user_id) {
            senders.retain(|(id, _)| id != connection_id);
            if senders.is_empty() {
                drop(senders);
                self.connections.remove(user_id);
            }
        }
        self.rooms.retain(|_, subscribers| {
            subscribers.remove(connection_id);
            !subscribers.is_empty()
        });
    }

    pub fn subscribe(&self, room_id: ObjectId, connection_id: String, sender: WsSender) {
        self.rooms
            .entry(room_id)
            .or_default()
            .insert(connection_id, sender);
    }

    pub fn unsubscribe(&self, room_id: &ObjectId, connection_id: &str) {
        if let Some(mut subscribers) = self.rooms.get_mut(room_id) {
            subscribers.remove(connection_id);
            if subscribers.is_empty() {
                drop(subscribers);
                self.rooms.remove(room_id);
            }
        }
    }

    pub fn get_senders(&self, user_id: &ObjectId) -> Vec<WsSender> {
        self.connections
            .get(user_id)
            .map(|s| s.iter().map(|(_, sender)| sender.clone()).collect())
            .unwrap_or_default()
    }

    pub fn room_senders(&self, room_id: &ObjectId) -> Vec<WsSender> {
        self.rooms
            .get(room_id)
            .map(|s| s.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn all_senders(&self) -> Vec<WsSender> {
        self.connections
            .iter()
            .flat_map(|r| {
                r.value()
                    .iter()
                    .map(|(_, sender)| sender.clone())
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.iter().map(|r| r.value().len()).sum()
    }
}

impl Default for WsStorage {
    fn default() -> Self {
        Self::new()
    }
}
