use bson::{doc, oid::ObjectId, DateTime};
use mongodb::{options::ReturnDocument, Database};
use std::collections::HashMap;
use tracing::{info, warn};
use voxroom_db::models::{ChatMessage, Gift, GlobalAnnouncement, Room, UserProfile};

use super::base::{BaseDao, DaoError, DaoResult};
use crate::hydrate::{Hydrator, UserCard};

pub const CHAT_WINDOW: i64 = 100;

#[derive(Debug, Clone)]
pub struct ChatEntry {
    pub message: ChatMessage,
    pub author: Option<UserCard>,
    pub gift: Option<Gift>,
}

/// Everything a successful gift send wrote.
#[derive(Debug, Clone)]
pub struct GiftSend {
    pub message: ChatMessage,
    pub gift: Gift,
    pub announcement: GlobalAnnouncement,
    pub balance: i64,
}

pub struct ChatDao {
    pub base: BaseDao<ChatMessage>,
    rooms: BaseDao<Room>,
    gifts: BaseDao<Gift>,
    profiles: BaseDao<UserProfile>,
    announcements: BaseDao<GlobalAnnouncement>,
    hydrator: Hydrator,
}

impl ChatDao {
    pub fn new(db: &Database, public_base_url: &str) -> Self {
        Self {
            base: BaseDao::new(db, ChatMessage::COLLECTION),
            rooms: BaseDao::new(db, Room::COLLECTION),
            gifts: BaseDao::new(db, Gift::COLLECTION),
            profiles: BaseDao::new(db, UserProfile::COLLECTION),
            announcements: BaseDao::new(db, GlobalAnnouncement::COLLECTION),
            hydrator: Hydrator::new(db, public_base_url),
        }
    }

    /// The newest [`CHAT_WINDOW`] messages of a room in chronological order.
    pub async fn list(&self, room_id: ObjectId) -> DaoResult<Vec<ChatEntry>> {
        let mut messages = self
            .base
            .find_limited(
                doc! { "room_id": room_id },
                doc! { "created_at": -1, "_id": -1 },
                CHAT_WINDOW,
            )
            .await?;
        messages.reverse();
        self.hydrate(messages).await
    }

    pub async fn hydrate(&self, messages: Vec<ChatMessage>) -> DaoResult<Vec<ChatEntry>> {
        let author_ids: Vec<ObjectId> = messages.iter().filter_map(|m| m.author_id).collect();
        let authors = self.hydrator.cards(&author_ids).await?;

        let mut gift_ids: Vec<ObjectId> = messages.iter().filter_map(|m| m.gift_id).collect();
        gift_ids.sort();
        gift_ids.dedup();
        let gifts: HashMap<ObjectId, Gift> = if gift_ids.is_empty() {
            HashMap::new()
        } else {
            self.gifts
                .find_many(doc! { "_id": { "$in": gift_ids } }, None)
                .await?
                .into_iter()
                .filter_map(|g| g.id.map(|id| (id, g)))
                .collect()
        };

        Ok(messages
            .into_iter()
            .map(|message| ChatEntry {
                author: message.author_id.and_then(|id| authors.get(&id).cloned()),
                gift: message.gift_id.and_then(|id| gifts.get(&id).cloned()),
                message,
            })
            .collect())
    }

    pub async fn send(
        &self,
        room_id: ObjectId,
        author_id: ObjectId,
        text: String,
    ) -> DaoResult<ChatMessage> {
        if self.rooms.count(doc! { "_id": room_id }).await? == 0 {
            return Err(DaoError::Missing("Room"));
        }
        let mut message = ChatMessage::text(room_id, author_id, text);
        message.id = Some(self.base.insert_one(&message).await?);
        Ok(message)
    }

    /// Debits the gift price and records the send. The debit only applies
    /// while the balance covers the price, so concurrent sends cannot
    /// overdraw. If the message cannot be written the debit is refunded.
    pub async fn send_gift(
        &self,
        room_id: ObjectId,
        sender_id: ObjectId,
        gift_id: ObjectId,
        recipient_id: Option<ObjectId>,
    ) -> DaoResult<GiftSend> {
        let gift = self.gifts.get(gift_id).await?.ok_or(DaoError::Missing("Gift"))?;
        let room = self.rooms.get(room_id).await?.ok_or(DaoError::Missing("Room"))?;

        let debited = self
            .profiles
            .collection()
            .find_one_and_update(
                doc! { "user_id": sender_id, "coins": { "$gte": gift.price } },
                doc! {
                    "$inc": { "coins": -gift.price },
                    "$set": { "updated_at": DateTime::now() },
                },
            )
            .return_document(ReturnDocument::After)
            .await?;
        let Some(sender) = debited else {
            let balance = self
                .profiles
                .find_one(doc! { "user_id": sender_id })
                .await?
                .map(|p| p.coins)
                .unwrap_or(0);
            return Err(DaoError::InsufficientFunds {
                balance,
                price: gift.price,
            });
        };

        let mut message = ChatMessage::gift(room_id, sender_id, gift_id, recipient_id);
        match self.base.insert_one(&message).await {
            Ok(id) => message.id = Some(id),
            Err(e) => {
                warn!(%sender_id, %gift_id, error = %e, "Gift message insert failed, refunding");
                self.profiles
                    .update_one(
                        doc! { "user_id": sender_id },
                        doc! { "$inc": { "coins": gift.price } },
                    )
                    .await?;
                return Err(e);
            }
        }

        let recipient_name = match recipient_id {
            Some(id) => self
                .hydrator
                .card(id)
                .await?
                .map(|c| c.name)
                .unwrap_or_else(|| "A user".to_string()),
            None => "everyone".to_string(),
        };
        let mut announcement = GlobalAnnouncement {
            id: None,
            sender_name: sender.announced_name(),
            recipient_name,
            gift_name: gift.name.clone(),
            room_name: room.name,
            created_at: DateTime::now(),
        };
        announcement.id = Some(self.announcements.insert_one(&announcement).await?);
        info!(%room_id, %sender_id, gift = %gift.name, price = gift.price, "Gift sent");

        Ok(GiftSend {
            message,
            gift,
            announcement,
            balance: sender.coins,
        })
    }
}
