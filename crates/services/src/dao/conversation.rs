use bson::{doc, oid::ObjectId, DateTime};
use mongodb::Database;
use std::collections::HashMap;
use tracing::debug;
use voxroom_db::models::{
    conversation::participant_key, Conversation, PrivateMessage, User,
};

use super::base::{BaseDao, DaoError, DaoResult};
use crate::hydrate::{Hydrator, UserCard};

#[derive(Debug, Clone)]
pub struct ConversationSummary {
    pub conversation: Conversation,
    pub other: Option<UserCard>,
    pub last_message: Option<PrivateMessage>,
}

pub struct ConversationDao {
    pub base: BaseDao<Conversation>,
    messages: BaseDao<PrivateMessage>,
    users: BaseDao<User>,
    hydrator: Hydrator,
}

impl ConversationDao {
    pub fn new(db: &Database, public_base_url: &str) -> Self {
        Self {
            base: BaseDao::new(db, Conversation::COLLECTION),
            messages: BaseDao::new(db, PrivateMessage::COLLECTION),
            users: BaseDao::new(db, User::COLLECTION),
            hydrator: Hydrator::new(db, public_base_url),
        }
    }

    /// Returns the conversation for the unordered pair, creating it on first
    /// use. Argument order never matters.
    pub async fn get_or_create(
        &self,
        caller: ObjectId,
        participant: ObjectId,
    ) -> DaoResult<Conversation> {
        if caller == participant {
            return Err(DaoError::InvalidArgument(
                "You cannot start a conversation with yourself".to_string(),
            ));
        }
        if self.users.count(doc! { "_id": participant }).await? == 0 {
            return Err(DaoError::Missing("User"));
        }

        let key = participant_key(caller, participant);
        if let Some(existing) = self.base.find_one(doc! { "participant_key": &key }).await? {
            return Ok(existing);
        }

        let mut conversation = Conversation::between(caller, participant);
        match self.base.insert_one(&conversation).await {
            Ok(id) => {
                conversation.id = Some(id);
                debug!(conversation_id = %id, "Conversation created");
                Ok(conversation)
            }
            // Lost a race against the same pair
            Err(DaoError::DuplicateKey(_)) => self
                .base
                .find_one(doc! { "participant_key": &key })
                .await?
                .ok_or(DaoError::NotFound),
            Err(e) => Err(e),
        }
    }

    /// The caller's conversations, most recently active first.
    pub async fn list_for(&self, user_id: ObjectId) -> DaoResult<Vec<ConversationSummary>> {
        let mut conversations = self
            .base
            .find_many(doc! { "participants": user_id }, None)
            .await?;
        conversations.sort_by_key(|c| std::cmp::Reverse(c.last_message_at.unwrap_or(c.created_at)));

        let others: Vec<ObjectId> = conversations
            .iter()
            .filter_map(|c| c.other_participant(user_id))
            .collect();
        let cards = self.hydrator.cards(&others).await?;

        let mut summaries = Vec::with_capacity(conversations.len());
        let mut last_messages: HashMap<ObjectId, PrivateMessage> = HashMap::new();
        for conversation in &conversations {
            let Some(id) = conversation.id else { continue };
            if let Some(last) = self
                .messages
                .find_limited(
                    doc! { "conversation_id": id },
                    doc! { "created_at": -1, "_id": -1 },
                    1,
                )
                .await?
                .pop()
            {
                last_messages.insert(id, last);
            }
        }

        for conversation in conversations {
            let other = conversation
                .other_participant(user_id)
                .and_then(|id| cards.get(&id).cloned());
            let last_message = conversation.id.and_then(|id| last_messages.remove(&id));
            summaries.push(ConversationSummary {
                conversation,
                other,
                last_message,
            });
        }
        Ok(summaries)
    }

    /// Full history, oldest first. Only participants may read it.
    pub async fn messages(
        &self,
        conversation_id: ObjectId,
        caller: ObjectId,
    ) -> DaoResult<Vec<PrivateMessage>> {
        self.require_participant(conversation_id, caller).await?;
        self.messages
            .find_many(
                doc! { "conversation_id": conversation_id },
                Some(doc! { "created_at": 1, "_id": 1 }),
            )
            .await
    }

    /// Appends a message and returns it along with the conversation so the
    /// caller can notify both participants.
    pub async fn send(
        &self,
        conversation_id: ObjectId,
        author_id: ObjectId,
        text: String,
    ) -> DaoResult<(Conversation, PrivateMessage)> {
        let conversation = self.require_participant(conversation_id, author_id).await?;

        let mut message = PrivateMessage {
            id: None,
            conversation_id,
            author_id,
            text,
            created_at: DateTime::now(),
        };
        message.id = Some(self.messages.insert_one(&message).await?);
        self.base
            .collection()
            .update_one(
                doc! { "_id": conversation_id },
                doc! { "$set": { "last_message_at": message.created_at } },
            )
            .await?;
        Ok((conversation, message))
    }

    pub async fn hydrate_authors(
        &self,
        messages: &[PrivateMessage],
    ) -> DaoResult<HashMap<ObjectId, UserCard>> {
        let ids: Vec<ObjectId> = messages.iter().map(|m| m.author_id).collect();
        self.hydrator.cards(&ids).await
    }

    async fn require_participant(
        &self,
        conversation_id: ObjectId,
        user_id: ObjectId,
    ) -> DaoResult<Conversation> {
        let conversation = self
            .base
            .get(conversation_id)
            .await?
            .ok_or(DaoError::Missing("Conversation"))?;
        if !conversation.includes(user_id) {
            return Err(DaoError::Forbidden(
                "You are not part of this conversation".to_string(),
            ));
        }
        Ok(conversation)
    }
}
