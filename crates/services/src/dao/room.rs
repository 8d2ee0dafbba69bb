use bson::{doc, oid::ObjectId, DateTime};
use mongodb::Database;
use tracing::{debug, info, warn};
use voxroom_db::models::{BanOutcome, ChatMessage, Room, RoomRuleError, UserProfile};

use super::base::{BaseDao, DaoError, DaoResult};
use crate::hydrate::{Hydrator, UserCard};

const FALLBACK_NAME: &str = "A user";

/// A committed room write together with the system messages it produced.
#[derive(Debug, Clone)]
pub struct RoomChange<T> {
    pub room: Room,
    pub outcome: T,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone)]
pub struct RoomSummary {
    pub room: Room,
    pub owner_name: String,
}

#[derive(Debug, Clone)]
pub struct RoomDetail {
    pub room: Room,
    pub seats: Vec<Option<UserCard>>,
}

pub struct RoomDao {
    pub base: BaseDao<Room>,
    profiles: BaseDao<UserProfile>,
    messages: BaseDao<ChatMessage>,
    hydrator: Hydrator,
    max_cas_retries: u32,
}

impl RoomDao {
    pub fn new(db: &Database, max_cas_retries: u32, public_base_url: &str) -> Self {
        Self {
            base: BaseDao::new(db, Room::COLLECTION),
            profiles: BaseDao::new(db, UserProfile::COLLECTION),
            messages: BaseDao::new(db, ChatMessage::COLLECTION),
            hydrator: Hydrator::new(db, public_base_url),
            max_cas_retries,
        }
    }

    pub async fn create(&self, owner_id: ObjectId, name: String, image: String) -> DaoResult<Room> {
        let profile = self
            .profiles
            .find_one(doc! { "user_id": owner_id })
            .await?
            .ok_or(DaoError::Missing("User profile"))?;

        let mut room = Room::new(name, image, profile.display_id, owner_id);
        let id = self.base.insert_one(&room).await?;
        room.id = Some(id);
        info!(room_id = %id, %owner_id, "Room created");
        Ok(room)
    }

    /// Every room, newest first, with the owner's name.
    pub async fn list(&self) -> DaoResult<Vec<RoomSummary>> {
        let rooms = self
            .base
            .find_many(doc! {}, Some(doc! { "created_at": -1, "_id": -1 }))
            .await?;
        let owner_ids: Vec<ObjectId> = rooms.iter().map(|r| r.owner_id).collect();
        let cards = self.hydrator.cards(&owner_ids).await?;

        Ok(rooms
            .into_iter()
            .map(|room| {
                let owner_name = cards
                    .get(&room.owner_id)
                    .map(|c| c.name.clone())
                    .unwrap_or_else(|| "Unknown".to_string());
                RoomSummary { room, owner_name }
            })
            .collect())
    }

    pub async fn get(&self, room_id: ObjectId) -> DaoResult<RoomDetail> {
        let room = self.find(room_id).await?;
        let occupants: Vec<ObjectId> = room.seats.iter().flatten().copied().collect();
        let cards = self.hydrator.cards(&occupants).await?;
        let seats = room
            .seats
            .iter()
            .map(|seat| seat.and_then(|id| cards.get(&id).cloned()))
            .collect();
        Ok(RoomDetail { room, seats })
    }

    pub async fn find(&self, room_id: ObjectId) -> DaoResult<Room> {
        self.base
            .get(room_id)
            .await?
            .ok_or(DaoError::Missing("Room"))
    }

    pub async fn take_seat(
        &self,
        room_id: ObjectId,
        user_id: ObjectId,
        seat_index: i64,
    ) -> DaoResult<RoomChange<Option<usize>>> {
        let (room, previous) = self
            .mutate(room_id, |room, now| room.take_seat(user_id, seat_index, now))
            .await?;

        let name = self
            .profiles
            .find_one(doc! { "user_id": user_id })
            .await?
            .map(|p| p.announced_name())
            .unwrap_or_else(|| FALLBACK_NAME.to_string());
        let message = self
            .announce(room_id, format!("{name} has taken a seat."))
            .await?;

        Ok(RoomChange {
            room,
            outcome: previous,
            messages: vec![message],
        })
    }

    /// Best effort: a missing room or an unseated caller is not an error.
    pub async fn leave_seat(
        &self,
        room_id: ObjectId,
        user_id: ObjectId,
    ) -> DaoResult<Option<RoomChange<usize>>> {
        let result = self
            .mutate(room_id, |room, _| Ok(room.leave_seat(user_id)))
            .await;
        match result {
            Ok((room, Some(seat))) => Ok(Some(RoomChange {
                room,
                outcome: seat,
                messages: Vec::new(),
            })),
            Ok((_, None)) | Err(DaoError::Missing(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Best effort, like [`Self::leave_seat`]. Returns the room only when the
    /// indicator actually changed.
    pub async fn set_speaking(
        &self,
        room_id: ObjectId,
        user_id: ObjectId,
        is_speaking: bool,
    ) -> DaoResult<Option<Room>> {
        let result = self
            .mutate(room_id, |room, _| Ok(room.set_speaking(user_id, is_speaking)))
            .await;
        match result {
            Ok((room, true)) => Ok(Some(room)),
            Ok((_, false)) | Err(DaoError::Missing(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn appoint_admin(
        &self,
        room_id: ObjectId,
        actor: ObjectId,
        target: ObjectId,
    ) -> DaoResult<RoomChange<bool>> {
        let (room, changed) = self
            .mutate(room_id, |room, _| room.appoint_admin(actor, target))
            .await?;
        if changed {
            info!(%room_id, %target, "Admin appointed");
        }
        Ok(RoomChange {
            room,
            outcome: changed,
            messages: Vec::new(),
        })
    }

    pub async fn remove_admin(
        &self,
        room_id: ObjectId,
        actor: ObjectId,
        target: ObjectId,
    ) -> DaoResult<RoomChange<bool>> {
        let (room, changed) = self
            .mutate(room_id, |room, _| room.remove_admin(actor, target))
            .await?;
        if changed {
            info!(%room_id, %target, "Admin removed");
        }
        Ok(RoomChange {
            room,
            outcome: changed,
            messages: Vec::new(),
        })
    }

    pub async fn kick(
        &self,
        room_id: ObjectId,
        actor: ObjectId,
        target: ObjectId,
    ) -> DaoResult<RoomChange<Option<usize>>> {
        let (room, freed) = self
            .mutate(room_id, |room, _| room.kick(actor, target))
            .await?;

        let mut messages = Vec::new();
        if freed.is_some() {
            info!(%room_id, %actor, %target, "User kicked");
            let name = self.plain_name(target).await?;
            messages.push(self.announce(room_id, format!("{name} has been kicked.")).await?);
        }
        Ok(RoomChange {
            room,
            outcome: freed,
            messages,
        })
    }

    pub async fn ban(
        &self,
        room_id: ObjectId,
        actor: ObjectId,
        target: ObjectId,
        duration_minutes: u32,
    ) -> DaoResult<RoomChange<BanOutcome>> {
        let (room, outcome) = self
            .mutate(room_id, |room, now| {
                room.ban(actor, target, duration_minutes, now)
            })
            .await?;
        info!(%room_id, %actor, %target, duration_minutes, "User banned");

        let name = self.plain_name(target).await?;
        let message = self
            .announce(
                room_id,
                format!("{name} has been banned for {duration_minutes} minutes."),
            )
            .await?;
        Ok(RoomChange {
            room,
            outcome,
            messages: vec![message],
        })
    }

    pub async fn unban(
        &self,
        room_id: ObjectId,
        actor: ObjectId,
        target: ObjectId,
    ) -> DaoResult<RoomChange<bool>> {
        let (room, removed) = self
            .mutate(room_id, |room, _| room.unban(actor, target))
            .await?;
        if removed {
            info!(%room_id, %actor, %target, "User unbanned");
        }
        Ok(RoomChange {
            room,
            outcome: removed,
            messages: Vec::new(),
        })
    }

    /// Loads the room, applies `apply` in memory and writes it back only if
    /// the stored version is still the one that was read. A lost race reloads
    /// and re-applies. Unchanged rooms are not written.
    async fn mutate<T, F>(&self, room_id: ObjectId, mut apply: F) -> DaoResult<(Room, T)>
    where
        F: FnMut(&mut Room, DateTime) -> Result<T, RoomRuleError>,
    {
        for attempt in 0..=self.max_cas_retries {
            let original = self.find(room_id).await?;
            let mut room = original.clone();
            let outcome = apply(&mut room, DateTime::now())?;
            if room == original {
                return Ok((room, outcome));
            }

            let version = original.version;
            room.version = version + 1;
            room.updated_at = DateTime::now();
            let result = self
                .base
                .collection()
                .replace_one(doc! { "_id": room_id, "version": version }, &room)
                .await?;
            if result.matched_count > 0 {
                return Ok((room, outcome));
            }
            debug!(%room_id, attempt, "Room version moved, retrying");
        }

        warn!(%room_id, retries = self.max_cas_retries, "Room update kept conflicting");
        Err(DaoError::Conflict(
            "The room changed while updating, please try again".to_string(),
        ))
    }

    async fn plain_name(&self, user_id: ObjectId) -> DaoResult<String> {
        Ok(self
            .profiles
            .find_one(doc! { "user_id": user_id })
            .await?
            .map(|p| p.name)
            .unwrap_or_else(|| FALLBACK_NAME.to_string()))
    }

    async fn announce(&self, room_id: ObjectId, text: String) -> DaoResult<ChatMessage> {
        let mut message = ChatMessage::system(room_id, text);
        message.id = Some(self.messages.insert_one(&message).await?);
        Ok(message)
    }
}
