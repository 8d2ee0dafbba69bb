use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const SEAT_COUNT: usize = 12;

const MILLIS_PER_MINUTE: i64 = 60_000;

/// A voice-chat room: twelve positional seats, an admin set and time-boxed
/// bans. All seat and moderation rules live on this type so they can be
/// applied to a freshly loaded document and written back in one step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Room {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub image: String,
    /// Copied from the owner's profile when the room is created.
    pub display_id: String,
    pub owner_id: ObjectId,
    #[serde(default)]
    pub seats: [Option<ObjectId>; SEAT_COUNT],
    #[serde(default)]
    pub admins: Vec<ObjectId>,
    #[serde(default)]
    pub banned_users: Vec<BanRecord>,
    pub speaking_seat_index: Option<usize>,
    #[serde(default)]
    pub locked_seats: [bool; SEAT_COUNT],
    #[serde(default)]
    pub version: i64,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BanRecord {
    pub user_id: ObjectId,
    pub banned_until: DateTime,
}

impl BanRecord {
    /// A ban blocks seating strictly before its expiry instant.
    pub fn is_active(&self, now: DateTime) -> bool {
        now < self.banned_until
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RoomRole {
    Member,
    Admin,
    Owner,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum RoomRuleError {
    #[error(
        "You are banned from this room until {}",
        .until.try_to_rfc3339_string().unwrap_or_default()
    )]
    Banned { until: DateTime },
    #[error("Invalid seat index {0}")]
    InvalidSeat(i64),
    #[error("Seat {0} is already taken")]
    SeatTaken(usize),
    #[error("Only the room owner can manage admins")]
    NotOwner,
    #[error("You don't have permission to perform this action")]
    NotModerator,
    #[error("The room owner cannot be kicked or banned")]
    TargetIsOwner,
}

/// What a successful ban changed.
#[derive(Debug, Clone, PartialEq)]
pub struct BanOutcome {
    pub banned_until: DateTime,
    pub freed_seat: Option<usize>,
}

impl Room {
    pub const COLLECTION: &'static str = "rooms";

    pub fn new(name: String, image: String, display_id: String, owner_id: ObjectId) -> Self {
        let now = DateTime::now();
        Self {
            id: None,
            name,
            image,
            display_id,
            owner_id,
            seats: [None; SEAT_COUNT],
            admins: Vec::new(),
            banned_users: Vec::new(),
            speaking_seat_index: None,
            locked_seats: [false; SEAT_COUNT],
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn role_of(&self, user_id: ObjectId) -> RoomRole {
        if self.owner_id == user_id {
            RoomRole::Owner
        } else if self.admins.contains(&user_id) {
            RoomRole::Admin
        } else {
            RoomRole::Member
        }
    }

    pub fn seat_of(&self, user_id: ObjectId) -> Option<usize> {
        self.seats.iter().position(|s| *s == Some(user_id))
    }

    pub fn occupied_seats(&self) -> usize {
        self.seats.iter().filter(|s| s.is_some()).count()
    }

    pub fn active_ban(&self, user_id: ObjectId, now: DateTime) -> Option<&BanRecord> {
        self.banned_users
            .iter()
            .find(|b| b.user_id == user_id && b.is_active(now))
    }

    /// Seats `user_id` at `seat_index`, vacating any seat they held before.
    /// Returns the seat they moved away from.
    pub fn take_seat(
        &mut self,
        user_id: ObjectId,
        seat_index: i64,
        now: DateTime,
    ) -> Result<Option<usize>, RoomRuleError> {
        if let Some(ban) = self.active_ban(user_id, now) {
            return Err(RoomRuleError::Banned {
                until: ban.banned_until,
            });
        }

        let target = usize::try_from(seat_index)
            .ok()
            .filter(|i| *i < SEAT_COUNT)
            .ok_or(RoomRuleError::InvalidSeat(seat_index))?;

        if self.seats[target].is_some() {
            return Err(RoomRuleError::SeatTaken(target));
        }

        let previous = self.seat_of(user_id);
        if let Some(prev) = previous {
            self.vacate(prev);
        }
        self.seats[target] = Some(user_id);
        Ok(previous)
    }

    /// Frees the caller's seat. The speaking indicator is cleared whenever a
    /// seat is given up this way, even if another seat held it.
    pub fn leave_seat(&mut self, user_id: ObjectId) -> Option<usize> {
        let seat = self.seat_of(user_id)?;
        self.seats[seat] = None;
        self.speaking_seat_index = None;
        Some(seat)
    }

    /// Returns whether the indicator changed. Unseated callers are ignored.
    pub fn set_speaking(&mut self, user_id: ObjectId, is_speaking: bool) -> bool {
        let Some(seat) = self.seat_of(user_id) else {
            return false;
        };

        if is_speaking {
            let changed = self.speaking_seat_index != Some(seat);
            self.speaking_seat_index = Some(seat);
            changed
        } else if self.speaking_seat_index == Some(seat) {
            self.speaking_seat_index = None;
            true
        } else {
            false
        }
    }

    pub fn appoint_admin(
        &mut self,
        actor: ObjectId,
        target: ObjectId,
    ) -> Result<bool, RoomRuleError> {
        self.require_role(actor, RoomRole::Owner, RoomRuleError::NotOwner)?;
        if self.admins.contains(&target) {
            return Ok(false);
        }
        self.admins.push(target);
        Ok(true)
    }

    pub fn remove_admin(
        &mut self,
        actor: ObjectId,
        target: ObjectId,
    ) -> Result<bool, RoomRuleError> {
        self.require_role(actor, RoomRole::Owner, RoomRuleError::NotOwner)?;
        let before = self.admins.len();
        self.admins.retain(|id| *id != target);
        Ok(self.admins.len() != before)
    }

    /// Removes `target` from their seat. Returns the freed seat, or `None`
    /// when the target was not seated.
    pub fn kick(
        &mut self,
        actor: ObjectId,
        target: ObjectId,
    ) -> Result<Option<usize>, RoomRuleError> {
        self.require_moderation_of(actor, target)?;
        let seat = self.seat_of(target);
        if let Some(seat) = seat {
            self.vacate(seat);
        }
        Ok(seat)
    }

    /// Replaces any existing ban for `target` with one lasting
    /// `duration_minutes` from `now`, and unseats them.
    pub fn ban(
        &mut self,
        actor: ObjectId,
        target: ObjectId,
        duration_minutes: u32,
        now: DateTime,
    ) -> Result<BanOutcome, RoomRuleError> {
        self.require_moderation_of(actor, target)?;

        let banned_until = DateTime::from_millis(
            now.timestamp_millis() + i64::from(duration_minutes) * MILLIS_PER_MINUTE,
        );
        self.banned_users.retain(|b| b.user_id != target);
        self.banned_users.push(BanRecord {
            user_id: target,
            banned_until,
        });

        let freed_seat = self.seat_of(target);
        if let Some(seat) = freed_seat {
            self.vacate(seat);
        }

        Ok(BanOutcome {
            banned_until,
            freed_seat,
        })
    }

    pub fn unban(&mut self, actor: ObjectId, target: ObjectId) -> Result<bool, RoomRuleError> {
        self.require_role(actor, RoomRole::Admin, RoomRuleError::NotModerator)?;
        let before = self.banned_users.len();
        self.banned_users.retain(|b| b.user_id != target);
        Ok(self.banned_users.len() != before)
    }

    fn vacate(&mut self, seat: usize) {
        self.seats[seat] = None;
        if self.speaking_seat_index == Some(seat) {
            self.speaking_seat_index = None;
        }
    }

    fn require_role(
        &self,
        actor: ObjectId,
        minimum: RoomRole,
        err: RoomRuleError,
    ) -> Result<(), RoomRuleError> {
        if self.role_of(actor) >= minimum {
            Ok(())
        } else {
            Err(err)
        }
    }

    fn require_moderation_of(
        &self,
        actor: ObjectId,
        target: ObjectId,
    ) -> Result<(), RoomRuleError> {
        self.require_role(actor, RoomRole::Admin, RoomRuleError::NotModerator)?;
        if target == self.owner_id {
            return Err(RoomRuleError::TargetIsOwner);
        }
        Ok(())
    }
}
