pub mod chat_message;
pub mod conversation;
pub mod file;
pub mod follower;
pub mod gift;
pub mod post;
pub mod room;
pub mod user;
pub mod user_profile;

pub use chat_message::ChatMessage;
pub use conversation::{Conversation, PrivateMessage};
pub use file::{FileStatus, StoredFile};
pub use follower::Follower;
pub use gift::{Gift, GiftMediaType, GlobalAnnouncement};
pub use post::{Comment, Post, PostReaction, ReactionChange, ReactionKind};
pub use room::{BanOutcome, BanRecord, Room, RoomRole, RoomRuleError, SEAT_COUNT};
pub use user::User;
pub use user_profile::{Gender, UserProfile};
