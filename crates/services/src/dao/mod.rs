pub mod base;
pub mod chat;
pub mod conversation;
pub mod file;
pub mod follower;
pub mod gift;
pub mod post;
pub mod profile;
pub mod room;
pub mod user;

pub use base::{BaseDao, DaoError, DaoResult};
