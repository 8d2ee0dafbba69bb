pub mod agora;
pub mod auth;
pub mod chat;
pub mod common;
pub mod conversation;
pub mod gift;
pub mod post;
pub mod room;
pub mod storage;
pub mod user;
