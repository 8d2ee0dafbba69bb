pub mod auth;
pub mod dao;
pub mod hydrate;
pub mod media;
pub mod storage;

pub use auth::AuthService;
pub use dao::*;
pub use hydrate::{Hydrator, UserCard};
pub use storage::{BlobStore, LocalBlobStore};
