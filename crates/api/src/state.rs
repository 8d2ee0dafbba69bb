use mongodb::Database;
use std::sync::Arc;
use tracing::info;
use voxroom_config::Settings;
use voxroom_services::{
    AuthService, BlobStore, Hydrator, LocalBlobStore,
    dao::{
        chat::ChatDao, conversation::ConversationDao, file::FileDao, follower::FollowerDao,
        gift::GiftDao, post::PostDao, profile::ProfileDao, room::RoomDao, user::UserDao,
    },
};

use crate::ws::storage::WsStorage;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub settings: Settings,
    pub auth: Arc<AuthService>,
    pub users: Arc<UserDao>,
    pub profiles: Arc<ProfileDao>,
    pub followers: Arc<FollowerDao>,
    pub rooms: Arc<RoomDao>,
    pub chat: Arc<ChatDao>,
    pub gifts: Arc<GiftDao>,
    pub conversations: Arc<ConversationDao>,
    pub posts: Arc<PostDao>,
    pub files: Arc<FileDao>,
    pub hydrator: Arc<Hydrator>,
    pub blobs: Arc<dyn BlobStore>,
    pub ws_storage: Arc<WsStorage>,
}

impl AppState {
    /// Builds the DAOs, opens the blob directory and seeds the gift catalog
    /// when it is empty.
    pub async fn new(db: Database, settings: Settings) -> anyhow::Result<Self> {
        let base_url = settings.app.public_base_url.as_str();

        let auth = Arc::new(AuthService::new(settings.jwt.clone()));
        let users = Arc::new(UserDao::new(&db));
        let profiles = Arc::new(ProfileDao::new(&db, settings.economy.clone(), base_url));
        let followers = Arc::new(FollowerDao::new(&db));
        let rooms = Arc::new(RoomDao::new(&db, settings.room.max_cas_retries, base_url));
        let chat = Arc::new(ChatDao::new(&db, base_url));
        let gifts = Arc::new(GiftDao::new(&db));
        let conversations = Arc::new(ConversationDao::new(&db, base_url));
        let posts = Arc::new(PostDao::new(&db, settings.room.max_cas_retries, base_url));
        let files = Arc::new(FileDao::new(&db));
        let hydrator = Arc::new(Hydrator::new(&db, base_url));
        let blobs: Arc<dyn BlobStore> =
            Arc::new(LocalBlobStore::new(&settings.storage.upload_dir).await?);
        let ws_storage = Arc::new(WsStorage::new());

        let seeded = gifts.seed_defaults().await?;
        if seeded > 0 {
            info!(seeded, "Seeded gift catalog");
        }

        Ok(Self {
            db,
            settings,
            auth,
            users,
            profiles,
            followers,
            rooms,
            chat,
            gifts,
            conversations,
            posts,
            files,
            hydrator,
            blobs,
            ws_storage,
        })
    }
}
