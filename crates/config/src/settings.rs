use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub app: AppSettings,
    pub database: DatabaseSettings,
    pub jwt: JwtSettings,
    pub agora: AgoraSettings,
    pub storage: StorageSettings,
    pub economy: EconomySettings,
    pub room: RoomSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSettings {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    /// Prefix used when handing out absolute URLs (upload URLs, blob URLs).
    /// Empty means URLs are returned relative to the API root.
    pub public_base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub name: String,
    pub max_pool_size: Option<u32>,
    pub min_pool_size: Option<u32>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub access_token_ttl_secs: u64,
    pub refresh_token_ttl_secs: u64,
    pub issuer: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AgoraSettings {
    pub app_id: String,
    pub app_certificate: String,
    pub token_ttl_secs: u32,
}

impl AgoraSettings {
    pub fn is_configured(&self) -> bool {
        !self.app_id.is_empty() && !self.app_certificate.is_empty()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageSettings {
    pub upload_dir: String,
    pub upload_url_ttl_secs: u64,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EconomySettings {
    pub starting_coins: i64,
    pub starting_level: i32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RoomSettings {
    /// Extra attempts for version-guarded writes to rooms and post reactions.
    pub max_cas_retries: u32,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::default()
                    .separator("__")
                    .prefix("VOXROOM"),
            )
            .set_default("app.host", "0.0.0.0")?
            .set_default("app.port", 3000)?
            .set_default("app.cors_origins", Vec::<String>::new())?
            .set_default("app.public_base_url", "")?
            .set_default("database.url", "mongodb://localhost:27019")?
            .set_default("database.name", "voxroom")?
            .set_default("jwt.secret", "change-me-in-production")?
            .set_default("jwt.access_token_ttl_secs", 3600)?
            .set_default("jwt.refresh_token_ttl_secs", 604800)?
            .set_default("jwt.issuer", "voxroom")?
            .set_default("agora.app_id", "")?
            .set_default("agora.app_certificate", "")?
            .set_default("agora.token_ttl_secs", 3600)?
            .set_default("storage.upload_dir", "/tmp/voxroom-uploads")?
            .set_default("storage.upload_url_ttl_secs", 3600)?
            .set_default("storage.max_upload_bytes", 10 * 1024 * 1024)?
            .set_default("economy.starting_coins", 1000)?
            .set_default("economy.starting_level", 1)?
            .set_default("room.max_cas_retries", 5)?
            .build()?;

        config.try_deserialize()
    }
}
