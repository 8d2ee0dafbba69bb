use std::time::Duration;

use mongodb::{Client, Database, options::ClientOptions};
use tracing::info;
use voxroom_config::DatabaseSettings;

const APP_NAME: &str = "voxroom";

/// Builds a client for the configured cluster without touching the network.
pub async fn client(settings: &DatabaseSettings) -> Result<Client, mongodb::error::Error> {
    let mut options = ClientOptions::parse(&settings.url).await?;
    options.app_name = Some(APP_NAME.to_string());
    options.server_selection_timeout = Some(Duration::from_secs(10));
    options.max_pool_size = settings.max_pool_size;
    options.min_pool_size = settings.min_pool_size;

    Client::with_options(options)
}

/// Connects and pings the server so that a bad URL fails at start-up rather
/// than on the first request.
pub async fn connect(settings: &DatabaseSettings) -> Result<Database, mongodb::error::Error> {
    let client = client(settings).await?;

    client
        .database("admin")
        .run_command(bson::doc! { "ping": 1 })
        .await?;

    info!(db = %settings.name, "Connected to MongoDB");

    Ok(client.database(&settings.name))
}
