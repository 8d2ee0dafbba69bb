use mongodb::Database;
use std::net::SocketAddr;
use tempfile::TempDir;
use tokio::net::TcpListener;
use voxroom_api::{build_router, state::AppState};
use voxroom_config::Settings;
use voxroom_db::{connect, indexes::ensure_indexes, migrations};

/// A running test application with its own MongoDB database and upload
/// directory.
pub struct TestApp {
    pub addr: SocketAddr,
    pub base_url: String,
    pub db: Database,
    pub settings: Settings,
    pub client: reqwest::Client,
    _upload_dir: TempDir,
}

impl TestApp {
    /// Spawn a new test server connected to the test MongoDB.
    ///
    /// Requires a running MongoDB at localhost:27019.
    /// Set VOXROOM__DATABASE__URL env var to override the connection string.
    /// Each test gets a unique database name for isolation.
    pub async fn spawn() -> Self {
        Self::spawn_with_settings(|_| {}).await
    }

    /// Spawn a test server with customized settings.
    ///
    /// The `mutator` closure receives a `&mut Settings` after defaults are applied,
    /// allowing tests to tweak specific fields (e.g., Agora credentials).
    pub async fn spawn_with_settings(mutator: impl FnOnce(&mut Settings)) -> Self {
        let db_name = format!("voxroom_test_{}", uuid::Uuid::new_v4().simple());
        let upload_dir = TempDir::new().expect("Failed to create upload dir");

        let mut settings = Settings::load().expect("Failed to load settings");
        settings.database.name = db_name;
        settings.storage.upload_dir = upload_dir.path().to_string_lossy().into_owned();
        settings.agora.app_id = String::new();
        settings.agora.app_certificate = String::new();
        settings.jwt.secret = "test-secret-key-for-jwt-signing-minimum-32-chars".to_string();
        mutator(&mut settings);

        let db = connect(&settings.database)
            .await
            .expect("Failed to connect to MongoDB");
        ensure_indexes(&db).await.expect("Failed to create indexes");
        migrations::run(&db).await.expect("Failed to run migrations");

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);
        settings.app.public_base_url = base_url.clone();

        let app_state = AppState::new(db.clone(), settings.clone())
            .await
            .expect("Failed to create AppState");
        let app = build_router(app_state);

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            addr,
            base_url,
            db,
            settings,
            client,
            _upload_dir: upload_dir,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn ws_url(&self, token: &str) -> String {
        format!("ws://{}/ws?token={}", self.addr, token)
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let db = self.db.clone();
        // Best effort cleanup: drop the test database
        tokio::spawn(async move {
            let _ = db.drop().await;
        });
    }
}
