use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use voxroom_api::{build_router, state::AppState};
use voxroom_config::Settings;
use voxroom_db::{connect, indexes::ensure_indexes, migrations};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file (silently ignore if missing)
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "voxroom_api=debug,voxroom_services=debug,voxroom_db=debug,tower_http=debug".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::load()?;
    info!(
        "Starting Voxroom API on {}:{}",
        settings.app.host, settings.app.port
    );
    if !settings.agora.is_configured() {
        info!("Agora credentials missing, audio tokens are disabled");
    }

    let db = connect(&settings.database).await?;
    ensure_indexes(&db).await?;
    migrations::run(&db).await?;

    let app_state = AppState::new(db, settings.clone()).await?;
    let app = build_router(app_state);

    let addr = format!("{}:{}", settings.app.host, settings.app.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
