pub mod error;
pub mod extractors;
pub mod routes;
pub mod state;
pub mod ws;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use state::AppState;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/logout", post(routes::auth::logout))
        .route("/refresh", post(routes::auth::refresh))
        .route("/me", get(routes::auth::me));

    let room_routes = Router::new()
        .route("/", get(routes::room::list).post(routes::room::create))
        .route("/search", get(routes::room::search_users))
        .route("/{room_id}", get(routes::room::get))
        .route("/{room_id}/seat/take", post(routes::room::take_seat))
        .route("/{room_id}/seat/leave", post(routes::room::leave_seat))
        .route("/{room_id}/speaking", post(routes::room::speaking))
        .route("/{room_id}/admin/appoint", post(routes::room::appoint_admin))
        .route("/{room_id}/admin/remove", post(routes::room::remove_admin))
        .route("/{room_id}/kick", post(routes::room::kick))
        .route("/{room_id}/ban", post(routes::room::ban))
        .route("/{room_id}/unban", post(routes::room::unban))
        .route(
            "/{room_id}/chat",
            get(routes::chat::list).post(routes::chat::send),
        )
        .route("/{room_id}/chat/gift", post(routes::chat::send_gift));

    let gift_routes = Router::new()
        .route("/", get(routes::gift::list))
        .route(
            "/announcement/latest",
            get(routes::gift::latest_announcement),
        );

    let conversation_routes = Router::new()
        .route(
            "/",
            get(routes::conversation::list).post(routes::conversation::create),
        )
        .route(
            "/{conversation_id}/message",
            get(routes::conversation::messages).post(routes::conversation::send),
        );

    let post_routes = Router::new()
        .route("/", get(routes::post::list).post(routes::post::create))
        .route(
            "/{post_id}/comment",
            get(routes::post::comments).post(routes::post::comment),
        )
        .route("/{post_id}/react", post(routes::post::react));

    let user_routes = Router::new()
        .route("/me/profile", get(routes::user::own_profile))
        .route(
            "/profile",
            post(routes::user::complete_profile).put(routes::user::update_profile),
        )
        .route("/upload-url", post(routes::user::generate_upload_url))
        .route("/{user_id}/profile", get(routes::user::profile))
        .route("/{user_id}/page", get(routes::user::page))
        .route("/{user_id}/popup", get(routes::user::popup))
        .route("/{user_id}/follow", post(routes::user::follow))
        .route("/{user_id}/unfollow", post(routes::user::unfollow));

    let storage_routes = Router::new()
        .route(
            "/upload/{token}",
            post(routes::storage::upload)
                .layer(DefaultBodyLimit::max(state.settings.storage.max_upload_bytes)),
        )
        .route("/{file_id}", get(routes::storage::download));

    let agora_routes = Router::new().route("/token", post(routes::agora::token));

    let api = Router::new()
        .nest("/auth", auth_routes)
        .nest("/room", room_routes)
        .nest("/gift", gift_routes)
        .nest("/conversation", conversation_routes)
        .nest("/post", post_routes)
        .nest("/user", user_routes)
        .nest("/storage", storage_routes)
        .nest("/agora", agora_routes);

    // Health check
    let health = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api)
        .merge(health)
        .route("/ws", get(ws::handler::ws_upgrade))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
