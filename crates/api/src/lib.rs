pub mod error;
pub mod extractors;
pub mod routes;
pub mod state;
pub mod ws;

use axum::{
    Router,
    routing::{delete, get, post, put},
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
        .route("/me", get(routes::auth::me));

    let room_routes = Router::new()
        .route("/", post(routes::room::create_room))
        .route("/{id}", get(routes::room::get_room));

    let request_routes = Router::new()
        .route("/", post(routes::request::create_request))
        .route("/{id}/accept", put(routes::request::accept_request));

    // Direct chats
    let chat_routes = Router::new()
        .route("/", get(routes::chat::list_chats))
        .route("/", post(routes::chat::create_chat))
        .route("/{id}", get(routes::chat::get_chat))
        .route("/{id}", delete(routes::chat::delete_chat))
        .route("/{id}/messages", get(routes::chat::get_messages))
        .route("/{id}/messages", post(routes::chat::send_message))
        .route("/{id}/read", put(routes::chat::mark_read));

    // Room group chats, keyed by room id
    let room_chat_routes = Router::new()
        .route("/{room_id}", get(routes::room_chat::get_room_chat))
        .route("/{room_id}/messages", get(routes::room_chat::get_messages))
        .route("/{room_id}/messages", post(routes::room_chat::send_message))
        .route("/{room_id}/unread", get(routes::room_chat::unread_count))
        .route("/{room_id}/read", put(routes::room_chat::mark_read));

    let api = Router::new()
        .nest("/auth", auth_routes)
        .nest("/rooms", room_routes)
        .nest("/requests", request_routes)
        .nest("/chats", chat_routes)
        .nest("/room-chats", room_chat_routes);

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
