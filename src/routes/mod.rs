use axum::{Json, Router, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub mod auth;
pub mod chats;
pub mod health;
pub mod messages;

/// Success envelope: `{"data": ..., "message"?: ...}`.
pub fn success<T: Serialize>(
    status: StatusCode,
    data: T,
    message: Option<&str>,
) -> impl IntoResponse {
    let mut body: Value = json!({ "data": data });
    if let Some(message) = message {
        body["message"] = json!(message);
    }
    (status, Json(body))
}

/// Assembles the full application router.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", axum::routing::get(health::health_check))
        .nest("/auth", auth::auth_routes())
        .nest("/chat", chats::chat_routes())
        .nest("/message", messages::message_routes());

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
