use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::Json;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    errors::AppError,
    models::messages::{MessageResponse, SendMessagePayload},
    routes::success,
    services::message_pipeline::{self, PipelineSettings},
    state::AppState,
};

pub fn message_routes() -> Router<AppState> {
    Router::new()
        .route("/send/{chat_id}", post(send_message_handler))
        .route("/get/{chat_id}", get(get_messages_handler))
        .route("/delete/{id}", delete(delete_message_handler))
        .route("/delete-all/{chat_id}", delete(delete_all_messages_handler))
}

#[instrument(skip(state, auth_user, payload), err)]
pub async fn send_message_handler(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(chat_id): Path<Uuid>,
    Json(payload): Json<SendMessagePayload>,
) -> Result<impl IntoResponse, AppError> {
    let content = payload.content.unwrap_or_default();
    let settings = PipelineSettings::from_config(&state.config);

    let reply = message_pipeline::send_message(
        state.store.as_ref(),
        state.ai_client.as_ref(),
        &settings,
        auth_user.id,
        chat_id,
        content,
    )
    .await?;

    Ok(success(
        StatusCode::CREATED,
        reply,
        Some("Message sent successfully"),
    ))
}

#[instrument(skip(state, auth_user), err)]
pub async fn get_messages_handler(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(chat_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let messages =
        message_pipeline::get_messages(state.store.as_ref(), auth_user.id, chat_id).await?;
    let messages: Vec<MessageResponse> = messages.into_iter().map(MessageResponse::from).collect();
    Ok(success(
        StatusCode::OK,
        messages,
        Some("Messages fetched successfully"),
    ))
}

#[instrument(skip(state, auth_user), err)]
pub async fn delete_message_handler(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(message_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    message_pipeline::delete_message(state.store.as_ref(), auth_user.id, message_id).await?;
    Ok(success(
        StatusCode::OK,
        serde_json::Value::Null,
        Some("Message deleted successfully"),
    ))
}

#[instrument(skip(state, auth_user), err)]
pub async fn delete_all_messages_handler(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(chat_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    message_pipeline::delete_all_messages(state.store.as_ref(), auth_user.id, chat_id).await?;
    Ok(success(
        StatusCode::OK,
        serde_json::Value::Null,
        Some("All messages deleted successfully"),
    ))
}
