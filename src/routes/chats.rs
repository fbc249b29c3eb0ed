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
    models::chats::{ChatResponse, CreateChatPayload},
    routes::success,
    services::chat_service,
    state::AppState,
};

pub fn chat_routes() -> Router<AppState> {
    Router::new()
        .route("/create", post(create_chat_handler))
        .route("/list", get(list_chats_handler))
        .route("/get/{id}", get(get_chat_handler))
        .route("/delete/{id}", delete(delete_chat_handler))
        .route("/delete-all", delete(delete_all_chats_handler))
}

#[instrument(skip(state, auth_user, payload), err)]
pub async fn create_chat_handler(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<CreateChatPayload>,
) -> Result<impl IntoResponse, AppError> {
    let (title, persona) = match (payload.title, payload.persona) {
        (Some(title), Some(persona)) if !title.trim().is_empty() => (title, persona),
        _ => {
            return Err(AppError::InvalidInput(
                "Title and persona are required".to_string(),
            ));
        }
    };
    let persona = persona
        .parse()
        .map_err(|e: String| AppError::InvalidInput(e))?;

    let chat = chat_service::create_chat(&state.pool, auth_user.id, title, persona).await?;
    Ok(success(
        StatusCode::CREATED,
        ChatResponse::from(chat),
        Some("Chat created successfully"),
    ))
}

#[instrument(skip(state, auth_user), err)]
pub async fn list_chats_handler(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let chats = chat_service::list_chats(&state.pool, auth_user.id).await?;
    let chats: Vec<ChatResponse> = chats.into_iter().map(ChatResponse::from).collect();
    Ok(success(
        StatusCode::OK,
        chats,
        Some("Chats fetched successfully"),
    ))
}

#[instrument(skip(state, auth_user), err)]
pub async fn get_chat_handler(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(chat_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let chat = chat_service::get_chat(&state.pool, auth_user.id, chat_id).await?;
    Ok(success(
        StatusCode::OK,
        ChatResponse::from(chat),
        Some("Chat fetched successfully"),
    ))
}

#[instrument(skip(state, auth_user), err)]
pub async fn delete_chat_handler(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(chat_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    chat_service::delete_chat(&state.pool, auth_user.id, chat_id).await?;
    Ok(success(
        StatusCode::OK,
        serde_json::Value::Null,
        Some("Chat deleted successfully"),
    ))
}

#[instrument(skip(state, auth_user), err)]
pub async fn delete_all_chats_handler(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    chat_service::delete_all_chats(&state.pool, auth_user.id).await?;
    Ok(success(
        StatusCode::OK,
        serde_json::Value::Null,
        Some("All chats deleted successfully"),
    ))
}
