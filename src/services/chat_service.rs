// src/services/chat_service.rs

use diesel::prelude::*;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::{
    PgPool,
    errors::AppError,
    models::chats::{Chat, NewChat, Persona},
    schema::chats,
};

/// Creates a new chat owned by `user_id`.
#[instrument(skip(pool, title), err)]
pub async fn create_chat(
    pool: &PgPool,
    user_id: Uuid,
    title: String,
    persona: Persona,
) -> Result<Chat, AppError> {
    let conn = pool.get().await?;
    let created = conn
        .interact(move |conn| {
            let new_chat = NewChat {
                user_id,
                title,
                persona,
            };
            diesel::insert_into(chats::table)
                .values(&new_chat)
                .returning(Chat::as_select())
                .get_result::<Chat>(conn)
                .map_err(|e| {
                    error!(%user_id, error = ?e, "Failed to insert new chat");
                    AppError::DatabaseQuery(e.to_string())
                })
        })
        .await??;
    info!(chat_id = %created.id, %user_id, "Chat created");
    Ok(created)
}

/// Lists all chats belonging to a user, newest first.
#[instrument(skip(pool), err)]
pub async fn list_chats(pool: &PgPool, user_id: Uuid) -> Result<Vec<Chat>, AppError> {
    let conn = pool.get().await?;
    conn.interact(move |conn| {
        chats::table
            .filter(chats::user_id.eq(user_id))
            .select(Chat::as_select())
            .order(chats::created_at.desc())
            .load::<Chat>(conn)
            .map_err(|e| {
                error!("Failed to load chats for user {}: {}", user_id, e);
                AppError::DatabaseQuery(e.to_string())
            })
    })
    .await?
}

/// Fetches a single chat scoped to its owner.
#[instrument(skip(pool), err)]
pub async fn get_chat(pool: &PgPool, user_id: Uuid, chat_id: Uuid) -> Result<Chat, AppError> {
    let conn = pool.get().await?;
    conn.interact(move |conn| {
        chats::table
            .filter(chats::id.eq(chat_id))
            .filter(chats::user_id.eq(user_id))
            .select(Chat::as_select())
            .first::<Chat>(conn)
            .optional()?
            .ok_or_else(|| AppError::NotFound("Chat not found".to_string()))
    })
    .await?
}

/// Deletes an owned chat; messages cascade at the schema level.
#[instrument(skip(pool), err)]
pub async fn delete_chat(pool: &PgPool, user_id: Uuid, chat_id: Uuid) -> Result<(), AppError> {
    let conn = pool.get().await?;
    conn.interact(move |conn| {
        let deleted = diesel::delete(
            chats::table
                .filter(chats::id.eq(chat_id))
                .filter(chats::user_id.eq(user_id)),
        )
        .execute(conn)?;
        if deleted == 0 {
            Err(AppError::NotFound("Chat not found".to_string()))
        } else {
            Ok(())
        }
    })
    .await?
}

/// Deletes every chat a user owns.
#[instrument(skip(pool), err)]
pub async fn delete_all_chats(pool: &PgPool, user_id: Uuid) -> Result<usize, AppError> {
    let conn = pool.get().await?;
    conn.interact(move |conn| {
        diesel::delete(chats::table.filter(chats::user_id.eq(user_id)))
            .execute(conn)
            .map_err(AppError::from)
    })
    .await?
}
