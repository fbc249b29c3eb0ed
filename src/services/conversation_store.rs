// src/services/conversation_store.rs

use async_trait::async_trait;
use diesel::prelude::*;
use tracing::{error, instrument};
use uuid::Uuid;

use crate::{
    PgPool,
    errors::AppError,
    models::{
        chats::Chat,
        messages::{Message, MessageRole, NewMessage},
    },
    schema::{chats, messages},
};

/// Durable record of chats and messages consumed by the message pipeline.
///
/// No transactional guarantee holds across calls; the pipeline tolerates
/// read-then-write races. The trait seam keeps the pipeline testable
/// against in-memory mocks.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn get_chat(&self, chat_id: Uuid) -> Result<Option<Chat>, AppError>;

    /// Up to `limit` most recent messages for a chat, newest first.
    async fn list_recent_messages(
        &self,
        chat_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Message>, AppError>;

    /// All messages for a chat in ascending creation order.
    async fn list_messages(&self, chat_id: Uuid) -> Result<Vec<Message>, AppError>;

    async fn get_message(&self, message_id: Uuid) -> Result<Option<Message>, AppError>;

    async fn create_message(
        &self,
        chat_id: Uuid,
        role: MessageRole,
        content: String,
    ) -> Result<Message, AppError>;

    async fn update_chat_title(&self, chat_id: Uuid, new_title: String)
    -> Result<Chat, AppError>;

    /// Returns false when the message did not exist.
    async fn delete_message(&self, message_id: Uuid) -> Result<bool, AppError>;

    async fn delete_messages_for_chat(&self, chat_id: Uuid) -> Result<usize, AppError>;
}

/// Diesel-backed store over the shared deadpool connection pool.
#[derive(Clone)]
pub struct DieselConversationStore {
    pool: PgPool,
}

impl DieselConversationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConversationStore for DieselConversationStore {
    #[instrument(skip(self), err)]
    async fn get_chat(&self, chat_id: Uuid) -> Result<Option<Chat>, AppError> {
        let conn = self.pool.get().await?;
        conn.interact(move |conn| {
            chats::table
                .filter(chats::id.eq(chat_id))
                .select(Chat::as_select())
                .first::<Chat>(conn)
                .optional()
                .map_err(AppError::from)
        })
        .await?
    }

    #[instrument(skip(self), err)]
    async fn list_recent_messages(
        &self,
        chat_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Message>, AppError> {
        let conn = self.pool.get().await?;
        conn.interact(move |conn| {
            messages::table
                .filter(messages::chat_id.eq(chat_id))
                .select(Message::as_select())
                .order(messages::created_at.desc())
                .limit(limit)
                .load::<Message>(conn)
                .map_err(|e| {
                    error!("Failed to load recent messages for chat {}: {}", chat_id, e);
                    AppError::DatabaseQuery(e.to_string())
                })
        })
        .await?
    }

    #[instrument(skip(self), err)]
    async fn list_messages(&self, chat_id: Uuid) -> Result<Vec<Message>, AppError> {
        let conn = self.pool.get().await?;
        conn.interact(move |conn| {
            messages::table
                .filter(messages::chat_id.eq(chat_id))
                .select(Message::as_select())
                .order(messages::created_at.asc())
                .load::<Message>(conn)
                .map_err(|e| {
                    error!("Failed to load messages for chat {}: {}", chat_id, e);
                    AppError::DatabaseQuery(e.to_string())
                })
        })
        .await?
    }

    #[instrument(skip(self), err)]
    async fn get_message(&self, message_id: Uuid) -> Result<Option<Message>, AppError> {
        let conn = self.pool.get().await?;
        conn.interact(move |conn| {
            messages::table
                .filter(messages::id.eq(message_id))
                .select(Message::as_select())
                .first::<Message>(conn)
                .optional()
                .map_err(AppError::from)
        })
        .await?
    }

    #[instrument(skip(self, content), err)]
    async fn create_message(
        &self,
        chat_id: Uuid,
        role: MessageRole,
        content: String,
    ) -> Result<Message, AppError> {
        let conn = self.pool.get().await?;
        conn.interact(move |conn| {
            let new_message = NewMessage {
                chat_id,
                role,
                content,
            };
            diesel::insert_into(messages::table)
                .values(&new_message)
                .returning(Message::as_select())
                .get_result::<Message>(conn)
                .map_err(|e| {
                    error!(%chat_id, %role, error = ?e, "Failed to insert message");
                    AppError::DatabaseQuery(e.to_string())
                })
        })
        .await?
    }

    #[instrument(skip(self), err)]
    async fn update_chat_title(
        &self,
        chat_id: Uuid,
        new_title: String,
    ) -> Result<Chat, AppError> {
        let conn = self.pool.get().await?;
        conn.interact(move |conn| {
            diesel::update(chats::table.filter(chats::id.eq(chat_id)))
                .set((
                    chats::title.eq(new_title),
                    chats::updated_at.eq(diesel::dsl::now),
                ))
                .returning(Chat::as_select())
                .get_result::<Chat>(conn)
                .map_err(AppError::from)
        })
        .await?
    }

    #[instrument(skip(self), err)]
    async fn delete_message(&self, message_id: Uuid) -> Result<bool, AppError> {
        let conn = self.pool.get().await?;
        conn.interact(move |conn| {
            diesel::delete(messages::table.filter(messages::id.eq(message_id)))
                .execute(conn)
                .map(|deleted| deleted > 0)
                .map_err(AppError::from)
        })
        .await?
    }

    #[instrument(skip(self), err)]
    async fn delete_messages_for_chat(&self, chat_id: Uuid) -> Result<usize, AppError> {
        let conn = self.pool.get().await?;
        conn.interact(move |conn| {
            diesel::delete(messages::table.filter(messages::chat_id.eq(chat_id)))
                .execute(conn)
                .map_err(AppError::from)
        })
        .await?
    }
}
