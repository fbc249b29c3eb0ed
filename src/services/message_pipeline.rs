// src/services/message_pipeline.rs
//
// The message-send pipeline: validate the chat, persist the user message,
// assemble bounded history, forward it to the AI gateway, persist the reply
// and backfill the chat title from the first user message.

use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    config::Config,
    errors::AppError,
    llm::{AiGateway, ApiChatMessage, ApiRole},
    models::{
        chats::{Chat, DEFAULT_CHAT_TITLE},
        messages::{AiReply, Message, MessageRole},
    },
    services::conversation_store::ConversationStore,
};

/// Pipeline tunables, lifted out of `Config` so tests can set them directly.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Most-recent messages fetched from storage for AI context, independent
    /// of total conversation length.
    pub history_window: i64,
    /// Maximum length (in chars) of a backfilled chat title.
    pub max_title_len: usize,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            history_window: config.history_window,
            max_title_len: config.max_title_len,
        }
    }
}

/// Derives a chat title from the first user message, char-boundary safe.
fn derive_title(content: &str, max_len: usize) -> String {
    content.chars().take(max_len).collect()
}

/// Maps stored history (newest first) plus the current user content into the
/// exact payload sent to the AI gateway: chronological order, external role
/// vocabulary, current message appended last exactly once.
fn build_gateway_payload(recent: &[Message], content: &str) -> Vec<ApiChatMessage> {
    let mut payload: Vec<ApiChatMessage> = recent
        .iter()
        .rev()
        .map(|m| ApiChatMessage::new(ApiRole::from(m.role), m.content.clone()))
        .collect();
    payload.push(ApiChatMessage::new(ApiRole::User, content));
    payload
}

/// Fetches the chat and enforces ownership. A chat owned by someone else is
/// reported as absent so its existence is not leaked.
async fn authorize_chat(
    store: &dyn ConversationStore,
    user_id: Uuid,
    chat_id: Uuid,
) -> Result<Chat, AppError> {
    let chat = store
        .get_chat(chat_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Chat not found".to_string()))?;
    if chat.user_id != user_id {
        return Err(AppError::NotFound("Chat not found".to_string()));
    }
    Ok(chat)
}

/// Sends a user message through the full pipeline and returns the buffered
/// AI reply.
///
/// Steps, with deliberate concurrency at each seam:
/// 1. chat fetch + history fetch run concurrently; the chat must exist and
///    belong to the caller;
/// 2. user-message persistence and the gateway call run concurrently; the
///    gateway sees the in-memory snapshot with the current message appended,
///    never a fresh read of it;
/// 3. AI-reply persistence and title backfill run concurrently; a failed
///    title update is logged and never fails the call.
///
/// If the gateway fails, the user message already persisted in step 2 stays
/// in place; that partial state is accepted, not rolled back.
#[instrument(skip(store, gateway, settings, content), err)]
pub async fn send_message(
    store: &dyn ConversationStore,
    gateway: &dyn AiGateway,
    settings: &PipelineSettings,
    user_id: Uuid,
    chat_id: Uuid,
    content: String,
) -> Result<AiReply, AppError> {
    if content.trim().is_empty() {
        return Err(AppError::InvalidInput("content is required".to_string()));
    }

    // Chat lookup and history fetch have no ordering dependency.
    let (chat, recent) = tokio::try_join!(
        authorize_chat(store, user_id, chat_id),
        store.list_recent_messages(chat_id, settings.history_window),
    )?;

    let payload = build_gateway_payload(&recent, &content);

    // Persisting the user message and calling the gateway are unordered
    // with respect to each other; both must complete before we continue.
    let (user_message, ai_content) = tokio::try_join!(
        store.create_message(chat_id, MessageRole::User, content.clone()),
        gateway.converse(&payload, chat.persona),
    )?;
    info!(message_id = %user_message.id, %chat_id, "User message persisted");

    let ai_message = if chat.title == DEFAULT_CHAT_TITLE {
        let title = derive_title(&content, settings.max_title_len);
        let (saved, renamed) = tokio::join!(
            store.create_message(chat_id, MessageRole::Ai, ai_content.clone()),
            store.update_chat_title(chat_id, title),
        );
        match renamed {
            Ok(chat) => info!(%chat_id, title = %chat.title, "Chat title backfilled"),
            // Non-fatal: the reply is already generated and must be delivered.
            Err(e) => warn!(%chat_id, error = %e, "Title backfill failed"),
        }
        saved?
    } else {
        store
            .create_message(chat_id, MessageRole::Ai, ai_content.clone())
            .await?
    };
    info!(message_id = %ai_message.id, %chat_id, "AI reply persisted");

    Ok(AiReply {
        role: MessageRole::Ai,
        content: ai_content,
    })
}

/// All messages for an owned chat, ascending by creation time.
#[instrument(skip(store), err)]
pub async fn get_messages(
    store: &dyn ConversationStore,
    user_id: Uuid,
    chat_id: Uuid,
) -> Result<Vec<Message>, AppError> {
    authorize_chat(store, user_id, chat_id).await?;
    store.list_messages(chat_id).await
}

/// Deletes a single message after walking ownership through its chat.
#[instrument(skip(store), err)]
pub async fn delete_message(
    store: &dyn ConversationStore,
    user_id: Uuid,
    message_id: Uuid,
) -> Result<(), AppError> {
    let message = store
        .get_message(message_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Message not found".to_string()))?;
    authorize_chat(store, user_id, message.chat_id).await?;

    if store.delete_message(message_id).await? {
        Ok(())
    } else {
        // Deleted concurrently between lookup and delete.
        Err(AppError::NotFound("Message not found".to_string()))
    }
}

/// Deletes every message in an owned chat.
#[instrument(skip(store), err)]
pub async fn delete_all_messages(
    store: &dyn ConversationStore,
    user_id: Uuid,
    chat_id: Uuid,
) -> Result<usize, AppError> {
    authorize_chat(store, user_id, chat_id).await?;
    store.delete_messages_for_chat(chat_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn message(role: MessageRole, content: &str, offset_secs: i64) -> Message {
        Message {
            id: Uuid::new_v4(),
            chat_id: Uuid::new_v4(),
            role,
            content: content.to_string(),
            created_at: Utc::now() + chrono::Duration::seconds(offset_secs),
            updated_at: Utc::now() + chrono::Duration::seconds(offset_secs),
        }
    }

    #[test]
    fn derive_title_truncates_on_char_boundaries() {
        assert_eq!(derive_title("Explain recursion please", 40), "Explain recursion please");
        assert_eq!(derive_title("abcdef", 3), "abc");
        // Multi-byte chars count as one each; no byte-boundary panics.
        assert_eq!(derive_title("héllo wörld", 5), "héllo");
    }

    #[test]
    fn payload_is_chronological_and_ends_with_current_content() {
        // Store hands back newest-first.
        let recent = vec![
            message(MessageRole::Ai, "second reply", 3),
            message(MessageRole::User, "second question", 2),
            message(MessageRole::Ai, "first reply", 1),
            message(MessageRole::User, "first question", 0),
        ];
        let payload = build_gateway_payload(&recent, "third question");

        let contents: Vec<&str> = payload.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(
            contents,
            vec![
                "first question",
                "first reply",
                "second question",
                "second reply",
                "third question"
            ]
        );
        assert_eq!(payload[0].role, ApiRole::User);
        assert_eq!(payload[1].role, ApiRole::Assistant);
        assert_eq!(payload.last().unwrap().role, ApiRole::User);

        // Current message appears exactly once.
        let occurrences = payload
            .iter()
            .filter(|m| m.content == "third question")
            .count();
        assert_eq!(occurrences, 1);
    }

    #[test]
    fn payload_for_empty_history_is_just_the_current_message() {
        let payload = build_gateway_payload(&[], "hello");
        assert_eq!(payload.len(), 1);
        assert_eq!(payload[0], ApiChatMessage::new(ApiRole::User, "hello"));
    }
}
