// src/test_helpers.rs
//
// In-memory mock collaborators for the pipeline and router tests. Shared
// state lives behind Arc<Mutex<...>> so a mock can be cloned into the app
// state while the test keeps a handle for assertions.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::errors::AppError;
use crate::llm::{AiGateway, ApiChatMessage};
use crate::models::chats::{Chat, DEFAULT_CHAT_TITLE, Persona};
use crate::models::messages::{Message, MessageRole};
use crate::services::conversation_store::ConversationStore;

/// Which store operation the test wants to fail next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    GetChat,
    ListRecentMessages,
    CreateMessage,
    UpdateChatTitle,
}

#[derive(Clone)]
pub struct MockConversationStore {
    chats: Arc<Mutex<HashMap<Uuid, Chat>>>,
    messages: Arc<Mutex<Vec<Message>>>,
    fail_on: Arc<Mutex<Option<StoreOp>>>,
    // Monotonic tick so created_at reflects insertion order even when
    // inserts land within the same clock instant.
    seq: Arc<Mutex<i64>>,
    base_time: DateTime<Utc>,
}

impl MockConversationStore {
    pub fn new() -> Self {
        Self {
            chats: Arc::new(Mutex::new(HashMap::new())),
            messages: Arc::new(Mutex::new(Vec::new())),
            fail_on: Arc::new(Mutex::new(None)),
            seq: Arc::new(Mutex::new(0)),
            base_time: Utc::now(),
        }
    }

    fn next_timestamp(&self) -> DateTime<Utc> {
        let mut seq = self.seq.lock().unwrap();
        *seq += 1;
        self.base_time + Duration::milliseconds(*seq)
    }

    /// Inserts a chat and returns its id.
    pub fn add_chat(&self, user_id: Uuid, title: &str, persona: Persona) -> Uuid {
        let now = self.next_timestamp();
        let chat = Chat {
            id: Uuid::new_v4(),
            user_id,
            title: title.to_string(),
            persona,
            created_at: now,
            updated_at: now,
        };
        let id = chat.id;
        self.chats.lock().unwrap().insert(id, chat);
        id
    }

    /// Convenience: a fresh chat still carrying the default title.
    pub fn add_default_chat(&self, user_id: Uuid) -> Uuid {
        self.add_chat(user_id, DEFAULT_CHAT_TITLE, Persona::Assistant)
    }

    /// Seeds an existing message, stamping creation order.
    pub fn seed_message(&self, chat_id: Uuid, role: MessageRole, content: &str) -> Uuid {
        let now = self.next_timestamp();
        let message = Message {
            id: Uuid::new_v4(),
            chat_id,
            role,
            content: content.to_string(),
            created_at: now,
            updated_at: now,
        };
        let id = message.id;
        self.messages.lock().unwrap().push(message);
        id
    }

    pub fn fail_next(&self, op: StoreOp) {
        *self.fail_on.lock().unwrap() = Some(op);
    }

    fn take_failure(&self, op: StoreOp) -> Result<(), AppError> {
        let mut fail_on = self.fail_on.lock().unwrap();
        if *fail_on == Some(op) {
            *fail_on = None;
            return Err(AppError::DatabaseQuery(format!("Injected failure: {op:?}")));
        }
        Ok(())
    }

    pub fn chat(&self, chat_id: Uuid) -> Option<Chat> {
        self.chats.lock().unwrap().get(&chat_id).cloned()
    }

    pub fn messages_for(&self, chat_id: Uuid) -> Vec<Message> {
        let mut messages: Vec<Message> = self
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.chat_id == chat_id)
            .cloned()
            .collect();
        messages.sort_by_key(|m| m.created_at);
        messages
    }

    pub fn message_count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }
}

impl Default for MockConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversationStore for MockConversationStore {
    async fn get_chat(&self, chat_id: Uuid) -> Result<Option<Chat>, AppError> {
        self.take_failure(StoreOp::GetChat)?;
        Ok(self.chats.lock().unwrap().get(&chat_id).cloned())
    }

    async fn list_recent_messages(
        &self,
        chat_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Message>, AppError> {
        self.take_failure(StoreOp::ListRecentMessages)?;
        let mut messages = self.messages_for(chat_id);
        messages.reverse(); // newest first
        messages.truncate(limit as usize);
        Ok(messages)
    }

    async fn list_messages(&self, chat_id: Uuid) -> Result<Vec<Message>, AppError> {
        Ok(self.messages_for(chat_id))
    }

    async fn get_message(&self, message_id: Uuid) -> Result<Option<Message>, AppError> {
        Ok(self
            .messages
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.id == message_id)
            .cloned())
    }

    async fn create_message(
        &self,
        chat_id: Uuid,
        role: MessageRole,
        content: String,
    ) -> Result<Message, AppError> {
        self.take_failure(StoreOp::CreateMessage)?;
        let now = self.next_timestamp();
        let message = Message {
            id: Uuid::new_v4(),
            chat_id,
            role,
            content,
            created_at: now,
            updated_at: now,
        };
        self.messages.lock().unwrap().push(message.clone());
        Ok(message)
    }

    async fn update_chat_title(
        &self,
        chat_id: Uuid,
        new_title: String,
    ) -> Result<Chat, AppError> {
        self.take_failure(StoreOp::UpdateChatTitle)?;
        let mut chats = self.chats.lock().unwrap();
        let chat = chats
            .get_mut(&chat_id)
            .ok_or_else(|| AppError::NotFound("Record not found".to_string()))?;
        chat.title = new_title;
        chat.updated_at = Utc::now();
        Ok(chat.clone())
    }

    async fn delete_message(&self, message_id: Uuid) -> Result<bool, AppError> {
        let mut messages = self.messages.lock().unwrap();
        let before = messages.len();
        messages.retain(|m| m.id != message_id);
        Ok(messages.len() < before)
    }

    async fn delete_messages_for_chat(&self, chat_id: Uuid) -> Result<usize, AppError> {
        let mut messages = self.messages.lock().unwrap();
        let before = messages.len();
        messages.retain(|m| m.chat_id != chat_id);
        Ok(before - messages.len())
    }
}

#[derive(Clone)]
pub struct MockAiGateway {
    response: Arc<Mutex<Result<String, AppError>>>,
    last_history: Arc<Mutex<Option<Vec<ApiChatMessage>>>>,
    last_persona: Arc<Mutex<Option<Persona>>>,
    call_count: Arc<Mutex<usize>>,
}

impl MockAiGateway {
    pub fn new() -> Self {
        Self {
            response: Arc::new(Mutex::new(Ok("Mock AI response".to_string()))),
            last_history: Arc::new(Mutex::new(None)),
            last_persona: Arc::new(Mutex::new(None)),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    pub fn set_response(&self, response: Result<String, AppError>) {
        *self.response.lock().unwrap() = response;
    }

    pub fn last_history(&self) -> Option<Vec<ApiChatMessage>> {
        self.last_history.lock().unwrap().clone()
    }

    pub fn last_persona(&self) -> Option<Persona> {
        *self.last_persona.lock().unwrap()
    }

    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

impl Default for MockAiGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AiGateway for MockAiGateway {
    async fn converse(
        &self,
        history: &[ApiChatMessage],
        persona: Persona,
    ) -> Result<String, AppError> {
        *self.last_history.lock().unwrap() = Some(history.to_vec());
        *self.last_persona.lock().unwrap() = Some(persona);
        *self.call_count.lock().unwrap() += 1;
        self.response.lock().unwrap().clone()
    }
}
