use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::chats::Persona;
use crate::models::messages::MessageRole;

pub mod gateway_client;

pub use gateway_client::{HttpAiGateway, build_ai_gateway};

/// Role vocabulary the external AI service expects. Storage roles map onto
/// it as `ai` -> `assistant`, `user` -> `user`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiRole {
    User,
    Assistant,
}

impl From<MessageRole> for ApiRole {
    fn from(role: MessageRole) -> Self {
        match role {
            MessageRole::User => ApiRole::User,
            MessageRole::Ai => ApiRole::Assistant,
        }
    }
}

/// One turn of conversation as sent to the AI service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiChatMessage {
    pub role: ApiRole,
    pub content: String,
}

impl ApiChatMessage {
    pub fn new(role: ApiRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Trait defining the interface to the external AI completion service.
///
/// One logical operation: forward an ordered conversation and get the reply
/// back. The gateway is stateless per call and never retries; every failure
/// surfaces as `AppError::AiUpstream` carrying the underlying cause.
#[async_trait]
pub trait AiGateway: Send + Sync {
    /// Sends `history` (chronological, ending with the current user turn)
    /// and returns the complete reply text.
    async fn converse(
        &self,
        history: &[ApiChatMessage],
        persona: Persona,
    ) -> Result<String, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_roles_map_to_external_vocabulary() {
        assert_eq!(ApiRole::from(MessageRole::Ai), ApiRole::Assistant);
        assert_eq!(ApiRole::from(MessageRole::User), ApiRole::User);
    }

    #[test]
    fn api_message_serializes_lowercase_roles() {
        let msg = ApiChatMessage::new(ApiRole::Assistant, "hello");
        let body = serde_json::to_value(&msg).unwrap();
        assert_eq!(body["role"], "assistant");
        assert_eq!(body["content"], "hello");
    }
}
