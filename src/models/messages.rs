use crate::models::chats::Chat;
use crate::schema::messages;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::error;
use uuid::Uuid;

use diesel::deserialize::{self, FromSql};
use diesel::pg::{Pg, PgValue};
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::{AsExpression, FromSqlRow};
use std::io::Write;

/// Who authored a message. Closed set: `user` for submissions, `ai` for
/// gateway replies. The external gateway vocabulary (`assistant`) lives in
/// `llm::ApiRole`; it never appears in storage.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, AsExpression, FromSqlRow,
)]
#[diesel(sql_type = crate::schema::sql_types::MessageRole)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    #[default]
    User,
    Ai,
}

impl ToSql<crate::schema::sql_types::MessageRole, Pg> for MessageRole {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        match *self {
            MessageRole::User => out.write_all(b"user")?,
            MessageRole::Ai => out.write_all(b"ai")?,
        }
        Ok(IsNull::No)
    }
}

impl FromSql<crate::schema::sql_types::MessageRole, Pg> for MessageRole {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        match bytes.as_bytes() {
            b"user" => Ok(MessageRole::User),
            b"ai" => Ok(MessageRole::Ai),
            unrecognized => {
                error!(
                    "Unrecognized message_role enum variant from DB: {:?}",
                    String::from_utf8_lossy(unrecognized)
                );
                Err("Unrecognized enum variant from database".into())
            }
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Ai => write!(f, "ai"),
        }
    }
}

// Represents a message in the database
#[derive(
    Queryable, Selectable, Identifiable, Associations, Debug, Clone, Serialize, Deserialize,
)]
#[diesel(belongs_to(Chat, foreign_key = chat_id))]
#[diesel(table_name = messages)]
pub struct Message {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// For inserting a new message
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = messages)]
pub struct NewMessage {
    pub chat_id: Uuid,
    pub role: MessageRole,
    pub content: String,
}

// --- API request/response structures ---

#[derive(Deserialize, Serialize, Debug)]
pub struct SendMessagePayload {
    pub content: Option<String>,
}

/// The buffered AI reply returned from `POST /api/message/send/{chat_id}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AiReply {
    pub role: MessageRole,
    pub content: String,
}

/// Serialized message shape for `GET /api/message/get/{chat_id}`.
#[derive(Serialize, Debug, Clone)]
pub struct MessageResponse {
    pub id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<Message> for MessageResponse {
    fn from(message: Message) -> Self {
        Self {
            id: message.id,
            role: message.role,
            content: message.content,
            created_at: message.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_to_wire_labels() {
        assert_eq!(serde_json::to_string(&MessageRole::User).unwrap(), "\"user\"");
        assert_eq!(serde_json::to_string(&MessageRole::Ai).unwrap(), "\"ai\"");
    }

    #[test]
    fn ai_reply_shape() {
        let reply = AiReply {
            role: MessageRole::Ai,
            content: "Recursion is a function calling itself.".to_string(),
        };
        let body = serde_json::to_value(&reply).unwrap();
        assert_eq!(body["role"], "ai");
        assert_eq!(body["content"], "Recursion is a function calling itself.");
    }

    #[test]
    fn message_response_keeps_creation_time() {
        let message = Message {
            id: Uuid::new_v4(),
            chat_id: Uuid::new_v4(),
            role: MessageRole::User,
            content: "Hello".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let response = MessageResponse::from(message.clone());
        assert_eq!(response.id, message.id);
        assert_eq!(response.created_at, message.created_at);
        let body = serde_json::to_value(&response).unwrap();
        assert!(body.get("chat_id").is_none());
    }
}
