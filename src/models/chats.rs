use crate::models::users::User;
use crate::schema::chats;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::error;
use uuid::Uuid;

// Diesel traits for the manual enum mapping
use diesel::deserialize::{self, FromSql};
use diesel::pg::{Pg, PgValue};
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::{AsExpression, FromSqlRow};
use std::io::Write;

/// Title every chat starts with; the pipeline backfills it exactly once
/// from the first user message.
pub const DEFAULT_CHAT_TITLE: &str = "New Chat";

/// Behavioral mode attached to a chat and forwarded to the AI gateway.
/// Closed set; the database enforces it with a Postgres enum.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, AsExpression, FromSqlRow,
)]
#[diesel(sql_type = crate::schema::sql_types::PersonaType)]
#[serde(rename_all = "lowercase")]
pub enum Persona {
    #[default]
    Assistant,
    Reviewer,
    Debugger,
    Explainer,
}

impl ToSql<crate::schema::sql_types::PersonaType, Pg> for Persona {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        match *self {
            Persona::Assistant => out.write_all(b"assistant")?,
            Persona::Reviewer => out.write_all(b"reviewer")?,
            Persona::Debugger => out.write_all(b"debugger")?,
            Persona::Explainer => out.write_all(b"explainer")?,
        }
        Ok(IsNull::No)
    }
}

impl FromSql<crate::schema::sql_types::PersonaType, Pg> for Persona {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        match bytes.as_bytes() {
            b"assistant" => Ok(Persona::Assistant),
            b"reviewer" => Ok(Persona::Reviewer),
            b"debugger" => Ok(Persona::Debugger),
            b"explainer" => Ok(Persona::Explainer),
            unrecognized => {
                error!(
                    "Unrecognized persona_type enum variant from DB: {:?}",
                    String::from_utf8_lossy(unrecognized)
                );
                Err("Unrecognized enum variant from database".into())
            }
        }
    }
}

impl std::fmt::Display for Persona {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Persona::Assistant => write!(f, "assistant"),
            Persona::Reviewer => write!(f, "reviewer"),
            Persona::Debugger => write!(f, "debugger"),
            Persona::Explainer => write!(f, "explainer"),
        }
    }
}

impl std::str::FromStr for Persona {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "assistant" => Ok(Persona::Assistant),
            "reviewer" => Ok(Persona::Reviewer),
            "debugger" => Ok(Persona::Debugger),
            "explainer" => Ok(Persona::Explainer),
            other => Err(format!("Unknown persona: {other}")),
        }
    }
}

// Represents a chat in the database
#[derive(
    Queryable, Selectable, Identifiable, Associations, Debug, Clone, Serialize, Deserialize,
)]
#[diesel(belongs_to(User, foreign_key = user_id))]
#[diesel(table_name = chats)]
pub struct Chat {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub persona: Persona,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// For creating a new chat
#[derive(Insertable, Debug)]
#[diesel(table_name = chats)]
pub struct NewChat {
    pub user_id: Uuid,
    pub title: String,
    pub persona: Persona,
}

// --- API request/response structures ---

#[derive(Deserialize, Debug)]
pub struct CreateChatPayload {
    pub title: Option<String>,
    pub persona: Option<String>,
}

/// Serialized shape returned by the chat endpoints; omits `user_id`.
#[derive(Serialize, Debug, Clone)]
pub struct ChatResponse {
    pub id: Uuid,
    pub title: String,
    pub persona: Persona,
    pub created_at: DateTime<Utc>,
}

impl From<Chat> for ChatResponse {
    fn from(chat: Chat) -> Self {
        Self {
            id: chat.id,
            title: chat.title,
            persona: chat.persona,
            created_at: chat.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn persona_round_trips_through_str() {
        for persona in [
            Persona::Assistant,
            Persona::Reviewer,
            Persona::Debugger,
            Persona::Explainer,
        ] {
            let parsed = Persona::from_str(&persona.to_string()).expect("round trip");
            assert_eq!(parsed, persona);
        }
    }

    #[test]
    fn persona_rejects_unknown_labels() {
        assert!(Persona::from_str("therapist").is_err());
        assert!(Persona::from_str("Assistant").is_err());
        assert!(Persona::from_str("").is_err());
    }

    #[test]
    fn persona_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Persona::Reviewer).unwrap(),
            "\"reviewer\""
        );
    }

    #[test]
    fn chat_response_drops_owner_id() {
        let chat = Chat {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: DEFAULT_CHAT_TITLE.to_string(),
            persona: Persona::Assistant,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let response = ChatResponse::from(chat.clone());
        let body = serde_json::to_value(&response).unwrap();
        assert!(body.get("user_id").is_none());
        assert_eq!(body["title"], DEFAULT_CHAT_TITLE);
    }
}
